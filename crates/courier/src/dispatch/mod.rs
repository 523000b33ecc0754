//! Per-connection request dispatch.
//!
//! Each upgraded connection runs a loop that reads one frame, decodes it
//! with the server's codec, resolves the target handler (service first, then
//! method), invokes it and writes the encoded reply back on the same
//! connection:
//!
//! ```text
//! read ─▶ decode ─▶ route ─▶ invoke ─▶ encode ─▶ write ─┐
//!  ▲                                                      │
//!  └──────────────────────────────────────────────────────┘
//! ```
//!
//! Decode, routing and handler failures short-circuit to a fault reply and
//! the loop carries on. Only read and write failures on the transport end
//! the loop, after which the connection is released.

mod connection;
mod errors;
mod handler;
mod router;

pub use self::errors::DispatchError;
pub(crate) use self::handler::DispatchConnectionHandler;
pub use self::router::Dispatcher;
