//! Socket listener feeding accepted connections to the dispatch layer.
//!
//! The listener binds a [`SocketEndpoint`](courier_config::SocketEndpoint),
//! polls a non-blocking accept loop on a background thread, and hands each
//! accepted stream to a [`ConnectionHandler`] on a thread of its own. The
//! retry rules for accept errors live in `accept`.

mod accept;
mod errors;
mod handler;
mod listener;

pub use self::errors::{ListenerError, Occupant, TcpBindStage, UnixBindStage};
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::{ListenerHandle, SocketListener};
pub use self::listener::ShutdownTrigger;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
