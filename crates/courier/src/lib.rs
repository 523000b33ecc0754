//! Table-driven RPC dispatch over persistent WebSocket connections.
//!
//! Courier routes requests from many long-lived client connections to named
//! methods on independently written services. Three pieces cooperate:
//!
//! - a [`ProtocolCodec`] that turns one raw frame into a routed [`Request`]
//!   and a [`Response`] back into a frame ([`JsonCodec`] ships as the
//!   default);
//! - [`ServiceDescription`]s, each a named table of [`MethodHandler`]s;
//! - the [`Server`], which owns the service table, accepts connections on a
//!   [`SocketEndpoint`], upgrades them to WebSocket and runs one dispatch
//!   loop per connection.
//!
//! Failures while decoding, routing or handling a request are reported to
//! the client as ordinary reply frames; the connection stays open. Only
//! transport errors end a connection, and never affect other connections.
//!
//! ```rust,ignore
//! use courier::{JsonCodec, JsonMethod, HandlerError, Server, ServiceDescription};
//!
//! let mut server = Server::new(JsonCodec);
//! server.register_service(
//!     ServiceDescription::builder("math")?
//!         .method("add", JsonMethod::new(|(a, b): (i64, i64)| Ok::<_, HandlerError>(a + b)))?
//!         .build(),
//! )?;
//! server.serve(&"tcp://127.0.0.1:9780".parse()?)?;
//! ```

pub mod codec;
pub mod dispatch;
mod ids;
pub mod server;
pub mod service;
mod transport;

pub use codec::{
    CodecError, Fault, FaultKind, JsonCodec, Outcome, ProtocolCodec, Request, Response, Route,
};
pub use courier_config::SocketEndpoint;
pub use dispatch::{DispatchError, Dispatcher};
pub use ids::{EmptyIdentifier, MethodId, ServiceId};
pub use server::{ServeError, Server, ServerHandle, ServerSettings};
pub use service::{
    HandlerError, JsonMethod, MethodHandler, RegistryError, ServiceBuilder, ServiceDescription,
    ServiceRegistry,
};
pub use transport::{ListenerError, Occupant, ShutdownTrigger, TcpBindStage, UnixBindStage};
