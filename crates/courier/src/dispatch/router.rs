//! Frame-level dispatch: decode, route, invoke, encode.
//!
//! The [`Dispatcher`] is transport-agnostic. It turns one inbound frame into
//! the bytes to send back, so every stage of the pipeline can be exercised
//! without a socket.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::{Fault, FaultKind, ProtocolCodec, Response};
use crate::service::{HandlerError, MethodHandler, ServiceRegistry};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

const ENCODE_FAILURE_PREFIX: &str = "error: failed to encode response: ";

/// Routes decoded requests through a frozen service registry.
///
/// Cheap to clone; every connection thread holds its own clone.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    codec: Arc<dyn ProtocolCodec>,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry`, speaking `codec`.
    #[must_use]
    pub fn new(registry: Arc<ServiceRegistry>, codec: Arc<dyn ProtocolCodec>) -> Self {
        Self { registry, codec }
    }

    /// Registry the dispatcher routes through.
    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Handles one inbound frame and returns the outbound frame.
    ///
    /// Never fails: decode, routing and handler failures become fault
    /// replies, and an unencodable reply becomes a plaintext error frame.
    #[must_use]
    pub fn dispatch(&self, frame: &[u8]) -> Vec<u8> {
        let response = self.respond(frame);
        match self.codec.encode(&response) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    %error,
                    route = ?response.route(),
                    "failed to encode response"
                );
                format!("{ENCODE_FAILURE_PREFIX}{error}").into_bytes()
            }
        }
    }

    /// Runs the decode, route and invoke stages for one frame.
    #[must_use]
    pub fn respond(&self, frame: &[u8]) -> Response {
        let request = match self.codec.decode(frame) {
            Ok(request) => request,
            Err(error) => {
                debug!(target: DISPATCH_TARGET, %error, "rejected undecodable frame");
                return Response::failure(None, Fault::new(FaultKind::Decode, error.to_string()));
            }
        };

        let (route, payload) = request.into_parts();
        let handler = match self.registry.resolve(&route) {
            Ok(handler) => handler,
            Err(error) => {
                debug!(target: DISPATCH_TARGET, %error, %route, "request not routable");
                return Response::failure(Some(route), error.into());
            }
        };

        debug!(target: DISPATCH_TARGET, %route, "dispatching request");
        match invoke(handler.as_ref(), &payload) {
            Ok(result) => Response::success(route, result),
            Err(error) => {
                debug!(target: DISPATCH_TARGET, %error, %route, "handler reported failure");
                Response::failure(
                    Some(route),
                    Fault::new(FaultKind::Handler, error.message()),
                )
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Dispatcher")
            .field("services", &self.registry.len())
            .finish_non_exhaustive()
    }
}

/// Calls `handler`, converting a panic into a handler error.
fn invoke(handler: &dyn MethodHandler, payload: &[u8]) -> Result<Vec<u8>, HandlerError> {
    panic::catch_unwind(AssertUnwindSafe(|| handler.call(payload))).unwrap_or_else(|panic| {
        let message = panic_message(panic.as_ref());
        warn!(target: DISPATCH_TARGET, panic = message, "method handler panicked");
        Err(HandlerError::new(format!("handler panicked: {message}")))
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("opaque panic payload")
}
