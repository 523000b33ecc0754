//! Method handler contract and adapters.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Business failure reported by a method handler.
///
/// The message is sent back to the client verbatim; it never closes the
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error with a client-facing message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Business logic bound to one method identifier.
///
/// Handlers are shared across every connection and may run concurrently;
/// any state beyond the payload is theirs to synchronise.
#[cfg_attr(test, mockall::automock)]
pub trait MethodHandler: Send + Sync {
    /// Handles one request payload and returns the encoded result.
    fn call(&self, payload: &[u8]) -> Result<Vec<u8>, HandlerError>;
}

impl<F> MethodHandler for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, HandlerError> + Send + Sync,
{
    fn call(&self, payload: &[u8]) -> Result<Vec<u8>, HandlerError> {
        self(payload)
    }
}

/// Adapts a typed function into a [`MethodHandler`] speaking JSON.
///
/// The payload is deserialised into `T` and the returned `R` serialised back
/// to JSON. A payload that does not match `T` is reported as a handler error.
///
/// ```rust,ignore
/// let add = JsonMethod::new(|(a, b): (i64, i64)| Ok::<_, HandlerError>(a + b));
/// ```
pub struct JsonMethod<F, T, R> {
    function: F,
    _types: PhantomData<fn(T) -> R>,
}

impl<F, T, R> JsonMethod<F, T, R>
where
    F: Fn(T) -> Result<R, HandlerError> + Send + Sync,
    T: DeserializeOwned,
    R: Serialize,
{
    /// Wraps `function` as a JSON method handler.
    pub fn new(function: F) -> Self {
        Self {
            function,
            _types: PhantomData,
        }
    }
}

impl<F, T, R> MethodHandler for JsonMethod<F, T, R>
where
    F: Fn(T) -> Result<R, HandlerError> + Send + Sync,
    T: DeserializeOwned,
    R: Serialize,
{
    fn call(&self, payload: &[u8]) -> Result<Vec<u8>, HandlerError> {
        let request: T = serde_json::from_slice(payload)
            .map_err(|error| HandlerError::new(format!("invalid payload: {error}")))?;
        let response = (self.function)(request)?;
        serde_json::to_vec(&response)
            .map_err(|error| HandlerError::new(format!("failed to serialize result: {error}")))
    }
}
