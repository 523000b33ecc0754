//! Error types for per-message routing failures.
//!
//! These never end a connection: the dispatcher turns them into
//! [`Fault`](crate::codec::Fault) replies on the same channel.

use thiserror::Error;

use crate::codec::{Fault, FaultKind};

/// Errors surfaced while routing a decoded request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No service is registered under the requested identifier.
    #[error("unknown service '{service}'")]
    UnknownService { service: String },

    /// The service exists but has no handler for the method.
    #[error("unknown method '{method}' for service '{service}'")]
    UnknownMethod { service: String, method: String },
}

impl DispatchError {
    /// Creates an unknown service error.
    pub fn unknown_service(service: impl Into<String>) -> Self {
        Self::UnknownService {
            service: service.into(),
        }
    }

    /// Creates an unknown method error.
    pub fn unknown_method(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            service: service.into(),
            method: method.into(),
        }
    }

    /// Fault kind reported to the client.
    #[must_use]
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            Self::UnknownService { .. } => FaultKind::UnknownService,
            Self::UnknownMethod { .. } => FaultKind::UnknownMethod,
        }
    }
}

impl From<DispatchError> for Fault {
    fn from(error: DispatchError) -> Self {
        Self::new(error.fault_kind(), error.to_string())
    }
}
