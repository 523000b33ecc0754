//! Setup-time errors raised while building the service registry.

use thiserror::Error;

use crate::ids::{EmptyIdentifier, MethodId, ServiceId};

/// Errors surfaced while describing services or registering them.
///
/// These are fatal to the registration call that raised them and never reach
/// a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A service with the same identifier is already registered.
    #[error("service '{service}' is already registered")]
    DuplicateService { service: ServiceId },

    /// The description already holds a handler for this method.
    #[error("method '{method}' is already registered on service '{service}'")]
    DuplicateMethod { service: ServiceId, method: MethodId },

    /// A service or method identifier was empty.
    #[error(transparent)]
    EmptyIdentifier(#[from] EmptyIdentifier),
}
