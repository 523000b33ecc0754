//! Service registry keyed by service identifier.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::codec::Route;
use crate::dispatch::DispatchError;
use crate::ids::ServiceId;

use super::description::ServiceDescription;
use super::errors::RegistryError;
use super::handler::MethodHandler;

/// Maps service identifiers to their descriptions.
///
/// The registry is mutable only while the server is being assembled. Serving
/// moves it behind an `Arc`, after which it is read-only.
#[derive(Debug, Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<ServiceId, ServiceDescription>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `description` under its own identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateService`] when the identifier is
    /// taken. The existing registration is left untouched.
    pub fn register(&mut self, description: ServiceDescription) -> Result<(), RegistryError> {
        match self.services.entry(description.id().clone()) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateService {
                service: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(description);
                Ok(())
            }
        }
    }

    /// Looks up a service description.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownService`] when nothing is registered
    /// under `service`.
    pub fn service(&self, service: &str) -> Result<&ServiceDescription, DispatchError> {
        self.services
            .get(service)
            .ok_or_else(|| DispatchError::unknown_service(service))
    }

    /// Resolves the handler for `route`, service first, then method.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownService`] or
    /// [`DispatchError::UnknownMethod`].
    pub fn resolve(&self, route: &Route) -> Result<Arc<dyn MethodHandler>, DispatchError> {
        let description = self.service(route.service().as_str())?;
        description
            .method_handler(route.method().as_str())
            .map(Arc::clone)
    }

    /// Registered descriptions ordered by identifier.
    #[must_use]
    pub fn descriptions(&self) -> Vec<&ServiceDescription> {
        let mut descriptions: Vec<_> = self.services.values().collect();
        descriptions.sort_by(|left, right| left.id().cmp(right.id()));
        descriptions
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` when no service is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
