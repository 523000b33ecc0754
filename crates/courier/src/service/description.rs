//! Service descriptions: a named table of method handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dispatch::DispatchError;
use crate::ids::{MethodId, ServiceId};

use super::errors::RegistryError;
use super::handler::MethodHandler;

/// A named collection of method handlers.
///
/// Built once through [`ServiceDescription::builder`] and immutable
/// afterwards, so lookups from many connections never race with writes.
#[derive(Clone)]
pub struct ServiceDescription {
    id: ServiceId,
    methods: HashMap<MethodId, Arc<dyn MethodHandler>>,
}

impl ServiceDescription {
    /// Starts describing the service `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyIdentifier`] when `id` is blank.
    pub fn builder(id: impl Into<String>) -> Result<ServiceBuilder, RegistryError> {
        Ok(ServiceBuilder {
            id: ServiceId::new(id)?,
            methods: HashMap::new(),
        })
    }

    /// Identifier the service is registered under.
    #[must_use]
    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    /// Looks up the handler bound to `method`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownMethod`] when no handler is bound.
    pub fn method_handler(&self, method: &str) -> Result<&Arc<dyn MethodHandler>, DispatchError> {
        self.methods
            .get(method)
            .ok_or_else(|| DispatchError::unknown_method(self.id.as_str(), method))
    }

    /// Method identifiers in lexical order.
    #[must_use]
    pub fn method_ids(&self) -> Vec<&MethodId> {
        let mut ids: Vec<_> = self.methods.keys().collect();
        ids.sort();
        ids
    }

    /// Number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` when the service has no methods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for ServiceDescription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServiceDescription")
            .field("id", &self.id)
            .field("methods", &self.method_ids())
            .finish()
    }
}

/// Collects method handlers for a [`ServiceDescription`].
pub struct ServiceBuilder {
    id: ServiceId,
    methods: HashMap<MethodId, Arc<dyn MethodHandler>>,
}

impl ServiceBuilder {
    /// Binds `handler` to the method `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateMethod`] when `id` is already bound
    /// (the first binding is kept) and [`RegistryError::EmptyIdentifier`]
    /// when `id` is blank.
    pub fn method<H>(self, id: impl Into<String>, handler: H) -> Result<Self, RegistryError>
    where
        H: MethodHandler + 'static,
    {
        self.shared_method(id, Arc::new(handler))
    }

    /// Binds an already shared handler to the method `id`.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceBuilder::method`].
    pub fn shared_method(
        mut self,
        id: impl Into<String>,
        handler: Arc<dyn MethodHandler>,
    ) -> Result<Self, RegistryError> {
        let method = MethodId::new(id)?;
        if self.methods.contains_key(method.as_str()) {
            return Err(RegistryError::DuplicateMethod {
                service: self.id.clone(),
                method,
            });
        }
        self.methods.insert(method, handler);
        Ok(self)
    }

    /// Freezes the description.
    #[must_use]
    pub fn build(self) -> ServiceDescription {
        ServiceDescription {
            id: self.id,
            methods: self.methods,
        }
    }
}
