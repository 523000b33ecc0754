//! Dispatch server: service registration and the serve entry points.
//!
//! A [`Server`] is assembled in two phases. While it is owned mutably,
//! services are registered into its table. [`Server::start`] and
//! [`Server::serve`] then consume it and freeze the table into an
//! `Arc<ServiceRegistry>` shared by every connection, so no registration can
//! race with lookups.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use courier_config::{Config, DEFAULT_MAX_FRAME_BYTES, SocketEndpoint, SocketPreparationError};

use crate::codec::ProtocolCodec;
use crate::dispatch::{DispatchConnectionHandler, DispatchError, Dispatcher};
use crate::service::{RegistryError, ServiceDescription, ServiceRegistry};
use crate::transport::{ListenerError, ListenerHandle, ShutdownTrigger, SocketListener};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Errors that stop a server from starting or end it while serving.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The Unix socket directory could not be prepared.
    #[error(transparent)]
    Prepare(#[from] SocketPreparationError),

    /// Binding or running the listener failed.
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Connection-level limits applied to every accepted client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    max_frame_bytes: usize,
    idle_timeout: Option<Duration>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            idle_timeout: None,
        }
    }
}

impl ServerSettings {
    /// Derives settings from the resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_frame_bytes: config.max_frame_bytes(),
            idle_timeout: config.idle_timeout(),
        }
    }

    /// Overrides the largest accepted inbound frame.
    #[must_use]
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Overrides the idle read timeout; `None` disables it.
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Largest accepted inbound frame, in bytes.
    #[must_use]
    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    /// Idle read timeout, if any.
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }
}

/// Owns the service table until serving begins.
pub struct Server {
    registry: ServiceRegistry,
    codec: Arc<dyn ProtocolCodec>,
    settings: ServerSettings,
}

impl Server {
    /// Creates a server speaking `codec` with default settings.
    pub fn new<C: ProtocolCodec>(codec: C) -> Self {
        Self::with_settings(codec, ServerSettings::default())
    }

    /// Creates a server speaking `codec` with explicit settings.
    pub fn with_settings<C: ProtocolCodec>(codec: C, settings: ServerSettings) -> Self {
        Self {
            registry: ServiceRegistry::new(),
            codec: Arc::new(codec),
            settings,
        }
    }

    /// Connection limits the server will apply.
    #[must_use]
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Adds a service to the table.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateService`] when the identifier is
    /// already taken; the first registration stays in place.
    pub fn register_service(&mut self, description: ServiceDescription) -> Result<(), RegistryError> {
        let id = description.id().clone();
        self.registry.register(description)?;
        info!(target: SERVER_TARGET, service = %id, "service registered");
        Ok(())
    }

    /// Looks up a registered service.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownService`] when nothing is registered
    /// under `id`.
    pub fn service(&self, id: &str) -> Result<&ServiceDescription, DispatchError> {
        self.registry.service(id)
    }

    /// Registered services ordered by identifier.
    #[must_use]
    pub fn services(&self) -> Vec<&ServiceDescription> {
        self.registry.descriptions()
    }

    /// Binds `endpoint` and accepts connections on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError`] when the socket cannot be prepared or bound.
    pub fn start(self, endpoint: &SocketEndpoint) -> Result<ServerHandle, ServeError> {
        endpoint.prepare_filesystem()?;
        let listener = SocketListener::bind(endpoint)?;
        let local_addr = listener.local_addr();

        let services = self.registry.len();
        let dispatcher = Dispatcher::new(Arc::new(self.registry), self.codec);
        let handler = Arc::new(DispatchConnectionHandler::new(dispatcher, self.settings));
        let listener = listener.start(handler)?;

        info!(
            target: SERVER_TARGET,
            endpoint = %endpoint,
            local_addr = ?local_addr,
            services,
            "dispatch server started"
        );
        Ok(ServerHandle {
            endpoint: endpoint.clone(),
            local_addr,
            listener,
        })
    }

    /// Serves `endpoint` on the calling thread until the listener stops.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError`] when binding fails or the accept loop gives up.
    pub fn serve(self, endpoint: &SocketEndpoint) -> Result<(), ServeError> {
        self.start(endpoint)?.join()
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Server")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Handle to a running server.
///
/// Dropping the handle requests shutdown without waiting for it.
#[derive(Debug)]
pub struct ServerHandle {
    endpoint: SocketEndpoint,
    local_addr: Option<SocketAddr>,
    listener: ListenerHandle,
}

impl ServerHandle {
    /// Endpoint the server was asked to serve.
    #[must_use]
    pub fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Bound TCP address, which resolves port `0` to the real port.
    ///
    /// `None` for Unix socket endpoints.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// `ws://` URL of the bound TCP address.
    #[must_use]
    pub fn websocket_url(&self) -> Option<String> {
        self.local_addr.map(|addr| format!("ws://{addr}/"))
    }

    /// Stops accepting new connections.
    pub fn shutdown(&self) {
        self.listener.shutdown();
    }

    /// Cloneable trigger for stopping the server from elsewhere, such as a
    /// signal handler thread.
    #[must_use]
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.listener.trigger()
    }

    /// Waits for the accept loop to end.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::Listener`] when the accept loop failed rather
    /// than being shut down.
    pub fn join(self) -> Result<(), ServeError> {
        self.listener.join()?;
        info!(target: SERVER_TARGET, endpoint = %self.endpoint, "dispatch server stopped");
        Ok(())
    }
}
