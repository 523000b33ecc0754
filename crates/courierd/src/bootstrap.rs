//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use courier::{RegistryError, ServeError, Server};
use courier_config::{Config, SocketPreparationError};

use crate::health::HealthReporter;
use crate::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the daemon configuration.
pub trait ConfigLoader: Send + Sync {
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Reads process arguments, `COURIER_*` variables and the config file.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Hands out a configuration built in code, for embedding and tests.
///
/// The configuration is still validated by [`bootstrap_with`].
#[derive(Debug, Clone)]
pub struct StaticConfigLoader(Config);

impl StaticConfigLoader {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self(config)
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.0.clone())
    }
}

/// Errors surfaced during bootstrap, one per step.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Loading or validating the configuration failed.
    #[error("failed to load configuration: {source}")]
    Configuration {
        #[source]
        source: Arc<OrthoError>,
    },
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    /// The Unix socket directory could not be created.
    #[error("failed to prepare listen socket: {0}")]
    Socket(#[from] SocketPreparationError),
}

impl From<Arc<OrthoError>> for BootstrapError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Configuration { source }
    }
}

/// Errors that end a daemon run.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Bootstrap did not complete.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// A built-in service could not be registered.
    #[error("failed to register built-in service: {0}")]
    Registry(#[from] RegistryError),
    /// The server failed to start or stopped with an error.
    #[error("dispatch server failed: {0}")]
    Serve(#[from] ServeError),
    /// Signal handlers could not be installed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// A bootstrapped daemon, ready to serve.
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("config", &self.config)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

impl Daemon {
    fn new(config: Config, telemetry: TelemetryHandle, reporter: Arc<dyn HealthReporter>) -> Self {
        Self {
            config,
            telemetry,
            reporter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The subscriber that was live when this daemon bootstrapped.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Serves the configured endpoint until a termination signal arrives.
    ///
    /// # Errors
    ///
    /// See [`Daemon::serve`].
    pub fn run(&self, server: Server) -> Result<(), DaemonError> {
        self.serve(server, &SystemShutdownSignal)
    }

    /// Serves the configured endpoint until `signal` requests shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Serve`] when the server cannot bind or its
    /// accept loop fails, and [`DaemonError::Shutdown`] when `signal` cannot
    /// be armed. In the latter case the server is stopped before returning.
    pub fn serve(&self, server: Server, signal: &dyn ShutdownSignal) -> Result<(), DaemonError> {
        let endpoint = self.config.listen_socket();
        let handle = match server.start(endpoint) {
            Ok(handle) => handle,
            Err(error) => {
                self.reporter.server_failed(&error);
                return Err(error.into());
            }
        };
        self.reporter
            .server_listening(handle.endpoint(), handle.local_addr());

        let guard = match signal.arm(handle.shutdown_trigger()) {
            Ok(guard) => guard,
            Err(error) => {
                handle.shutdown();
                if let Err(serve_error) = handle.join() {
                    self.reporter.server_failed(&serve_error);
                }
                return Err(error.into());
            }
        };

        let outcome = handle.join();
        drop(guard);
        match outcome {
            Ok(()) => {
                self.reporter.server_stopped();
                Ok(())
            }
            Err(error) => {
                self.reporter.server_failed(&error);
                Err(error.into())
            }
        }
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// The steps run in order: load and validate the configuration, install
/// telemetry, then create the socket directory. `reporter` hears about the
/// start and about exactly one outcome.
///
/// # Errors
///
/// Returns the [`BootstrapError`] of the first step that fails.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match prepare(loader) {
        Ok((config, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Daemon::new(config, telemetry, reporter))
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn prepare(loader: &dyn ConfigLoader) -> Result<(Config, TelemetryHandle), BootstrapError> {
    let config = loader.load()?;
    config.validate()?;
    let telemetry = telemetry::initialise(&config)?;
    config.listen_socket().prepare_filesystem()?;
    Ok((config, telemetry))
}
