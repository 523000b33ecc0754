//! Courier dispatch daemon.
//!
//! The daemon wraps a [`courier::Server`] in the operational plumbing a
//! long-running process needs: layered configuration, structured telemetry,
//! lifecycle health events and signal-driven shutdown. Start-up runs in a
//! fixed order:
//!
//! 1. load [`courier_config::Config`] through a [`ConfigLoader`];
//! 2. install the global `tracing` subscriber;
//! 3. prepare the listen socket's directory;
//! 4. register services, including the built-in `system` service;
//! 5. serve until SIGTERM, SIGINT, SIGQUIT or SIGHUP arrives.
//!
//! Every stage reports to a [`HealthReporter`] so operators can see where a
//! failed start stopped.

mod bootstrap;
mod health;
mod shutdown;
mod system;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, DaemonError, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use shutdown::{ShutdownError, ShutdownSignal, SignalGuard, SystemShutdownSignal};
pub use system::{SYSTEM_SERVICE, register_system_service};
pub use telemetry::{TelemetryError, TelemetryHandle};

use std::sync::Arc;

use courier::{JsonCodec, Server, ServerSettings};

/// Runs the daemon with the process configuration until shutdown.
///
/// # Errors
///
/// Returns [`DaemonError`] when bootstrap fails, the server cannot serve its
/// endpoint or signal handlers cannot be installed.
pub fn run_daemon() -> Result<(), DaemonError> {
    let daemon = bootstrap_with(&SystemConfigLoader, Arc::new(StructuredHealthReporter))?;
    let mut server = Server::with_settings(JsonCodec, ServerSettings::from_config(daemon.config()));
    register_system_service(&mut server)?;
    daemon.run(server)
}

#[cfg(test)]
mod tests;
