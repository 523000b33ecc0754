//! Lifecycle notifications for the daemon.
//!
//! [`Daemon`](crate::Daemon) and [`bootstrap_with`](crate::bootstrap_with)
//! call a [`HealthReporter`] at each transition. The stock reporter turns
//! them into `tracing` events on the `courierd::health` target, each tagged
//! with a `lifecycle` field so log pipelines can filter on it.

use std::net::SocketAddr;

use courier::{ServeError, SocketEndpoint};
use courier_config::Config;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Receives daemon lifecycle transitions.
///
/// Bootstrap reports `bootstrap_starting` followed by exactly one of
/// `bootstrap_succeeded` or `bootstrap_failed`. A served daemon reports
/// `server_listening` and then `server_stopped` or `server_failed`; a server
/// that never binds reports only `server_failed`.
pub trait HealthReporter: Send + Sync {
    fn bootstrap_starting(&self);

    fn bootstrap_succeeded(&self, config: &Config);

    fn bootstrap_failed(&self, error: &BootstrapError);

    /// `local_addr` is the bound TCP address; `None` for Unix sockets.
    fn server_listening(&self, endpoint: &SocketEndpoint, local_addr: Option<SocketAddr>);

    fn server_stopped(&self);

    fn server_failed(&self, error: &ServeError);
}

/// Reporter that emits one structured `tracing` event per transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(target: HEALTH_TARGET, lifecycle = "bootstrap", "bootstrapping courierd");
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            lifecycle = "ready",
            listen_socket = %config.listen_socket(),
            log_format = %config.log_format(),
            max_frame_bytes = config.max_frame_bytes(),
            idle_timeout = ?config.idle_timeout(),
            "courierd is configured"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            lifecycle = "bootstrap_failed",
            error = %error,
            "courierd could not start"
        );
    }

    fn server_listening(&self, endpoint: &SocketEndpoint, local_addr: Option<SocketAddr>) {
        match local_addr {
            Some(addr) => tracing::info!(
                target: HEALTH_TARGET,
                lifecycle = "listening",
                %endpoint,
                %addr,
                "accepting websocket clients"
            ),
            None => tracing::info!(
                target: HEALTH_TARGET,
                lifecycle = "listening",
                %endpoint,
                "accepting websocket clients"
            ),
        }
    }

    fn server_stopped(&self) {
        tracing::info!(target: HEALTH_TARGET, lifecycle = "stopped", "accept loop finished");
    }

    fn server_failed(&self, error: &ServeError) {
        tracing::error!(
            target: HEALTH_TARGET,
            lifecycle = "failed",
            error = %error,
            "dispatch server failed"
        );
    }
}
