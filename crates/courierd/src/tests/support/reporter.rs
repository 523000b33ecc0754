//! Test double for [`HealthReporter`] that records lifecycle events.

use std::net::SocketAddr;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use courier::{ServeError, SocketEndpoint};
use courier_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ServerListening(Option<SocketAddr>),
    ServerStopped,
    ServerFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
    changed: Condvar,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
        self.changed.notify_all();
    }

    /// Blocks until the server reports its bound TCP address.
    pub fn wait_for_listening(&self) -> SocketAddr {
        let events = self.events.lock().expect("health reporter mutex poisoned");
        let (events, timeout) = self
            .changed
            .wait_timeout_while(events, Duration::from_secs(5), |events| {
                !events
                    .iter()
                    .any(|event| matches!(event, HealthEvent::ServerListening(Some(_))))
            })
            .expect("health reporter mutex poisoned");
        assert!(!timeout.timed_out(), "server never reported listening");
        events
            .iter()
            .find_map(|event| match event {
                HealthEvent::ServerListening(addr) => *addr,
                _ => None,
            })
            .expect("listening event carries an address")
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn server_listening(&self, _endpoint: &SocketEndpoint, local_addr: Option<SocketAddr>) {
        self.record(HealthEvent::ServerListening(local_addr));
    }

    fn server_stopped(&self) {
        self.record(HealthEvent::ServerStopped);
    }

    fn server_failed(&self, error: &ServeError) {
        self.record(HealthEvent::ServerFailed(error.to_string()));
    }
}
