//! Termination signal handling for the daemon.
//!
//! A [`ShutdownSignal`] is armed with the server's [`ShutdownTrigger`]. When
//! a termination signal arrives the trigger fires and the accept loop winds
//! down; the returned [`SignalGuard`] unregisters the handlers again.

use std::fmt;
use std::io;
use std::thread::{self, JoinHandle};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::{debug, info};

use courier::ShutdownTrigger;

const SHUTDOWN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shutdown");

/// Abstraction over shutdown notification mechanisms.
#[cfg_attr(test, mockall::automock)]
pub trait ShutdownSignal: Send + Sync {
    /// Arranges for `trigger` to fire once shutdown is requested.
    fn arm(&self, trigger: ShutdownTrigger) -> Result<SignalGuard, ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The signal watcher thread could not be spawned.
    #[error("failed to spawn signal watcher: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Keeps signal handlers registered until dropped.
pub struct SignalGuard {
    handle: Option<Handle>,
    watcher: Option<JoinHandle<()>>,
}

impl SignalGuard {
    /// Guard with nothing to release, for signal sources that need no
    /// cleanup.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            handle: None,
            watcher: None,
        }
    }
}

impl fmt::Debug for SignalGuard {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SignalGuard")
            .field("armed", &self.handle.is_some())
            .finish()
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
        if let Some(watcher) = self.watcher.take()
            && watcher.join().is_err()
        {
            debug!(target: SHUTDOWN_TARGET, "signal watcher panicked");
        }
    }
}

/// Shutdown listener that waits for process termination signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn arm(&self, trigger: ShutdownTrigger) -> Result<SignalGuard, ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        let watcher = thread::Builder::new()
            .name("courier-signals".to_owned())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    info!(target: SHUTDOWN_TARGET, signal, "shutdown signal received");
                    trigger.trigger();
                }
            });
        let watcher = match watcher {
            Ok(watcher) => watcher,
            Err(source) => {
                handle.close();
                return Err(ShutdownError::Spawn { source });
            }
        };
        Ok(SignalGuard {
            handle: Some(handle),
            watcher: Some(watcher),
        })
    }
}
