//! Accept loop and its failure policy.
//!
//! Accept errors fall into three groups. Errors tied to a single client that
//! gave up mid-handshake are retried at once. Errors about the listening
//! socket itself (a closed or invalid descriptor) can never heal, so they end
//! the loop. Everything else, notably descriptor or memory exhaustion
//! (`EMFILE`, `ENFILE`, `ENOBUFS`, `ENOMEM`), is retried with an exponential
//! backoff that resets after the next successful accept. The listener only
//! stops for those when shutdown is requested.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{ConnectionHandler, ConnectionStream, ListenerError, TRANSPORT_TARGET};

/// Pacing of the accept loop.
#[derive(Debug, Clone, Copy)]
pub(super) struct AcceptPolicy {
    /// Sleep between polls when no client is waiting.
    pub(super) idle_poll: Duration,
    /// First pause after a retryable failure.
    pub(super) first_backoff: Duration,
    /// Ceiling for the doubling pause.
    pub(super) max_backoff: Duration,
}

impl AcceptPolicy {
    pub(super) const DEFAULT: Self = Self {
        idle_poll: Duration::from_millis(25),
        first_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_secs(1),
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AcceptFailure {
    /// One client went away; try again immediately.
    Transient,
    /// The host is short of something; wait and try again.
    Retry,
    /// The listening socket is broken.
    Fatal,
}

pub(super) fn classify(error: &io::Error) -> AcceptFailure {
    match error.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => return AcceptFailure::Transient,
        _ => {}
    }
    if broken_listener(error) {
        AcceptFailure::Fatal
    } else {
        AcceptFailure::Retry
    }
}

#[cfg(unix)]
fn broken_listener(error: &io::Error) -> bool {
    error
        .raw_os_error()
        .is_some_and(|code| matches!(code, libc::EBADF | libc::EINVAL | libc::ENOTSOCK))
}

#[cfg(not(unix))]
fn broken_listener(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::InvalidInput
}

/// Doubling delay between retryable failures.
#[derive(Debug)]
pub(super) struct Backoff {
    first: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub(super) fn new(policy: &AcceptPolicy) -> Self {
        Self {
            first: policy.first_backoff,
            max: policy.max_backoff,
            next: policy.first_backoff,
        }
    }

    /// Returns the pause to take now and doubles the following one.
    pub(super) fn step(&mut self) -> Duration {
        let current = self.next;
        self.next = current.saturating_mul(2).min(self.max);
        current
    }

    pub(super) fn reset(&mut self) {
        self.next = self.first;
    }
}

/// Drives `accept` until shutdown is requested or the socket breaks.
pub(super) fn accept_until_shutdown<A>(
    mut accept: A,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
    policy: AcceptPolicy,
) -> Result<(), ListenerError>
where
    A: FnMut() -> io::Result<Option<ConnectionStream>>,
{
    let mut backoff = Backoff::new(&policy);
    let mut failing = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        let error = match accept() {
            Ok(Some(stream)) => {
                if failing.take().is_some() {
                    info!(target: TRANSPORT_TARGET, "socket accept recovered");
                }
                backoff.reset();
                spawn_connection(stream, handler);
                continue;
            }
            Ok(None) => {
                pause(shutdown, policy.idle_poll, policy.idle_poll);
                continue;
            }
            Err(error) => error,
        };

        match classify(&error) {
            AcceptFailure::Transient => {
                debug!(
                    target: TRANSPORT_TARGET,
                    error = %error,
                    "client vanished during accept"
                );
            }
            AcceptFailure::Fatal => {
                warn!(
                    target: TRANSPORT_TARGET,
                    error = %error,
                    "listening socket is unusable; stopping listener"
                );
                return Err(ListenerError::Accept { source: error });
            }
            AcceptFailure::Retry => {
                let delay = backoff.step();
                if failing.replace(error.kind()) != Some(error.kind()) {
                    warn!(
                        target: TRANSPORT_TARGET,
                        error = %error,
                        "socket accept error; retrying with backoff"
                    );
                } else {
                    debug!(
                        target: TRANSPORT_TARGET,
                        error = %error,
                        delay = ?delay,
                        "socket accept still failing"
                    );
                }
                pause(shutdown, delay, policy.idle_poll);
            }
        }
    }
    Ok(())
}

/// Sleeps for `total`, waking every `slice` to honour shutdown.
fn pause(shutdown: &AtomicBool, total: Duration, slice: Duration) {
    let deadline = Instant::now() + total;
    loop {
        let now = Instant::now();
        if now >= deadline || shutdown.load(Ordering::SeqCst) {
            return;
        }
        let remaining = deadline - now;
        thread::sleep(if slice.is_zero() {
            remaining
        } else {
            remaining.min(slice)
        });
    }
}

fn spawn_connection(stream: ConnectionStream, handler: &Arc<dyn ConnectionHandler>) {
    let handler = Arc::clone(handler);
    let spawned = thread::Builder::new()
        .name(String::from("courier-connection"))
        .spawn(move || handler.handle(stream));
    if let Err(error) = spawned {
        warn!(
            target: TRANSPORT_TARGET,
            error = %error,
            "failed to spawn connection thread; dropping connection"
        );
    }
}
