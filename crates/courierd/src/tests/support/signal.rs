//! Shutdown signal doubles driven by the test rather than the OS.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use courier::ShutdownTrigger;

use crate::shutdown::{ShutdownError, ShutdownSignal, SignalGuard};

/// Requests shutdown as soon as it is armed.
pub struct ImmediateShutdownSignal;

impl ShutdownSignal for ImmediateShutdownSignal {
    fn arm(&self, trigger: ShutdownTrigger) -> Result<SignalGuard, ShutdownError> {
        trigger.trigger();
        Ok(SignalGuard::detached())
    }
}

/// Holds the armed trigger until the test fires it.
#[derive(Clone, Default)]
pub struct ManualShutdownSignal {
    slot: Arc<Mutex<Option<ShutdownTrigger>>>,
}

impl ManualShutdownSignal {
    /// Fires the trigger, waiting briefly for the daemon to arm it.
    pub fn fire(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(trigger) = self.slot.lock().expect("signal mutex poisoned").as_ref() {
                trigger.trigger();
                return;
            }
            assert!(Instant::now() < deadline, "shutdown signal never armed");
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl ShutdownSignal for ManualShutdownSignal {
    fn arm(&self, trigger: ShutdownTrigger) -> Result<SignalGuard, ShutdownError> {
        *self.slot.lock().expect("signal mutex poisoned") = Some(trigger);
        Ok(SignalGuard::detached())
    }
}
