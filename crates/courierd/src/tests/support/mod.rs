//! Doubles and scenario state shared by the daemon suites.

mod config_loader;
mod reporter;
mod signal;
mod world;

pub use config_loader::ScenarioConfig;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use signal::{ImmediateShutdownSignal, ManualShutdownSignal};
pub use world::DaemonRun;
