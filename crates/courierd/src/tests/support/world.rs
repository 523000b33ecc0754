//! Scenario state for the bootstrap feature.

use std::sync::Arc;

use courier::{JsonCodec, Server};

use crate::bootstrap::{BootstrapError, Daemon, DaemonError, bootstrap_with};
use crate::system::register_system_service;

use super::config_loader::ScenarioConfig;
use super::reporter::RecordingHealthReporter;
use super::signal::ImmediateShutdownSignal;

enum Stage {
    Configured,
    Running(Daemon),
    Refused(BootstrapError),
}

/// One daemon taken through bootstrap and, optionally, a serve cycle.
pub struct DaemonRun {
    config: ScenarioConfig,
    pub reporter: Arc<RecordingHealthReporter>,
    stage: Stage,
    served: Option<Result<(), DaemonError>>,
}

impl DaemonRun {
    #[must_use]
    pub fn new(config: ScenarioConfig) -> Self {
        Self {
            config,
            reporter: Arc::new(RecordingHealthReporter::default()),
            stage: Stage::Configured,
            served: None,
        }
    }

    /// Starts over with a different configuration source.
    pub fn configure(&mut self, config: ScenarioConfig) {
        *self = Self::new(config);
    }

    /// Bootstraps once; repeated calls keep the first outcome.
    pub fn bootstrap(&mut self) {
        if !matches!(self.stage, Stage::Configured) {
            return;
        }
        self.stage = match bootstrap_with(&self.config, self.reporter.clone()) {
            Ok(daemon) => Stage::Running(daemon),
            Err(error) => Stage::Refused(error),
        };
    }

    /// Serves the system service until an immediate shutdown signal lands.
    pub fn serve(&mut self) {
        let Stage::Running(daemon) = &self.stage else {
            panic!("serving needs a bootstrapped daemon");
        };
        let mut server = Server::new(JsonCodec);
        let outcome = register_system_service(&mut server)
            .map_err(DaemonError::from)
            .and_then(|()| daemon.serve(server, &ImmediateShutdownSignal));
        self.served = Some(outcome);
    }

    /// `None` until bootstrap has run.
    #[must_use]
    pub fn bootstrapped(&self) -> Option<Result<&Daemon, &BootstrapError>> {
        match &self.stage {
            Stage::Configured => None,
            Stage::Running(daemon) => Some(Ok(daemon)),
            Stage::Refused(error) => Some(Err(error)),
        }
    }

    #[must_use]
    pub fn served(&self) -> Option<&Result<(), DaemonError>> {
        self.served.as_ref()
    }
}
