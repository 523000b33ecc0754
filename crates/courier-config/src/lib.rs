//! Shared configuration for the Courier dispatch server.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults, then a
//! TOML file (`--config-path` or `COURIER_CONFIG_PATH`), then `COURIER_*`
//! environment variables, then command-line flags such as
//! `--listen-socket tcp://0.0.0.0:9780`.

use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod socket;

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAX_FRAME_BYTES, DEFAULT_TCP_PORT,
    default_idle_timeout_secs, default_listen_socket, default_log_filter_string,
    default_log_format, default_max_frame_bytes,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{ParseFailure, SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "COURIER")]
pub struct Config {
    /// Endpoint the dispatch server listens on.
    #[ortho_config(default = default_listen_socket())]
    pub listen_socket: SocketEndpoint,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Largest inbound frame, in bytes.
    #[ortho_config(default = default_max_frame_bytes())]
    pub max_frame_bytes: usize,
    /// Seconds a connection may stay silent before it is closed; zero disables.
    #[ortho_config(default = default_idle_timeout_secs())]
    pub idle_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_socket: default_listen_socket(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            max_frame_bytes: default_max_frame_bytes(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the program name. The merged result is
    /// checked with [`Config::validate`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = <Self as OrthoConfig>::load_from_iter(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the server cannot run with.
    ///
    /// A zero `max_frame_bytes` would refuse every inbound frame.
    pub fn validate(&self) -> Result<(), Arc<OrthoError>> {
        if self.max_frame_bytes == 0 {
            return Err(Arc::new(OrthoError::Validation {
                key: String::from("max_frame_bytes"),
                message: String::from("must be at least one byte"),
            }));
        }
        Ok(())
    }

    /// Endpoint the dispatch server listens on.
    #[must_use]
    pub fn listen_socket(&self) -> &SocketEndpoint {
        &self.listen_socket
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Largest inbound frame, in bytes.
    #[must_use]
    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    /// Idle read timeout, or `None` when disabled.
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_loopback_tcp() {
        let config = Config::default();
        assert_eq!(
            config.listen_socket(),
            &SocketEndpoint::tcp(DEFAULT_HOST, DEFAULT_TCP_PORT)
        );
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.max_frame_bytes(), DEFAULT_MAX_FRAME_BYTES);
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_frame_limit_fails_validation() {
        let config = Config {
            max_frame_bytes: 0,
            ..Config::default()
        };
        let error = config.validate().expect_err("zero limit is rejected");
        assert!(matches!(
            error.as_ref(),
            OrthoError::Validation { key, .. } if key == "max_frame_bytes"
        ));
    }

    #[test]
    fn zero_idle_timeout_disables_timeout() {
        let config = Config::default();
        assert!(config.idle_timeout().is_none());

        let config = Config {
            idle_timeout_secs: 30,
            ..Config::default()
        };
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(30)));
    }
}
