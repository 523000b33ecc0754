//! Listen endpoints for the dispatch server.
//!
//! Endpoints are written as URLs: `tcp://host:port`, `unix:///path/to/socket`,
//! or `ws://host[:port]`, which is shorthand for the TCP endpoint a WebSocket
//! client would dial (port 80 when omitted).

use std::fmt;
use std::fs::DirBuilder;
use std::io;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Address the server listens on before upgrading clients to WebSocket.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum SocketEndpoint {
    /// Unix domain socket endpoint.
    Unix { path: Utf8PathBuf },
    /// TCP socket endpoint.
    Tcp { host: String, port: u16 },
}

impl SocketEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_path()),
            Self::Tcp { .. } => None,
        }
    }

    /// Returns the `ws://` URL a client would dial for TCP endpoints.
    #[must_use]
    pub fn websocket_url(&self) -> Option<String> {
        match self {
            Self::Tcp { host, port } => Some(format!("ws://{host}:{port}/")),
            Self::Unix { .. } => None,
        }
    }

    /// Creates the directory that will hold a Unix socket.
    ///
    /// New directories are created owner-only (`0o700`); existing ones are
    /// left as they are. TCP endpoints need no preparation.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        match self.unix_path() {
            Some(path) => create_private_dir(socket_dir(path)?),
            None => Ok(()),
        }
    }
}

fn socket_dir(path: &Utf8Path) -> Result<&Utf8Path, SocketPreparationError> {
    path.parent()
        .filter(|dir| !dir.as_str().is_empty())
        .ok_or_else(|| SocketPreparationError::NoParent {
            path: path.to_owned(),
        })
}

fn create_private_dir(dir: &Utf8Path) -> Result<(), SocketPreparationError> {
    let fail = |source| SocketPreparationError::CreateDir {
        dir: dir.to_owned(),
        source,
    };
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    std::os::unix::fs::DirBuilderExt::mode(&mut builder, 0o700);
    builder.create(dir).map_err(fail)?;
    if dir.is_dir() {
        Ok(())
    } else {
        Err(fail(io::Error::from(io::ErrorKind::NotADirectory)))
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(f, "unix://{path}"),
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |reason| SocketParseError {
            input: input.to_owned(),
            reason,
        };
        let url = Url::parse(input).map_err(|error| fail(ParseFailure::Url(error)))?;
        match url.scheme() {
            "unix" => match url.path() {
                "" | "/" => Err(fail(ParseFailure::NoPath)),
                path => Ok(Self::unix(path)),
            },
            scheme @ ("tcp" | "ws") => {
                let host = url.host_str().ok_or_else(|| fail(ParseFailure::NoHost))?;
                let port = if scheme == "ws" {
                    url.port_or_known_default()
                } else {
                    url.port()
                };
                let port = port.ok_or_else(|| fail(ParseFailure::NoPort))?;
                Ok(Self::tcp(host, port))
            }
            other => Err(fail(ParseFailure::Scheme(other.to_owned()))),
        }
    }
}

/// Why an endpoint string was rejected.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("{0}")]
    Url(#[source] url::ParseError),
    #[error("scheme '{0}' is not one of tcp, unix or ws")]
    Scheme(String),
    #[error("no host given")]
    NoHost,
    #[error("no port given")]
    NoPort,
    #[error("no socket path given")]
    NoPath,
}

/// An endpoint string that could not be parsed.
#[derive(Debug, Error)]
#[error("invalid listen socket '{input}': {reason}")]
pub struct SocketParseError {
    /// The rejected text.
    pub input: String,
    #[source]
    pub reason: ParseFailure,
}

/// Errors raised while preparing the directory of a Unix socket.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    #[error("socket path '{path}' has no parent directory")]
    NoParent { path: Utf8PathBuf },
    #[error("failed to create socket directory '{dir}': {source}")]
    CreateDir {
        dir: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}
