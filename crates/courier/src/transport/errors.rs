//! Listener failures, grouped by the socket family they concern.

use std::fmt;
use std::io;

use thiserror::Error;

/// Step of TCP listener setup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpBindStage {
    /// Host name resolution.
    Resolve,
    /// Binding the resolved address.
    Bind,
}

impl fmt::Display for TcpBindStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolve => "resolve",
            Self::Bind => "bind",
        })
    }
}

/// Step of Unix listener setup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnixBindStage {
    /// Reading metadata of a file already at the path.
    Inspect,
    /// Connecting to an existing socket to see whether a server owns it.
    Contact,
    /// Removing a socket file nobody listens on.
    RemoveStale,
    /// Binding the new listener.
    Bind,
}

impl fmt::Display for UnixBindStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inspect => "inspect existing file at",
            Self::Contact => "contact existing socket at",
            Self::RemoveStale => "remove stale socket at",
            Self::Bind => "bind",
        })
    }
}

/// What already occupies a Unix socket path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    /// Another process is accepting on the socket.
    LiveServer,
    /// The path holds something other than a socket.
    NotSocket,
}

impl fmt::Display for Occupant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LiveServer => "a running server",
            Self::NotSocket => "a file that is not a socket",
        })
    }
}

/// Errors surfaced while binding or running the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// TCP setup failed at `stage`.
    #[error("tcp listener could not {stage} {addr}: {source}")]
    Tcp {
        addr: String,
        stage: TcpBindStage,
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced nothing to bind.
    #[error("{addr} resolved to no addresses")]
    NoAddress { addr: String },
    /// Unix setup failed at `stage`.
    #[error("unix listener could not {stage} {path}: {source}")]
    Unix {
        path: String,
        stage: UnixBindStage,
        #[source]
        source: io::Error,
    },
    /// The Unix socket path is taken and must not be reclaimed.
    #[error("unix socket path {path} is occupied by {occupant}")]
    UnixOccupied { path: String, occupant: Occupant },
    /// This platform has no Unix sockets.
    #[cfg(not(unix))]
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix { endpoint: String },
    /// Switching the bound socket to non-blocking mode failed.
    #[error("failed to configure listener socket: {source}")]
    Configure {
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be started.
    #[error("failed to spawn listener thread: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
    /// The listening socket itself is unusable.
    #[error("listening socket is unusable: {source}")]
    Accept {
        #[source]
        source: io::Error,
    },
    #[error("listener thread panicked")]
    ThreadPanic,
}

impl ListenerError {
    pub(super) fn tcp(addr: impl Into<String>, stage: TcpBindStage, source: io::Error) -> Self {
        Self::Tcp {
            addr: addr.into(),
            stage,
            source,
        }
    }

    #[cfg(unix)]
    pub(super) fn unix(path: impl fmt::Display, stage: UnixBindStage, source: io::Error) -> Self {
        Self::Unix {
            path: path.to_string(),
            stage,
            source,
        }
    }
}
