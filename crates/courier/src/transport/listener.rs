//! Binding endpoints and running the accept thread.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::info;
#[cfg(unix)]
use tracing::warn;

use courier_config::SocketEndpoint;

use super::accept::{AcceptPolicy, accept_until_shutdown};
use super::errors::TcpBindStage;
use super::{ConnectionHandler, ConnectionStream, ListenerError, TRANSPORT_TARGET};

#[cfg(unix)]
use super::errors::{Occupant, UnixBindStage};
#[cfg(unix)]
use std::os::unix::net::UnixListener;

/// A bound, not yet accepting, listening socket.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: SocketEndpoint,
    socket: BoundSocket,
}

#[derive(Debug)]
enum BoundSocket {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl BoundSocket {
    fn set_nonblocking(&self) -> io::Result<()> {
        match self {
            Self::Tcp(socket) => socket.set_nonblocking(true),
            #[cfg(unix)]
            Self::Unix(socket) => socket.set_nonblocking(true),
        }
    }

    /// Polls for one client; `Ok(None)` when nobody is waiting.
    fn poll_accept(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match self {
            Self::Tcp(socket) => socket.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                stream.set_nodelay(true)?;
                Ok(ConnectionStream::Tcp(stream))
            }),
            #[cfg(unix)]
            Self::Unix(socket) => socket.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::Unix(stream))
            }),
        };
        match accepted {
            Ok(stream) => Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

impl SocketListener {
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let socket = match endpoint {
            SocketEndpoint::Tcp { host, port } => BoundSocket::Tcp(bind_tcp(host, *port)?),
            #[cfg(unix)]
            SocketEndpoint::Unix { path } => BoundSocket::Unix(unix::bind(path.as_std_path())?),
            #[cfg(not(unix))]
            SocketEndpoint::Unix { .. } => {
                return Err(ListenerError::UnsupportedUnix {
                    endpoint: endpoint.to_string(),
                });
            }
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            socket,
        })
    }

    /// Bound TCP address; `None` for Unix sockets.
    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &self.socket {
            BoundSocket::Tcp(socket) => socket.local_addr().ok(),
            #[cfg(unix)]
            BoundSocket::Unix(_) => None,
        }
    }

    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        if let Err(source) = self.socket.set_nonblocking() {
            remove_socket_file(&self.endpoint);
            return Err(ListenerError::Configure { source });
        }

        let stop = Arc::new(AtomicBool::new(false));
        let endpoint = self.endpoint.clone();
        let thread = thread::Builder::new()
            .name(String::from("courier-listener"))
            .spawn({
                let stop = Arc::clone(&stop);
                move || self.serve(&stop, &handler)
            })
            .map_err(|source| {
                remove_socket_file(&endpoint);
                ListenerError::Spawn { source }
            })?;
        Ok(ListenerHandle {
            stop,
            thread: Some(thread),
        })
    }

    fn serve(
        self,
        stop: &AtomicBool,
        handler: &Arc<dyn ConnectionHandler>,
    ) -> Result<(), ListenerError> {
        info!(
            target: TRANSPORT_TARGET,
            endpoint = %self.endpoint,
            "socket listener active"
        );
        let outcome = accept_until_shutdown(
            || self.socket.poll_accept(),
            stop,
            handler,
            AcceptPolicy::DEFAULT,
        );
        remove_socket_file(&self.endpoint);
        info!(
            target: TRANSPORT_TARGET,
            endpoint = %self.endpoint,
            "socket listener stopped"
        );
        outcome
    }
}

/// Cloneable request to stop a running listener.
///
/// Triggering only stops the accept loop; connections already accepted keep
/// running until their clients disconnect.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    flag: Arc<AtomicBool>,
}

impl ShutdownTrigger {
    /// Asks the accept loop to stop at its next poll.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Owner of the accept thread. Dropping it requests shutdown.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<(), ListenerError>>>,
}

impl ListenerHandle {
    pub(crate) fn trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger {
            flag: Arc::clone(&self.stop),
        }
    }

    pub(crate) fn shutdown(&self) {
        self.trigger().trigger();
    }

    /// Waits for the accept loop, returning the error that ended it.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        self.thread.take().map_or(Ok(()), |thread| {
            thread.join().unwrap_or(Err(ListenerError::ThreadPanic))
        })
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let label = format!("{host}:{port}");
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::tcp(label.as_str(), TcpBindStage::Resolve, source))?
        .next()
        .ok_or_else(|| ListenerError::NoAddress {
            addr: label.clone(),
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::tcp(label, TcpBindStage::Bind, source))
}

#[cfg(unix)]
mod unix {
    use std::fs;
    use std::io;
    use std::os::unix::fs::FileTypeExt;
    use std::os::unix::net::{UnixListener, UnixStream};
    use std::path::Path;

    use super::{ListenerError, Occupant, UnixBindStage};

    pub(super) fn bind(path: &Path) -> Result<UnixListener, ListenerError> {
        reclaim(path)?;
        UnixListener::bind(path)
            .map_err(|source| ListenerError::unix(path.display(), UnixBindStage::Bind, source))
    }

    /// Clears a leftover socket at `path` so it can be bound again.
    ///
    /// Anything that is not a socket, or a socket with a live server behind
    /// it, is left alone and reported.
    fn reclaim(path: &Path) -> Result<(), ListenerError> {
        let occupied = |occupant| ListenerError::UnixOccupied {
            path: path.display().to_string(),
            occupant,
        };
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(ListenerError::unix(path.display(), UnixBindStage::Inspect, source));
            }
        };
        if !metadata.file_type().is_socket() {
            return Err(occupied(Occupant::NotSocket));
        }
        match UnixStream::connect(path) {
            Ok(_) => Err(occupied(Occupant::LiveServer)),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
                ) =>
            {
                fs::remove_file(path).map_err(|source| {
                    ListenerError::unix(path.display(), UnixBindStage::RemoveStale, source)
                })
            }
            Err(source) => Err(ListenerError::unix(
                path.display(),
                UnixBindStage::Contact,
                source,
            )),
        }
    }
}

/// Removes the socket file of a Unix endpoint; TCP endpoints are ignored.
#[cfg(unix)]
fn remove_socket_file(endpoint: &SocketEndpoint) {
    let SocketEndpoint::Unix { path } = endpoint else {
        return;
    };
    match std::fs::remove_file(path.as_std_path()) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => warn!(
            target: TRANSPORT_TARGET,
            error = %error,
            path = %path,
            "failed to remove unix socket file"
        ),
        _ => {}
    }
}

#[cfg(not(unix))]
fn remove_socket_file(_endpoint: &SocketEndpoint) {}
