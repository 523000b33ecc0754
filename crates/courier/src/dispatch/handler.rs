//! Connection handler running one dispatch loop per WebSocket.
//!
//! The accept loop hands every stream to [`DispatchConnectionHandler`] on a
//! dedicated thread. The handler upgrades the stream, then reads, dispatches
//! and replies until the client goes away. Only transport failures end the
//! loop; everything else becomes a reply frame.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};
use tungstenite::Error as WsError;
use tungstenite::protocol::WebSocketConfig;

use crate::server::ServerSettings;
use crate::transport::{ConnectionHandler, ConnectionStream};

use super::connection::Connection;
use super::router::{DISPATCH_TARGET, Dispatcher};

/// Why a dispatch loop ended.
#[derive(Debug)]
enum CloseReason {
    Peer,
    Idle,
    Read(WsError),
    Write(WsError),
}

/// Upgrades accepted streams and runs their dispatch loops.
#[derive(Debug)]
pub(crate) struct DispatchConnectionHandler {
    dispatcher: Dispatcher,
    settings: ServerSettings,
    next_id: AtomicU64,
}

impl DispatchConnectionHandler {
    pub(crate) fn new(dispatcher: Dispatcher, settings: ServerSettings) -> Self {
        Self {
            dispatcher,
            settings,
            next_id: AtomicU64::new(1),
        }
    }

    fn websocket_config(&self) -> WebSocketConfig {
        let limit = Some(self.settings.max_frame_bytes());
        WebSocketConfig::default()
            .max_message_size(limit)
            .max_frame_size(limit)
    }

    fn upgrade(&self, id: u64, peer: &str, stream: ConnectionStream) -> Option<Connection> {
        if let Err(error) = stream.set_read_timeout(self.settings.idle_timeout()) {
            warn!(
                target: DISPATCH_TARGET,
                connection = id,
                peer = %peer,
                %error,
                "failed to configure connection"
            );
            return None;
        }
        match tungstenite::accept_with_config(stream, Some(self.websocket_config())) {
            Ok(socket) => Some(Connection::new(id, socket)),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    connection = id,
                    peer = %peer,
                    %error,
                    "websocket upgrade failed"
                );
                None
            }
        }
    }

    fn run(&self, connection: &mut Connection) -> CloseReason {
        loop {
            let frame = match connection.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return CloseReason::Peer,
                Err(error) if is_idle_timeout(&error) => return CloseReason::Idle,
                Err(error) => return CloseReason::Read(error),
            };
            let reply = self.dispatcher.dispatch(frame.bytes());
            if let Err(error) = connection.send(frame.kind(), reply) {
                return CloseReason::Write(error);
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let peer = stream.peer();
        let Some(mut connection) = self.upgrade(id, &peer, stream) else {
            return;
        };
        info!(target: DISPATCH_TARGET, connection = id, peer = %peer, "connection opened");

        match self.run(&mut connection) {
            CloseReason::Peer => {
                debug!(target: DISPATCH_TARGET, connection = id, "client closed connection");
            }
            CloseReason::Idle => {
                info!(target: DISPATCH_TARGET, connection = id, "closing idle connection");
            }
            CloseReason::Read(error) => {
                warn!(target: DISPATCH_TARGET, connection = id, %error, "failed to read frame");
            }
            CloseReason::Write(error) => {
                warn!(target: DISPATCH_TARGET, connection = id, %error, "failed to write reply");
            }
        }
        drop(connection);
        info!(target: DISPATCH_TARGET, connection = id, "connection closed");
    }
}

fn is_idle_timeout(error: &WsError) -> bool {
    matches!(
        error,
        WsError::Io(source)
            if matches!(source.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
    )
}
