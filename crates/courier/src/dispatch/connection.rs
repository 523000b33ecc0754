//! Upgraded WebSocket connection owned by one dispatch loop.

use tracing::debug;
use tungstenite::{Error as WsError, Message, WebSocket};

use crate::transport::ConnectionStream;

use super::router::DISPATCH_TARGET;

/// Kind of data frame, echoed on the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Text,
    Binary,
}

/// One inbound data frame.
#[derive(Debug)]
pub(crate) struct Frame {
    kind: FrameKind,
    bytes: Vec<u8>,
}

impl Frame {
    pub(crate) fn kind(&self) -> FrameKind {
        self.kind
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// WebSocket channel released exactly once, when dropped.
pub(crate) struct Connection {
    id: u64,
    socket: WebSocket<ConnectionStream>,
}

impl Connection {
    pub(crate) fn new(id: u64, socket: WebSocket<ConnectionStream>) -> Self {
        Self { id, socket }
    }

    /// Blocks for the next data frame.
    ///
    /// Control frames are handled by the WebSocket layer and skipped.
    /// Returns `Ok(None)` once the peer has closed the channel.
    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>, WsError> {
        loop {
            match self.socket.read() {
                Ok(Message::Text(text)) => {
                    return Ok(Some(Frame {
                        kind: FrameKind::Text,
                        bytes: text.as_bytes().to_vec(),
                    }));
                }
                Ok(Message::Binary(data)) => {
                    return Ok(Some(Frame {
                        kind: FrameKind::Binary,
                        bytes: data.to_vec(),
                    }));
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Ok(Message::Close(_)) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                    return Ok(None);
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Writes one reply frame of the given kind.
    ///
    /// Text replies that are not valid UTF-8 go out as binary frames.
    pub(crate) fn send(&mut self, kind: FrameKind, bytes: Vec<u8>) -> Result<(), WsError> {
        let message = match kind {
            FrameKind::Binary => Message::binary(bytes),
            FrameKind::Text => match String::from_utf8(bytes) {
                Ok(text) => Message::text(text),
                Err(error) => Message::binary(error.into_bytes()),
            },
        };
        self.socket.send(message)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let closed = self.socket.close(None).and_then(|()| self.socket.flush());
        match closed {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {}
            Err(error) => {
                debug!(
                    target: DISPATCH_TARGET,
                    connection = self.id,
                    %error,
                    "close handshake incomplete"
                );
            }
        }
        debug!(target: DISPATCH_TARGET, connection = self.id, "connection released");
    }
}
