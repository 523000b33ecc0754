//! Pluggable wire codec contract.
//!
//! A codec turns one raw inbound frame into a [`Request`] (the routing
//! triple: service, method, opaque payload) and turns a [`Response`] back
//! into a raw outbound frame. Codecs are pure: they never touch the
//! connection.
//!
//! Every reply, successful or not, flows through [`ProtocolCodec::encode`]
//! as an [`Outcome`], so protocol and business failures reach the client as
//! ordinary frames.

mod errors;
mod json;
mod message;

pub use self::errors::CodecError;
pub use self::json::JsonCodec;
pub use self::message::{Fault, FaultKind, Outcome, Request, Response, Route};

/// Translates between raw frames and routed requests.
pub trait ProtocolCodec: Send + Sync + 'static {
    /// Decodes one inbound frame.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] when the frame is malformed. The dispatcher
    /// reports it to the client as a [`FaultKind::Decode`] reply.
    fn decode(&self, frame: &[u8]) -> Result<Request, CodecError>;

    /// Encodes one outbound frame.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] when the response cannot be represented. The
    /// dispatcher then falls back to a plaintext error frame.
    fn encode(&self, response: &Response) -> Result<Vec<u8>, CodecError>;
}
