//! Errors raised while decoding or encoding frames.

use thiserror::Error;

/// Errors surfaced by a [`ProtocolCodec`](super::ProtocolCodec).
#[derive(Debug, Error)]
pub enum CodecError {
    /// The frame is not valid in the codec's syntax.
    #[error("malformed frame: {message}")]
    Malformed {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The frame parsed but does not carry a routable request.
    #[error("invalid request structure: {message}")]
    InvalidStructure { message: String },

    /// The handler result cannot be represented by the codec.
    #[error("invalid handler result: {message}")]
    InvalidResult { message: String },

    /// Serialising the outbound frame failed.
    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CodecError {
    /// Creates a malformed-frame error from a JSON parse failure.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed-frame error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Creates an invalid result error.
    pub fn invalid_result(message: impl Into<String>) -> Self {
        Self::InvalidResult {
            message: message.into(),
        }
    }
}
