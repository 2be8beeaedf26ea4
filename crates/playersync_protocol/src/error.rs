//! Error types for the wire protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire bodies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A body could not be encoded.
    #[error("encoding failed: {message}")]
    Encode {
        /// Description of the failure.
        message: String,
    },

    /// A body was not valid JSON of the expected type.
    #[error("decoding failed: {message}")]
    Decode {
        /// Description of the failure.
        message: String,
    },

    /// A body was valid JSON but had the wrong shape.
    #[error("unexpected {found} where {expected} was expected{}", at_key(.key))]
    UnexpectedShape {
        /// What the protocol requires.
        expected: &'static str,
        /// What the body contained.
        found: &'static str,
        /// The entry the problem was found under, if any.
        key: Option<String>,
    },

    /// A player id cannot be placed in a URL path.
    #[error("invalid player id {0:?}")]
    InvalidPlayerId(String),
}

fn at_key(key: &Option<String>) -> String {
    key.as_ref()
        .map(|k| format!(" at key {k:?}"))
        .unwrap_or_default()
}

impl ProtocolError {
    /// Creates an encoding error.
    pub fn encode(message: impl ToString) -> Self {
        Self::Encode {
            message: message.to_string(),
        }
    }

    /// Creates a decoding error.
    pub fn decode(message: impl ToString) -> Self {
        Self::Decode {
            message: message.to_string(),
        }
    }
}
