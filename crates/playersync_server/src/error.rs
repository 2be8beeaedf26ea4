//! Error types for the reference backend.

use playersync_core::InvalidKeyReason;
use playersync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A key in a save body was rejected.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: InvalidKeyReason,
    },

    /// The record would exceed the property limit.
    #[error("too many properties: {count} > {max}")]
    TooManyProperties {
        /// Application keys after the merge.
        count: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Missing or wrong API key.
    #[error("invalid api key")]
    InvalidApiKey,

    /// Missing or wrong session token.
    #[error("invalid session token")]
    InvalidSessionToken,

    /// The player has no record.
    #[error("no record for player {0}")]
    NotFound(String),

    /// No endpoint at this path.
    #[error("no route for {method} {path}")]
    NoRoute {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// The body could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_)
            | ServerError::InvalidKey { .. }
            | ServerError::TooManyProperties { .. }
            | ServerError::Protocol(_) => 400,
            ServerError::InvalidApiKey | ServerError::InvalidSessionToken => 401,
            ServerError::NotFound(_) | ServerError::NoRoute { .. } => 404,
            ServerError::Internal(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
        assert_eq!(ServerError::InvalidSessionToken.status(), 401);
        assert_eq!(ServerError::NotFound("p1".into()).status(), 404);
        assert_eq!(ServerError::from(ProtocolError::decode("eof")).status(), 400);
    }

    #[test]
    fn error_display() {
        let err = ServerError::TooManyProperties { count: 300, max: 252 };
        let msg = err.to_string();
        assert!(msg.contains("300"));
        assert!(msg.contains("252"));

        let err = ServerError::InvalidKey {
            key: "9lives".into(),
            reason: InvalidKeyReason::StartsWithDigit,
        };
        assert!(err.to_string().contains("9lives"));
    }
}
