//! Error types for the sync engine.

use playersync_core::StoreError;
use playersync_protocol::ProtocolError;
use std::fmt;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// The step of a wipe that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeStep {
    /// Loading the remote record to discover its keys.
    Load,
    /// Deleting the discovered keys.
    Delete,
    /// Saving the default entries back.
    Save,
}

impl fmt::Display for WipeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WipeStep::Load => "load",
            WipeStep::Delete => "delete",
            WipeStep::Save => "save",
        })
    }
}

/// Errors that can occur during sync operations.
///
/// No variant is fatal. After any of them the store is in the state it had
/// before the failing operation (see [`SyncError::Wipe`] for the one
/// multi-step exception).
#[derive(Error, Debug)]
pub enum SyncError {
    /// The backend could not be reached.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The backend answered with a non-success status.
    #[error("server error (code {status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the response body.
        message: String,
    },

    /// A request or response body could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The transport was closed.
    #[error("not connected to server")]
    NotConnected,

    /// A local store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A wipe stopped at `step`; later steps did not run.
    #[error("wipe failed at {step} step: {source}")]
    Wipe {
        /// The failing step.
        step: WipeStep,
        /// The underlying error.
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    pub(crate) fn wipe(step: WipeStep, source: SyncError) -> Self {
        Self::Wipe {
            step,
            source: Box::new(source),
        }
    }

    /// Returns true if repeating the operation might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Server { status, .. } => *status >= 500 || *status == 429,
            SyncError::Wipe { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if the backend has no record for the player.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::Server { status: 404, .. })
    }

    /// Returns true if the backend replied with a body that could not be read.
    pub fn is_serialization(&self) -> bool {
        match self {
            SyncError::Serialization(_) => true,
            SyncError::Wipe { source, .. } => source.is_serialization(),
            _ => false,
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidPlayerId(_) => SyncError::InvalidRequest(err.to_string()),
            _ => SyncError::Serialization(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::Server {
            status: 503,
            message: "busy".into()
        }
        .is_retryable());
        assert!(!SyncError::Server {
            status: 400,
            message: "bad key".into()
        }
        .is_retryable());
        assert!(!SyncError::Serialization("garbage".into()).is_retryable());
        assert!(SyncError::wipe(WipeStep::Save, SyncError::transport_retryable("x")).is_retryable());
    }

    #[test]
    fn serialization_is_distinct_from_transport() {
        let err: SyncError = ProtocolError::decode("expected value at line 1").into();
        assert!(err.is_serialization());
        assert!(!SyncError::transport_retryable("timeout").is_serialization());

        let err: SyncError = ProtocolError::InvalidPlayerId("a/b".into()).into();
        assert!(matches!(err, SyncError::InvalidRequest(_)));
    }

    #[test]
    fn error_display() {
        let err = SyncError::NotConnected;
        assert_eq!(err.to_string(), "not connected to server");

        let err = SyncError::wipe(
            WipeStep::Delete,
            SyncError::Server {
                status: 500,
                message: "boom".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "wipe failed at delete step: server error (code 500): boom"
        );
    }
}
