//! Error types for the data store.

use crate::key::InvalidKeyReason;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by [`DataStore`](crate::DataStore).
///
/// None of these are fatal: a refused write leaves the store unchanged and a
/// failed read falls back to the caller's default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The key was rejected by the validator.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: InvalidKeyReason,
    },

    /// The key is not present.
    #[error("key not found: {0:?}")]
    MissingKey(String),

    /// The stored value does not coerce to the requested type.
    #[error("cannot read key {key:?} as {expected}: stored value is {found}")]
    TypeMismatch {
        /// The key that was read.
        key: String,
        /// The requested type.
        expected: &'static str,
        /// The stored value's kind.
        found: &'static str,
    },
}

impl StoreError {
    /// Returns the validation reason if this is an invalid-key error.
    pub fn invalid_key_reason(&self) -> Option<InvalidKeyReason> {
        match self {
            StoreError::InvalidKey { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
