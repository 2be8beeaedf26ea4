//! # PlayerSync Core
//!
//! Client-side player data store with change tracking.
//!
//! This crate provides:
//! - `ValueCell`, a closed set of scalar value types
//! - Key validation matching the backend's column-name rules
//! - `DataStore`, holding live values and a snapshot of the last saved state
//! - Diffing of live state against the snapshot into a minimal `Changeset`
//! - Metadata key detection for backend bookkeeping fields
//!
//! This crate performs no I/O.
//!
//! ## Key Invariants
//!
//! - Invalid keys never enter the store through `set`
//! - A changeset never contains an invalid key
//! - The snapshot is only replaced whole, never edited
//! - `diff()` is empty right after `commit()` or `apply_remote()`

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changeset;
mod error;
mod key;
mod metadata;
mod store;
mod value;

pub use changeset::Changeset;
pub use error::{StoreError, StoreResult};
pub use key::{is_valid_key, validate_key, InvalidKeyReason};
pub use metadata::is_metadata_key;
pub use store::{DataStore, DEFAULT_ENTRIES};
pub use value::{FromValue, ValueCell, ValueKind};
