//! # PlayerSync Protocol
//!
//! Wire format shared by the sync client and the reference backend.
//!
//! This crate provides:
//! - JSON encoding of save bodies (object of key → scalar)
//! - JSON decoding of load bodies, with shape checking
//! - JSON encoding of delete bodies (array of keys)
//! - Acknowledgement bodies
//! - Endpoint paths and header names
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod endpoint;
mod error;
mod messages;

pub use endpoint::{
    account_path, delete_path, parse_route, validate_player_id, Route, API_KEY_HEADER,
    CONTENT_TYPE_JSON, SESSION_TOKEN_HEADER,
};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{decode_delete, decode_mapping, encode_delete, encode_mapping, AckBody};
