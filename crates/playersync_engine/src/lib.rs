//! # PlayerSync Engine
//!
//! Cloud synchronization for the PlayerSync data store.
//!
//! This crate provides:
//! - The sync coordinator (load → apply, diff → save → commit, delete, wipe)
//! - Sync statistics
//! - HTTP transport abstraction with a loopback client
//! - A mock transport for tests
//! - Console log channels and a named command registry
//!
//! ## Architecture
//!
//! The coordinator owns the [`DataStore`](playersync_core::DataStore) and
//! talks to the backend through a [`SyncTransport`]. Only the diff between
//! the live state and the last acknowledged snapshot is ever sent on save.
//!
//! ## Key Invariants
//!
//! - The snapshot only moves after the backend acknowledges
//! - A failed save or load leaves the store unchanged
//! - An empty diff never reaches the transport
//! - Deleting remote keys never touches the local store

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod commands;
mod config;
mod console;
mod coordinator;
mod error;
mod http;
mod transport;

pub use commands::{register_sync_commands, CommandError, CommandRegistry};
pub use config::{PlayerSession, SyncConfig};
pub use console::{ChannelLog, ConsoleLog, TracingLog, SYNC_CHANNEL};
pub use coordinator::{
    DeleteOutcome, LoadOutcome, SaveOutcome, SyncCoordinator, SyncStats, WipeOutcome,
};
pub use error::{SyncError, SyncResult, WipeStep};
pub use http::{
    HttpClient, HttpRequest, HttpResponse, HttpTransport, LoopbackClient, LoopbackServer, Method,
};
pub use transport::{Ack, MockCall, MockFailure, MockTransport, SyncTransport};
