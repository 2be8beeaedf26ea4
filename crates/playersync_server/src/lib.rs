//! # PlayerSync Server
//!
//! In-memory reference backend for PlayerSync.
//!
//! This crate provides:
//! - Account endpoints (load, save, delete keys)
//! - One record per player, merged on save
//! - API key and session token checks
//! - Table-storage style metadata stamping
//!
//! # Architecture
//!
//! The server is transport-agnostic: [`SyncServer::handle`] takes a
//! [`ServerRequest`] (method, path, credentials, body) and returns a
//! [`ServerResponse`]. Wiring it to a real listener or to an in-process
//! loopback client is the caller's job.
//!
//! # Protocol
//!
//! - `GET  /api/v1/players/{id}/account` returns the record as a JSON object
//! - `POST /api/v1/players/{id}/account` merges a JSON object into the record
//! - `POST /api/v1/players/{id}/account/delete` removes a JSON array of keys
//!
//! Save and delete answer with `{"success": bool, "message": string}`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod config;
mod error;
mod handler;
mod server;

pub use auth::SessionTokens;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::{ServerRequest, ServerResponse, SyncServer};
