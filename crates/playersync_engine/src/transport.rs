//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use playersync_core::Changeset;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Acknowledgement of a save or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Human-readable outcome reported by the backend.
    pub message: String,
}

impl Ack {
    /// Creates an acknowledgement.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A sync transport carries changesets to and from the backend.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-process loopback, mock for testing, etc.).
/// Timeouts and cancellation are the transport's concern.
pub trait SyncTransport: Send + Sync {
    /// Merges `changes` into the player's remote record.
    fn save(
        &self,
        player_id: &str,
        changes: &Changeset,
        token: Option<&str>,
    ) -> impl Future<Output = SyncResult<Ack>> + Send;

    /// Fetches the player's full remote record.
    fn load(
        &self,
        player_id: &str,
        token: Option<&str>,
    ) -> impl Future<Output = SyncResult<Changeset>> + Send;

    /// Removes `keys` from the player's remote record.
    fn delete(
        &self,
        player_id: &str,
        keys: &[String],
        token: Option<&str>,
    ) -> impl Future<Output = SyncResult<Ack>> + Send;
}

impl<T: SyncTransport> SyncTransport for Arc<T> {
    fn save(
        &self,
        player_id: &str,
        changes: &Changeset,
        token: Option<&str>,
    ) -> impl Future<Output = SyncResult<Ack>> + Send {
        (**self).save(player_id, changes, token)
    }

    fn load(
        &self,
        player_id: &str,
        token: Option<&str>,
    ) -> impl Future<Output = SyncResult<Changeset>> + Send {
        (**self).load(player_id, token)
    }

    fn delete(
        &self,
        player_id: &str,
        keys: &[String],
        token: Option<&str>,
    ) -> impl Future<Output = SyncResult<Ack>> + Send {
        (**self).delete(player_id, keys, token)
    }
}

/// Which mock call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    /// [`SyncTransport::save`].
    Save,
    /// [`SyncTransport::load`].
    Load,
    /// [`SyncTransport::delete`].
    Delete,
}

/// How a mock call should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// A retryable transport error.
    Transport(String),
    /// A server error with the given status.
    Server(u16),
    /// An unreadable response body.
    Serialization,
}

impl MockFailure {
    fn to_error(&self) -> SyncError {
        match self {
            MockFailure::Transport(message) => SyncError::transport_retryable(message.clone()),
            MockFailure::Server(status) => SyncError::Server {
                status: *status,
                message: format!("mock failure (code {status})"),
            },
            MockFailure::Serialization => {
                SyncError::Serialization("mock response is not a JSON object".into())
            }
        }
    }
}

/// A mock transport for testing.
///
/// Keeps one record per player in memory, counts calls, records every
/// changeset it is asked to save, and can be told to fail chosen calls.
/// A load of an unknown player fails with status 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    connected: AtomicBool,
    records: Mutex<HashMap<String, Changeset>>,
    failures: Mutex<HashMap<MockCall, MockFailure>>,
    saved: Mutex<Vec<Changeset>>,
    deleted: Mutex<Vec<Vec<String>>>,
    tokens: Mutex<Vec<Option<String>>>,
    save_calls: AtomicUsize,
    load_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Replaces the remote record for `player_id`.
    pub fn set_record(&self, player_id: &str, record: Changeset) {
        self.records.lock().insert(player_id.to_string(), record);
    }

    /// Returns the remote record for `player_id`.
    pub fn record(&self, player_id: &str) -> Option<Changeset> {
        self.records.lock().get(player_id).cloned()
    }

    /// Makes every future `call` fail with `failure`.
    pub fn fail(&self, call: MockCall, failure: MockFailure) {
        self.failures.lock().insert(call, failure);
    }

    /// Stops `call` from failing.
    pub fn succeed(&self, call: MockCall) {
        self.failures.lock().remove(&call);
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Number of `save` calls made.
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Number of `load` calls made.
    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls made.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Every changeset passed to `save`, in call order.
    pub fn saved_changes(&self) -> Vec<Changeset> {
        self.saved.lock().clone()
    }

    /// Every key list passed to `delete`, in call order.
    pub fn deleted_keys(&self) -> Vec<Vec<String>> {
        self.deleted.lock().clone()
    }

    /// Every token seen, in call order.
    pub fn tokens_seen(&self) -> Vec<Option<String>> {
        self.tokens.lock().clone()
    }

    fn check(&self, call: MockCall, token: Option<&str>) -> SyncResult<()> {
        self.tokens.lock().push(token.map(str::to_string));
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SyncError::NotConnected);
        }
        match self.failures.lock().get(&call) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

impl SyncTransport for MockTransport {
    async fn save(
        &self,
        player_id: &str,
        changes: &Changeset,
        token: Option<&str>,
    ) -> SyncResult<Ack> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.check(MockCall::Save, token)?;
        self.saved.lock().push(changes.clone());

        let mut records = self.records.lock();
        let record = records.entry(player_id.to_string()).or_default();
        for (key, value) in changes {
            record.insert(key.clone(), value.clone());
        }
        Ok(Ack::new("Saved dictionary successfully."))
    }

    async fn load(&self, player_id: &str, token: Option<&str>) -> SyncResult<Changeset> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.check(MockCall::Load, token)?;

        self.record(player_id).ok_or_else(|| SyncError::Server {
            status: 404,
            message: format!("no record for player {player_id}"),
        })
    }

    async fn delete(&self, player_id: &str, keys: &[String], token: Option<&str>) -> SyncResult<Ack> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check(MockCall::Delete, token)?;
        self.deleted.lock().push(keys.to_vec());

        if let Some(record) = self.records.lock().get_mut(player_id) {
            for key in keys {
                record.remove(key);
            }
        }
        Ok(Ack::new("Deleted keys successfully."))
    }
}
