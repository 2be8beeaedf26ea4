//! Sync coordinator.
//!
//! Sequences load, diff, save, commit and delete against a
//! [`SyncTransport`], keeping the [`DataStore`] consistent with what the
//! backend has acknowledged.

use crate::console::{ConsoleLog, SYNC_CHANNEL};
use crate::error::{SyncError, SyncResult, WipeStep};
use crate::transport::SyncTransport;
use parking_lot::RwLock;
use playersync_core::{is_metadata_key, Changeset, DataStore, FromValue, StoreResult, ValueCell};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Successful saves that reached the backend.
    pub saves: u64,
    /// Successful loads.
    pub loads: u64,
    /// Successful deletes that reached the backend.
    pub deletes: u64,
    /// Completed wipes.
    pub wipes: u64,
    /// Total keys sent by saves.
    pub keys_pushed: u64,
    /// Total keys received by loads.
    pub keys_pulled: u64,
    /// Total keys sent by deletes.
    pub keys_deleted: u64,
    /// Failed operations.
    pub failures: u64,
    /// Time of the last successful operation.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of [`SyncCoordinator::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The diff was empty; the transport was not called.
    NothingToSave,
    /// The diff was saved and committed.
    Saved {
        /// Keys that were sent.
        keys: Vec<String>,
    },
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveOutcome::NothingToSave => f.write_str("Nothing to save."),
            SaveOutcome::Saved { keys } => write!(f, "Saved {} key(s): {}", keys.len(), keys.join(", ")),
        }
    }
}

/// Result of [`SyncCoordinator::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Keys received from the backend, metadata included.
    pub keys: Vec<String>,
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Loaded {} key(s).", self.keys.len())
    }
}

/// Result of [`SyncCoordinator::delete_keys`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// No keys were given; the transport was not called.
    NothingToDelete,
    /// The keys were deleted remotely.
    Deleted {
        /// Keys that were sent.
        keys: Vec<String>,
    },
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteOutcome::NothingToDelete => f.write_str("Nothing to delete."),
            DeleteOutcome::Deleted { keys } => {
                write!(f, "Deleted {} key(s): {}", keys.len(), keys.join(", "))
            }
        }
    }
}

/// Result of [`SyncCoordinator::wipe_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipeOutcome {
    /// Remote keys that were deleted.
    pub deleted: Vec<String>,
    /// Default keys that were saved back.
    pub restored: Vec<String>,
}

impl fmt::Display for WipeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wiped {} key(s), restored {} default(s).",
            self.deleted.len(),
            self.restored.len()
        )
    }
}

/// Drives one [`DataStore`] against one backend.
///
/// The store sits behind an async mutex. Every operation holds the lock
/// from its first read of the store until its last write, including the
/// transport round trip, so game code editing through
/// [`with_store_mut`](Self::with_store_mut) or [`set`](Self::set) waits for
/// an in-flight save instead of racing its commit.
///
/// Failed saves and loads leave the store exactly as it was.
pub struct SyncCoordinator<T: SyncTransport> {
    transport: T,
    store: Mutex<DataStore>,
    stats: RwLock<SyncStats>,
    console: Option<Arc<dyn ConsoleLog>>,
}

impl<T: SyncTransport> SyncCoordinator<T> {
    /// Creates a coordinator over a fresh default store.
    pub fn new(transport: T) -> Self {
        Self::from_store(transport, DataStore::new())
    }

    /// Creates a coordinator over an existing store.
    pub fn from_store(transport: T, store: DataStore) -> Self {
        Self {
            transport,
            store: Mutex::new(store),
            stats: RwLock::new(SyncStats::default()),
            console: None,
        }
    }

    /// Reports progress to `console` on the `"Sync"` channel.
    pub fn with_console(mut self, console: Arc<dyn ConsoleLog>) -> Self {
        self.console = Some(console);
        self
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Locks the store.
    pub async fn lock_store(&self) -> MutexGuard<'_, DataStore> {
        self.store.lock().await
    }

    /// Runs `f` with shared access to the store.
    pub async fn with_store<R>(&self, f: impl FnOnce(&DataStore) -> R) -> R {
        f(&*self.store.lock().await)
    }

    /// Runs `f` with exclusive access to the store.
    pub async fn with_store_mut<R>(&self, f: impl FnOnce(&mut DataStore) -> R) -> R {
        f(&mut *self.store.lock().await)
    }

    /// Writes `value` under `key`. See [`DataStore::set`].
    pub async fn set(&self, key: &str, value: impl Into<ValueCell>) -> StoreResult<()> {
        self.store.lock().await.set(key, value)
    }

    /// Reads `key` as `T`, falling back to `default`. See [`DataStore::get`].
    pub async fn get<V: FromValue>(&self, key: &str, default: V) -> V {
        self.store.lock().await.get(key, default)
    }

    /// Sends the store's diff to the backend and commits on success.
    ///
    /// An empty diff returns [`SaveOutcome::NothingToSave`] without calling
    /// the transport.
    pub async fn save(&self, player_id: &str, token: Option<&str>) -> SyncResult<SaveOutcome> {
        let mut store = self.store.lock().await;
        let changes = store.diff();

        if changes.is_empty() {
            debug!(player_id, "nothing to save");
            self.console_line("Nothing to save.");
            return Ok(SaveOutcome::NothingToSave);
        }

        self.console_line(&format!("Saving {} key(s) for {player_id}...", changes.len()));
        match self.push(&mut store, player_id, &changes, token).await {
            Ok(()) => {
                let outcome = SaveOutcome::Saved {
                    keys: changes.keys().map(str::to_string).collect(),
                };
                self.succeeded(&outcome.to_string());
                Ok(outcome)
            }
            Err(e) => Err(self.failed("save", e)),
        }
    }

    /// Fetches the player's record and applies it to the store.
    ///
    /// Remote values overwrite local ones; keys only present locally are
    /// kept. The store is committed afterwards.
    pub async fn load(&self, player_id: &str, token: Option<&str>) -> SyncResult<LoadOutcome> {
        let mut store = self.store.lock().await;
        self.console_line(&format!("Loading for {player_id}..."));

        match self.pull(&mut store, player_id, token).await {
            Ok(keys) => {
                let outcome = LoadOutcome { keys };
                self.succeeded(&outcome.to_string());
                Ok(outcome)
            }
            Err(e) => Err(self.failed("load", e)),
        }
    }

    /// Deletes `keys` from the player's remote record.
    ///
    /// The local store is not touched: a deleted key stays in the live
    /// state until the caller removes it.
    pub async fn delete_keys(
        &self,
        player_id: &str,
        keys: &[String],
        token: Option<&str>,
    ) -> SyncResult<DeleteOutcome> {
        if keys.is_empty() {
            debug!(player_id, "nothing to delete");
            self.console_line("Nothing to delete.");
            return Ok(DeleteOutcome::NothingToDelete);
        }

        self.console_line(&format!("Deleting {} key(s) for {player_id}...", keys.len()));
        match self.remove(player_id, keys, token).await {
            Ok(()) => {
                let outcome = DeleteOutcome::Deleted {
                    keys: keys.to_vec(),
                };
                self.succeeded(&outcome.to_string());
                Ok(outcome)
            }
            Err(e) => Err(self.failed("delete", e)),
        }
    }

    /// Deletes everything the backend holds for the player and saves the
    /// default entries in its place.
    ///
    /// Runs load, delete (of every non-metadata key found), reset of the
    /// local store to defaults, then a save of the full default mapping.
    /// A player without a remote record has nothing to delete and is
    /// simply reset. A failing step stops the sequence and is reported as
    /// [`SyncError::Wipe`]. If the save fails the local store holds the
    /// defaults uncommitted, so the next [`save`](Self::save) pushes them.
    pub async fn wipe_all(&self, player_id: &str, token: Option<&str>) -> SyncResult<WipeOutcome> {
        let mut store = self.store.lock().await;
        self.console_line(&format!("Wiping all data for {player_id}..."));

        match self.wipe(&mut store, player_id, token).await {
            Ok(outcome) => {
                self.stats.write().wipes += 1;
                self.succeeded(&outcome.to_string());
                Ok(outcome)
            }
            Err(e) => Err(self.failed("wipe", e)),
        }
    }

    async fn push(
        &self,
        store: &mut DataStore,
        player_id: &str,
        changes: &Changeset,
        token: Option<&str>,
    ) -> SyncResult<()> {
        let ack = self.transport.save(player_id, changes, token).await?;
        store.commit();

        info!(player_id, keys = changes.len(), ack = %ack.message, "saved changes");
        let mut stats = self.stats.write();
        stats.saves += 1;
        stats.keys_pushed += changes.len() as u64;
        Ok(())
    }

    async fn pull(
        &self,
        store: &mut DataStore,
        player_id: &str,
        token: Option<&str>,
    ) -> SyncResult<Vec<String>> {
        let remote = self.transport.load(player_id, token).await?;
        let keys: Vec<String> = remote.keys().map(str::to_string).collect();
        store.apply_remote(remote);

        info!(player_id, keys = keys.len(), "applied remote record");
        let mut stats = self.stats.write();
        stats.loads += 1;
        stats.keys_pulled += keys.len() as u64;
        Ok(keys)
    }

    async fn remove(&self, player_id: &str, keys: &[String], token: Option<&str>) -> SyncResult<()> {
        let ack = self.transport.delete(player_id, keys, token).await?;

        info!(player_id, keys = keys.len(), ack = %ack.message, "deleted remote keys");
        let mut stats = self.stats.write();
        stats.deletes += 1;
        stats.keys_deleted += keys.len() as u64;
        Ok(())
    }

    async fn wipe(
        &self,
        store: &mut DataStore,
        player_id: &str,
        token: Option<&str>,
    ) -> SyncResult<WipeOutcome> {
        let remote_keys = match self.pull(store, player_id, token).await {
            Ok(keys) => keys,
            Err(e) if e.is_not_found() => {
                debug!(player_id, "no remote record, nothing to delete");
                self.console_line(&format!("No remote record for {player_id}, restoring defaults."));
                Vec::new()
            }
            Err(e) => return Err(SyncError::wipe(WipeStep::Load, e)),
        };

        let deleted: Vec<String> = remote_keys
            .into_iter()
            .filter(|k| !is_metadata_key(k))
            .collect();
        if !deleted.is_empty() {
            self.remove(player_id, &deleted, token)
                .await
                .map_err(|e| SyncError::wipe(WipeStep::Delete, e))?;
        }

        *store = DataStore::new();
        store.mark_unsaved();
        let defaults = store.diff();
        self.push(store, player_id, &defaults, token)
            .await
            .map_err(|e| SyncError::wipe(WipeStep::Save, e))?;

        Ok(WipeOutcome {
            deleted,
            restored: defaults.keys().map(str::to_string).collect(),
        })
    }

    fn console_line(&self, message: &str) {
        if let Some(console) = &self.console {
            console.log(SYNC_CHANNEL, message);
        }
    }

    fn succeeded(&self, message: &str) {
        self.stats.write().last_sync_time = Some(Instant::now());
        self.console_line(message);
    }

    fn failed(&self, operation: &str, err: SyncError) -> SyncError {
        warn!(operation, error = %err, retryable = err.is_retryable(), "sync operation failed");
        {
            let mut stats = self.stats.write();
            stats.failures += 1;
            stats.last_error = Some(err.to_string());
        }
        self.console_line(&format!("FAILED: {err}"));
        err
    }
}
