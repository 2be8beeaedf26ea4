//! Request handlers for the account endpoints.

use crate::auth::SessionTokens;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use parking_lot::RwLock;
use playersync_core::{is_metadata_key, validate_key, Changeset, ValueCell};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// A stored player record.
#[derive(Debug, Clone, Default)]
struct Record {
    entries: Changeset,
    /// Unix millis of the last write.
    updated: i64,
}

/// Shared state for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Issued session tokens.
    pub sessions: SessionTokens,
    records: RwLock<HashMap<String, Record>>,
}

impl HandlerContext {
    /// Creates a new handler context with no records.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            sessions: SessionTokens::new(),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the application entries of `player_id`'s record.
    pub fn record(&self, player_id: &str) -> Option<Changeset> {
        self.records
            .read()
            .get(player_id)
            .map(|r| r.entries.clone())
    }

    /// Number of players with a record.
    pub fn player_count(&self) -> usize {
        self.records.read().len()
    }
}

/// Handler for account requests.
///
/// Credentials are checked by the caller; the handler only applies the
/// request to the record store.
pub struct RequestHandler {
    context: std::sync::Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: std::sync::Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Returns the full record, stamped with metadata if configured.
    pub fn handle_load(&self, player_id: &str) -> ServerResult<Changeset> {
        let records = self.context.records.read();
        let record = records
            .get(player_id)
            .ok_or_else(|| ServerError::NotFound(player_id.to_string()))?;

        let mut entries = record.entries.clone();
        if self.context.config.stamp_metadata {
            entries.insert("PartitionKey", self.context.config.partition.as_str());
            entries.insert("RowKey", player_id);
            entries.insert("Timestamp", ValueCell::Integer(record.updated));
        }
        Ok(entries)
    }

    /// Merges `changes` into the record, creating it if needed.
    ///
    /// Metadata keys are owned by the server and dropped. Any invalid key
    /// rejects the whole request.
    pub fn handle_save(&self, player_id: &str, changes: Changeset) -> ServerResult<String> {
        let mut accepted = Changeset::new();
        for (key, value) in changes {
            if is_metadata_key(&key) {
                debug!(player_id, key = key.as_str(), "ignoring metadata key in save");
                continue;
            }
            if let Err(reason) = validate_key(&key) {
                return Err(ServerError::InvalidKey { key, reason });
            }
            accepted.insert(key, value);
        }

        let mut records = self.context.records.write();
        let existing = records.get(player_id);
        let count = existing.map_or(0, |r| r.entries.len())
            + accepted
                .keys()
                .filter(|k| existing.map_or(true, |r| !r.entries.contains_key(k)))
                .count();
        if count > self.context.config.max_properties {
            return Err(ServerError::TooManyProperties {
                count,
                max: self.context.config.max_properties,
            });
        }

        let saved = accepted.len();
        let record = records.entry(player_id.to_string()).or_default();
        for (key, value) in accepted {
            record.entries.insert(key, value);
        }
        record.updated = now_millis();

        debug!(player_id, keys = saved, "saved record");
        Ok("Saved dictionary successfully.".to_string())
    }

    /// Removes `keys` from the record. Unknown keys and players are ignored.
    pub fn handle_delete(&self, player_id: &str, keys: &[String]) -> ServerResult<String> {
        let mut records = self.context.records.write();
        let mut removed = 0;

        if let Some(record) = records.get_mut(player_id) {
            for key in keys.iter().filter(|k| !is_metadata_key(k)) {
                if record.entries.remove(key).is_some() {
                    removed += 1;
                }
            }
            record.updated = now_millis();
        }

        debug!(player_id, requested = keys.len(), removed, "deleted keys");
        Ok(format!("Deleted {removed} key(s)."))
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
