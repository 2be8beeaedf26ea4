//! The player data store and its change tracking.

use crate::changeset::Changeset;
use crate::error::{StoreError, StoreResult};
use crate::key::{is_valid_key, validate_key};
use crate::metadata::is_metadata_key;
use crate::value::{FromValue, ValueCell};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, warn};

/// Entries every new store starts with.
pub const DEFAULT_ENTRIES: [(&str, i64); 3] =
    [("Coins", 0), ("PlayerLevel", 1), ("ExperiencePoints", 0)];

/// Player key/value state plus a snapshot of the last persisted state.
///
/// `live` holds the current values and is changed by [`set`](Self::set).
/// `snapshot` holds the values the backend last acknowledged and is only
/// ever replaced as a whole, by [`commit`](Self::commit) or
/// [`apply_remote`](Self::apply_remote). [`diff`](Self::diff) reports the
/// entries of `live` that the snapshot does not already hold.
///
/// The store does no locking of its own. Callers sharing it across tasks
/// must wrap it in a lock, as the engine's coordinator does.
#[derive(Debug, Clone, PartialEq)]
pub struct DataStore {
    live: BTreeMap<String, ValueCell>,
    snapshot: BTreeMap<String, ValueCell>,
}

impl DataStore {
    /// Creates a store holding the default entries, already considered saved.
    pub fn new() -> Self {
        let live: BTreeMap<String, ValueCell> = DEFAULT_ENTRIES
            .iter()
            .map(|(k, v)| ((*k).to_string(), ValueCell::Integer(*v)))
            .collect();
        let snapshot = live.clone();
        Self { live, snapshot }
    }

    /// Reads `key` as `T`, falling back to `default`.
    ///
    /// Returns `default` if the key is missing or its value does not coerce
    /// to `T`. A failed coercion is logged as a warning.
    pub fn get<T: FromValue>(&self, key: &str, default: T) -> T {
        match self.try_get(key) {
            Ok(value) => value,
            Err(StoreError::TypeMismatch {
                expected, found, ..
            }) => {
                warn!(key, expected, found, "could not convert stored value");
                default
            }
            Err(_) => default,
        }
    }

    /// Reads `key` as `T`.
    pub fn try_get<T: FromValue>(&self, key: &str) -> StoreResult<T> {
        let value = self
            .live
            .get(key)
            .ok_or_else(|| StoreError::MissingKey(key.to_string()))?;

        T::from_value(value).ok_or_else(|| StoreError::TypeMismatch {
            key: key.to_string(),
            expected: T::TYPE_NAME,
            found: value.kind().name(),
        })
    }

    /// Returns the raw value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&ValueCell> {
        self.live.get(key)
    }

    /// Writes `value` under `key`, replacing any previous value and type.
    ///
    /// Invalid keys are refused: the store is left unchanged, the refusal is
    /// logged, and the returned error carries the reason.
    pub fn set(&mut self, key: &str, value: impl Into<ValueCell>) -> StoreResult<()> {
        if let Err(reason) = validate_key(key) {
            error!(key, %reason, "refusing to store invalid key");
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
                reason,
            });
        }

        self.live.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Removes `key` from the live state only.
    ///
    /// The snapshot is not touched, so the removal is not part of any diff.
    pub fn remove(&mut self, key: &str) -> Option<ValueCell> {
        self.live.remove(key)
    }

    /// Returns true if `key` is present in the live state.
    pub fn contains_key(&self, key: &str) -> bool {
        self.live.contains_key(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns true if there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Iterates over the live entries, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueCell)> {
        self.live.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the names of all live keys.
    pub fn get_all_keys(&self) -> BTreeSet<String> {
        self.live.keys().cloned().collect()
    }

    /// Renders the live state as `key:value` pairs separated by `", "`.
    ///
    /// Metadata keys are left out unless `include_metadata` is set.
    pub fn debug_dump(&self, include_metadata: bool) -> String {
        self.live
            .iter()
            .filter(|(k, _)| include_metadata || !is_metadata_key(k))
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // --- change tracking ---

    /// Returns the live entries that differ from the snapshot.
    ///
    /// An entry is included if its key is valid and the snapshot either lacks
    /// the key or holds a different value. Keys that fail validation are
    /// skipped even if they reached the live state through
    /// [`apply_remote`](Self::apply_remote).
    pub fn diff(&self) -> Changeset {
        let mut changes = Changeset::new();

        for (key, value) in &self.live {
            if !is_valid_key(key) {
                warn!(key = key.as_str(), "skipping invalid key during diff");
                continue;
            }
            if self.snapshot.get(key) != Some(value) {
                changes.insert(key.clone(), value.clone());
            }
        }

        changes
    }

    /// Returns true if [`diff`](Self::diff) would be non-empty.
    pub fn has_changes(&self) -> bool {
        self.live
            .iter()
            .any(|(k, v)| is_valid_key(k) && self.snapshot.get(k) != Some(v))
    }

    /// Marks the live state as persisted.
    pub fn commit(&mut self) {
        self.snapshot = self.live.clone();
        debug!(entries = self.snapshot.len(), "committed store snapshot");
    }

    /// Discards uncommitted edits, restoring the live state from the snapshot.
    pub fn rollback(&mut self) {
        self.live = self.snapshot.clone();
    }

    /// Overwrites live entries with `remote` and commits.
    ///
    /// Keys present locally but absent from `remote` are kept. Remote keys
    /// are not validated; invalid ones are stored but never diffed.
    pub fn apply_remote<I>(&mut self, remote: I)
    where
        I: IntoIterator<Item = (String, ValueCell)>,
    {
        self.live.extend(remote);
        self.commit();
    }

    /// Forgets the snapshot, so the next diff carries every valid live entry.
    pub fn mark_unsaved(&mut self) {
        self.snapshot.clear();
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::InvalidKeyReason;

    #[test]
    fn new_store_has_committed_defaults() {
        let store = DataStore::new();
        assert_eq!(store.get("Coins", -1i64), 0);
        assert_eq!(store.get("PlayerLevel", -1i64), 1);
        assert_eq!(store.get("ExperiencePoints", -1i64), 0);
        assert!(store.diff().is_empty());
        assert!(!store.has_changes());
    }

    #[test]
    fn set_then_get() {
        let mut store = DataStore::new();
        store.set("Name", "Ada").unwrap();
        store.set("Volume", 0.75).unwrap();
        store.set("Tutorial_Done", true).unwrap();

        assert_eq!(store.get("Name", String::new()), "Ada");
        assert_eq!(store.get("Volume", 0.0), 0.75);
        assert!(store.get("Tutorial_Done", false));
    }

    #[test]
    fn set_replaces_type() {
        let mut store = DataStore::new();
        store.set("Coins", "lots").unwrap();
        assert_eq!(store.value("Coins"), Some(&ValueCell::Text("lots".into())));
        assert_eq!(store.get("Coins", 9i64), 9);
    }

    #[test]
    fn get_missing_returns_default() {
        let store = DataStore::new();
        assert_eq!(store.get("Gems", 3i64), 3);
        assert_eq!(
            store.try_get::<i64>("Gems"),
            Err(StoreError::MissingKey("Gems".into()))
        );
    }

    #[test]
    fn get_coerces_numbers_only() {
        let mut store = DataStore::new();
        store.set("Ratio", 2.0).unwrap();
        store.set("Flag", true).unwrap();

        assert_eq!(store.get("Ratio", 0i64), 2);
        assert_eq!(store.get("Coins", 1.5f64), 0.0);
        assert_eq!(store.get("Flag", 7i64), 7);
        assert!(matches!(
            store.try_get::<i64>("Flag"),
            Err(StoreError::TypeMismatch {
                expected: "i64",
                found: "boolean",
                ..
            })
        ));
    }

    #[test]
    fn invalid_keys_are_refused() {
        let mut store = DataStore::new();
        let before = store.clone();

        let err = store.set("", 1i64).unwrap_err();
        assert_eq!(err.invalid_key_reason(), Some(InvalidKeyReason::Empty));

        let err = store.set("2fast", 1i64).unwrap_err();
        assert_eq!(
            err.invalid_key_reason(),
            Some(InvalidKeyReason::StartsWithDigit)
        );

        let err = store.set("high-score", 1i64).unwrap_err();
        assert_eq!(
            err.invalid_key_reason(),
            Some(InvalidKeyReason::IllegalCharacter('-'))
        );

        assert!(store.set("high score", 1i64).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn diff_reports_changed_and_new_keys() {
        let mut store = DataStore::new();
        store.set("Coins", 50i64).unwrap();
        store.set("PlayerLevel", 1i64).unwrap();
        store.set("Gems", 2i64).unwrap();

        let diff = store.diff();
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.get("Coins"), Some(&ValueCell::Integer(50)));
        assert_eq!(diff.get("Gems"), Some(&ValueCell::Integer(2)));
        assert!(store.has_changes());
    }

    #[test]
    fn diff_detects_type_change_with_same_text() {
        let mut store = DataStore::new();
        store.set("PlayerLevel", "1").unwrap();
        assert_eq!(
            store.diff().get("PlayerLevel"),
            Some(&ValueCell::Text("1".into()))
        );

        store.set("PlayerLevel", 1.0).unwrap();
        assert_eq!(store.diff().len(), 1);
    }

    #[test]
    fn commit_clears_diff_and_is_idempotent() {
        let mut store = DataStore::new();
        store.set("Coins", 10i64).unwrap();
        store.commit();
        assert!(store.diff().is_empty());

        let snapshot = store.clone();
        store.commit();
        assert_eq!(store, snapshot);
        assert!(store.diff().is_empty());
    }

    #[test]
    fn rollback_restores_snapshot() {
        let mut store = DataStore::new();
        store.set("Coins", 10i64).unwrap();
        store.set("Gems", 1i64).unwrap();
        store.rollback();

        assert_eq!(store.get("Coins", -1i64), 0);
        assert!(!store.contains_key("Gems"));
        assert!(store.diff().is_empty());
    }

    #[test]
    fn apply_remote_overwrites_and_commits() {
        let mut store = DataStore::new();
        store.set("LocalOnly", 4i64).unwrap();

        let remote: Changeset = [
            ("Coins", ValueCell::Integer(7)),
            ("NewKey", ValueCell::Boolean(true)),
        ]
        .into_iter()
        .collect();
        store.apply_remote(remote);

        assert_eq!(store.get("Coins", 0i64), 7);
        assert!(store.get("NewKey", false));
        assert_eq!(store.get("LocalOnly", 0i64), 4);
        assert!(store.diff().is_empty());
    }

    #[test]
    fn invalid_remote_keys_never_diff() {
        let mut store = DataStore::new();
        store.apply_remote([
            ("odata.etag".to_string(), ValueCell::Text("W/1".into())),
            ("PartitionKey".to_string(), ValueCell::Text("p1".into())),
        ]);
        store.mark_unsaved();

        let diff = store.diff();
        assert!(!diff.contains_key("odata.etag"));
        assert!(diff.contains_key("PartitionKey"));
        assert!(diff.contains_key("Coins"));
    }

    #[test]
    fn remove_is_local_only() {
        let mut store = DataStore::new();
        assert_eq!(store.remove("Coins"), Some(ValueCell::Integer(0)));
        assert!(!store.contains_key("Coins"));
        assert!(store.diff().is_empty());
    }

    #[test]
    fn debug_dump_filters_metadata() {
        let mut store = DataStore::new();
        store.apply_remote([
            ("RowKey".to_string(), ValueCell::Text("account".into())),
            ("Timestamp".to_string(), ValueCell::Text("2024-01-01".into())),
        ]);

        assert_eq!(
            store.debug_dump(false),
            "Coins:0, ExperiencePoints:0, PlayerLevel:1"
        );
        let full = store.debug_dump(true);
        assert!(full.contains("RowKey:account"));
        assert!(full.contains("Timestamp:2024-01-01"));
    }

    #[test]
    fn all_keys() {
        let mut store = DataStore::new();
        store.set("Gems", 1i64).unwrap();
        let keys: Vec<_> = store.get_all_keys().into_iter().collect();
        assert_eq!(keys, vec!["Coins", "ExperiencePoints", "Gems", "PlayerLevel"]);
        assert_eq!(store.len(), 4);
    }
}
