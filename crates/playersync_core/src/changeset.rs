//! Key/value mappings exchanged with the backend.

use crate::value::ValueCell;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// A mapping of keys to values.
///
/// Used both for the delta produced by [`DataStore::diff`](crate::DataStore::diff)
/// and for the full mapping returned by a remote load. Order carries no
/// meaning; entries iterate sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Changeset {
    entries: BTreeMap<String, ValueCell>,
}

impl Changeset {
    /// Creates an empty changeset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ValueCell>) -> Option<ValueCell> {
        self.entries.insert(key.into(), value.into())
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&ValueCell> {
        self.entries.get(key)
    }

    /// Returns true if the changeset contains `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<ValueCell> {
        self.entries.remove(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ValueCell> {
        self.entries.iter()
    }

    /// Consumes the changeset, returning the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, ValueCell> {
        self.entries
    }
}

impl From<BTreeMap<String, ValueCell>> for Changeset {
    fn from(entries: BTreeMap<String, ValueCell>) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<ValueCell>> FromIterator<(K, V)> for Changeset {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Changeset {
    type Item = (String, ValueCell);
    type IntoIter = btree_map::IntoIter<String, ValueCell>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Changeset {
    type Item = (&'a String, &'a ValueCell);
    type IntoIter = btree_map::Iter<'a, String, ValueCell>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
