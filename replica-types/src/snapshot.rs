//! Versioned entries and store snapshots.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{ReplicaError, TypeRegistry, Value};

/// One replicated key's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The replicated value
    pub value: Value,
    /// Caller-chosen version (0 is the "unknown" sentinel on requests)
    pub version: i64,
}

impl Entry {
    /// Create a new entry.
    pub fn new(value: impl Into<Value>, version: i64) -> Self {
        Self {
            value: value.into(),
            version,
        }
    }
}

/// A mapping from key to [`Entry`].
///
/// The server keeps its authoritative store in one of these, and every
/// response is a (possibly filtered) snapshot of the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    entries: HashMap<String, Entry>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry.
    pub fn set(&mut self, key: impl Into<String>, version: i64, value: impl Into<Value>) {
        self.entries.insert(key.into(), Entry::new(value, version));
    }

    /// Insert a prepared entry.
    pub fn insert(&mut self, key: impl Into<String>, entry: Entry) {
        self.entries.insert(key.into(), entry);
    }

    /// Remove an entry. Absent keys are ignored.
    pub fn unset(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Get the version stored under `key`.
    pub fn get_version(&self, key: &str) -> Option<i64> {
        self.entries.get(key).map(|e| e.version)
    }

    /// Get the full entry stored under `key`.
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Check whether `key` is present.
    pub fn is_set(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for an empty snapshot.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(key, entry)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Serialize to MessagePack bytes.
    ///
    /// Fails if any custom value is not registered in `registry`.
    pub fn to_bytes(&self, registry: &TypeRegistry) -> Result<Vec<u8>, ReplicaError> {
        registry.check_all(self.entries.values().map(|e| &e.value))?;
        rmp_serde::to_vec(self).map_err(ReplicaError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    ///
    /// Fails if the peer sent a custom value not registered in `registry`.
    pub fn from_bytes(bytes: &[u8], registry: &TypeRegistry) -> Result<Self, ReplicaError> {
        let snapshot: Snapshot =
            rmp_serde::from_slice(bytes).map_err(ReplicaError::Deserialization)?;
        registry.check_all(snapshot.entries.values().map(|e| &e.value))?;
        Ok(snapshot)
    }
}

impl FromIterator<(String, Entry)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Entry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Snapshot {
    type Item = (String, Entry);
    type IntoIter = std::collections::hash_map::IntoIter<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
