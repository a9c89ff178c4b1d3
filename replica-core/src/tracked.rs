//! Client-side bookkeeping of tracked keys.
//!
//! The tracker maps each key the client cares about to the version it last
//! received, and turns that into the next [`Request`].

use std::collections::HashMap;

use replica_types::{Request, Snapshot};

/// Keys a client tracks, with the last version seen for each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedKeys {
    keys: HashMap<String, i64>,
}

impl TrackedKeys {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `key` at `version` (0 = fetch unconditionally).
    pub fn add_key(&mut self, key: impl Into<String>, version: i64) {
        self.keys.insert(key.into(), version);
    }

    /// Stop tracking `key`.
    pub fn delete_key(&mut self, key: &str) {
        self.keys.remove(key);
    }

    /// Replace every tracked key.
    pub fn set_keys(&mut self, keys: HashMap<String, i64>) {
        self.keys = keys;
    }

    /// Stop tracking everything.
    pub fn drop_all_keys(&mut self) {
        self.keys.clear();
    }

    /// Check whether `key` is tracked.
    pub fn has_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Version tracked for `key`.
    pub fn version(&self, key: &str) -> Option<i64> {
        self.keys.get(key).copied()
    }

    /// Copy of the tracked keys.
    pub fn keys(&self) -> HashMap<String, i64> {
        self.keys.clone()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check for an empty tracker.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Build the next request. Nothing tracked means fetch everything.
    pub fn request(&self) -> Request {
        if self.keys.is_empty() {
            Request::All
        } else {
            Request::keys(self.keys.clone())
        }
    }

    /// Advance tracked versions to those received in `response`.
    ///
    /// Keys in the response that are not tracked are ignored.
    pub fn acknowledge(&mut self, response: &Snapshot) {
        for (key, entry) in response.iter() {
            if let Some(version) = self.keys.get_mut(key) {
                *version = entry.version;
            }
        }
    }
}
