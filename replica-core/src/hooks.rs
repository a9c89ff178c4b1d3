//! Per-key recomputation hooks.
//!
//! A hook replaces a key's stored entry for the purposes of a single response.
//! It receives the version the requester already holds, so the served value
//! can depend on what the client knows; the stored entry only seeds it.

use std::collections::HashMap;
use std::sync::Arc;

use replica_types::Entry;

/// Capability to synthesize the entry served for a key.
///
/// Implemented for every `Fn(&str, i64, &Entry) -> Entry + Send + Sync`.
pub trait RecomputeEntry: Send + Sync {
    /// Compute the entry to serve for `key` given the requester's version.
    fn recompute(&self, key: &str, requested_version: i64, current: &Entry) -> Entry;
}

impl<F> RecomputeEntry for F
where
    F: Fn(&str, i64, &Entry) -> Entry + Send + Sync,
{
    fn recompute(&self, key: &str, requested_version: i64, current: &Entry) -> Entry {
        self(key, requested_version, current)
    }
}

/// Keyed collection of hooks.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn RecomputeEntry>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("keys", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the hook for `key`.
    pub fn set(&mut self, key: impl Into<String>, hook: Arc<dyn RecomputeEntry>) {
        self.hooks.insert(key.into(), hook);
    }

    /// Remove the hook for `key`. Absent keys are ignored.
    pub fn unset(&mut self, key: &str) {
        self.hooks.remove(key);
    }

    /// Get the hook for `key`.
    pub fn get(&self, key: &str) -> Option<&dyn RecomputeEntry> {
        self.hooks.get(key).map(|h| h.as_ref())
    }

    /// Check whether `key` has a hook.
    pub fn contains(&self, key: &str) -> bool {
        self.hooks.contains_key(key)
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Check for an empty registry.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
