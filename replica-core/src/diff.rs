//! Version diff: deciding which entries a request receives.
//!
//! The algorithm is demand-driven. Keys the requester did not ask about are
//! never returned, and a requested key is returned only when the served
//! entry is newer than what the requester holds (or it holds nothing).

use serde::{Deserialize, Serialize};

use crate::hooks::HookRegistry;
use replica_types::{Request, Snapshot};

/// Rule deciding whether a served version counts as "newer".
///
/// A known version of `0` always includes the entry, under either rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InclusionPolicy {
    /// `served > known`: polling with the last-seen version returns nothing new.
    #[default]
    StrictlyNewer,
    /// `served >= known`: polling with the last-seen version re-sends the entry.
    NewerOrEqual,
}

impl InclusionPolicy {
    /// Check whether an entry at `served_version` goes to a requester holding `known_version`.
    pub fn includes(self, served_version: i64, known_version: i64) -> bool {
        if known_version == 0 {
            return true;
        }
        match self {
            InclusionPolicy::StrictlyNewer => served_version > known_version,
            InclusionPolicy::NewerOrEqual => served_version >= known_version,
        }
    }
}

/// Compute the response to `request` against `store`.
///
/// [`Request::All`] returns the whole store unfiltered and bypasses hooks.
/// For keyed requests, a registered hook replaces the stored entry before the
/// inclusion check, so the raw stored value of a hooked key is never served.
pub fn diff(
    store: &Snapshot,
    hooks: &HookRegistry,
    request: &Request,
    policy: InclusionPolicy,
) -> Snapshot {
    let versions = match request {
        Request::All => return store.clone(),
        Request::Keys(versions) => versions,
    };

    let mut response = Snapshot::new();
    for (key, &known) in versions {
        let Some(stored) = store.entry(key) else {
            continue;
        };

        let served = match hooks.get(key) {
            Some(hook) => hook.recompute(key, known, stored),
            None => stored.clone(),
        };

        if policy.includes(served.version, known) {
            response.insert(key.clone(), served);
        }
    }
    response
}
