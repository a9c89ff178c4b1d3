//! Client requests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ReplicaError;

/// Reserved key that, as the only key of a keyed request, means "send everything".
pub const ALL_KEYS: &str = "__(all_keys)__";

/// What a client asks the server for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Fetch the whole store, unfiltered
    All,
    /// Fetch the listed keys; each maps to the version the client already holds
    Keys(HashMap<String, i64>),
}

impl Request {
    /// Build a keyed request.
    ///
    /// A map whose only key is [`ALL_KEYS`] becomes [`Request::All`].
    pub fn keys(versions: HashMap<String, i64>) -> Self {
        if versions.len() == 1 && versions.contains_key(ALL_KEYS) {
            Request::All
        } else {
            Request::Keys(versions)
        }
    }

    /// Check for the fetch-all form.
    pub fn is_all(&self) -> bool {
        matches!(self, Request::All)
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ReplicaError> {
        rmp_serde::to_vec(self).map_err(ReplicaError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReplicaError> {
        let request: Request =
            rmp_serde::from_slice(bytes).map_err(ReplicaError::Deserialization)?;
        Ok(match request {
            Request::Keys(versions) => Request::keys(versions),
            all => all,
        })
    }
}
