//! Registry of transmissible application types.

use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{ReplicaError, Transmissible, Value};

/// Set of application type names that may travel as [`Value::Custom`].
///
/// Cloning yields a handle to the same registry, so a server can hand one
/// copy to every connection task while callers keep registering types.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    names: Arc<RwLock<BTreeSet<String>>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `T` as transmissible.
    pub fn register<T: Transmissible>(&self) {
        self.register_name(T::TYPE_NAME);
    }

    /// Declare a type by wire name.
    pub fn register_name(&self, type_name: &str) {
        self.names.write().insert(type_name.to_string());
    }

    /// Check whether a wire name is registered.
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.names.read().contains(type_name)
    }

    /// Registered wire names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        self.names.read().iter().cloned().collect()
    }

    /// Verify that every custom value nested in `value` is registered.
    pub fn check(&self, value: &Value) -> Result<(), ReplicaError> {
        let names = self.names.read();
        check_nested(&names, value)
    }

    /// Verify a batch of values under a single lock acquisition.
    pub fn check_all<'a, I>(&self, values: I) -> Result<(), ReplicaError>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let names = self.names.read();
        values
            .into_iter()
            .try_for_each(|value| check_nested(&names, value))
    }
}

fn check_nested(names: &BTreeSet<String>, value: &Value) -> Result<(), ReplicaError> {
    match value {
        Value::Custom { type_name, .. } if !names.contains(type_name) => {
            Err(ReplicaError::UnregisteredType(type_name.clone()))
        }
        Value::List(items) => items.iter().try_for_each(|v| check_nested(names, v)),
        Value::Map(map) => map.values().try_for_each(|v| check_nested(names, v)),
        _ => Ok(()),
    }
}
