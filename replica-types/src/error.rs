//! Error types for kvreplica wire encoding.

use thiserror::Error;

/// Errors raised while encoding or decoding replication messages.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// A custom value type was used without being registered
    #[error("unregistered value type: {0}")]
    UnregisteredType(String),

    /// A custom value was decoded as the wrong application type
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Type name the caller asked for.
        expected: String,
        /// Type name carried by the value.
        actual: String,
    },

    /// A frame exceeded the configured size limit
    #[error("message too large: {size} bytes (limit: {limit} bytes)")]
    MessageTooLarge {
        /// Size announced or produced.
        size: usize,
        /// Maximum allowed size.
        limit: usize,
    },
}
