//! Error types for replica-server.

use replica_types::ReplicaError;

/// Main error type for replica-server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Listen or accept failure.
    #[error("connect error: {0}")]
    Connect(#[source] std::io::Error),

    /// Read or write failure mid-exchange.
    #[error("transport error: {0}")]
    Transport(#[source] std::io::Error),

    /// A read or write deadline expired.
    #[error("{operation} timed out after {secs}s")]
    Timeout {
        /// Which half of the exchange stalled.
        operation: &'static str,
        /// Deadline that expired, in seconds.
        secs: u64,
    },

    /// Request decoding or response encoding failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] ReplicaError),

    /// `serve()` was called on a server that is already running.
    #[error("server already started")]
    AlreadyStarted,

    /// `serve()` was called after the listener was closed.
    #[error("listener closed")]
    ListenerClosed,
}

impl ServerError {
    /// Returns true if the failure is local to one connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ServerError::Transport(_) | ServerError::Timeout { .. } | ServerError::Encoding(_)
        )
    }
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
