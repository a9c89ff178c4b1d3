//! ReplicationClient - the main interface for pulling from a server.
//!
//! # Architecture
//!
//! The client keeps its tracked keys in [`TrackedKeys`] (from replica-core),
//! turns them into a [`Request`] and runs one exchange per fetch through the
//! [`Transport`] trait.
//!
//! ```text
//! Application → ReplicationClient → Transport → Network
//!                      ↓
//!          replica-core (TrackedKeys → Request)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use replica_client::ReplicationClient;
//!
//! let client = ReplicationClient::tcp("127.0.0.1:8086")
//!     .with_deadline(Duration::from_secs(5));
//! client.add_key("motd", 0);
//!
//! let changed = client.sync().await?;
//! ```

use parking_lot::Mutex as SyncMutex;
use replica_core::TrackedKeys;
use replica_types::{ReplicaError, Request, Snapshot, Transmissible, TypeRegistry};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::transport::{TcpTransport, Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Request encoding or response decoding failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] ReplicaError),

    /// The round-trip deadline expired.
    #[error("exchange timed out after {0:?}")]
    Timeout(Duration),
}

impl ClientError {
    /// Returns true if a later retry could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Timeout(_))
    }
}

/// Client for a replication server.
pub struct ReplicationClient<T: Transport> {
    address: String,
    transport: T,
    tracked: SyncMutex<TrackedKeys>,
    registry: TypeRegistry,
    deadline: Option<Duration>,
    /// One exchange at a time per transport.
    in_flight: Mutex<()>,
}

impl<T: Transport> std::fmt::Debug for ReplicationClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicationClient")
            .field("address", &self.address)
            .field("tracked", &*self.tracked.lock())
            .field("registry", &self.registry)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl ReplicationClient<TcpTransport> {
    /// Client for `address` over TCP with default limits.
    pub fn tcp(address: impl Into<String>) -> Self {
        Self::new(address, TcpTransport::new())
    }
}

impl<T: Transport> ReplicationClient<T> {
    /// Create a client for `address` using `transport`.
    pub fn new(address: impl Into<String>, transport: T) -> Self {
        Self {
            address: address.into(),
            transport,
            tracked: SyncMutex::new(TrackedKeys::new()),
            registry: TypeRegistry::new(),
            deadline: None,
            in_flight: Mutex::new(()),
        }
    }

    /// Bound every round-trip by `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Share a type registry with other components.
    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Server address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Round-trip deadline, if any.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Types accepted in responses.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Track `key` at `version` (0 = always send).
    pub fn add_key(&self, key: impl Into<String>, version: i64) {
        self.tracked.lock().add_key(key, version);
    }

    /// Stop tracking `key`.
    pub fn delete_key(&self, key: &str) {
        self.tracked.lock().delete_key(key);
    }

    /// Replace every tracked key.
    pub fn set_keys(&self, keys: HashMap<String, i64>) {
        self.tracked.lock().set_keys(keys);
    }

    /// Check whether `key` is tracked.
    pub fn has_key(&self, key: &str) -> bool {
        self.tracked.lock().has_key(key)
    }

    /// Copy of the tracked keys and their versions.
    pub fn keys(&self) -> HashMap<String, i64> {
        self.tracked.lock().keys()
    }

    /// Stop tracking everything.
    pub fn drop_all_keys(&self) {
        self.tracked.lock().drop_all_keys();
    }

    /// Declare `V` as receivable.
    pub fn register_type<V: Transmissible>(&self) {
        self.registry.register::<V>();
    }

    /// Fetch every entry on the server.
    pub async fn fetch_all(&self) -> Result<Snapshot, ClientError> {
        self.fetch(&Request::All).await
    }

    /// Fetch the tracked keys, or everything if none are tracked.
    pub async fn fetch_tracked(&self) -> Result<Snapshot, ClientError> {
        let request = self.tracked.lock().request();
        self.fetch(&request).await
    }

    /// Fetch `versions` without touching the tracked keys.
    pub async fn fetch_keys(
        &self,
        versions: HashMap<String, i64>,
    ) -> Result<Snapshot, ClientError> {
        self.fetch(&Request::keys(versions)).await
    }

    /// Fetch the tracked keys and advance them to the versions received.
    pub async fn sync(&self) -> Result<Snapshot, ClientError> {
        let response = self.fetch_tracked().await?;
        self.tracked.lock().acknowledge(&response);
        Ok(response)
    }

    /// Run one request/response exchange.
    pub async fn fetch(&self, request: &Request) -> Result<Snapshot, ClientError> {
        let payload = request.to_bytes()?;
        let _in_flight = self.in_flight.lock().await;

        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.exchange(&payload))
                .await
                .unwrap_or_else(|_| Err(ClientError::Timeout(deadline))),
            None => self.exchange(&payload).await,
        };

        if self.transport.is_connected() {
            if let Err(e) = self.transport.close().await {
                tracing::debug!("Close after exchange failed: {}", e);
            }
        }

        let response = result?;
        tracing::debug!(
            "Fetched {} entries from {}",
            response.len(),
            self.address
        );
        Ok(response)
    }

    async fn exchange(&self, payload: &[u8]) -> Result<Snapshot, ClientError> {
        self.transport.connect(&self.address).await?;
        self.transport.send(payload).await?;
        let bytes = self.transport.recv().await?;
        Ok(Snapshot::from_bytes(&bytes, &self.registry)?)
    }

    /// Get the transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
