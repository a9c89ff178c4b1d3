//! Main ReplicationServer lifecycle.
//!
//! ReplicationServer owns the versioned store, runs the acceptor task and
//! keeps count of in-flight connections so a graceful stop can drain them.
//!
//! ```text
//! bind ─► Stopped ──serve()──► Running ──stop()──► Stopping ──drained──► Stopped
//!                                 │                    │
//!                            acceptor task       listener closed,
//!                        (one accept at a time)  sessions finishing
//! ```

use crate::config::Config;
use crate::error::{Result, ServerError};
use crate::session::Session;
use parking_lot::Mutex;
use replica_core::{
    AtomicServerState, LifecycleEvent, RecomputeEntry, ServerState, VersionedStore,
};
use replica_types::{Snapshot, Transmissible, TypeRegistry, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Notify};

/// Pause after an unexpected accept error so a persistent failure
/// (e.g. file descriptor exhaustion) does not spin the acceptor.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Operational metrics for monitoring server activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Total connections accepted.
    pub connections_total: AtomicU64,
    /// Total fetch-all requests served.
    pub requests_all: AtomicU64,
    /// Total keyed requests served.
    pub requests_keyed: AtomicU64,
    /// Total entries sent across all responses.
    pub entries_sent: AtomicU64,
    /// Total response bytes written (including length prefixes).
    pub bytes_sent: AtomicU64,
    /// Total connections that ended in an error.
    pub errors_total: AtomicU64,
    /// Total connections dropped on a read or write deadline.
    pub timeouts_total: AtomicU64,
}

/// State shared between the server handle, the acceptor and every session.
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) store: VersionedStore,
    pub(crate) registry: TypeRegistry,
    pub(crate) metrics: ServerMetrics,
    state: AtomicServerState,
    connections: AtomicUsize,
    /// Woken when `connections` drops to zero.
    drained: Notify,
    /// Set to true to ask the acceptor to stop.
    stop_tx: watch::Sender<bool>,
    /// Set to true once the listening socket is closed.
    closed_tx: watch::Sender<bool>,
}

impl Shared {
    /// Record a failed connection.
    pub(crate) fn record_error(&self, error: &ServerError) {
        self.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
        if matches!(error, ServerError::Timeout { .. }) {
            self.metrics.timeouts_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn wait_drained(&self) {
        loop {
            // Register before checking so a decrement in between still wakes us.
            let notified = self.drained.notified();
            if self.connections.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn mark_listener_closed(&self) {
        self.closed_tx.send_replace(true);
    }
}

/// Counts one in-flight connection for as long as it lives.
struct ConnectionGuard {
    shared: Arc<Shared>,
}

impl ConnectionGuard {
    fn new(shared: Arc<Shared>) -> Self {
        shared.connections.fetch_add(1, Ordering::AcqRel);
        Self { shared }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.shared.connections.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.drained.notify_waiters();
        }
    }
}

/// Pull-based replication server.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> Result<(), replica_server::error::ServerError> {
/// use replica_server::{Config, ReplicationServer};
///
/// let server = ReplicationServer::bind(Config::with_bind_address("127.0.0.1:8086")).await?;
/// server.set("motd", 1, "hello");
/// server.serve()?;
///
/// // ... later
/// server.graceful_stop().await;
/// # Ok(())
/// # }
/// ```
pub struct ReplicationServer {
    shared: Arc<Shared>,
    local_addr: SocketAddr,
    /// Listener waiting for `serve()`; moved into the acceptor task.
    listener: Mutex<Option<TcpListener>>,
}

impl std::fmt::Debug for ReplicationServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicationServer")
            .field("local_addr", &self.local_addr)
            .field("state", &self.state())
            .field("connections", &self.connections())
            .field("entries", &self.shared.store.len())
            .field("metrics", &self.shared.metrics)
            .finish_non_exhaustive()
    }
}

impl ReplicationServer {
    /// Load `path` and bind the server it describes.
    pub async fn from_config_file(path: &Path) -> Result<Self> {
        let config = Config::from_file(path)?;
        Self::bind(config).await
    }

    /// Bind the listening socket described by `config` and load its seed
    /// entries into the store.
    ///
    /// The server starts in [`ServerState::Stopped`]; call [`serve`](Self::serve)
    /// to begin accepting.
    pub async fn bind(config: Config) -> Result<Self> {
        let listener = TcpListener::bind(&config.server.bind_address)
            .await
            .map_err(ServerError::Connect)?;
        let local_addr = listener.local_addr().map_err(ServerError::Connect)?;

        let (stop_tx, _) = watch::channel(false);
        let (closed_tx, _) = watch::channel(false);

        tracing::debug!("Bound replication listener on {}", local_addr);

        let store = VersionedStore::new();
        for entry in &config.entries {
            store.set(entry.key.as_str(), entry.version, entry.to_value());
        }

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                store,
                registry: TypeRegistry::new(),
                metrics: ServerMetrics::default(),
                state: AtomicServerState::new(),
                connections: AtomicUsize::new(0),
                drained: Notify::new(),
                stop_tx,
                closed_tx,
            }),
            local_addr,
            listener: Mutex::new(Some(listener)),
        })
    }

    /// Start the acceptor task and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn serve(&self) -> Result<()> {
        let listener = {
            let mut slot = self.listener.lock();
            let Some(listener) = slot.take() else {
                return Err(if self.state().is_running() {
                    ServerError::AlreadyStarted
                } else {
                    ServerError::ListenerClosed
                });
            };
            if self.shared.state.apply(LifecycleEvent::ServeRequested).is_err() {
                *slot = Some(listener);
                return Err(ServerError::AlreadyStarted);
            }
            listener
        };

        let acceptor = Acceptor {
            shared: Arc::clone(&self.shared),
            stop_rx: self.shared.stop_tx.subscribe(),
        };
        tokio::spawn(acceptor.run(listener));
        Ok(())
    }

    /// Ask the acceptor to stop accepting and close the listener.
    ///
    /// In-flight connections are not interrupted.
    pub fn stop(&self) {
        // Same lock as serve(), so a stop cannot land between serve taking
        // the listener and publishing Running.
        let unused = {
            let mut slot = self.listener.lock();
            let _ = self.shared.state.apply(LifecycleEvent::StopRequested);
            slot.take()
        };
        self.shared.stop_tx.send_replace(true);

        // Never served: nothing else will close the listener.
        if let Some(listener) = unused {
            drop(listener);
            self.shared.mark_listener_closed();
        }
    }

    /// Stop, wait for the listener to close, then wait for every in-flight
    /// connection to finish.
    pub async fn graceful_stop(&self) {
        self.stop();

        let mut closed_rx = self.shared.closed_tx.subscribe();
        // The sender lives in `shared`, which we hold, so this only ends when closed.
        let _ = closed_rx.wait_for(|closed| *closed).await;

        self.shared.wait_drained().await;
        let _ = self.shared.state.apply(LifecycleEvent::Drained);
        tracing::info!("Replication server stopped on {}", self.local_addr);
    }

    /// Number of in-flight connections.
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        self.shared.state.load()
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Server configuration.
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Operational metrics.
    pub fn metrics(&self) -> &ServerMetrics {
        &self.shared.metrics
    }

    /// Insert or overwrite `key`.
    pub fn set(&self, key: impl Into<String>, version: i64, value: impl Into<Value>) {
        self.shared.store.set(key, version, value);
    }

    /// Remove `key`.
    pub fn unset(&self, key: &str) {
        self.shared.store.unset(key);
    }

    /// Check whether `key` is stored.
    pub fn is_set(&self, key: &str) -> bool {
        self.shared.store.is_set(key)
    }

    /// Get a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.shared.store.get(key)
    }

    /// Get the version stored under `key`.
    pub fn get_version(&self, key: &str) -> Option<i64> {
        self.shared.store.get_version(key)
    }

    /// Copy of every stored entry.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.store.snapshot()
    }

    /// Register a hook recomputing the entry served for `key`.
    pub fn set_hook<H>(&self, key: impl Into<String>, hook: H)
    where
        H: RecomputeEntry + 'static,
    {
        self.shared.store.set_hook(key, hook);
    }

    /// Remove the hook for `key`.
    pub fn unset_hook(&self, key: &str) {
        self.shared.store.unset_hook(key);
    }

    /// Check whether `key` has a hook.
    pub fn is_hooked(&self, key: &str) -> bool {
        self.shared.store.is_hooked(key)
    }

    /// Declare `T` as transmissible in responses.
    pub fn register_type<T: Transmissible>(&self) {
        self.shared.registry.register::<T>();
    }

    /// Handle to the server's type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.shared.registry
    }
}

impl Drop for ReplicationServer {
    fn drop(&mut self) {
        // Let a still-running acceptor release the port.
        self.shared.stop_tx.send_replace(true);
    }
}

/// The accept loop, run as its own task.
struct Acceptor {
    shared: Arc<Shared>,
    stop_rx: watch::Receiver<bool>,
}

impl Acceptor {
    async fn run(self, listener: TcpListener) {
        let Acceptor {
            shared,
            mut stop_rx,
        } = self;
        let local_addr = listener.local_addr().ok();
        tracing::info!("Replication server started on {:?}", local_addr);

        loop {
            tokio::select! {
                biased;
                _ = async { let _ = stop_rx.wait_for(|stopped| *stopped).await; } => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => dispatch(&shared, stream, peer),
                    Err(e) if !shared.state.load().is_running() => {
                        tracing::debug!("Accept interrupted by shutdown: {}", e);
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                        shared.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        shared.mark_listener_closed();
        tracing::info!("Replication server shutdown, listener {:?} closed", local_addr);
    }
}

/// Hand an accepted connection to its own session task.
fn dispatch(shared: &Arc<Shared>, stream: TcpStream, peer: SocketAddr) {
    let guard = ConnectionGuard::new(Arc::clone(shared));
    shared
        .metrics
        .connections_total
        .fetch_add(1, Ordering::Relaxed);

    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        let _guard = guard;
        let session = Session::new(Arc::clone(&shared), stream, peer);
        if let Err(e) = session.run().await {
            shared.record_error(&e);
            if e.is_connection_error() {
                tracing::warn!("Connection error from {}: {}", peer, e);
            } else {
                tracing::error!("Session with {} failed: {}", peer, e);
            }
        }
    });
}
