//! How a [`ReplicationClient`](crate::ReplicationClient) reaches a server.
//!
//! Every fetch is a single round-trip on a fresh connection. The client
//! connects, writes one length-prefixed request, reads one length-prefixed
//! response and hangs up. A [`Transport`] owns the socket and the framing for
//! that round-trip, so the client only ever handles whole MessagePack
//! payloads.
//!
//! [`TcpTransport`] is the production implementation. [`MockTransport`]
//! replays queued responses and records what was sent, for tests that should
//! not open sockets.
//!
//! ```ignore
//! let transport = TcpTransport::new();
//! transport.connect("127.0.0.1:8086").await?;
//! transport.send(&request_bytes).await?;
//! let response_bytes = transport.recv().await?;
//! transport.close().await?;
//! ```

mod mock;
mod tcp;

pub use mock::MockTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single round-trip.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// `send` or `recv` was called with no open connection.
    #[error("not connected")]
    NotConnected,

    /// The server hung up before the whole response arrived.
    #[error("connection closed")]
    ConnectionClosed,

    /// Writing the request frame failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Reading the response frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// A frame is larger than the transport accepts.
    #[error("message too large: {size} bytes (limit {limit})")]
    MessageTooLarge {
        /// Size in bytes, as announced by the length prefix or as written.
        size: usize,
        /// Largest frame allowed, in bytes.
        limit: usize,
    },
}

/// One request/response round-trip against a replication server.
///
/// For every fetch the client calls `connect`, `send` and `recv` in turn,
/// then `close` whenever a connection is still open, failure or not.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to `address` (`host:port` for TCP), replacing any
    /// connection left over from an earlier round-trip.
    async fn connect(&self, address: &str) -> Result<(), TransportError>;

    /// Frame `payload` and write it as the request.
    async fn send(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Wait for the response frame and return its payload.
    async fn recv(&self) -> Result<Vec<u8>, TransportError>;

    /// Whether a connection is open.
    fn is_connected(&self) -> bool;

    /// Drop the connection. Closing an already closed transport is a no-op.
    async fn close(&self) -> Result<(), TransportError>;
}
