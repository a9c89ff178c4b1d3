//! TCP transport with length-prefixed framing.

use super::{Transport, TransportError};
use async_trait::async_trait;
use replica_types::frame::{decode_length, encode_frame, LENGTH_PREFIX_SIZE};
use replica_types::{ReplicaError, DEFAULT_MAX_MESSAGE_SIZE};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Transport over a plain TCP connection.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Mutex<Option<TcpStream>>,
    connected: AtomicBool,
    max_message_size: usize,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpTransport {
    /// Create a disconnected transport with the default message limit.
    pub fn new() -> Self {
        Self {
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Set the largest message this transport sends or accepts.
    pub fn with_max_message_size(mut self, limit: usize) -> Self {
        self.max_message_size = limit;
        self
    }

    /// The configured message limit.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

fn too_large(e: ReplicaError) -> TransportError {
    match e {
        ReplicaError::MessageTooLarge { size, limit } => {
            TransportError::MessageTooLarge { size, limit }
        }
        other => TransportError::SendFailed(other.to_string()),
    }
}

fn read_error(e: std::io::Error) -> TransportError {
    if e.kind() == ErrorKind::UnexpectedEof {
        TransportError::ConnectionClosed
    } else {
        TransportError::ReceiveFailed(e.to_string())
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", address, e)))?;
        // Small single-message exchanges; don't wait on Nagle.
        let _ = stream.set_nodelay(true);

        *self.stream.lock().await = Some(stream);
        self.connected.store(true, Ordering::Release);
        tracing::debug!("Connected to {}", address);
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let frame = encode_frame(data, self.max_message_size).map_err(too_large)?;

        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;
        stream
            .write_all(&frame)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let mut header = [0u8; LENGTH_PREFIX_SIZE];
        stream.read_exact(&mut header).await.map_err(read_error)?;
        let len = decode_length(header, self.max_message_size).map_err(too_large)?;

        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await.map_err(read_error)?;
        Ok(payload)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::Release);
        if let Some(mut stream) = self.stream.lock().await.take() {
            // Peer may have closed first.
            let _ = stream.shutdown().await;
        }
        Ok(())
    }
}
