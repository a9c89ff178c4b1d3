//! One request/response exchange on an accepted connection.

use crate::error::{Result, ServerError};
use crate::server::Shared;
use replica_types::frame::{decode_length, encode_frame, LENGTH_PREFIX_SIZE};
use replica_types::Request;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// A single accepted connection.
pub(crate) struct Session {
    shared: Arc<Shared>,
    stream: TcpStream,
    peer: SocketAddr,
}

impl Session {
    pub(crate) fn new(shared: Arc<Shared>, stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            shared,
            stream,
            peer,
        }
    }

    /// Read one request, answer it and close.
    pub(crate) async fn run(mut self) -> Result<()> {
        let request = self.read_request().await?;

        let shared = Arc::clone(&self.shared);
        let metrics = &shared.metrics;
        match &request {
            Request::All => metrics.requests_all.fetch_add(1, Ordering::Relaxed),
            Request::Keys(_) => metrics.requests_keyed.fetch_add(1, Ordering::Relaxed),
        };

        // Store lock is held only inside respond(); the write below happens after release.
        let response = shared.store.respond(
            &request,
            shared.config.protocol.inclusion,
            &shared.registry,
        )?;
        let frame = encode_frame(&response.bytes, shared.config.protocol.max_message_size)?;

        self.write_response(&frame).await?;

        metrics
            .entries_sent
            .fetch_add(response.entries as u64, Ordering::Relaxed);
        metrics
            .bytes_sent
            .fetch_add(frame.len() as u64, Ordering::Relaxed);

        tracing::debug!(
            "Served {} entries ({} bytes) to {}",
            response.entries,
            frame.len(),
            self.peer
        );

        // Peer may already be gone; the response is complete either way.
        let _ = self.stream.shutdown().await;
        Ok(())
    }

    async fn read_request(&mut self) -> Result<Request> {
        let server = &self.shared.config.server;
        let limit = self.shared.config.protocol.max_message_size;

        let read = read_message(&mut self.stream, limit);
        let payload = within(server.read_timeout(), "read", read).await?;

        Ok(Request::from_bytes(&payload)?)
    }

    async fn write_response(&mut self, frame: &[u8]) -> Result<()> {
        let server = &self.shared.config.server;

        let write = write_message(&mut self.stream, frame);
        within(server.write_timeout(), "write", write).await
    }
}

/// Run `fut` under `deadline`, or unbounded when there is none.
async fn within<T, F>(deadline: Option<Duration>, operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(deadline) = deadline else {
        return fut.await;
    };
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| ServerError::Timeout {
            operation,
            secs: deadline.as_secs(),
        })?
}

/// Read a length-prefixed message.
async fn read_message<R>(reader: &mut R, limit: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; LENGTH_PREFIX_SIZE];
    reader
        .read_exact(&mut header)
        .await
        .map_err(ServerError::Transport)?;

    let len = decode_length(header, limit)?;

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(ServerError::Transport)?;
    Ok(payload)
}

/// Write an already framed message.
async fn write_message<W>(writer: &mut W, frame: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await.map_err(ServerError::Transport)?;
    writer.flush().await.map_err(ServerError::Transport)
}
