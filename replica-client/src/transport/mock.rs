//! Mock transport for testing.
//!
//! Queues canned responses and records every request sent through it.

use super::{Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Mock transport for testing.
///
/// Clones share state, so a test can keep a handle after moving the
/// transport into a client.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    addresses: Vec<String>,
    sent: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
    closes: usize,
    stall_recv: bool,
    fail_next_connect: Option<String>,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for the next `recv()`.
    pub fn queue_response(&self, data: Vec<u8>) {
        self.inner.lock().responses.push_back(data);
    }

    /// Every message sent so far.
    pub fn sent_messages(&self) -> Vec<Vec<u8>> {
        self.inner.lock().sent.clone()
    }

    /// The most recent message sent.
    pub fn last_sent(&self) -> Option<Vec<u8>> {
        self.inner.lock().sent.last().cloned()
    }

    /// Every address passed to `connect()`, in order.
    pub fn connected_addresses(&self) -> Vec<String> {
        self.inner.lock().addresses.clone()
    }

    /// Number of `close()` calls.
    pub fn close_count(&self) -> usize {
        self.inner.lock().closes
    }

    /// Make `recv()` wait forever (for deadline tests).
    pub fn stall_recv(&self, stall: bool) {
        self.inner.lock().stall_recv = stall;
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.inner.lock().fail_next_connect = Some(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.inner.lock().fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        self.inner.lock().fail_next_recv = Some(error.to_string());
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if let Some(error) = inner.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }
        inner.connected = true;
        inner.addresses.push(address.to_string());
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }
        inner.sent.push(data.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let stall = {
            let mut inner = self.inner.lock();
            if !inner.connected {
                return Err(TransportError::NotConnected);
            }
            if let Some(error) = inner.fail_next_recv.take() {
                return Err(TransportError::ReceiveFailed(error));
            }
            inner.stall_recv
        };

        if stall {
            std::future::pending::<()>().await;
        }

        self.inner
            .lock()
            .responses
            .pop_front()
            .ok_or(TransportError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        inner.connected = false;
        inner.closes += 1;
        Ok(())
    }
}
