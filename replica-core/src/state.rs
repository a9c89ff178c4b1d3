//! Server lifecycle state machine.
//!
//! Pure transitions plus an atomic cell so the acceptor task and callers of
//! `stop` can share the current state without a lock. The actual socket work
//! is done by replica-server, which drives the events.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a replication server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    /// Not accepting connections.
    Stopped = 0,
    /// Acceptor is running.
    Running = 1,
    /// Listener closed or closing; in-flight connections draining.
    Stopping = 2,
}

/// Events driving [`ServerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// `serve()` was called.
    ServeRequested,
    /// `stop()` was called.
    StopRequested,
    /// No connections remain after the listener closed.
    Drained,
}

impl ServerState {
    /// Apply an event. Returns `None` for transitions that are not allowed.
    pub fn on_event(self, event: LifecycleEvent) -> Option<Self> {
        match (self, event) {
            (Self::Stopped, LifecycleEvent::ServeRequested) => Some(Self::Running),
            (Self::Running, LifecycleEvent::StopRequested) => Some(Self::Stopping),
            // Repeated stops are harmless.
            (Self::Stopping, LifecycleEvent::StopRequested) => Some(Self::Stopping),
            (Self::Stopped, LifecycleEvent::StopRequested) => Some(Self::Stopped),
            (Self::Stopping, LifecycleEvent::Drained) => Some(Self::Stopped),
            _ => None,
        }
    }

    /// Check whether the acceptor should keep accepting.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Lock-free cell holding a [`ServerState`].
#[derive(Debug)]
pub struct AtomicServerState(AtomicU8);

impl AtomicServerState {
    /// Create a cell in [`ServerState::Stopped`].
    pub fn new() -> Self {
        Self(AtomicU8::new(ServerState::Stopped as u8))
    }

    /// Read the current state.
    pub fn load(&self) -> ServerState {
        ServerState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Apply `event` atomically.
    ///
    /// On success returns the new state; on a disallowed transition returns
    /// the unchanged current state as the error.
    pub fn apply(&self, event: LifecycleEvent) -> Result<ServerState, ServerState> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let state = ServerState::from_u8(current);
            let next = state.on_event(event).ok_or(state)?;
            match self.0.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(next),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for AtomicServerState {
    fn default() -> Self {
        Self::new()
    }
}
