//! # replica-core
//!
//! Pure logic for kvreplica (no network I/O, instant tests).
//!
//! This crate implements the store, the diff algorithm and the lifecycle
//! state machine without any sockets, so every rule can be tested directly.
//!
//! ## Modules
//!
//! - [`store`]: [`VersionedStore`], entries and hooks behind one reader-writer lock
//! - [`hooks`]: [`RecomputeEntry`] and [`HookRegistry`]
//! - [`diff`]: which entries a request receives, under an [`InclusionPolicy`]
//! - [`state`]: [`ServerState`] transitions for the server lifecycle
//! - [`tracked`]: [`TrackedKeys`], the client's key → version bookkeeping
//!
//! The sockets are handled by `replica-server` and `replica-client`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod hooks;
pub mod state;
pub mod store;
pub mod tracked;

pub use diff::{diff, InclusionPolicy};
pub use hooks::{HookRegistry, RecomputeEntry};
pub use state::{AtomicServerState, LifecycleEvent, ServerState};
pub use store::{EncodedResponse, VersionedStore};
pub use tracked::TrackedKeys;
