//! # replica-types
//!
//! Wire format types for the kvreplica pull-based replication protocol.
//!
//! This crate provides the foundational types used across all kvreplica crates:
//! - [`Value`], [`Entry`], [`Snapshot`] - Replicated data
//! - [`Request`] - What a client asks for (everything, or keys with known versions)
//! - [`TypeRegistry`] - Application types allowed on the wire
//! - [`frame`] - Length-prefixed framing helpers
//! - [`ReplicaError`] - Encoding errors
//!
//! ## Wire protocol
//!
//! One TCP connection carries exactly one exchange:
//!
//! ```text
//! client                         server
//!   | --- [len][Request]   --->    |
//!   | <-- [len][Snapshot]  ----    |
//!   x           close              x
//! ```
//!
//! Both messages are MessagePack-encoded.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
pub mod frame;
mod registry;
mod request;
mod snapshot;
mod value;

pub use error::ReplicaError;
pub use frame::{DEFAULT_MAX_MESSAGE_SIZE, LENGTH_PREFIX_SIZE};
pub use registry::TypeRegistry;
pub use request::{Request, ALL_KEYS};
pub use snapshot::{Entry, Snapshot};
pub use value::{Transmissible, Value};
