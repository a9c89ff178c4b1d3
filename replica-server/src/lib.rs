//! # replica-server
//!
//! Pull-based replication server for kvreplica.
//!
//! The server keeps a versioned key-value store and answers one request per
//! connection with the entries the client does not have yet:
//! - Clients send the versions they hold (or ask for everything)
//! - The server replies with every entry strictly newer than that
//! - Per-key hooks can rewrite what a client receives
//! - `graceful_stop()` closes the listener and drains open connections
//!
//! ## Architecture
//!
//! ```text
//! Client A ──┐                     ┌── Client B
//!            │   TCP, 1 exchange   │
//!            ├────────────────────►│
//!            │                     │
//!        ┌───┴─────────────────────┴───┐
//!        │       replica-server        │
//!        │  ┌───────────────────────┐  │
//!        │  │ VersionedStore + hooks│  │
//!        │  └───────────────────────┘  │
//!        └─────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! Each direction carries a single MessagePack message behind a 4-byte
//! big-endian length prefix:
//! - Request: `All` or `Keys { key → known version }`
//! - Response: a snapshot of `key → (value, version)`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod server;
mod session;

pub use config::{Config, ConfigError, ProtocolConfig, SeedEntry, ServerConfig};
pub use error::{Result, ServerError};
pub use server::{ReplicationServer, ServerMetrics};
