//! # replica-client
//!
//! Client library for the kvreplica pull-based replication protocol.
//!
//! Applications track the keys they care about together with the last
//! version they saw, and periodically pull whatever changed.
//!
//! ## Features
//!
//! - **Tracked keys**: add, delete or replace the key → version map
//! - **Fetch modes**: everything, tracked keys, or an explicit key map
//! - **Sync**: fetch tracked keys and advance their versions in one call
//! - **Transport Abstraction**: Pluggable transport layer (TCP, mock)
//!
//! ## Example
//!
//! ```ignore
//! use replica_client::ReplicationClient;
//!
//! let client = ReplicationClient::tcp("127.0.0.1:8086");
//!
//! // Everything the server has
//! let all = client.fetch_all().await?;
//!
//! // Only what changed since last time
//! client.add_key("motd", 0);
//! let changed = client.sync().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod transport;

pub use client::{ClientError, ReplicationClient};
pub use transport::{MockTransport, TcpTransport, Transport, TransportError};
