//! # passrep
//!
//! Coordination core for a passively replicated service:
//! - Fixed replica set with one designated leader
//! - Heartbeat failure detection from every follower to the leader
//! - Highest-identity leader election with concurrent result dissemination
//! - Lamport clocks on every replica-to-replica message
//! - gRPC between replicas and clients, HTTP for status
//!
//! ## Architecture

#![allow(clippy::result_large_err)]
//!
//! ```text
//!        ┌──────────────┐   heartbeat    ┌──────────────┐
//!        │  Replica 1   │ ─────────────▶ │  Replica 3   │
//!        │  (follower)  │ ◀───────────── │   (leader)   │
//!        └──────┬───────┘   ack + clock  └──────▲───────┘
//!               │                               │
//!               │ election result               │ heartbeat
//!               ▼                               │
//!        ┌──────────────┐                       │
//!        │  Replica 2   │ ──────────────────────┘
//!        │  (follower)  │
//!        └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start a replica set of three
//! ```bash
//! passrep-replica serve --id 0 --num-replicas 3 --leader 2 --log-dir ./logs
//! passrep-replica serve --id 1 --num-replicas 3 --leader 2 --log-dir ./logs
//! passrep-replica serve --id 2 --num-replicas 3 --leader 2 --log-dir ./logs
//! ```
//!
//! ### Talk to it
//! ```bash
//! passrep-client --id 7 --server localhost:8082
//! ```

pub mod common;
pub mod replica;

// Re-export commonly used types
pub use common::{Error, ReplicaConfig, Result};
pub use replica::{ReplicaNode, ReplicaServer};

// Generated protobuf code
pub mod proto {
    tonic::include_proto!("route");
}
