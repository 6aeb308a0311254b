//! Common utilities and types shared across passrep

pub mod activity;
pub mod config;
pub mod error;
pub mod messages;
pub mod utils;

/// Identity of a replica, unique within the replica set.
pub type NodeId = u32;

/// Identity a client presents on `Connect`.
pub type ClientId = u32;

/// Lamport timestamp.
pub type LamportTime = u64;

pub use activity::{client_log_path, replica_log_path, ActivityLog};
pub use config::{PeerConfig, ReplicaConfig};
pub use error::{Error, Result};
pub use messages::{
    Acknowledgement, BroadcastRequest, ConnectRequest, ElectionResultRequest, HeartbeatRequest,
    HelloRequest, TextReply,
};
pub use utils::parse_duration;
