//! Replica node implementation
//!
//! A replica is responsible for:
//! - Tracking peers and connected clients
//! - Keeping a Lamport clock across every message it sends and receives
//! - Probing the leader with heartbeats
//! - Electing and announcing a new leader when the old one fails

pub mod clients;
pub mod clock;
pub mod election;
pub mod grpc;
pub mod heartbeat;
pub mod http;
pub mod node;
pub mod registry;
pub mod remote;
pub mod rpc;
pub mod server;

pub use election::{select_candidate, Dissemination, Election, ElectionOutcome};
pub use heartbeat::{HeartbeatMonitor, HeartbeatOutcome};
pub use node::{NodeOptions, NodeStatus, ReplicaNode};
pub use remote::RemoteReplica;
pub use rpc::ReplicaRpc;
pub use server::{ReplicaServer, RunningReplica};
