//! The replica RPC surface as a trait
//!
//! Implemented by the local node (inbound handling), by [`RemoteReplica`]
//! (outbound calls over gRPC), and by test doubles.
//!
//! [`RemoteReplica`]: crate::replica::remote::RemoteReplica

use crate::common::{
    Acknowledgement, BroadcastRequest, ConnectRequest, ElectionResultRequest, HeartbeatRequest,
    HelloRequest, Result, TextReply,
};

#[tonic::async_trait]
pub trait ReplicaRpc: Send + Sync {
    /// Register a client.
    async fn connect(&self, req: ConnectRequest) -> Result<Acknowledgement>;

    /// Liveness probe from a follower to the node it believes is leader.
    async fn send_heartbeat(&self, req: HeartbeatRequest) -> Result<Acknowledgement>;

    /// Announce the outcome of an election.
    async fn election_result(&self, req: ElectionResultRequest) -> Result<Acknowledgement>;

    async fn say_hello(&self, req: HelloRequest) -> Result<TextReply>;

    async fn broadcast_message(&self, req: BroadcastRequest) -> Result<TextReply>;
}
