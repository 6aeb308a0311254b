//! Request and response types of the replica RPC surface
//!
//! These mirror the protobuf messages in `proto/route.proto`; the gRPC layer
//! converts between the two.

use crate::common::{ClientId, LamportTime, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub client_id: ClientId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatRequest {
    pub sender_id: NodeId,
    pub lamport: LamportTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionResultRequest {
    pub leader_id: NodeId,
    pub body: String,
    pub sender_id: NodeId,
    pub lamport: LamportTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloRequest {
    pub body: String,
    pub client_id: ClientId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRequest {
    pub body: String,
}

/// Status reply, stamped with the responder's clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    pub status: String,
    pub lamport: LamportTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReply {
    pub body: String,
}
