//! Error types for passrep

use crate::common::{ClientId, NodeId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Membership Errors ===
    #[error("Duplicate client: client {0} is already connected")]
    DuplicateClient(ClientId),

    #[error("Unreachable peer {id} at {addr}: {reason}")]
    UnreachablePeer {
        id: NodeId,
        addr: String,
        reason: String,
    },

    #[error("No known replicas remain")]
    EmptyRegistry,

    // === Coordination Errors ===
    #[error("Heartbeat to leader {0} timed out")]
    HeartbeatTimeout(NodeId),

    #[error("Replica {id} is not the leader (its leader is {leader})")]
    NotLeader { id: NodeId, leader: NodeId },

    #[error("Failed to deliver election result to replica {id}: {reason}")]
    BroadcastDelivery { id: NodeId, reason: String },

    // === Network Errors ===
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::Status),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Convert to gRPC status for RPC responses
    pub fn to_grpc_status(&self) -> tonic::Status {
        use tonic::Code;
        match self {
            Error::DuplicateClient(_) => tonic::Status::new(Code::AlreadyExists, self.to_string()),
            Error::InvalidConfig(_) => tonic::Status::new(Code::InvalidArgument, self.to_string()),
            Error::Timeout(_) | Error::HeartbeatTimeout(_) => {
                tonic::Status::new(Code::DeadlineExceeded, self.to_string())
            }
            Error::UnreachablePeer { .. }
            | Error::ConnectionFailed(_)
            | Error::Transport(_)
            | Error::BroadcastDelivery { .. } => {
                tonic::Status::new(Code::Unavailable, self.to_string())
            }
            Error::EmptyRegistry | Error::NotLeader { .. } => {
                tonic::Status::new(Code::FailedPrecondition, self.to_string())
            }
            Error::Grpc(status) => status.clone(),
            _ => tonic::Status::new(Code::Internal, self.to_string()),
        }
    }

    /// Map a status returned by a remote `Connect` back into the domain error.
    pub fn from_connect_status(client_id: ClientId, status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::AlreadyExists => Error::DuplicateClient(client_id),
            tonic::Code::DeadlineExceeded => Error::Timeout(status.message().to_string()),
            _ => Error::Grpc(status),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_duplicate_client_round_trips_through_status() {
        let status = Error::DuplicateClient(7).to_grpc_status();
        assert_eq!(status.code(), Code::AlreadyExists);

        let back = Error::from_connect_status(7, status);
        assert!(matches!(back, Error::DuplicateClient(7)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::HeartbeatTimeout(1).to_grpc_status().code(),
            Code::DeadlineExceeded
        );
        assert_eq!(
            Error::EmptyRegistry.to_grpc_status().code(),
            Code::FailedPrecondition
        );
        assert_eq!(
            Error::NotLeader { id: 3, leader: 4 }.to_grpc_status().code(),
            Code::FailedPrecondition
        );
        assert_eq!(
            Error::Internal("boom".into()).to_grpc_status().code(),
            Code::Internal
        );
        let original = tonic::Status::not_found("gone");
        assert_eq!(
            Error::Grpc(original).to_grpc_status().code(),
            Code::NotFound
        );
    }
}
