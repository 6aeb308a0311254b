//! gRPC server adapter and wire conversions

use crate::common::messages;
use crate::proto;
use crate::proto::route_server::{Route, RouteServer};
use crate::replica::node::ReplicaNode;
use crate::replica::rpc::ReplicaRpc;
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// Field-for-field conversions between generated and domain messages.
macro_rules! mirror {
    ($($name:ident { $($field:ident),* })*) => {$(
        impl From<proto::$name> for messages::$name {
            fn from(m: proto::$name) -> Self {
                Self { $($field: m.$field),* }
            }
        }

        impl From<messages::$name> for proto::$name {
            fn from(m: messages::$name) -> Self {
                Self { $($field: m.$field),* }
            }
        }
    )*};
}

mirror! {
    ConnectRequest { client_id }
    HeartbeatRequest { sender_id, lamport }
    ElectionResultRequest { leader_id, body, sender_id, lamport }
    HelloRequest { body, client_id }
    BroadcastRequest { body }
    Acknowledgement { status, lamport }
    TextReply { body }
}

/// Serves the `Route` service on behalf of a [`ReplicaNode`].
pub struct RouteService {
    node: Arc<ReplicaNode>,
}

impl RouteService {
    pub fn new(node: Arc<ReplicaNode>) -> Self {
        Self { node }
    }

    pub fn into_server(self) -> RouteServer<Self> {
        RouteServer::new(self)
    }
}

#[tonic::async_trait]
impl Route for RouteService {
    async fn connect(
        &self,
        request: Request<proto::ConnectRequest>,
    ) -> Result<Response<proto::Acknowledgement>, Status> {
        let ack = self
            .node
            .connect(request.into_inner().into())
            .await
            .map_err(|e| e.to_grpc_status())?;
        Ok(Response::new(ack.into()))
    }

    async fn send_heartbeat(
        &self,
        request: Request<proto::HeartbeatRequest>,
    ) -> Result<Response<proto::Acknowledgement>, Status> {
        let ack = self
            .node
            .send_heartbeat(request.into_inner().into())
            .await
            .map_err(|e| e.to_grpc_status())?;
        Ok(Response::new(ack.into()))
    }

    async fn election_result(
        &self,
        request: Request<proto::ElectionResultRequest>,
    ) -> Result<Response<proto::Acknowledgement>, Status> {
        let ack = self
            .node
            .election_result(request.into_inner().into())
            .await
            .map_err(|e| e.to_grpc_status())?;
        Ok(Response::new(ack.into()))
    }

    async fn say_hello(
        &self,
        request: Request<proto::HelloRequest>,
    ) -> Result<Response<proto::TextReply>, Status> {
        let reply = self
            .node
            .say_hello(request.into_inner().into())
            .await
            .map_err(|e| e.to_grpc_status())?;
        Ok(Response::new(reply.into()))
    }

    async fn broadcast_message(
        &self,
        request: Request<proto::BroadcastRequest>,
    ) -> Result<Response<proto::TextReply>, Status> {
        let reply = self
            .node
            .broadcast_message(request.into_inner().into())
            .await
            .map_err(|e| e.to_grpc_status())?;
        Ok(Response::new(reply.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ActivityLog, ConnectRequest};
    use crate::replica::node::NodeOptions;

    #[test]
    fn test_election_result_conversion_keeps_fields() {
        let wire = proto::ElectionResultRequest {
            leader_id: 3,
            body: "Server 3 is the new leader".into(),
            sender_id: 2,
            lamport: 17,
        };

        let domain: messages::ElectionResultRequest = wire.clone().into();
        assert_eq!(domain.leader_id, 3);
        assert_eq!(domain.sender_id, 2);
        assert_eq!(domain.lamport, 17);
        assert_eq!(proto::ElectionResultRequest::from(domain), wire);
    }

    #[tokio::test]
    async fn test_duplicate_connect_maps_to_already_exists() {
        let node = Arc::new(ReplicaNode::new(
            1,
            1,
            NodeOptions::default(),
            ActivityLog::disabled(),
        ));
        node.connect(ConnectRequest { client_id: 7 }).await.unwrap();

        let service = RouteService::new(node);
        let status = service
            .connect(Request::new(proto::ConnectRequest { client_id: 7 }))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::AlreadyExists);
    }
}
