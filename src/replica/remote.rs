//! Outbound gRPC stub for a remote replica

use crate::common::{
    Acknowledgement, BroadcastRequest, ConnectRequest, ElectionResultRequest, Error,
    HeartbeatRequest, HelloRequest, Result, TextReply,
};
use crate::proto;
use crate::proto::route_client::RouteClient;
use crate::replica::rpc::ReplicaRpc;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

/// Connection to another replica's `Route` service.
///
/// Cloning is cheap; clones share the underlying channel, which reconnects on
/// its own after transport failures.
#[derive(Clone, Debug)]
pub struct RemoteReplica {
    addr: String,
    client: RouteClient<Channel>,
}

impl RemoteReplica {
    /// Dial `addr` (`host:port` or a full URI) once.
    ///
    /// Both the connection attempt and every later call are bounded by
    /// `timeout`.
    pub async fn dial(addr: &str, timeout: Duration) -> Result<Self> {
        let uri = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{}", addr)
        };

        let endpoint = Endpoint::from_shared(uri)
            .map_err(|e| Error::InvalidConfig(format!("invalid address {}: {}", addr, e)))?
            .connect_timeout(timeout)
            .timeout(timeout);

        let channel = tokio::time::timeout(timeout, endpoint.connect())
            .await
            .map_err(|_| Error::Timeout(format!("dialing {}", addr)))??;

        Ok(Self {
            addr: addr.to_string(),
            client: RouteClient::new(channel),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[tonic::async_trait]
impl ReplicaRpc for RemoteReplica {
    async fn connect(&self, req: ConnectRequest) -> Result<Acknowledgement> {
        let client_id = req.client_id;
        let mut client = self.client.clone();
        let response = client
            .connect(proto::ConnectRequest::from(req))
            .await
            .map_err(|status| Error::from_connect_status(client_id, status))?;
        Ok(response.into_inner().into())
    }

    async fn send_heartbeat(&self, req: HeartbeatRequest) -> Result<Acknowledgement> {
        let mut client = self.client.clone();
        let response = client
            .send_heartbeat(proto::HeartbeatRequest::from(req))
            .await?;
        Ok(response.into_inner().into())
    }

    async fn election_result(&self, req: ElectionResultRequest) -> Result<Acknowledgement> {
        let mut client = self.client.clone();
        let response = client
            .election_result(proto::ElectionResultRequest::from(req))
            .await?;
        Ok(response.into_inner().into())
    }

    async fn say_hello(&self, req: HelloRequest) -> Result<TextReply> {
        let mut client = self.client.clone();
        let response = client.say_hello(proto::HelloRequest::from(req)).await?;
        Ok(response.into_inner().into())
    }

    async fn broadcast_message(&self, req: BroadcastRequest) -> Result<TextReply> {
        let mut client = self.client.clone();
        let response = client
            .broadcast_message(proto::BroadcastRequest::from(req))
            .await?;
        Ok(response.into_inner().into())
    }
}
