//! Replica node: shared coordination state and inbound RPC handling
//!
//! All mutable state (clock, leader identity, replica and client registries)
//! sits behind a single mutex. The lock is only ever held for short,
//! synchronous sections and never across an `.await`.

use crate::common::{
    Acknowledgement, ActivityLog, BroadcastRequest, ClientId, ConnectRequest,
    ElectionResultRequest, Error, HeartbeatRequest, HelloRequest, LamportTime, NodeId, Result,
    TextReply,
};
use crate::replica::clients::ClientRegistry;
use crate::replica::clock::LamportClock;
use crate::replica::election::{Election, ElectionOutcome};
use crate::replica::registry::{ReplicaDescriptor, ReplicaRegistry};
use crate::replica::remote::RemoteReplica;
use crate::replica::rpc::ReplicaRpc;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Pause between startup dial attempts.
const DIAL_BACKOFF: Duration = Duration::from_millis(200);

/// Tunables for a node's outbound behaviour.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    /// Bound on every outbound call
    pub rpc_timeout: Duration,
    /// Remove peers that fail to receive an election result
    pub purge_unreachable_peers: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(1),
            purge_unreachable_peers: true,
        }
    }
}

/// State guarded by the node lock.
#[derive(Debug)]
pub(crate) struct NodeState {
    pub(crate) clock: LamportClock,
    pub(crate) leader_id: NodeId,
    pub(crate) replicas: ReplicaRegistry,
    pub(crate) clients: ClientRegistry,
}

/// Point-in-time view of a node, as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub leader_id: NodeId,
    pub is_leader: bool,
    pub lamport: LamportTime,
    pub replicas: Vec<NodeId>,
    pub clients: usize,
}

pub struct ReplicaNode {
    id: NodeId,
    options: NodeOptions,
    state: Mutex<NodeState>,
    activity: ActivityLog,
}

impl ReplicaNode {
    pub fn new(id: NodeId, leader_id: NodeId, options: NodeOptions, activity: ActivityLog) -> Self {
        Self {
            id,
            options,
            state: Mutex::new(NodeState {
                clock: LamportClock::new(),
                leader_id,
                replicas: ReplicaRegistry::new(),
                clients: ClientRegistry::new(),
            }),
            activity,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Acquire the node lock.
    ///
    /// A panic while holding the lock leaves the state consistent (every
    /// critical section is a handful of infallible updates), so poisoning is
    /// ignored.
    pub(crate) fn state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn leader_id(&self) -> NodeId {
        self.state().leader_id
    }

    /// A node leads iff its recorded leader is itself.
    pub fn is_leader(&self) -> bool {
        self.leader_id() == self.id
    }

    pub fn lamport(&self) -> LamportTime {
        self.state().clock.now()
    }

    pub fn replica_ids(&self) -> Vec<NodeId> {
        self.state().replicas.ids()
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.state().clients.ids()
    }

    pub fn status(&self) -> NodeStatus {
        let state = self.state();
        NodeStatus {
            node_id: self.id,
            leader_id: state.leader_id,
            is_leader: state.leader_id == self.id,
            lamport: state.clock.now(),
            replicas: state.replicas.ids(),
            clients: state.clients.len(),
        }
    }

    /// Merge a timestamp received from another node.
    pub(crate) fn observe(&self, remote: LamportTime) -> LamportTime {
        self.state().clock.merge(remote)
    }

    /// Store an already-connected peer. Registering is a clock event.
    pub fn register_replica(
        &self,
        id: NodeId,
        addr: impl Into<String>,
        peer: Arc<dyn ReplicaRpc>,
    ) -> LamportTime {
        let addr = addr.into();
        let lamport = {
            let mut state = self.state();
            state
                .replicas
                .insert(ReplicaDescriptor::new(id, addr.clone(), peer));
            state.clock.tick()
        };
        self.activity.record(format!(
            "Connected to replica with id: {} and address: {} | Lamport: {}",
            id, addr, lamport
        ));
        lamport
    }

    /// Dial a peer over gRPC and register it.
    ///
    /// Dialing is retried until `retry_window` elapses; each attempt is bounded
    /// by the rpc timeout.
    pub async fn add_replica(&self, id: NodeId, addr: &str, retry_window: Duration) -> Result<()> {
        let deadline = Instant::now() + retry_window;
        let remote = loop {
            match RemoteReplica::dial(addr, self.options.rpc_timeout).await {
                Ok(remote) => break remote,
                Err(e) if Instant::now() < deadline => {
                    tracing::debug!("Replica {} at {} not reachable yet: {}", id, addr, e);
                    tokio::time::sleep(DIAL_BACKOFF).await;
                }
                Err(e) => {
                    return Err(Error::UnreachablePeer {
                        id,
                        addr: addr.to_string(),
                        reason: e.to_string(),
                    })
                }
            }
        };

        self.register_replica(id, addr, Arc::new(remote));
        Ok(())
    }

    /// Run a full election after `failed_leader` stopped answering.
    pub async fn call_election(&self, failed_leader: NodeId) -> ElectionOutcome {
        Election::new(self, failed_leader).run().await
    }
}

#[tonic::async_trait]
impl ReplicaRpc for ReplicaNode {
    async fn connect(&self, req: ConnectRequest) -> Result<Acknowledgement> {
        let registered = {
            let mut state = self.state();
            state
                .clients
                .register(req.client_id)
                .map(|()| state.clock.now())
        };

        match registered {
            Ok(lamport) => {
                self.activity
                    .record(format!("Client {}: has connected", req.client_id));
                Ok(Acknowledgement {
                    status: "Successfully connected".to_string(),
                    lamport,
                })
            }
            Err(e) => {
                tracing::warn!("Rejected connect: {}", e);
                Err(e)
            }
        }
    }

    async fn send_heartbeat(&self, req: HeartbeatRequest) -> Result<Acknowledgement> {
        let (lamport, leader_id) = {
            let mut state = self.state();
            (state.clock.merge(req.lamport), state.leader_id)
        };

        self.activity.record(format!(
            "Heartbeat from replica {} | Lamport: {}",
            req.sender_id, lamport
        ));

        // Only the leader vouches for itself
        if leader_id != self.id {
            return Err(Error::NotLeader {
                id: self.id,
                leader: leader_id,
            });
        }
        Ok(Acknowledgement {
            status: format!("Leader (server {}) is alive", self.id),
            lamport,
        })
    }

    async fn election_result(&self, req: ElectionResultRequest) -> Result<Acknowledgement> {
        let (previous, purged, lamport) = {
            let mut state = self.state();
            let lamport = state.clock.merge(req.lamport);
            let previous = state.leader_id;
            // Never purge the announced leader or ourselves
            let purged = previous != req.leader_id
                && previous != self.id
                && state.replicas.remove(previous).is_some();
            state.leader_id = req.leader_id;
            (previous, purged, lamport)
        };

        if purged {
            self.activity
                .record(format!("Removed previous leader {} from replicas", previous));
        }
        self.activity.record(format!(
            "Update received from replica {}: new leader is {} | Lamport: {}",
            req.sender_id, req.leader_id, lamport
        ));

        Ok(Acknowledgement {
            status: format!("Set new leader to {}", req.leader_id),
            lamport,
        })
    }

    async fn say_hello(&self, req: HelloRequest) -> Result<TextReply> {
        self.activity
            .record(format!("Client {} says: {}", req.client_id, req.body));
        Ok(TextReply { body: req.body })
    }

    async fn broadcast_message(&self, req: BroadcastRequest) -> Result<TextReply> {
        self.activity.record(format!("Broadcast: {}", req.body));
        Ok(TextReply { body: req.body })
    }
}
