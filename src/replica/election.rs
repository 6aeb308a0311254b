//! Leader election
//!
//! Run by a follower whose heartbeat to the leader failed. Three phases:
//!
//! 1. **Purge** the failed leader from the local registry.
//! 2. **Select** the greatest identity among this node and its remaining peers.
//! 3. **Disseminate** the result to every remaining peer, concurrently, each
//!    call bounded by the rpc timeout.
//!
//! The local leader identity is updated after dissemination regardless of how
//! many peers acknowledged. Peers that could not be reached are reported (and
//! optionally purged) but never abort the election.

use crate::common::{Acknowledgement, ElectionResultRequest, Error, NodeId, Result};
use crate::replica::node::ReplicaNode;
use crate::replica::registry::ReplicaRegistry;
use futures_util::future::join_all;

/// What an election did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionOutcome {
    pub failed_leader: NodeId,
    pub leader_id: NodeId,
    /// Peers that acknowledged the result
    pub delivered: Vec<NodeId>,
    /// Peers that errored or timed out
    pub undelivered: Vec<NodeId>,
    /// Peers removed from the registry during this election
    pub purged: Vec<NodeId>,
}

impl ElectionOutcome {
    pub fn elected_self(&self, self_id: NodeId) -> bool {
        self.leader_id == self_id
    }
}

/// Choose the next leader: the greatest identity among `self_id` and the
/// registered peers. A node with no peers left elects itself.
pub fn select_candidate(self_id: NodeId, replicas: &ReplicaRegistry) -> NodeId {
    match replicas.max_identity() {
        Ok(descriptor) => descriptor.id.max(self_id),
        Err(Error::EmptyRegistry) => self_id,
        Err(e) => {
            tracing::warn!("Candidate selection failed ({}), electing self", e);
            self_id
        }
    }
}

/// Per-peer result of announcing a leader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dissemination {
    pub delivered: Vec<NodeId>,
    pub undelivered: Vec<NodeId>,
    /// Undelivered peers dropped from the registry
    pub purged: Vec<NodeId>,
}

pub struct Election<'a> {
    node: &'a ReplicaNode,
    failed_leader: NodeId,
}

impl<'a> Election<'a> {
    pub fn new(node: &'a ReplicaNode, failed_leader: NodeId) -> Self {
        Self {
            node,
            failed_leader,
        }
    }

    /// Remove the failed leader. Starting an election is a clock event.
    pub fn purge(&self) -> bool {
        let mut state = self.node.state();
        state.clock.tick();
        state.replicas.remove(self.failed_leader).is_some()
    }

    pub fn select(&self) -> NodeId {
        let state = self.node.state();
        select_candidate(self.node.id(), &state.replicas)
    }

    /// Announce `leader_id` to every registered peer, then record it locally
    /// whatever the delivery count.
    pub async fn disseminate(&self, leader_id: NodeId) -> Dissemination {
        let node = self.node;
        let (targets, request) = {
            let mut state = node.state();
            let lamport = state.clock.tick();
            let request = ElectionResultRequest {
                leader_id,
                body: format!("Server {} is the new leader", leader_id),
                sender_id: node.id(),
                lamport,
            };
            (state.replicas.all(), request)
        };

        let timeout = node.options().rpc_timeout;
        let sends = targets.into_iter().map(|descriptor| {
            let request = request.clone();
            async move {
                let result =
                    match tokio::time::timeout(timeout, descriptor.peer.election_result(request))
                        .await
                    {
                        Ok(Ok(ack)) => Ok(ack),
                        Ok(Err(e)) => Err(Error::BroadcastDelivery {
                            id: descriptor.id,
                            reason: e.to_string(),
                        }),
                        Err(_) => Err(Error::BroadcastDelivery {
                            id: descriptor.id,
                            reason: format!("no reply within {:?}", timeout),
                        }),
                    };
                (descriptor.id, result)
            }
        });
        let results: Vec<(NodeId, Result<Acknowledgement>)> = join_all(sends).await;

        let mut report = Dissemination::default();
        for (id, result) in results {
            match result {
                Ok(ack) => {
                    let lamport = node.observe(ack.lamport);
                    node.activity()
                        .record(format!("{} | Lamport: {}", ack.status, lamport));
                    report.delivered.push(id);
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    node.activity().record(format!(
                        "Failed to send election result to server {}, assuming it is dead",
                        id
                    ));
                    report.undelivered.push(id);
                }
            }
        }

        let mut state = node.state();
        if node.options().purge_unreachable_peers {
            for &id in &report.undelivered {
                if state.replicas.remove(id).is_some() {
                    report.purged.push(id);
                }
            }
        }
        state.leader_id = leader_id;
        report
    }

    pub async fn run(self) -> ElectionOutcome {
        let activity = self.node.activity();

        activity.record(format!(
            "Leader {} not responding... calling election",
            self.failed_leader
        ));

        let mut purged = Vec::new();
        if self.purge() {
            purged.push(self.failed_leader);
            activity.record(format!(
                "Removed failed leader {} from replicas",
                self.failed_leader
            ));
        }

        let leader_id = self.select();
        activity.record(format!("Selected server {} as the new leader", leader_id));

        let report = self.disseminate(leader_id).await;
        purged.extend(&report.purged);

        activity.record(format!(
            "Election complete: leader is {} ({} of {} peers notified)",
            leader_id,
            report.delivered.len(),
            report.delivered.len() + report.undelivered.len()
        ));

        ElectionOutcome {
            failed_leader: self.failed_leader,
            leader_id,
            delivered: report.delivered,
            undelivered: report.undelivered,
            purged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{
        ActivityLog, BroadcastRequest, ConnectRequest, HeartbeatRequest, HelloRequest, TextReply,
    };
    use crate::replica::node::NodeOptions;
    use crate::replica::registry::ReplicaDescriptor;
    use crate::replica::rpc::ReplicaRpc;
    use std::sync::Arc;

    struct Unreachable;

    #[tonic::async_trait]
    impl ReplicaRpc for Unreachable {
        async fn connect(&self, _req: ConnectRequest) -> Result<Acknowledgement> {
            Err(Error::ConnectionFailed("down".into()))
        }
        async fn send_heartbeat(&self, _req: HeartbeatRequest) -> Result<Acknowledgement> {
            Err(Error::ConnectionFailed("down".into()))
        }
        async fn election_result(&self, _req: ElectionResultRequest) -> Result<Acknowledgement> {
            Err(Error::ConnectionFailed("down".into()))
        }
        async fn say_hello(&self, _req: HelloRequest) -> Result<TextReply> {
            Err(Error::ConnectionFailed("down".into()))
        }
        async fn broadcast_message(&self, _req: BroadcastRequest) -> Result<TextReply> {
            Err(Error::ConnectionFailed("down".into()))
        }
    }

    fn registry_of(ids: &[NodeId]) -> ReplicaRegistry {
        let mut registry = ReplicaRegistry::new();
        for &id in ids {
            registry.insert(ReplicaDescriptor::new(id, "unused", Arc::new(Unreachable)));
        }
        registry
    }

    #[test]
    fn test_select_includes_self() {
        assert_eq!(select_candidate(3, &registry_of(&[2])), 3);
        assert_eq!(select_candidate(2, &registry_of(&[3])), 3);
        assert_eq!(select_candidate(1, &registry_of(&[2, 3])), 3);
    }

    #[test]
    fn test_select_on_empty_registry_elects_self() {
        assert_eq!(select_candidate(4, &ReplicaRegistry::new()), 4);
    }

    #[tokio::test]
    async fn test_unreachable_peers_do_not_abort() {
        let node = ReplicaNode::new(2, 5, NodeOptions::default(), ActivityLog::disabled());
        for id in [3, 5] {
            node.register_replica(id, "unused", Arc::new(Unreachable));
        }

        let outcome = node.call_election(5).await;

        assert_eq!(outcome.leader_id, 3);
        assert!(outcome.delivered.is_empty());
        assert_eq!(outcome.undelivered, vec![3]);
        assert_eq!(outcome.purged, vec![5, 3]);
        assert_eq!(node.leader_id(), 3);
        assert!(node.replica_ids().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_peers_kept_when_purging_disabled() {
        let options = NodeOptions {
            purge_unreachable_peers: false,
            ..NodeOptions::default()
        };
        let node = ReplicaNode::new(1, 9, options, ActivityLog::disabled());
        node.register_replica(2, "unused", Arc::new(Unreachable));

        let outcome = node.call_election(9).await;

        assert_eq!(outcome.leader_id, 2);
        assert!(outcome.purged.is_empty());
        assert_eq!(node.replica_ids(), vec![2]);
    }

    #[tokio::test]
    async fn test_election_ticks_clock() {
        let node = ReplicaNode::new(1, 2, NodeOptions::default(), ActivityLog::disabled());
        let before = node.lamport();

        let outcome = node.call_election(2).await;

        assert!(outcome.elected_self(1));
        assert!(node.is_leader());
        assert!(node.lamport() > before);
    }
}
