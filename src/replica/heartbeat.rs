//! Heartbeat failure detector
//!
//! Every interval, a follower probes the node it believes is leader. Any probe
//! other than an acknowledgement from a node that still leads counts as a
//! failure and triggers exactly one election. That covers errors, timeouts,
//! `NotLeader` refusals and a leader missing from the registry.

use crate::common::{Acknowledgement, Error, HeartbeatRequest, LamportTime, NodeId, Result};
use crate::replica::election::ElectionOutcome;
use crate::replica::node::ReplicaNode;
use crate::replica::registry::ReplicaDescriptor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Result of a single probe round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// This node is the leader; nothing was sent.
    Leader,
    Alive { leader_id: NodeId, status: String },
    ElectionHeld(ElectionOutcome),
}

pub struct HeartbeatMonitor {
    node: Arc<ReplicaNode>,
    interval: Duration,
}

impl HeartbeatMonitor {
    pub fn new(node: Arc<ReplicaNode>, interval: Duration) -> Self {
        Self { node, interval }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Probe forever. Rounds never overlap: a slow round (including any
    /// election it triggers) delays the next tick instead of bursting.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let outcome = self.probe_once().await;
            tracing::debug!("Heartbeat round on node {}: {:?}", self.node.id(), outcome);
        }
    }

    pub async fn probe_once(&self) -> HeartbeatOutcome {
        let node = &self.node;

        let (leader_id, target) = {
            let mut state = node.state();
            let leader_id = state.leader_id;
            if leader_id == node.id() {
                return HeartbeatOutcome::Leader;
            }
            let target = state
                .replicas
                .get(leader_id)
                .map(|descriptor| (descriptor, state.clock.tick()));
            (leader_id, target)
        };

        match self.send(leader_id, target).await {
            Ok(ack) => {
                let lamport = node.observe(ack.lamport);
                node.activity()
                    .record(format!("{} | Lamport: {}", ack.status, lamport));
                HeartbeatOutcome::Alive {
                    leader_id,
                    status: ack.status,
                }
            }
            Err(e) => {
                tracing::warn!("Heartbeat to leader {} failed: {}", leader_id, e);
                HeartbeatOutcome::ElectionHeld(node.call_election(leader_id).await)
            }
        }
    }

    async fn send(
        &self,
        leader_id: NodeId,
        target: Option<(ReplicaDescriptor, LamportTime)>,
    ) -> Result<Acknowledgement> {
        let (descriptor, lamport) = target.ok_or_else(|| {
            Error::ConnectionFailed(format!("leader {} is not a registered replica", leader_id))
        })?;

        let request = HeartbeatRequest {
            sender_id: self.node.id(),
            lamport,
        };
        let timeout = self.node.options().rpc_timeout;
        tokio::time::timeout(timeout, descriptor.peer.send_heartbeat(request))
            .await
            .map_err(|_| Error::HeartbeatTimeout(leader_id))?
    }
}
