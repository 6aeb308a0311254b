//! Heartbeat failure detection with paused tokio time

use passrep::common::{
    Acknowledgement, ActivityLog, BroadcastRequest, ConnectRequest, ElectionResultRequest, Error,
    HeartbeatRequest, HelloRequest, NodeId, Result, TextReply,
};
use passrep::replica::{HeartbeatMonitor, HeartbeatOutcome, NodeOptions, ReplicaNode, ReplicaRpc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Answers heartbeats after `delay` and counts election results.
struct Peer {
    id: NodeId,
    delay: Duration,
    lamport: u64,
    elections: AtomicUsize,
}

impl Peer {
    fn new(id: NodeId, delay: Duration, lamport: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            delay,
            lamport,
            elections: AtomicUsize::new(0),
        })
    }

    fn elections(&self) -> usize {
        self.elections.load(Ordering::SeqCst)
    }
}

#[tonic::async_trait]
impl ReplicaRpc for Peer {
    async fn connect(&self, _req: ConnectRequest) -> Result<Acknowledgement> {
        Err(Error::ConnectionFailed("unused".into()))
    }
    async fn send_heartbeat(&self, req: HeartbeatRequest) -> Result<Acknowledgement> {
        tokio::time::sleep(self.delay).await;
        Ok(Acknowledgement {
            status: format!("Leader (server {}) is alive", self.id),
            lamport: self.lamport.max(req.lamport) + 1,
        })
    }
    async fn election_result(&self, req: ElectionResultRequest) -> Result<Acknowledgement> {
        self.elections.fetch_add(1, Ordering::SeqCst);
        Ok(Acknowledgement {
            status: format!("Set new leader to {}", req.leader_id),
            lamport: req.lamport + 1,
        })
    }
    async fn say_hello(&self, req: HelloRequest) -> Result<TextReply> {
        Ok(TextReply { body: req.body })
    }
    async fn broadcast_message(&self, req: BroadcastRequest) -> Result<TextReply> {
        Ok(TextReply { body: req.body })
    }
}

fn options() -> NodeOptions {
    NodeOptions {
        rpc_timeout: Duration::from_secs(1),
        purge_unreachable_peers: true,
    }
}

fn follower(id: NodeId, leader: NodeId) -> Arc<ReplicaNode> {
    Arc::new(ReplicaNode::new(id, leader, options(), ActivityLog::disabled()))
}

#[tokio::test(start_paused = true)]
async fn test_leader_does_not_probe() {
    let leader = follower(3, 3);
    let monitor = HeartbeatMonitor::new(leader.clone(), Duration::from_secs(5));

    assert_eq!(monitor.probe_once().await, HeartbeatOutcome::Leader);
    assert_eq!(leader.lamport(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_alive_leader_merges_clock() {
    let node = follower(1, 3);
    node.register_replica(3, "mem:3", Peer::new(3, Duration::ZERO, 100));
    let before = node.lamport();

    let outcome = HeartbeatMonitor::new(node.clone(), Duration::from_secs(5))
        .probe_once()
        .await;

    assert!(matches!(outcome, HeartbeatOutcome::Alive { leader_id: 3, .. }));
    assert!(node.lamport() > 100);
    assert!(node.lamport() > before);
    assert_eq!(node.leader_id(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_slow_leader_triggers_election() {
    let node = follower(1, 3);
    let two = Peer::new(2, Duration::ZERO, 0);
    node.register_replica(2, "mem:2", two.clone());
    node.register_replica(3, "mem:3", Peer::new(3, Duration::from_secs(60), 0));

    let outcome = HeartbeatMonitor::new(node.clone(), Duration::from_secs(5))
        .probe_once()
        .await;

    let HeartbeatOutcome::ElectionHeld(election) = outcome else {
        panic!("expected an election, got {:?}", outcome);
    };
    assert_eq!(election.failed_leader, 3);
    assert_eq!(election.leader_id, 2);
    assert_eq!(two.elections(), 1);
    assert_eq!(node.leader_id(), 2);
    assert_eq!(node.replica_ids(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_leader_triggers_election() {
    let node = follower(4, 9);
    let two = Peer::new(2, Duration::ZERO, 0);
    node.register_replica(2, "mem:2", two.clone());

    let outcome = HeartbeatMonitor::new(node.clone(), Duration::from_secs(5))
        .probe_once()
        .await;

    assert!(matches!(outcome, HeartbeatOutcome::ElectionHeld(_)));
    assert!(node.is_leader());
    assert_eq!(two.elections(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_one_election_per_failure() {
    let node = follower(1, 3);
    let two = Peer::new(2, Duration::ZERO, 0);
    node.register_replica(2, "mem:2", two.clone());
    node.register_replica(3, "mem:3", Peer::new(3, Duration::from_secs(60), 0));

    let handle = HeartbeatMonitor::new(node.clone(), Duration::from_secs(5)).spawn();

    // Several intervals pass; only the first round fails.
    tokio::time::sleep(Duration::from_secs(30)).await;
    handle.abort();

    assert_eq!(two.elections(), 1);
    assert_eq!(node.leader_id(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_follower_reply_counts_as_failure() {
    // 3 is alive but now follows 4, so it cannot vouch for itself
    let two = follower(2, 3);
    let three = follower(3, 4);
    two.register_replica(3, "mem:3", three.clone());

    let outcome = HeartbeatMonitor::new(two.clone(), Duration::from_secs(5))
        .probe_once()
        .await;

    let HeartbeatOutcome::ElectionHeld(election) = outcome else {
        panic!("expected an election, got {:?}", outcome);
    };
    assert_eq!(election.failed_leader, 3);
    assert_ne!(two.leader_id(), 3);
    assert_eq!(three.leader_id(), 4);
}
