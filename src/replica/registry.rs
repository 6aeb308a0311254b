//! Peer replica membership

use crate::common::{Error, NodeId, Result};
use crate::replica::rpc::ReplicaRpc;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A known peer: identity, address, and the handle used to call it.
#[derive(Clone)]
pub struct ReplicaDescriptor {
    pub id: NodeId,
    pub addr: String,
    pub peer: Arc<dyn ReplicaRpc>,
}

impl ReplicaDescriptor {
    pub fn new(id: NodeId, addr: impl Into<String>, peer: Arc<dyn ReplicaRpc>) -> Self {
        Self {
            id,
            addr: addr.into(),
            peer,
        }
    }
}

impl fmt::Debug for ReplicaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaDescriptor")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

/// Peers reachable from this node, keyed by identity.
#[derive(Debug, Default)]
pub struct ReplicaRegistry {
    replicas: BTreeMap<NodeId, ReplicaDescriptor>,
}

impl ReplicaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a descriptor, replacing any previous entry with the same identity.
    pub fn insert(&mut self, descriptor: ReplicaDescriptor) -> Option<ReplicaDescriptor> {
        self.replicas.insert(descriptor.id, descriptor)
    }

    /// Remove a peer. Absent identities are ignored.
    pub fn remove(&mut self, id: NodeId) -> Option<ReplicaDescriptor> {
        self.replicas.remove(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<ReplicaDescriptor> {
        self.replicas.get(&id).cloned()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.replicas.contains_key(&id)
    }

    /// Snapshot of every descriptor, in identity order.
    ///
    /// Callers iterate the snapshot after releasing the node lock.
    pub fn all(&self) -> Vec<ReplicaDescriptor> {
        self.replicas.values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.replicas.keys().copied().collect()
    }

    /// The peer with the greatest identity.
    pub fn max_identity(&self) -> Result<&ReplicaDescriptor> {
        self.replicas
            .values()
            .next_back()
            .ok_or(Error::EmptyRegistry)
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }
}
