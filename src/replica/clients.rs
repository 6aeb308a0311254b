//! Connected client tracking

use crate::common::{ClientId, Error, Result};
use std::collections::BTreeSet;

/// Client identities currently connected to this node.
///
/// Entries live for the life of the process; clients never unregister.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: BTreeSet<ClientId>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client, rejecting an identity that is already present.
    pub fn register(&mut self, id: ClientId) -> Result<()> {
        if !self.clients.insert(id) {
            return Err(Error::DuplicateClient(id));
        }
        Ok(())
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_register_is_rejected() {
        let mut registry = ClientRegistry::new();

        assert!(registry.register(4).is_ok());
        let err = registry.register(4).unwrap_err();
        assert!(matches!(err, Error::DuplicateClient(4)));

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(4));
    }

    #[test]
    fn test_distinct_clients() {
        let mut registry = ClientRegistry::new();
        assert!(registry.is_empty());

        registry.register(3).unwrap();
        registry.register(1).unwrap();
        registry.register(2).unwrap();

        assert_eq!(registry.ids(), vec![1, 2, 3]);
    }
}
