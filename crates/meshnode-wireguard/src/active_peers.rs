//! Active peer set
//!
//! Maps peer ID to the last-known-applied tunnel record. A peer is present
//! if and only if the manager believes the device is currently programmed
//! for it: entries are inserted only by a successful add worker and removed
//! only by a successful remove worker.

use std::sync::Arc;

use dashmap::DashMap;
use meshnode_proto::Tunnel;
use uuid::Uuid;

/// Concurrency-safe set of peers believed programmed on the device
#[derive(Clone, Default)]
pub struct ActivePeers {
    peers: Arc<DashMap<Uuid, Tunnel>>,
}

impl ActivePeers {
    pub fn new() -> Self {
        Self {
            peers: Arc::new(DashMap::new()),
        }
    }

    /// Record a peer as programmed
    pub fn insert(&self, peer: Tunnel) {
        self.peers.insert(peer.id, peer);
    }

    /// Record a peer as no longer programmed
    pub fn remove(&self, id: &Uuid) -> Option<Tunnel> {
        self.peers.remove(id).map(|(_, peer)| peer)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.peers.contains_key(id)
    }

    /// Snapshot of all active peers
    pub fn list(&self) -> Vec<Tunnel> {
        self.peers.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshnode_proto::TunnelKind;

    fn peer() -> Tunnel {
        Tunnel {
            id: Uuid::new_v4(),
            hostname: "node-c.mesh".to_string(),
            ip: "10.4.5.0".to_string(),
            password: "pw".to_string(),
            client: false,
            kind: TunnelKind::Wireguard,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_remove() {
        let peers = ActivePeers::new();
        let p = peer();
        let id = p.id;

        peers.insert(p);
        assert!(peers.contains(&id));
        assert_eq!(peers.len(), 1);

        let removed = peers.remove(&id);
        assert!(removed.is_some());
        assert!(!peers.contains(&id));
        assert!(peers.is_empty());
    }

    #[test]
    fn test_insert_same_id_does_not_duplicate() {
        let peers = ActivePeers::new();
        let p = peer();

        peers.insert(p.clone());
        peers.insert(p);
        assert_eq!(peers.len(), 1);
    }

    #[test]
    fn test_remove_unknown_peer() {
        let peers = ActivePeers::new();
        assert!(peers.remove(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_list_snapshot() {
        let peers = ActivePeers::new();
        let a = peer();
        let b = peer();
        peers.insert(a.clone());
        peers.insert(b.clone());

        let listed = peers.list();
        assert_eq!(listed.len(), 2);
        let ids: Vec<Uuid> = listed.iter().map(|t| t.id).collect();
        assert!(ids.contains(&a.id));
        assert!(ids.contains(&b.id));
    }
}
