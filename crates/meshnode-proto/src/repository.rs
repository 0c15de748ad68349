//! Repository seam for configured tunnels
//!
//! The lifecycle manager and the config generators read tunnel records
//! through this trait. Implement it to back the node with a database or
//! any other store; the default implementation keeps everything in memory.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::tunnel::{Tunnel, TunnelKind};

/// Errors surfaced by a tunnel repository
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Backing store error: {0}")]
    Backend(String),
}

/// Read-only queries over the configured tunnels.
///
/// # Example
/// ```ignore
/// struct DbRepository { pool: Arc<SqlitePool> }
///
/// #[async_trait]
/// impl TunnelRepository for DbRepository {
///     async fn list_client_tunnels(&self) -> Result<Vec<Tunnel>, RepositoryError> {
///         // Query the database
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait TunnelRepository: Send + Sync {
    /// All client-initiated tunnels, in repository order
    async fn list_client_tunnels(&self) -> Result<Vec<Tunnel>, RepositoryError>;

    /// All WireGuard tunnels, in repository order
    async fn list_wireguard_tunnels(&self) -> Result<Vec<Tunnel>, RepositoryError>;
}

/// In-memory tunnel repository (default implementation)
///
/// Used by tests and by embedders that manage records themselves.
#[derive(Clone)]
pub struct InMemoryTunnelRepository {
    tunnels: Arc<Mutex<Vec<Tunnel>>>,
}

impl InMemoryTunnelRepository {
    pub fn new(tunnels: Vec<Tunnel>) -> Self {
        Self {
            tunnels: Arc::new(Mutex::new(tunnels)),
        }
    }

    /// Append a record, keeping insertion order
    pub fn push(&self, tunnel: Tunnel) {
        self.tunnels.lock().unwrap().push(tunnel);
    }
}

impl Default for InMemoryTunnelRepository {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait::async_trait]
impl TunnelRepository for InMemoryTunnelRepository {
    async fn list_client_tunnels(&self) -> Result<Vec<Tunnel>, RepositoryError> {
        Ok(self
            .tunnels
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.client)
            .cloned()
            .collect())
    }

    async fn list_wireguard_tunnels(&self) -> Result<Vec<Tunnel>, RepositoryError> {
        Ok(self
            .tunnels
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.kind == TunnelKind::Wireguard)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn tunnel(client: bool, kind: TunnelKind) -> Tunnel {
        Tunnel {
            id: Uuid::new_v4(),
            hostname: "node-b.mesh".to_string(),
            ip: "10.9.8.0".to_string(),
            password: "pw".to_string(),
            client,
            kind,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_client_tunnels_filters_role() {
        let repo = InMemoryTunnelRepository::default();
        repo.push(tunnel(true, TunnelKind::Vtun));
        repo.push(tunnel(false, TunnelKind::Vtun));
        repo.push(tunnel(true, TunnelKind::Wireguard));

        let clients = repo.list_client_tunnels().await.unwrap();
        assert_eq!(clients.len(), 2);
        assert!(clients.iter().all(|t| t.client));
    }

    #[tokio::test]
    async fn test_list_wireguard_tunnels_filters_kind() {
        let repo = InMemoryTunnelRepository::default();
        repo.push(tunnel(true, TunnelKind::Vtun));
        repo.push(tunnel(false, TunnelKind::Wireguard));

        let wg = repo.list_wireguard_tunnels().await.unwrap();
        assert_eq!(wg.len(), 1);
        assert_eq!(wg[0].kind, TunnelKind::Wireguard);
    }

    #[tokio::test]
    async fn test_order_is_preserved() {
        let repo = InMemoryTunnelRepository::default();
        let a = tunnel(true, TunnelKind::Vtun);
        let b = tunnel(true, TunnelKind::Vtun);
        repo.push(a.clone());
        repo.push(b.clone());

        let clients = repo.list_client_tunnels().await.unwrap();
        assert_eq!(clients[0].id, a.id);
        assert_eq!(clients[1].id, b.id);
    }
}
