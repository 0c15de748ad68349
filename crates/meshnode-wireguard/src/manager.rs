//! Peer manager and its control loop
//!
//! One long-lived task owns the inbound request channels and is the only
//! place that decides to start a device operation. Each accepted request
//! runs as its own worker task, so device calls for different peers may
//! overlap, while acceptance stays serialized.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use meshnode_proto::{Tunnel, TunnelRepository};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::active_peers::ActivePeers;
use crate::device::DeviceController;
use crate::error::ManagerError;
use crate::pending::{PendingConfirms, PeerOp};

const REQUEST_BUFFER: usize = 32;

/// Manager tuning knobs
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// How long an add/remove caller waits for its confirmation
    pub confirm_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            confirm_timeout: Duration::from_secs(10),
        }
    }
}

/// Receiving ends owned by the control loop, handed over when it starts
struct ControlChannels {
    add_rx: mpsc::Receiver<Tunnel>,
    remove_rx: mpsc::Receiver<Tunnel>,
    shutdown_rx: mpsc::Receiver<oneshot::Sender<()>>,
}

/// Serializes all peer-state mutations for the node's WireGuard interface.
///
/// Created once at process start; `stop()` must be the last call made on
/// it. The manager does not guard against requests submitted after
/// shutdown beyond failing them with [`ManagerError::ShuttingDown`].
pub struct PeerManager {
    repository: Arc<dyn TunnelRepository>,
    device: Arc<dyn DeviceController>,
    active_peers: ActivePeers,
    pending: PendingConfirms,
    add_tx: mpsc::Sender<Tunnel>,
    remove_tx: mpsc::Sender<Tunnel>,
    shutdown_tx: mpsc::Sender<oneshot::Sender<()>>,
    channels: Mutex<Option<ControlChannels>>,
    config: ManagerConfig,
}

impl PeerManager {
    /// Create a manager around a repository and a device handle.
    /// The device handle is held for the manager's lifetime.
    pub fn new(
        repository: Arc<dyn TunnelRepository>,
        device: Arc<dyn DeviceController>,
        config: ManagerConfig,
    ) -> Self {
        let (add_tx, add_rx) = mpsc::channel(REQUEST_BUFFER);
        let (remove_tx, remove_rx) = mpsc::channel(REQUEST_BUFFER);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Self {
            repository,
            device,
            active_peers: ActivePeers::new(),
            pending: PendingConfirms::new(),
            add_tx,
            remove_tx,
            shutdown_tx,
            channels: Mutex::new(Some(ControlChannels {
                add_rx,
                remove_rx,
                shutdown_rx,
            })),
            config,
        }
    }

    /// Peers currently believed programmed on the device
    pub fn active_peers(&self) -> &ActivePeers {
        &self.active_peers
    }

    /// Start the control loop, then program every configured peer.
    ///
    /// Returns the result of [`Self::initialize_tunnels`]; the loop keeps
    /// running even when some peers failed to program.
    pub async fn run(&self) -> Result<(), ManagerError> {
        let channels = self
            .channels
            .lock()
            .unwrap()
            .take()
            .ok_or(ManagerError::AlreadyStarted)?;

        tokio::spawn(control_loop(
            channels,
            self.device.clone(),
            self.active_peers.clone(),
            self.pending.clone(),
        ));

        self.initialize_tunnels().await
    }

    /// Load all configured WireGuard tunnels and program each peer
    /// concurrently. Every sibling runs to completion; the first error in
    /// repository order is reported.
    pub async fn initialize_tunnels(&self) -> Result<(), ManagerError> {
        let tunnels = self.repository.list_wireguard_tunnels().await?;
        info!(count = tunnels.len(), "programming configured peers");

        let results = join_all(tunnels.into_iter().map(|t| self.add_peer(t))).await;
        results.into_iter().collect()
    }

    /// Submit an add request and wait for its confirmation.
    pub async fn add_peer(&self, peer: Tunnel) -> Result<(), ManagerError> {
        self.submit(peer, PeerOp::Add).await
    }

    /// Submit a remove request and wait for its confirmation.
    pub async fn remove_peer(&self, peer: Tunnel) -> Result<(), ManagerError> {
        self.submit(peer, PeerOp::Remove).await
    }

    async fn submit(&self, peer: Tunnel, op: PeerOp) -> Result<(), ManagerError> {
        let id = peer.id;
        // Register before submitting so a fast worker cannot confirm
        // into a registry with no waiter.
        let confirm_rx = self.pending.register(id, op);

        let tx = match op {
            PeerOp::Add => &self.add_tx,
            PeerOp::Remove => &self.remove_tx,
        };
        if tx.send(peer).await.is_err() {
            self.pending.cancel(id, op);
            return Err(ManagerError::ShuttingDown);
        }

        match timeout(self.config.confirm_timeout, confirm_rx).await {
            Err(_) => Err(ManagerError::ConfirmTimeout),
            // Handle dropped without an outcome: shutdown cleared the registry
            Ok(Err(_)) => Err(ManagerError::ShuttingDown),
            Ok(Ok(outcome)) => outcome.map_err(ManagerError::from),
        }
    }

    /// Remove every active peer, then shut the control loop down and wait
    /// for its acknowledgement. Must be the last operation invoked on the
    /// manager; add/remove calls made afterwards fail with
    /// [`ManagerError::ShuttingDown`].
    pub async fn stop(&self) -> Result<(), ManagerError> {
        self.remove_all_peers().await?;

        let (ack_tx, ack_rx) = oneshot::channel();
        self.shutdown_tx
            .send(ack_tx)
            .await
            .map_err(|_| ManagerError::ShuttingDown)?;
        ack_rx.await.map_err(|_| ManagerError::ShuttingDown)
    }

    async fn remove_all_peers(&self) -> Result<(), ManagerError> {
        let peers = self.active_peers.list();
        debug!(count = peers.len(), "draining active peers");

        let results = join_all(peers.into_iter().map(|p| self.remove_peer(p))).await;
        results.into_iter().collect()
    }
}

async fn control_loop(
    mut channels: ControlChannels,
    device: Arc<dyn DeviceController>,
    active_peers: ActivePeers,
    pending: PendingConfirms,
) {
    info!("peer manager control loop started");
    loop {
        tokio::select! {
            Some(peer) = channels.add_rx.recv() => {
                spawn_worker(PeerOp::Add, peer, &device, &active_peers, &pending);
            }
            Some(peer) = channels.remove_rx.recv() => {
                spawn_worker(PeerOp::Remove, peer, &device, &active_peers, &pending);
            }
            Some(ack) = channels.shutdown_rx.recv() => {
                channels.add_rx.close();
                channels.remove_rx.close();
                // In-flight waiters observe shutdown instead of hanging
                pending.clear();
                if ack.send(()).is_err() {
                    warn!("shutdown acknowledgement receiver dropped");
                }
                break;
            }
            else => break,
        }
    }
    info!("peer manager control loop stopped");
}

/// Run one accepted request to completion on its own task.
///
/// The active peer set is only touched when the device call succeeded;
/// failures travel back to the waiters inside the confirmation.
fn spawn_worker(
    op: PeerOp,
    peer: Tunnel,
    device: &Arc<dyn DeviceController>,
    active_peers: &ActivePeers,
    pending: &PendingConfirms,
) {
    let device = device.clone();
    let active_peers = active_peers.clone();
    let pending = pending.clone();

    tokio::spawn(async move {
        let outcome = match op {
            PeerOp::Add => device.add_peer(&peer).await,
            PeerOp::Remove => device.remove_peer(&peer).await,
        };

        match (&outcome, op) {
            (Ok(()), PeerOp::Add) => {
                active_peers.insert(peer.clone());
                debug!(peer_id = %peer.id, "peer programmed");
            }
            (Ok(()), PeerOp::Remove) => {
                active_peers.remove(&peer.id);
                debug!(peer_id = %peer.id, "peer removed");
            }
            (Err(err), _) => {
                warn!(peer_id = %peer.id, ?op, error = %err, "device operation failed");
            }
        }

        pending.complete(peer.id, op, outcome);
    });
}
