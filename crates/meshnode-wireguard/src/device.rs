//! Device controller seam
//!
//! The manager programs peers through this trait and never touches the
//! interface itself. Implementations wrap whatever control library drives
//! the actual WireGuard device; operations are treated as blocking and
//! fallible.

use meshnode_proto::Tunnel;
use thiserror::Error;

/// Errors surfaced by a device controller
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("Failed to program peer on {interface}: {reason}")]
    Add { interface: String, reason: String },

    #[error("Failed to remove peer from {interface}: {reason}")]
    Remove { interface: String, reason: String },
}

/// Programs and removes peers on a named network interface.
///
/// The handle is acquired once at manager construction and held for the
/// manager's lifetime.
#[async_trait::async_trait]
pub trait DeviceController: Send + Sync {
    /// Program a peer on the interface
    async fn add_peer(&self, peer: &Tunnel) -> Result<(), DeviceError>;

    /// Remove a peer from the interface
    async fn remove_peer(&self, peer: &Tunnel) -> Result<(), DeviceError>;
}

/// Device controller that only logs.
///
/// Stands in wherever no real device is available (tests, dry runs,
/// nodes without a WireGuard interface).
#[derive(Debug, Default)]
pub struct NoopDevice;

#[async_trait::async_trait]
impl DeviceController for NoopDevice {
    async fn add_peer(&self, peer: &Tunnel) -> Result<(), DeviceError> {
        tracing::info!(peer_id = %peer.id, hostname = %peer.hostname, "adding peer");
        Ok(())
    }

    async fn remove_peer(&self, peer: &Tunnel) -> Result<(), DeviceError> {
        tracing::info!(peer_id = %peer.id, hostname = %peer.hostname, "removing peer");
        Ok(())
    }
}
