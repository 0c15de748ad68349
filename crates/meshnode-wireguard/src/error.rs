//! Manager error types

use meshnode_proto::RepositoryError;
use thiserror::Error;

use crate::device::DeviceError;

/// Errors surfaced by the peer manager
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Timed out waiting for peer confirmation")]
    ConfirmTimeout,

    #[error("Peer manager is shutting down")]
    ShuttingDown,

    #[error("Control loop already started")]
    AlreadyStarted,
}
