//! Mesh Node Domain Types
//!
//! This crate defines the tunnel records shared by the peer lifecycle
//! manager and the config generators, plus the repository seam through
//! which configured tunnels are loaded.

pub mod repository;
pub mod tunnel;

pub use repository::{InMemoryTunnelRepository, RepositoryError, TunnelRepository};
pub use tunnel::{Tunnel, TunnelKind};
