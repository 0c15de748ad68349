//! VTun client configuration generator
//!
//! Renders one vtund config document per distinct (hostname, subnet)
//! client tunnel group and writes them where the vtund daemon expects
//! them.

pub mod client_config;

pub use client_config::{generate_and_save, VtunClientConfig, VtunError};
