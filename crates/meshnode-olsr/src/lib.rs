//! Routing daemon (olsrd) collaborators
//!
//! Parses the service advertisement file the daemon publishes and pokes
//! the daemon with a reload signal when tunnel state changes.

pub mod config;
pub mod error;
pub mod reload;
pub mod services;

pub use config::OlsrConfig;
pub use error::OlsrError;
pub use reload::reload;
pub use services::{MeshService, ServicesParser};
