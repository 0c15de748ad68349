//! Filesystem locations used to talk to olsrd

use std::path::PathBuf;

/// Paths to the daemon's runtime files
#[derive(Debug, Clone)]
pub struct OlsrConfig {
    /// Service advertisement file the daemon publishes
    pub services_file: PathBuf,
    /// File the daemon writes its PID to
    pub pid_file: PathBuf,
}

impl Default for OlsrConfig {
    fn default() -> Self {
        Self {
            services_file: PathBuf::from("/var/run/services_olsr"),
            pid_file: PathBuf::from("/tmp/olsrd.pid"),
        }
    }
}
