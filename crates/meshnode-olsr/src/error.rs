//! olsrd collaborator errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OlsrError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid PID in file: {value}")]
    InvalidPid { value: String },

    #[error("Failed to signal process {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: nix::errno::Errno,
    },
}
