//! Reload signaling for the routing daemon

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::debug;

use crate::config::OlsrConfig;
use crate::error::OlsrError;

/// Tell olsrd to reload its configuration.
///
/// Reads the daemon's PID file and delivers SIGHUP. There is only one
/// record to act on, so every failure is hard: an unreadable file, an
/// unparsable PID, and a delivery error (e.g. no such process) are each
/// reported distinctly.
pub fn reload(config: &OlsrConfig) -> Result<(), OlsrError> {
    let pid_text = std::fs::read_to_string(&config.pid_file)?;
    let pid: i32 = pid_text
        .trim()
        .parse()
        .map_err(|_| OlsrError::InvalidPid {
            value: pid_text.trim().to_string(),
        })?;

    debug!(pid, "sending SIGHUP to olsrd");
    kill(Pid::from_raw(pid), Signal::SIGHUP).map_err(|source| OlsrError::Signal { pid, source })
}
