//! Pending confirmation tracker
//!
//! Tracks peer operations submitted to the control loop and routes each
//! completion back to the callers waiting on it. Waiters register a
//! completion handle keyed by peer identity and operation kind before
//! submitting their request; the worker that finishes the operation
//! fulfills every handle registered for that key, so several callers
//! racing on the same peer all observe the same confirmation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::device::DeviceError;

/// Operation kind a waiter is blocked on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerOp {
    Add,
    Remove,
}

/// Outcome delivered to waiters when an operation completes
pub type Confirm = Result<(), DeviceError>;

/// Tracks in-flight peer operations awaiting confirmation
#[derive(Clone, Default)]
pub struct PendingConfirms {
    waiters: Arc<DashMap<(Uuid, PeerOp), Vec<oneshot::Sender<Confirm>>>>,
}

impl PendingConfirms {
    pub fn new() -> Self {
        Self {
            waiters: Arc::new(DashMap::new()),
        }
    }

    /// Register a waiter for a peer operation.
    /// Returns a receiver that resolves when the operation completes.
    pub fn register(&self, id: Uuid, op: PeerOp) -> oneshot::Receiver<Confirm> {
        let (tx, rx) = oneshot::channel();
        self.waiters.entry((id, op)).or_default().push(tx);
        debug!(peer_id = %id, ?op, "registered confirmation waiter");
        rx
    }

    /// Fulfill every waiter registered for this peer and operation.
    /// Returns the number of waiters notified.
    pub fn complete(&self, id: Uuid, op: PeerOp, outcome: Confirm) -> usize {
        let Some((_, senders)) = self.waiters.remove(&(id, op)) else {
            warn!(peer_id = %id, ?op, "confirmation had no waiters");
            return 0;
        };

        let mut delivered = 0;
        for tx in senders {
            if tx.send(outcome.clone()).is_ok() {
                delivered += 1;
            } else {
                // Receiver already gave up, likely a timed-out caller
                debug!(peer_id = %id, ?op, "confirmation receiver dropped");
            }
        }
        delivered
    }

    /// Drop every handle registered for this peer and operation without
    /// fulfilling it (e.g. when the request could not be submitted).
    pub fn cancel(&self, id: Uuid, op: PeerOp) {
        if self.waiters.remove(&(id, op)).is_some() {
            debug!(peer_id = %id, ?op, "cancelled confirmation waiters");
        }
    }

    /// Drop all outstanding handles. In-flight waiters observe a closed
    /// channel instead of blocking forever; used by shutdown.
    pub fn clear(&self) {
        self.waiters.clear();
    }

    /// Number of waiters currently registered
    pub fn count(&self) -> usize {
        self.waiters.iter().map(|entry| entry.value().len()).sum()
    }
}
