//! Cooperative cancellation for query runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag shared between a running query and whoever may abort it.
///
/// The orchestrator polls it at every state-machine transition; an external
/// call already in flight is allowed to finish and its result is discarded.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
