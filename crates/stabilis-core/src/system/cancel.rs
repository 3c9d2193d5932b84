//! Cooperative cancellation token.

use crate::StabilisError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag checked by long-running stages (training epochs, tree
/// induction, roster stages).
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new token (not cancelled).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Return `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> Result<(), StabilisError> {
        if self.is_cancelled() {
            Err(StabilisError::Cancelled)
        } else {
            Ok(())
        }
    }
}
