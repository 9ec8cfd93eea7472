//! First-error-wins aggregation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::error::BackupError;

/// Thread-safe single-slot error collector.
///
/// The first recorded error is kept; later errors are logged at debug level
/// and discarded, keeping the contract deterministic: the first error
/// observed by any task in this scope wins. `has_error` is a lock-free flag
/// read, cheap enough to call before every queue push and pop.
#[derive(Default)]
pub struct ErrorSink {
    failed: AtomicBool,
    slot: Mutex<Option<BackupError>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error if none is stored yet.
    pub fn record(&self, err: BackupError) {
        if self.failed.swap(true, Ordering::SeqCst) {
            debug!("discarding subsequent error: {err}");
            return;
        }
        *self.lock_slot() = Some(err);
    }

    /// Whether an error has been recorded.
    pub fn has_error(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Remove and return the stored error, if any.
    pub fn take(&self) -> Option<BackupError> {
        self.lock_slot().take()
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<BackupError>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
