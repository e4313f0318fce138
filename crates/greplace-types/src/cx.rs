//! Capability context (`Cx`) threaded through aggregate folds.
//!
//! A `Cx` carries cancellation state. Hosts hand one to the fold driver and
//! keep a clone; calling [`Cx::cancel`] on any clone makes the next
//! [`Cx::checkpoint`] fail with [`ReplaceError::Interrupted`].
//!
//! A fold driver owns one `Cx` per run; every group folded under it sees
//! the same cancellation flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use greplace_error::{ReplaceError, Result};

/// Capability context passed through every fold.
#[derive(Debug, Clone, Default)]
pub struct Cx {
    cancel_requested: Arc<AtomicBool>,
}

impl Cx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Request cancellation. Visible to every clone, on any thread.
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    /// Check for cancellation at a yield point.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancel_requested() {
            Err(ReplaceError::Interrupted)
        } else {
            Ok(())
        }
    }
}
