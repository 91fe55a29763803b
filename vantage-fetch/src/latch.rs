//! Per-session fail-fast latch.
//!
//! Once any call on a session fails, every later call on that session is
//! short-circuited with [`FetchError::PriorFailure`] before touching the
//! network. The latch only ever moves from unset to set.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::FetchError;

/// One-way failure flag shared by every operation of a session.
#[derive(Debug, Default)]
pub struct Latch {
    tripped: AtomicBool,
}

impl Latch {
    /// A fresh, unset latch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a failure has been recorded.
    pub fn is_set(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Record a failure. Returns `true` if this call was the one that set it.
    pub fn set(&self) -> bool {
        !self.tripped.swap(true, Ordering::AcqRel)
    }

    /// Fail with [`FetchError::PriorFailure`] for `target` if the latch is set.
    pub fn check(&self, target: &str) -> Result<(), FetchError> {
        if self.is_set() {
            return Err(FetchError::PriorFailure {
                target: target.to_string(),
            });
        }
        Ok(())
    }
}
