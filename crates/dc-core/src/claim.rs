//! One-shot claim flag
//!
//! A `OnceClaim` moves from unclaimed to claimed exactly once. The first
//! caller wins; every later caller gets `AlreadyClaimed` immediately instead
//! of blocking. Session teardown and host shutdown both hang off one of these.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// Returned to every caller after the first
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("already claimed")]
pub struct AlreadyClaimed;

/// Atomic flag that can be claimed once
#[derive(Debug, Default)]
pub struct OnceClaim {
    claimed: AtomicBool,
}

impl OnceClaim {
    /// Create an unclaimed flag
    pub const fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
        }
    }

    /// Claim the flag; only the first call succeeds
    pub fn claim(&self) -> Result<(), AlreadyClaimed> {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| AlreadyClaimed)
    }

    /// Whether some caller has claimed the flag
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}
