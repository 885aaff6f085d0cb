//! Cooperative cancellation for long-running traversals and store scans.
//!
//! Graph queries never block on anything but disk, yet a backward walk over a
//! large sealed graph can still take a while. Callers hand a [`Cancellation`]
//! token to the critical-path algorithm or to a vertex iterator; the work
//! checks the token at vertex granularity and returns a partial result tagged
//! as incomplete rather than an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag.
///
/// Cloning is cheap; all clones observe the same flag. Once cancelled, a token
/// stays cancelled.
#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// Create a fresh, not-yet-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
