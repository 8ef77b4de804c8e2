//! Single-flight token for processing cycles.

use std::sync::atomic::{AtomicBool, Ordering};

/// Two-state `{Idle, Running}` flag acquired without blocking.
#[derive(Debug, Default)]
pub struct ProcessingToken {
    running: AtomicBool,
}

impl ProcessingToken {
    /// Create an idle token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `Idle -> Running`, or return `None` if a cycle already holds the token.
    ///
    /// The returned guard moves the token back to `Idle` when dropped, including
    /// during unwinding.
    pub fn try_acquire(&self) -> Option<TokenGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| TokenGuard { token: self })
    }

    /// Whether a cycle currently holds the token.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Holds a [`ProcessingToken`] in the `Running` state.
#[must_use = "the token is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TokenGuard<'a> {
    token: &'a ProcessingToken,
}

impl Drop for TokenGuard<'_> {
    fn drop(&mut self) {
        self.token.running.store(false, Ordering::Release);
    }
}
