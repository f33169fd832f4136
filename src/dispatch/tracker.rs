//! Completion accounting

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic launch/outcome counters shared by the dispatch loop and every
/// in-flight call.
///
/// Counters are only ever incremented. Values returned by the `record_*`
/// methods are the post-increment totals and are used directly for control
/// decisions.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    launched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence number assigned to the new call.
    pub fn record_launch(&self) -> u64 {
        self.launched.fetch_add(1, Ordering::SeqCst)
    }

    pub fn record_success(&self) -> u64 {
        self.succeeded.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_failure(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn launched(&self) -> u64 {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Whether one more launch could still be needed to reach `target`
    /// successes.
    ///
    /// Every launched call that has not failed either already succeeded or may
    /// still succeed, so once `launched - failed` reaches the target the calls
    /// already out can fill it on their own.
    pub fn needs_more(&self, target: u64) -> bool {
        // Read `failed` first: a stale low value only makes this stricter.
        let failed = self.failed();
        let launched = self.launched();
        launched.saturating_sub(failed) < target
    }
}
