//! Run-wide cancellation signal

use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Why a run stopped admitting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Operator asked the process to stop
    Interrupted,
    /// Count-bounded run reached its success target
    TargetReached,
    /// Deadline-bounded run ran out of time
    DeadlineElapsed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Interrupted => f.write_str("interrupted"),
            StopReason::TargetReached => f.write_str("target reached"),
            StopReason::DeadlineElapsed => f.write_str("deadline elapsed"),
        }
    }
}

/// Single-assignment stop flag shared by the dispatch loop, the calls it
/// launches and the interrupt listener.
///
/// The first `trigger` wins and records its reason; every later trigger is a
/// no-op. Waiters are woken through the underlying token, never by polling.
#[derive(Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<StopReason>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop. Returns `true` only for the call that
    /// performed the transition.
    pub fn trigger(&self, reason: StopReason) -> bool {
        if self.reason.set(reason).is_err() {
            return false;
        }
        self.token.cancel();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason recorded by the winning trigger, if any.
    pub fn reason(&self) -> Option<StopReason> {
        self.reason.get().copied()
    }

    /// Resolves once the signal has been triggered.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSignal")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
