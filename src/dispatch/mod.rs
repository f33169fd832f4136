//! Rate-limited concurrent dispatcher
//!
//! One call is launched per admission tick, on the next client of the pool in
//! round-robin order, until the run's stop condition fires. The run then
//! drains every call already launched before reporting.

mod cancel;
mod clock;
mod tracker;


pub use cancel::{CancelSignal, StopReason};
pub use clock::AdmissionClock;
pub use tracker::CompletionTracker;

use crate::client::ClientPool;
use crate::config::{RunConfig, StopCondition};
use crate::error::CallError;
use crate::report::{CallRecord, LatencyRecorder};
use crate::request::ApiRequest;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Lifecycle of one run. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    Admitting,
    Draining,
    Terminated,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Admitting => f.write_str("admitting"),
            RunPhase::Draining => f.write_str("draining"),
            RunPhase::Terminated => f.write_str("terminated"),
        }
    }
}

/// Final, exact accounting of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub launched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub stop_reason: Option<StopReason>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn achieved_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.succeeded + self.failed) as f64 / secs
        } else {
            0.0
        }
    }
}

/// Drives one run from first admission to the last completed call.
pub struct Dispatcher {
    pool: ClientPool,
    request: Arc<ApiRequest>,
    period: Duration,
    stop: StopCondition,
    request_timeout: Duration,
    signal: CancelSignal,
    tracker: Arc<CompletionTracker>,
    recorder: Arc<LatencyRecorder>,
    phase_tx: watch::Sender<RunPhase>,
}

impl Dispatcher {
    pub fn new(config: &RunConfig, pool: ClientPool, recorder: Arc<LatencyRecorder>) -> Self {
        let (phase_tx, _) = watch::channel(RunPhase::Admitting);
        Self {
            pool,
            request: Arc::new(config.request.clone()),
            period: config.admission_period(),
            stop: config.stop,
            request_timeout: config.request_timeout,
            signal: CancelSignal::new(),
            tracker: Arc::new(CompletionTracker::new()),
            recorder,
            phase_tx,
        }
    }

    /// Handle for stopping the run from outside (e.g. an interrupt).
    pub fn signal(&self) -> CancelSignal {
        self.signal.clone()
    }

    pub fn phase_rx(&self) -> watch::Receiver<RunPhase> {
        self.phase_tx.subscribe()
    }

    pub async fn run(self) -> RunSummary {
        let start = Instant::now();
        let deadline = match self.stop {
            // Validated configs always fit; an unrepresentable deadline never fires.
            StopCondition::Deadline(duration) => start.checked_add(duration),
            StopCondition::Count(_) => None,
        };
        let deadline_elapsed = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline_elapsed);

        let in_flight = TaskTracker::new();
        let mut clock = AdmissionClock::new(self.period);

        debug!(
            "Admitting one call every {:?} across {} clients",
            clock.period(),
            self.pool.len()
        );

        loop {
            tokio::select! {
                biased;

                _ = self.signal.cancelled() => break,

                _ = &mut deadline_elapsed => {
                    self.signal.trigger(StopReason::DeadlineElapsed);
                    break;
                }

                _ = clock.tick() => {}
            }

            if self.signal.is_cancelled() {
                break;
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    self.signal.trigger(StopReason::DeadlineElapsed);
                    break;
                }
            }
            if let StopCondition::Count(target) = self.stop {
                if !self.tracker.needs_more(target) {
                    debug!("Calls in flight can reach the target, skipping admission");
                    continue;
                }
            }

            self.launch(&in_flight, start);
        }

        drop(clock);
        self.set_phase(RunPhase::Draining);
        info!(
            "Stopped admitting ({}), waiting for {} in-flight calls",
            self.signal
                .reason()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            self.tracker
                .launched()
                .saturating_sub(self.tracker.succeeded() + self.tracker.failed())
        );

        in_flight.close();
        in_flight.wait().await;

        let summary = RunSummary {
            launched: self.tracker.launched(),
            succeeded: self.tracker.succeeded(),
            failed: self.tracker.failed(),
            stop_reason: self.signal.reason(),
            elapsed: start.elapsed(),
        };
        self.set_phase(RunPhase::Terminated);
        summary
    }

    fn launch(&self, in_flight: &TaskTracker, run_start: Instant) {
        let sequence = self.tracker.record_launch();
        let index = self.pool.index_for(sequence);
        let client = self.pool.get(index);
        let request = Arc::clone(&self.request);
        let tracker = Arc::clone(&self.tracker);
        let recorder = Arc::clone(&self.recorder);
        let signal = self.signal.clone();
        let stop = self.stop;
        let call_timeout = self.request_timeout;

        in_flight.spawn(async move {
            let started = Instant::now();
            let result = match timeout(call_timeout, client.execute(&request, call_timeout)).await
            {
                Ok(result) => result,
                Err(_) => Err(CallError::Timeout(call_timeout)),
            };
            let latency = started.elapsed();

            let success = match result {
                Ok(()) => {
                    let succeeded = tracker.record_success();
                    debug!(
                        "Call {} ({} via client {}) succeeded (took {:?})",
                        sequence,
                        request.verb(),
                        index,
                        latency
                    );
                    if let StopCondition::Count(target) = stop {
                        if succeeded >= target && signal.trigger(StopReason::TargetReached) {
                            info!("Reached target of {} successful calls", target);
                        }
                    }
                    true
                }
                Err(e) => {
                    tracker.record_failure();
                    warn!(
                        "Call {} ({} via client {}) failed: {}",
                        sequence,
                        request.verb(),
                        index,
                        e
                    );
                    false
                }
            };

            recorder
                .record(&CallRecord {
                    sequence,
                    client: index,
                    verb: request.verb(),
                    started: started.duration_since(run_start),
                    latency,
                    success,
                })
                .await;
        });
    }

    fn set_phase(&self, phase: RunPhase) {
        debug!("Run is {}", phase);
        self.phase_tx.send_replace(phase);
    }
}
