//! Admission clock

use std::time::Duration;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

/// Fixed-cadence ticker; each tick authorizes one launch.
///
/// The first tick fires immediately. Ticks the consumer was too slow to take
/// are skipped rather than delivered in a burst, so a stall lowers the
/// admitted rate instead of raising peak concurrency.
#[derive(Debug)]
pub struct AdmissionClock {
    interval: Interval,
}

impl AdmissionClock {
    /// `period` must be non-zero.
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    /// Wait for the next admission.
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_is_immediate() {
        let start = Instant::now();
        let mut clock = AdmissionClock::new(Duration::from_millis(100));

        clock.tick().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        clock.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(100));
        clock.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_ticks_are_skipped() {
        let start = Instant::now();
        let mut clock = AdmissionClock::new(Duration::from_millis(100));
        clock.tick().await;

        // Stall through three ticks.
        sleep(Duration::from_millis(350)).await;

        // One late tick is delivered right away...
        clock.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(350));

        // ...but the missed ones are not replayed.
        clock.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_period() {
        let clock = AdmissionClock::new(Duration::from_millis(250));
        assert_eq!(clock.period(), Duration::from_millis(250));
    }
}
