//! Validated run parameters

use crate::error::ConfigError;
use crate::request::ApiRequest;
use std::fmt;
use std::time::{Duration, Instant};

/// Default bound on a single API call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// When a run stops admitting new calls. Exactly one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// Stop once this many calls have succeeded
    Count(u64),
    /// Stop admitting once this much time has passed since run start
    Deadline(Duration),
}

impl StopCondition {
    /// Resolve the pair of optional flags into a single condition.
    ///
    /// `fallback` is used when neither flag was given.
    pub fn resolve(
        count: Option<u64>,
        duration: Option<Duration>,
        fallback: StopCondition,
    ) -> Result<Self, ConfigError> {
        let condition = match (count, duration) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingStopConditions),
            (Some(count), None) => StopCondition::Count(count),
            (None, Some(duration)) => StopCondition::Deadline(duration),
            (None, None) => fallback,
        };
        condition.validate()?;
        Ok(condition)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StopCondition::Count(0) => Err(ConfigError::ZeroCount),
            StopCondition::Deadline(d) if d.is_zero() => Err(ConfigError::ZeroDuration),
            StopCondition::Deadline(d) if !schedulable(*d) => {
                Err(ConfigError::DurationTooLong(*d))
            }
            _ => Ok(()),
        }
    }
}

/// Whether a timer `d` from now can be represented on this platform's clock.
fn schedulable(d: Duration) -> bool {
    Instant::now().checked_add(d).is_some()
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCondition::Count(n) => write!(f, "until {} calls succeed", n),
            StopCondition::Deadline(d) => write!(f, "for {}", humantime::format_duration(*d)),
        }
    }
}

/// Immutable parameters of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub rate: f64,
    pub pool_size: usize,
    pub stop: StopCondition,
    pub request: ApiRequest,
    pub request_timeout: Duration,
}

impl RunConfig {
    pub fn new(
        rate: f64,
        pool_size: usize,
        stop: StopCondition,
        request: ApiRequest,
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::InvalidRate(rate));
        }
        // The period must fit on the clock.
        match Duration::try_from_secs_f64(1.0 / rate) {
            Ok(period) if schedulable(period) => {}
            _ => return Err(ConfigError::InvalidRate(rate)),
        }
        if pool_size == 0 {
            return Err(ConfigError::EmptyPool);
        }
        if request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        stop.validate()?;

        Ok(Self {
            rate,
            pool_size,
            stop,
            request,
            request_timeout,
        })
    }

    /// Time between two admissions. Never zero, so the ticker can always be built.
    pub fn admission_period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.rate)
            .unwrap_or(Duration::MAX)
            .max(Duration::from_nanos(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ObjectType;

    fn request() -> ApiRequest {
        ApiRequest::Create {
            namespace: "kube-stress".to_string(),
            object_type: ObjectType::ConfigMaps,
            object_size: 16,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = RunConfig::new(
            10.0,
            2,
            StopCondition::Count(5),
            request(),
            DEFAULT_REQUEST_TIMEOUT,
        )
        .unwrap();
        assert_eq!(config.admission_period(), Duration::from_millis(100));
    }

    #[test]
    fn test_fractional_rate_period() {
        let config = RunConfig::new(
            0.5,
            1,
            StopCondition::Count(1),
            request(),
            DEFAULT_REQUEST_TIMEOUT,
        )
        .unwrap();
        assert_eq!(config.admission_period(), Duration::from_secs(2));
    }

    #[test]
    fn test_rejects_bad_rate() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = RunConfig::new(
                rate,
                1,
                StopCondition::Count(1),
                request(),
                DEFAULT_REQUEST_TIMEOUT,
            )
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidRate(_)));
        }
    }

    #[test]
    fn test_rejects_rate_with_unschedulable_period() {
        for rate in [1e-300, f64::MIN_POSITIVE] {
            let err = RunConfig::new(
                rate,
                1,
                StopCondition::Count(1),
                request(),
                DEFAULT_REQUEST_TIMEOUT,
            )
            .unwrap_err();
            assert_eq!(err, ConfigError::InvalidRate(rate));
        }
    }

    #[test]
    fn test_rejects_unschedulable_deadline() {
        let err = RunConfig::new(
            1.0,
            1,
            StopCondition::Deadline(Duration::MAX),
            request(),
            DEFAULT_REQUEST_TIMEOUT,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::DurationTooLong(Duration::MAX));
        assert_eq!(
            StopCondition::resolve(None, Some(Duration::MAX), StopCondition::Count(1)),
            Err(ConfigError::DurationTooLong(Duration::MAX))
        );
    }

    #[test]
    fn test_rejects_empty_pool() {
        let err = RunConfig::new(
            1.0,
            0,
            StopCondition::Count(1),
            request(),
            DEFAULT_REQUEST_TIMEOUT,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::EmptyPool);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = RunConfig::new(1.0, 1, StopCondition::Count(1), request(), Duration::ZERO)
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroTimeout);
    }

    #[test]
    fn test_resolve_stop_condition() {
        let fallback = StopCondition::Count(100);
        assert_eq!(StopCondition::resolve(None, None, fallback), Ok(fallback));
        assert_eq!(
            StopCondition::resolve(Some(3), None, fallback),
            Ok(StopCondition::Count(3))
        );
        assert_eq!(
            StopCondition::resolve(None, Some(Duration::from_secs(1)), fallback),
            Ok(StopCondition::Deadline(Duration::from_secs(1)))
        );
        assert_eq!(
            StopCondition::resolve(Some(3), Some(Duration::from_secs(1)), fallback),
            Err(ConfigError::ConflictingStopConditions)
        );
        assert_eq!(
            StopCondition::resolve(Some(0), None, fallback),
            Err(ConfigError::ZeroCount)
        );
        assert_eq!(
            StopCondition::resolve(None, Some(Duration::ZERO), fallback),
            Err(ConfigError::ZeroDuration)
        );
    }
}
