use rand::Rng;
use std::time::Duration;

use super::outcome::CheckOutcome;
use crate::config::Config;
use crate::core::constants::http_status;

/// What to do after an attempt finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Keep this outcome
    Done,
    /// Sleep, then try again
    RetryAfter(Duration),
}

/// Exponential backoff with jitter for transient failures.
///
/// Transient means: temporary DNS failure, connection reset or refused,
/// any 5xx and 429. Everything else is final on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    retry_limit: u32,
    base: Duration,
    jitter: Duration,
    max: Duration,
}

impl RetryPolicy {
    pub fn new(retry_limit: u32, base: Duration, jitter: Duration, max: Duration) -> Self {
        Self {
            retry_limit,
            base,
            jitter,
            max,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.retry_limit(),
            config.backoff_base_duration(),
            config.backoff_jitter_duration(),
            config.backoff_max_duration(),
        )
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Longest pause between two attempts
    pub fn max_delay(&self) -> Duration {
        self.max
    }

    pub fn is_transient(outcome: &CheckOutcome) -> bool {
        match (&outcome.failure, outcome.status) {
            (Some(failure), _) => failure.is_transient(),
            (None, Some(status)) => {
                status == http_status::TOO_MANY_REQUESTS
                    || (http_status::INTERNAL_SERVER_ERROR..600).contains(&status)
            }
            (None, None) => false,
        }
    }

    /// Decide after `attempt` attempts (1-based) have been made.
    pub fn decide(&self, outcome: &CheckOutcome, attempt: u32) -> RetryDecision {
        if attempt > self.retry_limit || !Self::is_transient(outcome) {
            return RetryDecision::Done;
        }

        let delay = match outcome.retry_after {
            Some(requested) => requested.max(self.backoff(attempt)).min(self.max),
            None => self.backoff(attempt),
        };
        RetryDecision::RetryAfter(delay)
    }

    /// `base * 2^(attempt-1)` plus random jitter, capped at the configured maximum
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let exponential = self.base.saturating_mul(1u32 << exponent);

        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        };

        exponential.saturating_add(jitter).min(self.max)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::validation::outcome::{FailureKind, TlsFailure};

    fn policy(retry_limit: u32) -> RetryPolicy {
        RetryPolicy::new(
            retry_limit,
            Duration::from_millis(100),
            Duration::ZERO,
            Duration::from_secs(10),
        )
    }

    fn status(code: u16) -> CheckOutcome {
        CheckOutcome::new("https://example.com").with_status(code)
    }

    #[test]
    fn test_decide__retries_transient_until_limit() {
        let policy = policy(2);
        let outcome = status(503);

        assert_eq!(
            policy.decide(&outcome, 1),
            RetryDecision::RetryAfter(Duration::from_millis(100))
        );
        assert_eq!(
            policy.decide(&outcome, 2),
            RetryDecision::RetryAfter(Duration::from_millis(200))
        );
        assert_eq!(policy.decide(&outcome, 3), RetryDecision::Done);
    }

    #[test]
    fn test_decide__permanent_failures_are_final() {
        let policy = policy(3);
        assert_eq!(policy.decide(&status(404), 1), RetryDecision::Done);
        assert_eq!(policy.decide(&status(200), 1), RetryDecision::Done);
        assert_eq!(policy.decide(&status(403), 1), RetryDecision::Done);

        let tls = CheckOutcome::failed("https://example.com", FailureKind::Tls(TlsFailure::Expired));
        assert_eq!(policy.decide(&tls, 1), RetryDecision::Done);

        let dns = CheckOutcome::failed("https://example.com", FailureKind::Dns { temporary: false });
        assert_eq!(policy.decide(&dns, 1), RetryDecision::Done);
    }

    #[test]
    fn test_decide__transient_network_failures() {
        let policy = policy(1);
        for failure in [
            FailureKind::ConnectionReset,
            FailureKind::ConnectionRefused,
            FailureKind::Dns { temporary: true },
        ] {
            let outcome = CheckOutcome::failed("https://example.com", failure);
            assert!(matches!(policy.decide(&outcome, 1), RetryDecision::RetryAfter(_)));
        }
    }

    #[test]
    fn test_decide__honours_retry_after() {
        let policy = policy(3);
        let mut outcome = status(429);
        outcome.retry_after = Some(Duration::from_secs(2));
        assert_eq!(
            policy.decide(&outcome, 1),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );

        // Capped at the configured maximum
        outcome.retry_after = Some(Duration::from_secs(3600));
        assert_eq!(
            policy.decide(&outcome, 1),
            RetryDecision::RetryAfter(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_decide__zero_limit_never_retries() {
        assert_eq!(policy(0).decide(&status(503), 1), RetryDecision::Done);
        assert_eq!(RetryPolicy::none().decide(&status(429), 1), RetryDecision::Done);
    }

    #[test]
    fn test_backoff__jitter_stays_in_bounds() {
        let policy = RetryPolicy::new(
            5,
            Duration::from_millis(100),
            Duration::from_millis(50),
            Duration::from_secs(10),
        );
        for _ in 0..100 {
            let delay = policy.backoff(3);
            assert!(delay >= Duration::from_millis(400));
            assert!(delay <= Duration::from_millis(450));
        }
    }

    #[test]
    fn test_backoff__is_capped() {
        let policy = RetryPolicy::new(
            20,
            Duration::from_secs(1),
            Duration::ZERO,
            Duration::from_secs(5),
        );
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(20), Duration::from_secs(5));
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            retry_limit: Some(7),
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from_config(&config).retry_limit(), 7);
    }
}
