//! Retry strategy with exponential backoff
//!
//! Decides whether a failed attempt is retried and how long to wait first.
//! [`HttpClient`](crate::HttpClient) drives the loop and publishes the
//! attempt counter through [`OperationContext`](crate::OperationContext).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{HttpError, HttpResponse};

/// Retry configuration
///
/// # Example
///
/// ```
/// use stratus_http::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig {
///     max_attempts: 5,
///     initial_backoff: Duration::from_millis(50),
///     ..RetryConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first. Default: 3
    pub max_attempts: u32,

    /// Delay before the second attempt. Default: 100ms
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,

    /// Cap for exponential growth. Default: 20s
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,

    /// Full jitter on each delay. Default: true
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(20),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no retries
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Validate retry parameters
    ///
    /// - max_attempts: 1-10
    /// - max_backoff >= initial_backoff
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be >= 1, got 0".to_string());
        }
        if self.max_attempts > 10 {
            return Err(format!(
                "max_attempts must be <= 10, got {}",
                self.max_attempts
            ));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(format!(
                "max_backoff ({:?}) must be >= initial_backoff ({:?})",
                self.max_backoff, self.initial_backoff
            ));
        }
        Ok(())
    }
}

/// Outcome of classifying an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after backoff
    Retry,
    /// Return this outcome to the caller
    Stop,
}

/// Standard retry strategy: transient transport failures and throttling or
/// server-side status codes are retried up to `max_attempts`.
#[derive(Debug, Clone, Default)]
pub struct StandardRetryStrategy {
    config: RetryConfig,
}

impl StandardRetryStrategy {
    /// Strategy with explicit configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Maximum attempts, never below one
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Classify the outcome of one attempt
    pub fn classify(&self, outcome: &Result<HttpResponse, HttpError>) -> RetryDecision {
        let retryable = match outcome {
            Ok(response) => matches!(response.status().as_u16(), 429 | 500 | 502 | 503 | 504),
            Err(err) => err.is_retryable(),
        };
        if retryable {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }

    /// Delay after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let base = self.config.initial_backoff.as_millis() as u64;
        let delay_ms = base
            .saturating_mul(1_u64 << exponent)
            .min(self.config.max_backoff.as_millis() as u64);

        if self.config.jitter && delay_ms > 0 {
            Duration::from_millis(fastrand::u64(0..=delay_ms))
        } else {
            Duration::from_millis(delay_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use rstest::rstest;

    fn response(status: u16) -> Result<HttpResponse, HttpError> {
        let mut response = http::Response::new(Bytes::new());
        *response.status_mut() = http::StatusCode::from_u16(status).unwrap();
        Ok(response)
    }

    #[rstest]
    #[case(200, RetryDecision::Stop)]
    #[case(400, RetryDecision::Stop)]
    #[case(404, RetryDecision::Stop)]
    #[case(429, RetryDecision::Retry)]
    #[case(500, RetryDecision::Retry)]
    #[case(503, RetryDecision::Retry)]
    #[case(504, RetryDecision::Retry)]
    fn test_classify_status(#[case] status: u16, #[case] expected: RetryDecision) {
        let strategy = StandardRetryStrategy::default();
        assert_eq!(strategy.classify(&response(status)), expected);
    }

    #[test]
    fn test_classify_errors() {
        let strategy = StandardRetryStrategy::default();
        assert_eq!(
            strategy.classify(&Err(HttpError::transport("reset"))),
            RetryDecision::Retry
        );
        assert_eq!(
            strategy.classify(&Err(HttpError::EngineClosed)),
            RetryDecision::Stop
        );
    }

    #[test]
    fn test_backoff_without_jitter_is_exponential_and_capped() {
        let strategy = StandardRetryStrategy::new(RetryConfig {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            jitter: false,
        });
        assert_eq!(strategy.backoff(1), Duration::from_millis(100));
        assert_eq!(strategy.backoff(2), Duration::from_millis(200));
        assert_eq!(strategy.backoff(3), Duration::from_millis(400));
        assert_eq!(strategy.backoff(4), Duration::from_millis(500));
        assert_eq!(strategy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_with_jitter_stays_in_range() {
        let strategy = StandardRetryStrategy::new(RetryConfig {
            initial_backoff: Duration::from_millis(100),
            ..RetryConfig::default()
        });
        for _ in 0..50 {
            assert!(strategy.backoff(2) <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_validate() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(RetryConfig::disabled().validate().is_ok());
        assert!(
            RetryConfig {
                max_attempts: 0,
                ..RetryConfig::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            RetryConfig {
                initial_backoff: Duration::from_secs(30),
                max_backoff: Duration::from_secs(1),
                ..RetryConfig::default()
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn test_zero_max_attempts_still_sends_once() {
        let strategy = StandardRetryStrategy::new(RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        });
        assert_eq!(strategy.max_attempts(), 1);
    }
}
