// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transient-error classification and bounded exponential backoff.
//!
//! Retries live here, inside the adapters, and nowhere else: retrying at
//! the orchestrator level would risk duplicating partially streamed
//! output. Only failures observed before any body bytes arrive are
//! retried.

use std::time::Duration;

use roundtable_config::DefaultsConfig;

/// Ceiling for the doubled backoff delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Bounded exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: MAX_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Builds the policy from the configured defaults.
    pub fn from_defaults(defaults: &DefaultsConfig) -> Self {
        Self {
            max_attempts: defaults.retry_attempts,
            base_delay: Duration::from_millis(defaults.retry_delay),
            max_delay: MAX_RETRY_DELAY,
        }
    }

    /// The delay before the given 1-based retry attempt, doubled each
    /// attempt and capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// HTTP status codes worth retrying: rate limiting and gateway-class
/// transient failures.
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 502 | 503 | 504)
}

/// Whether a reqwest transport error is worth retrying.
///
/// Connect-phase failures (refused, reset, temporary DNS) are transient.
/// Timeouts are not retried here: they surface as `is_timeout` chunks so
/// the caller can distinguish slow from broken.
pub fn is_retryable_transport(err: &reqwest::Error) -> bool {
    if err.is_timeout() {
        return false;
    }
    err.is_connect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_documented_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn policy_from_config_defaults() {
        let defaults = DefaultsConfig::default();
        let policy = RetryPolicy::from_defaults(&defaults);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(8));
        // Capped.
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(10));
        assert_eq!(policy.delay_for_attempt(30), Duration::from_secs(10));
    }

    #[test]
    fn retryable_statuses() {
        use reqwest::StatusCode;
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retryable_status(StatusCode::OK));
    }
}
