//! Retry policies for outbound delivery.

use std::sync::Arc;
use std::time::Duration;

use crate::config::SendConfig;
use crate::error::DeliveryError;

/// Decides whether and when a failed send is re-attempted.
pub trait RetryPolicy: Send + Sync {
    /// Total attempts, including the first. Always at least 1.
    fn max_attempts(&self) -> u32;

    /// Pause before attempt `attempt` (1-based, so the first retry is attempt 2).
    fn delay_for(&self, attempt: u32) -> Duration;

    /// Whether this error is worth another attempt.
    fn should_retry(&self, error: &DeliveryError) -> bool {
        error.is_transient()
    }
}

/// Single attempt, no retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn max_attempts(&self) -> u32 {
        1
    }

    fn delay_for(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }

    fn should_retry(&self, _error: &DeliveryError) -> bool {
        false
    }
}

/// Fixed pause between attempts; retries network failures only.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy for FixedBackoff {
    fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    fn delay_for(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Pick the policy for the configured attempt count.
pub fn from_config(config: &SendConfig) -> Arc<dyn RetryPolicy> {
    if config.max_attempts <= 1 {
        Arc::new(NoRetry)
    } else {
        Arc::new(FixedBackoff {
            max_attempts: config.max_attempts,
            delay: config.retry_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn network() -> DeliveryError {
        DeliveryError::Network {
            recipient: "U1".into(),
            reason: "reset".into(),
        }
    }

    fn rejected() -> DeliveryError {
        DeliveryError::Rejected {
            recipient: "U1".into(),
            status: 403,
            body: "forbidden".into(),
        }
    }

    #[test]
    fn no_retry_never_retries() {
        assert_eq!(NoRetry.max_attempts(), 1);
        assert!(!NoRetry.should_retry(&network()));
    }

    #[test]
    fn fixed_backoff_retries_transient_only() {
        let policy = FixedBackoff {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        };
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for(2), Duration::from_millis(10));
        assert!(policy.should_retry(&network()));
        assert!(!policy.should_retry(&rejected()));
    }

    #[test]
    fn fixed_backoff_zero_attempts_means_one() {
        let policy = FixedBackoff {
            max_attempts: 0,
            delay: Duration::ZERO,
        };
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn from_config_selects_policy() {
        let mut cfg = SendConfig {
            graph_url: "http://localhost".into(),
            access_token: SecretString::from("t"),
            max_attempts: 1,
            retry_delay: Duration::from_millis(5),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(from_config(&cfg).max_attempts(), 1);
        cfg.max_attempts = 4;
        let policy = from_config(&cfg);
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay_for(2), Duration::from_millis(5));
    }
}
