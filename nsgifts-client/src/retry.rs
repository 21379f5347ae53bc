//! Retry configuration and backoff.

use std::time::Duration;

/// Retry configuration for transient transport faults.
///
/// Only connection failures and timeouts are retried. HTTP error statuses are
/// never retried.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::exponential(3, Duration::from_secs(1))
    }
}

impl RetryConfig {
    /// Create a retry config with exponential backoff: `initial * 2^attempt`.
    pub fn exponential(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::Exponential {
                initial: initial_delay,
                multiplier: 2,
            },
        }
    }

    /// Create a retry config with no delay.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::None,
        }
    }

    /// Calculate delay after a failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay_for_attempt(attempt)
    }

    /// Whether another attempt may follow the failed `attempt` (0-indexed).
    pub fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

/// Backoff strategy for retries.
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// No delay between retries.
    None,
    /// Exponential backoff: delay multiplies each attempt.
    Exponential {
        /// Delay after the first failed attempt.
        initial: Duration,
        /// Growth factor (typically 2).
        multiplier: u32,
    },
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Exponential {
                initial,
                multiplier,
            } => {
                let factor = multiplier.checked_pow(attempt).unwrap_or(u32::MAX);
                initial.saturating_mul(factor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let config = RetryConfig::default();

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn test_exponential_backoff_saturates() {
        let strategy = BackoffStrategy::Exponential {
            initial: Duration::from_millis(100),
            multiplier: 2,
        };
        assert!(strategy.delay_for_attempt(64) >= strategy.delay_for_attempt(31));
    }

    #[test]
    fn test_immediate_has_no_delay() {
        let config = RetryConfig::immediate(5);
        assert_eq!(config.delay_for_attempt(3), Duration::ZERO);
    }

    #[test]
    fn test_attempt_budget() {
        let config = RetryConfig::exponential(3, Duration::from_millis(10));
        assert!(config.has_attempts_after(0));
        assert!(config.has_attempts_after(1));
        assert!(!config.has_attempts_after(2));
    }
}
