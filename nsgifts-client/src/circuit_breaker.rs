//! Server-error circuit breaker.
//!
//! A single 5xx response trips the breaker. While tripped, non-auth requests
//! fail fast without touching the network. The breaker clears itself lazily:
//! the first check made after the cooldown has elapsed resets it, so there is
//! no background timer and no half-open probing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;

/// Snapshot of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitState {
    /// Whether a server error has been recorded and not yet cleared.
    pub tripped: bool,
    /// Unix timestamp of the last recorded server error.
    pub tripped_at: i64,
}

/// Circuit breaker implementation.
#[derive(Debug)]
pub struct CircuitBreaker {
    cooldown: i64,
    tripped: AtomicBool,
    tripped_at: AtomicI64,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    pub fn new(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            cooldown: i64::try_from(cooldown.as_secs()).unwrap_or(i64::MAX),
            tripped: AtomicBool::new(false),
            tripped_at: AtomicI64::new(0),
            clock,
        }
    }

    /// Get the current state without clearing an expired trip.
    pub fn state(&self) -> CircuitState {
        CircuitState {
            tripped: self.tripped.load(Ordering::SeqCst),
            tripped_at: self.tripped_at.load(Ordering::SeqCst),
        }
    }

    /// Record a server error.
    pub fn record_failure(&self) {
        let now = self.clock.now();
        self.tripped_at.store(now, Ordering::SeqCst);
        if !self.tripped.swap(true, Ordering::SeqCst) {
            warn!(cooldown_secs = self.cooldown, "Circuit breaker opening");
        }
    }

    /// Check whether requests must be rejected.
    ///
    /// Clears the breaker when the cooldown has elapsed.
    pub fn is_open(&self) -> bool {
        if !self.tripped.load(Ordering::SeqCst) {
            return false;
        }

        if !self.cooldown_elapsed() {
            return true;
        }

        if self
            .tripped
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // A failure recorded while we were clearing wins.
            if !self.cooldown_elapsed() {
                self.tripped.store(true, Ordering::SeqCst);
                return true;
            }
            debug!("Circuit breaker cooldown elapsed, closing");
        }

        false
    }

    /// Seconds until the breaker clears itself, or zero if it is closed.
    pub fn remaining_cooldown(&self) -> u64 {
        if !self.tripped.load(Ordering::SeqCst) {
            return 0;
        }
        let until = self.tripped_at.load(Ordering::SeqCst).saturating_add(self.cooldown);
        until.saturating_sub(self.clock.now()).max(0) as u64
    }

    /// Reset the breaker to closed regardless of the cooldown.
    pub fn reset(&self) {
        // A failure recorded mid-reset must not end up tripped with a zero timestamp.
        self.tripped_at.store(0, Ordering::SeqCst);
        self.tripped.store(false, Ordering::SeqCst);
        info!("Server error state has been manually reset");
    }

    fn cooldown_elapsed(&self) -> bool {
        self.clock.now() >= self.tripped_at.load(Ordering::SeqCst).saturating_add(self.cooldown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn breaker(cooldown: u64) -> (CircuitBreaker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10_000));
        let cb = CircuitBreaker::new(Duration::from_secs(cooldown), clock.clone());
        (cb, clock)
    }

    #[test]
    fn test_single_failure_opens() {
        let (cb, _clock) = breaker(300);
        assert!(!cb.is_open());

        cb.record_failure();
        assert!(cb.is_open());
        assert_eq!(
            cb.state(),
            CircuitState {
                tripped: true,
                tripped_at: 10_000
            }
        );
        assert_eq!(cb.remaining_cooldown(), 300);
    }

    #[test]
    fn test_clears_lazily_after_cooldown() {
        let (cb, clock) = breaker(300);
        cb.record_failure();

        clock.advance(299);
        assert!(cb.is_open());
        assert_eq!(cb.remaining_cooldown(), 1);

        clock.advance(1);
        // Still recorded until someone checks.
        assert!(cb.state().tripped);
        assert!(!cb.is_open());
        assert!(!cb.state().tripped);
        assert_eq!(cb.remaining_cooldown(), 0);
    }

    #[test]
    fn test_new_failure_extends_cooldown() {
        let (cb, clock) = breaker(300);
        cb.record_failure();
        clock.advance(200);
        cb.record_failure();
        clock.advance(200);

        assert!(cb.is_open());
        assert_eq!(cb.remaining_cooldown(), 100);
    }

    #[test]
    fn test_reset_closes_immediately() {
        let (cb, _clock) = breaker(300);
        cb.record_failure();
        assert!(cb.is_open());

        cb.reset();
        assert!(!cb.is_open());
        assert_eq!(cb.state().tripped_at, 0);
    }

    #[test]
    fn test_huge_cooldown_saturates() {
        let (cb, clock) = breaker(u64::MAX);
        cb.record_failure();
        assert!(cb.is_open());

        clock.advance(1_000_000_000);
        assert!(cb.is_open());
        assert!(cb.remaining_cooldown() > 0);
    }

    #[test]
    fn test_failure_after_reset_gets_full_cooldown() {
        let (cb, clock) = breaker(300);
        cb.record_failure();
        cb.reset();
        assert_eq!(
            cb.state(),
            CircuitState {
                tripped: false,
                tripped_at: 0
            }
        );

        clock.advance(50);
        cb.record_failure();
        assert!(cb.is_open());
        assert_eq!(cb.state().tripped_at, 10_050);
        assert_eq!(cb.remaining_cooldown(), 300);
    }
}
