//! Retry/backoff bookkeeping for resource failures
//!
//! Attempts are counted per audio address. Delay doubles with every
//! attempt: `base * 2^attempts` (1s, 2s with the defaults).

use std::collections::HashMap;
use std::time::Duration;

/// Outcome of recording a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after `delay`; `attempt` is 1-based
    Retry { attempt: u32, delay: Duration },

    /// Cap reached; give up on this address
    Exhausted { attempts: u32 },
}

/// Per-address retry counters
#[derive(Debug, Clone)]
pub struct RetryTracker {
    counts: HashMap<String, u32>,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryTracker {
    /// Create a tracker allowing `max_retries` retries per address
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            counts: HashMap::new(),
            max_retries,
            base_delay,
        }
    }

    /// Record a failure for `address` and decide what to do
    pub fn record_failure(&mut self, address: &str) -> RetryDecision {
        let attempts = self.attempts(address);
        if attempts >= self.max_retries {
            return RetryDecision::Exhausted { attempts };
        }

        self.counts.insert(address.to_string(), attempts + 1);
        RetryDecision::Retry {
            attempt: attempts + 1,
            delay: self.delay_for(attempts),
        }
    }

    /// Retries spent on `address` so far
    pub fn attempts(&self, address: &str) -> u32 {
        self.counts.get(address).copied().unwrap_or(0)
    }

    /// Forget every counter (new queue, stop)
    pub fn reset(&mut self) {
        self.counts.clear();
    }

    /// Whether no address has failed since the last reset
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    fn delay_for(&self, attempts: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://audio.example/1.mp3";

    #[test]
    fn exponential_delays_then_exhausted() {
        let mut tracker = RetryTracker::new(2, Duration::from_secs(1));

        assert_eq!(
            tracker.record_failure(URL),
            RetryDecision::Retry {
                attempt: 1,
                delay: Duration::from_secs(1)
            }
        );
        assert_eq!(
            tracker.record_failure(URL),
            RetryDecision::Retry {
                attempt: 2,
                delay: Duration::from_secs(2)
            }
        );
        assert_eq!(
            tracker.record_failure(URL),
            RetryDecision::Exhausted { attempts: 2 }
        );
        // Stays exhausted until reset
        assert_eq!(
            tracker.record_failure(URL),
            RetryDecision::Exhausted { attempts: 2 }
        );
    }

    #[test]
    fn counters_are_per_address() {
        let mut tracker = RetryTracker::new(2, Duration::from_millis(500));
        tracker.record_failure(URL);
        tracker.record_failure(URL);

        assert_eq!(tracker.attempts(URL), 2);
        assert_eq!(tracker.attempts("https://audio.example/2.mp3"), 0);
        assert!(matches!(
            tracker.record_failure("https://audio.example/2.mp3"),
            RetryDecision::Retry { attempt: 1, .. }
        ));
    }

    #[test]
    fn reset_clears_counters() {
        let mut tracker = RetryTracker::new(2, Duration::from_secs(1));
        tracker.record_failure(URL);
        assert!(!tracker.is_empty());

        tracker.reset();
        assert!(tracker.is_empty());
        assert_eq!(tracker.attempts(URL), 0);
    }

    #[test]
    fn zero_cap_skips_immediately() {
        let mut tracker = RetryTracker::new(0, Duration::from_secs(1));
        assert_eq!(
            tracker.record_failure(URL),
            RetryDecision::Exhausted { attempts: 0 }
        );
    }

    #[test]
    fn huge_attempt_counts_saturate() {
        let tracker = RetryTracker::new(u32::MAX, Duration::from_secs(1));
        assert_eq!(
            tracker.delay_for(40),
            Duration::from_secs(u64::from(u32::MAX))
        );
    }
}
