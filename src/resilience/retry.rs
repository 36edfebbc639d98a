//! Retry Logic
//!
//! Back-off policy for rate-limited inventory API calls.

use std::time::Duration;

/// Retry policy applied when the inventory API answers 429.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitPolicy {
    /// Maximum number of retries after the first rate-limited response.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Jitter factor (0.0-1.0).
    pub jitter: f64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        DEFAULT_RATE_LIMIT_POLICY
    }
}

/// Default rate-limit policy: 2 s doubling up to 30 s, five retries.
pub const DEFAULT_RATE_LIMIT_POLICY: RateLimitPolicy = RateLimitPolicy {
    max_retries: 5,
    initial_delay: Duration::from_secs(2),
    max_delay: Duration::from_secs(30),
    multiplier: 2.0,
    jitter: 0.1,
};

impl RateLimitPolicy {
    /// Fixed delay with no growth or jitter.
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    /// Fixed 2 s delay retried without a cap.
    ///
    /// Never gives up: a sync using it may never terminate
    /// while the API keeps answering 429.
    pub fn unbounded() -> Self {
        Self::fixed(Duration::from_secs(2), u32::MAX)
    }

    /// Whether another retry is allowed after `retries_done` retries.
    pub fn allows_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);

        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        // Add jitter
        let jitter_range = capped_delay * self.jitter;
        let jitter = if jitter_range > 0.0 {
            (rand::random::<f64>() - 0.5) * 2.0 * jitter_range
        } else {
            0.0
        };
        let final_delay = (capped_delay + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }

    /// Delay before retry number `attempt`, raised to the server's
    /// `Retry-After` hint. The hint is capped at `max_delay`.
    pub fn delay_with_hint(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = self.delay_for(attempt);
        match retry_after {
            Some(hint) => delay.max(hint.min(self.max_delay)),
            None => delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RateLimitPolicy {
            jitter: 0.0,
            ..RateLimitPolicy::default()
        };

        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RateLimitPolicy::default();
        for _ in 0..50 {
            let delay = policy.delay_for(0).as_millis();
            assert!((1800..=2200).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn test_retry_cap() {
        let policy = RateLimitPolicy::fixed(Duration::from_millis(5), 2);
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(1));
        assert!(!policy.allows_retry(2));
        assert_eq!(policy.delay_for(7), Duration::from_millis(5));
    }

    #[test]
    fn test_retry_after_hint_raises_delay_up_to_cap() {
        let policy = RateLimitPolicy {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            multiplier: 1.0,
            jitter: 0.0,
        };

        assert_eq!(policy.delay_with_hint(0, None), Duration::from_secs(2));
        assert_eq!(
            policy.delay_with_hint(0, Some(Duration::from_secs(1))),
            Duration::from_secs(2)
        );
        assert_eq!(
            policy.delay_with_hint(0, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        assert_eq!(
            policy.delay_with_hint(0, Some(Duration::from_secs(3600))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_unbounded_uses_two_second_delay() {
        let policy = RateLimitPolicy::unbounded();
        assert!(policy.allows_retry(1_000_000));
        assert_eq!(policy.delay_for(3), Duration::from_secs(2));
    }
}
