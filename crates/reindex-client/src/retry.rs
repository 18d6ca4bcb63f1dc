//! Attempt-bounded exponential backoff.

use std::time::Duration;

use backoff::backoff::Backoff;
use reindex_types::RetryPolicy;

/// Backoff schedule for one logical request.
///
/// Yields `base * 2^(k-1)` before retry `k` and `None` once the policy's
/// attempt budget is spent. Unlike `backoff::ExponentialBackoff` there is
/// no jitter, interval cap or elapsed-time limit.
#[derive(Debug, Clone)]
pub struct AttemptBackoff {
    policy: RetryPolicy,
    retries_issued: u32,
}

impl AttemptBackoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            retries_issued: 0,
        }
    }

    /// Retries handed out so far.
    pub fn retries_issued(&self) -> u32 {
        self.retries_issued
    }
}

impl Backoff for AttemptBackoff {
    fn reset(&mut self) {
        self.retries_issued = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries_issued >= self.policy.max_retries() {
            return None;
        }
        self.retries_issued += 1;
        Some(self.policy.delay_for_retry(self.retries_issued))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_for_default_policy() {
        let mut backoff = AttemptBackoff::new(RetryPolicy::default());
        let mut delays = Vec::new();
        while let Some(delay) = backoff.next_backoff() {
            delays.push(delay.as_millis());
        }
        assert_eq!(delays, vec![1000, 2000, 4000, 8000]);
        assert_eq!(backoff.retries_issued(), 4);
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        let mut backoff = AttemptBackoff::new(policy);
        assert_eq!(backoff.next_backoff(), None);
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let mut backoff = AttemptBackoff::new(RetryPolicy::default());
        backoff.next_backoff();
        backoff.next_backoff();
        backoff.reset();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(1000)));
    }
}
