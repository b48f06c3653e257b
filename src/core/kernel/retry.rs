//! Retry policies and the shared rate-limit backoff signal.

use reqwest::Method;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_retry::strategy::jitter;

/// Backoff recorded after a 429 that carried no retry-after hint.
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(1);

/// Retry policy for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Never retried. Used for every mutating request, since a replay could
    /// duplicate a transfer or withdrawal.
    None,
    /// Retried on transport failures, timeouts and rate limiting.
    Idempotent,
}

impl RetryPolicy {
    pub fn for_method(method: &Method) -> Self {
        if *method == Method::GET {
            Self::Idempotent
        } else {
            Self::None
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Randomize each delay within `[0, delay)`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delays between attempts under `policy`. Empty for `RetryPolicy::None`.
    ///
    /// The first delay equals `initial_delay` exactly and each following one
    /// doubles, capped at `max_delay`.
    pub fn delays(&self, policy: RetryPolicy) -> Box<dyn Iterator<Item = Duration> + Send> {
        let attempts = match policy {
            RetryPolicy::None => 0,
            RetryPolicy::Idempotent => self.max_retries as usize,
        };

        let max_delay = self.max_delay;
        let strategy = std::iter::successors(Some(self.initial_delay), |d| Some(d.saturating_mul(2)))
            .map(move |d| d.min(max_delay))
            .take(attempts);

        if self.jitter {
            Box::new(strategy.map(jitter))
        } else {
            Box::new(strategy)
        }
    }
}

/// Advisory "back off until" signal shared by every request of one client.
///
/// Set when the exchange throttles a request. Idempotent requests wait it out
/// before their next attempt; mutating requests only log it.
#[derive(Debug, Default)]
pub struct BackoffGate {
    until_ms: AtomicU64,
}

impl BackoffGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the backoff window to at least `now + delay`.
    pub fn record(&self, delay: Duration) {
        let until = now_millis().saturating_add(delay.as_millis() as u64);
        self.until_ms.fetch_max(until, Ordering::AcqRel);
    }

    /// Time left in the current backoff window, if any.
    pub fn remaining(&self) -> Option<Duration> {
        let until = self.until_ms.load(Ordering::Acquire);
        let now = now_millis();
        (until > now).then(|| Duration::from_millis(until - now))
    }

    pub fn clear(&self) {
        self.until_ms.store(0, Ordering::Release);
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> RetryConfig {
        RetryConfig::default().with_jitter(false)
    }

    #[test]
    fn test_policy_for_method() {
        assert_eq!(RetryPolicy::for_method(&Method::GET), RetryPolicy::Idempotent);
        assert_eq!(RetryPolicy::for_method(&Method::POST), RetryPolicy::None);
        assert_eq!(RetryPolicy::for_method(&Method::DELETE), RetryPolicy::None);
    }

    #[test]
    fn test_delays_double_from_initial() {
        let delays: Vec<_> = no_jitter().delays(RetryPolicy::Idempotent).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800)
            ]
        );
    }

    #[test]
    fn test_delays_cap_at_max() {
        let config = no_jitter()
            .with_max_retries(6)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(3));
        let delays: Vec<_> = config.delays(RetryPolicy::Idempotent).collect();
        assert_eq!(delays.len(), 6);
        assert_eq!(delays[0], Duration::from_secs(1));
        assert_eq!(delays[1], Duration::from_secs(2));
        assert!(delays[2..].iter().all(|d| *d == Duration::from_secs(3)));
    }

    #[test]
    fn test_odd_and_sub_millisecond_initial_delays_are_kept() {
        let delays = |initial: Duration| -> Vec<Duration> {
            no_jitter()
                .with_initial_delay(initial)
                .delays(RetryPolicy::Idempotent)
                .collect()
        };
        assert_eq!(
            delays(Duration::from_millis(1)),
            vec![Duration::from_millis(1), Duration::from_millis(2), Duration::from_millis(4)]
        );
        assert_eq!(delays(Duration::from_millis(3))[0], Duration::from_millis(3));
        assert_eq!(delays(Duration::from_millis(201))[0], Duration::from_millis(201));
        assert_eq!(delays(Duration::from_micros(500))[1], Duration::from_millis(1));
    }

    #[test]
    fn test_no_delays_for_mutating_policy() {
        assert_eq!(RetryConfig::default().delays(RetryPolicy::None).count(), 0);
    }

    #[test]
    fn test_jittered_delays_stay_below_cap() {
        let delays: Vec<_> = RetryConfig::default()
            .delays(RetryPolicy::Idempotent)
            .collect();
        assert_eq!(delays.len(), 3);
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(800)));
    }

    #[test]
    fn test_backoff_gate_window() {
        let gate = BackoffGate::new();
        assert!(gate.remaining().is_none());

        gate.record(Duration::from_secs(5));
        let remaining = gate.remaining().unwrap();
        assert!(remaining > Duration::from_secs(4));
        assert!(remaining <= Duration::from_secs(5));

        // A shorter hint never shrinks the window
        gate.record(Duration::from_millis(10));
        assert!(gate.remaining().unwrap() > Duration::from_secs(4));

        gate.clear();
        assert!(gate.remaining().is_none());
    }
}
