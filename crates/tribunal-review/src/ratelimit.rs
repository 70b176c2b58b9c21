//! Fixed-window request rate limiting keyed by client identifier.
//!
//! The limiter can only deny, never fail: every call returns a
//! [`RateDecision`]. Rejected requests do not increment the counter and
//! do not extend the window. Expired windows are detected lazily on
//! access; a periodic [`RateLimiter::sweep`] bounds memory.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tribunal_core::RateLimitConfig;

/// How often the background sweep should run.
pub const SWEEP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Maximum requests per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// When the current window resets.
    pub reset_at: DateTime<Utc>,
}

impl RateDecision {
    /// Window reset time as unix seconds, for `X-RateLimit-Reset`.
    pub fn reset_epoch(&self) -> i64 {
        self.reset_at.timestamp()
    }

    /// Whole seconds until the window resets, for `Retry-After`.
    /// Never negative.
    pub fn retry_after_secs(&self) -> u64 {
        (self.reset_at - Utc::now()).num_seconds().max(0) as u64
    }
}

/// Fixed-window request counter shared across concurrent requests.
///
/// # Examples
///
/// ```
/// use tribunal_review::ratelimit::RateLimiter;
///
/// let limiter = RateLimiter::with_limits(60, 2);
/// assert!(limiter.check("1.2.3.4").allowed);
/// assert!(limiter.check("1.2.3.4").allowed);
/// assert!(!limiter.check("1.2.3.4").allowed);
/// ```
pub struct RateLimiter {
    entries: Mutex<HashMap<String, WindowEntry>>,
    window: Duration,
    limit: u32,
}

impl RateLimiter {
    /// Create a limiter from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_limits(config.window_secs, config.max_requests)
    }

    /// Create a limiter with an explicit window and per-window maximum.
    pub fn with_limits(window_secs: u64, max_requests: u32) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            window: Duration::seconds(window_secs as i64),
            limit: max_requests,
        }
    }

    /// Count a request against `identifier` and decide whether it may
    /// proceed.
    pub fn check(&self, identifier: &str) -> RateDecision {
        self.check_at(identifier, Utc::now())
    }

    fn check_at(&self, identifier: &str, now: DateTime<Utc>) -> RateDecision {
        let mut entries = self.lock();
        match entries.get_mut(identifier) {
            Some(entry) if entry.reset_at > now => {
                if entry.count >= self.limit {
                    RateDecision {
                        allowed: false,
                        limit: self.limit,
                        remaining: 0,
                        reset_at: entry.reset_at,
                    }
                } else {
                    entry.count += 1;
                    RateDecision {
                        allowed: true,
                        limit: self.limit,
                        remaining: self.limit - entry.count,
                        reset_at: entry.reset_at,
                    }
                }
            }
            _ => {
                let reset_at = now + self.window;
                entries.insert(
                    identifier.to_string(),
                    WindowEntry { count: 1, reset_at },
                );
                RateDecision {
                    allowed: true,
                    limit: self.limit,
                    remaining: self.limit.saturating_sub(1),
                    reset_at,
                }
            }
        }
    }

    /// Report the current window state for `identifier` without
    /// consuming quota. Used to stamp rate-limit headers on responses
    /// that are not gated.
    pub fn status(&self, identifier: &str) -> RateDecision {
        let now = Utc::now();
        let entries = self.lock();
        match entries.get(identifier) {
            Some(entry) if entry.reset_at > now => RateDecision {
                allowed: entry.count < self.limit,
                limit: self.limit,
                remaining: self.limit.saturating_sub(entry.count),
                reset_at: entry.reset_at,
            },
            _ => RateDecision {
                allowed: true,
                limit: self.limit,
                remaining: self.limit,
                reset_at: now + self.window,
            },
        }
    }

    /// Remove entries whose window has passed. Returns how many were
    /// dropped. Advisory cleanup only: expired entries are also handled
    /// lazily by [`check`](Self::check).
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.reset_at > now);
        before - entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, WindowEntry>> {
        // A poisoned lock only means another request panicked mid-update;
        // the map itself is still usable.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_with_decreasing_remaining() {
        let limiter = RateLimiter::with_limits(60, 10);
        for expected_remaining in (0..10).rev() {
            let decision = limiter.check("client-a");
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert_eq!(decision.limit, 10);
        }
        let eleventh = limiter.check("client-a");
        assert!(!eleventh.allowed);
        assert_eq!(eleventh.remaining, 0);
    }

    #[test]
    fn identifiers_are_independent() {
        let limiter = RateLimiter::with_limits(60, 1);
        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("a").allowed);
        assert!(limiter.check("b").allowed);
    }

    #[test]
    fn rejection_does_not_extend_window() {
        let limiter = RateLimiter::with_limits(60, 1);
        let now = Utc::now();
        let first = limiter.check_at("a", now);
        let denied = limiter.check_at("a", now + Duration::seconds(30));
        assert!(!denied.allowed);
        assert_eq!(denied.reset_at, first.reset_at);
    }

    #[test]
    fn window_expiry_resets_count() {
        let limiter = RateLimiter::with_limits(60, 2);
        let now = Utc::now();
        limiter.check_at("a", now);
        limiter.check_at("a", now);
        assert!(!limiter.check_at("a", now).allowed);

        let later = now + Duration::seconds(61);
        let decision = limiter.check_at("a", later);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
        assert_eq!(decision.reset_at, later + Duration::seconds(60));
    }

    #[test]
    fn status_does_not_consume_quota() {
        let limiter = RateLimiter::with_limits(60, 3);
        limiter.check("a");
        let status = limiter.status("a");
        assert_eq!(status.remaining, 2);
        let again = limiter.status("a");
        assert_eq!(again.remaining, 2);
    }

    #[test]
    fn status_for_unknown_identifier_is_full_window() {
        let limiter = RateLimiter::with_limits(60, 10);
        let status = limiter.status("never-seen");
        assert!(status.allowed);
        assert_eq!(status.remaining, 10);
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let limiter = RateLimiter::with_limits(60, 10);
        let now = Utc::now();
        limiter.check_at("old", now - Duration::seconds(120));
        limiter.check_at("fresh", now);
        let dropped = limiter.sweep_at(now);
        assert_eq!(dropped, 1);
        // The fresh entry keeps its count.
        assert_eq!(limiter.status("fresh").remaining, 9);
    }
}
