//! In-memory review cache validated by TTL and commit fingerprint.
//!
//! One entry per normalized URL, replaced wholesale on write. Entries
//! die lazily at read time: first on TTL expiry, then on fingerprint
//! mismatch (the upstream content changed since the review was cached).
//! Process-lifetime only; restarts start cold by design.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tribunal_core::{CacheConfig, ReviewResult};

/// A cached review plus the validation data needed to serve it.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached review.
    pub review: ReviewResult,
    /// Commit SHA the review was computed against.
    pub commit_hash: String,
    /// Normalized URL key this entry is stored under.
    pub normalized_url: String,
    /// When the entry was written.
    pub cached_at: DateTime<Utc>,
    /// `cached_at + TTL`.
    pub expires_at: DateTime<Utc>,
}

/// TTL + fingerprint validated review cache.
///
/// # Examples
///
/// ```
/// use tribunal_review::cache::ReviewCache;
///
/// let cache = ReviewCache::with_ttl_secs(3600);
/// assert!(cache.get("https://github.com/a/b", "abc123").is_none());
/// ```
pub struct ReviewCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ReviewCache {
    /// Create a cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_ttl_secs(config.ttl_secs)
    }

    /// Create a cache with an explicit TTL in seconds.
    pub fn with_ttl_secs(ttl_secs: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Look up a cached review for `url`, valid against
    /// `current_fingerprint`.
    ///
    /// Validation order: entry existence, then TTL, then fingerprint
    /// equality. TTL-expired and stale entries are deleted on the way
    /// out so at most one valid entry exists per key.
    pub fn get(&self, url: &str, current_fingerprint: &str) -> Option<CacheEntry> {
        self.get_at(url, current_fingerprint, Utc::now())
    }

    fn get_at(
        &self,
        url: &str,
        current_fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Option<CacheEntry> {
        let key = normalize_url(url);
        let mut entries = self.lock();
        let entry = entries.get(&key)?;

        if entry.expires_at < now {
            tracing::debug!(url = %key, "cache entry expired");
            entries.remove(&key);
            return None;
        }
        if entry.commit_hash != current_fingerprint {
            tracing::debug!(
                url = %key,
                cached = %entry.commit_hash,
                current = %current_fingerprint,
                "cache entry stale, upstream moved"
            );
            entries.remove(&key);
            return None;
        }
        Some(entry.clone())
    }

    /// Store a review for `url`, replacing any prior entry.
    pub fn set(&self, url: &str, fingerprint: &str, review: ReviewResult) {
        self.set_at(url, fingerprint, review, Utc::now());
    }

    fn set_at(&self, url: &str, fingerprint: &str, review: ReviewResult, now: DateTime<Utc>) {
        let key = normalize_url(url);
        let entry = CacheEntry {
            review,
            commit_hash: fingerprint.to_string(),
            normalized_url: key.clone(),
            cached_at: now,
            expires_at: now + self.ttl,
        };
        self.lock().insert(key, entry);
    }

    /// Drop any entry for `url`. Returns whether one existed.
    pub fn invalidate(&self, url: &str) -> bool {
        self.lock().remove(&normalize_url(url)).is_some()
    }

    /// Number of entries currently held, valid or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Normalize a URL for cache keying: lowercase, no scheme, no `www.`,
/// no trailing slash. Two spellings of the same resource must produce
/// the same key.
///
/// # Examples
///
/// ```
/// use tribunal_review::cache::normalize_url;
///
/// assert_eq!(
///     normalize_url("HTTPS://www.GitHub.com/A/B/"),
///     normalize_url("github.com/a/b")
/// );
/// ```
pub fn normalize_url(url: &str) -> String {
    let lower = url.trim().to_lowercase();
    let stripped = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let stripped = stripped.strip_prefix("www.").unwrap_or(stripped);
    stripped.trim_end_matches('/').to_string()
}
