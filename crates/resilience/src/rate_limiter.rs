//! Sliding-Window Rate Limiting
//!
//! This module provides a per-key sliding-window rate limiter. Each key
//! tracks the timestamps of its recent calls; a call is admitted only while
//! fewer than `max_requests` timestamps fall inside the window ending now.
//! The window boundary moves continuously with each call rather than
//! resetting at fixed intervals.
//!
//! Rejection is an expected, routine outcome, so admission is reported as a
//! boolean rather than an error; the caller decides the user-facing
//! consequence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum admitted calls per key within the window
    pub max_requests: usize,
    /// Sliding window size
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

/// Rate limiter statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct RateLimiterStats {
    /// Total calls admitted
    pub allowed: u64,
    /// Total calls rejected
    pub denied: u64,
    /// Number of keys currently holding timestamps
    pub tracked_keys: usize,
}

/// Per-key sliding-window rate limiter
pub struct RateLimiter {
    config: RateLimiterConfig,
    /// Recorded call timestamps per key, in chronological order
    requests: DashMap<String, Vec<Instant>>,
    allowed: AtomicU64,
    denied: AtomicU64,
}

impl RateLimiter {
    /// Create a new rate limiter with default config
    pub fn new() -> Self {
        Self::with_config(RateLimiterConfig::default())
    }

    /// Create a new rate limiter with custom config
    pub fn with_config(config: RateLimiterConfig) -> Self {
        info!(
            "Creating rate limiter: max_requests={}, window={:?}",
            config.max_requests, config.window
        );

        Self {
            config,
            requests: DashMap::new(),
            allowed: AtomicU64::new(0),
            denied: AtomicU64::new(0),
        }
    }

    /// Check whether a call for `key` is admitted right now.
    ///
    /// Prunes expired timestamps for the key, then either records the call
    /// and returns `true`, or returns `false` with nothing recorded. A
    /// timestamp exactly one window old is considered expired.
    pub fn is_allowed(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut timestamps = self.requests.entry(key.to_string()).or_default();

        timestamps.retain(|t| now.duration_since(*t) < self.config.window);

        if timestamps.len() >= self.config.max_requests {
            self.denied.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Rate limit exceeded for key '{}': {} calls in window",
                key,
                timestamps.len()
            );
            return false;
        }

        timestamps.push(now);
        self.allowed.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Clear all recorded timestamps for a key
    pub fn reset(&self, key: &str) {
        self.requests.remove(key);
    }

    /// Sweep expired timestamps across all keys, dropping keys whose
    /// window becomes empty. Intended to run periodically to bound memory,
    /// independent of `is_allowed` calls. Returns the number of keys
    /// removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();

        // Counted inside the closure: concurrent is_allowed callers may
        // insert fresh keys mid-sweep, so a before/after length delta is
        // not a removal count.
        let mut removed = 0;
        self.requests.retain(|_, timestamps| {
            timestamps.retain(|t| now.duration_since(*t) < self.config.window);
            let keep = !timestamps.is_empty();
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            debug!("Rate limiter sweep removed {} idle keys", removed);
        }
        removed
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.requests.len()
    }

    /// Get current statistics
    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            allowed: self.allowed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            tracked_keys: self.requests.len(),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::sleep;

    fn limiter(max_requests: usize, window_ms: u64) -> RateLimiter {
        RateLimiter::with_config(RateLimiterConfig {
            max_requests,
            window: Duration::from_millis(window_ms),
        })
    }

    #[test]
    fn test_allows_within_quota() {
        let limiter = limiter(3, 1000);
        assert!(limiter.is_allowed("user-1"));
        assert!(limiter.is_allowed("user-1"));
        assert!(limiter.is_allowed("user-1"));
    }

    #[test]
    fn test_rejects_over_quota() {
        let limiter = limiter(2, 1000);
        assert!(limiter.is_allowed("user-1"));
        assert!(limiter.is_allowed("user-1"));
        assert!(!limiter.is_allowed("user-1"));

        let stats = limiter.stats();
        assert_eq!(stats.allowed, 2);
        assert_eq!(stats.denied, 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1, 1000);
        assert!(limiter.is_allowed("user-1"));
        assert!(limiter.is_allowed("user-2"));
        assert!(!limiter.is_allowed("user-1"));
        assert!(!limiter.is_allowed("user-2"));
    }

    #[tokio::test]
    async fn test_sliding_window_frees_slot() {
        // maxRequests=2, windowMs=100: two quick calls succeed, a third is
        // rejected, and once the earliest call ages out a slot frees up.
        let limiter = limiter(2, 100);

        assert!(limiter.is_allowed("user-1"));
        sleep(Duration::from_millis(20)).await;
        assert!(limiter.is_allowed("user-1"));
        assert!(!limiter.is_allowed("user-1"));

        // Wait until the first call falls outside the window
        sleep(Duration::from_millis(110)).await;
        assert!(limiter.is_allowed("user-1"));
    }

    #[test]
    fn test_rejected_call_not_recorded() {
        let limiter = limiter(1, 1000);
        assert!(limiter.is_allowed("user-1"));
        // Rejected calls must not extend the occupied window
        for _ in 0..5 {
            assert!(!limiter.is_allowed("user-1"));
        }
        let entry = limiter.requests.get("user-1").unwrap();
        assert_eq!(entry.len(), 1);
    }

    #[test]
    fn test_reset_clears_key() {
        let limiter = limiter(1, 1000);
        assert!(limiter.is_allowed("user-1"));
        assert!(!limiter.is_allowed("user-1"));

        limiter.reset("user-1");
        assert!(limiter.is_allowed("user-1"));
    }

    #[tokio::test]
    async fn test_cleanup_removes_idle_keys() {
        let limiter = limiter(5, 50);
        assert!(limiter.is_allowed("user-1"));
        assert!(limiter.is_allowed("user-2"));
        assert_eq!(limiter.tracked_keys(), 2);

        sleep(Duration::from_millis(80)).await;
        assert!(limiter.is_allowed("user-2"));

        let removed = limiter.cleanup();
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cleanup_during_concurrent_inserts() {
        let limiter = Arc::new(limiter(5, 10));

        let writer = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                for i in 0..500 {
                    limiter.is_allowed(&format!("key-{}", i));
                    tokio::task::yield_now().await;
                }
            })
        };

        // Sweeps overlap the inserts; fresh keys appearing mid-sweep must
        // not corrupt the removal count.
        for _ in 0..200 {
            let removed = limiter.cleanup();
            assert!(removed <= 500);
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let limiter = Arc::new(limiter(50, 1000));

        let mut handles = vec![];
        for _ in 0..10 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                let mut allowed = 0;
                for _ in 0..10 {
                    if limiter.is_allowed("shared") {
                        allowed += 1;
                    }
                }
                allowed
            }));
        }

        let mut total_allowed = 0;
        for handle in handles {
            total_allowed += handle.await.unwrap();
        }

        // Exactly the quota is admitted, no more
        assert_eq!(total_allowed, 50);
        let stats = limiter.stats();
        assert_eq!(stats.allowed, 50);
        assert_eq!(stats.denied, 50);
    }
}
