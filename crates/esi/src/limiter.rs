//! Shared ESI error-budget tracking.
//!
//! ESI grants a global budget of errors per rolling window and reports
//! the remainder on every response. All workers hitting the API from
//! the same IP share that budget, so the observed status is kept in a
//! [`SharedCache`] every process can reach. A cache failure only costs
//! us budget visibility, never a character update, so cache errors are
//! logged and swallowed here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pilotwatch_core::error_limit::{merge_window, ErrorLimitStatus, WindowMerge};
use pilotwatch_core::Timestamp;

/// Cache key under which the error-limit status is shared.
pub const ERROR_LIMIT_CACHE_KEY: &str = "esi:error_limit";

#[derive(Debug, thiserror::Error)]
#[error("cache error: {0}")]
pub struct CacheError(pub String);

/// Storage shared between worker processes. Implementations must be
/// safe to call concurrently.
#[async_trait]
pub trait SharedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    async fn set_with_ttl(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl_seconds: i64,
    ) -> Result<(), CacheError>;
}

/// Process-local [`SharedCache`] used in tests and single-worker setups.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (serde_json::Value, Timestamp)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let entries = self.entries.lock().map_err(|e| CacheError(e.to_string()))?;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl_seconds: i64,
    ) -> Result<(), CacheError> {
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds.max(0));
        let mut entries = self.entries.lock().map_err(|e| CacheError(e.to_string()))?;
        entries.insert(key.to_string(), (value, expires_at));
        Ok(())
    }
}

/// Tracks the shared ESI error budget across workers.
///
/// [`ErrorLimiter::check`] is consulted before every request and
/// [`ErrorLimiter::record`] is fed the error-limit headers of every
/// response. Concurrent workers may observe different remainders for
/// the same window; the merge keeps the most pessimistic one.
pub struct ErrorLimiter {
    cache: Arc<dyn SharedCache>,
    threshold: i32,
    window_tolerance_secs: i64,
}

impl ErrorLimiter {
    pub fn new(cache: Arc<dyn SharedCache>, threshold: i32, window_tolerance_secs: i64) -> Self {
        Self {
            cache,
            threshold,
            window_tolerance_secs,
        }
    }

    /// The stored status, if one exists and its window has not passed.
    pub async fn current(&self, now: Timestamp) -> Option<ErrorLimitStatus> {
        let value = match self.cache.get(ERROR_LIMIT_CACHE_KEY).await {
            Ok(value) => value?,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read error-limit status from cache");
                return None;
            }
        };
        match serde_json::from_value::<ErrorLimitStatus>(value) {
            Ok(status) if !status.is_expired(now) => Some(status),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "Discarding malformed error-limit status");
                None
            }
        }
    }

    /// Seconds until the budget window resets, when the budget is
    /// exhausted. `None` means requests may proceed.
    pub async fn check(&self, now: Timestamp) -> Option<i64> {
        let status = self.current(now).await?;
        if status.is_exceeded(self.threshold) {
            Some(status.retry_in_seconds(now))
        } else {
            None
        }
    }

    /// Feeds one response's error-limit headers into the shared status.
    ///
    /// Returns the status that was written when this report superseded
    /// the shared one; `None` when the report was ignored or the cache
    /// write failed.
    pub async fn record(
        &self,
        remain: i32,
        reset_seconds: i64,
        now: Timestamp,
    ) -> Option<ErrorLimitStatus> {
        let incoming = ErrorLimitStatus::from_headers(remain, reset_seconds, now);
        let current = self.current(now).await;
        match merge_window(current.as_ref(), &incoming, self.window_tolerance_secs) {
            WindowMerge::Store => {
                let ttl = incoming.ttl_seconds(now);
                let value = match serde_json::to_value(&incoming) {
                    Ok(value) => value,
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to encode error-limit status");
                        return None;
                    }
                };
                match self
                    .cache
                    .set_with_ttl(ERROR_LIMIT_CACHE_KEY, value, ttl)
                    .await
                {
                    Ok(()) => Some(incoming),
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to store error-limit status");
                        None
                    }
                }
            }
            WindowMerge::Ignore => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pilotwatch_core::error_limit::DEFAULT_WINDOW_TOLERANCE_SECS;

    use super::*;

    fn limiter() -> ErrorLimiter {
        ErrorLimiter::new(
            Arc::new(MemoryCache::new()),
            25,
            DEFAULT_WINDOW_TOLERANCE_SECS,
        )
    }

    #[tokio::test]
    async fn empty_cache_allows_requests() {
        let limiter = limiter();
        assert_eq!(limiter.check(Utc::now()).await, None);
    }

    #[tokio::test]
    async fn healthy_budget_allows_requests() {
        let limiter = limiter();
        let now = Utc::now();
        limiter.record(80, 45, now).await;
        assert_eq!(limiter.check(now).await, None);
    }

    #[tokio::test]
    async fn exhausted_budget_blocks_until_reset() {
        let limiter = limiter();
        let now = Utc::now();
        limiter.record(12, 40, now).await;
        let retry_in = limiter.check(now).await.expect("budget should be blocked");
        assert_eq!(retry_in, 40);
    }

    #[tokio::test]
    async fn lower_remain_wins_within_same_window() {
        let limiter = limiter();
        let now = Utc::now();
        limiter.record(40, 60, now).await;
        limiter.record(10, 59, now).await;
        let status = limiter.current(now).await.unwrap();
        assert_eq!(status.remain, 10);
    }

    #[tokio::test]
    async fn higher_remain_is_ignored_within_same_window() {
        let limiter = limiter();
        let now = Utc::now();
        limiter.record(10, 60, now).await;
        assert_eq!(limiter.record(40, 58, now).await, None);
        let status = limiter.current(now).await.unwrap();
        assert_eq!(status.remain, 10);
    }

    #[tokio::test]
    async fn newer_window_replaces_old_status() {
        let limiter = limiter();
        let t0 = Utc::now();
        limiter.record(40, 30, t0).await;
        // A minute later the window has rolled over and the budget is
        // back near full.
        let t1 = t0 + Duration::seconds(60);
        let stored = limiter.record(99, 90, t1).await;
        assert_eq!(stored.map(|s| s.remain), Some(99));
        let status = limiter.current(t1).await.unwrap();
        assert_eq!(status.remain, 99);
        assert_eq!(limiter.check(t1).await, None);
    }

    #[tokio::test]
    async fn stale_window_report_is_ignored() {
        let limiter = limiter();
        let now = Utc::now();
        limiter.record(50, 60, now).await;
        // A delayed response from a window that reset long before.
        limiter.record(3, 10, now).await;
        let status = limiter.current(now).await.unwrap();
        assert_eq!(status.remain, 50);
    }

    #[tokio::test]
    async fn expired_status_reads_as_absent() {
        let limiter = limiter();
        let now = Utc::now();
        limiter.record(12, 30, now).await;
        let later = now + Duration::seconds(31);
        assert_eq!(limiter.current(later).await, None);
        assert_eq!(limiter.check(later).await, None);
    }

    #[tokio::test]
    async fn malformed_cache_value_is_discarded() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .set_with_ttl(ERROR_LIMIT_CACHE_KEY, serde_json::json!("not-a-status"), 60)
            .await
            .unwrap();
        let limiter = ErrorLimiter::new(cache, 25, DEFAULT_WINDOW_TOLERANCE_SECS);
        assert_eq!(limiter.current(Utc::now()).await, None);
    }

    #[tokio::test]
    async fn memory_cache_expires_entries() {
        let cache = MemoryCache::new();
        cache
            .set_with_ttl("k", serde_json::json!(1), 0)
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
