//! ESI error-budget accounting shared across workers.
//!
//! Every ESI response carries `X-Esi-Error-Limit-Remain` (errors left
//! in the current window) and `X-Esi-Error-Limit-Reset` (seconds until
//! the window rolls over). Concurrent workers all observe these
//! headers, and responses arrive out of order, so the stored status
//! must only ever move in the safe direction: within one window the
//! remaining budget may only decrease, and only a genuinely newer
//! window may raise it again. This module holds the pure decision
//! logic; the cache-backed tracker lives with the HTTP client.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Budget floor at which request dispatch pauses until the window
/// resets.
pub const DEFAULT_ERROR_LIMIT_THRESHOLD: i32 = 25;

/// Two reset timestamps within this many seconds of each other are
/// treated as the same window. Absorbs clock jitter between workers
/// and in-flight latency skew.
pub const DEFAULT_WINDOW_TOLERANCE_SECS: i64 = 5;

/// A snapshot of the ESI error budget, as reported by one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLimitStatus {
    /// Errors remaining in the current window.
    pub remain: i32,
    /// Absolute time the window expires, derived from the relative
    /// reset header at observation time.
    pub reset_at: Timestamp,
}

impl ErrorLimitStatus {
    /// Build a status from the raw header values of one response.
    ///
    /// `reset_seconds` is the relative `X-Esi-Error-Limit-Reset` value;
    /// it is anchored to `observed_at` so statuses from different
    /// workers compare on a common clock.
    pub fn from_headers(remain: i32, reset_seconds: i64, observed_at: Timestamp) -> Self {
        ErrorLimitStatus {
            remain,
            reset_at: observed_at + Duration::seconds(reset_seconds),
        }
    }

    /// Whether the remaining budget is at or below `threshold`.
    pub fn is_exceeded(&self, threshold: i32) -> bool {
        self.remain <= threshold
    }

    /// A status from a window that has already reset carries no
    /// information about the current one.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.reset_at <= now
    }

    /// Seconds until the window expires, clamped at zero. Doubles as
    /// the TTL when the status is stored in the shared cache, so stale
    /// windows age out on their own.
    pub fn ttl_seconds(&self, now: Timestamp) -> i64 {
        (self.reset_at - now).num_seconds().max(0)
    }

    /// Seconds a caller should wait before dispatching again once the
    /// budget is exhausted.
    pub fn retry_in_seconds(&self, now: Timestamp) -> i64 {
        self.ttl_seconds(now)
    }
}

/// Outcome of comparing an incoming status against the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMerge {
    /// The incoming status supersedes the stored one.
    Store,
    /// The incoming status is stale or redundant and must not
    /// overwrite the stored one.
    Ignore,
}

/// Decide whether an incoming status may replace the stored one.
///
/// Reports for the same window (reset times within `tolerance_secs`)
/// only ever lower the stored `remain`: a late-arriving response from
/// earlier in the window must not inflate the budget. A report whose
/// reset lies further in the future than the tolerance belongs to a
/// new window and replaces the stored status unconditionally; one
/// whose reset lies further in the past is a leftover from an expired
/// window and is dropped.
pub fn merge_window(
    current: Option<&ErrorLimitStatus>,
    incoming: &ErrorLimitStatus,
    tolerance_secs: i64,
) -> WindowMerge {
    let current = match current {
        Some(current) => current,
        None => return WindowMerge::Store,
    };

    let skew = (incoming.reset_at - current.reset_at).num_seconds();
    if skew.abs() <= tolerance_secs {
        if incoming.remain < current.remain {
            WindowMerge::Store
        } else {
            WindowMerge::Ignore
        }
    } else if skew > 0 {
        // Incoming belongs to a later window.
        WindowMerge::Store
    } else {
        // Incoming belongs to an already-superseded window.
        WindowMerge::Ignore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn status(remain: i32, reset_at_secs: i64) -> ErrorLimitStatus {
        ErrorLimitStatus {
            remain,
            reset_at: at(reset_at_secs),
        }
    }

    // ---- header parsing ----

    #[test]
    fn from_headers_anchors_relative_reset() {
        let s = ErrorLimitStatus::from_headers(87, 42, at(0));
        assert_eq!(s.remain, 87);
        assert_eq!(s.reset_at, at(42));
    }

    // ---- threshold ----

    #[test]
    fn healthy_budget_is_not_exceeded() {
        assert!(!status(100, 60).is_exceeded(DEFAULT_ERROR_LIMIT_THRESHOLD));
        assert!(!status(26, 60).is_exceeded(DEFAULT_ERROR_LIMIT_THRESHOLD));
    }

    #[test]
    fn budget_at_or_below_threshold_is_exceeded() {
        assert!(status(25, 60).is_exceeded(DEFAULT_ERROR_LIMIT_THRESHOLD));
        assert!(status(0, 60).is_exceeded(DEFAULT_ERROR_LIMIT_THRESHOLD));
    }

    // ---- expiry and ttl ----

    #[test]
    fn status_expires_when_window_passes() {
        let s = status(10, 30);
        assert!(!s.is_expired(at(29)));
        assert!(s.is_expired(at(30)));
        assert!(s.is_expired(at(120)));
    }

    #[test]
    fn ttl_counts_down_and_clamps_at_zero() {
        let s = status(10, 30);
        assert_eq!(s.ttl_seconds(at(0)), 30);
        assert_eq!(s.ttl_seconds(at(25)), 5);
        assert_eq!(s.ttl_seconds(at(45)), 0);
    }

    // ---- window merge ----

    #[test]
    fn first_report_is_stored() {
        assert_eq!(
            merge_window(None, &status(99, 60), DEFAULT_WINDOW_TOLERANCE_SECS),
            WindowMerge::Store
        );
    }

    #[test]
    fn same_window_lower_remain_is_stored() {
        let current = status(80, 60);
        let incoming = status(74, 62);
        assert_eq!(
            merge_window(Some(&current), &incoming, DEFAULT_WINDOW_TOLERANCE_SECS),
            WindowMerge::Store
        );
    }

    #[test]
    fn same_window_higher_remain_is_ignored() {
        // A response from earlier in the window arriving late must not
        // inflate the stored budget.
        let current = status(74, 60);
        let incoming = status(80, 58);
        assert_eq!(
            merge_window(Some(&current), &incoming, DEFAULT_WINDOW_TOLERANCE_SECS),
            WindowMerge::Ignore
        );
    }

    #[test]
    fn same_window_equal_remain_is_ignored() {
        let current = status(74, 60);
        let incoming = status(74, 61);
        assert_eq!(
            merge_window(Some(&current), &incoming, DEFAULT_WINDOW_TOLERANCE_SECS),
            WindowMerge::Ignore
        );
    }

    #[test]
    fn skew_at_exact_tolerance_is_same_window() {
        let current = status(50, 60);
        let incoming = status(90, 65);
        assert_eq!(
            merge_window(Some(&current), &incoming, 5),
            WindowMerge::Ignore
        );
    }

    #[test]
    fn newer_window_is_stored_even_with_higher_remain() {
        // The window rolled over: a fresh budget replaces the drained
        // one despite remain going back up.
        let current = status(3, 60);
        let incoming = status(100, 120);
        assert_eq!(
            merge_window(Some(&current), &incoming, DEFAULT_WINDOW_TOLERANCE_SECS),
            WindowMerge::Store
        );
    }

    #[test]
    fn report_from_older_window_is_ignored() {
        let current = status(100, 120);
        let incoming = status(2, 60);
        assert_eq!(
            merge_window(Some(&current), &incoming, DEFAULT_WINDOW_TOLERANCE_SECS),
            WindowMerge::Ignore
        );
    }

    #[test]
    fn status_serialises_for_shared_cache() {
        let s = status(42, 60);
        let json = serde_json::to_string(&s).unwrap();
        let back: ErrorLimitStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
