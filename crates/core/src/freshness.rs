//! Staleness decisions for per-section update scheduling.
//!
//! Pure predicate over the last recorded update attempt; the engine
//! supplies the snapshot from `character_update_status` and the
//! section's configured threshold.

use chrono::Duration;

use crate::types::Timestamp;

/// The last recorded outcome for one `(character, section)` pair.
#[derive(Debug, Clone)]
pub struct SectionStatusSnapshot {
    pub is_success: bool,
    /// When the last attempt finished. `None` for attempts that never
    /// completed (e.g. a crash between start and finish).
    pub finished_at: Option<Timestamp>,
}

/// Decide whether a section is due for a refresh.
///
/// A section is stale when:
/// - no update has ever been recorded, or
/// - the last attempt failed (errors never self-heal by waiting), or
/// - the last success finished more than `stale_after` ago.
///
/// `force` short-circuits all of the above to "due now".
pub fn is_section_stale(
    status: Option<&SectionStatusSnapshot>,
    stale_after: Duration,
    now: Timestamp,
    force: bool,
) -> bool {
    if force {
        return true;
    }
    let status = match status {
        Some(status) => status,
        None => return true,
    };
    if !status.is_success {
        return true;
    }
    match status.finished_at {
        Some(finished_at) => now - finished_at > stale_after,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn ok_finished(minutes_ago: i64) -> SectionStatusSnapshot {
        SectionStatusSnapshot {
            is_success: true,
            finished_at: Some(Utc::now() - Duration::minutes(minutes_ago)),
        }
    }

    #[test]
    fn missing_status_is_stale() {
        assert!(is_section_stale(None, Duration::hours(1), Utc::now(), false));
    }

    #[test]
    fn recent_success_is_fresh() {
        // Finished 1 minute ago against a 24-hour threshold.
        let status = ok_finished(1);
        assert!(!is_section_stale(
            Some(&status),
            Duration::hours(24),
            Utc::now(),
            false
        ));
    }

    #[test]
    fn old_success_is_stale() {
        let status = ok_finished(90);
        assert!(is_section_stale(
            Some(&status),
            Duration::minutes(60),
            Utc::now(),
            false
        ));
    }

    #[test]
    fn failure_is_stale_regardless_of_recency() {
        let status = SectionStatusSnapshot {
            is_success: false,
            finished_at: Some(Utc::now()),
        };
        assert!(is_section_stale(
            Some(&status),
            Duration::hours(24),
            Utc::now(),
            false
        ));
    }

    #[test]
    fn success_without_finish_time_is_stale() {
        let status = SectionStatusSnapshot {
            is_success: true,
            finished_at: None,
        };
        assert!(is_section_stale(
            Some(&status),
            Duration::hours(1),
            Utc::now(),
            false
        ));
    }

    #[test]
    fn force_overrides_fresh_status() {
        let status = ok_finished(1);
        assert!(is_section_stale(
            Some(&status),
            Duration::hours(24),
            Utc::now(),
            true
        ));
    }

    #[test]
    fn exactly_at_threshold_is_not_stale() {
        let now = Utc::now();
        let status = SectionStatusSnapshot {
            is_success: true,
            finished_at: Some(now - Duration::minutes(60)),
        };
        assert!(!is_section_stale(
            Some(&status),
            Duration::minutes(60),
            now,
            false
        ));
    }
}
