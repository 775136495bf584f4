//! Periodic cleanup of expired cache entries.
//!
//! The `cache_entries` table backs the shared error-limit state; rows
//! carry an absolute expiry but nothing removes them on the read path.
//! This loop drops dead rows so the table stays small.

use std::time::Duration;

use pilotwatch_db::repositories::CacheRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the cache purge loop until cancelled.
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("Cache purge job stopping");
                break;
            }
            _ = interval.tick() => {
                match CacheRepo::purge_expired(&pool).await {
                    Ok(0) => tracing::debug!("No expired cache entries"),
                    Ok(purged) => tracing::info!(purged, "Purged expired cache entries"),
                    Err(err) => tracing::error!(error = %err, "Cache purge failed"),
                }
            }
        }
    }
}
