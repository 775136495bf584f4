//! Global market price refresh.
//!
//! Prices are not per character, so they sit outside the section
//! machinery: one table, refreshed on its own coarse cadence. The age
//! guard makes the refresh idempotent across worker restarts.

use std::time::Duration;

use chrono::Utc;
use pilotwatch_core::types::Timestamp;
use pilotwatch_db::models::universe::NewMarketPrice;
use pilotwatch_db::repositories::market_price_repo::MarketPriceRepo;
use pilotwatch_esi::records::EsiMarketPrice;
use pilotwatch_esi::EsiClient;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::error::UpdateError;

/// Rows per INSERT batch. The full price list is around 15k rows.
const PRICE_BATCH_SIZE: usize = 1000;

/// Fetch and store the full price list when the stored copy is older
/// than `max_age`. Returns the number of rows written, zero when the
/// stored copy was still fresh.
pub async fn refresh_if_stale(
    pool: &PgPool,
    esi: &EsiClient,
    max_age: Duration,
) -> Result<u64, UpdateError> {
    let last = MarketPriceRepo::latest_update(pool).await?;
    if is_fresh(last, max_age, Utc::now()) {
        tracing::debug!("Market prices still fresh");
        return Ok(0);
    }

    let prices = esi.market_prices().await?;
    let rows: Vec<NewMarketPrice> = prices.iter().map(map_price).collect();
    let written = MarketPriceRepo::upsert_many(pool, &rows, PRICE_BATCH_SIZE).await?;
    tracing::info!(prices = rows.len(), written, "Stored market prices");
    Ok(written)
}

/// Refresh loop driven by its own ticker. The first tick fires
/// immediately; the age guard decides whether anything is fetched.
pub async fn run_refresh_loop(
    pool: PgPool,
    esi: EsiClient,
    max_age: Duration,
    cancel: CancellationToken,
) {
    // A zero interval would spin the ticker.
    let period = max_age.max(Duration::from_secs(60));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = refresh_if_stale(&pool, &esi, max_age).await {
                    tracing::error!(error = %err, "Market price refresh failed");
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!("Market price refresh stopping");
                return;
            }
        }
    }
}

// ---- mapping ----

fn is_fresh(last_update: Option<Timestamp>, max_age: Duration, now: Timestamp) -> bool {
    let Some(last) = last_update else {
        return false;
    };
    match (now - last).to_std() {
        Ok(age) => age < max_age,
        // A last update in the future means a clock jumped; do not
        // refetch on top of it.
        Err(_) => true,
    }
}

fn map_price(price: &EsiMarketPrice) -> NewMarketPrice {
    NewMarketPrice {
        type_id: price.type_id,
        adjusted_price: price.adjusted_price,
        average_price: price.average_price,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    #[test]
    fn missing_prices_are_stale() {
        assert!(!is_fresh(None, Duration::from_secs(7200), Utc::now()));
    }

    #[test]
    fn recent_prices_are_fresh() {
        let now = Utc::now();
        let last = now - ChronoDuration::minutes(30);
        assert!(is_fresh(Some(last), Duration::from_secs(7200), now));
    }

    #[test]
    fn aged_out_prices_are_stale() {
        let now = Utc::now();
        let last = now - ChronoDuration::hours(3);
        assert!(!is_fresh(Some(last), Duration::from_secs(7200), now));
    }

    #[test]
    fn future_timestamps_read_as_fresh() {
        let now = Utc::now();
        let last = now + ChronoDuration::minutes(5);
        assert!(is_fresh(Some(last), Duration::from_secs(7200), now));
    }

    #[test]
    fn prices_map_with_optional_fields_intact() {
        let mapped = map_price(&EsiMarketPrice {
            type_id: 44_992,
            adjusted_price: Some(2_275_000.0),
            average_price: None,
        });
        assert_eq!(mapped.type_id, 44_992);
        assert_eq!(mapped.adjusted_price, Some(2_275_000.0));
        assert_eq!(mapped.average_price, None);
    }
}
