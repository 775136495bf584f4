//! Repository for the `market_prices` table (global, not per
//! character).

use pilotwatch_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::universe::NewMarketPrice;

/// Column list for INSERT statements.
const INSERT_COLUMNS: &str = "type_id, adjusted_price, average_price";

/// Bind parameters per price row in a multi-row INSERT.
const PARAMS_PER_ROW: u32 = 3;

/// Provides bulk refresh writes for market prices.
pub struct MarketPriceRepo;

impl MarketPriceRepo {
    /// When prices were last written, if ever. Drives the refresh
    /// cadence.
    pub async fn latest_update(pool: &PgPool) -> Result<Option<Timestamp>, sqlx::Error> {
        let row: (Option<Timestamp>,) =
            sqlx::query_as("SELECT MAX(updated_at) FROM market_prices")
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Total number of stored prices.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM market_prices")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// Upsert a full price list in batched multi-row INSERTs.
    pub async fn upsert_many(
        pool: &PgPool,
        prices: &[NewMarketPrice],
        batch_size: usize,
    ) -> Result<u64, sqlx::Error> {
        if prices.is_empty() {
            return Ok(0);
        }

        let mut tx = pool.begin().await?;
        let mut written = 0u64;
        for chunk in prices.chunks(batch_size.max(1)) {
            // Build a multi-row VALUES clause.
            let mut query = format!("INSERT INTO market_prices ({INSERT_COLUMNS}) VALUES ");
            let mut param_idx = 1u32;
            for (i, _) in chunk.iter().enumerate() {
                if i > 0 {
                    query.push_str(", ");
                }
                query.push('(');
                for j in 0..PARAMS_PER_ROW {
                    if j > 0 {
                        query.push_str(", ");
                    }
                    query.push('$');
                    query.push_str(&param_idx.to_string());
                    param_idx += 1;
                }
                query.push(')');
            }
            query.push_str(
                " ON CONFLICT (type_id) DO UPDATE \
                 SET adjusted_price = EXCLUDED.adjusted_price, \
                     average_price = EXCLUDED.average_price",
            );

            let mut q = sqlx::query(&query);
            for price in chunk {
                q = q
                    .bind(price.type_id)
                    .bind(price.adjusted_price)
                    .bind(price.average_price);
            }
            written += q.execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }
}
