//! Repository for the `cache_entries` table.
//!
//! A tiny JSON key/value store with absolute expiry, shared by every
//! worker pointed at the same database. The error-limit tracker keeps
//! its cross-worker status here.

use sqlx::PgPool;

use crate::models::cache::CacheEntry;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "cache_key, value, expires_at, created_at, updated_at";

/// Provides expiring key/value storage.
pub struct CacheRepo;

impl CacheRepo {
    /// Load an entry if it exists and has not expired.
    pub async fn get_valid(pool: &PgPool, key: &str) -> Result<Option<CacheEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM cache_entries WHERE cache_key = $1 AND expires_at > NOW()"
        );
        sqlx::query_as::<_, CacheEntry>(&query)
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Store a value with a relative TTL, overwriting any previous
    /// entry under the key.
    pub async fn put(
        pool: &PgPool,
        key: &str,
        value: &serde_json::Value,
        ttl_seconds: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO cache_entries (cache_key, value, expires_at)
             VALUES ($1, $2, NOW() + make_interval(secs => $3::double precision))
             ON CONFLICT (cache_key) DO UPDATE
                 SET value = EXCLUDED.value,
                     expires_at = EXCLUDED.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(ttl_seconds)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Drop all expired entries. Returns the number of rows removed.
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
