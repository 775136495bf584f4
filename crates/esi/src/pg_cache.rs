//! Postgres-backed [`SharedCache`] implementation.
//!
//! Workers pointed at the same database see the same error-limit
//! window through the `cache_entries` table.

use async_trait::async_trait;
use pilotwatch_db::repositories::CacheRepo;
use sqlx::PgPool;

use crate::limiter::{CacheError, SharedCache};

pub struct PgCache {
    pool: PgPool,
}

impl PgCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SharedCache for PgCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let entry = CacheRepo::get_valid(&self.pool, key)
            .await
            .map_err(|e| CacheError(e.to_string()))?;
        Ok(entry.map(|e| e.value))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl_seconds: i64,
    ) -> Result<(), CacheError> {
        CacheRepo::put(&self.pool, key, &value, ttl_seconds)
            .await
            .map_err(|e| CacheError(e.to_string()))
    }
}
