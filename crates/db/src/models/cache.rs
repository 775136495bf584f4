//! Shared cache models.

use pilotwatch_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `cache_entries` table: a JSON value with an absolute
/// expiry, shared by all workers on the same database. Carries the
/// cross-worker error-limit status among other short-lived state.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CacheEntry {
    pub cache_key: String,
    pub value: serde_json::Value,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
