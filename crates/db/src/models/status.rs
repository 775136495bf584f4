//! Per-section update bookkeeping models.

use pilotwatch_core::freshness::SectionStatusSnapshot;
use pilotwatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `character_update_status` table: the outcome of the
/// most recent update attempt for one (character, section) pair.
///
/// Exactly one row exists per pair; every attempt overwrites it, so
/// the table always describes current freshness, not history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterUpdateStatus {
    pub id: DbId,
    pub character_id: DbId,
    pub section: String,
    pub is_success: bool,
    /// Set on failure, cleared again by the next success.
    pub error_message: Option<String>,
    /// Identifies the engine run that produced this row.
    pub run_id: Option<Uuid>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CharacterUpdateStatus {
    /// The freshness-relevant view of this row.
    pub fn snapshot(&self) -> SectionStatusSnapshot {
        SectionStatusSnapshot {
            is_success: self.is_success,
            finished_at: self.finished_at,
        }
    }
}
