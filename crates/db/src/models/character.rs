//! Enrolled character models.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `characters` table: one EVE character enrolled for
/// auditing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Character {
    pub id: DbId,
    /// The character's EVE id, unique across rows.
    pub character_id: EveId,
    pub character_name: String,
    pub corporation_id: Option<EveId>,
    pub alliance_id: Option<EveId>,
    /// Disabled characters are skipped by the scheduler.
    pub is_enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for enrolling a character.
#[derive(Debug, Clone)]
pub struct NewCharacter {
    pub character_id: EveId,
    pub character_name: String,
}
