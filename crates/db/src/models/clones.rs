//! Clone bay models: clone info, jump clones and active implants.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `character_clone_info` table. One row per character
/// with the home station and clone-jump bookkeeping.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterCloneInfo {
    pub id: DbId,
    pub character_id: DbId,
    pub home_location_id: Option<EveId>,
    pub last_clone_jump_date: Option<Timestamp>,
    pub last_station_change_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for the clone info row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCloneInfo {
    pub home_location_id: Option<EveId>,
    pub last_clone_jump_date: Option<Timestamp>,
    pub last_station_change_date: Option<Timestamp>,
}

/// A row from the `character_jump_clones` table. Replaced wholesale on
/// every refresh.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterJumpClone {
    pub id: DbId,
    pub character_id: DbId,
    pub jump_clone_id: EveId,
    pub location_id: EveId,
    pub name: String,
    /// Implant type ids installed in this clone, as a JSON array.
    pub implant_type_ids: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one jump clone.
#[derive(Debug, Clone)]
pub struct NewJumpClone {
    pub jump_clone_id: EveId,
    pub location_id: EveId,
    pub name: String,
    pub implant_type_ids: serde_json::Value,
}

/// A row from the `character_implants` table: one implant plugged into
/// the active clone. Replaced wholesale on every refresh.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterImplant {
    pub id: DbId,
    pub character_id: DbId,
    pub implant_type_id: EveId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
