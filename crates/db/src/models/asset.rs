//! Character asset models.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `character_assets` table: one placed node of the
/// reconstructed containment forest.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterAsset {
    pub id: DbId,
    pub character_id: DbId,
    pub item_id: EveId,
    /// Containing asset's `item_id`, `NULL` for root-adjacent items.
    pub parent_item_id: Option<EveId>,
    /// Top-level location (station / solar system / structure) the
    /// item ultimately sits in.
    pub location_id: EveId,
    pub location_kind: String,
    pub location_flag: String,
    pub name: String,
    pub quantity: i32,
    pub type_id: EveId,
    pub is_blueprint_copy: bool,
    pub is_singleton: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one asset row of a snapshot replacement.
#[derive(Debug, Clone)]
pub struct NewCharacterAsset {
    pub item_id: EveId,
    pub parent_item_id: Option<EveId>,
    pub location_id: EveId,
    pub location_kind: String,
    pub location_flag: String,
    pub name: String,
    pub quantity: i32,
    pub type_id: EveId,
    pub is_blueprint_copy: bool,
    pub is_singleton: bool,
}
