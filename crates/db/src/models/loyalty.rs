//! Loyalty point models.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `character_loyalty` table: loyalty points held with
/// one NPC corporation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterLoyaltyEntry {
    pub id: DbId,
    pub character_id: DbId,
    pub corporation_id: EveId,
    pub loyalty_points: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one loyalty balance.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoyaltyEntry {
    pub corporation_id: EveId,
    pub loyalty_points: i64,
}

impl CharacterLoyaltyEntry {
    /// The diffable view of this row, for merge planning.
    pub fn as_new(&self) -> NewLoyaltyEntry {
        NewLoyaltyEntry {
            corporation_id: self.corporation_id,
            loyalty_points: self.loyalty_points,
        }
    }
}
