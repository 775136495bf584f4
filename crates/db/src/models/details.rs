//! Character sheet and employment history models.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `character_details` table. One row per character,
/// overwritten on every details refresh.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterDetails {
    pub id: DbId,
    pub character_id: DbId,
    pub birthday: Timestamp,
    pub corporation_id: EveId,
    pub alliance_id: Option<EveId>,
    pub faction_id: Option<EveId>,
    pub race_id: EveId,
    pub bloodline_id: EveId,
    pub gender: String,
    pub description: String,
    pub security_status: Option<f64>,
    pub title: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CharacterDetails {
    /// The diffable view of this row, for merge planning.
    pub fn as_new(&self) -> NewCharacterDetails {
        NewCharacterDetails {
            birthday: self.birthday,
            corporation_id: self.corporation_id,
            alliance_id: self.alliance_id,
            faction_id: self.faction_id,
            race_id: self.race_id,
            bloodline_id: self.bloodline_id,
            gender: self.gender.clone(),
            description: self.description.clone(),
            security_status: self.security_status,
            title: self.title.clone(),
        }
    }
}

/// DTO for upserting the character sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCharacterDetails {
    pub birthday: Timestamp,
    pub corporation_id: EveId,
    pub alliance_id: Option<EveId>,
    pub faction_id: Option<EveId>,
    pub race_id: EveId,
    pub bloodline_id: EveId,
    pub gender: String,
    pub description: String,
    pub security_status: Option<f64>,
    pub title: Option<String>,
}

/// A row from the `character_corporation_history` table.
///
/// `record_id` is ESI's natural key for one employment stint. History
/// rows are upserted and never deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CorporationHistoryEntry {
    pub id: DbId,
    pub character_id: DbId,
    pub record_id: EveId,
    pub corporation_id: EveId,
    pub is_deleted: bool,
    pub start_date: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one employment stint.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCorporationHistoryEntry {
    pub record_id: EveId,
    pub corporation_id: EveId,
    pub is_deleted: bool,
    pub start_date: Timestamp,
}

impl CorporationHistoryEntry {
    /// The diffable view of this row, for merge planning.
    pub fn as_new(&self) -> NewCorporationHistoryEntry {
        NewCorporationHistoryEntry {
            record_id: self.record_id,
            corporation_id: self.corporation_id,
            is_deleted: self.is_deleted,
            start_date: self.start_date,
        }
    }
}
