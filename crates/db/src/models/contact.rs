//! Contact list models.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `character_contact_labels` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterContactLabel {
    pub id: DbId,
    pub character_id: DbId,
    pub label_id: EveId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one contact label.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContactLabel {
    pub label_id: EveId,
    pub name: String,
}

impl CharacterContactLabel {
    /// The diffable view of this row, for merge planning.
    pub fn as_new(&self) -> NewContactLabel {
        NewContactLabel {
            label_id: self.label_id,
            name: self.name.clone(),
        }
    }
}

/// A row from the `character_contacts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterContact {
    pub id: DbId,
    pub character_id: DbId,
    pub contact_id: EveId,
    /// `character`, `corporation`, `alliance` or `faction`.
    pub contact_type: String,
    pub standing: f64,
    pub is_blocked: Option<bool>,
    pub is_watched: Option<bool>,
    /// Label ids attached to this contact, as a JSON array.
    pub label_ids: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CharacterContact {
    /// The diffable view of this row, for merge planning.
    pub fn as_new(&self) -> NewContact {
        NewContact {
            contact_id: self.contact_id,
            contact_type: self.contact_type.clone(),
            standing: self.standing,
            is_blocked: self.is_blocked,
            is_watched: self.is_watched,
            label_ids: self.label_ids.clone(),
        }
    }
}

/// DTO for one contact.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub contact_id: EveId,
    pub contact_type: String,
    pub standing: f64,
    pub is_blocked: Option<bool>,
    pub is_watched: Option<bool>,
    pub label_ids: serde_json::Value,
}
