//! Mail models: labels, mailing lists, headers and bodies.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `character_mail_labels` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterMailLabel {
    pub id: DbId,
    pub character_id: DbId,
    pub label_id: EveId,
    pub name: String,
    pub color: Option<String>,
    pub unread_count: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one mail label.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMailLabel {
    pub label_id: EveId,
    pub name: String,
    pub color: Option<String>,
    pub unread_count: Option<i32>,
}

impl CharacterMailLabel {
    /// The diffable view of this row, for merge planning.
    pub fn as_new(&self) -> NewMailLabel {
        NewMailLabel {
            label_id: self.label_id,
            name: self.name.clone(),
            color: self.color.clone(),
            unread_count: self.unread_count,
        }
    }
}

/// A row from the `character_mailing_lists` table. Lists a character
/// has left stay on record, so rows are upserted and never deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterMailingList {
    pub id: DbId,
    pub character_id: DbId,
    pub list_id: EveId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one mailing list membership.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMailingList {
    pub list_id: EveId,
    pub name: String,
}

impl CharacterMailingList {
    /// The diffable view of this row, for merge planning.
    pub fn as_new(&self) -> NewMailingList {
        NewMailingList {
            list_id: self.list_id,
            name: self.name.clone(),
        }
    }
}

/// A row from the `character_mails` table.
///
/// Headers arrive first; `body` stays `NULL` until the per-mail body
/// fetch fills it in.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterMail {
    pub id: DbId,
    pub character_id: DbId,
    pub mail_id: EveId,
    pub from_id: EveId,
    pub is_read: Option<bool>,
    pub subject: String,
    pub timestamp: Timestamp,
    /// Label ids as a JSON array, mirrored from the header.
    pub label_ids: serde_json::Value,
    /// Recipients as a JSON array of `{recipient_id, recipient_type}`.
    pub recipients: serde_json::Value,
    pub body: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one mail header.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMailHeader {
    pub mail_id: EveId,
    pub from_id: EveId,
    pub is_read: Option<bool>,
    pub subject: String,
    pub timestamp: Timestamp,
    pub label_ids: serde_json::Value,
    pub recipients: serde_json::Value,
}

impl CharacterMail {
    /// The diffable view of this row's header fields. The body is
    /// managed separately and never participates in header diffs.
    pub fn as_new(&self) -> NewMailHeader {
        NewMailHeader {
            mail_id: self.mail_id,
            from_id: self.from_id,
            is_read: self.is_read,
            subject: self.subject.clone(),
            timestamp: self.timestamp,
            label_ids: self.label_ids.clone(),
            recipients: self.recipients.clone(),
        }
    }
}

/// A row from the `character_mail_unread` table: the total unread
/// count reported alongside the label fetch. One row per character.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterMailUnread {
    pub id: DbId,
    pub character_id: DbId,
    pub total: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
