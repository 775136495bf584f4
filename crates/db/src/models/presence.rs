//! Presence models: where a character is and whether they are online.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `character_location` table. One row per character.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterLocation {
    pub id: DbId,
    pub character_id: DbId,
    pub solar_system_id: EveId,
    /// Station or structure id when docked, `NULL` in space.
    pub location_id: Option<EveId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for the location row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCharacterLocation {
    pub solar_system_id: EveId,
    pub location_id: Option<EveId>,
}

/// A row from the `character_online_status` table. One row per
/// character.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterOnlineStatus {
    pub id: DbId,
    pub character_id: DbId,
    pub is_online: bool,
    pub last_login: Option<Timestamp>,
    pub last_logout: Option<Timestamp>,
    /// Total number of logins over the character's lifetime.
    pub logins: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for the online-status row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOnlineStatus {
    pub is_online: bool,
    pub last_login: Option<Timestamp>,
    pub last_logout: Option<Timestamp>,
    pub logins: Option<i32>,
}
