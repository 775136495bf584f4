//! Repository for the `character_location` and
//! `character_online_status` tables.

use pilotwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::presence::{
    CharacterLocation, CharacterOnlineStatus, NewCharacterLocation, NewOnlineStatus,
};

/// Column list for `character_location` queries.
const LOCATION_COLUMNS: &str =
    "id, character_id, solar_system_id, location_id, created_at, updated_at";

/// Column list for `character_online_status` queries.
const ONLINE_COLUMNS: &str = "id, character_id, is_online, last_login, last_logout, \
    logins, created_at, updated_at";

/// Provides single-row presence writes (location and online status).
pub struct PresenceRepo;

impl PresenceRepo {
    /// Load the stored location, if any.
    pub async fn find_location(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Option<CharacterLocation>, sqlx::Error> {
        let query = format!(
            "SELECT {LOCATION_COLUMNS} FROM character_location WHERE character_id = $1"
        );
        sqlx::query_as::<_, CharacterLocation>(&query)
            .bind(character_id)
            .fetch_optional(pool)
            .await
    }

    /// Upsert the location row. One row per character.
    pub async fn upsert_location(
        pool: &PgPool,
        character_id: DbId,
        input: &NewCharacterLocation,
    ) -> Result<CharacterLocation, sqlx::Error> {
        let query = format!(
            "INSERT INTO character_location (character_id, solar_system_id, location_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (character_id) DO UPDATE
                 SET solar_system_id = EXCLUDED.solar_system_id,
                     location_id = EXCLUDED.location_id
             RETURNING {LOCATION_COLUMNS}"
        );
        sqlx::query_as::<_, CharacterLocation>(&query)
            .bind(character_id)
            .bind(input.solar_system_id)
            .bind(input.location_id)
            .fetch_one(pool)
            .await
    }

    /// Load the stored online status, if any.
    pub async fn find_online_status(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Option<CharacterOnlineStatus>, sqlx::Error> {
        let query = format!(
            "SELECT {ONLINE_COLUMNS} FROM character_online_status WHERE character_id = $1"
        );
        sqlx::query_as::<_, CharacterOnlineStatus>(&query)
            .bind(character_id)
            .fetch_optional(pool)
            .await
    }

    /// Upsert the online-status row. One row per character.
    pub async fn upsert_online_status(
        pool: &PgPool,
        character_id: DbId,
        input: &NewOnlineStatus,
    ) -> Result<CharacterOnlineStatus, sqlx::Error> {
        let query = format!(
            "INSERT INTO character_online_status
                (character_id, is_online, last_login, last_logout, logins)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (character_id) DO UPDATE
                 SET is_online = EXCLUDED.is_online,
                     last_login = EXCLUDED.last_login,
                     last_logout = EXCLUDED.last_logout,
                     logins = EXCLUDED.logins
             RETURNING {ONLINE_COLUMNS}"
        );
        sqlx::query_as::<_, CharacterOnlineStatus>(&query)
            .bind(character_id)
            .bind(input.is_online)
            .bind(input.last_login)
            .bind(input.last_logout)
            .bind(input.logins)
            .fetch_one(pool)
            .await
    }
}
