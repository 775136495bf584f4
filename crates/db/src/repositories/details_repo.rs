//! Repository for the `character_details` and
//! `character_corporation_history` tables.

use pilotwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::details::{
    CharacterDetails, CorporationHistoryEntry, NewCharacterDetails, NewCorporationHistoryEntry,
};

/// Column list for `character_details` queries.
const DETAIL_COLUMNS: &str = "id, character_id, birthday, corporation_id, alliance_id, \
    faction_id, race_id, bloodline_id, gender, description, security_status, title, \
    created_at, updated_at";

/// Column list for `character_corporation_history` queries.
const HISTORY_COLUMNS: &str = "id, character_id, record_id, corporation_id, is_deleted, \
    start_date, created_at, updated_at";

/// Provides single-row character-sheet and employment-history writes.
pub struct DetailsRepo;

impl DetailsRepo {
    /// Load the stored character sheet, if any.
    pub async fn find_details(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Option<CharacterDetails>, sqlx::Error> {
        let query = format!(
            "SELECT {DETAIL_COLUMNS} FROM character_details WHERE character_id = $1"
        );
        sqlx::query_as::<_, CharacterDetails>(&query)
            .bind(character_id)
            .fetch_optional(pool)
            .await
    }

    /// Upsert the character sheet. One row per character.
    pub async fn upsert_details(
        pool: &PgPool,
        character_id: DbId,
        input: &NewCharacterDetails,
    ) -> Result<CharacterDetails, sqlx::Error> {
        let query = format!(
            "INSERT INTO character_details
                (character_id, birthday, corporation_id, alliance_id, faction_id,
                 race_id, bloodline_id, gender, description, security_status, title)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (character_id) DO UPDATE
                 SET birthday = EXCLUDED.birthday,
                     corporation_id = EXCLUDED.corporation_id,
                     alliance_id = EXCLUDED.alliance_id,
                     faction_id = EXCLUDED.faction_id,
                     race_id = EXCLUDED.race_id,
                     bloodline_id = EXCLUDED.bloodline_id,
                     gender = EXCLUDED.gender,
                     description = EXCLUDED.description,
                     security_status = EXCLUDED.security_status,
                     title = EXCLUDED.title
             RETURNING {DETAIL_COLUMNS}"
        );
        sqlx::query_as::<_, CharacterDetails>(&query)
            .bind(character_id)
            .bind(input.birthday)
            .bind(input.corporation_id)
            .bind(input.alliance_id)
            .bind(input.faction_id)
            .bind(input.race_id)
            .bind(input.bloodline_id)
            .bind(&input.gender)
            .bind(&input.description)
            .bind(input.security_status)
            .bind(&input.title)
            .fetch_one(pool)
            .await
    }

    /// Load all stored employment stints for a character, keyed by
    /// ESI's record id.
    pub async fn list_history(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CorporationHistoryEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {HISTORY_COLUMNS} FROM character_corporation_history \
             WHERE character_id = $1 ORDER BY start_date"
        );
        sqlx::query_as::<_, CorporationHistoryEntry>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Upsert employment stints. History rows are never deleted: a
    /// stint absent from the remote view stays on record.
    pub async fn upsert_history(
        pool: &PgPool,
        character_id: DbId,
        entries: &[NewCorporationHistoryEntry],
    ) -> Result<(), sqlx::Error> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut tx = pool.begin().await?;
        for entry in entries {
            sqlx::query(
                "INSERT INTO character_corporation_history
                    (character_id, record_id, corporation_id, is_deleted, start_date)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (character_id, record_id) DO UPDATE
                     SET corporation_id = EXCLUDED.corporation_id,
                         is_deleted = EXCLUDED.is_deleted,
                         start_date = EXCLUDED.start_date",
            )
            .bind(character_id)
            .bind(entry.record_id)
            .bind(entry.corporation_id)
            .bind(entry.is_deleted)
            .bind(entry.start_date)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

}
