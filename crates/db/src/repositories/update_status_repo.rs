//! Repository for the `character_update_status` table.

use pilotwatch_core::section::Section;
use pilotwatch_core::types::{DbId, Timestamp};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::status::CharacterUpdateStatus;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, character_id, section, is_success, error_message, run_id, \
    started_at, finished_at, created_at, updated_at";

/// Provides freshness bookkeeping for (character, section) pairs.
pub struct UpdateStatusRepo;

impl UpdateStatusRepo {
    /// Load all section statuses for one character, keyed lookup left
    /// to the caller.
    pub async fn list_for_character(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterUpdateStatus>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM character_update_status WHERE character_id = $1"
        );
        sqlx::query_as::<_, CharacterUpdateStatus>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Load the status row for one (character, section) pair.
    pub async fn find(
        pool: &PgPool,
        character_id: DbId,
        section: Section,
    ) -> Result<Option<CharacterUpdateStatus>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM character_update_status \
             WHERE character_id = $1 AND section = $2"
        );
        sqlx::query_as::<_, CharacterUpdateStatus>(&query)
            .bind(character_id)
            .bind(section.tag())
            .fetch_optional(pool)
            .await
    }

    /// Mark a section attempt as started. Creates the row on first
    /// contact; `started_at` moves, `finished_at` and the outcome stay
    /// from the previous attempt until this one finishes.
    pub async fn record_started(
        pool: &PgPool,
        character_id: DbId,
        section: Section,
        run_id: Uuid,
        started_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO character_update_status
                (character_id, section, is_success, run_id, started_at)
             VALUES ($1, $2, false, $3, $4)
             ON CONFLICT (character_id, section) DO UPDATE
                 SET run_id = EXCLUDED.run_id,
                     started_at = EXCLUDED.started_at",
        )
        .bind(character_id)
        .bind(section.tag())
        .bind(run_id)
        .bind(started_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a successful section update and clear any stored error.
    pub async fn record_success(
        pool: &PgPool,
        character_id: DbId,
        section: Section,
        run_id: Uuid,
        finished_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO character_update_status
                (character_id, section, is_success, error_message, run_id, finished_at)
             VALUES ($1, $2, true, NULL, $3, $4)
             ON CONFLICT (character_id, section) DO UPDATE
                 SET is_success = true,
                     error_message = NULL,
                     run_id = EXCLUDED.run_id,
                     finished_at = EXCLUDED.finished_at",
        )
        .bind(character_id)
        .bind(section.tag())
        .bind(run_id)
        .bind(finished_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed section update with its error message.
    pub async fn record_failure(
        pool: &PgPool,
        character_id: DbId,
        section: Section,
        run_id: Uuid,
        finished_at: Timestamp,
        error_message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO character_update_status
                (character_id, section, is_success, error_message, run_id, finished_at)
             VALUES ($1, $2, false, $3, $4, $5)
             ON CONFLICT (character_id, section) DO UPDATE
                 SET is_success = false,
                     error_message = EXCLUDED.error_message,
                     run_id = EXCLUDED.run_id,
                     finished_at = EXCLUDED.finished_at",
        )
        .bind(character_id)
        .bind(section.tag())
        .bind(error_message)
        .bind(run_id)
        .bind(finished_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Whether every tracked section of a character currently reports
    /// success. Sections never attempted are ignored.
    pub async fn all_sections_ok(pool: &PgPool, character_id: DbId) -> Result<bool, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM character_update_status \
             WHERE character_id = $1 AND is_success = false",
        )
        .bind(character_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0 == 0)
    }

    /// Drop all status rows for a character, forcing every section
    /// stale on the next scheduler pass.
    pub async fn reset_for_character(pool: &PgPool, character_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM character_update_status WHERE character_id = $1")
            .bind(character_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
