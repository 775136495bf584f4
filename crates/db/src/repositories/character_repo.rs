//! Repository for the `characters` table.

use pilotwatch_core::types::{DbId, EveId};
use sqlx::PgPool;

use crate::models::character::{Character, NewCharacter};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, character_id, character_name, corporation_id, alliance_id, \
    is_enabled, created_at, updated_at";

/// Provides CRUD operations for enrolled characters.
pub struct CharacterRepo;

impl CharacterRepo {
    /// Enroll a character. Re-enrolling an existing character id
    /// refreshes the name and re-enables the row.
    pub async fn create(pool: &PgPool, input: &NewCharacter) -> Result<Character, sqlx::Error> {
        let query = format!(
            "INSERT INTO characters (character_id, character_name)
             VALUES ($1, $2)
             ON CONFLICT (character_id) DO UPDATE
                 SET character_name = EXCLUDED.character_name,
                     is_enabled = true
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(input.character_id)
            .bind(&input.character_name)
            .fetch_one(pool)
            .await
    }

    /// Find a character by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Character>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM characters WHERE id = $1");
        sqlx::query_as::<_, Character>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a character by its EVE character id.
    pub async fn find_by_character_id(
        pool: &PgPool,
        character_id: EveId,
    ) -> Result<Option<Character>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM characters WHERE character_id = $1");
        sqlx::query_as::<_, Character>(&query)
            .bind(character_id)
            .fetch_optional(pool)
            .await
    }

    /// List all enabled characters, oldest enrollment first. This is
    /// the scheduler's candidate set.
    pub async fn list_enabled(pool: &PgPool) -> Result<Vec<Character>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM characters WHERE is_enabled = true ORDER BY id");
        sqlx::query_as::<_, Character>(&query).fetch_all(pool).await
    }

    /// Store the corporation and alliance observed during a details
    /// refresh on the character row itself.
    pub async fn set_affiliation(
        pool: &PgPool,
        id: DbId,
        corporation_id: EveId,
        alliance_id: Option<EveId>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE characters SET corporation_id = $2, alliance_id = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(corporation_id)
        .bind(alliance_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Enable or disable a character. Returns `true` if a row changed.
    pub async fn set_enabled(pool: &PgPool, id: DbId, enabled: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE characters SET is_enabled = $2 WHERE id = $1")
            .bind(id)
            .bind(enabled)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permanently remove a character and all dependent section data
    /// (cascades). Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM characters WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
