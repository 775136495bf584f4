//! Repository for the `character_clone_info`, `character_jump_clones`
//! and `character_implants` tables.

use pilotwatch_core::types::{DbId, EveId};
use sqlx::PgPool;

use crate::models::clones::{
    CharacterCloneInfo, CharacterImplant, CharacterJumpClone, NewCloneInfo, NewJumpClone,
};

/// Column list for `character_clone_info` queries.
const INFO_COLUMNS: &str = "id, character_id, home_location_id, last_clone_jump_date, \
    last_station_change_date, created_at, updated_at";

/// Column list for `character_jump_clones` queries.
const CLONE_COLUMNS: &str = "id, character_id, jump_clone_id, location_id, name, \
    implant_type_ids, created_at, updated_at";

/// Column list for `character_implants` queries.
const IMPLANT_COLUMNS: &str = "id, character_id, implant_type_id, created_at, updated_at";

/// Provides clone bay and implant writes.
pub struct ClonesRepo;

impl ClonesRepo {
    /// Upsert the clone info row. One row per character.
    pub async fn upsert_clone_info(
        pool: &PgPool,
        character_id: DbId,
        input: &NewCloneInfo,
    ) -> Result<CharacterCloneInfo, sqlx::Error> {
        let query = format!(
            "INSERT INTO character_clone_info
                (character_id, home_location_id, last_clone_jump_date,
                 last_station_change_date)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (character_id) DO UPDATE
                 SET home_location_id = EXCLUDED.home_location_id,
                     last_clone_jump_date = EXCLUDED.last_clone_jump_date,
                     last_station_change_date = EXCLUDED.last_station_change_date
             RETURNING {INFO_COLUMNS}"
        );
        sqlx::query_as::<_, CharacterCloneInfo>(&query)
            .bind(character_id)
            .bind(input.home_location_id)
            .bind(input.last_clone_jump_date)
            .bind(input.last_station_change_date)
            .fetch_one(pool)
            .await
    }

    /// Load all stored jump clones for a character.
    pub async fn list_jump_clones(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterJumpClone>, sqlx::Error> {
        let query = format!(
            "SELECT {CLONE_COLUMNS} FROM character_jump_clones \
             WHERE character_id = $1 ORDER BY jump_clone_id"
        );
        sqlx::query_as::<_, CharacterJumpClone>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Replace the jump clone set wholesale in one transaction.
    pub async fn replace_jump_clones(
        pool: &PgPool,
        character_id: DbId,
        clones: &[NewJumpClone],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM character_jump_clones WHERE character_id = $1")
            .bind(character_id)
            .execute(&mut *tx)
            .await?;
        for clone in clones {
            sqlx::query(
                "INSERT INTO character_jump_clones
                    (character_id, jump_clone_id, location_id, name, implant_type_ids)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(character_id)
            .bind(clone.jump_clone_id)
            .bind(clone.location_id)
            .bind(&clone.name)
            .bind(&clone.implant_type_ids)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Load the active clone's implants.
    pub async fn list_implants(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterImplant>, sqlx::Error> {
        let query = format!(
            "SELECT {IMPLANT_COLUMNS} FROM character_implants \
             WHERE character_id = $1 ORDER BY implant_type_id"
        );
        sqlx::query_as::<_, CharacterImplant>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Replace the active clone's implants wholesale.
    pub async fn replace_implants(
        pool: &PgPool,
        character_id: DbId,
        implant_type_ids: &[EveId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM character_implants WHERE character_id = $1")
            .bind(character_id)
            .execute(&mut *tx)
            .await?;
        for type_id in implant_type_ids {
            sqlx::query(
                "INSERT INTO character_implants (character_id, implant_type_id)
                 VALUES ($1, $2)",
            )
            .bind(character_id)
            .bind(type_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
