//! Repository for the `character_loyalty` table.

use pilotwatch_core::types::{DbId, EveId};
use sqlx::PgPool;

use crate::models::loyalty::{CharacterLoyaltyEntry, NewLoyaltyEntry};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, character_id, corporation_id, loyalty_points, created_at, updated_at";

/// Provides diffed writes for loyalty point balances.
pub struct LoyaltyRepo;

impl LoyaltyRepo {
    /// Load all stored loyalty balances for a character.
    pub async fn list_for_character(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterLoyaltyEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM character_loyalty \
             WHERE character_id = $1 ORDER BY corporation_id"
        );
        sqlx::query_as::<_, CharacterLoyaltyEntry>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Apply a loyalty diff: upsert `upserts`, delete `obsolete`. A
    /// balance spent down to zero disappears from the remote view and
    /// is removed here too.
    pub async fn apply(
        pool: &PgPool,
        character_id: DbId,
        upserts: &[NewLoyaltyEntry],
        obsolete: &[EveId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for entry in upserts {
            sqlx::query(
                "INSERT INTO character_loyalty (character_id, corporation_id, loyalty_points)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (character_id, corporation_id) DO UPDATE
                     SET loyalty_points = EXCLUDED.loyalty_points",
            )
            .bind(character_id)
            .bind(entry.corporation_id)
            .bind(entry.loyalty_points)
            .execute(&mut *tx)
            .await?;
        }
        if !obsolete.is_empty() {
            sqlx::query(
                "DELETE FROM character_loyalty \
                 WHERE character_id = $1 AND corporation_id = ANY($2)",
            )
            .bind(character_id)
            .bind(obsolete)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
