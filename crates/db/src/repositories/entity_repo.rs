//! Repository for the `eve_entities` table.

use pilotwatch_core::types::EveId;
use sqlx::PgPool;

use crate::models::universe::{EveEntity, NewEveEntity};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, category, created_at, updated_at";

/// Provides bulk id/name resolution storage. Rows are keyed by the EVE
/// entity id itself and shared across all characters.
pub struct EveEntityRepo;

impl EveEntityRepo {
    /// Which of the given ids are already resolved. The resolver only
    /// asks the remote API about the remainder.
    pub async fn existing_ids(pool: &PgPool, ids: &[EveId]) -> Result<Vec<EveId>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<(EveId,)> =
            sqlx::query_as("SELECT id FROM eve_entities WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Load entities by id.
    pub async fn list_by_ids(pool: &PgPool, ids: &[EveId]) -> Result<Vec<EveEntity>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("SELECT {COLUMNS} FROM eve_entities WHERE id = ANY($1)");
        sqlx::query_as::<_, EveEntity>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Upsert resolved entities in one transaction.
    pub async fn upsert_many(pool: &PgPool, entities: &[NewEveEntity]) -> Result<(), sqlx::Error> {
        if entities.is_empty() {
            return Ok(());
        }
        let mut tx = pool.begin().await?;
        for entity in entities {
            sqlx::query(
                "INSERT INTO eve_entities (id, name, category)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (id) DO UPDATE
                     SET name = EXCLUDED.name,
                         category = EXCLUDED.category",
            )
            .bind(entity.id)
            .bind(&entity.name)
            .bind(&entity.category)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
