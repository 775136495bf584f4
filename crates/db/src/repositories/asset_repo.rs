//! Repository for the `character_assets` table.

use pilotwatch_core::types::{DbId, EveId};
use sqlx::PgPool;

use crate::models::asset::{CharacterAsset, NewCharacterAsset};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, character_id, item_id, parent_item_id, location_id, \
    location_kind, location_flag, name, quantity, type_id, is_blueprint_copy, \
    is_singleton, created_at, updated_at";

/// Column list for INSERT statements (excludes auto-generated columns).
const INSERT_COLUMNS: &str = "character_id, item_id, parent_item_id, location_id, \
    location_kind, location_flag, name, quantity, type_id, is_blueprint_copy, \
    is_singleton";

/// Bind parameters per asset row in a multi-row INSERT.
const PARAMS_PER_ROW: u32 = 11;

/// Provides snapshot-replacement writes for character assets.
pub struct AssetRepo;

impl AssetRepo {
    /// List all asset rows for a character.
    pub async fn list_for_character(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM character_assets WHERE character_id = $1 ORDER BY item_id"
        );
        sqlx::query_as::<_, CharacterAsset>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Number of stored asset rows for a character.
    pub async fn count_for_character(pool: &PgPool, character_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM character_assets WHERE character_id = $1")
                .bind(character_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Replace a character's asset rows with a fresh snapshot, all in
    /// one transaction.
    ///
    /// `assets` must be ordered parent-before-child: the parent link is
    /// a self-referential foreign key, so every batch may only point at
    /// rows from the same or an earlier batch. [`pilotwatch_core::asset_tree::AssetTree::iter_topological`]
    /// produces exactly that order.
    pub async fn replace_all(
        pool: &PgPool,
        character_id: DbId,
        assets: &[NewCharacterAsset],
        batch_size: usize,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM character_assets WHERE character_id = $1")
            .bind(character_id)
            .execute(&mut *tx)
            .await?;

        let mut written = 0u64;
        for chunk in assets.chunks(batch_size.max(1)) {
            // Build a multi-row VALUES clause.
            let mut query = format!("INSERT INTO character_assets ({INSERT_COLUMNS}) VALUES ");
            let mut param_idx = 1u32;
            for (i, _) in chunk.iter().enumerate() {
                if i > 0 {
                    query.push_str(", ");
                }
                query.push('(');
                for j in 0..PARAMS_PER_ROW {
                    if j > 0 {
                        query.push_str(", ");
                    }
                    query.push('$');
                    query.push_str(&param_idx.to_string());
                    param_idx += 1;
                }
                query.push(')');
            }

            let mut q = sqlx::query(&query);
            for asset in chunk {
                q = q
                    .bind(character_id)
                    .bind(asset.item_id)
                    .bind(asset.parent_item_id)
                    .bind(asset.location_id)
                    .bind(&asset.location_kind)
                    .bind(&asset.location_flag)
                    .bind(&asset.name)
                    .bind(asset.quantity)
                    .bind(asset.type_id)
                    .bind(asset.is_blueprint_copy)
                    .bind(asset.is_singleton);
            }
            written += q.execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Distinct item type ids across a character's assets, for entity
    /// name resolution.
    pub async fn type_ids_for_character(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<EveId>, sqlx::Error> {
        let rows: Vec<(EveId,)> = sqlx::query_as(
            "SELECT DISTINCT type_id FROM character_assets WHERE character_id = $1",
        )
        .bind(character_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
