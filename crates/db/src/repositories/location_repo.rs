//! Repository for the `locations` table.

use pilotwatch_core::types::EveId;
use sqlx::PgPool;

use crate::models::universe::{Location, NewLocation};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, name, solar_system_id, owner_id, type_id, location_kind, created_at, updated_at";

/// Provides shared location lookups and upserts. Rows are keyed by the
/// EVE location id itself.
pub struct LocationRepo;

impl LocationRepo {
    /// Find a location by its EVE id.
    pub async fn find_by_id(pool: &PgPool, id: EveId) -> Result<Option<Location>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM locations WHERE id = $1");
        sqlx::query_as::<_, Location>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Which of the given ids are stored with a resolved name.
    ///
    /// Placeholder rows (empty name) are excluded so callers retry the
    /// lookup and backfill them when access returns.
    pub async fn resolved_ids(pool: &PgPool, ids: &[EveId]) -> Result<Vec<EveId>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<(EveId,)> =
            sqlx::query_as("SELECT id FROM locations WHERE id = ANY($1) AND name <> ''")
                .bind(ids)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Upsert one location (resolved or placeholder).
    ///
    /// A placeholder never overwrites a resolved name: once a
    /// structure has been seen with docking rights, losing them later
    /// must not blank it out again.
    pub async fn upsert(pool: &PgPool, input: &NewLocation) -> Result<Location, sqlx::Error> {
        let query = format!(
            "INSERT INTO locations (id, name, solar_system_id, owner_id, type_id, location_kind)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE
                 SET name = CASE WHEN EXCLUDED.name = '' THEN locations.name
                                 ELSE EXCLUDED.name END,
                     solar_system_id = COALESCE(EXCLUDED.solar_system_id, locations.solar_system_id),
                     owner_id = COALESCE(EXCLUDED.owner_id, locations.owner_id),
                     type_id = COALESCE(EXCLUDED.type_id, locations.type_id),
                     location_kind = EXCLUDED.location_kind
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Location>(&query)
            .bind(input.id)
            .bind(&input.name)
            .bind(input.solar_system_id)
            .bind(input.owner_id)
            .bind(input.type_id)
            .bind(&input.location_kind)
            .fetch_one(pool)
            .await
    }

    /// Total number of stored locations.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM locations")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
