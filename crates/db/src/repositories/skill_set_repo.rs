//! Repository for the `skill_sets`, `skill_set_skills` and
//! `character_skill_set_checks` tables.

use pilotwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::skill_set::{NewSkillSetCheck, SkillSet, SkillSetCheck, SkillSetSkill};

/// Column list for `skill_sets` queries.
const SET_COLUMNS: &str = "id, name, description, is_enabled, created_at, updated_at";

/// Column list for `skill_set_skills` queries.
const SKILL_COLUMNS: &str = "id, skill_set_id, type_id, name, required_level, \
    recommended_level, created_at, updated_at";

/// Column list for `character_skill_set_checks` queries.
const CHECK_COLUMNS: &str = "id, character_id, skill_set_id, can_fly, failed_required, \
    failed_recommended, created_at, updated_at";

/// Provides doctrine definitions and per-character check storage.
pub struct SkillSetRepo;

impl SkillSetRepo {
    /// Create a doctrine. Names are unique.
    pub async fn create(
        pool: &PgPool,
        name: &str,
        description: Option<&str>,
    ) -> Result<SkillSet, sqlx::Error> {
        let query = format!(
            "INSERT INTO skill_sets (name, description)
             VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
             RETURNING {SET_COLUMNS}"
        );
        sqlx::query_as::<_, SkillSet>(&query)
            .bind(name)
            .bind(description)
            .fetch_one(pool)
            .await
    }

    /// List all enabled doctrines.
    pub async fn list_enabled(pool: &PgPool) -> Result<Vec<SkillSet>, sqlx::Error> {
        let query =
            format!("SELECT {SET_COLUMNS} FROM skill_sets WHERE is_enabled = true ORDER BY name");
        sqlx::query_as::<_, SkillSet>(&query).fetch_all(pool).await
    }

    /// Add a skill requirement to a doctrine.
    pub async fn add_skill(
        pool: &PgPool,
        skill_set_id: DbId,
        type_id: i64,
        name: &str,
        required_level: Option<i32>,
        recommended_level: Option<i32>,
    ) -> Result<SkillSetSkill, sqlx::Error> {
        let query = format!(
            "INSERT INTO skill_set_skills
                (skill_set_id, type_id, name, required_level, recommended_level)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (skill_set_id, type_id) DO UPDATE
                 SET name = EXCLUDED.name,
                     required_level = EXCLUDED.required_level,
                     recommended_level = EXCLUDED.recommended_level
             RETURNING {SKILL_COLUMNS}"
        );
        sqlx::query_as::<_, SkillSetSkill>(&query)
            .bind(skill_set_id)
            .bind(type_id)
            .bind(name)
            .bind(required_level)
            .bind(recommended_level)
            .fetch_one(pool)
            .await
    }

    /// Load the skill requirements of one doctrine.
    pub async fn list_skills(
        pool: &PgPool,
        skill_set_id: DbId,
    ) -> Result<Vec<SkillSetSkill>, sqlx::Error> {
        let query = format!(
            "SELECT {SKILL_COLUMNS} FROM skill_set_skills \
             WHERE skill_set_id = $1 ORDER BY type_id"
        );
        sqlx::query_as::<_, SkillSetSkill>(&query)
            .bind(skill_set_id)
            .fetch_all(pool)
            .await
    }

    /// Load the latest check results for a character.
    pub async fn list_checks(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<SkillSetCheck>, sqlx::Error> {
        let query = format!(
            "SELECT {CHECK_COLUMNS} FROM character_skill_set_checks \
             WHERE character_id = $1 ORDER BY skill_set_id"
        );
        sqlx::query_as::<_, SkillSetCheck>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Replace a character's check results wholesale. Results for
    /// doctrines that have since been disabled are dropped with the
    /// rest.
    pub async fn replace_checks(
        pool: &PgPool,
        character_id: DbId,
        checks: &[NewSkillSetCheck],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM character_skill_set_checks WHERE character_id = $1")
            .bind(character_id)
            .execute(&mut *tx)
            .await?;
        for check in checks {
            sqlx::query(
                "INSERT INTO character_skill_set_checks
                    (character_id, skill_set_id, can_fly, failed_required, failed_recommended)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(character_id)
            .bind(check.skill_set_id)
            .bind(check.can_fly)
            .bind(&check.failed_required)
            .bind(&check.failed_recommended)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
