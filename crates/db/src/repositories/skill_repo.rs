//! Repository for the `character_skillpoints`, `character_skills` and
//! `character_skill_queue` tables.

use pilotwatch_core::types::{DbId, EveId};
use sqlx::PgPool;

use crate::models::skill::{
    CharacterSkill, CharacterSkillpoints, NewSkill, NewSkillQueueEntry, SkillQueueEntry,
};

/// Column list for `character_skillpoints` queries.
const SKILLPOINT_COLUMNS: &str =
    "id, character_id, total_sp, unallocated_sp, created_at, updated_at";

/// Column list for `character_skills` queries.
const SKILL_COLUMNS: &str = "id, character_id, type_id, active_skill_level, \
    trained_skill_level, skillpoints_in_skill, created_at, updated_at";

/// Column list for `character_skill_queue` queries.
const QUEUE_COLUMNS: &str = "id, character_id, queue_position, skill_type_id, \
    finished_level, start_date, finish_date, level_start_sp, level_end_sp, \
    training_start_sp, created_at, updated_at";

/// Provides writes for skill totals, trained skills and the queue.
pub struct SkillRepo;

impl SkillRepo {
    // ── Skillpoints ──────────────────────────────────────────────────

    /// Upsert the skillpoint totals. One row per character.
    pub async fn upsert_skillpoints(
        pool: &PgPool,
        character_id: DbId,
        total_sp: i64,
        unallocated_sp: Option<i32>,
    ) -> Result<CharacterSkillpoints, sqlx::Error> {
        let query = format!(
            "INSERT INTO character_skillpoints (character_id, total_sp, unallocated_sp)
             VALUES ($1, $2, $3)
             ON CONFLICT (character_id) DO UPDATE
                 SET total_sp = EXCLUDED.total_sp,
                     unallocated_sp = EXCLUDED.unallocated_sp
             RETURNING {SKILLPOINT_COLUMNS}"
        );
        sqlx::query_as::<_, CharacterSkillpoints>(&query)
            .bind(character_id)
            .bind(total_sp)
            .bind(unallocated_sp)
            .fetch_one(pool)
            .await
    }

    // ── Trained skills ───────────────────────────────────────────────

    /// Load all stored skills for a character.
    pub async fn list_skills(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterSkill>, sqlx::Error> {
        let query = format!(
            "SELECT {SKILL_COLUMNS} FROM character_skills \
             WHERE character_id = $1 ORDER BY type_id"
        );
        sqlx::query_as::<_, CharacterSkill>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Active skill levels keyed by type id, as the doctrine checker
    /// consumes them.
    pub async fn active_levels(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<(EveId, i32)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT type_id, active_skill_level FROM character_skills WHERE character_id = $1",
        )
        .bind(character_id)
        .fetch_all(pool)
        .await
    }

    /// Apply a skill diff: upsert `upserts`, delete `obsolete`.
    /// Unlearned skills only disappear on biomass, but the remote view
    /// is authoritative either way.
    pub async fn apply_skills(
        pool: &PgPool,
        character_id: DbId,
        upserts: &[NewSkill],
        obsolete: &[EveId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for skill in upserts {
            sqlx::query(
                "INSERT INTO character_skills
                    (character_id, type_id, active_skill_level, trained_skill_level,
                     skillpoints_in_skill)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (character_id, type_id) DO UPDATE
                     SET active_skill_level = EXCLUDED.active_skill_level,
                         trained_skill_level = EXCLUDED.trained_skill_level,
                         skillpoints_in_skill = EXCLUDED.skillpoints_in_skill",
            )
            .bind(character_id)
            .bind(skill.type_id)
            .bind(skill.active_skill_level)
            .bind(skill.trained_skill_level)
            .bind(skill.skillpoints_in_skill)
            .execute(&mut *tx)
            .await?;
        }
        if !obsolete.is_empty() {
            sqlx::query(
                "DELETE FROM character_skills WHERE character_id = $1 AND type_id = ANY($2)",
            )
            .bind(character_id)
            .bind(obsolete)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ── Skill queue ──────────────────────────────────────────────────

    /// Load the stored training queue in position order.
    pub async fn list_queue(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<SkillQueueEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {QUEUE_COLUMNS} FROM character_skill_queue \
             WHERE character_id = $1 ORDER BY queue_position"
        );
        sqlx::query_as::<_, SkillQueueEntry>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Replace the training queue wholesale in one transaction.
    pub async fn replace_queue(
        pool: &PgPool,
        character_id: DbId,
        entries: &[NewSkillQueueEntry],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM character_skill_queue WHERE character_id = $1")
            .bind(character_id)
            .execute(&mut *tx)
            .await?;
        for entry in entries {
            sqlx::query(
                "INSERT INTO character_skill_queue
                    (character_id, queue_position, skill_type_id, finished_level,
                     start_date, finish_date, level_start_sp, level_end_sp,
                     training_start_sp)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(character_id)
            .bind(entry.queue_position)
            .bind(entry.skill_type_id)
            .bind(entry.finished_level)
            .bind(entry.start_date)
            .bind(entry.finish_date)
            .bind(entry.level_start_sp)
            .bind(entry.level_end_sp)
            .bind(entry.training_start_sp)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
