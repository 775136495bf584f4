//! Skill models: totals, trained skills and the training queue.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `character_skillpoints` table. One row per
/// character.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterSkillpoints {
    pub id: DbId,
    pub character_id: DbId,
    pub total_sp: i64,
    pub unallocated_sp: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `character_skills` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterSkill {
    pub id: DbId,
    pub character_id: DbId,
    pub type_id: EveId,
    pub active_skill_level: i32,
    pub trained_skill_level: i32,
    pub skillpoints_in_skill: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one trained skill.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSkill {
    pub type_id: EveId,
    pub active_skill_level: i32,
    pub trained_skill_level: i32,
    pub skillpoints_in_skill: i64,
}

impl CharacterSkill {
    /// The diffable view of this row, for merge planning.
    pub fn as_new(&self) -> NewSkill {
        NewSkill {
            type_id: self.type_id,
            active_skill_level: self.active_skill_level,
            trained_skill_level: self.trained_skill_level,
            skillpoints_in_skill: self.skillpoints_in_skill,
        }
    }
}

/// A row from the `character_skill_queue` table. The queue is replaced
/// wholesale on every refresh; `queue_position` is its natural key.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SkillQueueEntry {
    pub id: DbId,
    pub character_id: DbId,
    pub queue_position: i32,
    pub skill_type_id: EveId,
    pub finished_level: i32,
    pub start_date: Option<Timestamp>,
    pub finish_date: Option<Timestamp>,
    pub level_start_sp: Option<i32>,
    pub level_end_sp: Option<i32>,
    pub training_start_sp: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one queue position.
#[derive(Debug, Clone)]
pub struct NewSkillQueueEntry {
    pub queue_position: i32,
    pub skill_type_id: EveId,
    pub finished_level: i32,
    pub start_date: Option<Timestamp>,
    pub finish_date: Option<Timestamp>,
    pub level_start_sp: Option<i32>,
    pub level_end_sp: Option<i32>,
    pub training_start_sp: Option<i32>,
}
