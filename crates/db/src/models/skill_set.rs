//! Skill-set (doctrine) models and per-character check results.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `skill_sets` table: a named doctrine to check
/// characters against.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SkillSet {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub is_enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `skill_set_skills` table: one skill requirement of a
/// doctrine.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SkillSetSkill {
    pub id: DbId,
    pub skill_set_id: DbId,
    pub type_id: EveId,
    pub name: String,
    pub required_level: Option<i32>,
    pub recommended_level: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `character_skill_set_checks` table: the latest
/// compliance result for one (character, skill set) pair.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SkillSetCheck {
    pub id: DbId,
    pub character_id: DbId,
    pub skill_set_id: DbId,
    pub can_fly: bool,
    /// Failed requirements as a JSON array of deficits.
    pub failed_required: serde_json::Value,
    pub failed_recommended: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one compliance result.
#[derive(Debug, Clone)]
pub struct NewSkillSetCheck {
    pub skill_set_id: DbId,
    pub can_fly: bool,
    pub failed_required: serde_json::Value,
    pub failed_recommended: serde_json::Value,
}
