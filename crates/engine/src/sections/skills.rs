//! Skill sections: trained skills, the training queue and doctrine
//! compliance checks.

use std::collections::HashMap;

use pilotwatch_core::merge;
use pilotwatch_core::skill_sets::{check_skill_set, SkillSetRequirement};
use pilotwatch_core::types::EveId;
use pilotwatch_db::models::skill::{NewSkill, NewSkillQueueEntry};
use pilotwatch_db::models::skill_set::{NewSkillSetCheck, SkillSetSkill};
use pilotwatch_db::repositories::skill_repo::SkillRepo;
use pilotwatch_db::repositories::skill_set_repo::SkillSetRepo;
use pilotwatch_esi::records::{EsiSkill, EsiSkillQueueEntry};

use crate::error::UpdateError;
use crate::resolver;
use crate::sections::UpdateContext;

/// Refresh total skillpoints and the trained skill list.
///
/// Skills are diffed by type id. Extracted skills drop off the remote
/// list and are removed here as well.
pub async fn update_skills(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;
    let sheet = ctx.esi.skills(ctx.character.character_id, token).await?;
    SkillRepo::upsert_skillpoints(
        ctx.pool,
        ctx.character.id,
        sheet.total_sp,
        sheet.unallocated_sp,
    )
    .await?;

    let incoming: Vec<NewSkill> = sheet.skills.iter().map(map_skill).collect();
    let existing: HashMap<EveId, NewSkill> = SkillRepo::list_skills(ctx.pool, ctx.character.id)
        .await?
        .into_iter()
        .map(|s| (s.type_id, s.as_new()))
        .collect();
    let plan = merge::plan_replace(&existing, &incoming, |s| s.type_id);
    if plan.is_empty() {
        tracing::debug!(character_id = ctx.character.character_id, "Skills unchanged");
        return Ok(());
    }

    let upserts: Vec<NewSkill> = plan.create.into_iter().chain(plan.update).collect();
    SkillRepo::apply_skills(ctx.pool, ctx.character.id, &upserts, &plan.obsolete).await?;
    tracing::info!(
        character_id = ctx.character.character_id,
        upserts = upserts.len(),
        removed = plan.obsolete.len(),
        "Stored skills"
    );

    let type_ids: Vec<EveId> = upserts.iter().map(|s| s.type_id).collect();
    resolver::ensure_entities(ctx.pool, ctx.esi, &type_ids).await?;
    Ok(())
}

/// Refresh the training queue. The queue is position-keyed and small,
/// so it is replaced wholesale.
pub async fn update_queue(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;
    let queue = ctx.esi.skill_queue(ctx.character.character_id, token).await?;
    let entries: Vec<NewSkillQueueEntry> = queue.iter().map(map_queue_entry).collect();
    SkillRepo::replace_queue(ctx.pool, ctx.character.id, &entries).await?;
    tracing::debug!(
        character_id = ctx.character.character_id,
        entries = entries.len(),
        "Stored skill queue"
    );

    let type_ids: Vec<EveId> = entries.iter().map(|e| e.skill_type_id).collect();
    resolver::ensure_entities(ctx.pool, ctx.esi, &type_ids).await?;
    Ok(())
}

/// Re-check every enabled doctrine against the stored skills.
///
/// Works entirely from the database, so it runs even for characters
/// without a usable token, against whatever skills were last stored.
pub async fn update_skill_sets(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let sets = SkillSetRepo::list_enabled(ctx.pool).await?;
    let trained: HashMap<EveId, i32> = SkillRepo::active_levels(ctx.pool, ctx.character.id)
        .await?
        .into_iter()
        .collect();

    let mut checks = Vec::with_capacity(sets.len());
    for set in &sets {
        let skills = SkillSetRepo::list_skills(ctx.pool, set.id).await?;
        let requirements: Vec<SkillSetRequirement> = skills.iter().map(map_requirement).collect();
        let compliance = check_skill_set(set.id, &requirements, &trained);
        checks.push(NewSkillSetCheck {
            skill_set_id: compliance.skill_set_id,
            can_fly: compliance.can_fly,
            failed_required: serde_json::to_value(&compliance.missing_required)?,
            failed_recommended: serde_json::to_value(&compliance.missing_recommended)?,
        });
    }

    let failing = checks.iter().filter(|c| !c.can_fly).count();
    SkillSetRepo::replace_checks(ctx.pool, ctx.character.id, &checks).await?;
    tracing::debug!(
        character_id = ctx.character.character_id,
        sets = checks.len(),
        failing,
        "Stored skill set checks"
    );
    Ok(())
}

// ---- mapping ----

fn map_skill(skill: &EsiSkill) -> NewSkill {
    NewSkill {
        type_id: skill.skill_id,
        active_skill_level: skill.active_skill_level,
        trained_skill_level: skill.trained_skill_level,
        skillpoints_in_skill: skill.skillpoints_in_skill,
    }
}

fn map_queue_entry(entry: &EsiSkillQueueEntry) -> NewSkillQueueEntry {
    NewSkillQueueEntry {
        queue_position: entry.queue_position,
        skill_type_id: entry.skill_id,
        finished_level: entry.finished_level,
        start_date: entry.start_date,
        finish_date: entry.finish_date,
        level_start_sp: entry.level_start_sp,
        level_end_sp: entry.level_end_sp,
        training_start_sp: entry.training_start_sp,
    }
}

fn map_requirement(skill: &SkillSetSkill) -> SkillSetRequirement {
    SkillSetRequirement {
        type_id: skill.type_id,
        name: skill.name.clone(),
        required_level: skill.required_level,
        recommended_level: skill.recommended_level,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn paused_skills_keep_both_levels() {
        let mapped = map_skill(&EsiSkill {
            skill_id: 3327,
            active_skill_level: 3,
            trained_skill_level: 5,
            skillpoints_in_skill: 1_280_000,
        });
        assert_eq!(mapped.active_skill_level, 3);
        assert_eq!(mapped.trained_skill_level, 5);
    }

    #[test]
    fn queue_entries_keep_their_position() {
        let mapped = map_queue_entry(&EsiSkillQueueEntry {
            skill_id: 3449,
            queue_position: 2,
            finished_level: 5,
            start_date: None,
            finish_date: None,
            level_start_sp: Some(45_255),
            level_end_sp: Some(256_000),
            training_start_sp: Some(51_002),
        });
        assert_eq!(mapped.queue_position, 2);
        assert_eq!(mapped.skill_type_id, 3449);
    }

    #[test]
    fn deficits_serialize_with_their_levels() {
        let requirements = vec![SkillSetRequirement {
            type_id: 3327,
            name: "Spaceship Command".into(),
            required_level: Some(4),
            recommended_level: None,
        }];
        let trained = HashMap::from([(3327, 2)]);
        let compliance = check_skill_set(7, &requirements, &trained);
        let value = serde_json::to_value(&compliance.missing_required).unwrap();
        assert_eq!(
            value,
            json!([{
                "type_id": 3327,
                "name": "Spaceship Command",
                "target_level": 4,
                "trained_level": 2,
            }])
        );
    }
}
