//! Skill-set compliance checks.
//!
//! A skill set is a named list of skills with required and/or
//! recommended levels (a ship fitting doctrine, typically). After a
//! character's skills refresh, each enabled skill set is re-checked
//! against the character's active skill levels and the failures are
//! stored per skill, so the result can explain *why* a character
//! cannot fly a doctrine rather than just flagging it.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::{DbId, EveId};

/// One skill entry of a skill set. A skill may carry a required level,
/// a recommended level, or both; an entry with neither is inert.
#[derive(Debug, Clone)]
pub struct SkillSetRequirement {
    pub type_id: EveId,
    pub name: String,
    pub required_level: Option<i32>,
    pub recommended_level: Option<i32>,
}

/// A skill the character is missing or has trained below the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillDeficit {
    pub type_id: EveId,
    pub name: String,
    pub target_level: i32,
    /// Active level the character actually has, 0 when untrained.
    pub trained_level: i32,
}

/// Result of checking one character against one skill set.
#[derive(Debug, Clone)]
pub struct SkillSetCompliance {
    pub skill_set_id: DbId,
    /// All required levels met. Recommended levels never block this.
    pub can_fly: bool,
    pub missing_required: Vec<SkillDeficit>,
    pub missing_recommended: Vec<SkillDeficit>,
}

/// Check a character's active skill levels against one skill set.
///
/// `trained` maps skill type id to the character's active level.
/// Injected or paused skills that report no active level should simply
/// be absent from the map.
pub fn check_skill_set(
    skill_set_id: DbId,
    requirements: &[SkillSetRequirement],
    trained: &HashMap<EveId, i32>,
) -> SkillSetCompliance {
    let mut missing_required = Vec::new();
    let mut missing_recommended = Vec::new();

    for requirement in requirements {
        let trained_level = trained.get(&requirement.type_id).copied().unwrap_or(0);
        if let Some(target) = requirement.required_level {
            if trained_level < target {
                missing_required.push(SkillDeficit {
                    type_id: requirement.type_id,
                    name: requirement.name.clone(),
                    target_level: target,
                    trained_level,
                });
            }
        }
        if let Some(target) = requirement.recommended_level {
            if trained_level < target {
                missing_recommended.push(SkillDeficit {
                    type_id: requirement.type_id,
                    name: requirement.name.clone(),
                    target_level: target,
                    trained_level,
                });
            }
        }
    }

    SkillSetCompliance {
        skill_set_id,
        can_fly: missing_required.is_empty(),
        missing_required,
        missing_recommended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement(
        type_id: EveId,
        name: &str,
        required: Option<i32>,
        recommended: Option<i32>,
    ) -> SkillSetRequirement {
        SkillSetRequirement {
            type_id,
            name: name.to_string(),
            required_level: required,
            recommended_level: recommended,
        }
    }

    #[test]
    fn all_required_met_can_fly() {
        let reqs = vec![
            requirement(3327, "Spaceship Command", Some(3), None),
            requirement(3449, "Navigation", Some(4), Some(5)),
        ];
        let trained = HashMap::from([(3327, 5), (3449, 5)]);

        let result = check_skill_set(1, &reqs, &trained);
        assert!(result.can_fly);
        assert!(result.missing_required.is_empty());
        assert!(result.missing_recommended.is_empty());
    }

    #[test]
    fn untrained_required_skill_blocks() {
        let reqs = vec![requirement(3327, "Spaceship Command", Some(3), None)];
        let result = check_skill_set(1, &reqs, &HashMap::new());

        assert!(!result.can_fly);
        assert_eq!(
            result.missing_required,
            vec![SkillDeficit {
                type_id: 3327,
                name: "Spaceship Command".to_string(),
                target_level: 3,
                trained_level: 0,
            }]
        );
    }

    #[test]
    fn undertrained_required_skill_reports_current_level() {
        let reqs = vec![requirement(3449, "Navigation", Some(5), None)];
        let trained = HashMap::from([(3449, 3)]);

        let result = check_skill_set(1, &reqs, &trained);
        assert!(!result.can_fly);
        assert_eq!(result.missing_required[0].trained_level, 3);
        assert_eq!(result.missing_required[0].target_level, 5);
    }

    #[test]
    fn missing_recommended_does_not_block() {
        let reqs = vec![requirement(3449, "Navigation", Some(3), Some(5))];
        let trained = HashMap::from([(3449, 4)]);

        let result = check_skill_set(1, &reqs, &trained);
        assert!(result.can_fly);
        assert!(result.missing_required.is_empty());
        assert_eq!(result.missing_recommended.len(), 1);
    }

    #[test]
    fn entry_without_levels_is_inert() {
        let reqs = vec![requirement(3449, "Navigation", None, None)];
        let result = check_skill_set(1, &reqs, &HashMap::new());
        assert!(result.can_fly);
        assert!(result.missing_recommended.is_empty());
    }

    #[test]
    fn empty_skill_set_is_trivially_flyable() {
        let result = check_skill_set(1, &[], &HashMap::new());
        assert!(result.can_fly);
    }
}
