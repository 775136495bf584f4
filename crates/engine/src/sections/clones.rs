//! Clone bay sections: active implants and jump clones.

use pilotwatch_core::types::EveId;
use pilotwatch_db::models::clones::{NewCloneInfo, NewJumpClone};
use pilotwatch_db::repositories::clones_repo::ClonesRepo;
use pilotwatch_esi::records::{EsiClones, EsiJumpClone};

use crate::error::UpdateError;
use crate::locations;
use crate::resolver;
use crate::sections::UpdateContext;

/// Refresh the active clone's implants. The set is small and replaced
/// wholesale.
pub async fn update_implants(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;
    let mut implants = ctx.esi.implants(ctx.character.character_id, token).await?;
    implants.sort_unstable();
    ClonesRepo::replace_implants(ctx.pool, ctx.character.id, &implants).await?;
    tracing::debug!(
        character_id = ctx.character.character_id,
        implants = implants.len(),
        "Stored implants"
    );
    resolver::ensure_entities(ctx.pool, ctx.esi, &implants).await?;
    Ok(())
}

/// Refresh the clone info row and the jump clone set.
pub async fn update_jump_clones(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;
    let clones = ctx.esi.clones(ctx.character.character_id, token).await?;

    let info = map_clone_info(&clones);
    let mapped: Vec<NewJumpClone> = clones
        .jump_clones
        .iter()
        .map(map_jump_clone)
        .collect::<Result<_, _>>()?;

    // Location rows must exist before clone rows point at them.
    let mut referenced: Vec<EveId> = mapped.iter().map(|c| c.location_id).collect();
    referenced.extend(info.home_location_id);
    locations::ensure_locations(ctx.pool, ctx.esi, Some(token), &referenced).await?;

    ClonesRepo::upsert_clone_info(ctx.pool, ctx.character.id, &info).await?;
    ClonesRepo::replace_jump_clones(ctx.pool, ctx.character.id, &mapped).await?;
    tracing::debug!(
        character_id = ctx.character.character_id,
        clones = mapped.len(),
        "Stored jump clones"
    );

    let implant_ids: Vec<EveId> = clones
        .jump_clones
        .iter()
        .flat_map(|c| c.implants.iter().copied())
        .collect();
    resolver::ensure_entities(ctx.pool, ctx.esi, &implant_ids).await?;
    Ok(())
}

// ---- mapping ----

fn map_clone_info(clones: &EsiClones) -> NewCloneInfo {
    NewCloneInfo {
        home_location_id: clones.home_location.as_ref().and_then(|h| h.location_id),
        last_clone_jump_date: clones.last_clone_jump_date,
        last_station_change_date: clones.last_station_change_date,
    }
}

/// Implant ids are sorted before serialization so the stored JSON is
/// deterministic and diffable.
fn map_jump_clone(clone: &EsiJumpClone) -> Result<NewJumpClone, serde_json::Error> {
    let mut implants = clone.implants.clone();
    implants.sort_unstable();
    Ok(NewJumpClone {
        jump_clone_id: clone.jump_clone_id,
        location_id: clone.location_id,
        name: clone.name.clone().unwrap_or_default(),
        implant_type_ids: serde_json::to_value(&implants)?,
    })
}

#[cfg(test)]
mod tests {
    use pilotwatch_esi::records::EsiHomeLocation;
    use serde_json::json;

    use super::*;

    #[test]
    fn implants_are_sorted_in_the_stored_json() {
        let clone = EsiJumpClone {
            jump_clone_id: 12,
            location_id: 60_003_760,
            location_type: "station".into(),
            name: None,
            implants: vec![10_221, 9_941, 13_258],
        };
        let mapped = map_jump_clone(&clone).unwrap();
        assert_eq!(mapped.implant_type_ids, json!([9_941, 10_221, 13_258]));
        assert_eq!(mapped.name, "");
    }

    #[test]
    fn clone_info_takes_the_home_location_id() {
        let clones = EsiClones {
            home_location: Some(EsiHomeLocation {
                location_id: Some(60_011_866),
                location_type: Some("station".into()),
            }),
            jump_clones: Vec::new(),
            last_clone_jump_date: None,
            last_station_change_date: None,
        };
        assert_eq!(map_clone_info(&clones).home_location_id, Some(60_011_866));
    }

    #[test]
    fn missing_home_location_maps_to_none() {
        let clones = EsiClones {
            home_location: None,
            jump_clones: Vec::new(),
            last_clone_jump_date: None,
            last_station_change_date: None,
        };
        assert_eq!(map_clone_info(&clones).home_location_id, None);
    }
}
