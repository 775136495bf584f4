//! Character sheet and employment history sections.

use std::collections::HashMap;

use pilotwatch_core::merge;
use pilotwatch_core::types::EveId;
use pilotwatch_db::models::details::{NewCharacterDetails, NewCorporationHistoryEntry};
use pilotwatch_db::repositories::character_repo::CharacterRepo;
use pilotwatch_db::repositories::details_repo::DetailsRepo;
use pilotwatch_esi::records::{EsiCharacter, EsiCorporationHistoryEntry};

use crate::error::UpdateError;
use crate::resolver;
use crate::sections::UpdateContext;

/// Refresh the public character sheet.
///
/// Also keeps the `characters` row's corporation and alliance current,
/// so list views stay accurate even when the details row is unchanged.
pub async fn update_details(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let sheet = ctx.esi.character(ctx.character.character_id).await?;
    let incoming = map_details(&sheet);

    CharacterRepo::set_affiliation(
        ctx.pool,
        ctx.character.id,
        sheet.corporation_id,
        sheet.alliance_id,
    )
    .await?;

    let existing = DetailsRepo::find_details(ctx.pool, ctx.character.id).await?;
    if existing.as_ref().map(|d| d.as_new()) == Some(incoming.clone()) {
        tracing::debug!(character_id = ctx.character.character_id, "Details unchanged");
    } else {
        DetailsRepo::upsert_details(ctx.pool, ctx.character.id, &incoming).await?;
        tracing::info!(character_id = ctx.character.character_id, "Stored character details");
    }

    let related: Vec<_> = [Some(sheet.corporation_id), sheet.alliance_id, sheet.faction_id]
        .into_iter()
        .flatten()
        .collect();
    resolver::ensure_entities(ctx.pool, ctx.esi, &related).await?;
    Ok(())
}

/// Refresh the corporation employment history.
///
/// History rows are upserted by `record_id` and never deleted; ESI
/// returns the full history on every call.
pub async fn update_history(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let entries = ctx.esi.corporation_history(ctx.character.character_id).await?;
    let incoming: Vec<NewCorporationHistoryEntry> =
        entries.iter().map(map_history_entry).collect();

    let existing: HashMap<EveId, NewCorporationHistoryEntry> =
        DetailsRepo::list_history(ctx.pool, ctx.character.id)
            .await?
            .into_iter()
            .map(|e| (e.record_id, e.as_new()))
            .collect();
    let plan = merge::plan_upsert(&existing, &incoming, |e| e.record_id);
    if plan.is_empty() {
        tracing::debug!(character_id = ctx.character.character_id, "History unchanged");
    } else {
        let changed: Vec<NewCorporationHistoryEntry> =
            plan.create.into_iter().chain(plan.update).collect();
        DetailsRepo::upsert_history(ctx.pool, ctx.character.id, &changed).await?;
        tracing::info!(
            character_id = ctx.character.character_id,
            entries = changed.len(),
            "Stored employment history"
        );
    }

    let corporations: Vec<_> = incoming.iter().map(|e| e.corporation_id).collect();
    resolver::ensure_entities(ctx.pool, ctx.esi, &corporations).await?;
    Ok(())
}

// ---- mapping ----

fn map_details(sheet: &EsiCharacter) -> NewCharacterDetails {
    NewCharacterDetails {
        birthday: sheet.birthday,
        corporation_id: sheet.corporation_id,
        alliance_id: sheet.alliance_id,
        faction_id: sheet.faction_id,
        race_id: i64::from(sheet.race_id),
        bloodline_id: i64::from(sheet.bloodline_id),
        gender: sheet.gender.clone(),
        description: sheet.description.clone().unwrap_or_default(),
        security_status: sheet.security_status,
        title: sheet.title.clone(),
    }
}

fn map_history_entry(entry: &EsiCorporationHistoryEntry) -> NewCorporationHistoryEntry {
    NewCorporationHistoryEntry {
        record_id: entry.record_id,
        corporation_id: entry.corporation_id,
        is_deleted: entry.is_deleted,
        start_date: entry.start_date,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn sheet() -> EsiCharacter {
        EsiCharacter {
            name: "CCP Zoetrope".into(),
            corporation_id: 98_356_193,
            alliance_id: Some(99_005_338),
            faction_id: None,
            birthday: Utc.with_ymd_and_hms(2015, 3, 24, 11, 37, 0).unwrap(),
            gender: "male".into(),
            race_id: 2,
            bloodline_id: 7,
            description: None,
            security_status: Some(-1.3),
            title: Some("Producer".into()),
        }
    }

    #[test]
    fn missing_description_maps_to_empty_string() {
        let details = map_details(&sheet());
        assert_eq!(details.description, "");
        assert_eq!(details.race_id, 2);
        assert_eq!(details.bloodline_id, 7);
    }

    #[test]
    fn unchanged_sheet_produces_equal_views() {
        let a = map_details(&sheet());
        let b = map_details(&sheet());
        assert_eq!(a, b);
    }

    #[test]
    fn history_entries_keep_their_record_ids() {
        let entry = EsiCorporationHistoryEntry {
            record_id: 501,
            corporation_id: 98_356_193,
            is_deleted: false,
            start_date: Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap(),
        };
        let mapped = map_history_entry(&entry);
        assert_eq!(mapped.record_id, 501);
        assert_eq!(mapped.corporation_id, 98_356_193);
        assert!(!mapped.is_deleted);
    }
}
