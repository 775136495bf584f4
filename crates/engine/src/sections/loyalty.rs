//! Loyalty point section. Balances are diffed per corporation so an
//! untouched wallet of LP causes no writes.

use std::collections::HashMap;

use pilotwatch_core::merge;
use pilotwatch_core::types::EveId;
use pilotwatch_db::models::loyalty::NewLoyaltyEntry;
use pilotwatch_db::repositories::loyalty_repo::LoyaltyRepo;
use pilotwatch_esi::records::EsiLoyaltyEntry;

use crate::error::UpdateError;
use crate::resolver;
use crate::sections::UpdateContext;

pub async fn update(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;
    let entries = ctx.esi.loyalty_points(ctx.character.character_id, token).await?;
    let incoming: Vec<NewLoyaltyEntry> = entries.iter().map(map_entry).collect();

    let existing: HashMap<EveId, NewLoyaltyEntry> =
        LoyaltyRepo::list_for_character(ctx.pool, ctx.character.id)
            .await?
            .into_iter()
            .map(|e| (e.corporation_id, e.as_new()))
            .collect();
    let plan = merge::plan_replace(&existing, &incoming, |e| e.corporation_id);
    if plan.is_empty() {
        tracing::debug!(character_id = ctx.character.character_id, "Loyalty unchanged");
    } else {
        let upserts: Vec<NewLoyaltyEntry> = plan.create.into_iter().chain(plan.update).collect();
        LoyaltyRepo::apply(ctx.pool, ctx.character.id, &upserts, &plan.obsolete).await?;
        tracing::info!(
            character_id = ctx.character.character_id,
            upserts = upserts.len(),
            removed = plan.obsolete.len(),
            "Stored loyalty points"
        );
    }

    let corporations: Vec<EveId> = incoming.iter().map(|e| e.corporation_id).collect();
    resolver::ensure_entities(ctx.pool, ctx.esi, &corporations).await?;
    Ok(())
}

fn map_entry(entry: &EsiLoyaltyEntry) -> NewLoyaltyEntry {
    NewLoyaltyEntry {
        corporation_id: entry.corporation_id,
        loyalty_points: entry.loyalty_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balances_map_per_corporation() {
        let mapped = map_entry(&EsiLoyaltyEntry {
            corporation_id: 1_000_035,
            loyalty_points: 41_250,
        });
        assert_eq!(mapped.corporation_id, 1_000_035);
        assert_eq!(mapped.loyalty_points, 41_250);
    }
}
