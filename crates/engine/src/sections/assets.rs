//! Asset section: snapshot fetch, name enrichment and containment
//! forest reconstruction, stored as one wholesale replacement.

use std::collections::HashMap;

use pilotwatch_core::asset_tree::{candidate_root_locations, AssetNode, AssetRecord, AssetTree};
use pilotwatch_core::types::EveId;
use pilotwatch_db::models::asset::NewCharacterAsset;
use pilotwatch_db::repositories::asset_repo::AssetRepo;
use pilotwatch_esi::records::EsiAsset;
use pilotwatch_esi::EsiError;

use crate::error::UpdateError;
use crate::locations;
use crate::resolver;
use crate::sections::UpdateContext;

/// ESI accepts at most this many ids per asset-names call.
const NAMES_CHUNK_SIZE: usize = 1000;

pub async fn update(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;
    let snapshot = ctx.esi.assets(ctx.character.character_id, token).await?;
    let names = fetch_names(ctx, token, &snapshot).await?;

    let records = to_records(&snapshot, &names);
    let roots = candidate_root_locations(&records);
    let root_ids: Vec<EveId> = roots.iter().copied().collect();
    locations::ensure_locations(ctx.pool, ctx.esi, Some(token), &root_ids).await?;

    let tree = AssetTree::build(&records, &roots)?;
    if !tree.orphans().is_empty() {
        tracing::warn!(
            character_id = ctx.character.character_id,
            orphans = tree.orphans().len(),
            "Dropped unplaceable asset records"
        );
    }

    let rows: Vec<NewCharacterAsset> = tree.iter_topological().map(to_row).collect();
    let written =
        AssetRepo::replace_all(ctx.pool, ctx.character.id, &rows, ctx.config.asset_batch_size)
            .await?;
    tracing::info!(
        character_id = ctx.character.character_id,
        assets = written,
        roots = tree.roots().len(),
        "Stored asset snapshot"
    );

    let type_ids = AssetRepo::type_ids_for_character(ctx.pool, ctx.character.id).await?;
    resolver::ensure_entities(ctx.pool, ctx.esi, &type_ids).await?;
    Ok(())
}

/// Fetch player-assigned names for the snapshot's singleton items.
///
/// The names endpoint 404s a whole chunk when any id in it cannot be
/// named. Names are cosmetic, so a failing chunk is skipped rather
/// than bisected.
async fn fetch_names(
    ctx: &UpdateContext<'_>,
    token: &str,
    snapshot: &[EsiAsset],
) -> Result<HashMap<EveId, String>, UpdateError> {
    let ids = nameable_ids(snapshot);
    let mut names = HashMap::new();
    for chunk in ids.chunks(NAMES_CHUNK_SIZE) {
        match ctx
            .esi
            .asset_names(ctx.character.character_id, token, chunk)
            .await
        {
            Ok(batch) => {
                names.extend(batch.into_iter().map(|n| (n.item_id, n.name)));
            }
            Err(EsiError::NotFound) => {
                tracing::warn!(ids = chunk.len(), "Asset name chunk rejected, skipping");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(names)
}

// ---- mapping ----

/// Only singleton items (ships, containers, modules) can carry a
/// player-assigned name; asking about stacked items is wasted budget.
fn nameable_ids(snapshot: &[EsiAsset]) -> Vec<EveId> {
    snapshot
        .iter()
        .filter(|a| a.is_singleton)
        .map(|a| a.item_id)
        .collect()
}

fn to_records(
    snapshot: &[EsiAsset],
    names: &HashMap<EveId, String>,
) -> HashMap<EveId, AssetRecord> {
    snapshot
        .iter()
        .map(|a| {
            (
                a.item_id,
                AssetRecord {
                    item_id: a.item_id,
                    location_id: a.location_id,
                    location_flag: a.location_flag.clone(),
                    location_type: a.location_type.clone(),
                    name: names.get(&a.item_id).cloned(),
                    quantity: a.quantity,
                    type_id: a.type_id,
                    is_blueprint_copy: a.is_blueprint_copy,
                    is_singleton: a.is_singleton,
                },
            )
        })
        .collect()
}

fn to_row(node: &AssetNode) -> NewCharacterAsset {
    NewCharacterAsset {
        item_id: node.item_id,
        parent_item_id: node.parent_item_id,
        location_id: node.location_id,
        location_kind: node.location_kind.as_str().to_string(),
        location_flag: node.location_flag.clone(),
        name: node.name.clone(),
        quantity: node.quantity,
        type_id: node.type_id,
        is_blueprint_copy: node.is_blueprint_copy,
        is_singleton: node.is_singleton,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATION_ID: EveId = 60_003_760;

    fn asset(item_id: EveId, location_id: EveId, location_type: &str) -> EsiAsset {
        EsiAsset {
            item_id,
            type_id: 587,
            location_id,
            location_type: location_type.into(),
            location_flag: "Hangar".into(),
            quantity: 1,
            is_singleton: true,
            is_blueprint_copy: false,
        }
    }

    #[test]
    fn stacked_items_are_not_asked_for_names() {
        let mut stack = asset(2, STATION_ID, "station");
        stack.is_singleton = false;
        let snapshot = vec![asset(1, STATION_ID, "station"), stack];
        assert_eq!(nameable_ids(&snapshot), vec![1]);
    }

    #[test]
    fn names_attach_to_their_records() {
        let snapshot = vec![asset(1, STATION_ID, "station")];
        let names = HashMap::from([(1, "Mining Barge Alpha".to_string())]);
        let records = to_records(&snapshot, &names);
        assert_eq!(records[&1].name.as_deref(), Some("Mining Barge Alpha"));
    }

    #[test]
    fn nested_snapshot_flattens_to_rows_parents_first() {
        // A ship docked in a station with a module fitted to it.
        let snapshot = vec![
            asset(1001, STATION_ID, "station"),
            asset(1002, 1001, "item"),
        ];
        let names = HashMap::from([(1001, "Scout".to_string())]);
        let records = to_records(&snapshot, &names);
        let roots = candidate_root_locations(&records);
        let tree = AssetTree::build(&records, &roots).unwrap();
        let rows: Vec<NewCharacterAsset> = tree.iter_topological().map(to_row).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].item_id, 1001);
        assert_eq!(rows[0].parent_item_id, None);
        assert_eq!(rows[0].location_kind, "station");
        assert_eq!(rows[0].name, "Scout");
        assert_eq!(rows[1].item_id, 1002);
        assert_eq!(rows[1].parent_item_id, Some(1001));
        assert_eq!(rows[1].location_id, STATION_ID);
        assert_eq!(rows[1].location_kind, "item");
        assert_eq!(rows[1].name, "");
    }
}
