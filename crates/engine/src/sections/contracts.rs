//! Contract section: the contract list plus per-contract items and
//! auction bids.
//!
//! Contracts age out of the remote view after completion but stay on
//! record locally. Items are immutable and fetched once per contract;
//! bids only ever accumulate.

use std::collections::{HashMap, HashSet};

use pilotwatch_core::merge;
use pilotwatch_core::types::{DbId, EveId};
use pilotwatch_db::models::contract::{NewContract, NewContractBid, NewContractItem};
use pilotwatch_db::repositories::contract_repo::ContractRepo;
use pilotwatch_esi::records::{EsiContract, EsiContractBid, EsiContractItem};
use pilotwatch_esi::EsiError;

use crate::error::UpdateError;
use crate::locations;
use crate::resolver;
use crate::sections::UpdateContext;

pub async fn update(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;
    let remote = ctx.esi.contracts(ctx.character.character_id, token).await?;
    let incoming: Vec<NewContract> = remote.iter().map(map_contract).collect();

    let existing: HashMap<EveId, NewContract> =
        ContractRepo::list_for_character(ctx.pool, ctx.character.id)
            .await?
            .into_iter()
            .map(|c| (c.contract_id, c.as_new()))
            .collect();
    let plan = merge::plan_upsert(&existing, &incoming, |c| c.contract_id);
    if plan.is_empty() {
        tracing::debug!(character_id = ctx.character.character_id, "Contracts unchanged");
    } else {
        let changed: Vec<NewContract> = plan.create.into_iter().chain(plan.update).collect();
        ContractRepo::upsert_contracts(ctx.pool, ctx.character.id, &changed).await?;
        tracing::info!(
            character_id = ctx.character.character_id,
            contracts = changed.len(),
            "Stored contracts"
        );
    }

    let pks: HashMap<EveId, DbId> = ContractRepo::contract_pks(ctx.pool, ctx.character.id)
        .await?
        .into_iter()
        .collect();
    for contract in &remote {
        let Some(&pk) = pks.get(&contract.contract_id) else {
            continue;
        };
        if carries_items(&contract.contract_type) && !ContractRepo::has_items(ctx.pool, pk).await?
        {
            fetch_items(ctx, token, contract.contract_id, pk).await?;
        }
        if contract.contract_type == "auction" {
            fetch_bids(ctx, token, contract.contract_id, pk).await?;
        }
    }

    let parties: Vec<EveId> = remote
        .iter()
        .flat_map(|c| {
            [
                Some(c.issuer_id),
                Some(c.issuer_corporation_id),
                normalize_party(c.assignee_id),
                normalize_party(c.acceptor_id),
            ]
        })
        .flatten()
        .collect();
    resolver::ensure_entities(ctx.pool, ctx.esi, &parties).await?;

    let endpoints: Vec<EveId> = remote
        .iter()
        .flat_map(|c| [c.start_location_id, c.end_location_id])
        .flatten()
        .collect();
    locations::ensure_locations(ctx.pool, ctx.esi, Some(token), &endpoints).await?;
    Ok(())
}

/// Fetch and store the items of a newly seen contract. Expired
/// contracts 404 their item list; the contract row still stands.
async fn fetch_items(
    ctx: &UpdateContext<'_>,
    token: &str,
    contract_id: EveId,
    contract_pk: DbId,
) -> Result<(), UpdateError> {
    match ctx
        .esi
        .contract_items(ctx.character.character_id, contract_id, token)
        .await
    {
        Ok(items) => {
            let mapped: Vec<NewContractItem> = items.iter().map(map_item).collect();
            ContractRepo::insert_items(ctx.pool, contract_pk, &mapped).await?;
            let type_ids: Vec<EveId> = mapped.iter().map(|i| i.type_id).collect();
            resolver::ensure_entities(ctx.pool, ctx.esi, &type_ids).await?;
            Ok(())
        }
        Err(EsiError::NotFound) => {
            tracing::warn!(contract_id, "Contract items no longer available");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Append bids not yet stored for an auction.
async fn fetch_bids(
    ctx: &UpdateContext<'_>,
    token: &str,
    contract_id: EveId,
    contract_pk: DbId,
) -> Result<(), UpdateError> {
    let bids = match ctx
        .esi
        .contract_bids(ctx.character.character_id, contract_id, token)
        .await
    {
        Ok(bids) => bids,
        Err(EsiError::NotFound) => {
            tracing::warn!(contract_id, "Contract bids no longer available");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let incoming: Vec<NewContractBid> = bids.iter().map(map_bid).collect();
    let existing: HashSet<EveId> = ContractRepo::existing_bid_ids(ctx.pool, contract_pk)
        .await?
        .into_iter()
        .collect();
    let plan = merge::plan_append(&existing, &incoming, |b| b.bid_id);
    if !plan.create.is_empty() {
        let bidders: Vec<EveId> = plan.create.iter().map(|b| b.bidder_id).collect();
        ContractRepo::insert_bids(ctx.pool, contract_pk, &plan.create).await?;
        resolver::ensure_entities(ctx.pool, ctx.esi, &bidders).await?;
    }
    Ok(())
}

// ---- mapping ----

/// Couriers only list their package through the items endpoint after
/// acceptance, and often 404; item fetching sticks to the types that
/// reliably carry them.
fn carries_items(contract_type: &str) -> bool {
    matches!(contract_type, "item_exchange" | "auction")
}

/// ESI reports "no party" as id 0 on some contract fields.
fn normalize_party(id: Option<EveId>) -> Option<EveId> {
    id.filter(|id| *id > 0)
}

fn map_contract(contract: &EsiContract) -> NewContract {
    NewContract {
        contract_id: contract.contract_id,
        acceptor_id: normalize_party(contract.acceptor_id),
        assignee_id: normalize_party(contract.assignee_id),
        availability: contract.availability.clone(),
        buyout: contract.buyout,
        collateral: contract.collateral,
        contract_type: contract.contract_type.clone(),
        date_accepted: contract.date_accepted,
        date_completed: contract.date_completed,
        date_expired: contract.date_expired,
        date_issued: contract.date_issued,
        days_to_complete: contract.days_to_complete,
        end_location_id: contract.end_location_id,
        for_corporation: contract.for_corporation,
        issuer_corporation_id: contract.issuer_corporation_id,
        issuer_id: contract.issuer_id,
        price: contract.price,
        reward: contract.reward,
        start_location_id: contract.start_location_id,
        status: contract.status.clone(),
        title: contract.title.clone().unwrap_or_default(),
        volume: contract.volume,
    }
}

fn map_item(item: &EsiContractItem) -> NewContractItem {
    NewContractItem {
        record_id: item.record_id,
        is_included: item.is_included,
        is_singleton: item.is_singleton,
        quantity: item.quantity,
        raw_quantity: item.raw_quantity,
        type_id: item.type_id,
    }
}

fn map_bid(bid: &EsiContractBid) -> NewContractBid {
    NewContractBid {
        bid_id: bid.bid_id,
        amount: bid.amount,
        bidder_id: bid.bidder_id,
        date_bid: bid.date_bid,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn contract(contract_id: EveId, contract_type: &str) -> EsiContract {
        EsiContract {
            contract_id,
            contract_type: contract_type.into(),
            status: "outstanding".into(),
            availability: "public".into(),
            issuer_id: 92_000_001,
            issuer_corporation_id: 98_356_193,
            assignee_id: Some(0),
            acceptor_id: Some(0),
            date_issued: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            date_expired: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            date_accepted: None,
            date_completed: None,
            days_to_complete: None,
            for_corporation: false,
            start_location_id: Some(60_003_760),
            end_location_id: None,
            price: None,
            reward: None,
            collateral: None,
            buyout: None,
            volume: Some(12_500.0),
            title: None,
        }
    }

    #[test]
    fn zero_party_ids_normalize_to_none() {
        let mapped = map_contract(&contract(1, "item_exchange"));
        assert_eq!(mapped.acceptor_id, None);
        assert_eq!(mapped.assignee_id, None);
    }

    #[test]
    fn real_party_ids_survive_normalization() {
        let mut raw = contract(2, "item_exchange");
        raw.acceptor_id = Some(95_000_002);
        let mapped = map_contract(&raw);
        assert_eq!(mapped.acceptor_id, Some(95_000_002));
    }

    #[test]
    fn missing_title_maps_to_empty_string() {
        let mapped = map_contract(&contract(3, "courier"));
        assert_eq!(mapped.title, "");
    }

    #[test]
    fn auctions_keep_their_buyout() {
        let mut raw = contract(4, "auction");
        raw.buyout = Some(200_000_000.0);
        raw.price = Some(150_000_000.0);
        let mapped = map_contract(&raw);
        assert_eq!(mapped.buyout, Some(200_000_000.0));
    }

    #[test]
    fn only_exchanges_and_auctions_carry_items() {
        assert!(carries_items("item_exchange"));
        assert!(carries_items("auction"));
        assert!(!carries_items("courier"));
        assert!(!carries_items("loan"));
    }

    #[test]
    fn status_transition_registers_as_an_update_without_deletes() {
        let stored = map_contract(&contract(5, "item_exchange"));
        let mut accepted = contract(5, "item_exchange");
        accepted.status = "finished".into();
        accepted.acceptor_id = Some(95_000_002);
        accepted.date_completed = Some(Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap());
        let incoming = vec![map_contract(&accepted)];

        let existing: HashMap<EveId, NewContract> =
            HashMap::from([(stored.contract_id, stored)]);
        let plan = merge::plan_upsert(&existing, &incoming, |c| c.contract_id);
        assert_eq!(plan.update.len(), 1);
        assert!(plan.create.is_empty());
        assert!(plan.obsolete.is_empty());
        assert_eq!(plan.update[0].status, "finished");
    }

    #[test]
    fn aged_out_contracts_are_not_marked_obsolete() {
        let stored = map_contract(&contract(6, "item_exchange"));
        let existing: HashMap<EveId, NewContract> =
            HashMap::from([(stored.contract_id, stored)]);
        let plan = merge::plan_upsert(&existing, &[], |c: &NewContract| c.contract_id);
        assert!(plan.is_empty());
    }

    #[test]
    fn contract_page_parses_maps_and_plans() {
        let page: Vec<EsiContract> = serde_json::from_value(serde_json::json!([
            {
                "contract_id": 100_000_001,
                "type": "item_exchange",
                "status": "outstanding",
                "availability": "personal",
                "issuer_id": 92_000_001,
                "issuer_corporation_id": 98_356_193,
                "assignee_id": 95_000_002,
                "date_issued": "2024-03-01T12:00:00Z",
                "date_expired": "2024-03-15T12:00:00Z",
                "for_corporation": false,
                "price": 25_000_000.0,
                "title": "Fitted Thorax"
            },
            {
                "contract_id": 100_000_002,
                "type": "auction",
                "status": "outstanding",
                "availability": "public",
                "issuer_id": 92_000_001,
                "issuer_corporation_id": 98_356_193,
                "date_issued": "2024-03-02T08:00:00Z",
                "date_expired": "2024-03-09T08:00:00Z",
                "for_corporation": false,
                "price": 150_000_000.0,
                "buyout": 200_000_000.0
            },
            {
                "contract_id": 100_000_003,
                "type": "courier",
                "status": "in_progress",
                "availability": "personal",
                "issuer_id": 92_000_001,
                "issuer_corporation_id": 98_356_193,
                "acceptor_id": 95_000_003,
                "date_issued": "2024-03-03T10:00:00Z",
                "date_expired": "2024-03-10T10:00:00Z",
                "for_corporation": false,
                "reward": 5_000_000.0,
                "collateral": 80_000_000.0,
                "volume": 8_500.0,
                "start_location_id": 60_003_760,
                "end_location_id": 60_008_494
            }
        ]))
        .unwrap();

        let incoming: Vec<NewContract> = page.iter().map(map_contract).collect();
        let plan = merge::plan_upsert(&HashMap::new(), &incoming, |c| c.contract_id);
        assert_eq!(plan.create.len(), 3);
        assert!(plan.obsolete.is_empty());

        let auction = plan.create.iter().find(|c| c.contract_id == 100_000_002).unwrap();
        assert_eq!(auction.buyout, Some(200_000_000.0));
        assert_eq!(auction.contract_type, "auction");
        let courier = plan.create.iter().find(|c| c.contract_id == 100_000_003).unwrap();
        assert_eq!(courier.collateral, Some(80_000_000.0));
        assert_eq!(courier.title, "");
    }

    #[test]
    fn blueprint_copies_are_flagged_from_raw_quantity() {
        let mapped = map_item(&EsiContractItem {
            record_id: 1,
            type_id: 691,
            quantity: 1,
            raw_quantity: Some(-2),
            is_included: true,
            is_singleton: false,
        });
        assert!(mapped.is_blueprint_copy());
    }
}
