//! Contract models: contracts plus their items and bids.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `character_contracts` table.
///
/// Contracts age out of the remote view after completion but must stay
/// auditable, so rows are upserted and never deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterContract {
    pub id: DbId,
    pub character_id: DbId,
    pub contract_id: EveId,
    pub acceptor_id: Option<EveId>,
    pub assignee_id: Option<EveId>,
    pub availability: String,
    pub buyout: Option<f64>,
    pub collateral: Option<f64>,
    pub contract_type: String,
    pub date_accepted: Option<Timestamp>,
    pub date_completed: Option<Timestamp>,
    pub date_expired: Timestamp,
    pub date_issued: Timestamp,
    pub days_to_complete: Option<i32>,
    pub end_location_id: Option<EveId>,
    pub for_corporation: bool,
    pub issuer_corporation_id: EveId,
    pub issuer_id: EveId,
    pub price: Option<f64>,
    pub reward: Option<f64>,
    pub start_location_id: Option<EveId>,
    pub status: String,
    pub title: String,
    pub volume: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CharacterContract {
    /// The diffable view of this row, for merge planning.
    pub fn as_new(&self) -> NewContract {
        NewContract {
            contract_id: self.contract_id,
            acceptor_id: self.acceptor_id,
            assignee_id: self.assignee_id,
            availability: self.availability.clone(),
            buyout: self.buyout,
            collateral: self.collateral,
            contract_type: self.contract_type.clone(),
            date_accepted: self.date_accepted,
            date_completed: self.date_completed,
            date_expired: self.date_expired,
            date_issued: self.date_issued,
            days_to_complete: self.days_to_complete,
            end_location_id: self.end_location_id,
            for_corporation: self.for_corporation,
            issuer_corporation_id: self.issuer_corporation_id,
            issuer_id: self.issuer_id,
            price: self.price,
            reward: self.reward,
            start_location_id: self.start_location_id,
            status: self.status.clone(),
            title: self.title.clone(),
            volume: self.volume,
        }
    }
}

/// DTO for upserting one contract.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContract {
    pub contract_id: EveId,
    pub acceptor_id: Option<EveId>,
    pub assignee_id: Option<EveId>,
    pub availability: String,
    pub buyout: Option<f64>,
    pub collateral: Option<f64>,
    pub contract_type: String,
    pub date_accepted: Option<Timestamp>,
    pub date_completed: Option<Timestamp>,
    pub date_expired: Timestamp,
    pub date_issued: Timestamp,
    pub days_to_complete: Option<i32>,
    pub end_location_id: Option<EveId>,
    pub for_corporation: bool,
    pub issuer_corporation_id: EveId,
    pub issuer_id: EveId,
    pub price: Option<f64>,
    pub reward: Option<f64>,
    pub start_location_id: Option<EveId>,
    pub status: String,
    pub title: String,
    pub volume: Option<f64>,
}

/// A row from the `character_contract_items` table. Items are fetched
/// once when a contract first appears; they never change afterwards.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContractItem {
    pub id: DbId,
    pub contract_pk: DbId,
    pub record_id: EveId,
    pub is_included: bool,
    pub is_singleton: bool,
    pub quantity: i32,
    /// `-2` marks a blueprint copy.
    pub raw_quantity: Option<i32>,
    pub type_id: EveId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one contract item.
#[derive(Debug, Clone)]
pub struct NewContractItem {
    pub record_id: EveId,
    pub is_included: bool,
    pub is_singleton: bool,
    pub quantity: i32,
    pub raw_quantity: Option<i32>,
    pub type_id: EveId,
}

impl NewContractItem {
    /// ESI encodes blueprint copies as `raw_quantity == -2`.
    pub fn is_blueprint_copy(&self) -> bool {
        self.raw_quantity == Some(-2)
    }
}

/// A row from the `character_contract_bids` table. Bids are an
/// append-only ledger keyed by ESI's bid id.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContractBid {
    pub id: DbId,
    pub contract_pk: DbId,
    pub bid_id: EveId,
    pub amount: f64,
    pub bidder_id: EveId,
    pub date_bid: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one auction bid.
#[derive(Debug, Clone)]
pub struct NewContractBid {
    pub bid_id: EveId,
    pub amount: f64,
    pub bidder_id: EveId,
    pub date_bid: Timestamp,
}
