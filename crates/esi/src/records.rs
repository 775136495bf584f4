//! Deserialization targets for ESI endpoint payloads.
//!
//! Fields mirror the upstream JSON names; optional upstream fields are
//! `Option` or `#[serde(default)]` so a missing key never fails a whole
//! section fetch.

use pilotwatch_core::{EveId, Timestamp};
use serde::Deserialize;

// ── Character ───────────────────────────────────────────────────────────────

/// `GET /characters/{character_id}/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiCharacter {
    pub name: String,
    pub corporation_id: EveId,
    pub alliance_id: Option<EveId>,
    pub faction_id: Option<EveId>,
    pub birthday: Timestamp,
    pub gender: String,
    pub race_id: i32,
    pub bloodline_id: i32,
    #[serde(default)]
    pub description: Option<String>,
    pub security_status: Option<f64>,
    pub title: Option<String>,
}

/// `GET /characters/{character_id}/corporationhistory/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiCorporationHistoryEntry {
    pub record_id: EveId,
    pub corporation_id: EveId,
    #[serde(default)]
    pub is_deleted: bool,
    pub start_date: Timestamp,
}

// ── Assets ──────────────────────────────────────────────────────────────────

/// `GET /characters/{character_id}/assets/` (paged)
#[derive(Debug, Clone, Deserialize)]
pub struct EsiAsset {
    pub item_id: EveId,
    pub type_id: EveId,
    pub location_id: EveId,
    pub location_type: String,
    pub location_flag: String,
    pub quantity: i32,
    pub is_singleton: bool,
    #[serde(default)]
    pub is_blueprint_copy: bool,
}

/// `POST /characters/{character_id}/assets/names/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiAssetName {
    pub item_id: EveId,
    pub name: String,
}

// ── Contacts ────────────────────────────────────────────────────────────────

/// `GET /characters/{character_id}/contacts/` (paged)
#[derive(Debug, Clone, Deserialize)]
pub struct EsiContact {
    pub contact_id: EveId,
    pub contact_type: String,
    pub standing: f64,
    #[serde(default)]
    pub is_blocked: Option<bool>,
    #[serde(default)]
    pub is_watched: Option<bool>,
    #[serde(default)]
    pub label_ids: Vec<EveId>,
}

/// `GET /characters/{character_id}/contacts/labels/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiContactLabel {
    pub label_id: EveId,
    pub label_name: String,
}

// ── Contracts ───────────────────────────────────────────────────────────────

/// `GET /characters/{character_id}/contracts/` (paged)
#[derive(Debug, Clone, Deserialize)]
pub struct EsiContract {
    pub contract_id: EveId,
    #[serde(rename = "type")]
    pub contract_type: String,
    pub status: String,
    pub availability: String,
    pub issuer_id: EveId,
    pub issuer_corporation_id: EveId,
    pub assignee_id: Option<EveId>,
    pub acceptor_id: Option<EveId>,
    pub date_issued: Timestamp,
    pub date_expired: Timestamp,
    pub date_accepted: Option<Timestamp>,
    pub date_completed: Option<Timestamp>,
    pub days_to_complete: Option<i32>,
    pub for_corporation: bool,
    pub start_location_id: Option<EveId>,
    pub end_location_id: Option<EveId>,
    pub price: Option<f64>,
    pub reward: Option<f64>,
    pub collateral: Option<f64>,
    pub buyout: Option<f64>,
    pub volume: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
}

/// `GET /characters/{character_id}/contracts/{contract_id}/items/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiContractItem {
    pub record_id: EveId,
    pub type_id: EveId,
    pub quantity: i32,
    pub raw_quantity: Option<i32>,
    pub is_included: bool,
    pub is_singleton: bool,
}

/// `GET /characters/{character_id}/contracts/{contract_id}/bids/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiContractBid {
    pub bid_id: EveId,
    pub bidder_id: EveId,
    pub amount: f64,
    pub date_bid: Timestamp,
}

// ── Clones and implants ─────────────────────────────────────────────────────

/// `GET /characters/{character_id}/clones/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiClones {
    pub home_location: Option<EsiHomeLocation>,
    #[serde(default)]
    pub jump_clones: Vec<EsiJumpClone>,
    pub last_clone_jump_date: Option<Timestamp>,
    pub last_station_change_date: Option<Timestamp>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsiHomeLocation {
    pub location_id: Option<EveId>,
    pub location_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsiJumpClone {
    pub jump_clone_id: EveId,
    pub location_id: EveId,
    pub location_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub implants: Vec<EveId>,
}

// ── Presence ────────────────────────────────────────────────────────────────

/// `GET /characters/{character_id}/location/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiLocation {
    pub solar_system_id: EveId,
    pub station_id: Option<EveId>,
    pub structure_id: Option<EveId>,
}

/// `GET /characters/{character_id}/online/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiOnline {
    pub online: bool,
    pub last_login: Option<Timestamp>,
    pub last_logout: Option<Timestamp>,
    pub logins: Option<i32>,
}

// ── Loyalty ─────────────────────────────────────────────────────────────────

/// `GET /characters/{character_id}/loyalty/points/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiLoyaltyEntry {
    pub corporation_id: EveId,
    pub loyalty_points: i64,
}

// ── Mail ────────────────────────────────────────────────────────────────────

/// `GET /characters/{character_id}/mail/labels/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiMailLabels {
    #[serde(default)]
    pub labels: Vec<EsiMailLabel>,
    pub total_unread_count: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsiMailLabel {
    pub label_id: EveId,
    pub name: Option<String>,
    pub color: Option<String>,
    pub unread_count: Option<i32>,
}

/// `GET /characters/{character_id}/mail/lists/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiMailingList {
    pub mailing_list_id: EveId,
    pub name: String,
}

/// `GET /characters/{character_id}/mail/` (one page of up to 50 headers)
///
/// Every field is optional upstream; headers without a `mail_id` are
/// skipped by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct EsiMailHeader {
    pub mail_id: Option<EveId>,
    pub from: Option<EveId>,
    pub subject: Option<String>,
    pub timestamp: Option<Timestamp>,
    pub is_read: Option<bool>,
    #[serde(default)]
    pub labels: Vec<EveId>,
    #[serde(default)]
    pub recipients: Vec<EsiMailRecipient>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct EsiMailRecipient {
    pub recipient_id: EveId,
    pub recipient_type: String,
}

/// `GET /characters/{character_id}/mail/{mail_id}/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiMailBody {
    pub body: Option<String>,
}

// ── Skills ──────────────────────────────────────────────────────────────────

/// `GET /characters/{character_id}/skills/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiSkills {
    #[serde(default)]
    pub skills: Vec<EsiSkill>,
    pub total_sp: i64,
    pub unallocated_sp: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EsiSkill {
    pub skill_id: EveId,
    pub active_skill_level: i32,
    pub trained_skill_level: i32,
    pub skillpoints_in_skill: i64,
}

/// `GET /characters/{character_id}/skillqueue/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiSkillQueueEntry {
    pub skill_id: EveId,
    pub queue_position: i32,
    pub finished_level: i32,
    pub start_date: Option<Timestamp>,
    pub finish_date: Option<Timestamp>,
    pub level_start_sp: Option<i32>,
    pub level_end_sp: Option<i32>,
    pub training_start_sp: Option<i32>,
}

// ── Wallet ──────────────────────────────────────────────────────────────────

/// `GET /characters/{character_id}/wallet/journal/` (paged)
#[derive(Debug, Clone, Deserialize)]
pub struct EsiWalletJournalEntry {
    pub id: EveId,
    pub ref_type: String,
    pub date: Timestamp,
    #[serde(default)]
    pub description: String,
    pub amount: Option<f64>,
    pub balance: Option<f64>,
    pub first_party_id: Option<EveId>,
    pub second_party_id: Option<EveId>,
    pub tax: Option<f64>,
    pub tax_receiver_id: Option<EveId>,
    pub context_id: Option<EveId>,
    pub context_id_type: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

// ── Universe ────────────────────────────────────────────────────────────────

/// `POST /universe/names/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiName {
    pub id: EveId,
    pub category: String,
    pub name: String,
}

/// `GET /universe/stations/{station_id}/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiStation {
    pub name: String,
    pub system_id: EveId,
    pub owner: Option<EveId>,
    pub type_id: Option<EveId>,
}

/// `GET /universe/systems/{system_id}/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiSolarSystem {
    pub name: String,
}

/// `GET /universe/structures/{structure_id}/` (authenticated)
#[derive(Debug, Clone, Deserialize)]
pub struct EsiStructure {
    pub name: String,
    pub owner_id: EveId,
    pub solar_system_id: Option<EveId>,
    pub type_id: Option<EveId>,
}

/// `GET /markets/prices/`
#[derive(Debug, Clone, Deserialize)]
pub struct EsiMarketPrice {
    pub type_id: EveId,
    pub adjusted_price: Option<f64>,
    pub average_price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_defaults_blueprint_copy_flag() {
        let asset: EsiAsset = serde_json::from_value(serde_json::json!({
            "item_id": 1_000_000_016_835i64,
            "type_id": 3516,
            "location_id": 60003760,
            "location_type": "station",
            "location_flag": "Hangar",
            "quantity": 1,
            "is_singleton": true
        }))
        .unwrap();
        assert!(!asset.is_blueprint_copy);
    }

    #[test]
    fn contract_type_field_is_renamed() {
        let contract: EsiContract = serde_json::from_value(serde_json::json!({
            "contract_id": 42,
            "type": "courier",
            "status": "outstanding",
            "availability": "personal",
            "issuer_id": 95_000_001,
            "issuer_corporation_id": 98_000_001,
            "assignee_id": 95_000_002,
            "acceptor_id": null,
            "date_issued": "2026-08-01T12:00:00Z",
            "date_expired": "2026-08-15T12:00:00Z",
            "for_corporation": false
        }))
        .unwrap();
        assert_eq!(contract.contract_type, "courier");
        assert_eq!(contract.acceptor_id, None);
        assert!(contract.title.is_none());
    }

    #[test]
    fn mail_header_tolerates_missing_fields() {
        let header: EsiMailHeader = serde_json::from_value(serde_json::json!({
            "mail_id": 7,
            "subject": "o7"
        }))
        .unwrap();
        assert_eq!(header.mail_id, Some(7));
        assert!(header.labels.is_empty());
        assert!(header.recipients.is_empty());
        assert_eq!(header.is_read, None);
    }

    #[test]
    fn clones_without_home_location() {
        let clones: EsiClones = serde_json::from_value(serde_json::json!({
            "jump_clones": [
                {
                    "jump_clone_id": 12022,
                    "location_id": 60003463,
                    "location_type": "station",
                    "implants": [22118]
                }
            ]
        }))
        .unwrap();
        assert!(clones.home_location.is_none());
        assert_eq!(clones.jump_clones.len(), 1);
        assert_eq!(clones.jump_clones[0].implants, vec![22118]);
    }
}
