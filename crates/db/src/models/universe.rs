//! Shared universe reference models: resolved locations, named
//! entities and market prices. These tables are keyed by EVE ids, not
//! serial primary keys, and are shared across all characters.

use pilotwatch_core::types::{EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `locations` table: a station, solar system or player
/// structure assets and clones can sit in.
///
/// When a structure cannot be fetched (no docking rights, torn down),
/// a placeholder row with an empty name is stored instead so asset
/// trees still have something to hang from.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Location {
    pub id: EveId,
    pub name: String,
    pub solar_system_id: Option<EveId>,
    pub owner_id: Option<EveId>,
    pub type_id: Option<EveId>,
    /// `station`, `solar_system`, `structure` or `unknown`.
    pub location_kind: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for upserting a resolved (or placeholder) location.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub id: EveId,
    pub name: String,
    pub solar_system_id: Option<EveId>,
    pub owner_id: Option<EveId>,
    pub type_id: Option<EveId>,
    pub location_kind: String,
}

/// A row from the `eve_entities` table: a bulk-resolved id/name pair
/// (characters, corporations, alliances, types, ...).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EveEntity {
    pub id: EveId,
    pub name: String,
    pub category: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one resolved entity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEveEntity {
    pub id: EveId,
    pub name: String,
    pub category: String,
}

/// A row from the `market_prices` table, refreshed globally on its own
/// cadence.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MarketPrice {
    pub type_id: EveId,
    pub adjusted_price: Option<f64>,
    pub average_price: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one market price.
#[derive(Debug, Clone)]
pub struct NewMarketPrice {
    pub type_id: EveId,
    pub adjusted_price: Option<f64>,
    pub average_price: Option<f64>,
}
