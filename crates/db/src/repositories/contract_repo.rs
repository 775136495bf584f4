//! Repository for the `character_contracts`, `character_contract_items`
//! and `character_contract_bids` tables.

use pilotwatch_core::types::{DbId, EveId};
use sqlx::PgPool;

use crate::models::contract::{
    CharacterContract, ContractBid, ContractItem, NewContract, NewContractBid, NewContractItem,
};

/// Column list for `character_contracts` queries.
const CONTRACT_COLUMNS: &str = "id, character_id, contract_id, acceptor_id, assignee_id, \
    availability, buyout, collateral, contract_type, date_accepted, date_completed, \
    date_expired, date_issued, days_to_complete, end_location_id, for_corporation, \
    issuer_corporation_id, issuer_id, price, reward, start_location_id, status, title, \
    volume, created_at, updated_at";

/// Column list for `character_contract_items` queries.
const ITEM_COLUMNS: &str = "id, contract_pk, record_id, is_included, is_singleton, \
    quantity, raw_quantity, type_id, created_at, updated_at";

/// Column list for `character_contract_bids` queries.
const BID_COLUMNS: &str =
    "id, contract_pk, bid_id, amount, bidder_id, date_bid, created_at, updated_at";

/// Provides upsert-only contract writes plus their items and bids.
pub struct ContractRepo;

impl ContractRepo {
    // ── Contracts ────────────────────────────────────────────────────

    /// Load all stored contracts for a character.
    pub async fn list_for_character(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<CharacterContract>, sqlx::Error> {
        let query = format!(
            "SELECT {CONTRACT_COLUMNS} FROM character_contracts \
             WHERE character_id = $1 ORDER BY date_issued"
        );
        sqlx::query_as::<_, CharacterContract>(&query)
            .bind(character_id)
            .fetch_all(pool)
            .await
    }

    /// Upsert contracts. Rows are never deleted: contracts that age
    /// out of the remote view stay on record.
    pub async fn upsert_contracts(
        pool: &PgPool,
        character_id: DbId,
        contracts: &[NewContract],
    ) -> Result<(), sqlx::Error> {
        if contracts.is_empty() {
            return Ok(());
        }
        let mut tx = pool.begin().await?;
        for contract in contracts {
            sqlx::query(
                "INSERT INTO character_contracts
                    (character_id, contract_id, acceptor_id, assignee_id, availability,
                     buyout, collateral, contract_type, date_accepted, date_completed,
                     date_expired, date_issued, days_to_complete, end_location_id,
                     for_corporation, issuer_corporation_id, issuer_id, price, reward,
                     start_location_id, status, title, volume)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                         $15, $16, $17, $18, $19, $20, $21, $22, $23)
                 ON CONFLICT (character_id, contract_id) DO UPDATE
                     SET acceptor_id = EXCLUDED.acceptor_id,
                         date_accepted = EXCLUDED.date_accepted,
                         date_completed = EXCLUDED.date_completed,
                         status = EXCLUDED.status,
                         price = EXCLUDED.price,
                         buyout = EXCLUDED.buyout",
            )
            .bind(character_id)
            .bind(contract.contract_id)
            .bind(contract.acceptor_id)
            .bind(contract.assignee_id)
            .bind(&contract.availability)
            .bind(contract.buyout)
            .bind(contract.collateral)
            .bind(&contract.contract_type)
            .bind(contract.date_accepted)
            .bind(contract.date_completed)
            .bind(contract.date_expired)
            .bind(contract.date_issued)
            .bind(contract.days_to_complete)
            .bind(contract.end_location_id)
            .bind(contract.for_corporation)
            .bind(contract.issuer_corporation_id)
            .bind(contract.issuer_id)
            .bind(contract.price)
            .bind(contract.reward)
            .bind(contract.start_location_id)
            .bind(&contract.status)
            .bind(&contract.title)
            .bind(contract.volume)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Map of contract id to internal primary key for a character, for
    /// attaching items and bids.
    pub async fn contract_pks(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<(EveId, DbId)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT contract_id, id FROM character_contracts WHERE character_id = $1",
        )
        .bind(character_id)
        .fetch_all(pool)
        .await
    }

    // ── Items ────────────────────────────────────────────────────────

    /// Load the items of one contract.
    pub async fn list_items(
        pool: &PgPool,
        contract_pk: DbId,
    ) -> Result<Vec<ContractItem>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM character_contract_items \
             WHERE contract_pk = $1 ORDER BY record_id"
        );
        sqlx::query_as::<_, ContractItem>(&query)
            .bind(contract_pk)
            .fetch_all(pool)
            .await
    }

    /// Whether a contract already has items stored. Items are fetched
    /// once when the contract first appears.
    pub async fn has_items(pool: &PgPool, contract_pk: DbId) -> Result<bool, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM character_contract_items WHERE contract_pk = $1",
        )
        .bind(contract_pk)
        .fetch_one(pool)
        .await?;
        Ok(row.0 > 0)
    }

    /// Insert the items of a newly seen contract. Re-inserting an
    /// already-stored record id is a no-op.
    pub async fn insert_items(
        pool: &PgPool,
        contract_pk: DbId,
        items: &[NewContractItem],
    ) -> Result<(), sqlx::Error> {
        if items.is_empty() {
            return Ok(());
        }
        let mut tx = pool.begin().await?;
        for item in items {
            sqlx::query(
                "INSERT INTO character_contract_items
                    (contract_pk, record_id, is_included, is_singleton, quantity,
                     raw_quantity, type_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (contract_pk, record_id) DO NOTHING",
            )
            .bind(contract_pk)
            .bind(item.record_id)
            .bind(item.is_included)
            .bind(item.is_singleton)
            .bind(item.quantity)
            .bind(item.raw_quantity)
            .bind(item.type_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ── Bids ─────────────────────────────────────────────────────────

    /// Load the bids of one contract.
    pub async fn list_bids(pool: &PgPool, contract_pk: DbId) -> Result<Vec<ContractBid>, sqlx::Error> {
        let query = format!(
            "SELECT {BID_COLUMNS} FROM character_contract_bids \
             WHERE contract_pk = $1 ORDER BY date_bid"
        );
        sqlx::query_as::<_, ContractBid>(&query)
            .bind(contract_pk)
            .fetch_all(pool)
            .await
    }

    /// Bid ids already stored for a contract; the append planner
    /// filters against these.
    pub async fn existing_bid_ids(
        pool: &PgPool,
        contract_pk: DbId,
    ) -> Result<Vec<EveId>, sqlx::Error> {
        let rows: Vec<(EveId,)> = sqlx::query_as(
            "SELECT bid_id FROM character_contract_bids WHERE contract_pk = $1",
        )
        .bind(contract_pk)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Append new auction bids. Stored bids are never updated.
    pub async fn insert_bids(
        pool: &PgPool,
        contract_pk: DbId,
        bids: &[NewContractBid],
    ) -> Result<(), sqlx::Error> {
        if bids.is_empty() {
            return Ok(());
        }
        let mut tx = pool.begin().await?;
        for bid in bids {
            sqlx::query(
                "INSERT INTO character_contract_bids
                    (contract_pk, bid_id, amount, bidder_id, date_bid)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (contract_pk, bid_id) DO NOTHING",
            )
            .bind(contract_pk)
            .bind(bid.bid_id)
            .bind(bid.amount)
            .bind(bid.bidder_id)
            .bind(bid.date_bid)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
