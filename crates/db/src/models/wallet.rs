//! Wallet models: current balance and the journal ledger.

use pilotwatch_core::types::{DbId, EveId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `character_wallet_balance` table. One row per
/// character, overwritten on every refresh.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterWalletBalance {
    pub id: DbId,
    pub character_id: DbId,
    pub balance: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `character_wallet_journal` table.
///
/// The journal is append-only: once written, an entry is never updated
/// or deleted, even if a later fetch reports different values for the
/// same `entry_id`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WalletJournalEntry {
    pub id: DbId,
    pub character_id: DbId,
    pub entry_id: EveId,
    pub amount: Option<f64>,
    pub balance: Option<f64>,
    pub context_id: Option<EveId>,
    pub context_id_type: Option<String>,
    pub date: Timestamp,
    pub description: String,
    pub first_party_id: Option<EveId>,
    pub second_party_id: Option<EveId>,
    pub reason: String,
    pub ref_type: String,
    pub tax: Option<f64>,
    pub tax_receiver_id: Option<EveId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one journal entry.
#[derive(Debug, Clone)]
pub struct NewWalletJournalEntry {
    pub entry_id: EveId,
    pub amount: Option<f64>,
    pub balance: Option<f64>,
    pub context_id: Option<EveId>,
    pub context_id_type: Option<String>,
    pub date: Timestamp,
    pub description: String,
    pub first_party_id: Option<EveId>,
    pub second_party_id: Option<EveId>,
    pub reason: String,
    pub ref_type: String,
    pub tax: Option<f64>,
    pub tax_receiver_id: Option<EveId>,
}
