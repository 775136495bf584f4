//! Repository for the `character_wallet_balance` and
//! `character_wallet_journal` tables.

use pilotwatch_core::types::{DbId, EveId};
use sqlx::PgPool;

use crate::models::wallet::{CharacterWalletBalance, NewWalletJournalEntry, WalletJournalEntry};

/// Column list for `character_wallet_balance` queries.
const BALANCE_COLUMNS: &str = "id, character_id, balance, created_at, updated_at";

/// Column list for `character_wallet_journal` queries.
const JOURNAL_COLUMNS: &str = "id, character_id, entry_id, amount, balance, context_id, \
    context_id_type, date, description, first_party_id, second_party_id, reason, \
    ref_type, tax, tax_receiver_id, created_at, updated_at";

/// Column list for journal INSERT statements.
const JOURNAL_INSERT_COLUMNS: &str = "character_id, entry_id, amount, balance, context_id, \
    context_id_type, date, description, first_party_id, second_party_id, reason, \
    ref_type, tax, tax_receiver_id";

/// Bind parameters per journal row in a multi-row INSERT.
const JOURNAL_PARAMS_PER_ROW: u32 = 14;

/// Provides balance upserts and append-only journal writes.
pub struct WalletRepo;

impl WalletRepo {
    /// Load the stored wallet balance, if any.
    pub async fn find_balance(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Option<CharacterWalletBalance>, sqlx::Error> {
        let query = format!(
            "SELECT {BALANCE_COLUMNS} FROM character_wallet_balance WHERE character_id = $1"
        );
        sqlx::query_as::<_, CharacterWalletBalance>(&query)
            .bind(character_id)
            .fetch_optional(pool)
            .await
    }

    /// Upsert the wallet balance. One row per character.
    pub async fn upsert_balance(
        pool: &PgPool,
        character_id: DbId,
        balance: f64,
    ) -> Result<CharacterWalletBalance, sqlx::Error> {
        let query = format!(
            "INSERT INTO character_wallet_balance (character_id, balance)
             VALUES ($1, $2)
             ON CONFLICT (character_id) DO UPDATE SET balance = EXCLUDED.balance
             RETURNING {BALANCE_COLUMNS}"
        );
        sqlx::query_as::<_, CharacterWalletBalance>(&query)
            .bind(character_id)
            .bind(balance)
            .fetch_one(pool)
            .await
    }

    /// Journal entry ids already on the ledger; the append planner
    /// filters against these.
    pub async fn existing_entry_ids(
        pool: &PgPool,
        character_id: DbId,
    ) -> Result<Vec<EveId>, sqlx::Error> {
        let rows: Vec<(EveId,)> = sqlx::query_as(
            "SELECT entry_id FROM character_wallet_journal WHERE character_id = $1",
        )
        .bind(character_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// List journal entries newest first.
    pub async fn list_journal(
        pool: &PgPool,
        character_id: DbId,
        limit: i64,
    ) -> Result<Vec<WalletJournalEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {JOURNAL_COLUMNS} FROM character_wallet_journal \
             WHERE character_id = $1 ORDER BY date DESC LIMIT $2"
        );
        sqlx::query_as::<_, WalletJournalEntry>(&query)
            .bind(character_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Append journal entries with a single multi-row INSERT. Entries
    /// already on the ledger are skipped, never rewritten.
    pub async fn insert_journal_entries(
        pool: &PgPool,
        character_id: DbId,
        entries: &[NewWalletJournalEntry],
    ) -> Result<u64, sqlx::Error> {
        if entries.is_empty() {
            return Ok(0);
        }

        // Build a multi-row VALUES clause.
        let mut query =
            format!("INSERT INTO character_wallet_journal ({JOURNAL_INSERT_COLUMNS}) VALUES ");
        let mut param_idx = 1u32;
        for (i, _) in entries.iter().enumerate() {
            if i > 0 {
                query.push_str(", ");
            }
            query.push('(');
            for j in 0..JOURNAL_PARAMS_PER_ROW {
                if j > 0 {
                    query.push_str(", ");
                }
                query.push('$');
                query.push_str(&param_idx.to_string());
                param_idx += 1;
            }
            query.push(')');
        }
        query.push_str(" ON CONFLICT (character_id, entry_id) DO NOTHING");

        let mut q = sqlx::query(&query);
        for entry in entries {
            q = q
                .bind(character_id)
                .bind(entry.entry_id)
                .bind(entry.amount)
                .bind(entry.balance)
                .bind(entry.context_id)
                .bind(&entry.context_id_type)
                .bind(entry.date)
                .bind(&entry.description)
                .bind(entry.first_party_id)
                .bind(entry.second_party_id)
                .bind(&entry.reason)
                .bind(&entry.ref_type)
                .bind(entry.tax)
                .bind(entry.tax_receiver_id);
        }

        let result = q.execute(pool).await?;
        Ok(result.rows_affected())
    }
}
