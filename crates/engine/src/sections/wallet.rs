//! Wallet sections: the live balance and the append-only journal.

use std::collections::HashSet;

use pilotwatch_core::merge;
use pilotwatch_core::types::EveId;
use pilotwatch_db::models::wallet::NewWalletJournalEntry;
use pilotwatch_db::repositories::wallet_repo::WalletRepo;
use pilotwatch_esi::records::EsiWalletJournalEntry;

use crate::error::UpdateError;
use crate::resolver;
use crate::sections::UpdateContext;

pub async fn update_balance(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;
    let balance = ctx.esi.wallet_balance(ctx.character.character_id, token).await?;
    WalletRepo::upsert_balance(ctx.pool, ctx.character.id, balance).await?;
    tracing::debug!(
        character_id = ctx.character.character_id,
        balance,
        "Stored wallet balance"
    );
    Ok(())
}

/// Pull the journal and append entries not seen before. ESI only
/// serves roughly the last month, so stored entries outlive the remote
/// window and are never touched again.
pub async fn update_journal(ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let token = ctx.auth_token()?;
    let entries = ctx.esi.wallet_journal(ctx.character.character_id, token).await?;
    let incoming: Vec<NewWalletJournalEntry> = entries.iter().map(map_entry).collect();

    let existing: HashSet<EveId> = WalletRepo::existing_entry_ids(ctx.pool, ctx.character.id)
        .await?
        .into_iter()
        .collect();
    let plan = merge::plan_append(&existing, &incoming, |e| e.entry_id);
    if plan.create.is_empty() {
        tracing::debug!(character_id = ctx.character.character_id, "Journal unchanged");
        return Ok(());
    }

    let parties: Vec<EveId> = plan
        .create
        .iter()
        .flat_map(|e| [e.first_party_id, e.second_party_id, e.tax_receiver_id])
        .flatten()
        .collect();

    let inserted =
        WalletRepo::insert_journal_entries(ctx.pool, ctx.character.id, &plan.create).await?;
    tracing::info!(
        character_id = ctx.character.character_id,
        inserted,
        "Stored journal entries"
    );
    resolver::ensure_entities(ctx.pool, ctx.esi, &parties).await?;
    Ok(())
}

fn map_entry(entry: &EsiWalletJournalEntry) -> NewWalletJournalEntry {
    NewWalletJournalEntry {
        entry_id: entry.id,
        amount: entry.amount,
        balance: entry.balance,
        context_id: entry.context_id,
        context_id_type: entry.context_id_type.clone(),
        date: entry.date,
        description: entry.description.clone(),
        first_party_id: entry.first_party_id,
        second_party_id: entry.second_party_id,
        reason: entry.reason.clone().unwrap_or_default(),
        ref_type: entry.ref_type.clone(),
        tax: entry.tax,
        tax_receiver_id: entry.tax_receiver_id,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn entry(id: EveId) -> EsiWalletJournalEntry {
        EsiWalletJournalEntry {
            id,
            ref_type: "bounty_prizes".into(),
            date: Utc.with_ymd_and_hms(2024, 2, 10, 18, 4, 0).unwrap(),
            description: "Bounty prizes".into(),
            amount: Some(1_250_000.5),
            balance: Some(2_000_000_000.0),
            first_party_id: Some(92_000_001),
            second_party_id: Some(95_000_002),
            tax: None,
            tax_receiver_id: None,
            context_id: Some(30_000_142),
            context_id_type: Some("system_id".into()),
            reason: None,
        }
    }

    #[test]
    fn only_unseen_entries_are_appended() {
        let incoming: Vec<NewWalletJournalEntry> =
            [entry(1), entry(2), entry(3)].iter().map(map_entry).collect();
        let existing: HashSet<EveId> = [1, 2].into_iter().collect();
        let plan = merge::plan_append(&existing, &incoming, |e| e.entry_id);
        assert_eq!(plan.create.len(), 1);
        assert_eq!(plan.create[0].entry_id, 3);
    }

    #[test]
    fn missing_reason_maps_to_empty_string() {
        let mapped = map_entry(&entry(9));
        assert_eq!(mapped.reason, "");
        assert_eq!(mapped.entry_id, 9);
        assert_eq!(mapped.amount, Some(1_250_000.5));
    }
}
