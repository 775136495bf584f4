//! Bulk resolution of opaque EVE ids into named entities.
//!
//! Sections collect every id their payloads reference (issuers,
//! recipients, corporations, item types) and pass them through
//! [`ensure_entities`] before writing rows, so views can always join a
//! name. Resolution is incremental: ids already stored are never asked
//! about again.

use std::collections::HashSet;

use pilotwatch_core::types::EveId;
use pilotwatch_db::models::universe::NewEveEntity;
use pilotwatch_db::repositories::entity_repo::EveEntityRepo;
use pilotwatch_esi::records::EsiName;
use pilotwatch_esi::{EsiClient, EsiError};
use sqlx::PgPool;

use crate::error::UpdateError;

/// ESI accepts at most this many ids per `/universe/names/` call.
const NAMES_CHUNK_SIZE: usize = 1000;

/// Make sure every given id has an `eve_entities` row, resolving
/// unknown ones through `/universe/names/`. Returns how many new
/// entities were stored.
///
/// Ids ESI refuses to name (deleted characters, long-gone structures)
/// are dropped with a warning; the rest of the batch still resolves.
pub async fn ensure_entities(
    pool: &PgPool,
    esi: &EsiClient,
    ids: &[EveId],
) -> Result<usize, UpdateError> {
    let unique = normalize_ids(ids);
    if unique.is_empty() {
        return Ok(0);
    }
    let known: HashSet<EveId> = EveEntityRepo::existing_ids(pool, &unique)
        .await?
        .into_iter()
        .collect();
    let missing: Vec<EveId> = unique.into_iter().filter(|id| !known.contains(id)).collect();
    if missing.is_empty() {
        return Ok(0);
    }

    let mut stored = 0usize;
    for chunk in missing.chunks(NAMES_CHUNK_SIZE) {
        let names = resolve_chunk(esi, chunk).await?;
        let entities: Vec<NewEveEntity> = names
            .into_iter()
            .map(|n| NewEveEntity {
                id: n.id,
                name: n.name,
                category: n.category,
            })
            .collect();
        EveEntityRepo::upsert_many(pool, &entities).await?;
        stored += entities.len();
    }
    if stored > 0 {
        tracing::debug!(stored, "Resolved new entities");
    }
    Ok(stored)
}

/// Resolve one chunk, bisecting around ids ESI rejects.
///
/// `/universe/names/` 404s the whole request when any single id is
/// unknown, so a failing batch is split in half until the offenders are
/// isolated and dropped.
async fn resolve_chunk(esi: &EsiClient, ids: &[EveId]) -> Result<Vec<EsiName>, UpdateError> {
    let mut resolved = Vec::new();
    let mut work: Vec<Vec<EveId>> = vec![ids.to_vec()];
    while let Some(batch) = work.pop() {
        match esi.universe_names(&batch).await {
            Ok(mut names) => resolved.append(&mut names),
            Err(EsiError::NotFound) => match bisect(&batch) {
                Some((left, right)) => {
                    work.push(left);
                    work.push(right);
                }
                None => {
                    tracing::warn!(id = batch[0], "Id not resolvable, skipping");
                }
            },
            Err(err) => return Err(err.into()),
        }
    }
    Ok(resolved)
}

/// Split a rejected batch into two halves for retry. A single id is
/// the offender itself and cannot be split further.
fn bisect(batch: &[EveId]) -> Option<(Vec<EveId>, Vec<EveId>)> {
    if batch.len() < 2 {
        return None;
    }
    let mid = batch.len() / 2;
    Some((batch[..mid].to_vec(), batch[mid..].to_vec()))
}

/// Sort, dedup and drop non-positive ids. Zero is the sentinel some
/// payloads use for "nobody".
fn normalize_ids(ids: &[EveId]) -> Vec<EveId> {
    let mut unique: Vec<EveId> = ids.iter().copied().filter(|id| *id > 0).collect();
    unique.sort_unstable();
    unique.dedup();
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_sentinels_and_duplicates() {
        let ids = vec![98_000_001, 0, 95_000_001, 98_000_001, -1, 95_000_001];
        assert_eq!(normalize_ids(&ids), vec![95_000_001, 98_000_001]);
    }

    #[test]
    fn normalize_of_empty_input_is_empty() {
        assert!(normalize_ids(&[]).is_empty());
    }

    #[test]
    fn bisect_splits_without_losing_ids() {
        let (left, right) = bisect(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(left, vec![1, 2]);
        assert_eq!(right, vec![3, 4, 5]);
    }

    #[test]
    fn single_ids_are_terminal() {
        assert!(bisect(&[42]).is_none());
    }

    #[test]
    fn repeated_bisection_isolates_every_id() {
        let mut work = vec![vec![10, 20, 30, 40]];
        let mut singles = Vec::new();
        while let Some(batch) = work.pop() {
            match bisect(&batch) {
                Some((left, right)) => {
                    work.push(left);
                    work.push(right);
                }
                None => singles.push(batch[0]),
            }
        }
        singles.sort_unstable();
        assert_eq!(singles, vec![10, 20, 30, 40]);
    }
}
