//! Diff planning for syncing remote snapshots into stored rows.
//!
//! Every section update boils down to the same move: fetch a batch of
//! records, compare them against what is already stored under the same
//! natural key, and write only the difference. The three planners here
//! cover the table semantics in use:
//!
//! * [`plan_replace`]: the remote snapshot is authoritative; rows it
//!   no longer contains are obsolete (contacts, labels, skills, ...).
//! * [`plan_upsert`]: rows are created and updated but never deleted;
//!   the remote view ages out entries we still want to keep
//!   (contracts, corporation history).
//! * [`plan_append`]: an immutable ledger; existing rows are never
//!   touched (wallet journal, contract bids).
//!
//! All three are pure so the per-section write paths stay trivially
//! testable: a repeated run over unchanged data must produce an empty
//! plan, which is what makes whole-character updates idempotent.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// The writes a section update must perform, in natural-key terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan<K, V> {
    /// Incoming records with no stored counterpart.
    pub create: Vec<V>,
    /// Incoming records whose stored counterpart differs.
    pub update: Vec<V>,
    /// Stored keys absent from the incoming batch, sorted.
    pub obsolete: Vec<K>,
}

impl<K, V> MergePlan<K, V> {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.obsolete.is_empty()
    }

    /// Total number of rows the plan touches. Used for log lines.
    pub fn total_changes(&self) -> usize {
        self.create.len() + self.update.len() + self.obsolete.len()
    }
}

impl<K, V> Default for MergePlan<K, V> {
    fn default() -> Self {
        MergePlan {
            create: Vec::new(),
            update: Vec::new(),
            obsolete: Vec::new(),
        }
    }
}

/// Plan a full replacement: the incoming batch is the complete truth
/// and stored rows it does not mention are deleted.
///
/// Duplicate keys within `incoming` collapse to the last occurrence.
pub fn plan_replace<K, V, F>(existing: &HashMap<K, V>, incoming: &[V], key_of: F) -> MergePlan<K, V>
where
    K: Eq + Hash + Ord + Clone,
    V: PartialEq + Clone,
    F: Fn(&V) -> K,
{
    let mut plan = plan_upsert(existing, incoming, &key_of);
    let seen: HashSet<K> = incoming.iter().map(&key_of).collect();
    plan.obsolete = existing
        .keys()
        .filter(|k| !seen.contains(k))
        .cloned()
        .collect();
    plan.obsolete.sort_unstable();
    plan
}

/// Plan creates and updates only; stored rows never become obsolete.
pub fn plan_upsert<K, V, F>(existing: &HashMap<K, V>, incoming: &[V], key_of: F) -> MergePlan<K, V>
where
    K: Eq + Hash + Clone,
    V: PartialEq + Clone,
    F: Fn(&V) -> K,
{
    let mut latest: HashMap<K, &V> = HashMap::with_capacity(incoming.len());
    let mut order: Vec<K> = Vec::with_capacity(incoming.len());
    for value in incoming {
        let key = key_of(value);
        if latest.insert(key.clone(), value).is_none() {
            order.push(key);
        }
    }

    let mut plan = MergePlan::default();
    for key in order {
        let value = latest[&key];
        match existing.get(&key) {
            None => plan.create.push(value.clone()),
            Some(stored) if stored != value => plan.update.push(value.clone()),
            Some(_) => {}
        }
    }
    plan
}

/// Plan creates for keys never seen before; existing rows are left
/// untouched even when the incoming copy differs.
pub fn plan_append<K, V, F>(existing: &HashSet<K>, incoming: &[V], key_of: F) -> MergePlan<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
    F: Fn(&V) -> K,
{
    let mut plan = MergePlan::default();
    let mut seen: HashSet<K> = HashSet::with_capacity(incoming.len());
    for value in incoming {
        let key = key_of(value);
        if !existing.contains(&key) && seen.insert(key) {
            plan.create.push(value.clone());
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        id: i64,
        value: &'static str,
    }

    fn row(id: i64, value: &'static str) -> Row {
        Row { id, value }
    }

    fn stored(rows: Vec<Row>) -> HashMap<i64, Row> {
        rows.into_iter().map(|r| (r.id, r)).collect()
    }

    // ---- plan_replace ----

    #[test]
    fn replace_of_identical_data_is_empty() {
        let existing = stored(vec![row(1, "a"), row(2, "b")]);
        let incoming = vec![row(1, "a"), row(2, "b")];
        let plan = plan_replace(&existing, &incoming, |r| r.id);
        assert!(plan.is_empty());
        assert_eq!(plan.total_changes(), 0);
    }

    #[test]
    fn replace_detects_creates_updates_and_obsoletes() {
        let existing = stored(vec![row(1, "a"), row(2, "b"), row(3, "c")]);
        let incoming = vec![row(2, "b"), row(3, "changed"), row(4, "new")];
        let plan = plan_replace(&existing, &incoming, |r| r.id);

        assert_eq!(plan.create, vec![row(4, "new")]);
        assert_eq!(plan.update, vec![row(3, "changed")]);
        assert_eq!(plan.obsolete, vec![1]);
    }

    #[test]
    fn replace_with_empty_incoming_obsoletes_everything() {
        let existing = stored(vec![row(1, "a"), row(2, "b")]);
        let plan = plan_replace(&existing, &[], |r| r.id);
        assert!(plan.create.is_empty());
        assert!(plan.update.is_empty());
        assert_eq!(plan.obsolete, vec![1, 2]);
    }

    #[test]
    fn replace_collapses_duplicate_incoming_keys() {
        let existing = stored(vec![]);
        let incoming = vec![row(1, "first"), row(1, "second")];
        let plan = plan_replace(&existing, &incoming, |r| r.id);
        assert_eq!(plan.create, vec![row(1, "second")]);
    }

    // ---- plan_upsert ----

    #[test]
    fn upsert_never_obsoletes() {
        let existing = stored(vec![row(1, "a"), row(2, "b")]);
        let incoming = vec![row(2, "changed")];
        let plan = plan_upsert(&existing, &incoming, |r| r.id);

        assert!(plan.create.is_empty());
        assert_eq!(plan.update, vec![row(2, "changed")]);
        assert!(plan.obsolete.is_empty());
    }

    #[test]
    fn upsert_of_identical_data_is_empty() {
        let existing = stored(vec![row(1, "a")]);
        let plan = plan_upsert(&existing, &[row(1, "a")], |r| r.id);
        assert!(plan.is_empty());
    }

    // ---- plan_append ----

    #[test]
    fn append_skips_existing_keys_even_when_changed() {
        let existing: HashSet<i64> = [1, 2].into_iter().collect();
        let incoming = vec![row(1, "rewritten"), row(3, "new")];
        let plan = plan_append(&existing, &incoming, |r| r.id);

        assert_eq!(plan.create, vec![row(3, "new")]);
        assert!(plan.update.is_empty());
        assert!(plan.obsolete.is_empty());
    }

    #[test]
    fn append_dedupes_within_batch() {
        let existing = HashSet::new();
        let incoming = vec![row(5, "a"), row(5, "a")];
        let plan = plan_append(&existing, &incoming, |r| r.id);
        assert_eq!(plan.create.len(), 1);
    }

    #[test]
    fn append_of_already_seen_batch_is_empty() {
        let existing: HashSet<i64> = [7, 8, 9].into_iter().collect();
        let incoming = vec![row(7, "a"), row(8, "b"), row(9, "c")];
        let plan = plan_append(&existing, &incoming, |r| r.id);
        assert!(plan.is_empty());
    }
}
