//! Reconstruction of the asset containment forest from a flat snapshot.
//!
//! ESI returns a character's assets as one flat list in which an item's
//! `location_id` is either a real location (station, solar system,
//! structure) or the `item_id` of another asset (a container, a ship,
//! ...). [`AssetTree::build`] turns that list back into a forest:
//! root-adjacent items first, then waves of nested items, with anything
//! unresolvable reported as an orphan instead of failing the cycle.
//!
//! Nodes live in a flat arena keyed by item id with explicit parent /
//! root-location fields, so the result can be bulk-inserted level by
//! level without fighting ownership or self-referential rows.

use std::collections::{HashMap, HashSet};

use crate::error::CoreError;
use crate::types::EveId;

/// The location category ESI reports for an asset row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    Station,
    SolarSystem,
    Item,
    Other,
}

impl LocationKind {
    /// Parse the raw `location_type` string from an asset record.
    ///
    /// An unrecognised value is a data error that aborts the whole
    /// assets cycle: the tree's shape cannot be trusted without it.
    pub fn parse(raw: &str) -> Result<LocationKind, CoreError> {
        match raw {
            "station" => Ok(LocationKind::Station),
            "solar_system" => Ok(LocationKind::SolarSystem),
            "item" => Ok(LocationKind::Item),
            "other" => Ok(LocationKind::Other),
            other => Err(CoreError::Validation(format!(
                "Unknown asset location_type: \"{other}\""
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LocationKind::Station => "station",
            LocationKind::SolarSystem => "solar_system",
            LocationKind::Item => "item",
            LocationKind::Other => "other",
        }
    }
}

/// One flat asset record from the remote snapshot.
#[derive(Debug, Clone)]
pub struct AssetRecord {
    pub item_id: EveId,
    pub location_id: EveId,
    pub location_flag: String,
    pub location_type: String,
    /// Player-assigned name, if any. ESI occasionally reports the
    /// literal string `"None"` for unnamed items.
    pub name: Option<String>,
    pub quantity: i32,
    pub type_id: EveId,
    pub is_blueprint_copy: bool,
    pub is_singleton: bool,
}

/// A placed node in the reconstructed forest.
#[derive(Debug, Clone)]
pub struct AssetNode {
    pub item_id: EveId,
    /// `None` for root-adjacent items (directly in a station / system /
    /// structure), otherwise the containing asset's item id.
    pub parent_item_id: Option<EveId>,
    /// The top-level location this node ultimately sits in. Propagated
    /// down from the root-adjacent ancestor at build time.
    pub location_id: EveId,
    pub location_kind: LocationKind,
    pub location_flag: String,
    /// Normalised display name: empty when unnamed.
    pub name: String,
    pub quantity: i32,
    pub type_id: EveId,
    pub is_blueprint_copy: bool,
    pub is_singleton: bool,
    /// 0 for root-adjacent nodes, parent depth + 1 below that.
    pub depth: u32,
}

/// Location ids a snapshot refers to that are not themselves assets.
///
/// These are the station / solar system / structure ids the caller must
/// resolve (or create placeholders for) before building the tree.
pub fn candidate_root_locations(records: &HashMap<EveId, AssetRecord>) -> HashSet<EveId> {
    records
        .values()
        .filter(|r| !records.contains_key(&r.location_id))
        .map(|r| r.location_id)
        .collect()
}

/// The reconstructed forest plus the records that could not be placed.
#[derive(Debug, Default)]
pub struct AssetTree {
    nodes: HashMap<EveId, AssetNode>,
    /// Item ids in placement order: roots first, then wave by wave.
    /// A valid topological order (parents always precede children).
    order: Vec<EveId>,
    roots: Vec<EveId>,
    orphans: Vec<EveId>,
}

impl AssetTree {
    /// Build the forest from a flat `item_id -> record` snapshot.
    ///
    /// `root_locations` is the set of resolved top-level location ids
    /// (see [`candidate_root_locations`]). Items located directly in
    /// one of them are placed first; remaining items are resolved in
    /// waves against already-placed items until no progress is made.
    /// Whatever is left after that (a location id that is neither a
    /// known root nor another item in the batch, or a containment chain
    /// that never reaches a root) is orphaned: kept out of the tree
    /// and reported via [`orphans`](Self::orphans) for the caller to
    /// log. Cycles can never enter the tree because placement only
    /// proceeds from known roots inward.
    pub fn build(
        records: &HashMap<EveId, AssetRecord>,
        root_locations: &HashSet<EveId>,
    ) -> Result<AssetTree, CoreError> {
        let mut tree = AssetTree::default();
        let mut pending: Vec<&AssetRecord> = Vec::with_capacity(records.len());

        // Pass 1: root-adjacent items.
        for record in records.values() {
            if root_locations.contains(&record.location_id) {
                let node = tree.place(record, None, record.location_id, 0)?;
                tree.roots.push(node);
            } else {
                pending.push(record);
            }
        }
        tree.roots.sort_unstable();

        // Pass 2: waves of nested items against already-placed parents.
        loop {
            let mut next_pending = Vec::with_capacity(pending.len());
            let mut progressed = false;

            for record in pending {
                let parent = tree
                    .nodes
                    .get(&record.location_id)
                    .map(|p| (p.location_id, p.depth));
                match parent {
                    Some((root_location, parent_depth)) => {
                        tree.place(
                            record,
                            Some(record.location_id),
                            root_location,
                            parent_depth + 1,
                        )?;
                        progressed = true;
                    }
                    None => next_pending.push(record),
                }
            }

            if next_pending.is_empty() || !progressed {
                tree.orphans = next_pending.iter().map(|r| r.item_id).collect();
                tree.orphans.sort_unstable();
                break;
            }
            pending = next_pending;
        }

        Ok(tree)
    }

    /// Total number of placed nodes (orphans excluded).
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Item ids that could not be attached to any known location.
    pub fn orphans(&self) -> &[EveId] {
        &self.orphans
    }

    /// Item ids of root-adjacent nodes.
    pub fn roots(&self) -> &[EveId] {
        &self.roots
    }

    pub fn get(&self, item_id: EveId) -> Option<&AssetNode> {
        self.nodes.get(&item_id)
    }

    /// Direct children of a placed node.
    pub fn children_of(&self, item_id: EveId) -> Vec<&AssetNode> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|n| n.parent_item_id == Some(item_id))
            .collect()
    }

    /// Nodes in placement order: every parent strictly before its
    /// children. This is the insertion order for the bulk writer, which
    /// must satisfy the self-referential parent FK batch by batch.
    pub fn iter_topological(&self) -> impl Iterator<Item = &AssetNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    fn place(
        &mut self,
        record: &AssetRecord,
        parent_item_id: Option<EveId>,
        location_id: EveId,
        depth: u32,
    ) -> Result<EveId, CoreError> {
        let location_kind = LocationKind::parse(&record.location_type)?;
        let name = match record.name.as_deref() {
            None | Some("") | Some("None") => String::new(),
            Some(name) => name.to_string(),
        };
        self.nodes.insert(
            record.item_id,
            AssetNode {
                item_id: record.item_id,
                parent_item_id,
                location_id,
                location_kind,
                location_flag: record.location_flag.clone(),
                name,
                quantity: record.quantity,
                type_id: record.type_id,
                is_blueprint_copy: record.is_blueprint_copy,
                is_singleton: record.is_singleton,
                depth,
            },
        );
        self.order.push(record.item_id);
        Ok(record.item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATION_ID: EveId = 60003760;

    fn record(item_id: EveId, location_id: EveId, location_type: &str) -> AssetRecord {
        AssetRecord {
            item_id,
            location_id,
            location_flag: "Hangar".to_string(),
            location_type: location_type.to_string(),
            name: None,
            quantity: 1,
            type_id: 603,
            is_blueprint_copy: false,
            is_singleton: true,
        }
    }

    fn to_map(records: Vec<AssetRecord>) -> HashMap<EveId, AssetRecord> {
        records.into_iter().map(|r| (r.item_id, r)).collect()
    }

    fn station_roots() -> HashSet<EveId> {
        HashSet::from([STATION_ID])
    }

    #[test]
    fn empty_input_builds_empty_tree() {
        let tree = AssetTree::build(&HashMap::new(), &HashSet::new()).unwrap();
        assert_eq!(tree.size(), 0);
        assert!(tree.is_empty());
        assert!(tree.orphans().is_empty());
    }

    #[test]
    fn candidate_roots_exclude_item_references() {
        let records = to_map(vec![
            record(1001, STATION_ID, "station"),
            record(1002, 1001, "item"),
        ]);
        let candidates = candidate_root_locations(&records);
        assert_eq!(candidates, HashSet::from([STATION_ID]));
    }

    #[test]
    fn single_root_adjacent_item() {
        let tree = AssetTree::build(
            &to_map(vec![record(1001, STATION_ID, "station")]),
            &station_roots(),
        )
        .unwrap();
        assert_eq!(tree.size(), 1);
        let node = tree.get(1001).unwrap();
        assert_eq!(node.parent_item_id, None);
        assert_eq!(node.location_id, STATION_ID);
        assert_eq!(node.depth, 0);
    }

    #[test]
    fn nested_item_gets_parent_and_root_location() {
        // A ship in a station, with a module inside the ship.
        let tree = AssetTree::build(
            &to_map(vec![
                record(1001, STATION_ID, "station"),
                record(1002, 1001, "item"),
            ]),
            &station_roots(),
        )
        .unwrap();

        assert_eq!(tree.size(), 2);
        let child = tree.get(1002).unwrap();
        assert_eq!(child.parent_item_id, Some(1001));
        // Location propagates from the root-adjacent ancestor.
        assert_eq!(child.location_id, STATION_ID);
        assert_eq!(child.depth, 1);
    }

    #[test]
    fn three_level_chain_resolves_in_waves() {
        // Station -> ship -> container -> charge.
        let tree = AssetTree::build(
            &to_map(vec![
                record(1, STATION_ID, "station"),
                record(2, 1, "item"),
                record(3, 2, "item"),
            ]),
            &station_roots(),
        )
        .unwrap();

        assert_eq!(tree.size(), 3);
        assert_eq!(tree.get(3).unwrap().parent_item_id, Some(2));
        assert_eq!(tree.get(3).unwrap().location_id, STATION_ID);
        assert_eq!(tree.get(3).unwrap().depth, 2);
        assert_eq!(tree.roots(), &[1]);
    }

    #[test]
    fn full_input_is_placed_when_no_dangling_references() {
        // 20 items: 4 roots each carrying a 4-deep chain.
        let mut records = Vec::new();
        for root in 0..4 {
            let root_id = 100 + root;
            records.push(record(root_id, STATION_ID, "station"));
            let mut parent = root_id;
            for nested in 0..4 {
                let id = 1000 + root * 10 + nested;
                records.push(record(id, parent, "item"));
                parent = id;
            }
        }
        let input = to_map(records);
        let n = input.len();

        let tree = AssetTree::build(&input, &station_roots()).unwrap();
        assert_eq!(tree.size(), n);
        assert!(tree.orphans().is_empty());

        // Every parent chain terminates at a root in at most n steps.
        for id in input.keys() {
            let mut steps = 0;
            let mut cursor = tree.get(*id).unwrap();
            while let Some(parent_id) = cursor.parent_item_id {
                cursor = tree.get(parent_id).unwrap();
                steps += 1;
                assert!(steps <= n, "parent chain for {id} did not terminate");
            }
            assert_eq!(cursor.location_id, STATION_ID);
        }
    }

    #[test]
    fn unresolved_location_becomes_orphan() {
        // 999999 is neither a known root location nor an item id in the
        // batch: the record is dropped, never an error.
        let tree = AssetTree::build(
            &to_map(vec![
                record(1, STATION_ID, "station"),
                record(2, 999999, "item"),
            ]),
            &station_roots(),
        )
        .unwrap();

        assert_eq!(tree.size(), 1);
        assert_eq!(tree.orphans(), &[2]);
        assert!(tree.get(2).is_none());
    }

    #[test]
    fn mutual_containment_becomes_orphans() {
        // Two corrupt records claiming to contain each other can never
        // be reached from a root.
        let tree = AssetTree::build(
            &to_map(vec![
                record(1, STATION_ID, "station"),
                record(10, 11, "item"),
                record(11, 10, "item"),
            ]),
            &station_roots(),
        )
        .unwrap();

        assert_eq!(tree.size(), 1);
        assert_eq!(tree.orphans(), &[10, 11]);
    }

    #[test]
    fn self_reference_becomes_orphan() {
        let tree = AssetTree::build(&to_map(vec![record(7, 7, "item")]), &station_roots()).unwrap();
        assert_eq!(tree.size(), 0);
        assert_eq!(tree.orphans(), &[7]);
    }

    #[test]
    fn unknown_location_type_aborts_build() {
        let err = AssetTree::build(
            &to_map(vec![record(1, STATION_ID, "wormhole")]),
            &station_roots(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn none_string_name_normalised_to_empty() {
        let mut r = record(1, STATION_ID, "station");
        r.name = Some("None".to_string());
        let tree = AssetTree::build(&to_map(vec![r]), &station_roots()).unwrap();
        assert_eq!(tree.get(1).unwrap().name, "");
    }

    #[test]
    fn real_names_are_kept() {
        let mut r = record(1, STATION_ID, "station");
        r.name = Some("Mining Barge Alpha".to_string());
        let tree = AssetTree::build(&to_map(vec![r]), &station_roots()).unwrap();
        assert_eq!(tree.get(1).unwrap().name, "Mining Barge Alpha");
    }

    #[test]
    fn topological_order_places_parents_first() {
        let tree = AssetTree::build(
            &to_map(vec![
                record(1, STATION_ID, "station"),
                record(2, 1, "item"),
                record(3, 2, "item"),
                record(4, 1, "item"),
            ]),
            &station_roots(),
        )
        .unwrap();

        let mut seen = std::collections::HashSet::new();
        for node in tree.iter_topological() {
            if let Some(parent) = node.parent_item_id {
                assert!(seen.contains(&parent), "child {} before parent", node.item_id);
            }
            seen.insert(node.item_id);
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn children_of_lists_direct_children_only() {
        let tree = AssetTree::build(
            &to_map(vec![
                record(1, STATION_ID, "station"),
                record(2, 1, "item"),
                record(3, 2, "item"),
            ]),
            &station_roots(),
        )
        .unwrap();

        let children: Vec<EveId> = tree.children_of(1).iter().map(|n| n.item_id).collect();
        assert_eq!(children, vec![2]);
    }

    #[test]
    fn location_kind_parse_accepts_known_values() {
        assert_eq!(LocationKind::parse("station").unwrap(), LocationKind::Station);
        assert_eq!(
            LocationKind::parse("solar_system").unwrap(),
            LocationKind::SolarSystem
        );
        assert_eq!(LocationKind::parse("item").unwrap(), LocationKind::Item);
        assert_eq!(LocationKind::parse("other").unwrap(), LocationKind::Other);
    }

    #[test]
    fn location_kind_round_trips() {
        for kind in [
            LocationKind::Station,
            LocationKind::SolarSystem,
            LocationKind::Item,
            LocationKind::Other,
        ] {
            assert_eq!(LocationKind::parse(kind.as_str()).unwrap(), kind);
        }
    }
}
