//! Ancestry Walker
//!
//! Depth-first enumeration of every ancestor path, sire side first. Paths are
//! never deduplicated by ancestor: reaching the same ancestor along several
//! routes is exactly what inbreeding measures.

use hecs::Entity;
use serde::Serialize;
use std::collections::HashMap;

use crate::components::AnimalId;
use crate::pedigree::PedigreeStore;

/// A route from a starting animal up to one ancestor.
///
/// `nodes[0]` is the starting animal and the last node is the ancestor, so
/// the generation count is `nodes.len() - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTrace {
    pub nodes: Vec<Entity>,
}

impl PathTrace {
    pub fn ancestor(&self) -> Entity {
        self.nodes[self.nodes.len() - 1]
    }

    pub fn generations(&self) -> u8 {
        (self.nodes.len() - 1) as u8
    }
}

/// Public form of an ancestor path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AncestorPath {
    pub ancestor: AnimalId,
    pub generations: u8,
    /// Ancestors traversed, parent first, ending at `ancestor`
    pub route: Vec<AnimalId>,
}

/// An ancestor reachable from both sides of a pairing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommonAncestorRecord {
    pub ancestor: AnimalId,
    /// (sire-side generations, dam-side generations) per path pair
    pub path_pairs: Vec<(u8, u8)>,
}

/// Internal form keyed by entity, used by the inbreeding calculator
#[derive(Debug, Clone)]
pub struct CommonAncestor {
    pub ancestor: Entity,
    pub path_pairs: Vec<(u8, u8)>,
}

/// Node of a bounded-depth pedigree chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AncestorNode {
    pub id: AnimalId,
    /// False when the parent is named on a record but was never loaded
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sire: Option<Box<AncestorNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dam: Option<Box<AncestorNode>>,
}

/// Every path from `start` to an ancestor no more than `depth` generations back.
///
/// The starting animal itself is included as a zero-length path so that a
/// parent mated to its own descendant shows up as a common ancestor.
pub fn trace_paths(store: &PedigreeStore, start: Entity, depth: u8) -> Vec<PathTrace> {
    let mut paths = Vec::new();
    let mut stack = vec![vec![start]];

    while let Some(nodes) = stack.pop() {
        let current = nodes[nodes.len() - 1];
        if nodes.len() - 1 < depth as usize {
            let (sire, dam) = store.parents(current);
            // Dam pushed first so the sire branch is walked first
            for parent in [dam, sire].into_iter().flatten() {
                let mut next = nodes.clone();
                next.push(parent);
                stack.push(next);
            }
        }
        paths.push(PathTrace { nodes });
    }

    paths
}

/// Ancestor paths of `start`, excluding the zero-length path to itself
pub fn ancestor_paths(store: &PedigreeStore, start: Entity, depth: u8) -> Vec<AncestorPath> {
    trace_paths(store, start, depth)
        .into_iter()
        .filter(|path| path.generations() > 0)
        .map(|path| AncestorPath {
            ancestor: store.id_of(path.ancestor()),
            generations: path.generations(),
            route: path.nodes[1..].iter().map(|&e| store.id_of(e)).collect(),
        })
        .collect()
}

/// Intersect the sire-side and dam-side path sets on ancestor identity.
///
/// A path pair only counts when the two routes meet at the ancestor and
/// nowhere else; routes that already crossed at a nearer animal are that
/// animal's paths, not this ancestor's.
pub fn common_ancestors(
    store: &PedigreeStore,
    sire: Entity,
    dam: Entity,
    depth: u8,
) -> Vec<CommonAncestor> {
    let sire_paths = trace_paths(store, sire, depth);
    let dam_paths = trace_paths(store, dam, depth);

    let mut dam_by_ancestor: HashMap<Entity, Vec<&PathTrace>> = HashMap::new();
    for path in &dam_paths {
        dam_by_ancestor.entry(path.ancestor()).or_default().push(path);
    }

    // Keep first-seen order of ancestors on the sire side
    let mut order: Vec<Entity> = Vec::new();
    let mut pairs: HashMap<Entity, Vec<(u8, u8)>> = HashMap::new();

    for sire_path in &sire_paths {
        let ancestor = sire_path.ancestor();
        let Some(dam_side) = dam_by_ancestor.get(&ancestor) else {
            continue;
        };
        for dam_path in dam_side {
            if !routes_meet_only_at_ancestor(sire_path, dam_path) {
                continue;
            }
            let entry = pairs.entry(ancestor).or_insert_with(|| {
                order.push(ancestor);
                Vec::new()
            });
            entry.push((sire_path.generations(), dam_path.generations()));
        }
    }

    let mut records: Vec<CommonAncestor> = order
        .into_iter()
        .filter_map(|ancestor| {
            pairs.remove(&ancestor).map(|path_pairs| CommonAncestor {
                ancestor,
                path_pairs,
            })
        })
        .collect();
    records.sort_by_cached_key(|record| store.id_of(record.ancestor));
    records
}

fn routes_meet_only_at_ancestor(sire_path: &PathTrace, dam_path: &PathTrace) -> bool {
    let ancestor = sire_path.ancestor();
    sire_path.nodes[..sire_path.nodes.len() - 1]
        .iter()
        .all(|node| *node != ancestor && !dam_path.nodes.contains(node))
}

pub fn to_records(store: &PedigreeStore, common: &[CommonAncestor]) -> Vec<CommonAncestorRecord> {
    common
        .iter()
        .map(|record| CommonAncestorRecord {
            ancestor: store.id_of(record.ancestor),
            path_pairs: record.path_pairs.clone(),
        })
        .collect()
}

/// Pedigree chart of `start`, `depth` generations deep
pub fn ancestor_tree(store: &PedigreeStore, start: Entity, depth: u8) -> AncestorNode {
    let (sire, dam) = store.parents(start);
    let record = store.record(start);
    let (sire_id, dam_id) = record
        .as_ref()
        .map(|animal| (animal.sire.clone(), animal.dam.clone()))
        .unwrap_or((None, None));
    drop(record);

    let branch = |linked: Option<Entity>, named: Option<AnimalId>| -> Option<Box<AncestorNode>> {
        if depth == 0 {
            return None;
        }
        match (linked, named) {
            (Some(parent), _) => Some(Box::new(ancestor_tree(store, parent, depth - 1))),
            (None, Some(id)) => Some(Box::new(AncestorNode {
                id,
                loaded: false,
                sire: None,
                dam: None,
            })),
            (None, None) => None,
        }
    };

    AncestorNode {
        id: store.id_of(start),
        loaded: true,
        sire: branch(sire, sire_id),
        dam: branch(dam, dam_id),
    }
}
