//! Mating Optimizer
//!
//! Assigns sires to dams with a deterministic greedy pass:
//!
//! 1. Score every sire x dam pair on the mid-parent EBVs and compute its
//!    inbreeding coefficient (pairs are evaluated in parallel).
//! 2. Set aside pairs above the inbreeding ceiling.
//! 3. Sort the rest by score (desc), then coefficient (asc), then sire id.
//! 4. Walk the list, taking a pair when the dam is still open and the sire
//!    is under its usage cap.
//!
//! This does not guarantee the best possible total score. Every assignment
//! can be traced to its position in the sorted list.

use hecs::Entity;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

use crate::components::{AnimalId, TraitMap};
use crate::pedigree::PedigreeStore;
use crate::systems::inbreeding;
use crate::systems::selection::{self, SelectionIndex};

/// Disclosed to callers with every plan
pub const STRATEGY: &str = "greedy-by-score";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatingConstraints {
    /// Inbreeding ceiling: pairs above this are excluded
    pub max_inbreeding: f64,
    /// Maximum dams per sire
    pub max_uses: u32,
    pub depth: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatingAssignment {
    pub sire: AnimalId,
    pub dam: AnimalId,
    /// Index score of the projected offspring
    pub score: f64,
    pub coefficient: f64,
    /// Whether the pair is within the inbreeding ceiling
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    /// Every sire pairing breaches the inbreeding ceiling
    NoSireUnderThreshold,
    /// Eligible sires exist but all reached their cap
    NoSireCapacity,
}

impl fmt::Display for UnassignedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnassignedReason::NoSireUnderThreshold => f.write_str("no sire under inbreeding ceiling"),
            UnassignedReason::NoSireCapacity => f.write_str("no sire capacity"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnassignedDam {
    pub dam: AnimalId,
    pub reason: UnassignedReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatingPlanResult {
    pub index: String,
    pub strategy: &'static str,
    /// Assignments in the order they were made
    pub assignments: Vec<MatingAssignment>,
    /// Pairs above the ceiling, shown for transparency but never assigned
    pub excluded_high_risk: Vec<MatingAssignment>,
    pub unassigned: Vec<UnassignedDam>,
    pub total_score: f64,
    pub mean_coefficient: f64,
}

impl MatingPlanResult {
    pub fn assignments_for(&self, sire: &AnimalId) -> usize {
        self.assignments.iter().filter(|a| &a.sire == sire).count()
    }
}

/// A resolved sire or dam with the fields pair scoring needs
struct Profile {
    entity: Entity,
    id: AnimalId,
    ebvs: TraitMap,
}

fn profiles(store: &PedigreeStore, entities: &[Entity]) -> Vec<Profile> {
    entities
        .iter()
        .filter_map(|&entity| {
            let profile = store.record(entity).map(|animal| Profile {
                entity,
                id: animal.id.clone(),
                ebvs: animal.ebvs.clone(),
            });
            if profile.is_none() {
                warn!(entity = entity.id(), "entity has no animal record, skipped");
            }
            profile
        })
        .collect()
}

struct Candidate {
    sire: Entity,
    dam: Entity,
    sire_id: AnimalId,
    dam_id: AnimalId,
    score: f64,
    coefficient: f64,
}

impl Candidate {
    fn to_assignment(&self, accepted: bool) -> MatingAssignment {
        MatingAssignment {
            sire: self.sire_id.clone(),
            dam: self.dam_id.clone(),
            score: self.score,
            coefficient: self.coefficient,
            accepted,
        }
    }
}

fn by_rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.coefficient.total_cmp(&b.coefficient))
        .then_with(|| a.sire_id.cmp(&b.sire_id))
        .then_with(|| a.dam_id.cmp(&b.dam_id))
}

/// Score one pairing on the projected offspring EBVs
fn evaluate(store: &PedigreeStore, sire: &Profile, dam: &Profile, index: &SelectionIndex, depth: u8) -> Candidate {
    let score = index.score(&selection::average_ebvs(&sire.ebvs, &dam.ebvs));
    let coefficient = inbreeding::coefficient(store, sire.entity, dam.entity, depth);
    debug!(sire = %sire.id, dam = %dam.id, score, coefficient, "pair evaluated");
    Candidate {
        sire: sire.entity,
        dam: dam.entity,
        sire_id: sire.id.clone(),
        dam_id: dam.id.clone(),
        score,
        coefficient,
    }
}

/// Build a mating plan. Sire and dam lists are expected to be de-duplicated.
pub fn plan_matings(
    store: &PedigreeStore,
    sires: &[Entity],
    dams: &[Entity],
    index: &SelectionIndex,
    constraints: &MatingConstraints,
) -> MatingPlanResult {
    let sires = profiles(store, sires);
    let dams = profiles(store, dams);
    let pairs: Vec<(&Profile, &Profile)> = sires
        .iter()
        .flat_map(|sire| dams.iter().map(move |dam| (sire, dam)))
        .collect();

    let candidates: Vec<Candidate> = pairs
        .par_iter()
        .map(|&(sire, dam)| evaluate(store, sire, dam, index, constraints.depth))
        .collect();

    let (mut eligible, mut excluded): (Vec<Candidate>, Vec<Candidate>) = candidates
        .into_iter()
        .partition(|c| c.coefficient <= constraints.max_inbreeding);

    eligible.sort_by(by_rank);
    excluded.sort_by(by_rank);

    let dams_with_options: HashSet<Entity> = eligible.iter().map(|c| c.dam).collect();

    let mut uses: HashMap<Entity, u32> = HashMap::new();
    let mut assigned: HashSet<Entity> = HashSet::new();
    let mut assignments = Vec::new();

    for candidate in &eligible {
        if assigned.contains(&candidate.dam) {
            continue;
        }
        let used = uses.entry(candidate.sire).or_insert(0);
        if *used >= constraints.max_uses {
            continue;
        }
        *used += 1;
        assigned.insert(candidate.dam);
        assignments.push(candidate.to_assignment(true));
    }

    let unassigned: Vec<UnassignedDam> = dams
        .iter()
        .filter(|dam| !assigned.contains(&dam.entity))
        .map(|dam| {
            let reason = if dams_with_options.contains(&dam.entity) {
                UnassignedReason::NoSireCapacity
            } else {
                UnassignedReason::NoSireUnderThreshold
            };
            warn!(dam = %dam.id, %reason, "dam left unassigned");
            UnassignedDam {
                dam: dam.id.clone(),
                reason,
            }
        })
        .collect();

    let total_score: f64 = assignments.iter().map(|a| a.score).sum();
    let mean_coefficient = if assignments.is_empty() {
        0.0
    } else {
        assignments.iter().map(|a| a.coefficient).sum::<f64>() / assignments.len() as f64
    };

    info!(
        index = %index.name,
        sires = sires.len(),
        dams = dams.len(),
        assigned = assignments.len(),
        excluded = excluded.len(),
        unassigned = unassigned.len(),
        "mating plan built"
    );

    MatingPlanResult {
        index: index.name.clone(),
        strategy: STRATEGY,
        assignments,
        excluded_high_risk: excluded.iter().map(|c| c.to_assignment(false)).collect(),
        unassigned,
        total_score,
        mean_coefficient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Animal, Sex};
    use crate::systems::selection::preset_catalog;

    fn store(records: Vec<Animal>) -> PedigreeStore {
        PedigreeStore::from_records(records).unwrap().0
    }

    fn entities(store: &PedigreeStore, ids: &[&str]) -> Vec<Entity> {
        ids.iter().map(|id| store.entity(&(*id).into()).unwrap()).collect()
    }

    fn constraints(max_inbreeding: f64, max_uses: u32) -> MatingConstraints {
        MatingConstraints {
            max_inbreeding,
            max_uses,
            depth: 4,
        }
    }

    #[test]
    fn test_capacity_leaves_dam_unassigned() {
        let records = vec![
            Animal::new("S1", Sex::Male).with_ebv("PWWT", 10.0),
            Animal::new("S2", Sex::Male).with_ebv("PWWT", 6.0),
            Animal::new("D1", Sex::Female).with_ebv("PWWT", 4.0),
            Animal::new("D2", Sex::Female).with_ebv("PWWT", 2.0),
            Animal::new("D3", Sex::Female).with_ebv("PWWT", 0.0),
        ];
        let store = store(records);
        let index = &preset_catalog()["terminal"];
        let plan = plan_matings(
            &store,
            &entities(&store, &["S1", "S2"]),
            &entities(&store, &["D1", "D2", "D3"]),
            index,
            &constraints(0.0625, 1),
        );

        assert_eq!(plan.assignments.len(), 2);
        assert_eq!(plan.assignments[0].sire, AnimalId::from("S1"));
        assert_eq!(plan.assignments[0].dam, AnimalId::from("D1"));
        assert_eq!(plan.assignments[0].score, 7.0);
        assert_eq!(plan.assignments[1].sire, AnimalId::from("S2"));
        assert_eq!(plan.assignments[1].dam, AnimalId::from("D2"));
        assert_eq!(plan.unassigned.len(), 1);
        assert_eq!(plan.unassigned[0].dam, AnimalId::from("D3"));
        assert_eq!(plan.unassigned[0].reason, UnassignedReason::NoSireCapacity);
        assert_eq!(plan.unassigned[0].reason.to_string(), "no sire capacity");
        assert_eq!(plan.strategy, STRATEGY);
    }

    #[test]
    fn test_related_pairs_are_excluded() {
        // D1 is S1's daughter; D2 is unrelated
        let records = vec![
            Animal::new("S1", Sex::Male).with_ebv("PWWT", 10.0),
            Animal::new("M", Sex::Female),
            Animal::new("D1", Sex::Female).with_parents(Some("S1"), Some("M")).with_ebv("PWWT", 8.0),
            Animal::new("D2", Sex::Female).with_ebv("PWWT", 1.0),
        ];
        let store = store(records);
        let index = &preset_catalog()["terminal"];
        let plan = plan_matings(
            &store,
            &entities(&store, &["S1"]),
            &entities(&store, &["D1", "D2"]),
            index,
            &constraints(0.0625, 5),
        );

        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignments[0].dam, AnimalId::from("D2"));
        assert!(plan.assignments[0].accepted);
        assert_eq!(plan.excluded_high_risk.len(), 1);
        assert_eq!(plan.excluded_high_risk[0].dam, AnimalId::from("D1"));
        assert_eq!(plan.excluded_high_risk[0].coefficient, 0.25);
        assert!(!plan.excluded_high_risk[0].accepted);
        assert_eq!(plan.unassigned[0].dam, AnimalId::from("D1"));
        assert_eq!(plan.unassigned[0].reason, UnassignedReason::NoSireUnderThreshold);
    }

    #[test]
    fn test_ties_break_on_sire_id() {
        let records = vec![
            Animal::new("SB", Sex::Male).with_ebv("PWWT", 2.0),
            Animal::new("SA", Sex::Male).with_ebv("PWWT", 2.0),
            Animal::new("D1", Sex::Female).with_ebv("PWWT", 2.0),
        ];
        let store = store(records);
        let index = &preset_catalog()["terminal"];
        let plan = plan_matings(
            &store,
            &entities(&store, &["SB", "SA"]),
            &entities(&store, &["D1"]),
            index,
            &constraints(0.0625, 1),
        );
        assert_eq!(plan.assignments[0].sire, AnimalId::from("SA"));
        assert_eq!(plan.unassigned.len(), 0);
    }

    #[test]
    fn test_equal_scores_prefer_lower_coefficient() {
        // SA is D1's half-sib (F 0.125); SB is unrelated
        let records = vec![
            Animal::new("G", Sex::Male),
            Animal::new("M1", Sex::Female),
            Animal::new("M2", Sex::Female),
            Animal::new("SA", Sex::Male).with_parents(Some("G"), Some("M1")).with_ebv("PWWT", 2.0),
            Animal::new("SB", Sex::Male).with_ebv("PWWT", 2.0),
            Animal::new("D1", Sex::Female).with_parents(Some("G"), Some("M2")).with_ebv("PWWT", 2.0),
        ];
        let store = store(records);
        let index = &preset_catalog()["terminal"];
        let plan = plan_matings(
            &store,
            &entities(&store, &["SA", "SB"]),
            &entities(&store, &["D1"]),
            index,
            &constraints(0.2, 1),
        );
        assert!(plan.excluded_high_risk.is_empty());
        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignments[0].sire, AnimalId::from("SB"));
        assert_eq!(plan.assignments[0].coefficient, 0.0);
        assert_eq!(plan.assignments_for(&"SA".into()), 0);
    }

    #[test]
    fn test_zero_capacity_assigns_nothing() {
        let records = vec![
            Animal::new("S1", Sex::Male),
            Animal::new("D1", Sex::Female),
        ];
        let store = store(records);
        let index = &preset_catalog()["terminal"];
        let plan = plan_matings(
            &store,
            &entities(&store, &["S1"]),
            &entities(&store, &["D1"]),
            index,
            &constraints(0.0625, 0),
        );
        assert!(plan.assignments.is_empty());
        assert_eq!(plan.unassigned[0].reason, UnassignedReason::NoSireCapacity);
        assert_eq!(plan.mean_coefficient, 0.0);
    }
}
