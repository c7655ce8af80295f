//! Inbreeding Calculator
//!
//! Wright's path-coefficient method:
//!
//! ```text
//! F(sire, dam) = sum over common ancestors A
//!                  sum over path pairs (n1, n2) through A
//!                    (1/2)^(n1 + n2 + 1) * (1 + F(A))
//! ```
//!
//! F(A) is the ancestor's own coefficient, i.e. the coefficient of A's sire
//! and dam, memoized in the pedigree store per (animal, depth).

use hecs::Entity;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::components::AnimalId;
use crate::config::RiskThresholds;
use crate::pedigree::PedigreeStore;
use crate::systems::ancestry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// How one common ancestor contributes to a pairing's coefficient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommonAncestorContribution {
    pub ancestor: AnimalId,
    pub path_pairs: Vec<(u8, u8)>,
    /// The ancestor's own inbreeding coefficient F(A)
    pub ancestor_coefficient: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InbreedingResult {
    pub sire: AnimalId,
    pub dam: AnimalId,
    pub depth: u8,
    /// Fraction in [0, 1]
    pub coefficient: f64,
    pub percentage: f64,
    pub risk: RiskLevel,
    pub common_ancestors: Vec<CommonAncestorContribution>,
}

/// Coefficient of a hypothetical offspring of `sire` x `dam`, with the
/// per-ancestor breakdown.
pub fn pair_coefficient(
    store: &PedigreeStore,
    sire: Entity,
    dam: Entity,
    depth: u8,
) -> (f64, Vec<(ancestry::CommonAncestor, f64, f64)>) {
    let common = ancestry::common_ancestors(store, sire, dam, depth);
    let mut total = 0.0;
    let mut breakdown = Vec::with_capacity(common.len());

    for record in common {
        let ancestor_f = self_coefficient(store, record.ancestor, depth);
        let contribution: f64 = record
            .path_pairs
            .iter()
            .map(|&(n1, n2)| 0.5f64.powi(n1 as i32 + n2 as i32 + 1) * (1.0 + ancestor_f))
            .sum();
        trace!(
            ancestor = %store.id_of(record.ancestor),
            paths = record.path_pairs.len(),
            contribution,
            "common ancestor"
        );
        total += contribution;
        breakdown.push((record, ancestor_f, contribution));
    }

    (total, breakdown)
}

/// Coefficient only, for callers that do not need the breakdown
pub fn coefficient(store: &PedigreeStore, sire: Entity, dam: Entity, depth: u8) -> f64 {
    pair_coefficient(store, sire, dam, depth).0
}

/// An animal's own inbreeding: the coefficient of its parents' pairing.
///
/// Animals missing either parent are treated as unrelated founders (0).
pub fn self_coefficient(store: &PedigreeStore, animal: Entity, depth: u8) -> f64 {
    if let Some(cached) = store.cached_coefficient(animal, depth) {
        return cached;
    }

    let f = match store.parents(animal) {
        (Some(sire), Some(dam)) => coefficient(store, sire, dam, depth),
        _ => 0.0,
    };

    debug!(animal = %store.id_of(animal), depth, coefficient = f, "self coefficient computed");
    store.cache_coefficient(animal, depth, f)
}

/// Build the reported result for a sire x dam pairing
pub fn inbreeding_result(
    store: &PedigreeStore,
    sire: Entity,
    dam: Entity,
    depth: u8,
    risk: &RiskThresholds,
) -> InbreedingResult {
    let (f, breakdown) = pair_coefficient(store, sire, dam, depth);
    InbreedingResult {
        sire: store.id_of(sire),
        dam: store.id_of(dam),
        depth,
        coefficient: f,
        percentage: f * 100.0,
        risk: risk.classify(f),
        common_ancestors: breakdown
            .into_iter()
            .map(|(record, ancestor_f, contribution)| CommonAncestorContribution {
                ancestor: store.id_of(record.ancestor),
                path_pairs: record.path_pairs,
                ancestor_coefficient: ancestor_f,
                contribution,
            })
            .collect(),
    }
}

/// Wright's coefficient of relationship between two animals
pub fn relationship(store: &PedigreeStore, a: Entity, b: Entity, depth: u8) -> f64 {
    if a == b {
        return 1.0;
    }
    let f_ab = coefficient(store, a, b, depth);
    let f_a = self_coefficient(store, a, depth);
    let f_b = self_coefficient(store, b, depth);
    2.0 * f_ab / ((1.0 + f_a) * (1.0 + f_b)).sqrt()
}
