//! Genetics Engine - entry point for presentation layers
//!
//! Owns a loaded pedigree and the configuration it is evaluated under. Every
//! operation takes `&self`, so one engine can serve concurrent requests.

use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

use crate::components::AnimalId;
use crate::config::EngineConfig;
use crate::error::{GeneticsError, Result};
use crate::pedigree::PedigreeStore;
use crate::systems::ancestry::{self, AncestorNode, AncestorPath, CommonAncestorRecord};
use crate::systems::inbreeding::{self, InbreedingResult};
use crate::systems::mating::{self, MatingConstraints, MatingPlanResult};
use crate::systems::selection::{self, IndexSpec, SelectionIndex};
use crate::systems::trajectory::{self, TrajectoryResult, TraitProjection};

/// An animal with its index score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAnimal {
    pub id: AnimalId,
    pub score: f64,
}

pub struct GeneticsEngine {
    store: PedigreeStore,
    config: EngineConfig,
}

impl GeneticsEngine {
    pub fn new(store: PedigreeStore, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn with_default_config(store: PedigreeStore) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
        }
    }

    pub fn store(&self) -> &PedigreeStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Ancestry
    // ========================================================================

    pub fn ancestor_paths(&self, id: &AnimalId, depth: Option<u8>) -> Result<Vec<AncestorPath>> {
        let depth = self.config.resolve_depth(depth)?;
        let entity = self.store.entity(id)?;
        Ok(ancestry::ancestor_paths(&self.store, entity, depth))
    }

    pub fn ancestor_tree(&self, id: &AnimalId, depth: Option<u8>) -> Result<AncestorNode> {
        let depth = self.config.resolve_depth(depth)?;
        let entity = self.store.entity(id)?;
        Ok(ancestry::ancestor_tree(&self.store, entity, depth))
    }

    pub fn common_ancestors(
        &self,
        sire_id: &AnimalId,
        dam_id: &AnimalId,
        depth: Option<u8>,
    ) -> Result<Vec<CommonAncestorRecord>> {
        let depth = self.config.resolve_depth(depth)?;
        let sire = self.store.entity(sire_id)?;
        let dam = self.store.entity(dam_id)?;
        let common = ancestry::common_ancestors(&self.store, sire, dam, depth);
        Ok(ancestry::to_records(&self.store, &common))
    }

    // ========================================================================
    // Inbreeding
    // ========================================================================

    /// Coefficient of inbreeding of a sire x dam pairing's offspring
    pub fn inbreeding(&self, sire_id: &AnimalId, dam_id: &AnimalId, depth: Option<u8>) -> Result<InbreedingResult> {
        let depth = self.config.resolve_depth(depth)?;
        let sire = self.store.entity(sire_id)?;
        let dam = self.store.entity(dam_id)?;
        let result = inbreeding::inbreeding_result(&self.store, sire, dam, depth, &self.config.risk);
        info!(
            sire = %sire_id,
            dam = %dam_id,
            depth,
            coefficient = result.coefficient,
            risk = ?result.risk,
            "inbreeding computed"
        );
        Ok(result)
    }

    /// An animal's own coefficient (that of its parents' pairing)
    pub fn self_coefficient(&self, id: &AnimalId, depth: Option<u8>) -> Result<f64> {
        let depth = self.config.resolve_depth(depth)?;
        let entity = self.store.entity(id)?;
        Ok(inbreeding::self_coefficient(&self.store, entity, depth))
    }

    pub fn relationship(&self, a: &AnimalId, b: &AnimalId, depth: Option<u8>) -> Result<f64> {
        let depth = self.config.resolve_depth(depth)?;
        let a = self.store.entity(a)?;
        let b = self.store.entity(b)?;
        Ok(inbreeding::relationship(&self.store, a, b, depth))
    }

    // ========================================================================
    // Selection index
    // ========================================================================

    pub fn resolve_index(&self, spec: &IndexSpec) -> Result<SelectionIndex> {
        selection::resolve(spec, &self.config.indexes, &self.config.traits)
    }

    pub fn score(&self, id: &AnimalId, spec: &IndexSpec) -> Result<f64> {
        let index = self.resolve_index(spec)?;
        let animal = self.store.animal(id)?;
        Ok(index.score(&animal.ebvs))
    }

    /// Score and sort animals, best first; ties by identifier
    pub fn rank(&self, ids: &[AnimalId], spec: &IndexSpec) -> Result<Vec<RankedAnimal>> {
        let index = self.resolve_index(spec)?;
        let mut ranked = ids
            .iter()
            .map(|id| -> Result<RankedAnimal> {
                let animal = self.store.animal(id)?;
                Ok(RankedAnimal {
                    id: id.clone(),
                    score: index.score(&animal.ebvs),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        Ok(ranked)
    }

    // ========================================================================
    // Mating plan
    // ========================================================================

    /// Greedy mating plan at the configured default depth
    pub fn mating_plan(
        &self,
        sire_ids: &[AnimalId],
        dam_ids: &[AnimalId],
        spec: &IndexSpec,
        max_inbreeding: f64,
        max_uses: u32,
    ) -> Result<MatingPlanResult> {
        self.mating_plan_with_depth(sire_ids, dam_ids, spec, max_inbreeding, max_uses, None)
    }

    pub fn mating_plan_with_depth(
        &self,
        sire_ids: &[AnimalId],
        dam_ids: &[AnimalId],
        spec: &IndexSpec,
        max_inbreeding: f64,
        max_uses: u32,
        depth: Option<u8>,
    ) -> Result<MatingPlanResult> {
        let depth = self.config.resolve_depth(depth)?;
        if !(0.0..=1.0).contains(&max_inbreeding) {
            return Err(GeneticsError::InvalidConstraint(format!(
                "inbreeding ceiling must be within [0, 1], got {}",
                max_inbreeding
            )));
        }
        let index = self.resolve_index(spec)?;
        let sires = self.resolve_unique(sire_ids)?;
        let dams = self.resolve_unique(dam_ids)?;

        let constraints = MatingConstraints {
            max_inbreeding,
            max_uses,
            depth,
        };
        Ok(mating::plan_matings(&self.store, &sires, &dams, &index, &constraints))
    }

    fn resolve_unique(&self, ids: &[AnimalId]) -> Result<Vec<hecs::Entity>> {
        let mut seen = HashSet::new();
        let mut entities = Vec::with_capacity(ids.len());
        for id in ids {
            if seen.insert(id) {
                entities.push(self.store.entity(id)?);
            }
        }
        Ok(entities)
    }

    // ========================================================================
    // Trait trajectory
    // ========================================================================

    /// Projection bounded by the configured horizon ceiling
    pub fn project_trait(&self, request: &TraitProjection) -> Result<TrajectoryResult> {
        request.project_within(self.config.max_generations)
    }

    /// Projection using the configured heritability and phenotypic sd for a
    /// trait. Intensity defaults to the configured selection proportion.
    pub fn project_trait_by_code(
        &self,
        trait_code: &str,
        current_mean: f64,
        target: f64,
        intensity: Option<f64>,
        max_generations: u32,
    ) -> Result<TrajectoryResult> {
        let params = self.config.trait_parameters(trait_code).ok_or_else(|| {
            GeneticsError::InsufficientData(format!("no parameters configured for trait {}", trait_code))
        })?;
        let intensity = match intensity {
            Some(i) => i,
            None => trajectory::selection_intensity(self.config.selection_proportion)?,
        };
        let request = TraitProjection {
            current_mean,
            heritability: params.heritability,
            target,
            intensity,
            phenotypic_sd: params.phenotypic_sd,
            max_generations,
        };
        self.project_trait(&request)
    }
}
