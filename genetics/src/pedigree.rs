//! Pedigree Store
//!
//! Animals live in a `hecs` arena. Parent references are resolved once at
//! load time into `Sire`/`Dam` entity links, so the same ancestor is shared by
//! every descendant that names it instead of being owned by any of them.
//!
//! The only mutable state after loading is the self-inbreeding cache, which
//! is write-once per (animal, depth).

use hecs::{Entity, World};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info, warn};

use crate::components::*;
use crate::error::{GeneticsError, Result};

/// Counts produced while loading records into the arena
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub animals: u32,
    pub sire_links: u32,
    pub dam_links: u32,
    /// Parent identifiers named by a record but absent from the load
    pub unresolved_parents: u32,
    /// Records that replaced an earlier record with the same identifier
    pub duplicates: u32,
}

pub struct PedigreeStore {
    world: World,
    index: HashMap<AnimalId, Entity>,
    coefficients: RwLock<HashMap<(Entity, u8), f64>>,
}

impl PedigreeStore {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            index: HashMap::new(),
            coefficients: RwLock::new(HashMap::new()),
        }
    }

    /// Load animal records, replacing nothing already stored.
    ///
    /// First pass spawns every record, second pass resolves parent links.
    /// A pedigree that loops back on itself is rejected.
    pub fn from_records<I>(records: I) -> Result<(Self, LoadReport)>
    where
        I: IntoIterator<Item = Animal>,
    {
        let mut store = Self::new();
        let mut report = LoadReport::default();

        for animal in records {
            if let Some(&existing) = store.index.get(&animal.id) {
                warn!(id = %animal.id, "duplicate animal record, keeping the later one");
                report.duplicates += 1;
                let _ = store.world.insert_one(existing, animal);
                continue;
            }
            let id = animal.id.clone();
            let entity = store.world.spawn((animal,));
            store.index.insert(id, entity);
        }

        let mut links: Vec<(Entity, Option<Entity>, Option<Entity>)> = Vec::new();
        for (entity, animal) in store.world.query::<&Animal>().iter() {
            let mut resolve = |parent: &Option<AnimalId>| -> Option<Entity> {
                let parent_id = parent.as_ref()?;
                match store.index.get(parent_id) {
                    Some(&parent_entity) => Some(parent_entity),
                    None => {
                        debug!(id = %animal.id, parent = %parent_id, "parent not loaded");
                        report.unresolved_parents += 1;
                        None
                    }
                }
            };
            let sire = resolve(&animal.sire);
            let dam = resolve(&animal.dam);
            links.push((entity, sire, dam));
        }

        for (entity, sire, dam) in links {
            if let Some(sire) = sire {
                let _ = store.world.insert_one(entity, Sire(sire));
                report.sire_links += 1;
            }
            if let Some(dam) = dam {
                let _ = store.world.insert_one(entity, Dam(dam));
                report.dam_links += 1;
            }
        }

        store.check_acyclic()?;

        report.animals = store.index.len() as u32;
        info!(
            animals = report.animals,
            sire_links = report.sire_links,
            dam_links = report.dam_links,
            unresolved = report.unresolved_parents,
            "pedigree loaded"
        );
        Ok((store, report))
    }

    /// Reject pedigrees in which an animal is its own ancestor.
    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<Entity, Mark> = HashMap::with_capacity(self.index.len());
        for &start in self.index.values() {
            if marks.contains_key(&start) {
                continue;
            }
            // (entity, parents expanded yet)
            let mut stack = vec![(start, false)];
            while let Some((entity, expanded)) = stack.pop() {
                if expanded {
                    marks.insert(entity, Mark::Done);
                    continue;
                }
                match marks.get(&entity) {
                    Some(Mark::Done) => continue,
                    Some(Mark::Visiting) => continue,
                    None => {}
                }
                marks.insert(entity, Mark::Visiting);
                stack.push((entity, true));
                let (sire, dam) = self.parents(entity);
                for parent in [sire, dam].into_iter().flatten() {
                    match marks.get(&parent) {
                        Some(Mark::Visiting) => {
                            return Err(GeneticsError::Snapshot(format!(
                                "animal {} is its own ancestor",
                                self.id_of(parent)
                            )));
                        }
                        Some(Mark::Done) => {}
                        None => stack.push((parent, false)),
                    }
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &AnimalId) -> bool {
        self.index.contains_key(id)
    }

    /// Resolve an identifier to its arena entity
    pub fn entity(&self, id: &AnimalId) -> Result<Entity> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| GeneticsError::AnimalNotFound(id.to_string()))
    }

    pub fn animal(&self, id: &AnimalId) -> Result<hecs::Ref<'_, Animal>> {
        let entity = self.entity(id)?;
        self.record(entity)
            .ok_or_else(|| GeneticsError::AnimalNotFound(id.to_string()))
    }

    pub fn record(&self, entity: Entity) -> Option<hecs::Ref<'_, Animal>> {
        self.world.get::<&Animal>(entity).ok()
    }

    pub fn id_of(&self, entity: Entity) -> AnimalId {
        self.record(entity)
            .map(|animal| animal.id.clone())
            .unwrap_or_else(|| AnimalId::new(format!("<entity {}>", entity.id())))
    }

    pub fn sire_of(&self, entity: Entity) -> Option<Entity> {
        self.world.get::<&Sire>(entity).ok().map(|sire| sire.0)
    }

    pub fn dam_of(&self, entity: Entity) -> Option<Entity> {
        self.world.get::<&Dam>(entity).ok().map(|dam| dam.0)
    }

    pub fn parents(&self, entity: Entity) -> (Option<Entity>, Option<Entity>) {
        (self.sire_of(entity), self.dam_of(entity))
    }

    /// All identifiers, sorted
    pub fn ids(&self) -> Vec<AnimalId> {
        let mut ids: Vec<AnimalId> = self.index.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Identifiers starting with a flock prefix, sorted
    pub fn by_prefix(&self, prefix: &str) -> Vec<AnimalId> {
        let mut ids: Vec<AnimalId> = self
            .index
            .keys()
            .filter(|id| id.as_str().starts_with(prefix))
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Animals naming `id` as sire or dam, sorted
    pub fn progeny(&self, id: &AnimalId) -> Result<Vec<AnimalId>> {
        let parent = self.entity(id)?;
        let mut offspring: Vec<AnimalId> = self
            .world
            .query::<(&Animal, Option<&Sire>, Option<&Dam>)>()
            .iter()
            .filter(|(_, (_, sire, dam))| {
                sire.map_or(false, |s| s.0 == parent) || dam.map_or(false, |d| d.0 == parent)
            })
            .map(|(_, (animal, _, _))| animal.id.clone())
            .collect();
        offspring.sort();
        Ok(offspring)
    }

    /// Every stored record, sorted by identifier
    pub fn records(&self) -> Vec<Animal> {
        let mut records: Vec<Animal> = self
            .world
            .query::<&Animal>()
            .iter()
            .map(|(_, animal)| animal.clone())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    // ========================================================================
    // Self-inbreeding cache
    // ========================================================================

    pub fn cached_coefficient(&self, entity: Entity, depth: u8) -> Option<f64> {
        let cache = self.coefficients.read().unwrap_or_else(|e| e.into_inner());
        cache.get(&(entity, depth)).copied()
    }

    /// Store a coefficient unless one is already cached; returns the cached value.
    pub fn cache_coefficient(&self, entity: Entity, depth: u8, coefficient: f64) -> f64 {
        let mut cache = self.coefficients.write().unwrap_or_else(|e| e.into_inner());
        *cache.entry((entity, depth)).or_insert(coefficient)
    }

    pub fn cached_count(&self) -> usize {
        self.coefficients.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for PedigreeStore {
    fn default() -> Self {
        Self::new()
    }
}
