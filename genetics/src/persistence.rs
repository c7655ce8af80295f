//! Pedigree snapshots and the data provider boundary
//!
//! Records arrive from a `PedigreeProvider` (a registry client lives outside
//! this crate). `SnapshotProvider` serves a versioned JSON snapshot from
//! memory, which is also what `PedigreeStore::export_snapshot` produces.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, info};

use crate::components::{Animal, AnimalId};
use crate::error::{GeneticsError, Result};
use crate::pedigree::{LoadReport, PedigreeStore};

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u8 = 1;

// ============================================================================
// Snapshot
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PedigreeSnapshot {
    pub version: u8,
    pub animals: Vec<Animal>,
}

impl PedigreeSnapshot {
    pub fn new(animals: Vec<Animal>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            animals,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: PedigreeSnapshot = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(GeneticsError::Snapshot(format!(
                "unsupported snapshot version: {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| GeneticsError::Snapshot(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl PedigreeStore {
    /// Build a store from every record in a snapshot
    pub fn from_snapshot(snapshot: PedigreeSnapshot) -> Result<(Self, LoadReport)> {
        Self::from_records(snapshot.animals)
    }

    pub fn export_snapshot(&self) -> PedigreeSnapshot {
        PedigreeSnapshot::new(self.records())
    }

    /// Fetch `roots` and their ancestors up to `generations` back from a provider.
    ///
    /// Roots must exist; ancestors the provider does not know are skipped.
    /// Ancestors' own coefficients need their pedigrees too, so callers that
    /// compute inbreeding at depth D usually collect about 2*D generations.
    pub fn collect_from<P>(provider: &P, roots: &[AnimalId], generations: u8) -> Result<(Self, LoadReport)>
    where
        P: PedigreeProvider + ?Sized,
    {
        let mut seen: HashSet<AnimalId> = HashSet::new();
        let mut records: Vec<Animal> = Vec::new();
        let mut queue: VecDeque<(AnimalId, u8, bool)> =
            roots.iter().map(|id| (id.clone(), 0, true)).collect();

        while let Some((id, generation, is_root)) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let fetched = provider
                .fetch_animal(&id)
                .map_err(|e| GeneticsError::Provider(format!("fetching {}: {}", id, e)))?;
            let animal = match fetched {
                Some(animal) => animal,
                None if is_root => return Err(GeneticsError::AnimalNotFound(id.to_string())),
                None => {
                    debug!(id = %id, "ancestor unknown to provider");
                    continue;
                }
            };
            if generation < generations {
                for parent in [&animal.sire, &animal.dam].into_iter().flatten() {
                    queue.push_back((parent.clone(), generation + 1, false));
                }
            }
            records.push(animal);
        }

        info!(roots = roots.len(), fetched = records.len(), generations, "pedigree collected");
        Self::from_records(records)
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Source of animal records
pub trait PedigreeProvider {
    fn fetch_animal(&self, id: &AnimalId) -> Result<Option<Animal>>;

    /// Every animal whose identifier starts with the flock prefix
    fn fetch_by_prefix(&self, flock_prefix: &str) -> Result<Vec<Animal>>;
}

/// In-memory provider over a set of records
#[derive(Debug, Clone, Default)]
pub struct SnapshotProvider {
    animals: BTreeMap<AnimalId, Animal>,
}

impl SnapshotProvider {
    pub fn new(animals: impl IntoIterator<Item = Animal>) -> Self {
        Self {
            animals: animals.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    pub fn from_snapshot(snapshot: PedigreeSnapshot) -> Self {
        Self::new(snapshot.animals)
    }

    pub fn len(&self) -> usize {
        self.animals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animals.is_empty()
    }
}

impl PedigreeProvider for SnapshotProvider {
    fn fetch_animal(&self, id: &AnimalId) -> Result<Option<Animal>> {
        Ok(self.animals.get(id).cloned())
    }

    fn fetch_by_prefix(&self, flock_prefix: &str) -> Result<Vec<Animal>> {
        Ok(self
            .animals
            .values()
            .filter(|a| a.id.as_str().starts_with(flock_prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Sex;

    fn records() -> Vec<Animal> {
        vec![
            Animal::new("FLK-001", Sex::Male),
            Animal::new("FLK-002", Sex::Female),
            Animal::new("FLK-003", Sex::Male).with_parents(Some("FLK-001"), Some("FLK-002")),
            Animal::new("FLK-004", Sex::Female).with_parents(Some("FLK-003"), Some("OTH-009")),
            Animal::new("OTH-001", Sex::Female),
        ]
    }

    #[test]
    fn test_snapshot_json_roundtrip_preserves_links() {
        let (store, _) = PedigreeStore::from_records(records()).unwrap();
        let json = store.export_snapshot().to_json().unwrap();

        let (restored, report) = PedigreeStore::from_snapshot(PedigreeSnapshot::from_json(&json).unwrap()).unwrap();
        assert_eq!(report.animals, 5);
        assert_eq!(report.sire_links, 2);
        assert_eq!(report.unresolved_parents, 1);
        assert_eq!(restored.records(), store.records());
    }

    #[test]
    fn test_unsupported_version() {
        let err = PedigreeSnapshot::from_json(r#"{"version": 9, "animals": []}"#);
        assert!(matches!(err, Err(GeneticsError::Snapshot(_))));
    }

    #[test]
    fn test_fetch_by_prefix() {
        let provider = SnapshotProvider::new(records());
        let flock = provider.fetch_by_prefix("FLK-").unwrap();
        assert_eq!(flock.len(), 4);
        assert!(provider.fetch_animal(&"NONE".into()).unwrap().is_none());
    }

    #[test]
    fn test_collect_from_bounds_generations() {
        let provider = SnapshotProvider::new(records());

        let (store, _) = PedigreeStore::collect_from(&provider, &["FLK-004".into()], 1).unwrap();
        assert_eq!(store.ids(), vec![AnimalId::from("FLK-003"), AnimalId::from("FLK-004")]);

        let (store, report) = PedigreeStore::collect_from(&provider, &["FLK-004".into()], 4).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(report.unresolved_parents, 1);
    }

    struct OfflineProvider;

    impl PedigreeProvider for OfflineProvider {
        fn fetch_animal(&self, _id: &AnimalId) -> Result<Option<Animal>> {
            Err(GeneticsError::Snapshot("registry unreachable".into()))
        }

        fn fetch_by_prefix(&self, _flock_prefix: &str) -> Result<Vec<Animal>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_collect_from_wraps_provider_failure() {
        match PedigreeStore::collect_from(&OfflineProvider, &["FLK-001".into()], 2) {
            Err(GeneticsError::Provider(msg)) => {
                assert!(msg.contains("FLK-001"));
                assert!(msg.contains("registry unreachable"));
            }
            other => panic!("expected provider error, got {:?}", other.map(|(s, _)| s.len())),
        }
    }

    #[test]
    fn test_collect_from_unknown_root() {
        let provider = SnapshotProvider::new(records());
        assert!(matches!(
            PedigreeStore::collect_from(&provider, &["MISSING".into()], 2),
            Err(GeneticsError::AnimalNotFound(_))
        ));
    }
}
