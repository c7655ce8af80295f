//! Components for animals stored in the pedigree arena

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Identity Components
// ============================================================================

/// Registry identifier of an animal. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimalId(pub String);

impl AnimalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnimalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AnimalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Animal Components
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

/// Trait code (e.g. "WWT") to value.
pub type TraitMap = BTreeMap<String, f64>;

/// An animal record as supplied by the pedigree data provider.
///
/// Parent identifiers are kept even when the parent itself was never loaded;
/// the arena only links parents it actually holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub sex: Sex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sire: Option<AnimalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dam: Option<AnimalId>,
    #[serde(default)]
    pub breed: String,
    /// Estimated breeding values by trait code
    #[serde(default)]
    pub ebvs: TraitMap,
    /// Accuracy percentage (0-100) by trait code
    #[serde(default)]
    pub accuracies: TraitMap,
}

impl Animal {
    pub fn new(id: impl Into<AnimalId>, sex: Sex) -> Self {
        Self {
            id: id.into(),
            sex,
            sire: None,
            dam: None,
            breed: String::new(),
            ebvs: TraitMap::new(),
            accuracies: TraitMap::new(),
        }
    }

    pub fn with_parents(
        mut self,
        sire: Option<impl Into<AnimalId>>,
        dam: Option<impl Into<AnimalId>>,
    ) -> Self {
        self.sire = sire.map(Into::into);
        self.dam = dam.map(Into::into);
        self
    }

    pub fn with_breed(mut self, breed: impl Into<String>) -> Self {
        self.breed = breed.into();
        self
    }

    pub fn with_ebv(mut self, trait_code: &str, value: f64) -> Self {
        self.ebvs.insert(trait_code.to_string(), value);
        self
    }

    pub fn with_accuracy(mut self, trait_code: &str, percent: f64) -> Self {
        self.accuracies.insert(trait_code.to_string(), percent.clamp(0.0, 100.0));
        self
    }

    /// A founder has no recorded parent on either side.
    pub fn is_founder(&self) -> bool {
        self.sire.is_none() && self.dam.is_none()
    }
}

/// Link to the sire's entity in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sire(pub hecs::Entity);

/// Link to the dam's entity in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dam(pub hecs::Entity);
