//! Breedwise Genetics Engine
//!
//! Pedigree genetics for livestock breeding decisions: ancestry traversal,
//! Wright's inbreeding coefficients, selection-index scoring, greedy mating
//! plans and breeder's-equation trait projections.

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod pedigree;
pub mod persistence;
pub mod synthetic;
pub mod systems;

pub use components::*;
pub use config::EngineConfig;
pub use engine::{GeneticsEngine, RankedAnimal};
pub use error::{GeneticsError, Result};
pub use pedigree::{LoadReport, PedigreeStore};
pub use persistence::{PedigreeProvider, PedigreeSnapshot, SnapshotProvider};
pub use systems::*;
