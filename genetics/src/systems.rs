//! Genetics systems - computations over the pedigree arena

pub mod ancestry;
pub mod inbreeding;
pub mod selection;
pub mod mating;
pub mod trajectory;

pub use ancestry::{AncestorNode, AncestorPath, CommonAncestorRecord};
pub use inbreeding::{CommonAncestorContribution, InbreedingResult, RiskLevel};
pub use mating::{MatingAssignment, MatingConstraints, MatingPlanResult, UnassignedDam, UnassignedReason};
pub use selection::{IndexSpec, SelectionIndex};
pub use trajectory::{GenerationPoint, ProjectionOutcome, TrajectoryResult, TraitProjection};
