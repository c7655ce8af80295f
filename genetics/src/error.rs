//! Error types for the genetics engine

use thiserror::Error;

/// Every failure the engine reports to its caller.
///
/// None of these are retried internally: the pedigree is static input for a
/// computation run, so a failed lookup cannot succeed on a second attempt.
#[derive(Debug, Error)]
pub enum GeneticsError {
    #[error("animal not found: {0}")]
    AnimalNotFound(String),

    #[error("requested depth {requested} exceeds the ceiling of {ceiling} generations")]
    DepthExceeded { requested: u8, ceiling: u8 },

    #[error("invalid index weights: {0}")]
    InvalidIndexWeights(String),

    #[error("unknown selection index preset: {0}")]
    UnknownIndex(String),

    #[error("invalid mating constraint: {0}")]
    InvalidConstraint(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("pedigree provider error: {0}")]
    Provider(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GeneticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_exceeded_message() {
        let err = GeneticsError::DepthExceeded { requested: 12, ceiling: 10 };
        assert_eq!(
            err.to_string(),
            "requested depth 12 exceeds the ceiling of 10 generations"
        );
    }
}
