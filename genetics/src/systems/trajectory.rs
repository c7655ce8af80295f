//! Trait Trajectory Projector
//!
//! Breeder's equation applied generation by generation:
//! `dG = h2 * i * sigma_p`, added to the population mean each generation.
//! Projection never runs past the requested horizon; a target that is not
//! reached is reported as a shortfall.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MAX_GENERATIONS;
use crate::error::{GeneticsError, Result};

/// Truncation selection intensity by proportion retained
const INTENSITY_TABLE: &[(f64, f64)] = &[
    (0.01, 2.665),
    (0.02, 2.421),
    (0.05, 2.063),
    (0.10, 1.755),
    (0.20, 1.400),
    (0.30, 1.159),
    (0.40, 0.966),
    (0.50, 0.798),
    (0.60, 0.644),
    (0.70, 0.497),
    (0.80, 0.350),
    (0.90, 0.195),
    (1.00, 0.0),
];

/// Tolerance when comparing a projected mean against the target
const TARGET_EPSILON: f64 = 1e-9;

/// Selection intensity for retaining `proportion` of candidates, interpolated
/// between tabulated values.
pub fn selection_intensity(proportion: f64) -> Result<f64> {
    if !(proportion > 0.0 && proportion <= 1.0) {
        return Err(GeneticsError::InsufficientData(format!(
            "proportion selected must be in (0, 1], got {}",
            proportion
        )));
    }
    let (first_p, first_i) = INTENSITY_TABLE[0];
    if proportion <= first_p {
        return Ok(first_i);
    }
    for window in INTENSITY_TABLE.windows(2) {
        let (p0, i0) = window[0];
        let (p1, i1) = window[1];
        if proportion <= p1 {
            let t = (proportion - p0) / (p1 - p0);
            return Ok(i0 + t * (i1 - i0));
        }
    }
    Ok(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitProjection {
    pub current_mean: f64,
    pub heritability: f64,
    pub target: f64,
    /// Selection intensity in phenotypic standard deviations
    pub intensity: f64,
    pub phenotypic_sd: f64,
    pub max_generations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationPoint {
    pub generation: u32,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProjectionOutcome {
    Reached { generation: u32 },
    /// Target not met within the horizon; `remaining` is the gap left
    Shortfall { remaining: f64, final_mean: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryResult {
    /// Generation 0 (current mean) through the horizon
    pub points: Vec<GenerationPoint>,
    /// Signed gain per generation, toward the target
    pub gain_per_generation: f64,
    pub target_generation: Option<u32>,
    pub outcome: ProjectionOutcome,
}

impl TraitProjection {
    fn validate(&self, horizon_ceiling: u32) -> Result<()> {
        if self.max_generations > horizon_ceiling {
            return Err(GeneticsError::InsufficientData(format!(
                "projection horizon {} exceeds the ceiling of {} generations",
                self.max_generations, horizon_ceiling
            )));
        }
        if !(self.heritability > 0.0 && self.heritability <= 1.0) {
            return Err(GeneticsError::InsufficientData(format!(
                "heritability must be in (0, 1], got {}",
                self.heritability
            )));
        }
        if !(self.intensity > 0.0) {
            return Err(GeneticsError::InsufficientData(format!(
                "selection intensity must be positive, got {}",
                self.intensity
            )));
        }
        if !(self.phenotypic_sd > 0.0) {
            return Err(GeneticsError::InsufficientData(format!(
                "phenotypic standard deviation must be positive, got {}",
                self.phenotypic_sd
            )));
        }
        if !self.current_mean.is_finite() || !self.target.is_finite() {
            return Err(GeneticsError::InsufficientData(
                "current mean and target must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Per-generation response, signed toward the target
    pub fn gain_per_generation(&self) -> f64 {
        let response = self.heritability * self.intensity * self.phenotypic_sd;
        if self.target < self.current_mean {
            -response
        } else {
            response
        }
    }

    /// Project under the built-in horizon ceiling
    pub fn project(&self) -> Result<TrajectoryResult> {
        self.project_within(MAX_GENERATIONS)
    }

    pub fn project_within(&self, horizon_ceiling: u32) -> Result<TrajectoryResult> {
        self.validate(horizon_ceiling)?;

        let gain = self.gain_per_generation();
        let upward = gain >= 0.0;
        let met = |mean: f64| {
            if upward {
                mean >= self.target - TARGET_EPSILON
            } else {
                mean <= self.target + TARGET_EPSILON
            }
        };

        let mut points = Vec::with_capacity(self.max_generations as usize + 1);
        let mut target_generation = None;
        for generation in 0..=self.max_generations {
            let mean = self.current_mean + gain * generation as f64;
            if target_generation.is_none() && met(mean) {
                target_generation = Some(generation);
            }
            points.push(GenerationPoint { generation, mean });
        }

        let final_mean = points
            .last()
            .map(|p| p.mean)
            .unwrap_or(self.current_mean);
        let outcome = match target_generation {
            Some(generation) => ProjectionOutcome::Reached { generation },
            None => ProjectionOutcome::Shortfall {
                remaining: (self.target - final_mean).abs(),
                final_mean,
            },
        };

        debug!(gain, ?target_generation, generations = self.max_generations, "trait projected");

        Ok(TrajectoryResult {
            points,
            gain_per_generation: gain,
            target_generation,
            outcome,
        })
    }
}
