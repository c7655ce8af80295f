//! Engine configuration
//!
//! Preset tables live here as plain data owned by the engine instance, so two
//! engines with different presets can serve requests side by side.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{GeneticsError, Result};
use crate::systems::inbreeding::RiskLevel;
use crate::systems::selection::{self, SelectionIndex};

/// Default ancestry depth in generations
pub const DEFAULT_DEPTH: u8 = 4;

/// Hard ceiling on ancestry depth
pub const MAX_DEPTH: u8 = 10;

/// Hard ceiling on the trait projection horizon in generations
pub const MAX_GENERATIONS: u32 = 1_000;

/// Default proportion of candidates retained as breeders (top 20%)
pub const DEFAULT_SELECTION_PROPORTION: f64 = 0.20;

/// Per-trait population parameters used by the trajectory projector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitParameters {
    pub name: String,
    /// Heritability h2, fraction of phenotypic variance that is additive
    pub heritability: f64,
    /// Phenotypic standard deviation in trait units
    pub phenotypic_sd: f64,
}

impl TraitParameters {
    pub fn new(name: &str, heritability: f64, phenotypic_sd: f64) -> Self {
        Self {
            name: name.to_string(),
            heritability,
            phenotypic_sd,
        }
    }
}

/// Inbreeding risk bands. F below `moderate` is low, F below `high` is
/// moderate, anything else is high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub moderate: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            moderate: 0.0625,
            high: 0.125,
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, coefficient: f64) -> RiskLevel {
        if coefficient < self.moderate {
            RiskLevel::Low
        } else if coefficient < self.high {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_depth: u8,
    pub max_depth: u8,
    pub risk: RiskThresholds,
    /// Selection index presets by lowercase name
    pub indexes: BTreeMap<String, SelectionIndex>,
    /// Trait catalog by trait code
    pub traits: BTreeMap<String, TraitParameters>,
    pub selection_proportion: f64,
    /// Longest projection horizon a request may ask for
    pub max_generations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_depth: DEFAULT_DEPTH,
            max_depth: MAX_DEPTH,
            risk: RiskThresholds::default(),
            indexes: selection::preset_catalog(),
            traits: default_traits(),
            selection_proportion: DEFAULT_SELECTION_PROPORTION,
            max_generations: MAX_GENERATIONS,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| GeneticsError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_depth > self.max_depth {
            return Err(GeneticsError::Config(format!(
                "default_depth {} is above max_depth {}",
                self.default_depth, self.max_depth
            )));
        }
        if !(self.risk.moderate >= 0.0 && self.risk.moderate <= self.risk.high && self.risk.high <= 1.0) {
            return Err(GeneticsError::Config(format!(
                "risk thresholds must satisfy 0 <= moderate <= high <= 1 (got {} / {})",
                self.risk.moderate, self.risk.high
            )));
        }
        // Retaining every candidate gives zero selection intensity
        if !(self.selection_proportion > 0.0 && self.selection_proportion < 1.0) {
            return Err(GeneticsError::Config(format!(
                "selection_proportion must be in (0, 1), got {}",
                self.selection_proportion
            )));
        }
        if self.max_generations == 0 || self.max_generations > MAX_GENERATIONS {
            return Err(GeneticsError::Config(format!(
                "max_generations must be in 1..={}, got {}",
                MAX_GENERATIONS, self.max_generations
            )));
        }
        for (name, index) in &self.indexes {
            index
                .validate(&self.traits)
                .map_err(|e| GeneticsError::Config(format!("preset {}: {}", name, e)))?;
        }
        for (code, params) in &self.traits {
            if !(params.heritability > 0.0 && params.heritability <= 1.0) || params.phenotypic_sd <= 0.0 {
                return Err(GeneticsError::Config(format!(
                    "trait {} has invalid parameters (h2 {}, sd {})",
                    code, params.heritability, params.phenotypic_sd
                )));
            }
        }
        Ok(())
    }

    /// Resolve a requested depth, falling back to the default.
    pub fn resolve_depth(&self, requested: Option<u8>) -> Result<u8> {
        let depth = requested.unwrap_or(self.default_depth);
        if depth > self.max_depth {
            return Err(GeneticsError::DepthExceeded {
                requested: depth,
                ceiling: self.max_depth,
            });
        }
        Ok(depth)
    }

    pub fn trait_parameters(&self, code: &str) -> Option<&TraitParameters> {
        self.traits.get(code)
    }
}

/// Typical sheep trait parameters (h2, phenotypic sd in trait units)
const DEFAULT_TRAITS: &[(&str, &str, f64, f64)] = &[
    ("BWT", "Birth weight (kg)", 0.20, 0.6),
    ("WWT", "Weaning weight (kg)", 0.20, 4.0),
    ("PWWT", "Post-weaning weight (kg)", 0.30, 6.0),
    ("YWT", "Yearling weight (kg)", 0.35, 7.0),
    ("PFAT", "Post-weaning fat depth (mm)", 0.25, 1.2),
    ("PEMD", "Post-weaning eye muscle depth (mm)", 0.30, 2.5),
    ("NLW", "Number of lambs weaned (%)", 0.05, 45.0),
    ("MWWT", "Maternal weaning weight (kg)", 0.10, 3.0),
    ("YCFW", "Yearling clean fleece weight (%)", 0.35, 0.5),
    ("YFD", "Yearling fibre diameter (micron)", 0.50, 1.5),
];

fn default_traits() -> BTreeMap<String, TraitParameters> {
    DEFAULT_TRAITS
        .iter()
        .map(|(code, name, h2, sd)| (code.to_string(), TraitParameters::new(name, *h2, *sd)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_classification() {
        let risk = RiskThresholds::default();
        assert_eq!(risk.classify(0.0), RiskLevel::Low);
        assert_eq!(risk.classify(0.0624), RiskLevel::Low);
        assert_eq!(risk.classify(0.0625), RiskLevel::Moderate);
        assert_eq!(risk.classify(0.125), RiskLevel::High);
        assert_eq!(risk.classify(0.25), RiskLevel::High);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.indexes.contains_key("terminal"));
        assert!(config.indexes.contains_key("maternal"));
        assert_eq!(config.trait_parameters("NLW").unwrap().heritability, 0.05);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = EngineConfig::from_json_str(r#"{"default_depth": 6}"#).unwrap();
        assert_eq!(config.default_depth, 6);
        assert_eq!(config.max_depth, MAX_DEPTH);
        assert!(!config.traits.is_empty());
    }

    #[test]
    fn test_invalid_depths_rejected() {
        let err = EngineConfig::from_json_str(r#"{"default_depth": 12, "max_depth": 10}"#);
        assert!(matches!(err, Err(GeneticsError::Config(_))));
    }

    #[test]
    fn test_full_retention_rejected() {
        let err = EngineConfig::from_json_str(r#"{"selection_proportion": 1.0}"#);
        assert!(matches!(err, Err(GeneticsError::Config(msg)) if msg.contains("selection_proportion")));
    }

    #[test]
    fn test_horizon_ceiling_bounded() {
        let config = EngineConfig::from_json_str(r#"{"max_generations": 50}"#).unwrap();
        assert_eq!(config.max_generations, 50);
        assert!(EngineConfig::from_json_str(r#"{"max_generations": 0}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"max_generations": 5000}"#).is_err());
    }

    #[test]
    fn test_invalid_preset_rejected() {
        let empty = r#"{"indexes": {"custom": {"name": "custom", "weights": {}}}}"#;
        assert!(matches!(
            EngineConfig::from_json_str(empty),
            Err(GeneticsError::Config(msg)) if msg.starts_with("preset custom")
        ));
        let unknown = r#"{"indexes": {"custom": {"name": "custom", "weights": {"XYZ": 1.0}}}}"#;
        assert!(EngineConfig::from_json_str(unknown).is_err());
    }

    #[test]
    fn test_resolve_depth() {
        let config = EngineConfig::default();
        assert_eq!(config.resolve_depth(None).unwrap(), DEFAULT_DEPTH);
        assert_eq!(config.resolve_depth(Some(10)).unwrap(), 10);
        assert!(matches!(
            config.resolve_depth(Some(11)),
            Err(GeneticsError::DepthExceeded { requested: 11, ceiling: 10 })
        ));
    }
}
