//! Selection Index Scorer
//!
//! Index score = sum of weight * EBV over traits present in both maps.
//! A trait the animal has no EBV for contributes nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::components::TraitMap;
use crate::config::TraitParameters;
use crate::error::{GeneticsError, Result};

/// Named trait weights. Positive weight means a higher EBV is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionIndex {
    pub name: String,
    pub weights: TraitMap,
}

/// How a caller names an index: a preset or its own weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexSpec {
    Preset(String),
    Custom(TraitMap),
}

impl From<&str> for IndexSpec {
    fn from(name: &str) -> Self {
        IndexSpec::Preset(name.to_string())
    }
}

impl From<TraitMap> for IndexSpec {
    fn from(weights: TraitMap) -> Self {
        IndexSpec::Custom(weights)
    }
}

impl SelectionIndex {
    pub fn new(name: &str, weights: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            weights: weights.iter().map(|(t, w)| (t.to_string(), *w)).collect(),
        }
    }

    pub fn score(&self, ebvs: &TraitMap) -> f64 {
        self.weights
            .iter()
            .filter_map(|(code, weight)| ebvs.get(code).map(|ebv| weight * ebv))
            .sum()
    }

    /// Custom weights must be non-empty, finite, and name at least one known trait.
    pub fn validate(&self, catalog: &BTreeMap<String, TraitParameters>) -> Result<()> {
        if self.weights.is_empty() {
            return Err(GeneticsError::InvalidIndexWeights("no weights given".into()));
        }
        if let Some((code, _)) = self.weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(GeneticsError::InvalidIndexWeights(format!(
                "weight for {} is not a finite number",
                code
            )));
        }
        if !self.weights.keys().any(|code| catalog.contains_key(code)) {
            let codes: Vec<&str> = self.weights.keys().map(String::as_str).collect();
            return Err(GeneticsError::InvalidIndexWeights(format!(
                "no recognised traits among {}",
                codes.join(", ")
            )));
        }
        Ok(())
    }
}

/// Resolve a spec against the configured presets and trait catalog
pub fn resolve(
    spec: &IndexSpec,
    presets: &BTreeMap<String, SelectionIndex>,
    catalog: &BTreeMap<String, TraitParameters>,
) -> Result<SelectionIndex> {
    match spec {
        IndexSpec::Preset(name) => presets
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| GeneticsError::UnknownIndex(name.clone())),
        IndexSpec::Custom(weights) => {
            let index = SelectionIndex {
                name: "custom".to_string(),
                weights: weights.clone(),
            };
            index.validate(catalog)?;
            Ok(index)
        }
    }
}

/// Expected progeny EBVs: the mid-parent value of every trait either parent
/// carries. A trait recorded on one parent only is averaged against zero.
pub fn average_ebvs(sire: &TraitMap, dam: &TraitMap) -> TraitMap {
    let mut offspring = TraitMap::new();
    for code in sire.keys().chain(dam.keys()) {
        if offspring.contains_key(code) {
            continue;
        }
        let s = sire.get(code).copied().unwrap_or(0.0);
        let d = dam.get(code).copied().unwrap_or(0.0);
        offspring.insert(code.clone(), (s + d) / 2.0);
    }
    offspring
}

/// Built-in presets
const TERMINAL: &[(&str, f64)] = &[("PWWT", 1.0), ("PEMD", 0.8), ("BWT", -0.5), ("PFAT", -0.6)];
const MATERNAL: &[(&str, f64)] = &[("NLW", 1.0), ("MWWT", 0.6), ("WWT", 0.4), ("BWT", -0.3)];
const BALANCED: &[(&str, f64)] = &[
    ("PWWT", 0.5),
    ("PEMD", 0.4),
    ("NLW", 0.5),
    ("MWWT", 0.3),
    ("BWT", -0.3),
    ("PFAT", -0.3),
];

pub fn preset_catalog() -> BTreeMap<String, SelectionIndex> {
    [("terminal", TERMINAL), ("maternal", MATERNAL), ("balanced", BALANCED)]
        .into_iter()
        .map(|(name, weights)| (name.to_string(), SelectionIndex::new(name, weights)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn ebvs(pairs: &[(&str, f64)]) -> TraitMap {
        pairs.iter().map(|(t, v)| (t.to_string(), *v)).collect()
    }

    #[test]
    fn test_terminal_score() {
        let terminal = &preset_catalog()["terminal"];
        let animal = ebvs(&[("PWWT", 10.0), ("PEMD", 2.0), ("BWT", 0.4), ("PFAT", -0.5)]);
        // 10 + 1.6 - 0.2 + 0.3
        assert!((terminal.score(&animal) - 11.7).abs() < 1e-12);
    }

    #[test]
    fn test_missing_traits_contribute_zero() {
        let terminal = &preset_catalog()["terminal"];
        assert_eq!(terminal.score(&ebvs(&[("PWWT", 4.0)])), 4.0);
        assert_eq!(terminal.score(&TraitMap::new()), 0.0);
        // Traits outside the index are ignored
        assert_eq!(terminal.score(&ebvs(&[("YFD", 9.0)])), 0.0);
    }

    #[test]
    fn test_resolve_preset_case_insensitive() {
        let config = EngineConfig::default();
        let index = resolve(&"Maternal".into(), &config.indexes, &config.traits).unwrap();
        assert_eq!(index.name, "maternal");
        assert!(matches!(
            resolve(&"export".into(), &config.indexes, &config.traits),
            Err(GeneticsError::UnknownIndex(_))
        ));
    }

    #[test]
    fn test_custom_weights_validation() {
        let config = EngineConfig::default();
        let empty = IndexSpec::Custom(TraitMap::new());
        assert!(matches!(
            resolve(&empty, &config.indexes, &config.traits),
            Err(GeneticsError::InvalidIndexWeights(_))
        ));

        let unknown = IndexSpec::Custom(ebvs(&[("XYZ", 1.0)]));
        assert!(matches!(
            resolve(&unknown, &config.indexes, &config.traits),
            Err(GeneticsError::InvalidIndexWeights(_))
        ));

        let mixed = IndexSpec::Custom(ebvs(&[("XYZ", 1.0), ("WWT", 2.0)]));
        let index = resolve(&mixed, &config.indexes, &config.traits).unwrap();
        assert_eq!(index.score(&ebvs(&[("WWT", 3.0), ("XYZ", 1.0)])), 7.0);
    }

    #[test]
    fn test_index_spec_from_json() {
        let preset: IndexSpec = serde_json::from_str(r#""terminal""#).unwrap();
        assert_eq!(preset, IndexSpec::Preset("terminal".into()));
        let custom: IndexSpec = serde_json::from_str(r#"{"WWT": 1.5}"#).unwrap();
        assert_eq!(custom, IndexSpec::Custom(ebvs(&[("WWT", 1.5)])));
    }

    #[test]
    fn test_average_ebvs() {
        let sire = ebvs(&[("WWT", 4.0), ("PEMD", 1.0)]);
        let dam = ebvs(&[("WWT", 2.0), ("NLW", 6.0)]);
        let offspring = average_ebvs(&sire, &dam);
        assert_eq!(offspring["WWT"], 3.0);
        assert_eq!(offspring["PEMD"], 0.5);
        assert_eq!(offspring["NLW"], 3.0);
        assert_eq!(offspring.len(), 3);
    }
}
