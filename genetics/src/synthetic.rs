//! Synthetic flock generation
//!
//! Builds a random multi-generation pedigree for benchmarks and tests.
//! Founder EBVs are drawn from N(0, sigma_a); progeny get the mid-parent value
//! plus Mendelian sampling N(0, sigma_a * sqrt(1/2)). A small sire team per
//! generation makes relatedness build up quickly.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;

use crate::components::{Animal, AnimalId, Sex, TraitMap};
use crate::config::TraitParameters;

#[derive(Debug, Clone)]
pub struct FlockConfig {
    pub prefix: String,
    pub breed: String,
    pub founders: usize,
    pub generations: usize,
    pub lambs_per_generation: usize,
    /// Sires used per generation
    pub sires_per_generation: usize,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            prefix: "FLK".to_string(),
            breed: "Poll Dorset".to_string(),
            founders: 40,
            generations: 5,
            lambs_per_generation: 60,
            sires_per_generation: 3,
        }
    }
}

fn additive_sd(params: &TraitParameters) -> f64 {
    params.heritability.sqrt() * params.phenotypic_sd
}

/// Generate a flock. Animals are returned oldest generation first.
pub fn seed_flock<R: Rng>(
    rng: &mut R,
    config: &FlockConfig,
    traits: &BTreeMap<String, TraitParameters>,
) -> Vec<Animal> {
    let mut next_id = 1u32;
    let new_id = |next_id: &mut u32| {
        let id = AnimalId::new(format!("{}{:06}", config.prefix, *next_id));
        *next_id += 1;
        id
    };

    let mut flock: Vec<Animal> = Vec::new();

    let mut previous: Vec<usize> = Vec::new();
    for _ in 0..config.founders {
        let sex = if rng.gen::<bool>() { Sex::Male } else { Sex::Female };
        let mut animal = Animal::new(new_id(&mut next_id), sex).with_breed(config.breed.clone());
        for (code, params) in traits {
            let sd = additive_sd(params);
            if let Ok(normal) = Normal::new(0.0, sd) {
                animal = animal.with_ebv(code, normal.sample(rng));
            }
            animal = animal.with_accuracy(code, rng.gen_range(40.0..90.0));
        }
        previous.push(flock.len());
        flock.push(animal);
    }

    for _ in 0..config.generations {
        let mut males: Vec<usize> = previous
            .iter()
            .copied()
            .filter(|&i| flock[i].sex == Sex::Male)
            .collect();
        let mut females: Vec<usize> = previous
            .iter()
            .copied()
            .filter(|&i| flock[i].sex == Sex::Female)
            .collect();
        if males.is_empty() || females.is_empty() {
            break;
        }
        males.shuffle(rng);
        males.truncate(config.sires_per_generation.max(1));
        females.shuffle(rng);

        let mut lambs = Vec::with_capacity(config.lambs_per_generation);
        for n in 0..config.lambs_per_generation {
            let sire = &flock[males[n % males.len()]];
            let dam = &flock[females[n % females.len()]];

            let sex = if rng.gen::<bool>() { Sex::Male } else { Sex::Female };
            let mut ebvs = TraitMap::new();
            for (code, params) in traits {
                let mid = (sire.ebvs.get(code).copied().unwrap_or(0.0)
                    + dam.ebvs.get(code).copied().unwrap_or(0.0))
                    / 2.0;
                let mendelian = Normal::new(0.0, additive_sd(params) * 0.5f64.sqrt())
                    .map(|d| d.sample(rng))
                    .unwrap_or(0.0);
                ebvs.insert(code.clone(), mid + mendelian);
            }

            let mut lamb = Animal::new(new_id(&mut next_id), sex)
                .with_parents(Some(sire.id.clone()), Some(dam.id.clone()))
                .with_breed(config.breed.clone());
            lamb.ebvs = ebvs;
            for code in traits.keys() {
                lamb = lamb.with_accuracy(code, rng.gen_range(30.0..70.0));
            }
            lambs.push(lamb);
        }

        previous.clear();
        for lamb in lambs {
            previous.push(flock.len());
            flock.push(lamb);
        }
    }

    flock
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::pedigree::PedigreeStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seed_flock_is_loadable() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = FlockConfig {
            founders: 10,
            generations: 3,
            lambs_per_generation: 12,
            ..FlockConfig::default()
        };
        let flock = seed_flock(&mut rng, &config, &EngineConfig::default().traits);
        assert!(flock.len() >= 10);
        assert!(flock.iter().take(10).all(Animal::is_founder));

        let (store, report) = PedigreeStore::from_records(flock.clone()).unwrap();
        assert_eq!(store.len(), flock.len());
        assert_eq!(report.unresolved_parents, 0);
        assert_eq!(report.duplicates, 0);
    }

    #[test]
    fn test_seed_flock_is_reproducible() {
        let traits = EngineConfig::default().traits;
        let a = seed_flock(&mut StdRng::seed_from_u64(42), &FlockConfig::default(), &traits);
        let b = seed_flock(&mut StdRng::seed_from_u64(42), &FlockConfig::default(), &traits);
        assert_eq!(a, b);
    }
}
