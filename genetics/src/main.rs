//! Breedwise Genetics Benchmark
//!
//! Standalone benchmark for the genetics engine.
//!
//! Usage: `breedwise-bench [snapshot.json] [config.json]`
//! Log level comes from `BREEDWISE_LOG` (default `info`).

use genetics::synthetic::{self, FlockConfig};
use genetics::{EngineConfig, GeneticsEngine, IndexSpec, PedigreeSnapshot, PedigreeStore, Sex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let level = std::env::var("BREEDWISE_LOG")
        .ok()
        .and_then(|value| value.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Breedwise genetics engine starting...");

    let mut args = std::env::args().skip(1);
    let snapshot_path = args.next();
    let config = match args.next() {
        Some(path) => EngineConfig::from_json_file(&path)?,
        None => EngineConfig::default(),
    };

    let snapshot = match snapshot_path {
        Some(path) => {
            info!("Loading pedigree snapshot from {}", path);
            PedigreeSnapshot::from_json_file(&path)?
        }
        None => {
            let flock_config = FlockConfig::default();
            info!(
                "Seeding synthetic flock: {} founders, {} generations of {} lambs",
                flock_config.founders, flock_config.generations, flock_config.lambs_per_generation
            );
            let mut rng = StdRng::seed_from_u64(2024);
            PedigreeSnapshot::new(synthetic::seed_flock(&mut rng, &flock_config, &config.traits))
        }
    };

    let (store, report) = PedigreeStore::from_snapshot(snapshot)?;
    info!("Pedigree loaded: {:?}", report);
    let engine = GeneticsEngine::new(store, config)?;

    // Candidates: the youngest animals of each sex
    let records = engine.store().records();
    let young: Vec<_> = records.iter().rev().take(60).collect();
    let mut sires: Vec<_> = young.iter().filter(|a| a.sex == Sex::Male).map(|a| a.id.clone()).collect();
    let dams: Vec<_> = young.iter().filter(|a| a.sex == Sex::Female).map(|a| a.id.clone()).collect();
    let terminal = IndexSpec::from("terminal");

    let ranked = engine.rank(&sires, &terminal)?;
    sires = ranked.into_iter().take(5).map(|r| r.id).collect();

    if let (Some(sire), Some(dam)) = (sires.first(), dams.first()) {
        let start = std::time::Instant::now();
        let result = engine.inbreeding(sire, dam, None)?;
        info!(
            "Inbreeding {} x {}: F = {:.4} ({:?}), {} common ancestors in {:?}",
            sire,
            dam,
            result.coefficient,
            result.risk,
            result.common_ancestors.len(),
            start.elapsed()
        );
    }

    let start = std::time::Instant::now();
    let plan = engine.mating_plan(&sires, &dams, &terminal, 0.0625, 8)?;
    info!(
        "Mating plan ({}): {} assigned, {} excluded, {} unassigned, total score {:.2}, mean F {:.4} in {:?}",
        plan.strategy,
        plan.assignments.len(),
        plan.excluded_high_risk.len(),
        plan.unassigned.len(),
        plan.total_score,
        plan.mean_coefficient,
        start.elapsed()
    );
    info!("Self coefficients cached: {}", engine.store().cached_count());

    let projection = engine.project_trait_by_code("PWWT", 45.0, 50.0, None, 10)?;
    info!(
        "PWWT projection: {:.3} kg/generation, outcome {:?}",
        projection.gain_per_generation, projection.outcome
    );

    Ok(())
}
