//! Experiment drivers
//!
//! Every run builds its own [`NetworkCostModel`] from `(scenario, seed)` so
//! runs are independent and can be spread across threads with rayon.

use crate::report::{
    gain_percent, timestamp, ComparisonReport, ScalabilityPoint, ScalabilityReport,
    ScenarioSummary, SuiteReport, SuiteRow, TradeoffPoint, TradeoffReport,
};
use crate::{BenchError, Result};
use ndarray::{Array2, Axis};
use offload_optimizer::{
    Optimizer, ParticleSwarmOptimizer, PsoConfig, QgaConfig, QuantumInspiredOptimizer, RunSummary,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use sagin_env::config::URBAN_IOT;
use sagin_env::reference::loop_cost;
use sagin_env::{NetworkCostModel, SaginConfig, Scenario};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Optimizer settings and seed list shared by the drivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentSettings {
    pub qga: QgaConfig,
    pub pso: PsoConfig,
    pub seeds: Vec<u64>,
}

impl Default for ExperimentSettings {
    fn default() -> Self {
        Self {
            qga: QgaConfig::default(),
            pso: PsoConfig::default(),
            seeds: (0..10).collect(),
        }
    }
}

impl ExperimentSettings {
    /// Same settings with both optimizers limited to `max_iter` generations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.qga.max_iter = max_iter;
        self.pso.max_iter = max_iter;
        self
    }

    /// Same settings with both optimizers using `population_size` members
    pub fn with_population(mut self, population_size: usize) -> Self {
        self.qga.population_size = population_size;
        self.pso.population_size = population_size;
        self
    }

    pub fn with_seeds(mut self, seeds: Vec<u64>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.qga.validate()?;
        self.pso.validate()?;
        if self.seeds.is_empty() {
            return Err(BenchError::InvalidSettings("at least one seed is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeoffSettings {
    pub scenario: String,
    /// Latency weights to sweep; the energy weight is `1 − w_L`
    pub latency_weights: Vec<f64>,
}

impl Default for TradeoffSettings {
    fn default() -> Self {
        Self {
            scenario: URBAN_IOT.to_string(),
            latency_weights: vec![0.1, 0.3, 0.5, 0.7, 0.9],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalabilitySettings {
    pub scenario: String,
    pub device_counts: Vec<usize>,
    pub seed: u64,
}

impl Default for ScalabilitySettings {
    fn default() -> Self {
        Self {
            scenario: URBAN_IOT.to_string(),
            device_counts: vec![50, 100, 200, 500, 1000],
            seed: 42,
        }
    }
}

/// Both optimizers' summaries on one network
fn compare_on(
    model: &NetworkCostModel,
    settings: &ExperimentSettings,
    seed: u64,
) -> Result<(RunSummary, RunSummary)> {
    let qga = QuantumInspiredOptimizer::new(model, settings.qga.clone(), seed)?.run()?;
    let pso = ParticleSwarmOptimizer::new(model, settings.pso.clone(), seed)?.run()?;
    Ok((qga, pso))
}

/// Run QGA and PSO once on the network built from `(scenario, seed)`
pub fn run_single(
    config: &SaginConfig,
    scenario: &str,
    seed: u64,
    settings: &ExperimentSettings,
) -> Result<ComparisonReport> {
    settings.qga.validate()?;
    settings.pso.validate()?;

    let model = NetworkCostModel::new(config, scenario, seed)?;
    let (qga, pso) = compare_on(&model, settings, seed)?;
    let gain = gain_percent(qga.best_cost, pso.best_cost);

    info!(
        "{} seed {}: QGA {:.4}, PSO {:.4}, gain {:.2}%",
        scenario, seed, qga.best_cost, pso.best_cost, gain
    );

    Ok(ComparisonReport {
        generated_at: timestamp(),
        scenario: scenario.to_string(),
        seed,
        num_devices: model.num_devices(),
        qga,
        pso,
        gain_percent: gain,
    })
}

/// Every scenario in `config` against every seed
pub fn run_suite(config: &SaginConfig, settings: &ExperimentSettings) -> Result<SuiteReport> {
    settings.validate()?;

    let mut rows = Vec::new();
    let mut summary = Vec::new();

    for scenario in config.scenario_names() {
        info!(">>> Evaluating scenario: {} ({} seeds)", scenario, settings.seeds.len());

        let scenario_rows = settings
            .seeds
            .par_iter()
            .map(|&seed| -> Result<SuiteRow> {
                let model = NetworkCostModel::new(config, scenario, seed)?;
                let (qga, pso) = compare_on(&model, settings, seed)?;
                debug!("{} seed {}: QGA {:.4}, PSO {:.4}", scenario, seed, qga.best_cost, pso.best_cost);
                Ok(SuiteRow {
                    scenario: scenario.to_string(),
                    seed,
                    qga_final_cost: qga.best_cost,
                    pso_final_cost: pso.best_cost,
                    gain_percent: gain_percent(qga.best_cost, pso.best_cost),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(s) = ScenarioSummary::from_rows(scenario, &scenario_rows) {
            info!(
                "{}: mean QGA {:.4}, mean PSO {:.4}, mean gain {:.2}%",
                s.scenario, s.mean_qga_cost, s.mean_pso_cost, s.mean_gain_percent
            );
            summary.push(s);
        }
        rows.extend(scenario_rows);
    }

    Ok(SuiteReport {
        generated_at: timestamp(),
        seeds: settings.seeds.clone(),
        rows,
        summary,
    })
}

/// Sweep the latency weight on one scenario and measure the QGA solution's
/// actual latency and energy
pub fn run_tradeoff(
    config: &SaginConfig,
    tradeoff: &TradeoffSettings,
    settings: &ExperimentSettings,
) -> Result<TradeoffReport> {
    settings.validate()?;
    if tradeoff.latency_weights.is_empty() {
        return Err(BenchError::InvalidSettings("no latency weights to sweep".into()));
    }
    if let Some(w) = tradeoff
        .latency_weights
        .iter()
        .find(|w| !(0.0..=1.0).contains(*w))
    {
        return Err(BenchError::InvalidSettings(format!(
            "latency weight {} outside [0, 1]",
            w
        )));
    }

    let base = config.scenario(&tradeoff.scenario)?;
    info!("Starting trade-off analysis for {}", base.name);

    let mut points = Vec::with_capacity(tradeoff.latency_weights.len());
    for &wl in &tradeoff.latency_weights {
        let we = 1.0 - wl;
        let scenario = base.with_weights(wl, we);
        info!("Running with w_L={:.2}, w_E={:.2}", wl, we);

        let samples = settings
            .seeds
            .par_iter()
            .map(|&seed| tradeoff_sample(config, &scenario, settings, seed))
            .collect::<Result<Vec<_>>>()?;

        let n = samples.len() as f64;
        let point = TradeoffPoint {
            weight_latency: wl,
            weight_energy: we,
            mean_latency_s: samples.iter().map(|s| s.0).sum::<f64>() / n,
            mean_energy_j: samples.iter().map(|s| s.1).sum::<f64>() / n,
            mean_cost: samples.iter().map(|s| s.2).sum::<f64>() / n,
        };
        debug!("{:?}", point);
        points.push(point);
    }

    Ok(TradeoffReport {
        generated_at: timestamp(),
        scenario: tradeoff.scenario.clone(),
        seeds: settings.seeds.clone(),
        points,
    })
}

/// `(latency, energy, cost)` of the QGA best solution for one seed
fn tradeoff_sample(
    config: &SaginConfig,
    scenario: &Scenario,
    settings: &ExperimentSettings,
    seed: u64,
) -> Result<(f64, f64, f64)> {
    let model = NetworkCostModel::for_scenario(config, scenario.clone(), seed)?;
    let mut qga = QuantumInspiredOptimizer::new(&model, settings.qga.clone(), seed)?;
    qga.run()?;

    let best = qga.best().ok_or(offload_optimizer::OptimizerError::NotStarted)?;
    let breakdown = model.cost_breakdown(best.decisions.view().insert_axis(Axis(0)))?;
    Ok((breakdown.latency[0], breakdown.energy[0], breakdown.cost[0]))
}

/// Grow the network and time both optimizers plus one population evaluation
/// through the vectorized and loop evaluators
pub fn run_scalability(
    config: &SaginConfig,
    scalability: &ScalabilitySettings,
    settings: &ExperimentSettings,
) -> Result<ScalabilityReport> {
    settings.qga.validate()?;
    settings.pso.validate()?;
    if scalability.device_counts.is_empty() {
        return Err(BenchError::InvalidSettings("no device counts to sweep".into()));
    }

    let base = config.scenario(&scalability.scenario)?;
    let seed = scalability.seed;
    let mut points = Vec::with_capacity(scalability.device_counts.len());

    for &num_devices in &scalability.device_counts {
        info!("Testing scalability with {} devices", num_devices);
        let model = NetworkCostModel::for_scenario(config, base.with_num_devices(num_devices), seed)?;

        let start = Instant::now();
        let qga = QuantumInspiredOptimizer::new(&model, settings.qga.clone(), seed)?.run()?;
        let qga_time_s = start.elapsed().as_secs_f64();

        let start = Instant::now();
        let pso = ParticleSwarmOptimizer::new(&model, settings.pso.clone(), seed)?.run()?;
        let pso_time_s = start.elapsed().as_secs_f64();

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let decisions = Array2::from_shape_simple_fn(
            (settings.qga.population_size, num_devices),
            || rng.gen_range(0..3u8),
        );

        let start = Instant::now();
        model.compute_cost(decisions.view())?;
        let vectorized_eval_ms = start.elapsed().as_secs_f64() * 1000.0;

        let start = Instant::now();
        loop_cost(&model, decisions.view())?;
        let loop_eval_ms = start.elapsed().as_secs_f64() * 1000.0;

        info!(
            "{} devices: QGA {:.2}s ({:.4}), PSO {:.2}s ({:.4}), eval {:.3}ms vs loop {:.3}ms",
            num_devices, qga_time_s, qga.best_cost, pso_time_s, pso.best_cost, vectorized_eval_ms, loop_eval_ms
        );

        points.push(ScalabilityPoint {
            num_devices,
            qga_time_s,
            pso_time_s,
            qga_cost: qga.best_cost,
            pso_cost: pso.best_cost,
            vectorized_eval_ms,
            loop_eval_ms,
        });
    }

    Ok(ScalabilityReport {
        generated_at: timestamp(),
        scenario: scalability.scenario.clone(),
        seed,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagin_env::config::{EMERGENCY_RESCUE, INDUSTRIAL_REMOTE};

    fn quick() -> ExperimentSettings {
        ExperimentSettings::default()
            .with_max_iter(8)
            .with_population(10)
            .with_seeds(vec![0, 1])
    }

    /// Default scenarios shrunk to a handful of devices
    fn small_config() -> SaginConfig {
        let config = SaginConfig::default();
        let scenarios: Vec<Scenario> = config
            .scenarios
            .values()
            .map(|s| s.with_num_devices(6))
            .collect();
        scenarios
            .into_iter()
            .fold(config, |acc, s| acc.with_scenario(s))
    }

    #[test]
    fn test_run_single() {
        let report = run_single(&small_config(), EMERGENCY_RESCUE, 3, &quick()).unwrap();
        assert_eq!(report.num_devices, 6);
        assert_eq!(report.qga.history.len(), 8);
        assert_eq!(report.pso.history.len(), 8);
        assert_eq!(
            report.gain_percent,
            gain_percent(report.qga.best_cost, report.pso.best_cost)
        );
    }

    #[test]
    fn test_run_single_unknown_scenario() {
        let err = run_single(&small_config(), "lunar_base", 0, &quick()).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Env(sagin_env::EnvError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_suite_covers_every_scenario_and_seed() {
        let config = small_config();
        let report = run_suite(&config, &quick()).unwrap();

        assert_eq!(report.rows.len(), 3 * 2);
        assert_eq!(report.summary.len(), 3);
        for s in &report.summary {
            assert_eq!(s.runs, 2);
        }
        // Seeds run in parallel but rows keep seed order per scenario
        let seeds: Vec<u64> = report
            .rows
            .iter()
            .filter(|r| r.scenario == INDUSTRIAL_REMOTE)
            .map(|r| r.seed)
            .collect();
        assert_eq!(seeds, vec![0, 1]);
    }

    #[test]
    fn test_suite_is_reproducible() {
        let config = small_config();
        let a = run_suite(&config, &quick()).unwrap();
        let b = run_suite(&config, &quick()).unwrap();
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn test_suite_rejects_empty_seeds() {
        let settings = quick().with_seeds(Vec::new());
        assert!(matches!(
            run_suite(&small_config(), &settings),
            Err(BenchError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_tradeoff_weights_sum_to_one() {
        let tradeoff = TradeoffSettings {
            latency_weights: vec![0.1, 0.9],
            ..TradeoffSettings::default()
        };
        let report = run_tradeoff(&small_config(), &tradeoff, &quick()).unwrap();

        assert_eq!(report.points.len(), 2);
        for p in &report.points {
            assert!((p.weight_latency + p.weight_energy - 1.0).abs() < 1e-12);
            assert!(p.mean_latency_s > 0.0);
            assert!(p.mean_energy_j > 0.0);
            let weighted = p.weight_latency * p.mean_latency_s + p.weight_energy * p.mean_energy_j;
            assert!((weighted - p.mean_cost).abs() <= 1e-9 * p.mean_cost.max(1e-12));
        }
    }

    #[test]
    fn test_tradeoff_rejects_bad_weight() {
        let tradeoff = TradeoffSettings {
            latency_weights: vec![1.5],
            ..TradeoffSettings::default()
        };
        assert!(run_tradeoff(&small_config(), &tradeoff, &quick()).is_err());
    }

    #[test]
    fn test_scalability_points() {
        let scalability = ScalabilitySettings {
            device_counts: vec![4, 12],
            ..ScalabilitySettings::default()
        };
        let report = run_scalability(&small_config(), &scalability, &quick()).unwrap();

        let counts: Vec<usize> = report.points.iter().map(|p| p.num_devices).collect();
        assert_eq!(counts, vec![4, 12]);
        for p in &report.points {
            assert!(p.qga_cost.is_finite() && p.pso_cost.is_finite());
            assert!(p.qga_time_s >= 0.0 && p.loop_eval_ms >= 0.0);
        }
    }

    #[test]
    fn test_config_file_drives_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sagin.json");
        let file = std::fs::File::create(&path).unwrap();
        serde_json::to_writer_pretty(file, &small_config()).unwrap();

        let loaded = SaginConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.scenario(EMERGENCY_RESCUE).unwrap().num_devices, 6);

        let report = run_single(&loaded, EMERGENCY_RESCUE, 0, &quick()).unwrap();
        assert_eq!(report.num_devices, 6);
    }

    #[test]
    fn test_config_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = SaginConfig::from_json_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, sagin_env::EnvError::Io(_)));
    }

    #[test]
    fn test_settings_round_trip_through_json() {
        let settings = quick();
        let json = serde_json::to_string(&settings).unwrap();
        let back: ExperimentSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seeds, settings.seeds);
        assert_eq!(back.qga.max_iter, 8);
        assert_eq!(back.pso.population_size, 10);

        // Partial documents fall back to defaults
        let partial: ExperimentSettings = serde_json::from_str(r#"{"seeds": [7]}"#).unwrap();
        assert_eq!(partial.seeds, vec![7]);
        assert_eq!(partial.qga, QgaConfig::default());
    }
}
