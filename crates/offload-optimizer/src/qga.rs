//! Quantum-Inspired Genetic Algorithm
//!
//! Every population member holds, per device, a register of two angles
//! `θ ∈ (ε, π/2 − ε)`. Observing a register draws two independent bits with
//! `P(bit = 1) = sin²θ` and decodes them as `min(2·b₀ + b₁, 2)`.
//!
//! One generation:
//!
//! 1. **Observe** all registers (θ is left untouched)
//! 2. **Evaluate** the decoded decisions through the cost model
//! 3. **Track best**: replace the best register only on a strictly lower cost
//! 4. **Evolve**: rotate each angle towards the best register's bit,
//!    `+Δ` for (member 0, best 1), `−Δ` for (member 1, best 0), with
//!    `Δ = Δ₀·(1 − g/G)`; perturb a random subset of angles; clamp
//! 5. Record the best-so-far cost

use crate::{argmin, BestSolution, Optimizer, OptimizerError, Result, RunSummary};
use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sagin_env::{decode_bits, NetworkCostModel};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::time::Instant;
use tracing::{debug, info};

/// Bits per device register
pub const BITS_PER_DEVICE: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QgaConfig {
    pub population_size: usize,
    /// Generation budget; the run never stops early
    pub max_iter: usize,
    /// Rotation step at generation 0 (rad)
    pub base_step: f64,
    /// Angles are kept inside `(theta_epsilon, π/2 − theta_epsilon)`
    pub theta_epsilon: f64,
    /// Probability that an angle is perturbed in a generation
    pub mutation_rate: f64,
    /// Perturbations are drawn from `U(−mutation_scale, mutation_scale)`
    pub mutation_scale: f64,
    /// Emit an info-level progress line every this many generations
    pub log_every: usize,
}

impl Default for QgaConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            max_iter: 100,
            base_step: 0.05 * PI,
            theta_epsilon: 0.01,
            mutation_rate: 0.01,
            mutation_scale: 0.05 * PI,
            log_every: 20,
        }
    }
}

impl QgaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(OptimizerError::InvalidParameter("population_size must be > 0".into()));
        }
        if self.max_iter == 0 {
            return Err(OptimizerError::InvalidParameter("max_iter must be > 0".into()));
        }
        if !(self.base_step.is_finite() && self.base_step > 0.0) {
            return Err(OptimizerError::InvalidParameter(format!(
                "base_step must be positive, got {}",
                self.base_step
            )));
        }
        if !(self.theta_epsilon > 0.0 && self.theta_epsilon < FRAC_PI_4) {
            return Err(OptimizerError::InvalidParameter(format!(
                "theta_epsilon must lie in (0, π/4), got {}",
                self.theta_epsilon
            )));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(OptimizerError::InvalidParameter(format!(
                "mutation_rate must lie in [0, 1], got {}",
                self.mutation_rate
            )));
        }
        if !(self.mutation_scale.is_finite() && self.mutation_scale >= 0.0) {
            return Err(OptimizerError::InvalidParameter(format!(
                "mutation_scale must be >= 0, got {}",
                self.mutation_scale
            )));
        }
        Ok(())
    }
}

/// One collapse of the whole population
#[derive(Debug, Clone)]
pub struct Observation {
    /// `[P, N, 2]` sampled bits
    pub bits: Array3<u8>,
    /// `[P, N]` decoded decision codes
    pub decisions: Array2<u8>,
}

/// Best solution together with the register bits that produced it
#[derive(Debug, Clone)]
struct QuantumBest {
    solution: BestSolution,
    /// `[N, 2]`
    bits: Array2<u8>,
}

pub struct QuantumInspiredOptimizer<'a> {
    model: &'a NetworkCostModel,
    config: QgaConfig,
    seed: u64,
    /// `[P, N, 2]` rotation angles
    theta: Array3<f64>,
    rng: ChaCha8Rng,
    best: Option<QuantumBest>,
    history: Vec<f64>,
}

impl<'a> QuantumInspiredOptimizer<'a> {
    pub fn new(model: &'a NetworkCostModel, config: QgaConfig, seed: u64) -> Result<Self> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let shape = (config.population_size, model.num_devices(), BITS_PER_DEVICE);
        let lo = config.theta_epsilon;
        let hi = FRAC_PI_2 - config.theta_epsilon;
        let theta = Array3::from_shape_simple_fn(shape, || (rng.gen::<f64>() * FRAC_PI_2).clamp(lo, hi));

        Ok(Self {
            model,
            config,
            seed,
            theta,
            rng,
            best: None,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &QgaConfig {
        &self.config
    }

    /// Current `[P, N, 2]` angles
    pub fn theta(&self) -> &Array3<f64> {
        &self.theta
    }

    /// Replace the angle state; values are clamped into the valid open interval
    pub fn set_theta(&mut self, theta: Array3<f64>) -> Result<()> {
        let expected = self.theta.dim();
        if theta.dim() != expected {
            return Err(OptimizerError::RegisterShape {
                expected,
                actual: theta.dim(),
            });
        }
        self.theta = theta;
        self.clamp_theta();
        Ok(())
    }

    /// Bits of the best register, `[N, 2]`
    pub fn best_bits(&self) -> Option<ArrayView2<'_, u8>> {
        self.best.as_ref().map(|b| b.bits.view())
    }

    /// Rotation step for a generation, decaying linearly to zero over the budget
    pub fn step_size(&self, generation: usize) -> f64 {
        self.config.base_step * (1.0 - generation as f64 / self.config.max_iter as f64)
    }

    /// Collapse every register into bits and decisions
    pub fn observe(&mut self) -> Observation {
        let draws = Array3::from_shape_simple_fn(self.theta.raw_dim(), || self.rng.gen::<f64>());
        let bits = Zip::from(&self.theta)
            .and(&draws)
            .map_collect(|&t, &u| u8::from(u < t.sin().powi(2)));

        let decisions = Zip::from(bits.index_axis(Axis(2), 0))
            .and(bits.index_axis(Axis(2), 1))
            .map_collect(|&high, &low| decode_bits(high, low));

        Observation { bits, decisions }
    }

    /// Run a single generation and return the best-so-far cost
    pub fn step(&mut self, generation: usize) -> Result<f64> {
        let obs = self.observe();
        let costs = self.model.compute_cost(obs.decisions.view())?;
        let (idx, generation_best) = argmin(&costs).ok_or(OptimizerError::NotStarted)?;

        // Generation 0 always seeds the best register before any rotation.
        let best = match self.best.take() {
            Some(best) if generation_best >= best.solution.cost => best,
            _ => QuantumBest {
                solution: BestSolution::new(generation_best, obs.decisions.row(idx), generation),
                bits: obs.bits.index_axis(Axis(0), idx).to_owned(),
            },
        };

        self.evolve(&obs.bits, &best.bits, generation);

        let cost = best.solution.cost;
        self.best = Some(best);
        Ok(cost)
    }

    fn evolve(&mut self, bits: &Array3<u8>, best_bits: &Array2<u8>, generation: usize) {
        let step = self.step_size(generation);
        rotate(&mut self.theta, bits, best_bits, step);

        if self.config.mutation_rate > 0.0 && self.config.mutation_scale > 0.0 {
            let rate = self.config.mutation_rate;
            let scale = self.config.mutation_scale;
            let dim = self.theta.raw_dim();
            let mask = Array3::from_shape_simple_fn(dim.clone(), || self.rng.gen::<f64>() < rate);
            let noise = Array3::from_shape_simple_fn(dim, || self.rng.gen_range(-scale..=scale));

            Zip::from(&mut self.theta)
                .and(&mask)
                .and(&noise)
                .for_each(|t, &hit, &delta| {
                    if hit {
                        *t += delta;
                    }
                });
        }

        self.clamp_theta();
    }

    fn clamp_theta(&mut self) {
        let lo = self.config.theta_epsilon;
        let hi = FRAC_PI_2 - self.config.theta_epsilon;
        self.theta.mapv_inplace(|t| t.clamp(lo, hi));
    }
}

/// Rotation direction for one angle given the member's bit and the best bit
#[inline]
pub fn rotation_direction(member_bit: u8, best_bit: u8) -> f64 {
    match (member_bit, best_bit) {
        (0, 1) => 1.0,
        (1, 0) => -1.0,
        _ => 0.0,
    }
}

/// Apply the rotation gate to every angle of the population (no clamping).
///
/// `best_bits` `[N, 2]` is broadcast across the population axis of `theta`
/// and `bits` `[P, N, 2]`.
pub fn rotate(theta: &mut Array3<f64>, bits: &Array3<u8>, best_bits: &Array2<u8>, step: f64) {
    Zip::from(theta)
        .and(bits)
        .and_broadcast(best_bits)
        .for_each(|t, &member, &best| *t += rotation_direction(member, best) * step);
}

impl Optimizer for QuantumInspiredOptimizer<'_> {
    fn name(&self) -> &'static str {
        "QGA"
    }

    fn run(&mut self) -> Result<RunSummary> {
        let start = Instant::now();
        self.history.clear();

        info!(
            "QGA on {}: population {}, {} devices, {} generations",
            self.model.scenario().name,
            self.config.population_size,
            self.model.num_devices(),
            self.config.max_iter
        );

        for generation in 0..self.config.max_iter {
            let cost = self.step(generation)?;
            self.history.push(cost);

            if generation % self.config.log_every.max(1) == 0 {
                info!("Generation {}: best cost = {:.4}", generation, cost);
            } else {
                debug!("Generation {}: best cost = {:.6}", generation, cost);
            }
        }

        let best = self.best().ok_or(OptimizerError::NotStarted)?;
        let summary = RunSummary::build(
            self.name(),
            &self.model.scenario().name,
            self.seed,
            &self.history,
            best,
            start.elapsed(),
        );
        info!(
            "QGA finished: best cost {:.4} in {:.1} ms",
            summary.best_cost, summary.elapsed_ms
        );
        Ok(summary)
    }

    fn best(&self) -> Option<&BestSolution> {
        self.best.as_ref().map(|b| &b.solution)
    }

    fn history(&self) -> &[f64] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_non_increasing;
    use ndarray::array;
    use sagin_env::config::{Scenario, EMERGENCY_RESCUE};
    use sagin_env::SaginConfig;

    fn small_model(seed: u64) -> NetworkCostModel {
        let config = SaginConfig::default();
        let scenario = config.scenario(EMERGENCY_RESCUE).unwrap().with_num_devices(12);
        NetworkCostModel::for_scenario(&config, scenario, seed).unwrap()
    }

    fn small_config() -> QgaConfig {
        QgaConfig {
            population_size: 16,
            max_iter: 30,
            ..QgaConfig::default()
        }
    }

    #[test]
    fn test_history_length_and_monotone() {
        let model = small_model(0);
        let mut qga = QuantumInspiredOptimizer::new(&model, small_config(), 0).unwrap();
        let summary = qga.run().unwrap();

        assert_eq!(summary.history.len(), 30);
        assert!(is_non_increasing(&summary.history));
        assert_eq!(summary.best_cost, *summary.history.last().unwrap());
    }

    #[test]
    fn test_same_seed_same_history() {
        let model = small_model(4);
        let a = QuantumInspiredOptimizer::new(&model, small_config(), 11).unwrap().run().unwrap();
        let b = QuantumInspiredOptimizer::new(&model, small_config(), 11).unwrap().run().unwrap();
        assert_eq!(a.history, b.history);
        assert_eq!(a.best_decisions, b.best_decisions);
    }

    #[test]
    fn test_best_is_consistent_with_model() {
        let model = small_model(2);
        let mut qga = QuantumInspiredOptimizer::new(&model, small_config(), 5).unwrap();
        qga.run().unwrap();

        let best = qga.best().unwrap();
        let recomputed = model
            .compute_cost(best.decisions.view().insert_axis(Axis(0)))
            .unwrap();
        assert!((recomputed[0] - best.cost).abs() <= 1e-12 * best.cost);

        let bits = qga.best_bits().unwrap();
        for (device, &code) in best.decisions.iter().enumerate() {
            assert_eq!(decode_bits(bits[[device, 0]], bits[[device, 1]]), code);
        }
    }

    #[test]
    fn test_best_unset_before_first_generation() {
        let model = small_model(0);
        let qga = QuantumInspiredOptimizer::new(&model, small_config(), 0).unwrap();
        assert!(qga.best().is_none());
        assert!(qga.best_bits().is_none());
        assert!(qga.history().is_empty());
    }

    #[test]
    fn test_first_step_seeds_best() {
        let model = small_model(0);
        let mut qga = QuantumInspiredOptimizer::new(&model, small_config(), 0).unwrap();
        let cost = qga.step(0).unwrap();
        let best = qga.best().unwrap();
        assert_eq!(best.cost, cost);
        assert_eq!(best.generation, 0);
    }

    #[test]
    fn test_rotation_direction_table() {
        let mut theta = Array3::from_elem((1, 2, 2), 0.5);
        let bits = array![[[0u8, 1], [1, 0]]];
        let best = array![[1u8, 0], [1, 0]];

        rotate(&mut theta, &bits, &best, 0.1);

        // member 0 / best 1: increase
        assert!(theta[[0, 0, 0]] > 0.5);
        // member 1 / best 0: decrease
        assert!(theta[[0, 0, 1]] < 0.5);
        // equal bits: unchanged
        assert_eq!(theta[[0, 1, 0]], 0.5);
        assert_eq!(theta[[0, 1, 1]], 0.5);
    }

    #[test]
    fn test_evolve_without_mutation_only_rotates() {
        let model = small_model(0);
        let config = QgaConfig {
            mutation_rate: 0.0,
            ..small_config()
        };
        let mut qga = QuantumInspiredOptimizer::new(&model, config, 3).unwrap();
        let before = qga.theta().clone();

        let obs = qga.observe();
        let best_bits = obs.bits.index_axis(Axis(0), 0).to_owned();
        qga.evolve(&obs.bits, &best_bits, 0);

        // Member 0 agrees with itself everywhere, so its angles never move
        assert_eq!(
            qga.theta().index_axis(Axis(0), 0),
            before.index_axis(Axis(0), 0)
        );
    }

    #[test]
    fn test_step_size_anneals() {
        let model = small_model(0);
        let qga = QuantumInspiredOptimizer::new(&model, small_config(), 0).unwrap();
        assert_eq!(qga.step_size(0), 0.05 * PI);
        assert!(qga.step_size(15) < qga.step_size(0));
        assert!((qga.step_size(30)).abs() < 1e-15);
        assert!(qga.step_size(29) > 0.0);
    }

    #[test]
    fn test_theta_stays_inside_bounds() {
        let model = small_model(1);
        let config = QgaConfig {
            mutation_rate: 0.5,
            mutation_scale: 1.0,
            ..small_config()
        };
        let mut qga = QuantumInspiredOptimizer::new(&model, config, 9).unwrap();
        qga.run().unwrap();

        let eps = qga.config().theta_epsilon;
        assert!(qga
            .theta()
            .iter()
            .all(|&t| t >= eps && t <= FRAC_PI_2 - eps));
    }

    #[test]
    fn test_set_theta_rejects_bad_shape() {
        let model = small_model(0);
        let mut qga = QuantumInspiredOptimizer::new(&model, small_config(), 0).unwrap();
        let err = qga.set_theta(Array3::zeros((3, 3, 2))).unwrap_err();
        assert!(matches!(err, OptimizerError::RegisterShape { .. }));
    }

    #[test]
    fn test_saturated_registers_collapse_to_extremes() {
        let model = small_model(0);
        let mut qga = QuantumInspiredOptimizer::new(&model, small_config(), 0).unwrap();
        let dim = qga.theta().dim();

        // Angles at the lower clamp: bits are almost always 0 (local)
        qga.set_theta(Array3::zeros(dim)).unwrap();
        let obs = qga.observe();
        let local = obs.decisions.iter().filter(|&&d| d == 0).count();
        assert!(local as f64 > 0.99 * obs.decisions.len() as f64);

        // Angles at the upper clamp: bits are almost always 1, clamped to satellite
        qga.set_theta(Array3::from_elem(dim, FRAC_PI_2)).unwrap();
        let obs = qga.observe();
        let satellite = obs.decisions.iter().filter(|&&d| d == 2).count();
        assert!(satellite as f64 > 0.99 * obs.decisions.len() as f64);
    }

    #[test]
    fn test_uniform_registers_favour_satellite() {
        let config = SaginConfig::default()
            .with_scenario(Scenario::new("wide", 100, (0.5, 1.0), 0.5, 0.5));
        let model = NetworkCostModel::new(&config, "wide", 0).unwrap();
        let qga_config = QgaConfig {
            population_size: 200,
            ..QgaConfig::default()
        };
        let mut qga = QuantumInspiredOptimizer::new(&model, qga_config, 0).unwrap();
        let dim = qga.theta().dim();
        qga.set_theta(Array3::from_elem(dim, PI / 4.0)).unwrap();

        let obs = qga.observe();
        let total = obs.decisions.len() as f64;
        let satellite = obs.decisions.iter().filter(|&&d| d == 2).count() as f64 / total;
        // (1,0) and (1,1) both decode to satellite
        assert!((satellite - 0.5).abs() < 0.02, "satellite share {}", satellite);
    }

    #[test]
    fn test_invalid_config() {
        let model = small_model(0);
        for config in [
            QgaConfig { population_size: 0, ..QgaConfig::default() },
            QgaConfig { max_iter: 0, ..QgaConfig::default() },
            QgaConfig { base_step: -1.0, ..QgaConfig::default() },
            QgaConfig { mutation_rate: 1.5, ..QgaConfig::default() },
        ] {
            assert!(QuantumInspiredOptimizer::new(&model, config, 0).is_err());
        }
    }
}
