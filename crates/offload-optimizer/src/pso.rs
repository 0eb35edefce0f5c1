//! Particle Swarm Optimization baseline
//!
//! Particles move through the continuous box `[0, position_ceiling]^N` and
//! are truncated to decision codes for evaluation. Velocity update:
//!
//! ```text
//! v ← w·v + c₁·r₁·(pbest − x) + c₂·r₂·(gbest − x)
//! x ← clamp(x + v, 0, position_ceiling)
//! ```
//!
//! with fresh `r₁, r₂ ~ U(0, 1)` per particle, device and generation.

use crate::{argmin, BestSolution, Optimizer, OptimizerError, Result, RunSummary};
use ndarray::{Array1, Array2, Axis, Zip};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use sagin_env::{NetworkCostModel, MAX_DECISION_CODE};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsoConfig {
    pub population_size: usize,
    pub max_iter: usize,
    /// Inertia weight `w`
    pub inertia: f64,
    /// Cognitive coefficient `c₁`
    pub cognitive: f64,
    /// Social coefficient `c₂`
    pub social: f64,
    /// Upper bound of the position box; must stay below 3 so truncation yields at most 2
    pub position_ceiling: f64,
    /// Standard deviation of the initial velocities
    pub initial_velocity_std: f64,
    pub log_every: usize,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            max_iter: 100,
            inertia: 0.7,
            cognitive: 1.5,
            social: 1.5,
            position_ceiling: 2.99,
            initial_velocity_std: 0.1,
            log_every: 20,
        }
    }
}

impl PsoConfig {
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(OptimizerError::InvalidParameter("population_size must be > 0".into()));
        }
        if self.max_iter == 0 {
            return Err(OptimizerError::InvalidParameter("max_iter must be > 0".into()));
        }
        for (label, value) in [
            ("inertia", self.inertia),
            ("cognitive", self.cognitive),
            ("social", self.social),
            ("initial_velocity_std", self.initial_velocity_std),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(OptimizerError::InvalidParameter(format!(
                    "{} must be >= 0, got {}",
                    label, value
                )));
            }
        }
        let ceiling_limit = f64::from(MAX_DECISION_CODE) + 1.0;
        if !(self.position_ceiling > 0.0 && self.position_ceiling < ceiling_limit) {
            return Err(OptimizerError::InvalidParameter(format!(
                "position_ceiling must lie in (0, {}), got {}",
                ceiling_limit, self.position_ceiling
            )));
        }
        Ok(())
    }
}

/// Global best together with the continuous position that produced it
#[derive(Debug, Clone)]
struct SwarmBest {
    solution: BestSolution,
    position: Array1<f64>,
}

pub struct ParticleSwarmOptimizer<'a> {
    model: &'a NetworkCostModel,
    config: PsoConfig,
    seed: u64,
    /// `[P, N]`
    position: Array2<f64>,
    /// `[P, N]`
    velocity: Array2<f64>,
    personal_best_position: Array2<f64>,
    /// `[P]`, `+∞` until the first evaluation
    personal_best_cost: Array1<f64>,
    global_best: Option<SwarmBest>,
    rng: ChaCha8Rng,
    history: Vec<f64>,
}

/// Truncate continuous positions to decision codes
pub fn discretize(position: &Array2<f64>) -> Array2<u8> {
    let max = f64::from(MAX_DECISION_CODE);
    position.mapv(|x| x.clamp(0.0, max).trunc() as u8)
}

impl<'a> ParticleSwarmOptimizer<'a> {
    pub fn new(model: &'a NetworkCostModel, config: PsoConfig, seed: u64) -> Result<Self> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let shape = (config.population_size, model.num_devices());
        let ceiling = config.position_ceiling;
        let position = Array2::from_shape_simple_fn(shape, || rng.gen_range(0.0..ceiling));
        let std = config.initial_velocity_std;
        let velocity = Array2::from_shape_simple_fn(shape, || rng.sample::<f64, _>(StandardNormal) * std);

        Ok(Self {
            model,
            seed,
            personal_best_position: position.clone(),
            personal_best_cost: Array1::from_elem(config.population_size, f64::INFINITY),
            position,
            velocity,
            global_best: None,
            rng,
            history: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &PsoConfig {
        &self.config
    }

    pub fn position(&self) -> &Array2<f64> {
        &self.position
    }

    pub fn velocity(&self) -> &Array2<f64> {
        &self.velocity
    }

    pub fn personal_best_cost(&self) -> &Array1<f64> {
        &self.personal_best_cost
    }

    /// Continuous position of the global best particle
    pub fn global_best_position(&self) -> Option<&Array1<f64>> {
        self.global_best.as_ref().map(|b| &b.position)
    }

    /// Run a single generation and return the best-so-far cost
    pub fn step(&mut self, generation: usize) -> Result<f64> {
        let decisions = discretize(&self.position);
        let costs = self.model.compute_cost(decisions.view())?;

        let improved = Zip::from(&costs)
            .and(&self.personal_best_cost)
            .map_collect(|&c, &best| c < best);
        Zip::from(self.personal_best_position.rows_mut())
            .and(self.position.rows())
            .and(&improved)
            .for_each(|mut best, current, &hit| {
                if hit {
                    best.assign(&current);
                }
            });
        Zip::from(&mut self.personal_best_cost)
            .and(&costs)
            .and(&improved)
            .for_each(|best, &c, &hit| {
                if hit {
                    *best = c;
                }
            });

        let (idx, generation_best) = argmin(&costs).ok_or(OptimizerError::NotStarted)?;
        let global = match self.global_best.take() {
            Some(best) if generation_best >= best.solution.cost => best,
            _ => SwarmBest {
                solution: BestSolution::new(generation_best, decisions.row(idx), generation),
                position: self.position.row(idx).to_owned(),
            },
        };

        self.move_particles(&global.position);

        let cost = global.solution.cost;
        self.global_best = Some(global);
        Ok(cost)
    }

    fn move_particles(&mut self, global_position: &Array1<f64>) {
        let dim = self.position.raw_dim();
        let r1 = Array2::from_shape_simple_fn(dim.clone(), || self.rng.gen::<f64>());
        let r2 = Array2::from_shape_simple_fn(dim, || self.rng.gen::<f64>());

        let w = self.config.inertia;
        let c1 = self.config.cognitive;
        let c2 = self.config.social;

        Zip::from(&mut self.velocity)
            .and(&self.position)
            .and(&self.personal_best_position)
            .and_broadcast(global_position.view().insert_axis(Axis(0)))
            .and(&r1)
            .and(&r2)
            .for_each(|v, &x, &pbest, &gbest, &a, &b| {
                *v = w * *v + c1 * a * (pbest - x) + c2 * b * (gbest - x);
            });

        let ceiling = self.config.position_ceiling;
        Zip::from(&mut self.position)
            .and(&self.velocity)
            .for_each(|x, &v| *x = (*x + v).clamp(0.0, ceiling));
    }
}

impl Optimizer for ParticleSwarmOptimizer<'_> {
    fn name(&self) -> &'static str {
        "PSO"
    }

    fn run(&mut self) -> Result<RunSummary> {
        let start = Instant::now();
        self.history.clear();

        info!(
            "PSO on {}: population {}, {} devices, {} generations",
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
            "PSO finished: best cost {:.4} in {:.1} ms",
            summary.best_cost, summary.elapsed_ms
        );
        Ok(summary)
    }

    fn best(&self) -> Option<&BestSolution> {
        self.global_best.as_ref().map(|b| &b.solution)
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
    use sagin_env::config::INDUSTRIAL_REMOTE;
    use sagin_env::SaginConfig;

    fn small_model(seed: u64) -> NetworkCostModel {
        let config = SaginConfig::default();
        let scenario = config.scenario(INDUSTRIAL_REMOTE).unwrap().with_num_devices(10);
        NetworkCostModel::for_scenario(&config, scenario, seed).unwrap()
    }

    fn small_config() -> PsoConfig {
        PsoConfig {
            population_size: 16,
            max_iter: 25,
            ..PsoConfig::default()
        }
    }

    #[test]
    fn test_discretize_truncates() {
        let x = array![[0.0, 0.99, 1.0, 1.5], [2.0, 2.99, -0.3, 4.2]];
        assert_eq!(discretize(&x), array![[0u8, 0, 1, 1], [2, 2, 0, 2]]);
    }

    #[test]
    fn test_initial_state_in_bounds() {
        let model = small_model(0);
        let pso = ParticleSwarmOptimizer::new(&model, small_config(), 3).unwrap();
        assert_eq!(pso.position().dim(), (16, 10));
        assert!(pso.position().iter().all(|&x| (0.0..2.99).contains(&x)));
        assert!(pso.personal_best_cost().iter().all(|c| c.is_infinite()));
        assert!(pso.best().is_none());
        assert!(pso.global_best_position().is_none());
    }

    #[test]
    fn test_history_length_and_monotone() {
        let model = small_model(1);
        let mut pso = ParticleSwarmOptimizer::new(&model, small_config(), 1).unwrap();
        let summary = pso.run().unwrap();

        assert_eq!(summary.history.len(), 25);
        assert!(is_non_increasing(&summary.history));
        assert_eq!(summary.algorithm, "PSO");
        assert_eq!(summary.decision_counts.iter().sum::<usize>(), 10);
    }

    #[test]
    fn test_same_seed_same_history() {
        let model = small_model(2);
        let a = ParticleSwarmOptimizer::new(&model, small_config(), 8).unwrap().run().unwrap();
        let b = ParticleSwarmOptimizer::new(&model, small_config(), 8).unwrap().run().unwrap();
        assert_eq!(a.history, b.history);
        assert_eq!(a.best_decisions, b.best_decisions);
    }

    #[test]
    fn test_positions_stay_in_box() {
        let model = small_model(3);
        let config = PsoConfig {
            inertia: 1.2,
            initial_velocity_std: 5.0,
            ..small_config()
        };
        let mut pso = ParticleSwarmOptimizer::new(&model, config, 3).unwrap();
        pso.run().unwrap();
        assert!(pso.position().iter().all(|&x| (0.0..=2.99).contains(&x)));
    }

    #[test]
    fn test_personal_bests_bound_global_best() {
        let model = small_model(4);
        let mut pso = ParticleSwarmOptimizer::new(&model, small_config(), 4).unwrap();
        pso.run().unwrap();

        let global = pso.best().unwrap().cost;
        let min_personal = pso
            .personal_best_cost()
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        assert_eq!(global, min_personal);

        let position = pso.global_best_position().unwrap();
        let decoded = discretize(&position.clone().insert_axis(Axis(0)));
        assert_eq!(decoded.row(0), pso.best().unwrap().decisions);
    }

    #[test]
    fn test_first_step_seeds_global_best() {
        let model = small_model(0);
        let mut pso = ParticleSwarmOptimizer::new(&model, small_config(), 0).unwrap();
        let cost = pso.step(0).unwrap();
        assert_eq!(pso.best().unwrap().cost, cost);
        assert!(pso.personal_best_cost().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_invalid_config() {
        let model = small_model(0);
        for config in [
            PsoConfig { population_size: 0, ..PsoConfig::default() },
            PsoConfig { max_iter: 0, ..PsoConfig::default() },
            PsoConfig { position_ceiling: 3.0, ..PsoConfig::default() },
            PsoConfig { inertia: f64::NAN, ..PsoConfig::default() },
        ] {
            assert!(ParticleSwarmOptimizer::new(&model, config, 0).is_err());
        }
    }
}
