//! Offloading Optimizers
//!
//! Population-based search over per-device offloading decisions, scored by
//! [`sagin_env::NetworkCostModel`]:
//!
//! - [`QuantumInspiredOptimizer`]: two-qubit-style registers per device,
//!   observed through `sin²θ` and steered by an annealed rotation gate.
//! - [`ParticleSwarmOptimizer`]: continuous relaxation of the decision space,
//!   truncated to decision codes at evaluation time.
//!
//! Both optimizers borrow the same cost model so their results are directly
//! comparable. Generations run strictly in sequence; all work inside a
//! generation is expressed over whole `[population, devices]` arrays.

use ndarray::{Array1, ArrayView1};
use sagin_env::decision::decision_histogram;
use sagin_env::{EnvError, NUM_DECISIONS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod pso;
pub mod qga;

pub use pso::{ParticleSwarmOptimizer, PsoConfig};
pub use qga::{QgaConfig, QuantumInspiredOptimizer};

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error("Invalid optimizer parameter: {0}")]
    InvalidParameter(String),
    #[error("Register shape {actual:?} does not match expected {expected:?}")]
    RegisterShape {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },
    #[error("No generation has completed yet")]
    NotStarted,
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

/// Lowest-cost decision vector seen so far
#[derive(Debug, Clone, PartialEq)]
pub struct BestSolution {
    pub cost: f64,
    /// `[num_devices]` decision codes
    pub decisions: Array1<u8>,
    /// Generation in which this solution was first observed
    pub generation: usize,
}

impl BestSolution {
    pub(crate) fn new(cost: f64, decisions: ArrayView1<'_, u8>, generation: usize) -> Self {
        Self {
            cost,
            decisions: decisions.to_owned(),
            generation,
        }
    }
}

/// Outcome of one optimizer run, ready for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub algorithm: String,
    pub scenario: String,
    pub seed: u64,
    pub generations: usize,
    /// Best-so-far cost after every generation
    pub history: Vec<f64>,
    pub best_cost: f64,
    pub best_generation: usize,
    pub best_decisions: Vec<u8>,
    /// Devices assigned to local / relay / satellite in the best solution
    pub decision_counts: [usize; NUM_DECISIONS],
    pub elapsed_ms: f64,
}

impl RunSummary {
    pub(crate) fn build(
        algorithm: &str,
        scenario: &str,
        seed: u64,
        history: &[f64],
        best: &BestSolution,
        elapsed: Duration,
    ) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            scenario: scenario.to_string(),
            seed,
            generations: history.len(),
            history: history.to_vec(),
            best_cost: best.cost,
            best_generation: best.generation,
            best_decisions: best.decisions.to_vec(),
            decision_counts: decision_histogram(best.decisions.iter()),
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }
}

/// Common surface of the offloading optimizers
pub trait Optimizer {
    fn name(&self) -> &'static str;

    /// Run the full generation budget and summarize the result
    fn run(&mut self) -> Result<RunSummary>;

    /// Best solution so far; `None` until the first generation completes
    fn best(&self) -> Option<&BestSolution>;

    /// Best-so-far cost per completed generation
    fn history(&self) -> &[f64];
}

/// Index and value of the smallest cost; the first index wins ties
pub(crate) fn argmin(costs: &Array1<f64>) -> Option<(usize, f64)> {
    costs
        .iter()
        .copied()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// True when every entry is no larger than the one before it
pub fn is_non_increasing(history: &[f64]) -> bool {
    history.windows(2).all(|w| w[1] <= w[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_argmin_first_tie_wins() {
        assert_eq!(argmin(&array![3.0, 1.0, 1.0, 2.0]), Some((1, 1.0)));
        assert_eq!(argmin(&Array1::<f64>::zeros(0)), None);
    }

    #[test]
    fn test_non_increasing() {
        assert!(is_non_increasing(&[5.0, 4.0, 4.0, 1.0]));
        assert!(!is_non_increasing(&[5.0, 4.0, 4.5]));
        assert!(is_non_increasing(&[]));
    }
}
