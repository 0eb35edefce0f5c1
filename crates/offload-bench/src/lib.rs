//! SAGIN Offloading Benchmarks
//!
//! Experiment drivers comparing the quantum-inspired optimizer against the
//! particle-swarm baseline:
//!
//! - **Single run**: one scenario, one seed, both optimizers on the same network
//! - **Suite**: every scenario × seed, with per-scenario mean gain
//! - **Trade-off**: latency-weight sweep on a fixed scenario
//! - **Scalability**: device-count sweep with wall-clock timings

use thiserror::Error;

pub mod experiments;
pub mod report;

pub use experiments::{
    run_scalability, run_single, run_suite, run_tradeoff, ExperimentSettings, ScalabilitySettings,
    TradeoffSettings,
};
pub use report::{
    write_json, ComparisonReport, ScalabilityPoint, ScalabilityReport, ScenarioSummary,
    SuiteReport, SuiteRow, TradeoffPoint, TradeoffReport,
};

#[derive(Error, Debug)]
pub enum BenchError {
    #[error(transparent)]
    Env(#[from] sagin_env::EnvError),
    #[error(transparent)]
    Optimizer(#[from] offload_optimizer::OptimizerError),
    #[error("Invalid experiment settings: {0}")]
    InvalidSettings(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;
