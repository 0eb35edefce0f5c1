//! Serializable experiment reports

use crate::Result;
use offload_optimizer::RunSummary;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Relative improvement of QGA over PSO in percent, `(pso − qga) / pso · 100`
pub fn gain_percent(qga_cost: f64, pso_cost: f64) -> f64 {
    (pso_cost - qga_cost) / pso_cost * 100.0
}

/// QGA and PSO on one network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub generated_at: String,
    pub scenario: String,
    pub seed: u64,
    pub num_devices: usize,
    pub qga: RunSummary,
    pub pso: RunSummary,
    pub gain_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteRow {
    pub scenario: String,
    pub seed: u64,
    pub qga_final_cost: f64,
    pub pso_final_cost: f64,
    pub gain_percent: f64,
}

/// Means over all seeds of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub scenario: String,
    pub runs: usize,
    pub mean_qga_cost: f64,
    pub mean_pso_cost: f64,
    pub mean_gain_percent: f64,
}

impl ScenarioSummary {
    /// Summarize the rows belonging to `scenario`; `None` when there are none
    pub fn from_rows(scenario: &str, rows: &[SuiteRow]) -> Option<Self> {
        let matching: Vec<&SuiteRow> = rows.iter().filter(|r| r.scenario == scenario).collect();
        if matching.is_empty() {
            return None;
        }
        let n = matching.len() as f64;
        let mean = |f: fn(&SuiteRow) -> f64| matching.iter().map(|r| f(r)).sum::<f64>() / n;

        Some(Self {
            scenario: scenario.to_string(),
            runs: matching.len(),
            mean_qga_cost: mean(|r| r.qga_final_cost),
            mean_pso_cost: mean(|r| r.pso_final_cost),
            mean_gain_percent: mean(|r| r.gain_percent),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub generated_at: String,
    pub seeds: Vec<u64>,
    pub rows: Vec<SuiteRow>,
    pub summary: Vec<ScenarioSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeoffPoint {
    pub weight_latency: f64,
    pub weight_energy: f64,
    /// Mean per-device latency of the best solution (s), averaged over seeds
    pub mean_latency_s: f64,
    /// Mean per-device energy of the best solution (J), averaged over seeds
    pub mean_energy_j: f64,
    pub mean_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeoffReport {
    pub generated_at: String,
    pub scenario: String,
    pub seeds: Vec<u64>,
    pub points: Vec<TradeoffPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalabilityPoint {
    pub num_devices: usize,
    pub qga_time_s: f64,
    pub pso_time_s: f64,
    pub qga_cost: f64,
    pub pso_cost: f64,
    /// One vectorized population evaluation
    pub vectorized_eval_ms: f64,
    /// The same population scored by the per-member loop evaluator
    pub loop_eval_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalabilityReport {
    pub generated_at: String,
    pub scenario: String,
    pub seed: u64,
    pub points: Vec<ScalabilityPoint>,
}

/// Current UTC time for report headers
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Write any report as pretty-printed JSON
pub fn write_json<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    info!("Writing report to {:?}", path);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}
