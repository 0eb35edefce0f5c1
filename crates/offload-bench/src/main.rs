//! SAGIN Offloading Benchmark CLI
//!
//! Usage:
//!   sagin-bench run --scenario urban_iot --seed 0
//!   sagin-bench suite --seeds 10 --output results/experimental_results.json
//!   sagin-bench tradeoff --weights 0.1,0.3,0.5,0.7,0.9
//!   sagin-bench scalability --devices 50,100,200,500,1000 --config sagin.json

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use offload_bench::{
    run_scalability, run_single, run_suite, run_tradeoff, write_json, ExperimentSettings,
    ScalabilitySettings, TradeoffSettings,
};
use sagin_env::config::URBAN_IOT;
use sagin_env::SaginConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sagin-bench",
    about = "Compare quantum-inspired and particle-swarm task offloading on SAGIN scenarios"
)]
struct Args {
    /// JSON configuration override (constants, scale, scenarios)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output JSON file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Optimizer budget shared by every subcommand
#[derive(ClapArgs, Debug)]
struct Budget {
    /// Population size for both optimizers
    #[arg(long, default_value_t = 100)]
    population: usize,

    /// Generations for both optimizers
    #[arg(long, default_value_t = 100)]
    generations: usize,
}

impl Budget {
    fn settings(&self) -> ExperimentSettings {
        ExperimentSettings::default()
            .with_population(self.population)
            .with_max_iter(self.generations)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run QGA and PSO once on one scenario
    Run {
        #[arg(short, long, default_value = URBAN_IOT)]
        scenario: String,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[command(flatten)]
        budget: Budget,
    },
    /// Every scenario over seeds 0..N
    Suite {
        #[arg(long, default_value_t = 10)]
        seeds: u64,

        #[command(flatten)]
        budget: Budget,
    },
    /// Sweep the latency weight (energy weight = 1 - latency weight)
    Tradeoff {
        #[arg(short, long, default_value = URBAN_IOT)]
        scenario: String,

        #[arg(long, value_delimiter = ',', default_values_t = [0.1, 0.3, 0.5, 0.7, 0.9])]
        weights: Vec<f64>,

        #[arg(long, default_value_t = 5)]
        seeds: u64,

        #[command(flatten)]
        budget: Budget,
    },
    /// Time both optimizers over growing device counts
    Scalability {
        #[arg(short, long, default_value = URBAN_IOT)]
        scenario: String,

        #[arg(long, value_delimiter = ',', default_values_t = [50, 100, 200, 500, 1000])]
        devices: Vec<usize>,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[command(flatten)]
        budget: Budget,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("{}", "=".repeat(60));
    info!("SAGIN Offloading Benchmark");
    info!("{}", "=".repeat(60));

    let config = match &args.config {
        Some(path) => SaginConfig::from_json_file(path)?,
        None => SaginConfig::default(),
    };

    match args.command {
        Command::Run {
            scenario,
            seed,
            budget,
        } => {
            let report = run_single(&config, &scenario, seed, &budget.settings())?;
            info!("QGA best cost: {:.4}", report.qga.best_cost);
            info!("PSO best cost: {:.4}", report.pso.best_cost);
            info!("Gain: {:.2}%", report.gain_percent);
            info!(
                "QGA decisions (local/relay/satellite): {:?}",
                report.qga.decision_counts
            );
            write_report(&args.output, "results/single_run.json", &report)?;
        }
        Command::Suite { seeds, budget } => {
            let settings = budget.settings().with_seeds((0..seeds).collect());
            let report = run_suite(&config, &settings)?;

            info!("\n{}", "=".repeat(60));
            info!("EXPERIMENT SUMMARY (averaged over {} seeds)", seeds);
            info!("{}", "=".repeat(60));
            for s in &report.summary {
                info!(
                    "  {:20} | QGA {:.4} | PSO {:.4} | gain {:+.2}%",
                    s.scenario, s.mean_qga_cost, s.mean_pso_cost, s.mean_gain_percent
                );
            }
            write_report(&args.output, "results/experimental_results.json", &report)?;
        }
        Command::Tradeoff {
            scenario,
            weights,
            seeds,
            budget,
        } => {
            let settings = budget.settings().with_seeds((0..seeds).collect());
            let tradeoff = TradeoffSettings {
                scenario,
                latency_weights: weights,
            };
            let report = run_tradeoff(&config, &tradeoff, &settings)?;
            for p in &report.points {
                info!(
                    "  w_L={:.2} | latency {:.4} s | energy {:.6} J",
                    p.weight_latency, p.mean_latency_s, p.mean_energy_j
                );
            }
            write_report(&args.output, "results/tradeoff_results.json", &report)?;
        }
        Command::Scalability {
            scenario,
            devices,
            seed,
            budget,
        } => {
            let scalability = ScalabilitySettings {
                scenario,
                device_counts: devices,
                seed,
            };
            let report = run_scalability(&config, &scalability, &budget.settings())?;
            for p in &report.points {
                info!(
                    "  {:5} devices | QGA {:.2}s | PSO {:.2}s | eval {:.3}ms vs loop {:.3}ms",
                    p.num_devices, p.qga_time_s, p.pso_time_s, p.vectorized_eval_ms, p.loop_eval_ms
                );
            }
            write_report(&args.output, "results/scalability_results.json", &report)?;
        }
    }

    Ok(())
}

fn write_report<T: serde::Serialize>(output: &Option<PathBuf>, default: &str, report: &T) -> Result<()> {
    let path = output.clone().unwrap_or_else(|| PathBuf::from(default));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_json(&path, report)?;
    Ok(())
}
