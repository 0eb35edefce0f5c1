//! Space-Air-Ground Integrated Network Environment
//!
//! Network geometry, uplink channel model and the vectorized cost model used
//! to score task-offloading decisions for ground devices that can compute
//! locally, offload to an aerial relay, or offload to a satellite.
//!
//! # Pipeline
//!
//! ```text
//! SaginConfig ─► Topology (devices, relays, satellite)
//!             ─► Distances ─► ChannelRates (FSPL + Shannon)
//!             ─► Tasks (bits, cycles)
//!                     │
//!   decisions [P, N] ─┴─► NetworkCostModel::compute_cost ─► costs [P]
//! ```

use thiserror::Error;

pub mod channel;
pub mod config;
pub mod cost;
pub mod decision;
pub mod reference;
pub mod tasks;
pub mod topology;

pub use channel::ChannelRates;
pub use config::{NetworkScale, PhysicalConstants, SaginConfig, Scenario};
pub use cost::{CostBreakdown, NetworkCostModel, PathCosts};
pub use decision::{decode_bits, Decision, MAX_DECISION_CODE, NUM_DECISIONS};
pub use tasks::Tasks;
pub use topology::{Distances, Topology};

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Decision matrix covers {actual} devices, network has {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("Decision matrix has no members")]
    EmptyPopulation,
    #[error("Invalid decision {value} for member {member}, device {device}")]
    InvalidDecision {
        member: usize,
        device: usize,
        value: u8,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EnvError>;
