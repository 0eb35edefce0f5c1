//! Network configuration
//!
//! Physical constants, network scale and named offloading scenarios.
//! A [`SaginConfig`] is an immutable value: reconfiguration between runs
//! (new weights, new device count) produces a new value instead of editing
//! a shared registry.

use crate::{EnvError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Bits in one megabyte of task payload (1 MB = 1024 * 1024 bytes).
pub const BITS_PER_MEGABYTE: f64 = 1024.0 * 1024.0 * 8.0;

/// Scenario names shipped with the default configuration
pub const URBAN_IOT: &str = "urban_iot";
pub const INDUSTRIAL_REMOTE: &str = "industrial_remote";
pub const EMERGENCY_RESCUE: &str = "emergency_rescue";

/// Radio, compute and energy constants shared by every link and node class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    /// Channel bandwidth (Hz)
    pub bandwidth_hz: f64,
    /// Boltzmann constant (J/K)
    pub boltzmann: f64,
    /// Receiver noise temperature (K)
    pub noise_temperature_k: f64,
    /// Speed of light (m/s)
    pub speed_of_light: f64,
    /// Carrier frequency on device -> relay links (Hz)
    pub relay_carrier_hz: f64,
    /// Carrier frequency on device -> satellite links (Hz)
    pub satellite_carrier_hz: f64,
    /// Device transmit power (W)
    pub device_tx_power_w: f64,
    pub device_antenna_gain_dbi: f64,
    pub relay_antenna_gain_dbi: f64,
    pub satellite_antenna_gain_dbi: f64,
    /// Local device CPU frequency (cycles/s)
    pub device_cpu_hz: f64,
    pub relay_cpu_hz: f64,
    pub satellite_cpu_hz: f64,
    /// Effective switched capacitance of the device CPU
    pub kappa: f64,
    /// CPU cycles needed per bit of task data
    pub cycles_per_bit: f64,
    /// Distances are floored here before entering the log domain (m)
    pub min_distance_m: f64,
    /// Channel rates are floored here before dividing by them (bit/s)
    pub min_rate_bps: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            bandwidth_hz: 20.0e6,
            boltzmann: 1.380649e-23,
            noise_temperature_k: 290.0,
            speed_of_light: 3.0e8,
            relay_carrier_hz: 2.4e9,
            satellite_carrier_hz: 2.0e9,
            device_tx_power_w: 0.2,
            device_antenna_gain_dbi: 0.0,
            relay_antenna_gain_dbi: 5.0,
            satellite_antenna_gain_dbi: 40.0,
            device_cpu_hz: 1.0e9,
            relay_cpu_hz: 5.0e9,
            satellite_cpu_hz: 10.0e9,
            kappa: 1.0e-28,
            cycles_per_bit: 500.0,
            min_distance_m: 1.0,
            min_rate_bps: 1.0,
        }
    }
}

impl PhysicalConstants {
    /// Thermal noise power k·T·B (W)
    pub fn noise_power_w(&self) -> f64 {
        self.boltzmann * self.noise_temperature_k * self.bandwidth_hz
    }
}

/// Counts, altitudes and extent of the non-ground layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkScale {
    pub num_relays: usize,
    /// Side of the square service area (m)
    pub area_size_m: f64,
    pub relay_altitude_m: f64,
    pub satellite_altitude_m: f64,
}

impl Default for NetworkScale {
    fn default() -> Self {
        Self {
            num_relays: 3,
            area_size_m: 10_000.0,
            relay_altitude_m: 200.0,
            satellite_altitude_m: 600_000.0,
        }
    }
}

/// A named workload: how many devices, how large their tasks are, and how
/// latency is traded against energy.
///
/// Weights are not required to sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub num_devices: usize,
    /// Task payload range in megabytes (min, max)
    pub task_size_mb: (f64, f64),
    pub weight_latency: f64,
    pub weight_energy: f64,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        num_devices: usize,
        task_size_mb: (f64, f64),
        weight_latency: f64,
        weight_energy: f64,
    ) -> Self {
        Self {
            name: name.into(),
            num_devices,
            task_size_mb,
            weight_latency,
            weight_energy,
        }
    }

    /// Same scenario with different objective weights
    pub fn with_weights(&self, weight_latency: f64, weight_energy: f64) -> Self {
        Self {
            weight_latency,
            weight_energy,
            ..self.clone()
        }
    }

    /// Same scenario at a different network size
    pub fn with_num_devices(&self, num_devices: usize) -> Self {
        Self {
            num_devices,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_devices == 0 {
            return Err(EnvError::InvalidConfig(format!(
                "scenario {} has no devices",
                self.name
            )));
        }
        let (min_mb, max_mb) = self.task_size_mb;
        if !(min_mb.is_finite() && max_mb.is_finite()) || min_mb <= 0.0 || max_mb < min_mb {
            return Err(EnvError::InvalidConfig(format!(
                "scenario {} has invalid task size range ({}, {}) MB",
                self.name, min_mb, max_mb
            )));
        }
        for (label, w) in [("latency", self.weight_latency), ("energy", self.weight_energy)] {
            if !w.is_finite() || w < 0.0 {
                return Err(EnvError::InvalidConfig(format!(
                    "scenario {} has invalid {} weight {}",
                    self.name, label, w
                )));
            }
        }
        Ok(())
    }
}

/// Built-in scenarios
pub fn default_scenarios() -> BTreeMap<String, Scenario> {
    [
        Scenario::new(URBAN_IOT, 200, (0.5, 2.0), 0.4, 0.6),
        Scenario::new(INDUSTRIAL_REMOTE, 30, (5.0, 15.0), 0.5, 0.5),
        Scenario::new(EMERGENCY_RESCUE, 50, (1.0, 5.0), 0.9, 0.1),
    ]
    .into_iter()
    .map(|s| (s.name.clone(), s))
    .collect()
}

/// Complete configuration handed to every component constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaginConfig {
    #[serde(default)]
    pub constants: PhysicalConstants,
    #[serde(default)]
    pub scale: NetworkScale,
    #[serde(default = "default_scenarios")]
    pub scenarios: BTreeMap<String, Scenario>,
}

impl Default for SaginConfig {
    fn default() -> Self {
        Self {
            constants: PhysicalConstants::default(),
            scale: NetworkScale::default(),
            scenarios: default_scenarios(),
        }
    }
}

impl SaginConfig {
    /// Load a configuration override from a JSON file.
    ///
    /// Missing sections fall back to the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {:?}", path);
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn scenario(&self, name: &str) -> Result<&Scenario> {
        self.scenarios
            .get(name)
            .ok_or_else(|| EnvError::UnknownScenario(name.to_string()))
    }

    pub fn scenario_names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    /// New configuration with `scenario` inserted, replacing any scenario of the same name
    pub fn with_scenario(&self, scenario: Scenario) -> Self {
        let mut scenarios = self.scenarios.clone();
        scenarios.insert(scenario.name.clone(), scenario);
        Self {
            scenarios,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.constants;
        let positive = [
            ("bandwidth_hz", c.bandwidth_hz),
            ("boltzmann", c.boltzmann),
            ("noise_temperature_k", c.noise_temperature_k),
            ("speed_of_light", c.speed_of_light),
            ("relay_carrier_hz", c.relay_carrier_hz),
            ("satellite_carrier_hz", c.satellite_carrier_hz),
            ("device_tx_power_w", c.device_tx_power_w),
            ("device_cpu_hz", c.device_cpu_hz),
            ("relay_cpu_hz", c.relay_cpu_hz),
            ("satellite_cpu_hz", c.satellite_cpu_hz),
            ("kappa", c.kappa),
            ("cycles_per_bit", c.cycles_per_bit),
            ("min_distance_m", c.min_distance_m),
            ("min_rate_bps", c.min_rate_bps),
            ("area_size_m", self.scale.area_size_m),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(EnvError::InvalidConfig(format!(
                    "{} must be positive and finite, got {}",
                    field, value
                )));
            }
        }
        if self.scale.num_relays == 0 {
            return Err(EnvError::InvalidConfig("num_relays must be > 0".into()));
        }
        if self.scale.relay_altitude_m < 0.0 || self.scale.satellite_altitude_m < 0.0 {
            return Err(EnvError::InvalidConfig("altitudes must be >= 0".into()));
        }
        self.scenarios.values().try_for_each(Scenario::validate)
    }
}
