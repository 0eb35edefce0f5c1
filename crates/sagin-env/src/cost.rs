//! Vectorized network cost model
//!
//! Turns a population of offloading decisions `[P, N]` into one scalar cost
//! per member:
//!
//! ```text
//! cost(p) = mean_n( w_L · T[p, n] + w_E · E[p, n] )
//! ```
//!
//! | Path      | Latency T                                   | Energy E             |
//! |-----------|---------------------------------------------|----------------------|
//! | local     | C / f_ue                                    | κ · f_ue² · C        |
//! | relay     | D / R_relay + C / f_relay                   | P_tx · D / R_relay   |
//! | satellite | D / R_sat + C / f_sat + 2 · d_sat / c       | P_tx · D / R_sat     |
//!
//! Relay offloading always targets the best (nearest) relay of each device.

use crate::channel::{channel_rates, ChannelRates};
use crate::config::{PhysicalConstants, SaginConfig, Scenario};
use crate::decision::{MAX_DECISION_CODE, NUM_DECISIONS};
use crate::tasks::Tasks;
use crate::topology::{Distances, Topology};
use crate::{EnvError, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Per-device link figures that the cost evaluation needs
#[derive(Debug, Clone)]
struct LinkProfile {
    best_relay_rate: Array1<f64>,
    satellite_rate: Array1<f64>,
    satellite_distance: Array1<f64>,
}

impl LinkProfile {
    fn from_topology(topology: &Topology, constants: &PhysicalConstants) -> Self {
        let distances = topology.distances();
        let rates = channel_rates(&distances, constants);
        Self {
            best_relay_rate: rates.best_relay(),
            satellite_rate: rates.device_satellite,
            satellite_distance: distances.device_satellite.column(0).to_owned(),
        }
    }
}

/// Latency and energy of every device on every path.
///
/// Row `k` holds the figures for decision code `k`.
#[derive(Debug, Clone)]
pub struct PathCosts {
    /// `[3, num_devices]` seconds
    pub latency: Array2<f64>,
    /// `[3, num_devices]` joules
    pub energy: Array2<f64>,
}

/// Population cost split into its two objectives
#[derive(Debug, Clone)]
pub struct CostBreakdown {
    /// Mean device latency per member (s)
    pub latency: Array1<f64>,
    /// Mean device energy per member (J)
    pub energy: Array1<f64>,
    /// Weighted cost per member
    pub cost: Array1<f64>,
}

/// Owns one network instance (topology + tasks) and scores decision batches
/// against it.
#[derive(Debug, Clone)]
pub struct NetworkCostModel {
    constants: PhysicalConstants,
    scenario: Scenario,
    topology: Topology,
    tasks: Tasks,
    links: LinkProfile,
    rng: ChaCha8Rng,
}

impl NetworkCostModel {
    /// Build the network for a named scenario.
    ///
    /// The seed drives topology sampling followed by task generation.
    pub fn new(config: &SaginConfig, scenario_name: &str, seed: u64) -> Result<Self> {
        let scenario = config.scenario(scenario_name)?.clone();
        Self::for_scenario(config, scenario, seed)
    }

    /// Build the network for an explicit scenario value
    pub fn for_scenario(config: &SaginConfig, scenario: Scenario, seed: u64) -> Result<Self> {
        config.validate()?;
        scenario.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let topology = Topology::sample(&config.scale, scenario.num_devices, &mut rng);
        let tasks = Tasks::generate(&scenario, &config.constants, &mut rng);
        let links = LinkProfile::from_topology(&topology, &config.constants);

        info!(
            "Initialized {} network: {} devices, {} relays, seed {}",
            scenario.name,
            scenario.num_devices,
            topology.num_relays(),
            seed
        );

        Ok(Self {
            constants: config.constants.clone(),
            scenario,
            topology,
            tasks,
            links,
            rng,
        })
    }

    /// Assemble a model from an existing topology and task set
    pub fn from_parts(
        config: &SaginConfig,
        scenario: Scenario,
        topology: Topology,
        tasks: Tasks,
    ) -> Result<Self> {
        config.validate()?;
        scenario.validate()?;
        for actual in [topology.num_devices(), tasks.len()] {
            if actual != scenario.num_devices {
                return Err(EnvError::ShapeMismatch {
                    expected: scenario.num_devices,
                    actual,
                });
            }
        }
        if topology.num_relays() == 0 {
            return Err(EnvError::InvalidConfig("topology has no relays".into()));
        }

        let links = LinkProfile::from_topology(&topology, &config.constants);
        Ok(Self {
            constants: config.constants.clone(),
            scenario,
            topology,
            tasks,
            links,
            rng: ChaCha8Rng::seed_from_u64(0),
        })
    }

    /// Same network with different objective weights
    pub fn reweighted(&self, weight_latency: f64, weight_energy: f64) -> Result<Self> {
        let scenario = self.scenario.with_weights(weight_latency, weight_energy);
        scenario.validate()?;
        Ok(Self {
            scenario,
            ..self.clone()
        })
    }

    /// Resample every device's task from the scenario's size range
    pub fn generate_tasks(&mut self) -> &Tasks {
        self.tasks = Tasks::generate(&self.scenario, &self.constants, &mut self.rng);
        debug!("Regenerated {} tasks", self.tasks.len());
        &self.tasks
    }

    pub fn num_devices(&self) -> usize {
        self.scenario.num_devices
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn tasks(&self) -> &Tasks {
        &self.tasks
    }

    pub fn distances(&self) -> Distances {
        self.topology.distances()
    }

    pub fn channel_rates(&self) -> ChannelRates {
        channel_rates(&self.topology.distances(), &self.constants)
    }

    /// Latency and energy of each device on each of the three paths
    pub fn path_costs(&self) -> PathCosts {
        let c = &self.constants;
        let bits = &self.tasks.data_bits;
        let cycles = &self.tasks.cycles;

        let t_local = cycles / c.device_cpu_hz;
        let e_local = cycles * (c.kappa * c.device_cpu_hz.powi(2));

        let relay_tx = bits / &self.links.best_relay_rate;
        let t_relay = &relay_tx + &(cycles / c.relay_cpu_hz);
        let e_relay = &relay_tx * c.device_tx_power_w;

        let sat_tx = bits / &self.links.satellite_rate;
        let propagation = &self.links.satellite_distance * (2.0 / c.speed_of_light);
        let t_sat = &sat_tx + &(cycles / c.satellite_cpu_hz) + &propagation;
        let e_sat = &sat_tx * c.device_tx_power_w;

        let mut latency = Array2::zeros((NUM_DECISIONS, self.num_devices()));
        let mut energy = Array2::zeros((NUM_DECISIONS, self.num_devices()));
        for (code, (t, e)) in [(t_local, e_local), (t_relay, e_relay), (t_sat, e_sat)]
            .into_iter()
            .enumerate()
        {
            latency.row_mut(code).assign(&t);
            energy.row_mut(code).assign(&e);
        }

        PathCosts { latency, energy }
    }

    /// Weighted system cost of every member, `[P]`
    pub fn compute_cost(&self, decisions: ArrayView2<'_, u8>) -> Result<Array1<f64>> {
        Ok(self.cost_breakdown(decisions)?.cost)
    }

    /// Mean latency, mean energy and weighted cost of every member
    pub fn cost_breakdown(&self, decisions: ArrayView2<'_, u8>) -> Result<CostBreakdown> {
        self.validate_decisions(decisions)?;

        let paths = self.path_costs();
        let mut latency = Array2::<f64>::zeros(decisions.raw_dim());
        let mut energy = Array2::<f64>::zeros(decisions.raw_dim());

        for code in 0..NUM_DECISIONS {
            let mask = decisions.mapv(|d| if usize::from(d) == code { 1.0 } else { 0.0 });
            latency += &(&mask * &paths.latency.row(code));
            energy += &(&mask * &paths.energy.row(code));
        }

        let weighted = &latency * self.scenario.weight_latency + &energy * self.scenario.weight_energy;

        let mean = |m: &Array2<f64>| {
            m.mean_axis(Axis(1)).ok_or(EnvError::ShapeMismatch {
                expected: self.num_devices(),
                actual: 0,
            })
        };

        Ok(CostBreakdown {
            latency: mean(&latency)?,
            energy: mean(&energy)?,
            cost: mean(&weighted)?,
        })
    }

    fn validate_decisions(&self, decisions: ArrayView2<'_, u8>) -> Result<()> {
        if decisions.nrows() == 0 {
            return Err(EnvError::EmptyPopulation);
        }
        if decisions.ncols() != self.num_devices() {
            return Err(EnvError::ShapeMismatch {
                expected: self.num_devices(),
                actual: decisions.ncols(),
            });
        }
        if let Some(((member, device), &value)) = decisions
            .indexed_iter()
            .find(|(_, &d)| d > MAX_DECISION_CODE)
        {
            return Err(EnvError::InvalidDecision {
                member,
                device,
                value,
            });
        }
        Ok(())
    }
}
