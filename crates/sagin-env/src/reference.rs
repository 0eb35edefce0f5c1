//! Per-member loop evaluator
//!
//! Scores decisions one member and one device at a time, recomputing every
//! link from point positions. Agrees with [`NetworkCostModel::compute_cost`]
//! and exists as the slow baseline for scalability comparisons.

use crate::channel::link_rate_bps;
use crate::cost::NetworkCostModel;
use crate::decision::Decision;
use crate::{EnvError, Result};
use ndarray::ArrayView2;

/// Cost of every member, computed without any array broadcasting
pub fn loop_cost(model: &NetworkCostModel, decisions: ArrayView2<'_, u8>) -> Result<Vec<f64>> {
    let n = model.num_devices();
    if decisions.ncols() != n {
        return Err(EnvError::ShapeMismatch {
            expected: n,
            actual: decisions.ncols(),
        });
    }

    let c = model.constants();
    let s = model.scenario();
    let topo = model.topology();
    let tasks = model.tasks();
    let satellite = topo.satellite_position();

    let mut costs = Vec::with_capacity(decisions.nrows());
    for (member, row) in decisions.rows().into_iter().enumerate() {
        let mut total = 0.0;
        for device in 0..n {
            let bits = tasks.data_bits[device];
            let cycles = tasks.cycles[device];
            let position = topo.device_position(device);

            let decision = Decision::from_code(row[device]).ok_or(EnvError::InvalidDecision {
                member,
                device,
                value: row[device],
            })?;

            let (latency, energy) = match decision {
                Decision::Local => (
                    cycles / c.device_cpu_hz,
                    c.kappa * c.device_cpu_hz.powi(2) * cycles,
                ),
                Decision::Relay => {
                    let nearest = (0..topo.num_relays())
                        .map(|r| nalgebra::distance(&position, &topo.relay_position(r)))
                        .fold(f64::INFINITY, f64::min);
                    let rate = link_rate_bps(nearest, c.relay_carrier_hz, c.relay_antenna_gain_dbi, c);
                    let tx = bits / rate;
                    (tx + cycles / c.relay_cpu_hz, c.device_tx_power_w * tx)
                }
                Decision::Satellite => {
                    let d = nalgebra::distance(&position, &satellite);
                    let rate = link_rate_bps(d, c.satellite_carrier_hz, c.satellite_antenna_gain_dbi, c);
                    let tx = bits / rate;
                    (
                        tx + cycles / c.satellite_cpu_hz + 2.0 * d / c.speed_of_light,
                        c.device_tx_power_w * tx,
                    )
                }
            };

            total += s.weight_latency * latency + s.weight_energy * energy;
        }
        costs.push(total / n as f64);
    }
    Ok(costs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SaginConfig, EMERGENCY_RESCUE};
    use ndarray::Array2;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_loop_matches_vectorized() {
        let config = SaginConfig::default();
        let model = NetworkCostModel::new(&config, EMERGENCY_RESCUE, 21).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let decisions = Array2::from_shape_simple_fn((8, model.num_devices()), || rng.gen_range(0..3u8));

        let fast = model.compute_cost(decisions.view()).unwrap();
        let slow = loop_cost(&model, decisions.view()).unwrap();

        for (a, b) in fast.iter().zip(&slow) {
            assert!((a - b).abs() / b < 1e-9, "vectorized {} vs loop {}", a, b);
        }
    }

    #[test]
    fn test_loop_rejects_invalid_codes() {
        let config = SaginConfig::default();
        let model = NetworkCostModel::new(&config, EMERGENCY_RESCUE, 0).unwrap();
        let decisions = Array2::from_elem((1, model.num_devices()), 7u8);
        assert!(loop_cost(&model, decisions.view()).is_err());
    }
}
