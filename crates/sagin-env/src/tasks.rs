//! Per-device compute tasks

use crate::config::{PhysicalConstants, Scenario, BITS_PER_MEGABYTE};
use ndarray::Array1;
use rand::Rng;

/// One task per ground device
#[derive(Debug, Clone, PartialEq)]
pub struct Tasks {
    /// Payload size (bits), `[num_devices]`
    pub data_bits: Array1<f64>,
    /// CPU cycles to process the payload, `[num_devices]`
    pub cycles: Array1<f64>,
}

impl Tasks {
    /// Sample payloads uniformly from the scenario's size range
    pub fn generate<R: Rng>(scenario: &Scenario, constants: &PhysicalConstants, rng: &mut R) -> Self {
        let (min_mb, max_mb) = scenario.task_size_mb;
        let data_bits = Array1::from_shape_simple_fn(scenario.num_devices, || {
            (min_mb + (max_mb - min_mb) * rng.gen::<f64>()) * BITS_PER_MEGABYTE
        });
        Self::from_data_bits(data_bits, constants)
    }

    /// Tasks with the given payloads; cycles follow from `cycles_per_bit`
    pub fn from_data_bits(data_bits: Array1<f64>, constants: &PhysicalConstants) -> Self {
        let cycles = &data_bits * constants.cycles_per_bit;
        Self { data_bits, cycles }
    }

    pub fn len(&self) -> usize {
        self.data_bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_bits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SaginConfig, INDUSTRIAL_REMOTE};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_task_sizes_within_range() {
        let config = SaginConfig::default();
        let scenario = config.scenario(INDUSTRIAL_REMOTE).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tasks = Tasks::generate(scenario, &config.constants, &mut rng);

        assert_eq!(tasks.len(), 30);
        let lo = 5.0 * BITS_PER_MEGABYTE;
        let hi = 15.0 * BITS_PER_MEGABYTE;
        assert!(tasks.data_bits.iter().all(|&b| b >= lo && b <= hi));
    }

    #[test]
    fn test_cycles_follow_cycles_per_bit() {
        let constants = PhysicalConstants::default();
        let tasks = Tasks::from_data_bits(Array1::from(vec![8.0, 16.0]), &constants);
        assert_eq!(tasks.cycles, Array1::from(vec![4_000.0, 8_000.0]));
    }
}
