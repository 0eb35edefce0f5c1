//! Node placement and all-pairs distances
//!
//! Positions are stored row-per-node in `[n, 3]` arrays so that distance
//! matrices come out of a single broadcast expression.

use crate::config::NetworkScale;
use nalgebra::Point3;
use ndarray::{array, s, Array1, Array2, ArrayView2, Axis};
use rand::Rng;

/// Static placement of ground devices, aerial relays and the satellite
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    /// `[num_devices, 3]`, z = 0
    devices: Array2<f64>,
    /// `[num_relays, 3]`, z = relay altitude
    relays: Array2<f64>,
    /// `[1, 3]`, above the area centre
    satellite: Array2<f64>,
}

/// Pairwise Euclidean distances (m)
#[derive(Debug, Clone)]
pub struct Distances {
    /// `[num_devices, num_relays]`
    pub device_relay: Array2<f64>,
    /// `[num_devices, 1]`
    pub device_satellite: Array2<f64>,
    /// `[num_relays, 1]`
    pub relay_satellite: Array2<f64>,
}

impl Topology {
    /// Sample a topology: devices uniform over the square area on the ground,
    /// relays uniform over the same square at fixed altitude, one satellite
    /// above the centre.
    pub fn sample<R: Rng>(scale: &NetworkScale, num_devices: usize, rng: &mut R) -> Self {
        let area = scale.area_size_m;

        let mut devices = Array2::zeros((num_devices, 3));
        devices
            .slice_mut(s![.., ..2])
            .mapv_inplace(|_| rng.gen::<f64>() * area);

        let mut relays = Array2::zeros((scale.num_relays, 3));
        relays
            .slice_mut(s![.., ..2])
            .mapv_inplace(|_| rng.gen::<f64>() * area);
        relays.column_mut(2).fill(scale.relay_altitude_m);

        let satellite = array![[area / 2.0, area / 2.0, scale.satellite_altitude_m]];

        Self {
            devices,
            relays,
            satellite,
        }
    }

    /// Build from explicit coordinates.
    ///
    /// Each argument must have three columns; `satellite` is a single point.
    pub fn from_positions(
        devices: Array2<f64>,
        relays: Array2<f64>,
        satellite: Point3<f64>,
    ) -> Option<Self> {
        if devices.ncols() != 3 || relays.ncols() != 3 {
            return None;
        }
        Some(Self {
            devices,
            relays,
            satellite: array![[satellite.x, satellite.y, satellite.z]],
        })
    }

    pub fn num_devices(&self) -> usize {
        self.devices.nrows()
    }

    pub fn num_relays(&self) -> usize {
        self.relays.nrows()
    }

    pub fn devices(&self) -> ArrayView2<'_, f64> {
        self.devices.view()
    }

    pub fn relays(&self) -> ArrayView2<'_, f64> {
        self.relays.view()
    }

    pub fn device_position(&self, idx: usize) -> Point3<f64> {
        row_point(self.devices.view(), idx)
    }

    pub fn relay_position(&self, idx: usize) -> Point3<f64> {
        row_point(self.relays.view(), idx)
    }

    pub fn satellite_position(&self) -> Point3<f64> {
        row_point(self.satellite.view(), 0)
    }

    /// Fresh distance matrices for every link class
    pub fn distances(&self) -> Distances {
        Distances {
            device_relay: pairwise_distances(self.devices.view(), self.relays.view()),
            device_satellite: pairwise_distances(self.devices.view(), self.satellite.view()),
            relay_satellite: pairwise_distances(self.relays.view(), self.satellite.view()),
        }
    }
}

impl Distances {
    /// Distance from every device to its nearest relay, `[num_devices]`
    pub fn nearest_relay(&self) -> Array1<f64> {
        self.device_relay
            .fold_axis(Axis(1), f64::INFINITY, |acc, &d| acc.min(d))
    }
}

fn row_point(rows: ArrayView2<'_, f64>, idx: usize) -> Point3<f64> {
    let r = rows.row(idx);
    Point3::new(r[0], r[1], r[2])
}

/// All-pairs Euclidean distance between the rows of `a` `[n, 3]` and `b` `[m, 3]`.
///
/// Broadcasts `[n, 1, 3] - [1, m, 3]` and reduces the coordinate axis.
pub fn pairwise_distances(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Array2<f64> {
    let diff = &a.insert_axis(Axis(1)) - &b.insert_axis(Axis(0));
    diff.mapv(|d| d * d).sum_axis(Axis(2)).mapv(f64::sqrt)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        // Fuzz: every distance is finite and non-negative
        #[test]
        fn fuzz_distances_finite_non_negative(
            seed in any::<u64>(),
            num_devices in 1usize..64,
            num_relays in 1usize..8,
        ) {
            let scale = NetworkScale { num_relays, ..NetworkScale::default() };
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let d = Topology::sample(&scale, num_devices, &mut rng).distances();

            for m in [&d.device_relay, &d.device_satellite, &d.relay_satellite] {
                prop_assert!(m.iter().all(|x| x.is_finite() && *x >= 0.0));
            }
        }
    }
}
