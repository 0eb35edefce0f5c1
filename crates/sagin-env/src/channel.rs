//! RF Link Budget
//!
//! Free-space path loss, received power and Shannon capacity for the
//! device -> relay and device -> satellite uplinks.
//!
//! Received power (dBm) = P_tx + G_tx + G_rx - FSPL, converted to watts and
//! compared against thermal noise k·T·B.

use crate::config::PhysicalConstants;
use crate::topology::Distances;
use ndarray::{Array1, Array2, Axis};
use std::f64::consts::PI;

/// Achievable uplink rates (bit/s)
#[derive(Debug, Clone)]
pub struct ChannelRates {
    /// `[num_devices, num_relays]`
    pub device_relay: Array2<f64>,
    /// `[num_devices]`
    pub device_satellite: Array1<f64>,
}

impl ChannelRates {
    /// Rate towards the best relay of every device, `[num_devices]`.
    ///
    /// Path loss is monotone in distance and all relays share carrier and
    /// gain, so this is also the rate towards the nearest relay.
    pub fn best_relay(&self) -> Array1<f64> {
        self.device_relay
            .fold_axis(Axis(1), f64::NEG_INFINITY, |acc, &r| acc.max(r))
    }
}

/// Free space path loss in dB
///
/// `20·log10(d) + 20·log10(f) + 20·log10(4π/c)`, with `d` floored at
/// `min_distance_m` so collocated nodes never reach `log10(0)`.
pub fn free_space_path_loss_db(distance_m: f64, carrier_hz: f64, c: &PhysicalConstants) -> f64 {
    let d = distance_m.max(c.min_distance_m);
    20.0 * d.log10() + 20.0 * carrier_hz.log10() + 20.0 * (4.0 * PI / c.speed_of_light).log10()
}

pub fn dbm_to_watts(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0) / 1000.0
}

pub fn watts_to_dbm(watts: f64) -> f64 {
    10.0 * (watts * 1000.0).log10()
}

/// Shannon capacity `B·log2(1 + S/N)`, floored at `min_rate_bps`
pub fn shannon_rate_bps(received_w: f64, c: &PhysicalConstants) -> f64 {
    let snr = received_w / c.noise_power_w();
    (c.bandwidth_hz * (1.0 + snr).log2()).max(c.min_rate_bps)
}

/// Uplink rate for one link given its distance
pub fn link_rate_bps(distance_m: f64, carrier_hz: f64, rx_gain_dbi: f64, c: &PhysicalConstants) -> f64 {
    let tx_dbm = watts_to_dbm(c.device_tx_power_w);
    let rx_dbm = tx_dbm + c.device_antenna_gain_dbi + rx_gain_dbi
        - free_space_path_loss_db(distance_m, carrier_hz, c);
    shannon_rate_bps(dbm_to_watts(rx_dbm), c)
}

/// Rates for every uplink in the topology
pub fn channel_rates(distances: &Distances, c: &PhysicalConstants) -> ChannelRates {
    let device_relay = distances
        .device_relay
        .mapv(|d| link_rate_bps(d, c.relay_carrier_hz, c.relay_antenna_gain_dbi, c));
    let device_satellite = distances
        .device_satellite
        .column(0)
        .mapv(|d| link_rate_bps(d, c.satellite_carrier_hz, c.satellite_antenna_gain_dbi, c));

    ChannelRates {
        device_relay,
        device_satellite,
    }
}
