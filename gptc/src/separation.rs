//! Pairwise separation monitor.
//!
//! Horizontal distance combines the latitude and longitude deltas after
//! converting each to feet with the flat-Earth constants; vertical distance is
//! the absolute altitude difference in feet. A pair is in violation only when
//! it is inside BOTH minima. Every scan compares all n(n-1)/2 pairs, which is
//! fine for the tens of aircraft a scenario holds but grows quadratically.

use serde::{Deserialize, Serialize};

use crate::telemetry::units::{lat_to_ft, lon_to_ft};
use crate::telemetry::{AircraftTelemetry, TelemetrySnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeparationMinima {
    #[serde(default = "default_min_horizontal_ft")]
    pub min_horizontal_ft: f64,
    #[serde(default = "default_min_vertical_ft")]
    pub min_vertical_ft: f64,
}

fn default_min_horizontal_ft() -> f64 {
    5000.0
}

fn default_min_vertical_ft() -> f64 {
    1000.0
}

impl Default for SeparationMinima {
    fn default() -> Self {
        Self {
            min_horizontal_ft: default_min_horizontal_ft(),
            min_vertical_ft: default_min_vertical_ft(),
        }
    }
}

/// One pair found inside both minima during a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparationViolation {
    pub first: String,
    pub second: String,
    pub horizontal_ft: f64,
    pub vertical_ft: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SeparationMonitor {
    minima: SeparationMinima,
}

impl SeparationMonitor {
    pub fn new(minima: SeparationMinima) -> Self {
        Self { minima }
    }

    /// Report every pair currently in violation. No state is kept between
    /// scans, so a persisting conflict is reported again on every call.
    pub fn scan(&self, snapshot: &TelemetrySnapshot) -> Vec<SeparationViolation> {
        snapshot
            .pairs()
            .filter_map(|(a, b)| {
                let horizontal_ft = horizontal_distance_ft(a, b);
                let vertical_ft = vertical_distance_ft(a, b);
                let violated = horizontal_ft < self.minima.min_horizontal_ft
                    && vertical_ft < self.minima.min_vertical_ft;
                violated.then(|| SeparationViolation {
                    first: a.id.clone(),
                    second: b.id.clone(),
                    horizontal_ft,
                    vertical_ft,
                })
            })
            .collect()
    }
}

pub fn horizontal_distance_ft(a: &AircraftTelemetry, b: &AircraftTelemetry) -> f64 {
    let north = lat_to_ft(a.lat - b.lat);
    let east = lon_to_ft(a.lon - b.lon);
    (north * north + east * east).sqrt()
}

pub fn vertical_distance_ft(a: &AircraftTelemetry, b: &AircraftTelemetry) -> f64 {
    (a.altitude_ft() - b.altitude_ft()).abs()
}
