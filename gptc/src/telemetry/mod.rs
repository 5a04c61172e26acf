//! Aircraft telemetry as sampled from the simulation host.
//!
//! Values are stored in the units the host reports them in (degrees, metres,
//! metres per second). Conversion to prompt units happens in [`encoder`], and
//! the separation monitor reads altitudes through [`AircraftTelemetry::altitude_ft`].

pub mod encoder;
pub mod units;

pub use encoder::TelemetryEncoder;
pub use units::{LengthUnit, SpeedUnit, UnitConfig};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One aircraft's state at the sampling instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftTelemetry {
    pub id: String,
    /// Degrees
    pub lat: f64,
    /// Degrees
    pub lon: f64,
    /// Degrees, 0-360
    pub heading: f64,
    pub altitude_m: f64,
    pub ground_speed_mps: f64,
    pub vertical_speed_mps: f64,
}

impl AircraftTelemetry {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            heading: 0.0,
            altitude_m: 0.0,
            ground_speed_mps: 0.0,
            vertical_speed_mps: 0.0,
        }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }

    pub fn with_altitude_m(mut self, altitude_m: f64) -> Self {
        self.altitude_m = altitude_m;
        self
    }

    pub fn with_altitude_ft(mut self, altitude_ft: f64) -> Self {
        self.altitude_m = units::ft_to_m(altitude_ft);
        self
    }

    pub fn with_ground_speed_mps(mut self, gs: f64) -> Self {
        self.ground_speed_mps = gs;
        self
    }

    pub fn with_vertical_speed_mps(mut self, vs: f64) -> Self {
        self.vertical_speed_mps = vs;
        self
    }

    pub fn altitude_ft(&self) -> f64 {
        units::m_to_ft(self.altitude_m)
    }
}

/// All aircraft sampled at one instant, keyed by identifier.
///
/// Keys are kept sorted so every consumer sees the same iteration order for
/// the same set of aircraft, whatever order the host inserted them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    aircraft: BTreeMap<String, AircraftTelemetry>,
}

impl TelemetrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an aircraft. Returns the previous entry for that id.
    pub fn insert(&mut self, telemetry: AircraftTelemetry) -> Option<AircraftTelemetry> {
        self.aircraft.insert(telemetry.id.clone(), telemetry)
    }

    pub fn get(&self, id: &str) -> Option<&AircraftTelemetry> {
        self.aircraft.get(id)
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AircraftTelemetry> {
        self.aircraft.values()
    }

    /// Every unordered pair of aircraft, each exactly once.
    pub fn pairs(&self) -> impl Iterator<Item = (&AircraftTelemetry, &AircraftTelemetry)> {
        let all: Vec<&AircraftTelemetry> = self.aircraft.values().collect();
        let mut pairs = Vec::with_capacity(all.len() * all.len().saturating_sub(1) / 2);
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                pairs.push((*a, *b));
            }
        }
        pairs.into_iter()
    }
}

impl FromIterator<AircraftTelemetry> for TelemetrySnapshot {
    fn from_iter<I: IntoIterator<Item = AircraftTelemetry>>(iter: I) -> Self {
        let mut snapshot = TelemetrySnapshot::new();
        for telemetry in iter {
            snapshot.insert(telemetry);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_replaces_duplicate_ids() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.insert(AircraftTelemetry::new("DL123", 40.0, -83.0));
        let previous = snapshot.insert(AircraftTelemetry::new("DL123", 41.0, -83.0));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(previous.map(|p| p.lat), Some(40.0));
        assert_eq!(snapshot.get("DL123").map(|a| a.lat), Some(41.0));
    }

    #[test]
    fn test_pairs_are_unordered_and_unique() {
        let snapshot: TelemetrySnapshot = ["C", "A", "B"]
            .iter()
            .map(|id| AircraftTelemetry::new(*id, 0.0, 0.0))
            .collect();
        let pairs: Vec<(String, String)> = snapshot
            .pairs()
            .map(|(a, b)| (a.id.clone(), b.id.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("A".to_string(), "B".to_string()),
                ("A".to_string(), "C".to_string()),
                ("B".to_string(), "C".to_string()),
            ]
        );
    }

    #[test]
    fn test_altitude_feet_builder() {
        let ac = AircraftTelemetry::new("N1", 0.0, 0.0).with_altitude_ft(10_000.0);
        assert!((ac.altitude_ft() - 10_000.0).abs() < 1e-6);
    }
}
