//! Natural-language rendering of a telemetry snapshot.
//!
//! The output is part of the prompt contract: decimal precision is fixed
//! (lat/lon 4, heading 1, altitude 0, speeds 3) and every line ends with a
//! newline. Encoding is a pure function of the snapshot and the unit settings.

use std::fmt::Write;

use super::units::{lat_to_ft, lon_to_ft, UnitConfig};
use super::{AircraftTelemetry, TelemetrySnapshot};

#[derive(Debug, Clone, Default)]
pub struct TelemetryEncoder {
    units: UnitConfig,
}

impl TelemetryEncoder {
    pub fn new(units: UnitConfig) -> Self {
        Self { units }
    }

    /// Render one line per aircraft, plus the two separation annotation lines
    /// when the snapshot holds exactly two aircraft.
    pub fn encode(&self, snapshot: &TelemetrySnapshot) -> String {
        let mut out = String::new();
        for aircraft in snapshot.iter() {
            self.encode_aircraft(&mut out, aircraft);
        }

        if snapshot.len() == 2 {
            let mut iter = snapshot.iter();
            if let (Some(a), Some(b)) = (iter.next(), iter.next()) {
                let (lon_ft, lat_ft) = axis_separation_ft(a, b);
                let _ = writeln!(
                    out,
                    "The aircraft are approximately {:.3} ft apart in longitude.",
                    lon_ft
                );
                let _ = writeln!(
                    out,
                    "The aircraft are approximately {:.3} ft apart in latitude.",
                    lat_ft
                );
            }
        }
        out
    }

    fn encode_aircraft(&self, out: &mut String, ac: &AircraftTelemetry) {
        let alt = self.units.altitude.from_meters(ac.altitude_m);
        let gs = self.units.ground_speed.from_mps(ac.ground_speed_mps);
        let vs = self.units.vertical_speed.from_mps(ac.vertical_speed_mps);
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "Aircraft {id} is at lat {lat:.4}, lon {lon:.4} with heading {hdg:.1} at altitude {alt:.0} {alt_unit}. \
{id} has a groundspeed of {gs:.3} {gs_unit} and vertical speed of {vs:.3} {vs_unit}",
            id = ac.id,
            lat = ac.lat,
            lon = ac.lon,
            hdg = ac.heading,
            alt = alt,
            alt_unit = self.units.altitude.label(),
            gs = gs,
            gs_unit = self.units.ground_speed.label(),
            vs = vs,
            vs_unit = self.units.vertical_speed.label(),
        );
    }
}

/// Absolute (longitudinal, latitudinal) separation in feet.
pub fn axis_separation_ft(a: &AircraftTelemetry, b: &AircraftTelemetry) -> (f64, f64) {
    (
        lon_to_ft(a.lon - b.lon).abs(),
        lat_to_ft(a.lat - b.lat).abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::units::{LengthUnit, SpeedUnit};
    use pretty_assertions::assert_eq;

    fn pair() -> TelemetrySnapshot {
        [
            AircraftTelemetry::new("DL123", 42.2200, -83.3500)
                .with_heading(115.8)
                .with_altitude_ft(25_000.0)
                .with_ground_speed_mps(159.5)
                .with_vertical_speed_mps(0.0),
            AircraftTelemetry::new("DL456", 42.2100, -83.2500)
                .with_heading(271.5)
                .with_altitude_ft(25_000.0)
                .with_ground_speed_mps(160.25)
                .with_vertical_speed_mps(-2.5),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_encode_two_aircraft_appends_separation_lines() {
        let text = TelemetryEncoder::default().encode(&pair());
        let expected = "\
Aircraft DL123 is at lat 42.2200, lon -83.3500 with heading 115.8 at altitude 25000 ft. DL123 has a groundspeed of 159.500 m/s and vertical speed of 0.000 m/s
Aircraft DL456 is at lat 42.2100, lon -83.2500 with heading 271.5 at altitude 25000 ft. DL456 has a groundspeed of 160.250 m/s and vertical speed of -2.500 m/s
The aircraft are approximately 26856.000 ft apart in longitude.
The aircraft are approximately 3644.880 ft apart in latitude.
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_axis_separation_is_order_independent() {
        let snapshot = pair();
        let a = snapshot.get("DL123").unwrap();
        let b = snapshot.get("DL456").unwrap();
        let (lon_ab, lat_ab) = axis_separation_ft(a, b);
        let (lon_ba, lat_ba) = axis_separation_ft(b, a);
        assert_eq!(lon_ab, lon_ba);
        assert_eq!(lat_ab, lat_ba);
        assert!((lon_ab - (a.lon - b.lon).abs() * 268_560.0).abs() < 1e-6);
        assert!((lat_ab - (a.lat - b.lat).abs() * 364_488.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_separation_lines_for_other_counts() {
        let mut snapshot = pair();
        snapshot.insert(AircraftTelemetry::new("UA789", 42.0, -83.0));
        let text = TelemetryEncoder::default().encode(&snapshot);
        assert_eq!(text.lines().count(), 3);
        assert!(!text.contains("apart in"));

        let single: TelemetrySnapshot = [AircraftTelemetry::new("UA789", 42.0, -83.0)]
            .into_iter()
            .collect();
        assert_eq!(TelemetryEncoder::default().encode(&single).lines().count(), 1);
        assert_eq!(TelemetryEncoder::default().encode(&TelemetrySnapshot::new()), "");
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let encoder = TelemetryEncoder::default();
        let snapshot = pair();
        assert_eq!(encoder.encode(&snapshot), encoder.encode(&snapshot));
    }

    #[test]
    fn test_configured_units_are_rendered() {
        let encoder = TelemetryEncoder::new(UnitConfig {
            altitude: LengthUnit::Meters,
            ground_speed: SpeedUnit::Knots,
            vertical_speed: SpeedUnit::FeetPerMinute,
        });
        let single: TelemetrySnapshot = [AircraftTelemetry::new("N1", 0.0, 0.0)
            .with_altitude_m(1000.0)
            .with_ground_speed_mps(100.0)
            .with_vertical_speed_mps(1.0)]
        .into_iter()
        .collect();
        let text = encoder.encode(&single);
        assert!(text.contains("at altitude 1000 m."));
        assert!(text.contains("groundspeed of 194.384 kts"));
        assert!(text.contains("vertical speed of 196.850 ft/min"));
    }
}
