//! Unit conversions shared by the encoder and the separation monitor.
//!
//! Positions are converted with a flat-Earth small-angle approximation. The
//! per-degree constants are tuned for continental US mid-latitudes and are part
//! of the prompt contract: the oracle has been shown distances computed with
//! exactly these numbers, so they must not be replaced by a geodesic formula.

use serde::{Deserialize, Serialize};

/// Feet per degree of latitude.
pub const FT_PER_DEG_LAT: f64 = 364_488.0;
/// Feet per degree of longitude.
pub const FT_PER_DEG_LON: f64 = 268_560.0;
pub const FT_PER_M: f64 = 3.28084;
pub const KT_PER_MPS: f64 = 1.943_844;
pub const FPM_PER_MPS: f64 = 196.850_394;

/// Convert a latitude delta in degrees to feet.
pub fn lat_to_ft(lat_deg: f64) -> f64 {
    lat_deg * FT_PER_DEG_LAT
}

/// Convert a longitude delta in degrees to feet.
pub fn lon_to_ft(lon_deg: f64) -> f64 {
    lon_deg * FT_PER_DEG_LON
}

pub fn m_to_ft(m: f64) -> f64 {
    m * FT_PER_M
}

pub fn ft_to_m(ft: f64) -> f64 {
    ft / FT_PER_M
}

/// Length unit used when rendering altitudes into a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    #[default]
    Feet,
    Meters,
}

impl LengthUnit {
    pub fn from_meters(self, m: f64) -> f64 {
        match self {
            LengthUnit::Feet => m_to_ft(m),
            LengthUnit::Meters => m,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LengthUnit::Feet => "ft",
            LengthUnit::Meters => "m",
        }
    }
}

/// Speed unit used when rendering ground and vertical speeds into a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeedUnit {
    #[default]
    MetersPerSecond,
    Knots,
    FeetPerMinute,
}

impl SpeedUnit {
    pub fn from_mps(self, mps: f64) -> f64 {
        match self {
            SpeedUnit::MetersPerSecond => mps,
            SpeedUnit::Knots => mps * KT_PER_MPS,
            SpeedUnit::FeetPerMinute => mps * FPM_PER_MPS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpeedUnit::MetersPerSecond => "m/s",
            SpeedUnit::Knots => "kts",
            SpeedUnit::FeetPerMinute => "ft/min",
        }
    }
}

/// Units the oracle's instructions expect to see in the encoded telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfig {
    #[serde(default)]
    pub altitude: LengthUnit,
    #[serde(default)]
    pub ground_speed: SpeedUnit,
    #[serde(default)]
    pub vertical_speed: SpeedUnit,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            altitude: LengthUnit::Feet,
            ground_speed: SpeedUnit::MetersPerSecond,
            vertical_speed: SpeedUnit::MetersPerSecond,
        }
    }
}
