//! In-memory simulation host for running the controller without a simulator.
//!
//! Aircraft fly straight lines at constant speed; `ALT`, `HDG` and `SPD`
//! commands take effect immediately. This is enough to watch the loop work,
//! not a flight model.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use gptc::host::DispatchError;
use gptc::telemetry::units::{
    ft_to_m, m_to_ft, FPM_PER_MPS, FT_PER_DEG_LAT, FT_PER_DEG_LON, KT_PER_MPS,
};
use gptc::{
    AircraftTelemetry, CommandSink, GptcController, TelemetryProvider, TelemetrySnapshot,
    TickHandler,
};

/// One aircraft as written in a scenario file, in pilot units.
#[derive(Debug, Clone, Deserialize)]
pub struct AircraftSpec {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub altitude_ft: f64,
    #[serde(default)]
    pub ground_speed_kt: f64,
    #[serde(default)]
    pub vertical_speed_fpm: f64,
}

impl AircraftSpec {
    fn into_telemetry(self) -> AircraftTelemetry {
        AircraftTelemetry::new(self.id, self.lat, self.lon)
            .with_heading(self.heading.rem_euclid(360.0))
            .with_altitude_ft(self.altitude_ft)
            .with_ground_speed_mps(self.ground_speed_kt / KT_PER_MPS)
            .with_vertical_speed_mps(self.vertical_speed_fpm / FPM_PER_MPS)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub aircraft: Vec<AircraftSpec>,
}

impl ScenarioFile {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }
}

#[derive(Debug, Default)]
pub struct ScenarioHost {
    aircraft: BTreeMap<String, AircraftTelemetry>,
    commands: Vec<String>,
    /// Directory `LOAD` paths are resolved against.
    base_dir: PathBuf,
}

impl ScenarioHost {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn load(&mut self, scenario: ScenarioFile) {
        self.aircraft = scenario
            .aircraft
            .into_iter()
            .map(|aircraft| (aircraft.id.clone(), aircraft.into_telemetry()))
            .collect();
    }

    pub fn aircraft(&self, id: &str) -> Option<&AircraftTelemetry> {
        self.aircraft.get(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.aircraft.keys().cloned().collect()
    }

    /// Every command received, accepted or not.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Dead-reckon every aircraft forward by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        let secs = dt.as_secs_f64();
        for ac in self.aircraft.values_mut() {
            let distance_ft = m_to_ft(ac.ground_speed_mps * secs);
            let heading = ac.heading.to_radians();
            ac.lat += distance_ft * heading.cos() / FT_PER_DEG_LAT;
            ac.lon += distance_ft * heading.sin() / FT_PER_DEG_LON;
            ac.altitude_m = (ac.altitude_m + ac.vertical_speed_mps * secs).max(0.0);
        }
    }

    fn apply(&mut self, command: &str) -> Result<(), String> {
        let mut parts = command.split_whitespace();
        let verb = parts.next().unwrap_or_default();
        match verb {
            "ECHO" => {
                info!(message = command.trim_start()["ECHO".len()..].trim(), "host echo");
                Ok(())
            }
            "LOAD" => {
                let file = parts.next().ok_or("LOAD needs a scenario file")?;
                let scenario = ScenarioFile::from_file(&self.base_dir.join(file))?;
                info!(scenario = file, aircraft = scenario.aircraft.len(), "scenario loaded");
                self.load(scenario);
                Ok(())
            }
            "ALT" | "HDG" | "SPD" => {
                let id = parts.next().ok_or("missing aircraft")?;
                let value = parts.next().ok_or("missing value")?;
                let ac = self
                    .aircraft
                    .get_mut(id)
                    .ok_or_else(|| format!("no aircraft {}", id))?;
                match verb {
                    "ALT" => ac.altitude_m = ft_to_m(parse_altitude_ft(value)?),
                    "HDG" => ac.heading = parse_number(value)?.rem_euclid(360.0),
                    _ => ac.ground_speed_mps = parse_number(value)? / KT_PER_MPS,
                }
                Ok(())
            }
            // Approach clearance: `<id>: <heading> <flight level> <lat> <lon>`
            v if v.ends_with(':') => {
                let id = v.trim_end_matches(':');
                let heading = parts.next().ok_or("missing heading")?;
                let level = parts.next().ok_or("missing flight level")?;
                let ac = self
                    .aircraft
                    .get_mut(id)
                    .ok_or_else(|| format!("no aircraft {}", id))?;
                ac.heading = parse_number(heading)?.rem_euclid(360.0);
                ac.altitude_m = ft_to_m(parse_altitude_ft(level)?);
                Ok(())
            }
            other => Err(format!("unknown command {}", other)),
        }
    }
}

fn parse_number(value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|_| format!("not a number: {}", value))
}

/// Feet, or a flight level such as `FL250`.
fn parse_altitude_ft(value: &str) -> Result<f64, String> {
    match value.strip_prefix("FL") {
        Some(level) => Ok(parse_number(level)? * 100.0),
        None => parse_number(value),
    }
}

impl TelemetryProvider for ScenarioHost {
    fn snapshot(&self) -> TelemetrySnapshot {
        self.aircraft.values().cloned().collect()
    }
}

impl CommandSink for ScenarioHost {
    fn submit(&mut self, command: &str) -> Result<(), DispatchError> {
        self.commands.push(command.to_string());
        self.apply(command).map_err(|reason| {
            debug!(command, reason = %reason, "host rejected command");
            DispatchError::Rejected {
                command: command.to_string(),
                reason,
            }
        })
    }
}

/// Handle shared by the controller (as provider and sink) and the tick loop.
#[derive(Debug, Clone, Default)]
pub struct SharedHost(Arc<Mutex<ScenarioHost>>);

impl SharedHost {
    pub fn new(host: ScenarioHost) -> Self {
        Self(Arc::new(Mutex::new(host)))
    }

    pub fn lock(&self) -> MutexGuard<'_, ScenarioHost> {
        // A panic elsewhere leaves the aircraft map intact; keep serving it.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TelemetryProvider for SharedHost {
    fn snapshot(&self) -> TelemetrySnapshot {
        self.lock().snapshot()
    }
}

impl CommandSink for SharedHost {
    fn submit(&mut self, command: &str) -> Result<(), DispatchError> {
        self.lock().submit(command)
    }
}

/// Advances the host and runs the controller on every tick.
pub struct AgentLoop {
    pub controller: GptcController<SharedHost, SharedHost>,
    pub host: SharedHost,
}

#[async_trait]
impl TickHandler for AgentLoop {
    async fn on_fast_tick(&mut self, dt: Duration) {
        self.host.lock().advance(dt);
        self.controller.on_fast_tick();
    }

    async fn on_slow_tick(&mut self, _dt: Duration) {
        let outcome = self.controller.on_slow_tick().await;
        debug!(?outcome, "slow tick finished");
        if self.host.lock().snapshot().is_empty() {
            warn!("no aircraft left in the scenario");
        }
    }
}
