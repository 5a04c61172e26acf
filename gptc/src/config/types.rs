use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::mode::{Mode, ValidationPolicy};
use crate::oracle::{OracleConfig, OracleProviderType};
use crate::prompt::{BuiltinPromptStore, FilePromptStore, PromptStore};
use crate::query_loop::{ExhaustionPolicy, RetryConfig};
use crate::separation::SeparationMinima;
use crate::telemetry::UnitConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("invalid value '{value}' for {key}")]
    Env { key: String, value: String },

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Top-level controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GptcConfig {
    /// Command vocabulary the oracle is asked for
    #[serde(default)]
    pub mode: Mode,
    /// Whether oracle queries run before the first explicit toggle
    #[serde(default)]
    pub start_enabled: bool,
    /// File that scenario starts are appended to
    #[serde(default = "default_scenario_results_path")]
    pub scenario_results_path: PathBuf,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub separation: SeparationConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Units used when encoding telemetry into the prompt
    #[serde(default)]
    pub units: UnitConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    /// Replaces the active mode's built-in grammar policy when set
    #[serde(default)]
    pub validation: Option<ValidationPolicy>,
    #[serde(default)]
    pub oracle: OracleConfig,
}

fn default_scenario_results_path() -> PathBuf {
    PathBuf::from("scenario_results.txt")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationConfig {
    #[serde(flatten)]
    pub minima: SeparationMinima,
    /// Echo a warning command to the host for every violation
    #[serde(default = "default_true")]
    pub echo_warnings: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            minima: SeparationMinima::default(),
            echo_warnings: true,
        }
    }
}

/// Tick periods, in simulated seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_fast_tick_secs")]
    pub fast_tick_secs: f64,
    #[serde(default = "default_slow_tick_secs")]
    pub slow_tick_secs: f64,
}

fn default_fast_tick_secs() -> f64 {
    0.5
}

fn default_slow_tick_secs() -> f64 {
    10.0
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            fast_tick_secs: default_fast_tick_secs(),
            slow_tick_secs: default_slow_tick_secs(),
        }
    }
}

impl ScheduleConfig {
    pub fn fast_tick(&self) -> Duration {
        Duration::from_secs_f64(self.fast_tick_secs)
    }

    pub fn slow_tick(&self) -> Duration {
        Duration::from_secs_f64(self.slow_tick_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Directory holding `<mode>.md` header overrides
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for GptcConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            start_enabled: false,
            scenario_results_path: default_scenario_results_path(),
            retry: RetryConfig::default(),
            separation: SeparationConfig::default(),
            schedule: ScheduleConfig::default(),
            units: UnitConfig::default(),
            prompts: PromptsConfig::default(),
            validation: None,
            oracle: OracleConfig::default(),
        }
    }
}

impl GptcConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Overlay `GPTC_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay `GPTC_*` variables resolved through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
            value.trim().parse().map_err(|_| ConfigError::Env {
                key: key.to_string(),
                value,
            })
        }

        if let Some(v) = lookup("GPTC_MODE") {
            self.mode = parsed("GPTC_MODE", v)?;
        }
        if let Some(v) = lookup("GPTC_MAX_RETRIES") {
            self.retry.max_retries = parsed("GPTC_MAX_RETRIES", v)?;
        }
        if let Some(v) = lookup("GPTC_EXHAUSTION_POLICY") {
            self.retry.exhaustion_policy = match v.trim() {
                "accept_last" => ExhaustionPolicy::AcceptLast,
                "reject" => ExhaustionPolicy::Reject,
                _ => {
                    return Err(ConfigError::Env {
                        key: "GPTC_EXHAUSTION_POLICY".to_string(),
                        value: v,
                    })
                }
            };
        }
        if let Some(v) = lookup("GPTC_ORACLE_PROVIDER") {
            self.oracle.provider_type = match v.trim().to_ascii_lowercase().as_str() {
                "stub" => OracleProviderType::Stub,
                "openai" | "open_ai" => OracleProviderType::OpenAi,
                "azure" => OracleProviderType::Azure,
                _ => {
                    return Err(ConfigError::Env {
                        key: "GPTC_ORACLE_PROVIDER".to_string(),
                        value: v,
                    })
                }
            };
        }
        if let Some(v) = lookup("GPTC_ORACLE_MODEL") {
            self.oracle.model = v;
        }
        if let Some(v) = lookup("GPTC_ORACLE_BASE_URL") {
            self.oracle.base_url = Some(v);
        }
        if let Some(v) = lookup("GPTC_ORACLE_API_VERSION") {
            self.oracle.api_version = Some(v);
        }
        if let Some(v) = lookup("GPTC_ORACLE_TIMEOUT_SECS") {
            self.oracle.timeout_seconds = Some(parsed("GPTC_ORACLE_TIMEOUT_SECS", v)?);
        }
        if let Some(v) = lookup("GPTC_PROMPTS_DIR") {
            self.prompts.dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    /// Check every field and report all problems together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let minima = &self.separation.minima;
        if !(minima.min_horizontal_ft.is_finite() && minima.min_horizontal_ft > 0.0) {
            errors.push("separation.min_horizontal_ft must be a positive number".to_string());
        }
        if !(minima.min_vertical_ft.is_finite() && minima.min_vertical_ft > 0.0) {
            errors.push("separation.min_vertical_ft must be a positive number".to_string());
        }
        for (name, secs) in [
            ("schedule.fast_tick_secs", self.schedule.fast_tick_secs),
            ("schedule.slow_tick_secs", self.schedule.slow_tick_secs),
        ] {
            if !(secs.is_finite() && secs > 0.0) {
                errors.push(format!("{} must be a positive number of seconds", name));
            }
        }
        if let Some(policy) = &self.validation {
            if policy.prefix.as_deref() == Some("") {
                errors.push("validation.prefix must not be empty".to_string());
            }
            if policy.max_line_length == Some(0) {
                errors.push("validation.max_line_length must be at least 1".to_string());
            }
            if policy.exact_line_count == Some(0) {
                errors.push("validation.exact_line_count must be at least 1".to_string());
            }
        }
        if self.oracle.provider_type == OracleProviderType::Azure && self.oracle.base_url.is_none()
        {
            errors.push("oracle.base_url is required for the azure provider".to_string());
        }
        if let Some(t) = self.oracle.temperature {
            if !(0.0..=2.0).contains(&t) {
                errors.push("oracle.temperature must be between 0 and 2".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Grammar policy in force: the override if configured, else the mode's.
    pub fn policy(&self) -> ValidationPolicy {
        self.validation.clone().unwrap_or_else(|| self.mode.policy())
    }

    pub fn prompt_store(&self) -> Box<dyn PromptStore> {
        match &self.prompts.dir {
            Some(dir) => Box::new(FilePromptStore::new(dir)),
            None => Box::new(BuiltinPromptStore),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = GptcConfig::from_toml_str("").unwrap();
        assert_eq!(config.mode, Mode::Heading);
        assert!(!config.start_enabled);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.exhaustion_policy, ExhaustionPolicy::AcceptLast);
        assert_eq!(config.separation.minima.min_horizontal_ft, 5000.0);
        assert_eq!(config.separation.minima.min_vertical_ft, 1000.0);
        assert!(config.separation.echo_warnings);
        assert_eq!(config.schedule.fast_tick(), Duration::from_millis(500));
        assert_eq!(config.schedule.slow_tick(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_file() {
        let toml = r#"
mode = "approach"
start_enabled = true
scenario_results_path = "/tmp/results.txt"

[retry]
max_retries = 4
exhaustion_policy = "reject"

[separation]
min_horizontal_ft = 6000.0
min_vertical_ft = 2000.0
echo_warnings = false

[schedule]
fast_tick_secs = 1.0
slow_tick_secs = 30.0

[units]
ground_speed = "knots"

[validation]
max_line_length = 40
exact_line_count = 3

[oracle]
provider_type = "azure"
model = "gpt-35-turbo"
base_url = "https://example.openai.azure.com"
api_version = "2023-05-15"
timeout_seconds = 20
"#;
        let config = GptcConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.mode, Mode::Approach);
        assert!(config.start_enabled);
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.exhaustion_policy, ExhaustionPolicy::Reject);
        assert_eq!(config.separation.minima.min_vertical_ft, 2000.0);
        assert!(!config.separation.echo_warnings);
        assert_eq!(config.policy().max_line_length, Some(40));
        assert_eq!(config.policy().prefix, None);
        assert_eq!(config.oracle.provider_type, OracleProviderType::Azure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_defaults_to_mode() {
        let config = GptcConfig {
            mode: Mode::Altitude,
            ..GptcConfig::default()
        };
        assert_eq!(config.policy(), Mode::Altitude.policy());
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("GPTC_MODE", "alt"),
            ("GPTC_MAX_RETRIES", "5"),
            ("GPTC_EXHAUSTION_POLICY", "reject"),
            ("GPTC_ORACLE_PROVIDER", "stub"),
        ]
        .into_iter()
        .collect();
        let mut config = GptcConfig::default();
        config
            .apply_env_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.mode, Mode::Altitude);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.exhaustion_policy, ExhaustionPolicy::Reject);
        assert_eq!(config.oracle.provider_type, OracleProviderType::Stub);
    }

    #[test]
    fn test_env_overlay_rejects_bad_values() {
        let mut config = GptcConfig::default();
        let err = config
            .apply_env_from(|k| (k == "GPTC_MAX_RETRIES").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref key, .. } if key == "GPTC_MAX_RETRIES"));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = GptcConfig::default();
        config.separation.minima.min_horizontal_ft = 0.0;
        config.schedule.slow_tick_secs = -1.0;
        config.oracle.provider_type = OracleProviderType::Azure;
        match config.validate() {
            Err(ConfigError::Invalid(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GptcConfig::from_file(dir.path().join("nope.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
