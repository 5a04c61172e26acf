//! Oracle abstraction
//!
//! The oracle is the language model that turns a prompt into free text. The
//! controller only needs one operation from it: submit a prompt, await the
//! response. Providers are selected from configuration through
//! [`OracleFactory`].

pub mod openai;
pub mod stub;

pub use openai::OpenAiOracle;
pub use stub::ScriptedOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::secrets::SecretStore;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request timed out after {0}s")]
    Timeout(u64),

    #[error("oracle transport failure: {0}")]
    Transport(String),

    #[error("oracle returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("oracle response could not be decoded: {0}")]
    Decode(String),

    #[error("oracle returned no completion")]
    EmptyResponse,

    #[error("oracle misconfigured: {0}")]
    Config(String),
}

/// Supported oracle providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OracleProviderType {
    /// Scripted responses, for tests and dry runs
    Stub,
    /// OpenAI-compatible chat completions endpoint
    #[default]
    OpenAi,
    /// Azure OpenAI deployment
    Azure,
}

/// Configuration for oracle providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub provider_type: OracleProviderType,
    /// Model name, or deployment name for Azure
    #[serde(default = "default_model")]
    pub model: String,
    /// Endpoint root; provider default when unset (required for Azure)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Azure `api-version` query parameter
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    /// Secret name the API key is resolved under
    #[serde(default = "default_api_key_secret")]
    pub api_key_secret: String,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Responses served in order by the stub provider
    #[serde(default)]
    pub stub_responses: Vec<String>,
}

fn default_model() -> String {
    "gpt-35-turbo".to_string()
}

fn default_api_key_secret() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider_type: OracleProviderType::default(),
            model: default_model(),
            base_url: None,
            api_version: None,
            organization: None,
            api_key_secret: default_api_key_secret(),
            max_tokens: None,
            temperature: None,
            timeout_seconds: None,
            stub_responses: Vec::new(),
        }
    }
}

/// Information about an oracle provider
#[derive(Debug, Clone)]
pub struct OracleInfo {
    pub name: String,
    pub model: String,
}

/// Prompt in, text out. One request per call, no streaming.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;

    fn info(&self) -> OracleInfo;
}

/// Factory for creating oracle providers
pub struct OracleFactory;

impl OracleFactory {
    /// Build the provider named by `config`.
    ///
    /// The stub provider is refused unless `allow_stub` is set, the
    /// `GPTC_ALLOW_STUB_ORACLE` environment variable is `1`/`true`, or the
    /// crate is compiled for tests.
    pub fn create(
        config: &OracleConfig,
        secrets: &SecretStore,
        allow_stub: bool,
    ) -> Result<Box<dyn Oracle>, OracleError> {
        match config.provider_type {
            OracleProviderType::Stub => {
                let allowed = allow_stub
                    || std::env::var("GPTC_ALLOW_STUB_ORACLE")
                        .map(|v| v == "1" || v == "true")
                        .unwrap_or(false)
                    || cfg!(test);
                if !allowed {
                    return Err(OracleError::Config(
                        "stub oracle is for testing only; set GPTC_ALLOW_STUB_ORACLE=1 or configure openai/azure"
                            .to_string(),
                    ));
                }
                tracing::warn!("using scripted stub oracle; responses will not react to traffic");
                Ok(Box::new(ScriptedOracle::new(config.stub_responses.clone())))
            }
            OracleProviderType::OpenAi | OracleProviderType::Azure => {
                let api_key = secrets.get(&config.api_key_secret).ok_or_else(|| {
                    OracleError::Config(format!(
                        "API key not found under secret '{}'",
                        config.api_key_secret
                    ))
                })?;
                Ok(Box::new(OpenAiOracle::new(config.clone(), api_key)?))
            }
        }
    }
}
