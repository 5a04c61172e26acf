//! OpenAI-compatible chat completions client, with an Azure deployment variant.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{Oracle, OracleConfig, OracleError, OracleInfo, OracleProviderType};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct OpenAiOracle {
    config: OracleConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiOracle {
    pub fn new(config: OracleConfig, api_key: String) -> Result<Self, OracleError> {
        if config.provider_type == OracleProviderType::Azure && config.base_url.is_none() {
            return Err(OracleError::Config(
                "Azure oracle requires base_url (the resource endpoint)".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(|e| OracleError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        match self.config.provider_type {
            OracleProviderType::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.config
                    .base_url
                    .as_deref()
                    .unwrap_or_default()
                    .trim_end_matches('/'),
                self.config.model,
                self.config
                    .api_version
                    .as_deref()
                    .unwrap_or(DEFAULT_AZURE_API_VERSION)
            ),
            _ => format!(
                "{}/chat/completions",
                self.config
                    .base_url
                    .as_deref()
                    .unwrap_or(DEFAULT_OPENAI_BASE_URL)
                    .trim_end_matches('/')
            ),
        }
    }

    fn request_body(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            // Azure takes the model from the deployment path.
            model: match self.config.provider_type {
                OracleProviderType::Azure => None,
                _ => Some(self.config.model.clone()),
            },
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    fn timeout_secs(&self) -> u64 {
        self.config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let mut request = self.client.post(self.endpoint()).json(&self.request_body(prompt));
        request = match self.config.provider_type {
            OracleProviderType::Azure => request.header("api-key", &self.api_key),
            _ => request.bearer_auth(&self.api_key),
        };
        if let Some(org) = &self.config.organization {
            request = request.header("OpenAI-Organization", org);
        }

        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout_secs())
            } else {
                OracleError::Transport(e.to_string())
            }
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout_secs())
            } else {
                OracleError::Transport(e.to_string())
            }
        })?;
        debug!(
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "oracle responded"
        );

        if !status.is_success() {
            return Err(OracleError::Http {
                status: status.as_u16(),
                body,
            });
        }
        parse_completion(&body)
    }

    fn info(&self) -> OracleInfo {
        let name = match self.config.provider_type {
            OracleProviderType::Azure => "Azure OpenAI",
            _ => "OpenAI-compatible",
        };
        OracleInfo {
            name: name.to_string(),
            model: self.config.model.clone(),
        }
    }
}

fn parse_completion(body: &str) -> Result<String, OracleError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| OracleError::Decode(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or(OracleError::EmptyResponse)
}

#[derive(Serialize)]
struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
