//! Secret store with layered resolution
//!
//! Resolution order (higher priority first):
//! 1. Local project secrets (.gptc/secrets.toml)
//! 2. Environment variables

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to read secrets file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("failed to parse secrets file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Secrets file format
#[derive(Debug, Clone, Default, Deserialize)]
struct SecretsFile {
    #[serde(default)]
    secrets: HashMap<String, String>,
    /// Expected secret name -> name actually looked up
    #[serde(default)]
    mappings: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    local_secrets: HashMap<String, String>,
    mappings: HashMap<String, String>,
}

impl SecretStore {
    /// Load `<project_dir>/.gptc/secrets.toml` if it exists.
    pub fn new(project_dir: Option<&Path>) -> Result<Self, SecretError> {
        let Some(dir) = project_dir else {
            return Ok(Self::empty());
        };
        let path = dir.join(".gptc").join("secrets.toml");
        if !path.exists() {
            return Ok(Self::empty());
        }
        let content = fs::read_to_string(&path).map_err(|e| SecretError::Read {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let file: SecretsFile = toml::from_str(&content).map_err(|e| SecretError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            local_secrets: file.secrets,
            mappings: file.mappings,
        })
    }

    /// A store that only consults environment variables.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get a secret by name. Resolution order: local file, then env var.
    pub fn get(&self, name: &str) -> Option<String> {
        let lookup = self.mappings.get(name).map(|s| s.as_str()).unwrap_or(name);
        if let Some(val) = self.local_secrets.get(lookup) {
            return Some(val.clone());
        }
        std::env::var(lookup).ok().filter(|v| !v.is_empty())
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn list_local(&self) -> Vec<&str> {
        self.local_secrets.keys().map(|s| s.as_str()).collect()
    }
}
