use thiserror::Error;

use crate::config::ConfigError;
use crate::host::DispatchError;
use crate::oracle::OracleError;
use crate::query_loop::QueryError;
use crate::scenario::ScenarioError;
use crate::secrets::SecretError;

/// Crate-level error; each seam keeps its own enum and converts into this one.
#[derive(Debug, Error)]
pub enum GptcError {
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("prompt error: {0}")]
    Prompt(String),
}

pub type GptcResult<T> = Result<T, GptcError>;
