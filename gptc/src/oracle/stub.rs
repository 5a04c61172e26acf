use async_trait::async_trait;
use std::sync::Mutex;

use super::{Oracle, OracleError, OracleInfo};

#[derive(Debug, Clone)]
enum ScriptedReply {
    Text(String),
    Unavailable(String),
}

/// Deterministic oracle serving a fixed script of replies.
///
/// Replies are served in order and the last one repeats once the script is
/// used up; an empty script answers with an empty string. Every prompt is
/// recorded so tests can inspect what was sent.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    script: Vec<ScriptedReply>,
    state: Mutex<ScriptState>,
}

#[derive(Debug, Default)]
struct ScriptState {
    next: usize,
    prompts: Vec<String>,
}

impl ScriptedOracle {
    pub fn new<I, T>(responses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            script: responses
                .into_iter()
                .map(|r| ScriptedReply::Text(r.into()))
                .collect(),
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// Append a reply that fails as if the service were unreachable.
    pub fn then_unavailable(mut self, message: impl Into<String>) -> Self {
        self.script.push(ScriptedReply::Unavailable(message.into()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().map(|s| s.prompts.len()).unwrap_or(0)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let reply = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| OracleError::Transport("scripted oracle state poisoned".to_string()))?;
            state.prompts.push(prompt.to_string());
            let idx = state.next.min(self.script.len().saturating_sub(1));
            state.next += 1;
            self.script.get(idx).cloned()
        };
        match reply {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Unavailable(msg)) => Err(OracleError::Transport(msg)),
            None => Ok(String::new()),
        }
    }

    fn info(&self) -> OracleInfo {
        OracleInfo {
            name: "Scripted Oracle".to_string(),
            model: "scripted".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_then_repeat_last() {
        let oracle = ScriptedOracle::new(["one", "two"]);
        assert_eq!(oracle.complete("p1").await.unwrap(), "one");
        assert_eq!(oracle.complete("p2").await.unwrap(), "two");
        assert_eq!(oracle.complete("p3").await.unwrap(), "two");
        assert_eq!(oracle.prompts(), vec!["p1", "p2", "p3"]);
        assert_eq!(oracle.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_answers_empty() {
        let oracle = ScriptedOracle::default();
        assert_eq!(oracle.complete("p").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_unavailable_reply() {
        let oracle = ScriptedOracle::new(["ok"]).then_unavailable("connection refused");
        assert!(oracle.complete("p").await.is_ok());
        assert!(matches!(
            oracle.complete("p").await,
            Err(OracleError::Transport(msg)) if msg == "connection refused"
        ));
    }
}
