//! Prompt → oracle → validation loop with a bounded retry budget.
//!
//! One invocation builds a single immutable prompt and resubmits that same
//! prompt after every rejected response. Oracle calls are strictly
//! sequential. When the budget runs out the [`ExhaustionPolicy`] decides what
//! happens to the last response; the default forwards it even though it
//! failed validation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mode::Mode;
use crate::oracle::{Oracle, OracleError};
use crate::prompt::{Prompt, PromptAssembler};
use crate::telemetry::TelemetrySnapshot;
use crate::validation::{ResponseValidator, ValidationVerdict};

/// What to do with the last response once the retry budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Forward the last response even though it never validated.
    #[default]
    AcceptLast,
    /// Fail the invocation with [`QueryError::Exhausted`].
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Re-submissions allowed after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub exhaustion_policy: ExhaustionPolicy,
}

fn default_max_retries() -> u32 {
    2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            exhaustion_policy: ExhaustionPolicy::default(),
        }
    }
}

/// Retries left within one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    used: u32,
    max: u32,
}

impl RetryBudget {
    pub fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max
    }

    /// Spend one retry. Returns false if none was left.
    pub fn consume(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.used += 1;
        true
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("oracle failed on attempt {attempt}: {source}")]
    Oracle {
        attempt: u32,
        #[source]
        source: OracleError,
    },

    #[error("no valid response after {attempts} attempts: {reason}")]
    Exhausted {
        attempts: u32,
        reason: String,
        last_response: String,
    },
}

/// Final result of one invocation.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub response: String,
    /// `response` split on `'\n'`, in order.
    pub lines: Vec<String>,
    pub verdict: ValidationVerdict,
    /// Oracle calls made, including the first.
    pub attempts: u32,
    /// True when the response is forwarded only because retries ran out.
    pub exhausted: bool,
    pub prompt_hash: String,
}

impl QueryOutcome {
    pub fn is_valid(&self) -> bool {
        self.verdict.is_accepted()
    }
}

/// Metrics for tracking retry behavior
#[derive(Debug, Default)]
pub struct RetryMetrics {
    /// Oracle calls, first attempts included
    pub total_attempts: AtomicU64,
    pub first_attempt_successes: AtomicU64,
    /// Invocations that validated on a retry
    pub successful_retries: AtomicU64,
    /// Invocations that ran out of retries
    pub exhausted: AtomicU64,
}

impl RetryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_attempt(&self) {
        self.total_attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_success(&self, attempt: u32) {
        if attempt == 1 {
            self.first_attempt_successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.successful_retries.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> RetryMetricsSummary {
        RetryMetricsSummary {
            total_attempts: self.total_attempts.load(Ordering::Relaxed),
            first_attempt_successes: self.first_attempt_successes.load(Ordering::Relaxed),
            successful_retries: self.successful_retries.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}

/// Summary of retry metrics for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryMetricsSummary {
    pub total_attempts: u64,
    pub first_attempt_successes: u64,
    pub successful_retries: u64,
    pub exhausted: u64,
}

impl RetryMetricsSummary {
    pub fn invocations(&self) -> u64 {
        self.first_attempt_successes + self.successful_retries + self.exhausted
    }
}

pub struct QueryLoop {
    oracle: Arc<dyn Oracle>,
    assembler: PromptAssembler,
    validator: ResponseValidator,
    retry: RetryConfig,
    metrics: RetryMetrics,
}

impl QueryLoop {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        assembler: PromptAssembler,
        validator: ResponseValidator,
        retry: RetryConfig,
    ) -> Self {
        Self {
            oracle,
            assembler,
            validator,
            retry,
            metrics: RetryMetrics::new(),
        }
    }

    pub fn metrics(&self) -> RetryMetricsSummary {
        self.metrics.summary()
    }

    pub fn mode(&self) -> Mode {
        self.assembler.mode()
    }

    /// Query the oracle about `snapshot` until a response validates or the
    /// retry budget is spent. Makes at most `max_retries + 1` oracle calls.
    pub async fn run(&self, snapshot: &TelemetrySnapshot) -> Result<QueryOutcome, QueryError> {
        let prompt = self.assembler.assemble(snapshot);
        let prompt_hash = prompt.hash();
        let mut budget = RetryBudget::new(self.retry.max_retries);
        let mut attempt = 1;

        loop {
            let response = self.ask(&prompt, &prompt_hash, attempt).await?;
            let verdict = self.validator.validate(&response);

            if verdict.is_accepted() {
                self.metrics.record_success(attempt);
                if attempt > 1 {
                    info!(
                        attempt,
                        prompt_hash = %prompt_hash,
                        "oracle response accepted after retry"
                    );
                }
                return Ok(outcome(response, verdict, attempt, false, prompt_hash));
            }

            warn!(
                attempt,
                mode = %self.assembler.mode(),
                reason = %verdict.reason(),
                "invalid oracle response"
            );

            if !budget.consume() {
                self.metrics.record_exhausted();
                return self.exhaust(response, verdict, attempt, prompt_hash);
            }
            info!(
                retry = budget.used(),
                max = self.retry.max_retries,
                "retrying with the same prompt"
            );
            attempt += 1;
        }
    }

    async fn ask(
        &self,
        prompt: &Prompt,
        prompt_hash: &str,
        attempt: u32,
    ) -> Result<String, QueryError> {
        self.metrics.record_attempt();
        let start = Instant::now();
        let result = self.oracle.complete(prompt.as_str()).await;
        let latency_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(response) => {
                debug!(attempt, prompt_hash, latency_ms, response = %response, "oracle reply");
                Ok(response)
            }
            Err(source) => {
                warn!(attempt, prompt_hash, latency_ms, error = %source, "oracle call failed");
                Err(QueryError::Oracle { attempt, source })
            }
        }
    }

    fn exhaust(
        &self,
        response: String,
        verdict: ValidationVerdict,
        attempts: u32,
        prompt_hash: String,
    ) -> Result<QueryOutcome, QueryError> {
        match self.retry.exhaustion_policy {
            ExhaustionPolicy::AcceptLast => {
                warn!(
                    attempts,
                    policy = "accept_last",
                    reason = %verdict.reason(),
                    "retry budget exhausted; forwarding last response unvalidated"
                );
                Ok(outcome(response, verdict, attempts, true, prompt_hash))
            }
            ExhaustionPolicy::Reject => {
                warn!(
                    attempts,
                    policy = "reject",
                    reason = %verdict.reason(),
                    "retry budget exhausted; rejecting"
                );
                Err(QueryError::Exhausted {
                    attempts,
                    reason: verdict.reason(),
                    last_response: response,
                })
            }
        }
    }
}

fn outcome(
    response: String,
    verdict: ValidationVerdict,
    attempts: u32,
    exhausted: bool,
    prompt_hash: String,
) -> QueryOutcome {
    let lines = response.split('\n').map(str::to_string).collect();
    QueryOutcome {
        response,
        lines,
        verdict,
        attempts,
        exhausted,
        prompt_hash,
    }
}
