//! The closed-loop controller.
//!
//! Owns the separation monitor (fast tick) and the oracle query loop (slow
//! tick) and talks to the host only through the injected
//! [`TelemetryProvider`] and [`CommandSink`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::GptcConfig;
use crate::dispatch::{CommandDispatcher, DispatchReport};
use crate::error::GptcResult;
use crate::host::{CommandSink, TelemetryProvider};
use crate::mode::Mode;
use crate::oracle::Oracle;
use crate::prompt::PromptAssembler;
use crate::query_loop::{QueryError, QueryLoop, RetryMetricsSummary};
use crate::scenario::{ScenarioError, ScenarioLog};
use crate::separation::{SeparationMonitor, SeparationViolation};
use crate::telemetry::TelemetryEncoder;
use crate::validation::ResponseValidator;

/// What a slow tick ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum SlowTickOutcome {
    Disabled,
    NoTraffic,
    Dispatched {
        report: DispatchReport,
        attempts: u32,
        exhausted: bool,
    },
    /// The oracle failed; nothing was sent.
    OracleFailed,
    /// Retries ran out under the reject policy; nothing was sent.
    Rejected { attempts: u32 },
}

pub struct GptcController<P, S> {
    provider: P,
    sink: S,
    monitor: SeparationMonitor,
    echo_warnings: bool,
    query_loop: QueryLoop,
    dispatcher: CommandDispatcher,
    scenario_log: ScenarioLog,
    enabled: bool,
    violation_count: u64,
    scenario_count: u64,
}

impl<P: TelemetryProvider, S: CommandSink> GptcController<P, S> {
    pub fn new(
        config: &GptcConfig,
        oracle: Arc<dyn Oracle>,
        provider: P,
        sink: S,
    ) -> GptcResult<Self> {
        let store = config.prompt_store();
        let encoder = TelemetryEncoder::new(config.units);
        let assembler = PromptAssembler::new(store.as_ref(), config.mode, encoder)?;
        let query_loop = QueryLoop::new(
            oracle,
            assembler,
            ResponseValidator::new(config.policy()),
            config.retry.clone(),
        );

        info!(
            mode = %config.mode,
            enabled = config.start_enabled,
            max_retries = config.retry.max_retries,
            "controller ready"
        );

        Ok(Self {
            provider,
            sink,
            monitor: SeparationMonitor::new(config.separation.minima),
            echo_warnings: config.separation.echo_warnings,
            query_loop,
            dispatcher: CommandDispatcher::new(),
            scenario_log: ScenarioLog::new(&config.scenario_results_path),
            enabled: config.start_enabled,
            violation_count: 0,
            scenario_count: 0,
        })
    }

    pub fn mode(&self) -> Mode {
        self.query_loop.mode()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn violation_count(&self) -> u64 {
        self.violation_count
    }

    pub fn scenario_count(&self) -> u64 {
        self.scenario_count
    }

    pub fn metrics(&self) -> RetryMetricsSummary {
        self.query_loop.metrics()
    }

    /// Scan every pair once and report violations.
    pub fn on_fast_tick(&mut self) -> Vec<SeparationViolation> {
        let snapshot = self.provider.snapshot();
        let violations = self.monitor.scan(&snapshot);
        for v in &violations {
            warn!(
                first = %v.first,
                second = %v.second,
                horizontal_ft = v.horizontal_ft,
                vertical_ft = v.vertical_ft,
                "separation violation"
            );
            if self.echo_warnings {
                let echo = format!(
                    "ECHO WARNING: Aircraft {} and {} are too close!",
                    v.first, v.second
                );
                if let Err(e) = self.sink.submit(&echo) {
                    warn!(error = %e, "failed to echo separation warning");
                }
            }
        }
        self.violation_count += violations.len() as u64;
        violations
    }

    /// Ask the oracle for commands about the current traffic and send them.
    pub async fn on_slow_tick(&mut self) -> SlowTickOutcome {
        if !self.enabled {
            return SlowTickOutcome::Disabled;
        }
        let snapshot = self.provider.snapshot();
        if snapshot.is_empty() {
            debug!("no aircraft, skipping oracle query");
            return SlowTickOutcome::NoTraffic;
        }

        match self.query_loop.run(&snapshot).await {
            Ok(outcome) => {
                let report = self.dispatcher.dispatch(&outcome.lines, &mut self.sink);
                info!(
                    sent = report.sent,
                    failed = report.failed.len(),
                    attempts = outcome.attempts,
                    exhausted = outcome.exhausted,
                    "dispatched oracle commands"
                );
                SlowTickOutcome::Dispatched {
                    report,
                    attempts: outcome.attempts,
                    exhausted: outcome.exhausted,
                }
            }
            Err(QueryError::Oracle { attempt, source }) => {
                warn!(attempt, error = %source, "oracle unavailable, skipping tick");
                SlowTickOutcome::OracleFailed
            }
            Err(QueryError::Exhausted { attempts, reason, .. }) => {
                warn!(attempts, reason = %reason, "no valid commands, nothing dispatched");
                SlowTickOutcome::Rejected { attempts }
            }
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(enabled, "oracle control toggled");
        }
        self.enabled = enabled;
    }

    /// Operator switch: `"on"` or `"off"`. Returns the resulting state.
    pub fn toggle(&mut self, flag: &str) -> bool {
        match flag.trim().to_ascii_lowercase().as_str() {
            "on" => self.set_enabled(true),
            "off" => self.set_enabled(false),
            other => warn!(flag = other, "ignoring unknown toggle value"),
        }
        self.enabled
    }

    /// Ask the host to load `filename`, then record the finished scenario.
    ///
    /// Nothing is recorded and the counters are left alone when the host
    /// refuses the load. Once the host has loaded, the counters reset even if
    /// the results file cannot be written.
    pub fn start_scenario(&mut self, filename: &str) -> GptcResult<()> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(ScenarioError::MissingFilename.into());
        }

        self.sink.submit(&format!("LOAD {}", filename))?;
        let recorded = self
            .scenario_log
            .append(filename, self.scenario_count, self.violation_count);
        if let Err(e) = &recorded {
            warn!(scenario = filename, error = %e, "failed to record scenario results");
        }

        info!(
            scenario = filename,
            previous_violations = self.violation_count,
            scenario_count = self.scenario_count,
            "scenario started"
        );
        self.violation_count = 0;
        self.scenario_count += 1;
        recorded.map_err(Into::into)
    }
}
