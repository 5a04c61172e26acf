//! GPTC Agent
//!
//! Runs the controller against an in-memory scenario host:
//! - loads configuration (TOML file, then `GPTC_*` environment overrides)
//! - builds the oracle (OpenAI/Azure, or a scripted one with `--dry-run`)
//! - loads the scenario and drives fast/slow ticks until Ctrl-C or timeout
//!
//! Usage:
//!   gptc-agent --config gptc.toml --scenario scenarios/head_on.toml --enable

mod scenario_host;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use gptc::oracle::OracleProviderType;
use gptc::{GptcConfig, GptcController, Mode, OracleFactory, SecretStore, TickScheduler};
use scenario_host::{AgentLoop, ScenarioFile, ScenarioHost, SharedHost};

/// Agent CLI arguments
#[derive(Parser, Debug)]
#[command(name = "gptc-agent")]
#[command(about = "GPTC Agent - language-model air traffic control loop")]
struct Args {
    /// Path to configuration file (TOML format)
    #[arg(long, env = "GPTC_CONFIG")]
    config: Option<PathBuf>,

    /// Scenario file listing the aircraft to fly
    #[arg(long, env = "GPTC_SCENARIO")]
    scenario: Option<PathBuf>,

    /// Command mode (altitude, heading, speed, approach)
    #[arg(long)]
    mode: Option<Mode>,

    /// Start with oracle control switched on
    #[arg(long)]
    enable: bool,

    /// Use a scripted oracle instead of a live model
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(long, env = "GPTC_DURATION_SECS")]
    duration_secs: Option<u64>,

    /// Disable ANSI colors in log output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gptc=info,gptc_agent=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!args.no_color)
        .init();

    info!("GPTC Agent starting...");
    let config = load_config(&args)?;

    let scenario = match &args.scenario {
        Some(path) => Some(
            ScenarioFile::from_file(path)
                .map_err(anyhow::Error::msg)
                .context("Failed to load scenario")?,
        ),
        None => None,
    };

    let mut oracle_config = config.oracle.clone();
    if args.dry_run {
        oracle_config.provider_type = OracleProviderType::Stub;
        if oracle_config.stub_responses.is_empty() {
            let ids: Vec<String> = scenario
                .iter()
                .flat_map(|s| s.aircraft.iter().map(|a| a.id.clone()))
                .collect();
            oracle_config.stub_responses = demo_script(config.mode, &ids);
        }
    }

    let project_dir = std::env::current_dir().context("Failed to resolve working directory")?;
    let secrets = SecretStore::new(Some(project_dir.as_path())).context("Failed to load secrets")?;
    let oracle = OracleFactory::create(&oracle_config, &secrets, args.dry_run)
        .context("Failed to create oracle")?;
    let info = oracle.info();
    info!(oracle = %info.name, model = %info.model, "oracle ready");

    let base_dir = args
        .scenario
        .as_ref()
        .and_then(|p| p.parent().map(PathBuf::from))
        .unwrap_or_else(|| project_dir.clone());
    let host = SharedHost::new(ScenarioHost::new(&base_dir));
    let mut controller = GptcController::new(&config, Arc::from(oracle), host.clone(), host.clone())
        .context("Failed to build controller")?;

    if let Some(path) = &args.scenario {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Scenario path has no file name")?;
        controller
            .start_scenario(file_name)
            .context("Failed to start scenario")?;
        info!(aircraft = ?host.lock().ids(), "scenario aircraft");
    } else {
        warn!("no scenario given; the sky is empty");
    }

    let scheduler = TickScheduler::from_config(&config.schedule);
    let mut agent = AgentLoop { controller, host };
    let duration = args.duration_secs;
    let counts = scheduler
        .run(&mut agent, async move {
            match duration {
                Some(secs) => tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                        info!(secs, "run duration elapsed");
                    }
                    _ = shutdown_signal() => {}
                },
                None => shutdown_signal().await,
            }
        })
        .await;

    let metrics = agent.controller.metrics();
    info!(
        fast_ticks = counts.fast,
        slow_ticks = counts.slow,
        oracle_invocations = metrics.invocations(),
        oracle_attempts = metrics.total_attempts,
        first_attempt_successes = metrics.first_attempt_successes,
        successful_retries = metrics.successful_retries,
        exhausted = metrics.exhausted,
        violations = agent.controller.violation_count(),
        host_commands = agent.host.lock().commands().len(),
        "GPTC Agent finished"
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<GptcConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Using configuration: {}", path.display());
            GptcConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => GptcConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid GPTC_* environment override")?;
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if args.enable {
        config.start_enabled = true;
    }
    config.validate()?;
    Ok(config)
}

/// Canned replies for `--dry-run`, shaped to pass the mode's grammar.
///
/// Modes with an exact line count cycle through the aircraft to reach it.
fn demo_script(mode: Mode, ids: &[String]) -> Vec<String> {
    let count = mode
        .policy()
        .exact_line_count
        .unwrap_or_else(|| ids.len().min(3));
    let lines: Vec<String> = ids
        .iter()
        .cycle()
        .take(count)
        .enumerate()
        .map(|(i, id)| match mode {
            Mode::Altitude => format!("ALT {} {}", id, 24_000 + 2_000 * i),
            Mode::Heading => format!("HDG {} {:03}", id, (45 + 90 * i) % 360),
            Mode::Speed => format!("SPD {} {}", id, 250 + 20 * i),
            Mode::Approach => {
                format!("{}: {:03} FL{:03} 42.0 -83.0", id, (90 * i) % 360, 50 + 10 * i)
            }
        })
        .collect();
    vec![lines.join("\n")]
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received, shutting down...");
}
