use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use code_fallback::config::{AppConfig, ConfigOverrides};
use code_fallback::runner::ProcessRunner;
use code_fallback::sequencer::FallbackSequencer;
use code_fallback::task::resolve_task;

#[derive(Parser)]
#[command(
    name = "code-fallback",
    version,
    about = "Try one coding CLI for a task, fall back to another on failure"
)]
struct Cli {
    /// Coding task to execute (read from stdin when omitted)
    task: Option<String>,

    /// Primary CLI command. Run through `sh -c 'exec <CMD> "$@"'`, so it may
    /// carry flags but not pipes or leading `VAR=value` assignments
    #[arg(short = 'c', long = "primary", visible_alias = "claude", value_name = "CMD")]
    primary: Option<String>,

    /// Fallback CLI command, run the same way as the primary
    #[arg(short = 'x', long = "secondary", visible_alias = "codex", value_name = "CMD")]
    secondary: Option<String>,

    /// Timeout per attempt in milliseconds
    #[arg(short, long, value_name = "MS")]
    timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Path to configuration file
    #[arg(long)]
    config: Option<String>,

    /// Exec the tools directly instead of through the shell
    #[arg(long)]
    direct: bool,

    /// Emit diagnostics as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(config: &AppConfig) {
    let default_level = if config.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = config.log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text = (!config.log_json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Usage errors exit 1 like every other invalid configuration; --help and
    // --version still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return Ok(if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            });
        }
    };

    let overrides = ConfigOverrides {
        primary_command: cli.primary,
        secondary_command: cli.secondary,
        timeout_ms: cli.timeout,
        verbose: cli.verbose,
        direct: cli.direct,
        log_json: cli.log_json,
    };
    let config = AppConfig::load(cli.config.as_deref(), &overrides)?;

    init_tracing(&config);
    tracing::debug!(?config, "Configuration loaded");

    let task = resolve_task(cli.task, tokio::io::stdin()).await?;

    let sequencer = FallbackSequencer::new(ProcessRunner::new());
    let result = sequencer.execute(&task, &config).await;

    tracing::debug!(
        succeeded = result.succeeded,
        succeeded_with = ?result.succeeded_with,
        exit_code = result.final_exit_code,
        "Sequence finished"
    );

    Ok(ExitCode::from(result.final_exit_code))
}
