//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use diskguard::core::config::Config;
use diskguard::core::errors::{DgError, Result as DgResult};
use diskguard::daemon::loop_main::MonitorDaemon;
use diskguard::daemon::notifications::{NotificationManager, NotificationSink};
use diskguard::daemon::signals::SignalHandler;
use diskguard::monitor::checker::{CheckOutcome, DiskUsageChecker};
use diskguard::monitor::disk_usage::{DISPLAY_UNIT_LABEL, format_number, to_display_unit};
use diskguard::platform::pal::{UsageQuery, usage_query_for};

/// diskguard: one alert per high disk usage episode.
#[derive(Debug, Parser)]
#[command(
    name = "diskguard",
    author,
    version,
    about = "diskguard - Disk Usage Monitor",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Check configured (or given) paths once against the threshold.
    Check(CheckArgs),
    /// Show current usage of a path.
    Usage(UsageArgs),
    /// Run the monitoring daemon.
    Daemon(DaemonArgs),
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct CheckArgs {
    /// Paths to evaluate (defaults to monitor.paths from config).
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,
    /// Override the configured alert threshold.
    #[arg(long, value_name = "PERCENT")]
    threshold: Option<f64>,
    /// Dispatch alerts through the configured channels instead of printing them.
    #[arg(long)]
    notify: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct UsageArgs {
    /// Path to measure (defaults to the first monitored path).
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Args, Default)]
struct DaemonArgs {
    /// Stop after this many ticks (runs until signalled when omitted).
    #[arg(long, value_name = "N")]
    max_ticks: Option<u64>,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<DgError> for CliError {
    fn from(err: DgError) -> Self {
        match err {
            DgError::InvalidConfig { .. }
            | DgError::MissingConfig { .. }
            | DgError::ConfigParse { .. } => Self::User(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Check(args) => run_check(cli, args),
        Command::Usage(args) => run_usage(cli, args),
        Command::Daemon(args) => run_daemon(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──── check ────

/// Accepts every alert without delivering it, so `check` can report what
/// would have been sent.
struct PreviewSink;

impl NotificationSink for PreviewSink {
    fn send_message(&self, _text: &str) -> DgResult<()> {
        Ok(())
    }
}

fn run_check(cli: &Cli, args: &CheckArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let threshold_pct = args.threshold.unwrap_or(config.monitor.threshold_pct);
    let paths = if args.paths.is_empty() {
        config.monitor.paths.clone()
    } else {
        args.paths.clone()
    };

    let sink: Arc<dyn NotificationSink> = if args.notify {
        Arc::new(NotificationManager::from_config(&config.notifications))
    } else {
        Arc::new(PreviewSink)
    };

    let mode = output_mode(cli);
    let mut high = 0usize;
    let mut failed = 0usize;

    for path in &paths {
        let query = usage_query_for(config.monitor.query, path)?;
        let mut checker = DiskUsageChecker::with_threshold(query, Arc::clone(&sink), threshold_pct)?;

        match checker.check_usage() {
            Ok(outcome) => {
                if outcome.is_high() {
                    high += 1;
                }
                match mode {
                    OutputMode::Human => print_check_human(path, &outcome, args.notify),
                    OutputMode::Json => write_json_line(&check_payload(
                        path,
                        threshold_pct,
                        &outcome,
                        args.notify,
                    ))?,
                }
            }
            Err(e) => {
                failed += 1;
                match mode {
                    OutputMode::Human => {
                        eprintln!("diskguard: {}: {e}", path.display());
                    }
                    OutputMode::Json => write_json_line(&json!({
                        "command": "check",
                        "status": "error",
                        "path": path.to_string_lossy(),
                        "error_code": e.code(),
                        "error": e.to_string(),
                    }))?,
                }
            }
        }
    }

    if failed > 0 {
        return Err(CliError::Runtime(format!(
            "{failed} of {} path(s) could not be checked",
            paths.len()
        )));
    }
    if high > 0 {
        return Err(CliError::Runtime(format!(
            "{high} path(s) at or above {}% used",
            format_number(threshold_pct)
        )));
    }
    Ok(())
}

fn print_check_human(path: &std::path::Path, outcome: &CheckOutcome, notified: bool) {
    let usage = outcome.usage();
    let status = if outcome.is_high() {
        "HIGH".red().bold()
    } else {
        "OK".green().bold()
    };
    println!(
        "{status} {}: {}% used ({usage})",
        path.display(),
        format_number(outcome.percent_used())
    );
    if let CheckOutcome::AlertSent { message, .. } = outcome {
        let verb = if notified { "sent" } else { "would send" };
        println!("  {verb}: {message}");
    }
}

fn check_payload(
    path: &std::path::Path,
    threshold_pct: f64,
    outcome: &CheckOutcome,
    notified: bool,
) -> Value {
    let usage = outcome.usage();
    let message = match outcome {
        CheckOutcome::AlertSent { message, .. } => Some(message.as_str()),
        _ => None,
    };
    json!({
        "command": "check",
        "status": if outcome.is_high() { "high" } else { "ok" },
        "outcome": outcome.label(),
        "path": path.to_string_lossy(),
        "total_bytes": usage.total,
        "available_bytes": usage.available,
        "percent_used": outcome.percent_used(),
        "threshold_pct": threshold_pct,
        "message": message,
        "notified": notified && message.is_some(),
    })
}

// ──── usage ────

fn run_usage(cli: &Cli, args: &UsageArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let path = match &args.path {
        Some(path) => path.clone(),
        None => config
            .monitor
            .paths
            .first()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("/")),
    };

    let query = usage_query_for(config.monitor.query, &path)?;
    let usage = query.get_usage()?;
    let percent_used = usage.percent_used()?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("{}", path.display());
            println!(
                "  Total:     {} {DISPLAY_UNIT_LABEL}",
                format_number(to_display_unit(usage.total))
            );
            println!(
                "  Available: {} {DISPLAY_UNIT_LABEL}",
                format_number(to_display_unit(usage.available))
            );
            println!("  Used:      {}%", format_number(percent_used));
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "command": "usage",
                "path": path.to_string_lossy(),
                "query": config.monitor.query.to_string(),
                "total_bytes": usage.total,
                "available_bytes": usage.available,
                "percent_used": percent_used,
            }))?;
        }
    }
    Ok(())
}

// ──── daemon ────

fn run_daemon(cli: &Cli, args: &DaemonArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let hash = config.stable_hash()?;
    eprintln!(
        "[DG-DAEMON] starting: {} path(s), threshold {}%, interval {}s, config {hash}",
        config.monitor.paths.len(),
        format_number(config.monitor.threshold_pct),
        config.monitor.interval_secs
    );

    let mut daemon = MonitorDaemon::from_config(&config, SignalHandler::install())?;
    let stats = daemon.run(args.max_ticks)?;

    eprintln!(
        "[DG-DAEMON] stopped after {} tick(s): {} alert(s), {} failed check(s)",
        stats.ticks, stats.alerts_sent, stats.failures
    );

    if output_mode(cli) == OutputMode::Json {
        write_json_line(&json!({
            "command": "daemon",
            "ticks": stats.ticks,
            "checks": stats.checks,
            "alerts_sent": stats.alerts_sent,
            "failures": stats.failures,
        }))?;
    }
    Ok(())
}

// ──── config ────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let value = serde_json::to_value(&config)?;
                    let payload = json!({
                        "command": "config show",
                        "config": value,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        eprintln!("Configuration is INVALID: {e}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "error_code": e.code(),
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ──── output ────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("DG_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        Some(_) | None => fallback,
    }
}
