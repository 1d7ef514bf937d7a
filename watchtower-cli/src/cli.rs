//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's
//! derive macros. It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Watchtower -- miniature SIEM pipeline.
///
/// Use `watchtower <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "watchtower", version, about, long_about = None)]
pub struct Cli {
    /// Path to the watchtower.toml configuration file.
    #[arg(short, long, default_value = "watchtower.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single pipeline pass and report the alert count.
    Run,

    /// Start continuous monitoring until interrupted (Ctrl-C).
    Watch(WatchArgs),

    /// Query stored alerts, newest first.
    Alerts(AlertsArgs),

    /// Manage detection rules.
    Rules(RulesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- watch ----

/// Start the monitoring loop.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds to wait between passes (1-10, default from config).
    #[arg(short, long)]
    pub interval: Option<u64>,
}

// ---- alerts ----

/// Query stored alerts.
#[derive(Args, Debug)]
pub struct AlertsArgs {
    /// Only show alerts with this severity (case-insensitive).
    #[arg(short, long)]
    pub severity: Option<String>,

    /// Maximum number of alerts to return (default from config).
    #[arg(short, long)]
    pub limit: Option<usize>,
}

// ---- rules ----

/// Manage detection rules.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List the rules in the configured rule directory.
    List,
    /// Load rule files and report validation warnings.
    Validate {
        /// Directory containing YAML rule files (default from config).
        path: Option<PathBuf>,
    },
}

// ---- config ----

/// Manage watchtower configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show,
}
