//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// biosync - wearable signal derivation and snapshot streaming
#[derive(Parser, Debug)]
#[command(
    name = "biosync",
    author,
    version,
    about = "Wearable biosensor signal engine",
    long_about = "Subscribes to a tracking service, derives BVP, SpO2 and respiration \n\
                  rate from the raw channels, and streams merged snapshots to the \n\
                  configured sinks at a fixed cadence."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BIOSYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BIOSYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a session and stream snapshots to the configured sinks
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display defaults, channels and sink types
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "session.toml",
        env = "BIOSYNC_CONFIG"
    )]
    pub config: PathBuf,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(long, default_value = "0", env = "BIOSYNC_DURATION")]
    pub duration: u64,

    /// Stop after this many snapshots (0 = unlimited)
    #[arg(long, default_value = "0", env = "BIOSYNC_MAX_SNAPSHOTS")]
    pub max_snapshots: u64,

    /// Override the simulation seed from configuration
    #[arg(long, env = "BIOSYNC_SEED")]
    pub seed: Option<u64>,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Capacity of the decoded-sample queue between ingestion and the engine
    #[arg(long, default_value = "1024", env = "BIOSYNC_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "BIOSYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Configuration file to describe (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
