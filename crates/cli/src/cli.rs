//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dispatchq - delayed dispatch queue for peer-to-peer control messages
#[derive(Parser, Debug)]
#[command(
    name = "dispatchq",
    author,
    version,
    about = "Delayed dispatch queue for peer-to-peer control messages",
    long_about = "Holds outbound control messages for at least a configured delay before \n\
                  handing them to their peer session, draining the queue on a fixed cadence.\n\n\
                  The `run` command drives a simulated workload through the queue and \n\
                  reports the observed dispatch latency."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DISPATCHQ_VERBOSE")]
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
        env = "DISPATCHQ_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulated workload through the dispatch queue
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults if omitted
    #[arg(short, long, env = "DISPATCHQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the delay threshold in milliseconds
    #[arg(long, env = "DISPATCHQ_THRESHOLD_MS")]
    pub threshold_ms: Option<u64>,

    /// Override the drain tick interval in milliseconds
    #[arg(long, env = "DISPATCHQ_TICK_MS")]
    pub tick_ms: Option<u64>,

    /// Override the shutdown policy
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Total number of messages to enqueue
    #[arg(short = 'n', long, default_value = "100", env = "DISPATCHQ_MESSAGES")]
    pub messages: u64,

    /// Number of concurrent producers
    #[arg(short, long, default_value = "4", env = "DISPATCHQ_PRODUCERS")]
    pub producers: usize,

    /// Pause between two enqueues of one producer, in milliseconds
    #[arg(long, default_value = "10")]
    pub interval_ms: u64,

    /// Payload size in bytes
    #[arg(long, default_value = "64")]
    pub payload_size: usize,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "DISPATCHQ_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "DISPATCHQ_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "dispatchq.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "dispatchq.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed session information
    #[arg(long)]
    pub sessions: bool,
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

/// Shutdown policy selectable from the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    /// Keep draining at the normal cadence until the queue is empty
    Drain,
    /// Stop at once and hand back what is left, counted as discarded
    Discard,
    /// Stop at once and report what is left
    Retain,
}

impl From<PolicyArg> for contracts::ShutdownPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Drain => contracts::ShutdownPolicy::Drain,
            PolicyArg::Discard => contracts::ShutdownPolicy::Discard,
            PolicyArg::Retain => contracts::ShutdownPolicy::Retain,
        }
    }
}
