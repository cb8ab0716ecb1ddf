// datawash/src/cli.rs
//! This file defines the command-line interface (CLI) for the datawash application,
//! including all available commands and their arguments.
//! License: MIT OR APACHE 2.0

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use datawash_core::QueueArguments;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "datawash",
    author = "Relay",
    version = env!("CARGO_PKG_VERSION"),
    about = "Clean raw text records with an ordered rule set",
    long_about = "datawash strips markup, links, emoji and control characters from raw text records using an ordered, configurable list of pattern rules, then enforces length bounds. It can clean a single record from a file or stdin, validate a configuration, or serve records over an in-process queue.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG for datawash crates to DEBUG)
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `datawash` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cleans one record read from a file or stdin and prints it as JSON.
    #[command(about = "Cleans one record read from a file or stdin and prints the result as JSON.")]
    Clean(CleanCommand),

    /// Validates the effective cleaning configuration.
    #[command(about = "Validates the effective cleaning configuration and prints a JSON report.")]
    Validate(ValidateCommand),

    /// Runs the queue consumer, fed by newline-delimited JSON on stdin.
    #[command(about = "Runs the queue consumer and publishes newline-delimited JSON commands read from stdin.")]
    Serve(ServeCommand),
}

/// Config file and command-line overrides shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to a cleaning configuration file (YAML).
    #[arg(long = "config", value_name = "FILE", help = "Path to a cleaning configuration file (YAML).")]
    pub config: Option<PathBuf>,

    /// Overrides `options.minLength`.
    #[arg(long = "min-length", value_name = "N", allow_negative_numbers = true, help = "Override the minimum cleaned length.")]
    pub min_length: Option<i64>,

    /// Overrides `options.maxLength`.
    #[arg(long = "max-length", value_name = "N", allow_negative_numbers = true, help = "Override the maximum cleaned length.")]
    pub max_length: Option<i64>,
}

/// Arguments for the `clean` command.
#[derive(Parser, Debug)]
pub struct CleanCommand {
    /// Path to an input file (reads from stdin if not provided).
    #[arg(long, short = 'i', value_name = "FILE", help = "Read input from a specified file instead of stdin.")]
    pub input_file: Option<PathBuf>,

    /// Record id; a random UUID is used when omitted.
    #[arg(long, value_name = "ID", help = "Record id (defaults to a random UUID).")]
    pub id: Option<String>,

    /// Record source label.
    #[arg(long, value_name = "SRC", default_value = "cli", help = "Source label stored on the record.")]
    pub source: String,

    /// Pretty-print the JSON output.
    #[arg(long, help = "Pretty-print the JSON output.")]
    pub pretty: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the `validate` command.
#[derive(Parser, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub queue: QueueOptions,
}

/// Broker and consumer settings.
#[derive(Args, Debug, Clone)]
pub struct QueueOptions {
    /// Maximum number of messages processed concurrently.
    #[arg(long, env = "DATAWASH_PREFETCH", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..), help = "Maximum number of messages in flight.")]
    pub prefetch: u64,

    /// Requeues allowed before a failing event is dead-lettered.
    #[arg(long = "max-retries", env = "DATAWASH_MAX_RETRIES", default_value_t = 3, help = "Requeues allowed before a failing event is dead-lettered.")]
    pub max_retries: u32,

    /// Event time-to-live in seconds; 0 disables expiry.
    #[arg(long = "message-ttl-secs", env = "DATAWASH_MESSAGE_TTL_SECS", default_value_t = 86_400, help = "Event time-to-live in seconds (0 disables expiry).")]
    pub message_ttl_secs: u64,

    /// Request/reply timeout in milliseconds.
    #[arg(long = "rpc-timeout-ms", env = "DATAWASH_RPC_TIMEOUT_MS", default_value_t = 5_000, help = "Request/reply timeout in milliseconds.")]
    pub rpc_timeout_ms: u64,

    /// Declare the queues as non-durable.
    #[arg(long = "transient", help = "Declare the queues as non-durable.")]
    pub transient: bool,
}

impl QueueOptions {
    pub fn to_arguments(&self) -> QueueArguments {
        QueueArguments {
            durable: !self.transient,
            prefetch: self.prefetch as usize,
            message_ttl: (self.message_ttl_secs > 0).then(|| Duration::from_secs(self.message_ttl_secs)),
            max_retries: self.max_retries,
            reply_timeout: Duration::from_millis(self.rpc_timeout_ms),
        }
    }
}
