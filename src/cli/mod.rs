//! CLI argument parsing for ticketeval
//!
//! Global flags: --root, --config, --format, --quiet, --verbose, --log-level,
//! --log-json

pub mod args;
pub mod output;
pub mod paths;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use args::{AnalyzeArgs, FailuresArgs, Provider, ProviderArgs, RunArgs, ShowArgs};
pub use output::OutputFormat;

/// Ticketeval - batch evaluation of model-generated bug tickets
#[derive(Parser, Debug)]
#[command(name = "ticketeval")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data root holding datasets, prompts, rules and runs
    #[arg(long, global = true, env = "TICKETEVAL_ROOT")]
    pub root: Option<PathBuf>,

    /// Explicit config file (default: <root>/ticketeval.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level or filter directive (e.g. `info`, `ureq=debug`)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level ticketeval commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List dataset versions
    Datasets,

    /// List prompt names
    Prompts,

    /// List available models
    Models,

    /// List stored runs
    Runs,

    /// Evaluate a dataset with a prompt and model
    Run(RunArgs),

    /// Show a run's configuration and metrics
    Show(ShowArgs),

    /// List a run's failures
    Failures(FailuresArgs),

    /// Evaluate a single text or video input
    Analyze(AnalyzeArgs),
}
