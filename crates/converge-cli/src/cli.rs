use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "converge")]
#[command(about = "Reconcile declared infrastructure against a provider")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true, env = "CONVERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Sandbox state file (overrides the config)
    #[arg(long, global = true, env = "CONVERGE_STATE")]
    pub state: Option<PathBuf>,

    /// Log line format on stderr
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Report format on stdout
    #[arg(short, long, global = true, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show what apply would change, without changing anything
    Plan(ManifestArgs),
    /// Reconcile every manifest entry
    Apply(ApplyArgs),
    /// Delete every manifest entry, last entry first
    Destroy(DestroyArgs),
    /// List resources currently held by the sandbox
    Status,
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(Debug, clap::Args)]
pub struct ManifestArgs {
    /// Manifest JSON file
    pub manifest: PathBuf,
}

#[derive(Debug, clap::Args)]
pub struct ApplyArgs {
    /// Manifest JSON file
    pub manifest: PathBuf,

    /// Reconcile up to N entries at once (entries must be independent)
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Keep going after a failed entry instead of skipping the rest
    #[arg(long)]
    pub keep_going: bool,

    /// Seconds between status polls
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Status polls before giving up on a resource
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Retries for transient provider failures
    #[arg(long)]
    pub retries: Option<u32>,
}

#[derive(Debug, clap::Args)]
pub struct DestroyArgs {
    /// Manifest JSON file
    pub manifest: PathBuf,

    /// Required; destroy refuses to run without it
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a default config file if none exists
    Init,
}
