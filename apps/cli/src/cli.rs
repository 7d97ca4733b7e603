//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Resolve cloud API credentials through the default provider chain
#[derive(Debug, Parser)]
#[command(name = "stratus", version, about, propagate_version = true)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short = 'c', global = true, env = "STRATUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log filter directive when not verbose
    #[arg(long, global = true, env = "STRATUS_LOG", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve credentials and print them
    Resolve(ResolveArgs),
    /// Print the provider order of the default chain
    Chain,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Shared config profile to read instead of AWS_PROFILE
    #[arg(long, short = 'p')]
    pub profile: Option<String>,

    /// Region used for STS calls
    #[arg(long, short = 'r')]
    pub region: Option<String>,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary without secrets
    Text,
    /// JSON summary without secrets
    Json,
    /// `export` lines for a POSIX shell, including secrets
    Env,
}
