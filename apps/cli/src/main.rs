//! Stratus CLI - resolve cloud credentials from the command line.

mod cli;
mod commands;
mod config;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::config::CliConfig;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut log = stratus_log::Config::from_env();
    log.level = if cli.verbose {
        "debug".to_string()
    } else {
        cli.log_level.clone()
    };
    let _guard = stratus_log::LoggerBuilder::from_config(log).build()?;

    let config = CliConfig::load(cli.config.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Resolve(args) => {
                let config = config.with_overrides(args.profile, args.region);
                config.validate()?;
                commands::resolve::execute(&config, args.format).await
            }
            Commands::Chain => {
                config.validate()?;
                commands::chain::execute(&config)?;
                Ok(ExitCode::SUCCESS)
            }
        }
    })
}
