//! `stratus chain`

use anyhow::Result;

use super::build_provider;
use crate::config::CliConfig;

pub fn execute(config: &CliConfig) -> Result<()> {
    let provider = build_provider(config)?;
    for (index, name) in provider.chain_names().iter().enumerate() {
        println!("{}. {name}", index + 1);
    }
    provider.close();
    Ok(())
}
