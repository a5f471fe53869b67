//! Command dispatcher that routes parsed CLI commands to their handlers.

mod calculate;
mod inspect;
mod rate;

use anyhow::{Context, Result};
use std::path::Path;

use itr_calc::config::Config;
use itr_calc::rates::{fetch_sbi_rates, load_rates_file, RateTable};

use crate::cli::{CalculateOverrides, Commands};

/// Route a parsed command to its handler
pub async fn dispatch_command(
    command: Commands,
    config_path: Option<&Path>,
    json_output: bool,
) -> Result<()> {
    let mut config = Config::load(config_path)?;

    match command {
        Commands::Calculate {
            input,
            output,
            ticker,
            rates_file,
            prices_file,
            offline,
            no_write,
        } => {
            let overrides = CalculateOverrides {
                input,
                output,
                ticker,
                rates_file,
                prices_file,
                offline,
                no_write,
            };
            overrides.apply(&mut config);
            calculate::dispatch_calculate(&config, overrides.no_write, json_output).await
        }
        Commands::Rate { date, rates_file } => {
            if let Some(file) = rates_file {
                config.rates.file = Some(file);
            }
            rate::dispatch_rate(&date, &config, json_output).await
        }
        Commands::Inspect { file } => inspect::dispatch_inspect(&file, json_output).await,
    }
}

/// The rate table from the configured file, else from the configured URL.
/// Without rates nothing can be valued, so failure here is fatal.
async fn load_rates(config: &Config) -> Result<RateTable> {
    let table = match &config.rates.file {
        Some(path) => load_rates_file(path)?,
        None => fetch_sbi_rates(&config.rates.url)
            .await
            .context("Failed to download SBI reference rates")?,
    };

    if table.is_empty() {
        anyhow::bail!("SBI rate table contains no usable rates");
    }
    Ok(table)
}
