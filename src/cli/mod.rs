use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser)]
#[command(name = "itr-calc")]
#[command(
    version,
    about = "Indian ITR calculator for foreign ESPP/RSU holdings"
)]
#[command(
    long_about = "Convert ESPP/RSU dividends, purchases, vests and sales to INR at SBI TT buying rates, match sales to lots FIFO for LTCG/STCG, and compute Schedule FA opening, closing and peak values."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Config file (defaults to <config dir>/itr-calc/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full calculation and write the report workbook
    Calculate {
        /// Input workbook
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output workbook
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ticker used for daily closing prices
        #[arg(short, long)]
        ticker: Option<String>,

        /// Local SBI reference rate CSV instead of downloading it
        #[arg(long)]
        rates_file: Option<PathBuf>,

        /// Local Date,Close CSV of daily closing prices
        #[arg(long)]
        prices_file: Option<PathBuf>,

        /// Never fetch prices over the network
        #[arg(long)]
        offline: bool,

        /// Compute and print only, don't write the output workbook
        #[arg(long)]
        no_write: bool,
    },

    /// Show the SBI TT buy rate used for a transaction date
    Rate {
        /// Transaction date (YYYY-MM-DD, DD/MM/YYYY, ...)
        date: String,

        /// Local SBI reference rate CSV instead of downloading it
        #[arg(long)]
        rates_file: Option<PathBuf>,
    },

    /// List the sheets of a workbook and their header rows
    Inspect {
        /// Path to the workbook
        file: PathBuf,
    },
}

/// Flags of `calculate` that override the loaded config
#[derive(Debug, Clone, Default)]
pub struct CalculateOverrides {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub ticker: Option<String>,
    pub rates_file: Option<PathBuf>,
    pub prices_file: Option<PathBuf>,
    pub offline: bool,
    pub no_write: bool,
}

impl CalculateOverrides {
    pub fn apply(&self, config: &mut itr_calc::config::Config) {
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(ticker) = &self.ticker {
            config.ticker = ticker.clone();
        }
        if let Some(file) = &self.rates_file {
            config.rates.file = Some(file.clone());
        }
        if let Some(file) = &self.prices_file {
            config.prices.file = Some(file.clone());
        }
        if self.offline {
            config.prices.offline = true;
        }
    }
}
