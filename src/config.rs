//! Configuration loaded from config.toml
//!
//! Every field has a default matching the standard workbook layout, so the
//! file is optional. Lookup order: `--config <path>`, then
//! `<config_home>/itr-calc/config.toml`, then built-in defaults. CLI flags
//! override whatever is loaded here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::rates::SBI_RATES_URL;

pub const DEFAULT_INPUT: &str = "ITR_Foreign_Assets.xlsx";
pub const DEFAULT_OUTPUT: &str = "ITR_Calculated_Values.xlsx";
pub const DEFAULT_TICKER: &str = "MU";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Ticker whose daily closes drive the share peak values
    pub ticker: String,
    pub rates: RatesConfig,
    pub prices: PricesConfig,
    pub sheets: SheetsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            ticker: DEFAULT_TICKER.to_string(),
            rates: RatesConfig::default(),
            prices: PricesConfig::default(),
            sheets: SheetsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    pub url: String,
    /// Local copy of the SBI CSV; takes precedence over `url`
    pub file: Option<PathBuf>,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            url: SBI_RATES_URL.to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PricesConfig {
    /// Local `Date,Close` CSV used instead of fetching
    pub file: Option<PathBuf>,
    pub offline: bool,
}

/// A column located by header text (case-insensitive) or zero-based position
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl ColumnRef {
    pub fn name(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }

    /// Position of this column in `headers`
    pub fn resolve(&self, headers: &[String]) -> Option<usize> {
        match self {
            ColumnRef::Index(idx) => (*idx < headers.len()).then_some(*idx),
            ColumnRef::Name(name) => {
                let wanted = name.trim();
                headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(wanted))
            }
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnRef::Index(idx) => write!(f, "#{}", idx),
            ColumnRef::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DividendSheet {
    pub name: String,
    pub date: ColumnRef,
    pub amount: ColumnRef,
    /// Withholding column; dividends read as untaxed when it is absent
    pub tax: Option<ColumnRef>,
}

impl Default for DividendSheet {
    fn default() -> Self {
        Self {
            name: "Dividend_FY".to_string(),
            date: ColumnRef::name("Date"),
            amount: ColumnRef::name("Value"),
            tax: Some(ColumnRef::name("Tax")),
        }
    }
}

/// Buy, vest or sale sheet
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TradeSheet {
    pub name: String,
    pub date: ColumnRef,
    pub price: ColumnRef,
    pub shares: ColumnRef,
}

impl TradeSheet {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Default for TradeSheet {
    fn default() -> Self {
        Self {
            name: String::new(),
            date: ColumnRef::name("Transaction date"),
            price: ColumnRef::name("Purchase/Sale FMV (in $)"),
            shares: ColumnRef::name("No. of Shares"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AssetSheet {
    pub name: String,
    pub date: ColumnRef,
    pub kind: ColumnRef,
    pub shares: ColumnRef,
    pub cash: ColumnRef,
    pub market_value: ColumnRef,
}

impl AssetSheet {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Default for AssetSheet {
    fn default() -> Self {
        Self {
            name: String::new(),
            date: ColumnRef::name("Date"),
            kind: ColumnRef::name("Cash/Share"),
            shares: ColumnRef::name("No. of Shares"),
            cash: ColumnRef::name("Cash (in $)"),
            market_value: ColumnRef::name("Market Value (in $)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CashSheet {
    pub name: String,
    pub date: ColumnRef,
    pub kind: ColumnRef,
    pub espp: ColumnRef,
    pub rsu: ColumnRef,
}

impl Default for CashSheet {
    fn default() -> Self {
        Self {
            name: "Cash".to_string(),
            date: ColumnRef::Index(0),
            kind: ColumnRef::Index(1),
            espp: ColumnRef::Index(2),
            rsu: ColumnRef::Index(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub dividend: DividendSheet,
    pub espp_buy: TradeSheet,
    pub espp_sale: TradeSheet,
    pub rsu_vest: TradeSheet,
    pub rsu_sale: TradeSheet,
    pub espp_assets: AssetSheet,
    pub rsu_assets: AssetSheet,
    pub cash: CashSheet,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            dividend: DividendSheet::default(),
            espp_buy: TradeSheet::named("ESPP-Buy"),
            espp_sale: TradeSheet::named("ESPP-Sale"),
            rsu_vest: TradeSheet::named("RSU-Vest"),
            rsu_sale: TradeSheet::named("RSU-Sale"),
            espp_assets: AssetSheet::named("ESPP-Assets"),
            rsu_assets: AssetSheet::named("RSU-Assets"),
            cash: CashSheet::default(),
        }
    }
}

impl SheetsConfig {
    /// Partially specified trade/asset tables deserialize with an empty name
    fn fill_default_names(&mut self) {
        let defaults = Self::default();
        for (sheet, default) in [
            (&mut self.espp_buy, defaults.espp_buy),
            (&mut self.espp_sale, defaults.espp_sale),
            (&mut self.rsu_vest, defaults.rsu_vest),
            (&mut self.rsu_sale, defaults.rsu_sale),
        ] {
            if sheet.name.is_empty() {
                sheet.name = default.name;
            }
        }
        for (sheet, default) in [
            (&mut self.espp_assets, defaults.espp_assets),
            (&mut self.rsu_assets, defaults.rsu_assets),
        ] {
            if sheet.name.is_empty() {
                sheet.name = default.name;
            }
        }
    }
}

/// Default location of the config file, if a config directory exists
pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("itr-calc").join("config.toml"))
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content).context("Failed to parse config TOML")?;
        config.sheets.fill_default_names();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {:?}", path))
    }

    /// Load the explicit config, else the default file when present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading config from {:?}", path);
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading config from {:?}", path);
                Self::from_file(&path)
            }
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}
