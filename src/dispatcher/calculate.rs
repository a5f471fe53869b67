use anyhow::{Context, Result};
use tracing::{info, warn};

use itr_calc::calculator::{compute, NormalizedBatch};
use itr_calc::config::Config;
use itr_calc::diagnostics::{DiagnosticKind, Diagnostics};
use itr_calc::importers::{check_workbook_path, read_workbook};
use itr_calc::pricing::yahoo::fetch_daily_closes;
use itr_calc::pricing::{load_prices_file, PriceHistory};
use itr_calc::reports::{build_tables, render_json, write_xlsx};

use super::load_rates;
use crate::cli::formatters::{format_report_summary, format_written};

/// Daily closes for every year whose share peak needs them.
///
/// A local prices file is authoritative. Otherwise each year is fetched,
/// and a failed or disabled fetch becomes a diagnostic.
async fn load_prices(config: &Config, years: &[i32], diags: &mut Diagnostics) -> Result<PriceHistory> {
    if let Some(path) = &config.prices.file {
        let series = load_prices_file(path, &config.ticker)?;
        return Ok(PriceHistory::from_series(&series));
    }

    let mut history = PriceHistory::new();
    for &year in years {
        if config.prices.offline {
            diags.push(
                DiagnosticKind::PriceSeriesUnavailable,
                format!("{} prices for {} not fetched in offline mode", config.ticker, year),
            );
            continue;
        }

        match fetch_daily_closes(&config.ticker, year).await {
            Ok(series) => history.insert(year, series),
            Err(e) => {
                warn!("Price fetch failed: {:#}", e);
                diags.push(
                    DiagnosticKind::PriceSeriesUnavailable,
                    format!("{} prices for {} unavailable: {}", config.ticker, year, e),
                );
            }
        }
    }
    Ok(history)
}

pub async fn dispatch_calculate(config: &Config, no_write: bool, json_output: bool) -> Result<()> {
    info!("Calculating ITR values from {:?}", config.input);
    check_workbook_path(&config.input)?;

    let mut diags = Diagnostics::new();
    let source = read_workbook(&config.input, &config.sheets, &mut diags)?;
    let batch = NormalizedBatch::from_source(&source, &config.sheets, &mut diags);

    let rates = load_rates(config).await?;
    let prices = load_prices(config, &batch.peak_years(), &mut diags).await?;

    let report = compute(&batch, &rates, &prices, diags);
    let tables = build_tables(&report);

    if !no_write {
        write_xlsx(&tables, &config.output)
            .with_context(|| format!("Failed to write report {:?}", config.output))?;
    }

    if json_output {
        let json = serde_json::to_string_pretty(&render_json(&tables))?;
        println!("{}", json);
    } else {
        print!("{}", format_report_summary(&report));
        if !no_write {
            print!("{}", format_written(&config.output, tables.len()));
        }
    }

    Ok(())
}
