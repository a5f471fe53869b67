use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use reqwest::Client;
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{RateEntry, RateTable};
use crate::error::ItrError;

/// Public mirror of SBI's daily USD reference rates
pub const SBI_RATES_URL: &str = "https://raw.githubusercontent.com/sahilgupta/sbi-fx-ratekeeper/main/csv_files/SBI_REFERENCE_RATES_USD.csv";

const DATE_COLUMN: &str = "DATE";
const RATE_COLUMN: &str = "TT BUY";

/// Parse the SBI reference-rate CSV.
///
/// Rows whose `DATE` cannot be parsed are skipped. A missing or non-numeric
/// `TT BUY` is stored as zero so the date keeps its slot in the table.
pub fn parse_sbi_csv<R: Read>(reader: R) -> Result<RateTable> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .context("Failed to read rate CSV headers")?
        .clone();

    debug!("Rate CSV headers: {:?}", headers);

    let date_idx = find_column(&headers, DATE_COLUMN)?;
    let rate_idx = find_column(&headers, RATE_COLUMN)?;

    let mut entries = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        let record = result.context("Failed to read rate CSV record")?;
        let line = idx + 2;

        let raw_date = record.get(date_idx).unwrap_or("");
        let date = match parse_rate_date(raw_date) {
            Some(d) => d,
            None => {
                warn!("Skipping rate row {}: invalid date '{}'", line, raw_date);
                continue;
            }
        };

        let rate = record
            .get(rate_idx)
            .and_then(|s| Decimal::from_str(s).ok())
            .unwrap_or(Decimal::ZERO);

        entries.push(RateEntry { date, rate });
    }

    info!("Loaded {} exchange rates", entries.len());
    Ok(RateTable::new(entries))
}

/// Fetch the rate table from a remote CSV
pub async fn fetch_sbi_rates(url: &str) -> Result<RateTable> {
    info!("Fetching SBI rates from {}", url);

    let client = Client::builder()
        .user_agent("Mozilla/5.0 (compatible; itr-calc/0.1)")
        .timeout(Duration::from_secs(30))
        .build()?;

    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to send request for SBI rates")?;

    if !response.status().is_success() {
        return Err(ItrError::RateSource(format!(
            "rate source returned error status: {}",
            response.status()
        ))
        .into());
    }

    let body = response
        .text()
        .await
        .context("Failed to read SBI rates response")?;

    parse_sbi_csv(body.as_bytes())
}

/// Load the rate table from a local CSV file in the SBI layout
pub fn load_rates_file<P: AsRef<Path>>(path: P) -> Result<RateTable> {
    let path = path.as_ref();
    info!("Loading SBI rates from {:?}", path);

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open rates file {:?}", path))?;
    parse_sbi_csv(file)
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!(ItrError::RateSource(format!("rate CSV has no '{}' column", name))))
}

/// Rate dates come as `YYYY-MM-DD HH:MM`; the time of day is dropped.
fn parse_rate_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    for fmt in ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}
