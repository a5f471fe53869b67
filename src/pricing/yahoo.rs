use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{PricePoint, PriceSeries};
use crate::error::ItrError;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartSeries>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartSeries {
    #[serde(default, rename = "timestamp")]
    timestamps: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(rename = "quote")]
    quotes: Vec<DailyQuotes>,
}

#[derive(Debug, Deserialize)]
struct DailyQuotes {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

/// Unix seconds spanning the whole of `year`, UTC
fn year_window(year: i32) -> Result<(i64, i64)> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow!("year {} out of range", year))?;
    let last = NaiveDate::from_ymd_opt(year, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .ok_or_else(|| anyhow!("year {} out of range", year))?;
    Ok((first.and_utc().timestamp(), last.and_utc().timestamp()))
}

fn chart_url(ticker: &str, year: i32) -> Result<String> {
    let (period1, period2) = year_window(year)?;
    Ok(format!(
        "{}/{}?period1={}&period2={}&interval=1d",
        CHART_URL, ticker, period1, period2
    ))
}

/// Fetch daily closing prices for `ticker` over calendar year `year`
pub async fn fetch_daily_closes(ticker: &str, year: i32) -> Result<PriceSeries> {
    let url = chart_url(ticker, year)?;
    info!("Fetching {} daily closes for {}", ticker, year);

    let client = Client::builder()
        .user_agent("Mozilla/5.0 (compatible; itr-calc/0.1)")
        .timeout(Duration::from_secs(30))
        .build()?;

    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Price request for {} failed", ticker))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ItrError::PriceSource(format!("chart API answered {} for {}", status, ticker)).into());
    }

    let body = response
        .text()
        .await
        .context("Failed to read chart API response")?;

    parse_chart_response(ticker, &body)
}

/// Turn a chart API body into a price series.
///
/// Days without a close (halts, partial rows) are dropped.
pub fn parse_chart_response(ticker: &str, body: &str) -> Result<PriceSeries> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).context("Chart API response is not valid JSON")?;

    if let Some(ChartError { code, description }) = envelope.chart.error {
        return Err(ItrError::PriceSource(format!("{}: {}", code, description)).into());
    }

    let series = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ItrError::PriceSource(format!("no chart data for {}", ticker)))?;
    let closes = series
        .indicators
        .quotes
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut points = Vec::with_capacity(series.timestamps.len());
    for (timestamp, close) in series.timestamps.iter().zip(closes) {
        let date = chrono::DateTime::from_timestamp(*timestamp, 0)
            .ok_or_else(|| anyhow!("bad timestamp {} in chart data", timestamp))?
            .date_naive();

        match close.and_then(|c| Decimal::try_from(c).ok()) {
            Some(close) => points.push(PricePoint { date, close }),
            None => debug!("No close for {} on {}", ticker, date),
        }
    }

    debug!("Parsed {} daily closes for {}", points.len(), ticker);
    Ok(PriceSeries::new(ticker, points))
}
