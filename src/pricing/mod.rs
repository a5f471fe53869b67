// Pricing module - daily closing prices for the peak-value replay

pub mod yahoo;

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::normalize::{parse_date, RawCell};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Decimal,
}

/// Daily closes for one ticker, sorted by date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: &str, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self {
            ticker: ticker.to_string(),
            points,
        }
    }

    /// Points falling inside calendar year `year`
    pub fn in_year(&self, year: i32) -> impl Iterator<Item = &PricePoint> {
        self.points.iter().filter(move |p| p.date.year() == year)
    }

    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.points.iter().map(|p| p.date.year()).collect();
        years.dedup();
        years
    }
}

/// Price series available to the batch, keyed by calendar year
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    by_year: BTreeMap<i32, PriceSeries>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, year: i32, series: PriceSeries) {
        self.by_year.insert(year, series);
    }

    /// Split one multi-year series into per-year entries
    pub fn from_series(series: &PriceSeries) -> Self {
        let mut history = Self::new();
        for year in series.years() {
            let points = series.in_year(year).copied().collect();
            history.insert(year, PriceSeries::new(&series.ticker, points));
        }
        history
    }

    pub fn for_year(&self, year: i32) -> Option<&PriceSeries> {
        self.by_year.get(&year).filter(|s| !s.points.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.by_year.is_empty()
    }
}

/// Load daily closes from a local CSV with `Date` and `Close` columns
pub fn load_prices_file<P: AsRef<Path>>(path: P, ticker: &str) -> Result<PriceSeries> {
    let path = path.as_ref();
    info!("Loading {} prices from {:?}", ticker, path);

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open prices file {:?}", path))?;

    let headers = reader
        .headers()
        .context("Failed to read prices CSV headers")?
        .clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!("prices CSV has no '{}' column", name))
    };
    let date_idx = column("Date")?;
    let close_idx = column("Close")?;

    let mut points = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        let record = result.context("Failed to read prices CSV record")?;
        let line = idx + 2;

        let date_text = record.get(date_idx).unwrap_or("");
        // Exports often carry a time and offset after the date
        let date_part = date_text.get(..10).unwrap_or(date_text);
        let date = match parse_date(&RawCell::Text(date_part.to_string())) {
            Ok(d) => d,
            Err(e) => {
                warn!("Skipping price row {}: {}", line, e);
                continue;
            }
        };

        match record.get(close_idx).map(Decimal::from_str) {
            Some(Ok(close)) => points.push(PricePoint { date, close }),
            _ => warn!("Skipping price row {}: invalid close", line),
        }
    }

    info!("Loaded {} daily prices for {}", points.len(), ticker);
    Ok(PriceSeries::new(ticker, points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_series_is_sorted_and_split_by_year() {
        let series = PriceSeries::new(
            "MU",
            vec![
                PricePoint { date: date(2024, 1, 2), close: dec!(85) },
                PricePoint { date: date(2023, 12, 29), close: dec!(84) },
                PricePoint { date: date(2023, 1, 3), close: dec!(51) },
            ],
        );

        assert_eq!(series.points[0].date, date(2023, 1, 3));
        assert_eq!(series.years(), vec![2023, 2024]);
        assert_eq!(series.in_year(2023).count(), 2);

        let history = PriceHistory::from_series(&series);
        assert_eq!(history.for_year(2024).unwrap().points.len(), 1);
        assert!(history.for_year(2022).is_none());
    }

    #[test]
    fn test_load_prices_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,Open,High,Low,Close,Volume").unwrap();
        writeln!(file, "2023-01-03 00:00:00-05:00,50.1,52,49.9,51.25,100").unwrap();
        writeln!(file, "garbage,1,1,1,1,1").unwrap();
        writeln!(file, "2023-01-04,51,53,50,52.75,100").unwrap();

        let series = load_prices_file(file.path(), "MU").unwrap();
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].close, dec!(51.25));
        assert_eq!(series.points[1].date, date(2023, 1, 4));
    }
}
