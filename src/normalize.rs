//! Raw workbook rows to typed transaction records.
//!
//! The importer resolves columns; this module only parses cell values. A row
//! with an unusable date or a non-numeric amount is dropped with a diagnostic
//! and the rest of the sheet continues.

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::models::{AssetEvent, AssetEventKind, CashEvent, CashEventKind, Dividend, EquityTrade};

/// Cell value as read from a spreadsheet, before interpretation
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl RawCell {
    pub fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn text(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Number(n) => n.to_string(),
            RawCell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawDividendRow {
    pub line: usize,
    pub date: RawCell,
    pub amount: RawCell,
    pub tax: RawCell,
}

#[derive(Debug, Clone)]
pub struct RawTradeRow {
    pub line: usize,
    pub date: RawCell,
    pub price_per_share: RawCell,
    pub shares: RawCell,
}

#[derive(Debug, Clone)]
pub struct RawAssetRow {
    pub line: usize,
    pub date: RawCell,
    pub kind: RawCell,
    pub shares: RawCell,
    pub cash: RawCell,
    pub market_value: RawCell,
}

#[derive(Debug, Clone)]
pub struct RawCashRow {
    pub line: usize,
    pub date: RawCell,
    pub kind: RawCell,
    pub espp: RawCell,
    pub rsu: RawCell,
}

/// Last calendar day of the month before `date`'s month.
///
/// Any May date gives April 30; any January date gives December 31 of the
/// previous year.
pub fn last_day_of_preceding_month(date: NaiveDate) -> NaiveDate {
    let first_of_month = date.with_day(1).unwrap_or(date);
    first_of_month.pred_opt().unwrap_or(first_of_month)
}

pub fn normalize_dividends(
    sheet: &str,
    rows: &[RawDividendRow],
    diags: &mut Diagnostics,
) -> Vec<Dividend> {
    collect_rows(sheet, rows, diags, |r| r.line, |row| {
        Ok(Dividend {
            date: parse_date(&row.date)?,
            amount_usd: parse_amount(&row.amount)?,
            tax_usd: parse_amount(&row.tax)?,
        })
    })
}

pub fn normalize_trades(
    sheet: &str,
    rows: &[RawTradeRow],
    diags: &mut Diagnostics,
) -> Vec<EquityTrade> {
    collect_rows(sheet, rows, diags, |r| r.line, |row| {
        Ok(EquityTrade {
            date: parse_date(&row.date)?,
            price_per_share_usd: parse_amount(&row.price_per_share)?,
            shares: parse_amount(&row.shares)?,
        })
    })
}

pub fn normalize_asset_events(
    sheet: &str,
    rows: &[RawAssetRow],
    diags: &mut Diagnostics,
) -> Vec<AssetEvent> {
    collect_rows(sheet, rows, diags, |r| r.line, |row| {
        Ok(AssetEvent {
            date: parse_date(&row.date)?,
            kind: AssetEventKind::from_label(&row.kind.text()),
            shares: parse_amount(&row.shares)?,
            cash_usd: parse_amount(&row.cash)?,
            market_value_usd: parse_amount(&row.market_value)?,
        })
    })
}

pub fn normalize_cash_events(
    sheet: &str,
    rows: &[RawCashRow],
    diags: &mut Diagnostics,
) -> Vec<CashEvent> {
    collect_rows(sheet, rows, diags, |r| r.line, |row| {
        Ok(CashEvent {
            date: parse_date(&row.date)?,
            kind: CashEventKind::from_label(&row.kind.text()),
            espp_usd: parse_amount(&row.espp)?,
            rsu_usd: parse_amount(&row.rsu)?,
        })
    })
}

fn collect_rows<R, T>(
    sheet: &str,
    rows: &[R],
    diags: &mut Diagnostics,
    line_of: impl Fn(&R) -> usize,
    parse: impl Fn(&R) -> Result<T>,
) -> Vec<T> {
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        match parse(row) {
            Ok(record) => records.push(record),
            Err(e) => diags.push(
                DiagnosticKind::RowSkipped,
                format!("{} row {}: {}", sheet, line_of(row), e),
            ),
        }
    }

    debug!("{}: normalized {} of {} rows", sheet, records.len(), rows.len());
    records
}

/// Parse a date cell. Text dates are read day-first.
pub fn parse_date(cell: &RawCell) -> Result<NaiveDate> {
    match cell {
        RawCell::Date(d) => Ok(*d),
        RawCell::Number(serial) => excel_serial_to_date(*serial),
        RawCell::Text(s) => parse_date_text(s.trim()),
        RawCell::Empty => Err(anyhow!("missing date")),
    }
}

fn parse_date_text(text: &str) -> Result<NaiveDate> {
    if text.is_empty() {
        return Err(anyhow!("missing date"));
    }

    for fmt in ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d-%b-%Y", "%d %b %Y", "%b %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Ok(date);
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt.date());
        }
    }

    Err(anyhow!("invalid date '{}'", text))
}

/// Excel serial day numbers count from 1899-12-30
pub fn excel_serial_to_date(serial: f64) -> Result<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return Err(anyhow!("invalid date serial {}", serial));
    }

    let excel_epoch =
        NaiveDate::from_ymd_opt(1899, 12, 30).ok_or_else(|| anyhow!("Invalid Excel epoch"))?;
    chrono::Duration::try_days(serial.floor() as i64)
        .and_then(|offset| excel_epoch.checked_add_signed(offset))
        .ok_or_else(|| anyhow!("date serial {} out of range", serial))
}

/// Parse a numeric cell. Empty cells count as zero.
pub fn parse_amount(cell: &RawCell) -> Result<Decimal> {
    match cell {
        RawCell::Empty => Ok(Decimal::ZERO),
        RawCell::Number(n) => {
            Decimal::try_from(*n).map_err(|_| anyhow!("invalid number {}", n))
        }
        RawCell::Text(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();

            if cleaned.is_empty() {
                return Ok(Decimal::ZERO);
            }

            Decimal::from_str(&cleaned)
                .or_else(|_| Decimal::from_scientific(&cleaned))
                .map_err(|_| anyhow!("invalid number '{}'", s.trim()))
        }
        RawCell::Date(d) => Err(anyhow!("expected a number, found date {}", d)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    #[test]
    fn test_last_day_of_preceding_month() {
        assert_eq!(last_day_of_preceding_month(date(2023, 5, 15)), date(2023, 4, 30));
        assert_eq!(last_day_of_preceding_month(date(2025, 1, 15)), date(2024, 12, 31));
        assert_eq!(last_day_of_preceding_month(date(2024, 3, 1)), date(2024, 2, 29));
        assert_eq!(last_day_of_preceding_month(date(2023, 3, 31)), date(2023, 2, 28));
    }

    #[test]
    fn test_preceding_month_end_is_before_month_start_for_every_day() {
        let mut day = date(2023, 1, 1);
        while day <= date(2024, 12, 31) {
            let result = last_day_of_preceding_month(day);
            let month_start = day.with_day(1).unwrap();

            assert!(result < month_start);
            assert_eq!(result.succ_opt().unwrap(), month_start);
            if day.month() == 1 {
                assert_eq!((result.year(), result.month()), (day.year() - 1, 12));
            } else {
                assert_eq!((result.year(), result.month()), (day.year(), day.month() - 1));
            }
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_parse_date_variants() {
        assert_eq!(parse_date(&text("15/03/2023")).unwrap(), date(2023, 3, 15));
        assert_eq!(parse_date(&text("15-03-2023")).unwrap(), date(2023, 3, 15));
        assert_eq!(parse_date(&text("2023-03-15")).unwrap(), date(2023, 3, 15));
        assert_eq!(parse_date(&text("15-Mar-2023")).unwrap(), date(2023, 3, 15));
        assert_eq!(parse_date(&text("Mar 15, 2023")).unwrap(), date(2023, 3, 15));
        assert_eq!(
            parse_date(&text("2023-03-15 00:00:00")).unwrap(),
            date(2023, 3, 15)
        );
        assert_eq!(parse_date(&RawCell::Number(45000.0)).unwrap(), date(2023, 3, 15));
        assert!(parse_date(&text("sometime")).is_err());
        assert!(parse_date(&RawCell::Empty).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&RawCell::Number(12.5)).unwrap(), dec!(12.5));
        assert_eq!(parse_amount(&text("$1,234.56")).unwrap(), dec!(1234.56));
        assert_eq!(parse_amount(&RawCell::Empty).unwrap(), Decimal::ZERO);
        assert_eq!(parse_amount(&text("  ")).unwrap(), Decimal::ZERO);
        assert!(parse_amount(&text("n/a")).is_err());
    }

    #[test]
    fn test_bad_rows_are_skipped_not_fatal() {
        let rows = vec![
            RawTradeRow {
                line: 2,
                date: text("10/01/2022"),
                price_per_share: RawCell::Number(60.0),
                shares: RawCell::Number(10.0),
            },
            RawTradeRow {
                line: 3,
                date: text("not a date"),
                price_per_share: RawCell::Number(61.0),
                shares: RawCell::Number(5.0),
            },
            RawTradeRow {
                line: 4,
                date: text("10/02/2022"),
                price_per_share: text("sixty"),
                shares: RawCell::Number(5.0),
            },
            RawTradeRow {
                line: 5,
                date: RawCell::Date(date(2022, 3, 10)),
                price_per_share: text("62.5"),
                shares: RawCell::Empty,
            },
        ];

        let mut diags = Diagnostics::new();
        let trades = normalize_trades("ESPP-Buy", &rows, &mut diags);

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].date, date(2022, 1, 10));
        assert_eq!(trades[1].price_per_share_usd, dec!(62.5));
        assert_eq!(trades[1].shares, Decimal::ZERO);
        assert_eq!(diags.count(DiagnosticKind::RowSkipped), 2);
        assert!(diags.entries()[0].message.contains("ESPP-Buy row 3"));
    }

    #[test]
    fn test_out_of_range_date_serial_skips_row() {
        assert!(excel_serial_to_date(1e15).is_err());
        assert!(excel_serial_to_date(1e9).is_err());

        let rows = vec![
            RawTradeRow {
                line: 2,
                date: RawCell::Number(1e15),
                price_per_share: RawCell::Number(60.0),
                shares: RawCell::Number(10.0),
            },
            RawTradeRow {
                line: 3,
                date: RawCell::Number(45000.0),
                price_per_share: RawCell::Number(61.0),
                shares: RawCell::Number(5.0),
            },
        ];

        let mut diags = Diagnostics::new();
        let trades = normalize_trades("RSU-Vest", &rows, &mut diags);

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].date, date(2023, 3, 15));
        assert_eq!(diags.count(DiagnosticKind::RowSkipped), 1);
        assert!(diags.entries()[0].message.contains("RSU-Vest row 2"));
    }

    #[test]
    fn test_asset_and_cash_rows() {
        let mut diags = Diagnostics::new();
        let assets = normalize_asset_events(
            "ESPP-Assets",
            &[RawAssetRow {
                line: 2,
                date: text("01/01/2023"),
                kind: text("Opening"),
                shares: RawCell::Number(40.0),
                cash: RawCell::Empty,
                market_value: RawCell::Number(2800.0),
            }],
            &mut diags,
        );
        assert_eq!(assets[0].kind, AssetEventKind::Opening);
        assert_eq!(assets[0].market_value_usd, dec!(2800));

        let cash = normalize_cash_events(
            "Cash",
            &[RawCashRow {
                line: 2,
                date: text("05/06/2023"),
                kind: text("cash"),
                espp: RawCell::Number(-100.0),
                rsu: RawCell::Number(25.5),
            }],
            &mut diags,
        );
        assert_eq!(cash[0].kind, CashEventKind::Cash);
        assert_eq!(cash[0].combined_usd(), dec!(-74.5));
        assert!(diags.is_empty());
    }
}
