// Reports module - tabular rendering of an ItrReport (xlsx and JSON)

pub mod json;
pub mod tables;
pub mod xlsx;

use chrono::NaiveDate;
use rust_decimal::Decimal;

pub use json::render_json;
pub use tables::build_tables;
pub use xlsx::write_xlsx;

use crate::utils::round2;

/// One output cell, typed so each renderer can format it natively
#[derive(Debug, Clone, PartialEq)]
pub enum OutputCell {
    Text(String),
    /// Money amount, rounded to 2 places on output
    Amount(Decimal),
    /// Rates, share counts and holding periods, written as-is
    Exact(Decimal),
    Integer(i64),
    Date(NaiveDate),
    /// Value that could not be computed, rendered as "N/A"
    NotAvailable,
}

impl OutputCell {
    pub fn text(value: impl Into<String>) -> Self {
        OutputCell::Text(value.into())
    }

    pub fn optional_date(date: Option<NaiveDate>) -> Self {
        date.map(OutputCell::Date).unwrap_or(OutputCell::NotAvailable)
    }

    pub fn optional_exact(value: Option<Decimal>) -> Self {
        value.map(OutputCell::Exact).unwrap_or(OutputCell::NotAvailable)
    }

    pub fn optional_amount(value: Option<Decimal>) -> Self {
        value.map(OutputCell::Amount).unwrap_or(OutputCell::NotAvailable)
    }

    /// Numeric value as written to output, if the cell is numeric
    pub fn presented_number(&self) -> Option<Decimal> {
        match self {
            OutputCell::Amount(d) => Some(round2(*d)),
            OutputCell::Exact(d) => Some(d.normalize()),
            OutputCell::Integer(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }
}

/// A record type that renders as one row of a named output sheet
pub trait TabularRecord {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<OutputCell>;
}

/// One output sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub sheet: &'static str,
    pub headers: &'static [&'static str],
    pub rows: Vec<Vec<OutputCell>>,
}

impl Table {
    pub fn from_records<'a, T, I>(sheet: &'static str, records: I) -> Self
    where
        T: TabularRecord + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        Self {
            sheet,
            headers: T::HEADERS,
            rows: records.into_iter().map(|r| r.cells()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_presented_numbers() {
        assert_eq!(OutputCell::Amount(dec!(8250.456)).presented_number(), Some(dec!(8250.46)));
        assert_eq!(OutputCell::Exact(dec!(82.5000)).presented_number(), Some(dec!(82.5)));
        assert_eq!(OutputCell::Integer(766).presented_number(), Some(dec!(766)));
        assert_eq!(OutputCell::NotAvailable.presented_number(), None);
        assert_eq!(OutputCell::optional_exact(None), OutputCell::NotAvailable);
    }
}
