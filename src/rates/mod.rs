// Rates module - SBI TT BUY reference rates (USD to INR)

pub mod sbi;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

pub use sbi::{fetch_sbi_rates, load_rates_file, parse_sbi_csv, SBI_RATES_URL};

/// One row of the reference-rate table.
///
/// A rate of zero (or one that could not be parsed) is kept so the date still
/// has an entry, but it is never returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateEntry {
    pub date: NaiveDate,
    pub rate: Decimal,
}

/// The rate a lookup resolved to and the date it was published for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateQuote {
    pub rate: Decimal,
    pub date: NaiveDate,
}

/// Date-sorted index of reference rates
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    entries: Vec<RateEntry>,
}

impl RateTable {
    /// Build a table from entries in any order. Entries sharing a date keep
    /// their input order.
    pub fn new(mut entries: Vec<RateEntry>) -> Self {
        entries.sort_by_key(|e| e.date);
        Self { entries }
    }

    /// Latest positive rate dated on or before `target`.
    ///
    /// Entries after `target` are never considered. When several entries share
    /// the winning date, the first one in input order with a positive rate wins.
    pub fn rate_on_or_before(&self, target: NaiveDate) -> Option<RateQuote> {
        let upper = self.entries.partition_point(|e| e.date <= target);

        self.entries[..upper]
            .chunk_by(|a, b| a.date == b.date)
            .rev()
            .find_map(|same_day| {
                same_day
                    .iter()
                    .find(|e| e.rate > Decimal::ZERO)
                    .map(|e| RateQuote {
                        rate: e.rate,
                        date: e.date,
                    })
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First and last dates covered by the table
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }
}

impl FromIterator<RateEntry> for RateTable {
    fn from_iter<I: IntoIterator<Item = RateEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
