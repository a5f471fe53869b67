//! INR valuation of normalized records against the reference-rate table.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::models::{AssetEvent, CashEvent, Dividend, EquityTrade, TransactionKind};
use crate::rates::{RateQuote, RateTable};

/// Reference date of a record and the rate it resolved to, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub reference_date: NaiveDate,
    pub quote: Option<RateQuote>,
}

impl Conversion {
    pub fn rate(&self) -> Option<Decimal> {
        self.quote.map(|q| q.rate)
    }

    pub fn rate_date(&self) -> Option<NaiveDate> {
        self.quote.map(|q| q.date)
    }

    /// USD amount in INR; zero when no rate is available
    pub fn to_inr(&self, usd: Decimal) -> Decimal {
        match self.quote {
            Some(q) => usd * q.rate,
            None => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValuedDividend {
    pub dividend: Dividend,
    pub conversion: Conversion,
    pub value_inr: Decimal,
    pub tax_inr: Decimal,
}

/// A buy/vest or sale with its INR values
#[derive(Debug, Clone, Serialize)]
pub struct ValuedTrade {
    pub trade: EquityTrade,
    pub conversion: Conversion,
    pub total_usd: Decimal,
    pub price_per_share_inr: Decimal,
    pub total_inr: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValuedAssetEvent {
    pub event: AssetEvent,
    pub conversion: Conversion,
    pub market_value_inr: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValuedCashEvent {
    pub event: CashEvent,
    pub conversion: Conversion,
    pub combined_usd: Decimal,
    pub combined_inr: Decimal,
}

/// Converts records with the rate on or before each record's reference date
pub struct Valuator<'a> {
    rates: &'a RateTable,
}

impl<'a> Valuator<'a> {
    pub fn new(rates: &'a RateTable) -> Self {
        Self { rates }
    }

    /// Resolve the rate for a record of `kind` dated `date`, recording a
    /// diagnostic when none is available.
    pub fn convert(
        &self,
        kind: TransactionKind,
        date: NaiveDate,
        diags: &mut Diagnostics,
    ) -> Conversion {
        let reference_date = kind.reference_date(date);
        let conversion = self.convert_on(reference_date);

        if conversion.quote.is_none() {
            diags.push(
                DiagnosticKind::MissingRate,
                format!(
                    "no exchange rate on or before {} for {} dated {}",
                    reference_date,
                    kind.as_str(),
                    date
                ),
            );
        }

        conversion
    }

    /// Rate lookup on an exact reference date
    pub fn convert_on(&self, reference_date: NaiveDate) -> Conversion {
        Conversion {
            reference_date,
            quote: self.rates.rate_on_or_before(reference_date),
        }
    }

    pub fn value_dividends(
        &self,
        dividends: &[Dividend],
        diags: &mut Diagnostics,
    ) -> Vec<ValuedDividend> {
        dividends
            .iter()
            .map(|d| {
                let conversion = self.convert(TransactionKind::Dividend, d.date, diags);
                ValuedDividend {
                    dividend: d.clone(),
                    conversion,
                    value_inr: conversion.to_inr(d.amount_usd),
                    tax_inr: conversion.to_inr(d.tax_usd),
                }
            })
            .collect()
    }

    /// Value buys/vests (`TransactionKind::Buy`) or sales (`TransactionKind::Sale`)
    pub fn value_trades(
        &self,
        kind: TransactionKind,
        trades: &[EquityTrade],
        diags: &mut Diagnostics,
    ) -> Vec<ValuedTrade> {
        trades
            .iter()
            .map(|t| {
                let conversion = self.convert(kind, t.date, diags);
                let total_usd = t.total_usd();
                ValuedTrade {
                    trade: t.clone(),
                    conversion,
                    total_usd,
                    price_per_share_inr: conversion.to_inr(t.price_per_share_usd),
                    total_inr: conversion.to_inr(total_usd),
                }
            })
            .collect()
    }

    pub fn value_asset_events(
        &self,
        events: &[AssetEvent],
        diags: &mut Diagnostics,
    ) -> Vec<ValuedAssetEvent> {
        events
            .iter()
            .map(|e| {
                let conversion = self.convert(TransactionKind::AssetEvent, e.date, diags);
                ValuedAssetEvent {
                    event: e.clone(),
                    conversion,
                    market_value_inr: conversion.to_inr(e.market_value_usd),
                }
            })
            .collect()
    }

    pub fn value_cash_events(
        &self,
        events: &[CashEvent],
        diags: &mut Diagnostics,
    ) -> Vec<ValuedCashEvent> {
        events
            .iter()
            .map(|e| {
                let conversion = self.convert(TransactionKind::CashEvent, e.date, diags);
                let combined_usd = e.combined_usd();
                ValuedCashEvent {
                    event: e.clone(),
                    conversion,
                    combined_usd,
                    combined_inr: conversion.to_inr(combined_usd),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetEventKind;
    use crate::rates::RateEntry;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rates() -> RateTable {
        RateTable::new(vec![
            RateEntry { date: date(2023, 4, 28), rate: dec!(82.50) },
            RateEntry { date: date(2023, 4, 30), rate: dec!(0) },
            RateEntry { date: date(2023, 5, 2), rate: dec!(82.10) },
            RateEntry { date: date(2023, 5, 31), rate: dec!(82.70) },
        ])
    }

    #[test]
    fn test_dividend_uses_preceding_month_end() {
        let table = rates();
        let valuator = Valuator::new(&table);
        let mut diags = Diagnostics::new();

        let valued = valuator.value_dividends(
            &[Dividend {
                date: date(2023, 5, 2),
                amount_usd: dec!(100),
                tax_usd: dec!(25),
            }],
            &mut diags,
        );

        let v = &valued[0];
        assert_eq!(v.conversion.reference_date, date(2023, 4, 30));
        assert_eq!(v.conversion.rate(), Some(dec!(82.50)));
        assert_eq!(v.conversion.rate_date(), Some(date(2023, 4, 28)));
        assert_eq!(v.value_inr, dec!(8250.00));
        assert_eq!(v.tax_inr, dec!(2062.50));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_trade_amounts_are_not_rounded() {
        let table = rates();
        let valuator = Valuator::new(&table);
        let mut diags = Diagnostics::new();

        let valued = valuator.value_trades(
            TransactionKind::Buy,
            &[EquityTrade {
                date: date(2023, 6, 30),
                price_per_share_usd: dec!(61.237),
                shares: dec!(3.333),
            }],
            &mut diags,
        );

        let v = &valued[0];
        assert_eq!(v.conversion.reference_date, date(2023, 5, 31));
        assert_eq!(v.total_usd, dec!(204.102921));
        assert_eq!(v.price_per_share_inr, dec!(61.237) * dec!(82.70));
        assert_eq!(v.total_inr, dec!(204.102921) * dec!(82.70));
    }

    #[test]
    fn test_asset_event_uses_its_own_date() {
        let table = rates();
        let valuator = Valuator::new(&table);
        let mut diags = Diagnostics::new();

        let valued = valuator.value_asset_events(
            &[AssetEvent {
                date: date(2023, 5, 2),
                kind: AssetEventKind::Closing,
                shares: dec!(10),
                cash_usd: Decimal::ZERO,
                market_value_usd: dec!(1000),
            }],
            &mut diags,
        );

        assert_eq!(valued[0].conversion.rate_date(), Some(date(2023, 5, 2)));
        assert_eq!(valued[0].market_value_inr, dec!(82100));
    }

    #[test]
    fn test_missing_rate_is_explicit_and_reported() {
        let table = rates();
        let valuator = Valuator::new(&table);
        let mut diags = Diagnostics::new();

        let valued = valuator.value_dividends(
            &[Dividend {
                date: date(2023, 4, 10),
                amount_usd: dec!(50),
                tax_usd: dec!(12.5),
            }],
            &mut diags,
        );

        assert!(valued[0].conversion.quote.is_none());
        assert_eq!(valued[0].value_inr, Decimal::ZERO);
        assert_eq!(diags.count(DiagnosticKind::MissingRate), 1);
    }
}
