//! Balance replay for Schedule FA peak values.
//!
//! Two flavours share one pattern: replay balance-changing events in date
//! order, value the balance at each candidate date, keep the maximum.
//! Share ledgers are valued against a daily price series; the cash ledger is
//! piecewise constant so its snapshots are the only candidates.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::models::{AssetEvent, AssetEventKind, CashEvent, TransactionKind};
use crate::pricing::PriceSeries;
use crate::valuation::{Conversion, Valuator};

/// Share balance in effect from `date` onward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShareStep {
    pub date: NaiveDate,
    pub balance: Decimal,
}

/// Step function of shares held, built from opening and share-addition rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareTimeline {
    steps: Vec<ShareStep>,
}

impl ShareTimeline {
    pub fn from_events(events: &[AssetEvent]) -> Self {
        let mut ordered: Vec<&AssetEvent> = events.iter().collect();
        ordered.sort_by_key(|e| e.date);

        let mut balance = Decimal::ZERO;
        let mut steps = Vec::new();

        for event in ordered {
            match event.kind {
                AssetEventKind::Opening => balance = event.shares,
                AssetEventKind::ShareAddition => balance += event.shares,
                _ => continue,
            }
            steps.push(ShareStep {
                date: event.date,
                balance,
            });
        }

        Self { steps }
    }

    pub fn steps(&self) -> &[ShareStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Balance of the latest step at or before `day`, zero before the first step
    pub fn balance_on(&self, day: NaiveDate) -> Decimal {
        let idx = self.steps.partition_point(|s| s.date <= day);
        idx.checked_sub(1)
            .map(|i| self.steps[i].balance)
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SharePeak {
    pub date: NaiveDate,
    pub price_usd: Decimal,
    pub shares: Decimal,
    pub value_usd: Decimal,
    pub conversion: Conversion,
    pub value_inr: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PeakSkipReason {
    MissingOpeningOrClosing,
    PriceSeriesUnavailable,
    NoHoldings,
}

impl PeakSkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            PeakSkipReason::MissingOpeningOrClosing => "opening or closing row missing",
            PeakSkipReason::PriceSeriesUnavailable => "price series unavailable",
            PeakSkipReason::NoHoldings => "no shares held on any trading day",
        }
    }
}

/// Peak value of a share ledger, or why it was not computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PeakValue {
    Computed(SharePeak),
    Skipped(PeakSkipReason),
}

impl PeakValue {
    pub fn computed(&self) -> Option<&SharePeak> {
        match self {
            PeakValue::Computed(peak) => Some(peak),
            PeakValue::Skipped(_) => None,
        }
    }
}

/// Replay `timeline` over the trading days of `year` in `series`.
///
/// Returns the first day with the strictly largest positive USD value,
/// converted to INR with the rate on or before that day.
pub fn find_share_peak(
    timeline: &ShareTimeline,
    series: &PriceSeries,
    year: i32,
    valuator: &Valuator<'_>,
    diags: &mut Diagnostics,
) -> PeakValue {
    let mut best: Option<(NaiveDate, Decimal, Decimal, Decimal)> = None;
    let mut best_value = Decimal::ZERO;

    for point in series.in_year(year) {
        let shares = timeline.balance_on(point.date);
        let value = point.close * shares;
        if value > best_value {
            best_value = value;
            best = Some((point.date, point.close, shares, value));
        }
    }

    let Some((date, price_usd, shares, value_usd)) = best else {
        return PeakValue::Skipped(PeakSkipReason::NoHoldings);
    };

    let conversion = valuator.convert(TransactionKind::AssetEvent, date, diags);
    PeakValue::Computed(SharePeak {
        date,
        price_usd,
        shares,
        value_usd,
        conversion,
        value_inr: conversion.to_inr(value_usd),
    })
}

/// A balance valued at one date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub date: NaiveDate,
    pub balance_usd: Decimal,
    pub conversion: Conversion,
    pub value_inr: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CashSnapshot {
    pub espp_usd: Decimal,
    pub rsu_usd: Decimal,
    pub entry: TimelineEntry,
}

/// Snapshots of the combined cash balance: opening, each cash movement in
/// date order, then closing.
///
/// Cash rows are deltas on the running balances; opening and closing rows
/// are absolute.
pub fn cash_snapshots(
    opening: &CashEvent,
    movements: &[CashEvent],
    closing: &CashEvent,
    valuator: &Valuator<'_>,
    diags: &mut Diagnostics,
) -> Vec<CashSnapshot> {
    let mut snapshot = |date: NaiveDate, espp_usd: Decimal, rsu_usd: Decimal| {
        let conversion = valuator.convert(TransactionKind::CashEvent, date, diags);
        let balance_usd = espp_usd + rsu_usd;
        CashSnapshot {
            espp_usd,
            rsu_usd,
            entry: TimelineEntry {
                date,
                balance_usd,
                conversion,
                value_inr: conversion.to_inr(balance_usd),
            },
        }
    };

    let mut ordered: Vec<&CashEvent> = movements.iter().collect();
    ordered.sort_by_key(|e| e.date);

    let mut espp = opening.espp_usd;
    let mut rsu = opening.rsu_usd;
    let mut snapshots = Vec::with_capacity(ordered.len() + 2);
    snapshots.push(snapshot(opening.date, espp, rsu));

    for movement in ordered {
        espp += movement.espp_usd;
        rsu += movement.rsu_usd;
        snapshots.push(snapshot(movement.date, espp, rsu));
    }

    snapshots.push(snapshot(closing.date, closing.espp_usd, closing.rsu_usd));
    snapshots
}

/// First snapshot with the maximal INR value
pub fn peak_snapshot(snapshots: &[CashSnapshot]) -> Option<&CashSnapshot> {
    snapshots.iter().fold(None, |best, s| match best {
        Some(b) if b.entry.value_inr >= s.entry.value_inr => Some(b),
        _ => Some(s),
    })
}
