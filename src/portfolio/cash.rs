use rust_decimal::Decimal;
use serde::Serialize;

use super::timeline::{cash_snapshots, peak_snapshot, CashSnapshot, TimelineEntry};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::models::CashEventKind;
use crate::valuation::{ValuedCashEvent, Valuator};

/// Opening, closing and peak of the combined ESPP + RSU cash ledger
#[derive(Debug, Clone, Serialize)]
pub struct CashSummary {
    pub opening: Option<CashSnapshot>,
    pub closing: Option<CashSnapshot>,
    pub peak: Option<CashSnapshot>,
    pub snapshots: Vec<CashSnapshot>,
}

fn as_snapshot(e: &ValuedCashEvent) -> CashSnapshot {
    CashSnapshot {
        espp_usd: e.event.espp_usd,
        rsu_usd: e.event.rsu_usd,
        entry: TimelineEntry {
            date: e.event.date,
            balance_usd: e.combined_usd,
            conversion: e.conversion,
            value_inr: e.combined_inr,
        },
    }
}

impl CashSummary {
    pub fn build(
        events: &[ValuedCashEvent],
        valuator: &Valuator<'_>,
        diags: &mut Diagnostics,
    ) -> Self {
        let last_of = |kind: CashEventKind| {
            events
                .iter()
                .filter(|e| e.event.kind == kind)
                .max_by_key(|e| e.event.date)
        };
        let opening = last_of(CashEventKind::Opening);
        let closing = last_of(CashEventKind::Closing);

        let snapshots = match (opening, closing) {
            (Some(open), Some(close)) => {
                let movements: Vec<_> = events
                    .iter()
                    .filter(|e| e.event.kind == CashEventKind::Cash)
                    .map(|e| e.event.clone())
                    .collect();
                cash_snapshots(&open.event, &movements, &close.event, valuator, diags)
            }
            _ => {
                diags.push(
                    DiagnosticKind::PeakSkipped,
                    "cash peak value not computed: opening or closing row missing",
                );
                Vec::new()
            }
        };

        Self {
            opening: opening.map(as_snapshot),
            closing: closing.map(as_snapshot),
            peak: peak_snapshot(&snapshots).copied(),
            snapshots,
        }
    }

    pub fn opening_combined_usd(&self) -> Decimal {
        self.opening.map(|s| s.entry.balance_usd).unwrap_or_default()
    }

    pub fn closing_combined_usd(&self) -> Decimal {
        self.closing.map(|s| s.entry.balance_usd).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CashEvent;
    use crate::rates::{RateEntry, RateTable};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(d: NaiveDate, label: &str, espp: Decimal, rsu: Decimal) -> CashEvent {
        CashEvent {
            date: d,
            kind: CashEventKind::from_label(label),
            espp_usd: espp,
            rsu_usd: rsu,
        }
    }

    #[test]
    fn test_cash_summary_peak_dominates_opening_and_closing() {
        let rates = RateTable::new(vec![
            RateEntry { date: date(2023, 1, 1), rate: dec!(82) },
            RateEntry { date: date(2023, 12, 1), rate: dec!(84) },
        ]);
        let valuator = Valuator::new(&rates);
        let mut diags = Diagnostics::new();
        let events = valuator.value_cash_events(
            &[
                row(date(2023, 1, 1), "Opening", dec!(100), dec!(20)),
                row(date(2023, 4, 10), "Cash", dec!(30), dec!(0)),
                row(date(2023, 12, 31), "Closing", dec!(140), dec!(0)),
                row(date(2023, 2, 10), "Cash", dec!(-10), dec!(5)),
            ],
            &mut diags,
        );

        let summary = CashSummary::build(&events, &valuator, &mut diags);

        assert_eq!(summary.snapshots.len(), 4);
        assert_eq!(summary.opening_combined_usd(), dec!(120));
        assert_eq!(summary.closing_combined_usd(), dec!(140));

        let peak = summary.peak.unwrap();
        assert_eq!(peak.entry.date, date(2023, 4, 10));
        assert_eq!(peak.entry.balance_usd, dec!(145));
        assert_eq!(peak.entry.value_inr, dec!(11890));
        assert!(peak.entry.value_inr >= summary.opening.unwrap().entry.value_inr);
        assert!(peak.entry.value_inr >= summary.closing.unwrap().entry.value_inr);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_cash_summary_without_closing() {
        let rates = RateTable::new(vec![RateEntry { date: date(2023, 1, 1), rate: dec!(82) }]);
        let valuator = Valuator::new(&rates);
        let mut diags = Diagnostics::new();
        let events = valuator.value_cash_events(
            &[row(date(2023, 1, 1), "Opening", dec!(100), dec!(20))],
            &mut diags,
        );

        let summary = CashSummary::build(&events, &valuator, &mut diags);

        assert!(summary.peak.is_none());
        assert!(summary.snapshots.is_empty());
        assert_eq!(summary.opening.unwrap().entry.value_inr, dec!(9840));
        assert_eq!(diags.count(DiagnosticKind::PeakSkipped), 1);
    }
}
