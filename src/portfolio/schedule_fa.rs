use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;

use super::timeline::{find_share_peak, PeakSkipReason, PeakValue, ShareTimeline, TimelineEntry};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::models::{AssetEventKind, Instrument};
use crate::pricing::PriceSeries;
use crate::valuation::{ValuedAssetEvent, Valuator};

/// Schedule FA figures for one share ledger (ESPP or RSU)
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleFaSummary {
    pub instrument: Instrument,
    pub opening: Option<TimelineEntry>,
    pub closing: Option<TimelineEntry>,
    pub total_shares: Decimal,
    pub positive_cash_usd: Decimal,
    pub positive_cash_inr: Decimal,
    pub peak: PeakValue,
}

impl ScheduleFaSummary {
    /// Build the summary for `events`.
    ///
    /// `prices` is the daily series for the closing year, when one could be
    /// obtained. The peak is skipped, with a diagnostic, when the ledger has
    /// no opening or closing row or no usable prices.
    pub fn build(
        instrument: Instrument,
        events: &[ValuedAssetEvent],
        prices: Option<&PriceSeries>,
        valuator: &Valuator<'_>,
        diags: &mut Diagnostics,
    ) -> Self {
        let mut ordered: Vec<&ValuedAssetEvent> = events.iter().collect();
        ordered.sort_by_key(|e| e.event.date);

        let ledger_value = |e: &ValuedAssetEvent| TimelineEntry {
            date: e.event.date,
            balance_usd: e.event.market_value_usd,
            conversion: e.conversion,
            value_inr: e.market_value_inr,
        };

        let opening = ordered
            .iter()
            .rev()
            .find(|e| e.event.kind == AssetEventKind::Opening)
            .map(|e| ledger_value(*e));
        let closing = ordered
            .iter()
            .rev()
            .find(|e| e.event.kind == AssetEventKind::Closing)
            .map(|e| ledger_value(*e));

        let raw: Vec<_> = ordered.iter().map(|e| e.event.clone()).collect();
        let timeline = ShareTimeline::from_events(&raw);
        let total_shares = timeline
            .steps()
            .last()
            .map(|s| s.balance)
            .unwrap_or(Decimal::ZERO);

        let positive_cash_usd: Decimal = ordered
            .iter()
            .filter(|e| e.event.kind == AssetEventKind::Cash && e.event.cash_usd > Decimal::ZERO)
            .map(|e| e.event.cash_usd)
            .sum();
        let positive_cash_inr = closing
            .map(|c| c.conversion.to_inr(positive_cash_usd))
            .unwrap_or(Decimal::ZERO);

        let peak = match (&opening, &closing) {
            (Some(_), Some(closing)) => {
                let year = closing.date.year();
                match prices.filter(|s| s.in_year(year).next().is_some()) {
                    Some(series) => find_share_peak(&timeline, series, year, valuator, diags),
                    None => PeakValue::Skipped(PeakSkipReason::PriceSeriesUnavailable),
                }
            }
            _ => PeakValue::Skipped(PeakSkipReason::MissingOpeningOrClosing),
        };

        if let PeakValue::Skipped(reason) = peak {
            diags.push(
                DiagnosticKind::PeakSkipped,
                format!("{} peak value not computed: {}", instrument.as_str(), reason.describe()),
            );
        }

        Self {
            instrument,
            opening,
            closing,
            total_shares,
            positive_cash_usd,
            positive_cash_inr,
            peak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetEvent;
    use crate::pricing::PricePoint;
    use crate::rates::{RateEntry, RateTable};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(d: NaiveDate, label: &str, shares: Decimal, cash: Decimal, mv: Decimal) -> AssetEvent {
        AssetEvent {
            date: d,
            kind: AssetEventKind::from_label(label),
            shares,
            cash_usd: cash,
            market_value_usd: mv,
        }
    }

    fn table() -> RateTable {
        RateTable::new(vec![
            RateEntry { date: date(2023, 1, 1), rate: dec!(82) },
            RateEntry { date: date(2023, 7, 1), rate: dec!(83) },
            RateEntry { date: date(2023, 12, 29), rate: dec!(83.5) },
        ])
    }

    fn ledger(valuator: &Valuator<'_>, diags: &mut Diagnostics) -> Vec<ValuedAssetEvent> {
        valuator.value_asset_events(
            &[
                event(date(2023, 1, 1), "Opening", dec!(10), dec!(0), dec!(600)),
                event(date(2023, 3, 1), "Cash", dec!(0), dec!(40), dec!(0)),
                event(date(2023, 5, 1), "Cash", dec!(0), dec!(-15), dec!(0)),
                event(date(2023, 8, 1), "Share", dec!(4), dec!(0), dec!(0)),
                event(date(2023, 12, 31), "Closing", dec!(14), dec!(0), dec!(1400)),
            ],
            diags,
        )
    }

    #[test]
    fn test_summary_values() {
        let rates = table();
        let valuator = Valuator::new(&rates);
        let mut diags = Diagnostics::new();
        let events = ledger(&valuator, &mut diags);
        let prices = PriceSeries::new(
            "MU",
            vec![
                PricePoint { date: date(2023, 7, 31), close: dec!(70) },
                PricePoint { date: date(2023, 8, 2), close: dec!(68) },
                PricePoint { date: date(2023, 12, 29), close: dec!(100) },
            ],
        );

        let summary =
            ScheduleFaSummary::build(Instrument::Espp, &events, Some(&prices), &valuator, &mut diags);

        assert_eq!(summary.opening.unwrap().value_inr, dec!(49200));
        assert_eq!(summary.closing.unwrap().value_inr, dec!(116900));
        assert_eq!(summary.total_shares, dec!(14));
        assert_eq!(summary.positive_cash_usd, dec!(40));
        assert_eq!(summary.positive_cash_inr, dec!(3340));

        let peak = summary.peak.computed().unwrap();
        assert_eq!(peak.date, date(2023, 12, 29));
        assert_eq!(peak.value_usd, dec!(1400));
        assert_eq!(peak.value_inr, dec!(116900));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_peak_skipped_without_prices() {
        let rates = table();
        let valuator = Valuator::new(&rates);
        let mut diags = Diagnostics::new();
        let events = ledger(&valuator, &mut diags);

        let summary = ScheduleFaSummary::build(Instrument::Rsu, &events, None, &valuator, &mut diags);

        assert_eq!(
            summary.peak,
            PeakValue::Skipped(PeakSkipReason::PriceSeriesUnavailable)
        );
        assert_eq!(diags.count(DiagnosticKind::PeakSkipped), 1);
        assert_eq!(summary.closing.unwrap().date, date(2023, 12, 31));
    }

    #[test]
    fn test_peak_skipped_without_closing() {
        let rates = table();
        let valuator = Valuator::new(&rates);
        let mut diags = Diagnostics::new();
        let events = valuator.value_asset_events(
            &[event(date(2023, 1, 1), "Opening", dec!(10), dec!(50), dec!(600))],
            &mut diags,
        );

        let summary = ScheduleFaSummary::build(Instrument::Espp, &events, None, &valuator, &mut diags);

        assert!(summary.closing.is_none());
        assert_eq!(summary.positive_cash_inr, Decimal::ZERO);
        assert_eq!(
            summary.peak,
            PeakValue::Skipped(PeakSkipReason::MissingOpeningOrClosing)
        );
    }
}
