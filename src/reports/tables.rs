use rust_decimal::Decimal;

use super::{OutputCell, Table, TabularRecord};
use crate::calculator::ItrReport;
use crate::diagnostics::Diagnostic;
use crate::portfolio::{CashSnapshot, CashSummary, PeakValue, ScheduleFaSummary, TimelineEntry};
use crate::tax::{GainsSummary, MatchedGain};
use crate::valuation::{Conversion, ValuedAssetEvent, ValuedCashEvent, ValuedDividend, ValuedTrade};

pub const DIVIDEND_SHEET: &str = "Dividend_Calculated";
pub const ESPP_BUY_SHEET: &str = "ESPP_Buy_Calculated";
pub const ESPP_SALE_SHEET: &str = "ESPP_Sale_Calculated";
pub const RSU_VEST_SHEET: &str = "RSU_Vest_Calculated";
pub const RSU_SALE_SHEET: &str = "RSU_Sale_Calculated";
pub const ESPP_MATCHED_SHEET: &str = "ESPP_Matched_Transactions";
pub const RSU_MATCHED_SHEET: &str = "RSU_Matched_Transactions";
pub const CAPITAL_GAINS_SHEET: &str = "Capital_Gains_Summary";
pub const ESPP_FA_DETAILS_SHEET: &str = "Schedule_FA_ESPP_Details";
pub const ESPP_FA_SUMMARY_SHEET: &str = "Schedule_FA_ESPP_Summary";
pub const RSU_FA_DETAILS_SHEET: &str = "Schedule_FA_RSU_Details";
pub const RSU_FA_SUMMARY_SHEET: &str = "Schedule_FA_RSU_Summary";
pub const CASH_DETAILS_SHEET: &str = "Cash_Details";
pub const CASH_SUMMARY_SHEET: &str = "Cash_Summary";
pub const DIAGNOSTICS_SHEET: &str = "Diagnostics";

fn conversion_cells(conversion: &Conversion) -> [OutputCell; 3] {
    [
        OutputCell::Date(conversion.reference_date),
        OutputCell::optional_date(conversion.rate_date()),
        OutputCell::optional_exact(conversion.rate()),
    ]
}

impl TabularRecord for ValuedDividend {
    const HEADERS: &'static [&'static str] = &[
        "Transaction Date",
        "Reference Date (Month End)",
        "SBI Rate Date",
        "SBI TT Buy Rate",
        "Value (Foreign)",
        "Tax (Foreign)",
        "Value (INR)",
        "Tax (INR)",
    ];

    fn cells(&self) -> Vec<OutputCell> {
        let mut cells = vec![OutputCell::Date(self.dividend.date)];
        cells.extend(conversion_cells(&self.conversion));
        cells.extend([
            OutputCell::Exact(self.dividend.amount_usd),
            OutputCell::Exact(self.dividend.tax_usd),
            OutputCell::Amount(self.value_inr),
            OutputCell::Amount(self.tax_inr),
        ]);
        cells
    }
}

fn trade_cells(trade: &ValuedTrade) -> Vec<OutputCell> {
    let mut cells = vec![OutputCell::Date(trade.trade.date)];
    cells.extend(conversion_cells(&trade.conversion));
    cells.extend([
        OutputCell::Exact(trade.trade.price_per_share_usd),
        OutputCell::Exact(trade.trade.shares),
        OutputCell::Amount(trade.total_usd),
        OutputCell::Amount(trade.price_per_share_inr),
        OutputCell::Amount(trade.total_inr),
    ]);
    cells
}

/// ESPP purchase or RSU vest row
pub struct PurchaseRow<'a>(pub &'a ValuedTrade);

/// ESPP or RSU sale row
pub struct SaleRow<'a>(pub &'a ValuedTrade);

impl TabularRecord for PurchaseRow<'_> {
    const HEADERS: &'static [&'static str] = &[
        "Transaction Date",
        "Reference Date (Month End)",
        "SBI Rate Date",
        "SBI TT Buy Rate",
        "FMV per Share (USD)",
        "No. of Shares",
        "Total Purchase Price (USD)",
        "FMV per Share (INR)",
        "Total Purchase Price (INR)",
    ];

    fn cells(&self) -> Vec<OutputCell> {
        trade_cells(self.0)
    }
}

impl TabularRecord for SaleRow<'_> {
    const HEADERS: &'static [&'static str] = &[
        "Transaction Date",
        "Reference Date (Month End)",
        "SBI Rate Date",
        "SBI TT Buy Rate",
        "FMV per Share (USD)",
        "No. of Shares",
        "Total Sale Price (USD)",
        "FMV per Share (INR)",
        "Total Sale Price (INR)",
    ];

    fn cells(&self) -> Vec<OutputCell> {
        trade_cells(self.0)
    }
}

impl TabularRecord for MatchedGain {
    const HEADERS: &'static [&'static str] = &[
        "Sale Date",
        "Purchase Date",
        "Holding Period (Days)",
        "Holding Period (Months)",
        "Gain Type",
        "Shares Sold",
        "Purchase Price per Share (INR)",
        "Sale Price per Share (INR)",
        "Total Purchase Cost (INR)",
        "Total Sale Proceeds (INR)",
        "Capital Gain/Loss (INR)",
        "LTCG (INR)",
        "STCG (INR)",
    ];

    fn cells(&self) -> Vec<OutputCell> {
        vec![
            OutputCell::Date(self.sale_date),
            OutputCell::Date(self.purchase_date),
            OutputCell::Integer(self.holding_days),
            OutputCell::Exact(self.holding_months.round_dp(1)),
            OutputCell::text(self.gain_type.as_str()),
            OutputCell::Exact(self.shares_matched),
            OutputCell::Amount(self.purchase_price_per_share_inr),
            OutputCell::Amount(self.sale_price_per_share_inr),
            OutputCell::Amount(self.purchase_cost_inr),
            OutputCell::Amount(self.sale_proceeds_inr),
            OutputCell::Amount(self.gain_inr),
            OutputCell::Amount(self.ltcg_inr()),
            OutputCell::Amount(self.stcg_inr()),
        ]
    }
}

/// Labelled row of the capital gains summary
pub struct GainsRow<'a> {
    pub category: &'a str,
    pub summary: &'a GainsSummary,
}

impl TabularRecord for GainsRow<'_> {
    const HEADERS: &'static [&'static str] =
        &["Category", "Total Gain/Loss (INR)", "LTCG (INR)", "STCG (INR)"];

    fn cells(&self) -> Vec<OutputCell> {
        vec![
            OutputCell::text(self.category),
            OutputCell::Amount(self.summary.total_gain),
            OutputCell::Amount(self.summary.ltcg),
            OutputCell::Amount(self.summary.stcg),
        ]
    }
}

impl TabularRecord for ValuedAssetEvent {
    const HEADERS: &'static [&'static str] = &[
        "Date",
        "Type",
        "Shares",
        "Cash (USD)",
        "Market Value (USD)",
        "Exchange Rate",
        "Market Value (INR)",
    ];

    fn cells(&self) -> Vec<OutputCell> {
        vec![
            OutputCell::Date(self.event.date),
            OutputCell::text(self.event.kind.label()),
            OutputCell::Exact(self.event.shares),
            OutputCell::Amount(self.event.cash_usd),
            OutputCell::Amount(self.event.market_value_usd),
            OutputCell::optional_exact(self.conversion.rate()),
            OutputCell::Amount(self.market_value_inr),
        ]
    }
}

fn entry_cells(entry: Option<&TimelineEntry>) -> [OutputCell; 3] {
    match entry {
        Some(e) => [
            OutputCell::Date(e.date),
            OutputCell::Amount(e.balance_usd),
            OutputCell::Amount(e.value_inr),
        ],
        None => [
            OutputCell::NotAvailable,
            OutputCell::NotAvailable,
            OutputCell::NotAvailable,
        ],
    }
}

impl TabularRecord for ScheduleFaSummary {
    const HEADERS: &'static [&'static str] = &[
        "Opening Date",
        "Opening Value (USD)",
        "Opening Value (INR)",
        "Closing Date",
        "Closing Value (USD)",
        "Closing Value (INR)",
        "Total Shares",
        "Positive Cash Total (USD)",
        "Positive Cash Total (INR)",
        "Peak Date",
        "Peak Price (USD)",
        "Peak Shares",
        "Peak Value (USD)",
        "Peak Value (INR)",
        "Peak Status",
    ];

    fn cells(&self) -> Vec<OutputCell> {
        let mut cells = Vec::with_capacity(Self::HEADERS.len());
        cells.extend(entry_cells(self.opening.as_ref()));
        cells.extend(entry_cells(self.closing.as_ref()));
        cells.extend([
            OutputCell::Exact(self.total_shares),
            OutputCell::Amount(self.positive_cash_usd),
            OutputCell::Amount(self.positive_cash_inr),
        ]);

        match &self.peak {
            PeakValue::Computed(peak) => cells.extend([
                OutputCell::Date(peak.date),
                OutputCell::Amount(peak.price_usd),
                OutputCell::Exact(peak.shares),
                OutputCell::Amount(peak.value_usd),
                OutputCell::Amount(peak.value_inr),
                OutputCell::text("Computed"),
            ]),
            PeakValue::Skipped(reason) => {
                cells.extend(std::iter::repeat(OutputCell::NotAvailable).take(5));
                cells.push(OutputCell::text(format!("Not computed: {}", reason.describe())));
            }
        }
        cells
    }
}

impl TabularRecord for ValuedCashEvent {
    const HEADERS: &'static [&'static str] = &[
        "Date",
        "Type",
        "ESPP Value (USD)",
        "RSU Value (USD)",
        "Combined Value (USD)",
        "Exchange Rate",
        "Combined Value (INR)",
    ];

    fn cells(&self) -> Vec<OutputCell> {
        vec![
            OutputCell::Date(self.event.date),
            OutputCell::text(self.event.kind.label()),
            OutputCell::Amount(self.event.espp_usd),
            OutputCell::Amount(self.event.rsu_usd),
            OutputCell::Amount(self.combined_usd),
            OutputCell::optional_exact(self.conversion.rate()),
            OutputCell::Amount(self.combined_inr),
        ]
    }
}

fn snapshot_cells(snapshot: Option<&CashSnapshot>, with_parts: bool) -> Vec<OutputCell> {
    let amount = |f: fn(&CashSnapshot) -> Decimal| {
        OutputCell::optional_amount(snapshot.map(f))
    };

    let mut cells = vec![OutputCell::optional_date(snapshot.map(|s| s.entry.date))];
    if with_parts {
        cells.push(amount(|s| s.espp_usd));
        cells.push(amount(|s| s.rsu_usd));
    }
    cells.push(amount(|s| s.entry.balance_usd));
    cells.push(amount(|s| s.entry.value_inr));
    cells
}

impl TabularRecord for CashSummary {
    const HEADERS: &'static [&'static str] = &[
        "Opening Date",
        "Opening ESPP (USD)",
        "Opening RSU (USD)",
        "Opening Combined (USD)",
        "Opening Combined (INR)",
        "Closing Date",
        "Closing ESPP (USD)",
        "Closing RSU (USD)",
        "Closing Combined (USD)",
        "Closing Combined (INR)",
        "Peak Date",
        "Peak Combined Value (USD)",
        "Peak Combined Value (INR)",
    ];

    fn cells(&self) -> Vec<OutputCell> {
        let mut cells = snapshot_cells(self.opening.as_ref(), true);
        cells.extend(snapshot_cells(self.closing.as_ref(), true));
        cells.extend(snapshot_cells(self.peak.as_ref(), false));
        cells
    }
}

impl TabularRecord for Diagnostic {
    const HEADERS: &'static [&'static str] = &["Kind", "Message"];

    fn cells(&self) -> Vec<OutputCell> {
        vec![
            OutputCell::text(self.kind.as_str()),
            OutputCell::text(self.message.clone()),
        ]
    }
}

fn purchases(trades: &[ValuedTrade]) -> Vec<PurchaseRow<'_>> {
    trades.iter().map(PurchaseRow).collect()
}

fn sales(trades: &[ValuedTrade]) -> Vec<SaleRow<'_>> {
    trades.iter().map(SaleRow).collect()
}

/// Every output table of `report`, in sheet order.
///
/// The five transaction sheets are always present; the others only when
/// they have content.
pub fn build_tables(report: &ItrReport) -> Vec<Table> {
    let mut tables = vec![
        Table::from_records(DIVIDEND_SHEET, &report.dividends),
        Table::from_records(ESPP_BUY_SHEET, &purchases(&report.espp_buys)),
        Table::from_records(ESPP_SALE_SHEET, &sales(&report.espp_sales)),
        Table::from_records(RSU_VEST_SHEET, &purchases(&report.rsu_vests)),
        Table::from_records(RSU_SALE_SHEET, &sales(&report.rsu_sales)),
    ];

    if !report.espp_gains.matches.is_empty() {
        tables.push(Table::from_records(ESPP_MATCHED_SHEET, &report.espp_gains.matches));
    }
    if !report.rsu_gains.matches.is_empty() {
        tables.push(Table::from_records(RSU_MATCHED_SHEET, &report.rsu_gains.matches));
    }

    let gains = &report.capital_gains;
    if gains.has_gains() {
        let mut rows = Vec::new();
        if let Some(espp) = &gains.espp {
            rows.push(GainsRow { category: "ESPP", summary: espp });
        }
        if let Some(rsu) = &gains.rsu {
            rows.push(GainsRow { category: "RSU", summary: rsu });
        }
        rows.push(GainsRow { category: "Combined", summary: &gains.combined });
        tables.push(Table::from_records(CAPITAL_GAINS_SHEET, &rows));
    }

    for (ledger, details, summary) in [
        (&report.espp_assets, ESPP_FA_DETAILS_SHEET, ESPP_FA_SUMMARY_SHEET),
        (&report.rsu_assets, RSU_FA_DETAILS_SHEET, RSU_FA_SUMMARY_SHEET),
    ] {
        if let Some(ledger) = ledger {
            if !ledger.events.is_empty() {
                tables.push(Table::from_records(details, &ledger.events));
            }
            tables.push(Table::from_records(summary, [&ledger.summary]));
        }
    }

    if let Some(cash) = &report.cash {
        if !cash.events.is_empty() {
            tables.push(Table::from_records(CASH_DETAILS_SHEET, &cash.events));
        }
        tables.push(Table::from_records(CASH_SUMMARY_SHEET, [&cash.summary]));
    }

    if !report.diagnostics.is_empty() {
        tables.push(Table::from_records(DIAGNOSTICS_SHEET, &report.diagnostics));
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EquityTrade;
    use crate::rates::RateQuote;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trade_row_without_rate() {
        let trade = ValuedTrade {
            trade: EquityTrade {
                date: date(2023, 5, 2),
                price_per_share_usd: dec!(70),
                shares: dec!(1.5),
            },
            conversion: Conversion {
                reference_date: date(2023, 4, 30),
                quote: None,
            },
            total_usd: dec!(105),
            price_per_share_inr: dec!(0),
            total_inr: dec!(0),
        };

        let cells = SaleRow(&trade).cells();
        assert_eq!(cells.len(), SaleRow::HEADERS.len());
        assert_eq!(cells[1], OutputCell::Date(date(2023, 4, 30)));
        assert_eq!(cells[2], OutputCell::NotAvailable);
        assert_eq!(cells[3], OutputCell::NotAvailable);
        assert_eq!(cells[5], OutputCell::Exact(dec!(1.5)));
    }

    #[test]
    fn test_dividend_row_with_rate() {
        let dividend = ValuedDividend {
            dividend: crate::models::Dividend {
                date: date(2023, 5, 2),
                amount_usd: dec!(100),
                tax_usd: dec!(25),
            },
            conversion: Conversion {
                reference_date: date(2023, 4, 30),
                quote: Some(RateQuote {
                    rate: dec!(82.50),
                    date: date(2023, 4, 28),
                }),
            },
            value_inr: dec!(8250),
            tax_inr: dec!(2062.5),
        };

        let cells = dividend.cells();
        assert_eq!(cells.len(), ValuedDividend::HEADERS.len());
        assert_eq!(cells[2], OutputCell::Date(date(2023, 4, 28)));
        assert_eq!(cells[3], OutputCell::Exact(dec!(82.50)));
        assert_eq!(cells[7], OutputCell::Amount(dec!(2062.5)));
    }
}
