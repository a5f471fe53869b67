//! Batch pipeline: normalized records in, `ItrReport` out.
//!
//! Everything here is synchronous and I/O free. Rates and prices are fetched
//! by the caller beforehand.

use chrono::Datelike;
use itertools::Itertools;
use tracing::info;

use crate::config::SheetsConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::importers::SourceWorkbook;
use crate::models::{AssetEvent, AssetEventKind, CashEvent, Dividend, EquityTrade, Instrument, TransactionKind};
use crate::normalize::{
    normalize_asset_events, normalize_cash_events, normalize_dividends, normalize_trades,
};
use crate::portfolio::{CashSummary, ScheduleFaSummary};
use crate::pricing::PriceHistory;
use crate::rates::RateTable;
use crate::tax::{match_sales, CapitalGainsReport, MatchOutcome, PurchaseLot, SaleEvent};
use crate::valuation::{ValuedAssetEvent, ValuedCashEvent, ValuedDividend, ValuedTrade, Valuator};

/// Typed records of every input category
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub dividends: Vec<Dividend>,
    pub espp_buys: Vec<EquityTrade>,
    pub espp_sales: Vec<EquityTrade>,
    pub rsu_vests: Vec<EquityTrade>,
    pub rsu_sales: Vec<EquityTrade>,
    pub espp_assets: Option<Vec<AssetEvent>>,
    pub rsu_assets: Option<Vec<AssetEvent>>,
    pub cash: Option<Vec<CashEvent>>,
}

impl NormalizedBatch {
    pub fn from_source(
        source: &SourceWorkbook,
        sheets: &SheetsConfig,
        diags: &mut Diagnostics,
    ) -> Self {
        Self {
            dividends: normalize_dividends(&sheets.dividend.name, &source.dividends, diags),
            espp_buys: normalize_trades(&sheets.espp_buy.name, &source.espp_buys, diags),
            espp_sales: normalize_trades(&sheets.espp_sale.name, &source.espp_sales, diags),
            rsu_vests: normalize_trades(&sheets.rsu_vest.name, &source.rsu_vests, diags),
            rsu_sales: normalize_trades(&sheets.rsu_sale.name, &source.rsu_sales, diags),
            espp_assets: source
                .espp_assets
                .as_ref()
                .map(|rows| normalize_asset_events(&sheets.espp_assets.name, rows, diags)),
            rsu_assets: source
                .rsu_assets
                .as_ref()
                .map(|rows| normalize_asset_events(&sheets.rsu_assets.name, rows, diags)),
            cash: source
                .cash
                .as_ref()
                .map(|rows| normalize_cash_events(&sheets.cash.name, rows, diags)),
        }
    }

    /// Calendar years whose daily prices the share peak values need
    pub fn peak_years(&self) -> Vec<i32> {
        [&self.espp_assets, &self.rsu_assets]
            .into_iter()
            .flatten()
            .filter_map(|events| {
                let has_opening = events.iter().any(|e| e.kind == AssetEventKind::Opening);
                let closing = events
                    .iter()
                    .filter(|e| e.kind == AssetEventKind::Closing)
                    .map(|e| e.date)
                    .max();
                closing.filter(|_| has_opening).map(|d| d.year())
            })
            .sorted()
            .dedup()
            .collect()
    }
}

/// Schedule FA rows and summary of one share ledger
#[derive(Debug, Clone)]
pub struct AssetLedgerReport {
    pub events: Vec<ValuedAssetEvent>,
    pub summary: ScheduleFaSummary,
}

#[derive(Debug, Clone)]
pub struct CashLedgerReport {
    pub events: Vec<ValuedCashEvent>,
    pub summary: CashSummary,
}

/// Everything computed for one batch
#[derive(Debug, Clone)]
pub struct ItrReport {
    pub dividends: Vec<ValuedDividend>,
    pub espp_buys: Vec<ValuedTrade>,
    pub espp_sales: Vec<ValuedTrade>,
    pub rsu_vests: Vec<ValuedTrade>,
    pub rsu_sales: Vec<ValuedTrade>,
    pub espp_gains: MatchOutcome,
    pub rsu_gains: MatchOutcome,
    pub capital_gains: CapitalGainsReport,
    pub espp_assets: Option<AssetLedgerReport>,
    pub rsu_assets: Option<AssetLedgerReport>,
    pub cash: Option<CashLedgerReport>,
    pub diagnostics: Vec<Diagnostic>,
}

fn match_instrument(
    instrument: Instrument,
    buys: &[ValuedTrade],
    sales: &[ValuedTrade],
    diags: &mut Diagnostics,
) -> MatchOutcome {
    let lots: Vec<PurchaseLot> = buys.iter().map(PurchaseLot::from).collect();
    let sale_events: Vec<SaleEvent> = sales.iter().map(SaleEvent::from).collect();

    let outcome = match_sales(lots, &sale_events);

    for unmatched in &outcome.unmatched {
        diags.push(
            DiagnosticKind::UnmatchedShares,
            format!(
                "{} sale on {} has {} unmatched shares",
                instrument.as_str(),
                unmatched.sale_date,
                unmatched.shares
            ),
        );
    }

    info!(
        "{}: matched {} sales into {} lot allocations",
        instrument.as_str(),
        sales.len(),
        outcome.matches.len()
    );
    outcome
}

fn asset_ledger(
    instrument: Instrument,
    events: &[AssetEvent],
    prices: &PriceHistory,
    valuator: &Valuator<'_>,
    diags: &mut Diagnostics,
) -> AssetLedgerReport {
    let valued = valuator.value_asset_events(events, diags);
    let closing_year = events
        .iter()
        .filter(|e| e.kind == AssetEventKind::Closing)
        .map(|e| e.date.year())
        .max();
    let series = closing_year.and_then(|year| prices.for_year(year));

    let summary = ScheduleFaSummary::build(instrument, &valued, series, valuator, diags);
    AssetLedgerReport {
        events: valued,
        summary,
    }
}

/// Run valuation, FIFO matching and Schedule FA over a normalized batch.
///
/// `diags` carries whatever was recorded while reading and normalizing; the
/// report keeps all of it.
pub fn compute(
    batch: &NormalizedBatch,
    rates: &RateTable,
    prices: &PriceHistory,
    mut diags: Diagnostics,
) -> ItrReport {
    let valuator = Valuator::new(rates);

    let dividends = valuator.value_dividends(&batch.dividends, &mut diags);
    let espp_buys = valuator.value_trades(TransactionKind::Buy, &batch.espp_buys, &mut diags);
    let espp_sales = valuator.value_trades(TransactionKind::Sale, &batch.espp_sales, &mut diags);
    let rsu_vests = valuator.value_trades(TransactionKind::Buy, &batch.rsu_vests, &mut diags);
    let rsu_sales = valuator.value_trades(TransactionKind::Sale, &batch.rsu_sales, &mut diags);

    let espp_gains = match_instrument(Instrument::Espp, &espp_buys, &espp_sales, &mut diags);
    let rsu_gains = match_instrument(Instrument::Rsu, &rsu_vests, &rsu_sales, &mut diags);
    let capital_gains = CapitalGainsReport::new(&espp_gains.matches, &rsu_gains.matches);

    let espp_assets = batch
        .espp_assets
        .as_ref()
        .map(|events| asset_ledger(Instrument::Espp, events, prices, &valuator, &mut diags));
    let rsu_assets = batch
        .rsu_assets
        .as_ref()
        .map(|events| asset_ledger(Instrument::Rsu, events, prices, &valuator, &mut diags));

    let cash = batch.cash.as_ref().map(|events| {
        let valued = valuator.value_cash_events(events, &mut diags);
        let summary = CashSummary::build(&valued, &valuator, &mut diags);
        CashLedgerReport {
            events: valued,
            summary,
        }
    });

    info!("Batch complete with {} diagnostics", diags.entries().len());

    ItrReport {
        dividends,
        espp_buys,
        espp_sales,
        rsu_vests,
        rsu_sales,
        espp_gains,
        rsu_gains,
        capital_gains,
        espp_assets,
        rsu_assets,
        cash,
        diagnostics: diags.into_vec(),
    }
}
