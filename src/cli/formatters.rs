//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of calculation from presentation.

use chrono::NaiveDate;
use colored::Colorize;
use rust_decimal::Decimal;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use itr_calc::calculator::ItrReport;
use itr_calc::importers::SheetInfo;
use itr_calc::portfolio::{CashSummary, PeakValue, ScheduleFaSummary, TimelineEntry};
use itr_calc::tax::MatchOutcome;
use itr_calc::utils::{format_date, format_inr, format_optional, format_usd};
use itr_calc::valuation::Conversion;

/// Matched rows shown per instrument before truncating
const PREVIEW_ROWS: usize = 5;

fn section(title: &str) -> String {
    format!("\n{} {}\n", "▸".cyan().bold(), title.bold())
}

fn signed_inr(value: Decimal) -> String {
    let text = format_inr(value);
    if value >= Decimal::ZERO {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}

fn format_counts(report: &ItrReport) -> String {
    let mut output = section("Records processed");
    let counts = [
        ("Dividends", report.dividends.len()),
        ("ESPP purchases", report.espp_buys.len()),
        ("ESPP sales", report.espp_sales.len()),
        ("RSU vests", report.rsu_vests.len()),
        ("RSU sales", report.rsu_sales.len()),
    ];
    for (label, count) in counts {
        output.push_str(&format!("  {:<18} {}\n", format!("{}:", label), count));
    }
    output
}

fn format_matches(label: &str, outcome: &MatchOutcome) -> String {
    #[derive(Tabled)]
    struct MatchRow {
        #[tabled(rename = "Sale Date")]
        sale_date: String,
        #[tabled(rename = "Purchase Date")]
        purchase_date: String,
        #[tabled(rename = "Days")]
        days: i64,
        #[tabled(rename = "Type")]
        gain_type: String,
        #[tabled(rename = "Shares")]
        shares: String,
        #[tabled(rename = "Gain/Loss (INR)")]
        gain: String,
    }

    if outcome.matches.is_empty() {
        return String::new();
    }

    let mut output = section(&format!("{} matched transactions", label));
    let rows: Vec<MatchRow> = outcome
        .matches
        .iter()
        .take(PREVIEW_ROWS)
        .map(|m| MatchRow {
            sale_date: format_date(m.sale_date),
            purchase_date: format_date(m.purchase_date),
            days: m.holding_days,
            gain_type: m.gain_type.as_str().to_string(),
            shares: m.shares_matched.normalize().to_string(),
            gain: signed_inr(m.gain_inr),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(2..), Alignment::right());
    output.push_str(&table.to_string());
    output.push('\n');

    if outcome.matches.len() > PREVIEW_ROWS {
        output.push_str(&format!(
            "  ... and {} more\n",
            outcome.matches.len() - PREVIEW_ROWS
        ));
    }
    if !outcome.unmatched.is_empty() {
        output.push_str(&format!(
            "  {} {} shares sold without a matching lot\n",
            "⚠".yellow(),
            outcome.shares_unmatched().normalize()
        ));
    }
    output
}

fn format_capital_gains(report: &ItrReport) -> String {
    #[derive(Tabled)]
    struct GainsRow {
        #[tabled(rename = "Category")]
        category: &'static str,
        #[tabled(rename = "Total Gain/Loss")]
        total: String,
        #[tabled(rename = "LTCG")]
        ltcg: String,
        #[tabled(rename = "STCG")]
        stcg: String,
    }

    let gains = &report.capital_gains;
    if !gains.has_gains() {
        return String::new();
    }

    let rows: Vec<GainsRow> = [
        ("ESPP", gains.espp.as_ref()),
        ("RSU", gains.rsu.as_ref()),
        ("Combined", Some(&gains.combined)),
    ]
    .into_iter()
    .filter_map(|(category, summary)| {
        summary.map(|s| GainsRow {
            category,
            total: signed_inr(s.total_gain),
            ltcg: format_inr(s.ltcg),
            stcg: format_inr(s.stcg),
        })
    })
    .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());

    let mut output = section("Capital gains");
    output.push_str(&table.to_string());
    output.push('\n');
    output
}

fn rate_suffix(conversion: &Conversion) -> String {
    format_optional(conversion.rate(), |r| format!(" @ {}", r.normalize()))
}

fn entry_line(label: &str, entry: Option<&TimelineEntry>) -> String {
    match entry {
        Some(e) => format!(
            "  {:<10} {}  {} = {}{}\n",
            label,
            format_date(e.date),
            format_usd(e.balance_usd),
            format_inr(e.value_inr),
            rate_suffix(&e.conversion)
        ),
        None => format!("  {:<10} {}\n", label, "N/A".dimmed()),
    }
}

fn format_schedule_fa(summary: &ScheduleFaSummary) -> String {
    let mut output = section(&format!("Schedule FA - {}", summary.instrument.as_str()));
    output.push_str(&entry_line("Opening:", summary.opening.as_ref()));
    output.push_str(&entry_line("Closing:", summary.closing.as_ref()));
    output.push_str(&format!(
        "  {:<10} {}\n",
        "Shares:",
        summary.total_shares.normalize()
    ));
    if summary.positive_cash_usd > Decimal::ZERO {
        output.push_str(&format!(
            "  {:<10} {} = {}\n",
            "Cash in:",
            format_usd(summary.positive_cash_usd),
            format_inr(summary.positive_cash_inr)
        ));
    }

    match &summary.peak {
        PeakValue::Computed(peak) => output.push_str(&format!(
            "  {:<10} {}  {} x {} = {} = {}{}\n",
            "Peak:",
            format_date(peak.date),
            peak.shares.normalize(),
            format_usd(peak.price_usd),
            format_usd(peak.value_usd),
            format_inr(peak.value_inr).bold(),
            rate_suffix(&peak.conversion)
        )),
        PeakValue::Skipped(reason) => output.push_str(&format!(
            "  {:<10} {} ({})\n",
            "Peak:",
            "not computed".yellow(),
            reason.describe()
        )),
    }
    output
}

fn format_cash(summary: &CashSummary) -> String {
    let mut output = section("Combined portfolio (cash)");
    output.push_str(&entry_line("Opening:", summary.opening.as_ref().map(|s| &s.entry)));
    output.push_str(&entry_line("Closing:", summary.closing.as_ref().map(|s| &s.entry)));
    output.push_str(&entry_line("Peak:", summary.peak.as_ref().map(|s| &s.entry)));
    output
}

fn format_diagnostics(report: &ItrReport) -> String {
    if report.diagnostics.is_empty() {
        return format!("\n{} No diagnostics\n", "✓".green().bold());
    }

    let mut output = section(&format!("Diagnostics ({})", report.diagnostics.len()));
    for diagnostic in &report.diagnostics {
        output.push_str(&format!(
            "  {} {:<22} {}\n",
            "⚠".yellow(),
            diagnostic.kind.as_str(),
            diagnostic.message
        ));
    }
    output
}

/// Console summary of a finished calculation
pub fn format_report_summary(report: &ItrReport) -> String {
    let mut output = format_counts(report);
    output.push_str(&format_matches("ESPP", &report.espp_gains));
    output.push_str(&format_matches("RSU", &report.rsu_gains));
    output.push_str(&format_capital_gains(report));

    for ledger in [&report.espp_assets, &report.rsu_assets].into_iter().flatten() {
        output.push_str(&format_schedule_fa(&ledger.summary));
    }
    if let Some(cash) = &report.cash {
        output.push_str(&format_cash(&cash.summary));
    }

    output.push_str(&format_diagnostics(report));
    output
}

/// Console line for `rate <DATE>`
pub fn format_rate_lookup(
    transaction_date: NaiveDate,
    month_end: &Conversion,
    exact: &Conversion,
) -> String {
    let line = |label: &str, conversion: &Conversion| {
        format!(
            "  {:<28} {}  rate {} (from {})\n",
            label,
            format_date(conversion.reference_date),
            format_optional(conversion.rate(), |r| r.normalize().to_string()).bold(),
            format_optional(conversion.rate_date(), format_date)
        )
    };

    let mut output = format!(
        "\n{} SBI TT buy rate for {}\n\n",
        "₹".cyan().bold(),
        format_date(transaction_date)
    );
    output.push_str(&line("Dividend/purchase/sale:", month_end));
    output.push_str(&line("Asset/cash ledger row:", exact));
    output
}

/// Console listing for `inspect <FILE>`
pub fn format_sheet_list(sheets: &[SheetInfo]) -> String {
    #[derive(Tabled)]
    struct SheetRow {
        #[tabled(rename = "Sheet")]
        name: String,
        #[tabled(rename = "Rows")]
        rows: usize,
        #[tabled(rename = "Headers")]
        headers: String,
    }

    let rows: Vec<SheetRow> = sheets
        .iter()
        .map(|s| SheetRow {
            name: s.name.clone(),
            rows: s.data_rows,
            headers: s.headers.join(" | "),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    format!(
        "\n{} Found {} sheet(s)\n{}\n",
        "📊".cyan().bold(),
        sheets.len(),
        table
    )
}

/// Shown after the output workbook was written
pub fn format_written(path: &std::path::Path, sheets: usize) -> String {
    format!(
        "\n{} Wrote {} sheets to {}\n",
        "✓".green().bold(),
        sheets,
        path.display().to_string().green()
    )
}
