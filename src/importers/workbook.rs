use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{AssetSheet, CashSheet, ColumnRef, DividendSheet, SheetsConfig, TradeSheet};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::ItrError;
use crate::normalize::{
    excel_serial_to_date, RawAssetRow, RawCashRow, RawCell, RawDividendRow, RawTradeRow,
};

/// Raw rows of every input category, columns already resolved
#[derive(Debug, Clone, Default)]
pub struct SourceWorkbook {
    pub dividends: Vec<RawDividendRow>,
    pub espp_buys: Vec<RawTradeRow>,
    pub espp_sales: Vec<RawTradeRow>,
    pub rsu_vests: Vec<RawTradeRow>,
    pub rsu_sales: Vec<RawTradeRow>,
    /// `None` when the optional sheet is absent
    pub espp_assets: Option<Vec<RawAssetRow>>,
    pub rsu_assets: Option<Vec<RawAssetRow>>,
    pub cash: Option<Vec<RawCashRow>>,
}

/// Sheet name and header row, for `inspect`
#[derive(Debug, Clone)]
pub struct SheetInfo {
    pub name: String,
    pub headers: Vec<String>,
    pub data_rows: usize,
}

/// One worksheet: first row as headers, remaining non-empty rows as cells
struct SheetTable {
    name: String,
    headers: Vec<String>,
    /// (1-based spreadsheet line, cells)
    rows: Vec<(usize, Vec<RawCell>)>,
}

impl SheetTable {
    fn from_range(name: &str, range: &Range<Data>) -> Self {
        let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
        let mut rows_iter = range.rows();

        let headers = rows_iter
            .next()
            .map(|row| row.iter().map(|c| to_raw_cell(c).text()).collect())
            .unwrap_or_default();

        let rows = rows_iter
            .enumerate()
            .map(|(idx, row)| (first_line + idx + 1, row.iter().map(to_raw_cell).collect::<Vec<_>>()))
            .filter(|(_, cells)| !cells.iter().all(RawCell::is_empty))
            .collect();

        Self {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    fn column(&self, column: &ColumnRef) -> Result<usize> {
        column.resolve(&self.headers).ok_or_else(|| {
            ItrError::MissingColumn {
                sheet: self.name.clone(),
                column: column.to_string(),
            }
            .into()
        })
    }

    fn cell(cells: &[RawCell], idx: usize) -> RawCell {
        cells.get(idx).cloned().unwrap_or(RawCell::Empty)
    }
}

/// Map a calamine cell to a raw cell; formula errors read as empty
pub fn to_raw_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty | Data::Error(_) => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
            Ok(date) => RawCell::Date(date),
            Err(_) => RawCell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
    }
}

fn read_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>, name: &str) -> Result<Option<SheetTable>> {
    if !workbook.sheet_names().iter().any(|s| s == name) {
        return Ok(None);
    }

    let range = workbook
        .worksheet_range(name)
        .with_context(|| format!("Failed to read worksheet '{}'", name))?;

    let table = SheetTable::from_range(name, &range);
    debug!("Sheet '{}': {} data rows, headers {:?}", name, table.rows.len(), table.headers);
    Ok(Some(table))
}

fn require_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>, name: &str) -> Result<SheetTable> {
    read_sheet(workbook, name)?.ok_or_else(|| ItrError::MissingSheet(name.to_string()).into())
}

fn dividend_rows(table: &SheetTable, schema: &DividendSheet) -> Result<Vec<RawDividendRow>> {
    let date = table.column(&schema.date)?;
    let amount = table.column(&schema.amount)?;
    let tax = schema.tax.as_ref().and_then(|column| {
        let idx = column.resolve(&table.headers);
        if idx.is_none() {
            warn!("Sheet '{}' has no '{}' column, dividend tax read as zero", table.name, column);
        }
        idx
    });

    Ok(table
        .rows
        .iter()
        .map(|(line, cells)| RawDividendRow {
            line: *line,
            date: SheetTable::cell(cells, date),
            amount: SheetTable::cell(cells, amount),
            tax: tax.map_or(RawCell::Empty, |idx| SheetTable::cell(cells, idx)),
        })
        .collect())
}

fn trade_rows(table: &SheetTable, schema: &TradeSheet) -> Result<Vec<RawTradeRow>> {
    let date = table.column(&schema.date)?;
    let price = table.column(&schema.price)?;
    let shares = table.column(&schema.shares)?;

    Ok(table
        .rows
        .iter()
        .map(|(line, cells)| RawTradeRow {
            line: *line,
            date: SheetTable::cell(cells, date),
            price_per_share: SheetTable::cell(cells, price),
            shares: SheetTable::cell(cells, shares),
        })
        .collect())
}

fn asset_rows(table: &SheetTable, schema: &AssetSheet) -> Result<Vec<RawAssetRow>> {
    let date = table.column(&schema.date)?;
    let kind = table.column(&schema.kind)?;
    let shares = table.column(&schema.shares)?;
    let cash = table.column(&schema.cash)?;
    let market_value = table.column(&schema.market_value)?;

    Ok(table
        .rows
        .iter()
        .map(|(line, cells)| RawAssetRow {
            line: *line,
            date: SheetTable::cell(cells, date),
            kind: SheetTable::cell(cells, kind),
            shares: SheetTable::cell(cells, shares),
            cash: SheetTable::cell(cells, cash),
            market_value: SheetTable::cell(cells, market_value),
        })
        .collect())
}

fn cash_rows(table: &SheetTable, schema: &CashSheet) -> Result<Vec<RawCashRow>> {
    let date = table.column(&schema.date)?;
    let kind = table.column(&schema.kind)?;
    let espp = table.column(&schema.espp)?;
    let rsu = table.column(&schema.rsu)?;

    Ok(table
        .rows
        .iter()
        .map(|(line, cells)| RawCashRow {
            line: *line,
            date: SheetTable::cell(cells, date),
            kind: SheetTable::cell(cells, kind),
            espp: SheetTable::cell(cells, espp),
            rsu: SheetTable::cell(cells, rsu),
        })
        .collect())
}

fn required_trades<RS: Read + Seek>(
    workbook: &mut Sheets<RS>,
    schema: &TradeSheet,
) -> Result<Vec<RawTradeRow>> {
    trade_rows(&require_sheet(workbook, &schema.name)?, schema)
}

/// Optional sheets that are absent, or lack a configured column, are
/// skipped with a diagnostic.
fn optional_rows<RS, T>(
    workbook: &mut Sheets<RS>,
    name: &str,
    diags: &mut Diagnostics,
    extract: impl Fn(&SheetTable) -> Result<Vec<T>>,
) -> Result<Option<Vec<T>>>
where
    RS: Read + Seek,
{
    let Some(table) = read_sheet(workbook, name)? else {
        diags.push(
            DiagnosticKind::MissingSheet,
            format!("sheet '{}' not found, skipped", name),
        );
        return Ok(None);
    };

    match extract(&table) {
        Ok(rows) => Ok(Some(rows)),
        Err(e) => {
            diags.push(DiagnosticKind::MissingSheet, format!("{}, sheet skipped", e));
            Ok(None)
        }
    }
}

/// Read every configured sheet of the input workbook.
///
/// The five transaction sheets are required: a missing sheet or column is an
/// error. Asset and cash ledgers are optional.
pub fn read_workbook<P: AsRef<Path>>(
    path: P,
    schema: &SheetsConfig,
    diags: &mut Diagnostics,
) -> Result<SourceWorkbook> {
    let path = path.as_ref();
    info!("Reading workbook {:?}", path);

    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Failed to open workbook {:?}", path))?;
    debug!("Available sheets: {:?}", workbook.sheet_names());

    let source = SourceWorkbook {
        dividends: dividend_rows(
            &require_sheet(&mut workbook, &schema.dividend.name)?,
            &schema.dividend,
        )?,
        espp_buys: required_trades(&mut workbook, &schema.espp_buy)?,
        espp_sales: required_trades(&mut workbook, &schema.espp_sale)?,
        rsu_vests: required_trades(&mut workbook, &schema.rsu_vest)?,
        rsu_sales: required_trades(&mut workbook, &schema.rsu_sale)?,
        espp_assets: optional_rows(&mut workbook, &schema.espp_assets.name, diags, |t| {
            asset_rows(t, &schema.espp_assets)
        })?,
        rsu_assets: optional_rows(&mut workbook, &schema.rsu_assets.name, diags, |t| {
            asset_rows(t, &schema.rsu_assets)
        })?,
        cash: optional_rows(&mut workbook, &schema.cash.name, diags, |t| {
            cash_rows(t, &schema.cash)
        })?,
    };

    info!(
        "Read {} dividend, {} ESPP buy, {} ESPP sale, {} RSU vest, {} RSU sale rows",
        source.dividends.len(),
        source.espp_buys.len(),
        source.espp_sales.len(),
        source.rsu_vests.len(),
        source.rsu_sales.len()
    );

    Ok(source)
}

/// List sheets with their header rows
pub fn inspect_workbook<P: AsRef<Path>>(path: P) -> Result<Vec<SheetInfo>> {
    let path = path.as_ref();
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Failed to open workbook {:?}", path))?;

    let names = workbook.sheet_names();
    if names.is_empty() {
        return Err(anyhow!("No sheets found in workbook {:?}", path));
    }

    names
        .iter()
        .map(|name| {
            let table = require_sheet(&mut workbook, name)?;
            Ok(SheetInfo {
                name: table.name,
                headers: table.headers,
                data_rows: table.rows.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
    use tempfile::TempDir;

    fn write_trade_sheet(workbook: &mut Workbook, name: &str, rows: &[(&str, f64, f64)]) {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name).unwrap();
        sheet.write_string(0, 0, "Transaction date").unwrap();
        sheet.write_string(0, 1, "Purchase/Sale FMV (in $)").unwrap();
        sheet.write_string(0, 2, "No. of Shares").unwrap();
        for (i, (date, price, shares)) in rows.iter().enumerate() {
            let r = i as u32 + 1;
            sheet.write_string(r, 0, *date).unwrap();
            sheet.write_number(r, 1, *price).unwrap();
            sheet.write_number(r, 2, *shares).unwrap();
        }
    }

    fn write_required(workbook: &mut Workbook) {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Dividend_FY").unwrap();
        sheet.write_string(0, 0, "Date").unwrap();
        sheet.write_string(0, 1, "Value").unwrap();
        sheet.write_string(0, 2, "Tax").unwrap();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let date = ExcelDateTime::from_ymd(2023, 5, 17).unwrap();
        sheet.write_datetime_with_format(1, 0, &date, &date_format).unwrap();
        sheet.write_number(1, 1, 100.0).unwrap();
        sheet.write_number(1, 2, 25.0).unwrap();

        write_trade_sheet(workbook, "ESPP-Buy", &[("10/01/2022", 40.0, 100.0)]);
        write_trade_sheet(workbook, "ESPP-Sale", &[]);
        write_trade_sheet(workbook, "RSU-Vest", &[("15/03/2023", 55.5, 8.0)]);
        write_trade_sheet(workbook, "RSU-Sale", &[]);
    }

    #[test]
    fn test_read_required_sheets() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("input.xlsx");
        let mut workbook = Workbook::new();
        write_required(&mut workbook);
        workbook.save(&path).unwrap();

        let mut diags = Diagnostics::new();
        let source = read_workbook(&path, &SheetsConfig::default(), &mut diags).unwrap();

        assert_eq!(source.dividends.len(), 1);
        assert_eq!(source.dividends[0].line, 2);
        assert_eq!(
            source.dividends[0].date,
            RawCell::Date(NaiveDate::from_ymd_opt(2023, 5, 17).unwrap())
        );
        assert_eq!(source.dividends[0].amount, RawCell::Number(100.0));
        assert_eq!(source.espp_buys[0].date, RawCell::Text("10/01/2022".to_string()));
        assert!(source.espp_sales.is_empty());
        assert_eq!(source.rsu_vests[0].shares, RawCell::Number(8.0));

        assert!(source.espp_assets.is_none());
        assert!(source.cash.is_none());
        assert_eq!(diags.count(DiagnosticKind::MissingSheet), 3);
    }

    #[test]
    fn test_missing_required_sheet_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("input.xlsx");
        let mut workbook = Workbook::new();
        write_trade_sheet(&mut workbook, "ESPP-Buy", &[]);
        workbook.save(&path).unwrap();

        let mut diags = Diagnostics::new();
        let err = read_workbook(&path, &SheetsConfig::default(), &mut diags).unwrap_err();
        assert!(err.to_string().contains("Dividend_FY"));
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("input.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Dividend_FY").unwrap();
        sheet.write_string(0, 0, "Date").unwrap();
        sheet.write_string(0, 1, "Tax").unwrap();
        workbook.save(&path).unwrap();

        let mut diags = Diagnostics::new();
        let err = read_workbook(&path, &SheetsConfig::default(), &mut diags).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Dividend_FY"));
        assert!(message.contains("Value"));
    }

    #[test]
    fn test_dividend_sheet_without_tax_column() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("input.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Dividend_FY").unwrap();
        sheet.write_string(0, 0, "Date").unwrap();
        sheet.write_string(0, 1, "Value").unwrap();
        sheet.write_string(1, 0, "17/05/2023").unwrap();
        sheet.write_number(1, 1, 100.0).unwrap();
        write_trade_sheet(&mut workbook, "ESPP-Buy", &[]);
        write_trade_sheet(&mut workbook, "ESPP-Sale", &[]);
        write_trade_sheet(&mut workbook, "RSU-Vest", &[]);
        write_trade_sheet(&mut workbook, "RSU-Sale", &[]);
        workbook.save(&path).unwrap();

        let mut diags = Diagnostics::new();
        let source = read_workbook(&path, &SheetsConfig::default(), &mut diags).unwrap();

        assert_eq!(source.dividends.len(), 1);
        assert_eq!(source.dividends[0].amount, RawCell::Number(100.0));
        assert_eq!(source.dividends[0].tax, RawCell::Empty);

        let dividends = crate::normalize::normalize_dividends("Dividend_FY", &source.dividends, &mut diags);
        assert_eq!(dividends[0].tax_usd, rust_decimal::Decimal::ZERO);
    }

    #[test]
    fn test_inspect_lists_headers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("input.xlsx");
        let mut workbook = Workbook::new();
        write_required(&mut workbook);
        workbook.save(&path).unwrap();

        let sheets = inspect_workbook(&path).unwrap();
        assert_eq!(sheets.len(), 5);
        assert_eq!(sheets[0].name, "Dividend_FY");
        assert_eq!(sheets[0].headers, vec!["Date", "Value", "Tax"]);
        assert_eq!(sheets[1].data_rows, 1);
    }
}
