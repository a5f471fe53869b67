//! Workbook writer: one worksheet per output table

use anyhow::Context;
use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};
use std::path::Path;
use tracing::info;

use super::{OutputCell, Table};
use crate::error::Result;
use crate::utils::NOT_AVAILABLE;

const MAX_COLUMN_WIDTH: usize = 40;

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &OutputCell,
    date_format: &Format,
) -> Result<()> {
    match cell {
        OutputCell::Text(text) => {
            sheet.write_string(row, col, text)?;
        }
        OutputCell::Date(date) => {
            let datetime =
                ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8)?;
            sheet.write_datetime_with_format(row, col, &datetime, date_format)?;
        }
        OutputCell::NotAvailable => {
            sheet.write_string(row, col, NOT_AVAILABLE)?;
        }
        numeric => {
            let value = numeric
                .presented_number()
                .and_then(|d| d.to_f64())
                .unwrap_or_default();
            sheet.write_number(row, col, value)?;
        }
    }
    Ok(())
}

fn write_table(workbook: &mut Workbook, table: &Table) -> Result<()> {
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let sheet = workbook.add_worksheet();
    sheet.set_name(table.sheet)?;

    for (col, header) in table.headers.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &header_format)?;
        let width = header.len().clamp(12, MAX_COLUMN_WIDTH);
        sheet.set_column_width(col, width as f64)?;
    }

    for (idx, cells) in table.rows.iter().enumerate() {
        let row = idx as u32 + 1;
        for (col, cell) in cells.iter().enumerate() {
            write_cell(sheet, row, col as u16, cell, &date_format)?;
        }
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Write every table to a new workbook at `path`, replacing any existing file
pub fn write_xlsx<P: AsRef<Path>>(tables: &[Table], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut workbook = Workbook::new();

    for table in tables {
        write_table(&mut workbook, table)
            .with_context(|| format!("Failed to write sheet {}", table.sheet))?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save workbook {:?}", path))?;
    info!("Wrote {} sheets to {:?}", tables.len(), path);
    Ok(())
}
