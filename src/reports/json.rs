use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};

use super::{OutputCell, Table};
use crate::utils::{format_date, NOT_AVAILABLE};

fn cell_value(cell: &OutputCell) -> Value {
    match cell {
        OutputCell::Text(text) => Value::String(text.clone()),
        OutputCell::Date(date) => Value::String(format_date(*date)),
        OutputCell::NotAvailable => Value::String(NOT_AVAILABLE.to_string()),
        OutputCell::Integer(i) => Value::from(*i),
        numeric => numeric
            .presented_number()
            .and_then(|d| d.to_f64())
            .map(Value::from)
            .unwrap_or(Value::Null),
    }
}

/// JSON document mirroring the workbook: sheet name to an array of row
/// objects keyed by column header, in sheet and column order.
pub fn render_json(tables: &[Table]) -> Value {
    let mut sheets = Map::new();
    for table in tables {
        let rows = table
            .rows
            .iter()
            .map(|cells| {
                let row: Map<String, Value> = table
                    .headers
                    .iter()
                    .zip(cells)
                    .map(|(header, cell)| (header.to_string(), cell_value(cell)))
                    .collect();
                Value::Object(row)
            })
            .collect();
        sheets.insert(table.sheet.to_string(), Value::Array(rows));
    }
    Value::Object(sheets)
}
