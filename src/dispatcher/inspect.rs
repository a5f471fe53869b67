use anyhow::Result;
use serde_json::json;
use std::path::Path;

use itr_calc::importers::inspect_workbook;

use crate::cli::formatters::format_sheet_list;

pub async fn dispatch_inspect(file: &Path, json_output: bool) -> Result<()> {
    let sheets = inspect_workbook(file)?;

    if json_output {
        let value: Vec<_> = sheets
            .iter()
            .map(|s| json!({ "sheet": s.name, "rows": s.data_rows, "headers": s.headers }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", format_sheet_list(&sheets));
    }
    Ok(())
}
