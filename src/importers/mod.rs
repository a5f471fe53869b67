// Import module - input workbook reader

mod workbook;

use anyhow::{anyhow, Result};
use std::path::Path;

pub use workbook::{inspect_workbook, read_workbook, SheetInfo, SourceWorkbook};

/// Spreadsheet formats calamine can open
const SUPPORTED_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Reject paths that are not a spreadsheet before opening them
pub fn check_workbook_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("File has no extension: {:?}", path))?
        .to_lowercase();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(anyhow!(
            "Unsupported file format: {}. Supported formats: .xlsx, .xlsm, .xlsb, .xls, .ods",
            extension
        ));
    }

    if !path.exists() {
        return Err(anyhow!("Input workbook not found: {:?}", path));
    }

    Ok(())
}
