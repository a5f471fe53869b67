//! Typed failures that abort a run.
//!
//! Everything recoverable is a [`crate::diagnostics::Diagnostic`] instead.
//! Callers work in `anyhow::Result` and attach context on the way up.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ItrError {
    #[error("sheet not found: {0}")]
    MissingSheet(String),

    #[error("column '{column}' not found in sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    /// SBI reference rate table could not be read or fetched
    #[error("rate source error: {0}")]
    RateSource(String),

    /// Daily close series could not be fetched
    #[error("price source error: {0}")]
    PriceSource(String),
}

pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_missing_column_names_sheet() {
        let err = ItrError::MissingColumn {
            sheet: "ESPP-Buy".to_string(),
            column: "No. of Shares".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "column 'No. of Shares' not found in sheet 'ESPP-Buy'"
        );
    }

    #[test]
    fn test_context_keeps_typed_cause() {
        let result: Result<()> = Err(ItrError::RateSource("empty table".into()))
            .context("Failed to download SBI reference rates");

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Failed to download SBI reference rates");
        assert!(matches!(
            err.downcast_ref::<ItrError>(),
            Some(ItrError::RateSource(_))
        ));
        assert!(format!("{:?}", err).contains("empty table"));
    }
}
