//! Recoverable conditions raised while processing a batch.
//!
//! Nothing collected here aborts the run; every entry is logged at `warn`
//! when recorded and carried into the report so the output shows what was
//! skipped or left unvalued.

use serde::Serialize;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    RowSkipped,
    MissingRate,
    UnmatchedShares,
    MissingSheet,
    PriceSeriesUnavailable,
    PeakSkipped,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::RowSkipped => "ROW_SKIPPED",
            DiagnosticKind::MissingRate => "MISSING_RATE",
            DiagnosticKind::UnmatchedShares => "UNMATCHED_SHARES",
            DiagnosticKind::MissingSheet => "MISSING_SHEET",
            DiagnosticKind::PriceSeriesUnavailable => "PRICE_SERIES_UNAVAILABLE",
            DiagnosticKind::PeakSkipped => "PEAK_SKIPPED",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        warn!("[{}] {}", kind, message);
        self.entries.push(Diagnostic { kind, message });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
