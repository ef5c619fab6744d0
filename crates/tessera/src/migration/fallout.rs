//! Cells the migration could not convert.

use std::fmt;

use log::warn;
use serde::Serialize;

use crate::migration::formula::CellLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FalloutReason {
    /// No adapter recognised the formula, or it did not parse
    UnknownFormula,
    /// An adapter matched but failed
    TransformationFailed,
}

impl fmt::Display for FalloutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FalloutReason::UnknownFormula => write!(f, "unknown formula"),
            FalloutReason::TransformationFailed => write!(f, "transformation failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FalloutEntry {
    location: CellLocation,
    original: String,
    reason: FalloutReason,
    detail: Option<String>,
}

impl FalloutEntry {
    pub fn location(&self) -> &CellLocation {
        &self.location
    }

    /// The cell text as found in the workbook
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn reason(&self) -> FalloutReason {
        self.reason
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

/// Every cell that needs manual attention, in the order it was met.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FalloutReport {
    entries: Vec<FalloutEntry>,
}

impl FalloutReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        location: CellLocation,
        original: impl Into<String>,
        reason: FalloutReason,
        detail: Option<String>,
    ) {
        let original = original.into();
        warn!(
            location = location.to_string(),
            reason = reason.to_string(),
            detail:?;
            "Formula left for manual migration"
        );
        self.entries.push(FalloutEntry {
            location,
            original,
            reason,
            detail,
        });
    }

    pub fn entries(&self) -> &[FalloutEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries recorded for `reason`.
    pub fn by_reason(&self, reason: FalloutReason) -> impl Iterator<Item = &FalloutEntry> {
        self.entries.iter().filter(move |entry| entry.reason == reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_order() {
        let mut report = FalloutReport::new();
        assert!(report.is_empty());

        report.record(
            CellLocation::new("S", "B", 2),
            "=VLOOKUP(A1,B:C,2)",
            FalloutReason::UnknownFormula,
            None,
        );
        report.record(
            CellLocation::new("S", "C", 2),
            "=Z9",
            FalloutReason::TransformationFailed,
            Some("column Z has no data set header".to_string()),
        );

        assert_eq!(report.len(), 2);
        assert_eq!(report.entries()[0].original(), "=VLOOKUP(A1,B:C,2)");
        assert_eq!(report.entries()[1].location().to_string(), "S!C2");
        assert_eq!(
            report
                .by_reason(FalloutReason::TransformationFailed)
                .map(FalloutEntry::original)
                .collect::<Vec<_>>(),
            ["=Z9"]
        );
    }

    #[test]
    fn test_reason_names() {
        assert_eq!(FalloutReason::UnknownFormula.to_string(), "unknown formula");
        assert_eq!(
            FalloutReason::TransformationFailed.to_string(),
            "transformation failed"
        );
    }
}
