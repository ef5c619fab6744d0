//! Migration of legacy spreadsheet formulas to macro text.
//!
//! - [`expr`]: the formula grammar
//! - [`formula`]: source cells and migrated formulas
//! - [`layout`]: where data sets and attributes sit in a workbook
//! - [`adapters`]: one converter per formula family
//! - [`pipeline`]: adapter selection and the fallout report
//!
//! Nothing is lost: a cell no adapter can convert keeps its original text as
//! a [`FormulaType::Unknown`] formula and gets a [`FalloutReport`] entry.

pub mod adapters;
pub mod expr;
pub mod fallout;
pub mod formula;
pub mod layout;
pub mod pipeline;
mod translate;

use thiserror::Error;

pub use adapters::{FormulaAdapter, builtin_adapters};
pub use fallout::{FalloutEntry, FalloutReason, FalloutReport};
pub use formula::{Cell, CellLocation, Formula, FormulaType};
pub use layout::{SheetLayout, WorkbookLayout};
pub use pipeline::MigrationPipeline;
pub use translate::MAX_RANGE_CELLS;

/// Why an adapter could not convert a cell it matched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformationError {
    #[error("unknown sheet `{0}`")]
    UnknownSheet(String),

    #[error("`{reference}` is not a parameter cell: {reason}")]
    NotADataCell { reference: String, reason: String },

    #[error("unsupported {0}")]
    Unsupported(String),

    #[error("invalid formula: {0}")]
    InvalidFormat(String),

    #[error("range {range} spans {cells} cells")]
    RangeTooLarge { range: String, cells: u64 },
}
