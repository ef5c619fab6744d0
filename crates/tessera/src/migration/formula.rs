//! Cells read from a legacy workbook and the formulas they migrate to.

use std::fmt;

use serde::Serialize;

use crate::migration::expr::{Expr, parse_formula};

/// Position of a cell: `Sheet!B3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CellLocation {
    sheet: String,
    row: u32,
    column: String,
}

impl CellLocation {
    pub fn new(sheet: impl Into<String>, column: impl Into<String>, row: u32) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            column: column.into().to_ascii_uppercase(),
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    /// Upper-case column letters
    pub fn column(&self) -> &str {
        &self.column
    }
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}{}", self.sheet, self.column, self.row)
    }
}

/// One source cell.
///
/// Text starting with `=` is a formula and is parsed on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    location: CellLocation,
    text: String,
    expression: Option<Result<Expr, String>>,
}

impl Cell {
    pub fn new(location: CellLocation, text: impl Into<String>) -> Self {
        let text = text.into();
        let expression = text
            .trim_start()
            .starts_with('=')
            .then(|| parse_formula(&text));
        Self {
            location,
            text,
            expression,
        }
    }

    pub fn location(&self) -> &CellLocation {
        &self.location
    }

    /// The original cell text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_formula(&self) -> bool {
        self.expression.is_some()
    }

    /// The parsed formula, if the cell holds one that parses.
    pub fn expression(&self) -> Option<&Expr> {
        self.expression.as_ref().and_then(|parsed| parsed.as_ref().ok())
    }

    /// Why the formula did not parse.
    pub fn parse_error(&self) -> Option<&str> {
        match &self.expression {
            Some(Err(err)) => Some(err),
            _ => None,
        }
    }
}

/// Kind of a migrated formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormulaType {
    Literal,
    Reference,
    Date,
    RandomBetween,
    Concatenate,
    Sum,
    Uuid,
    Unknown,
}

impl fmt::Display for FormulaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormulaType::Literal => "LITERAL",
            FormulaType::Reference => "REFERENCE",
            FormulaType::Date => "DATE",
            FormulaType::RandomBetween => "RANDOM_BETWEEN",
            FormulaType::Concatenate => "CONCATENATE",
            FormulaType::Sum => "SUM",
            FormulaType::Uuid => "UUID",
            FormulaType::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}

/// The migration result of one cell.
///
/// `text` is macro text for converted cells and the original cell text for
/// [`FormulaType::Unknown`].
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    cell: Cell,
    formula_type: FormulaType,
    text: String,
    note: Option<String>,
}

impl Formula {
    pub fn new(cell: Cell, formula_type: FormulaType, text: impl Into<String>) -> Self {
        Self {
            cell,
            formula_type,
            text: text.into(),
            note: None,
        }
    }

    /// A formula no adapter could convert; keeps the original text.
    pub fn unknown(cell: Cell, note: Option<String>) -> Self {
        let text = cell.text().to_string();
        Self {
            cell,
            formula_type: FormulaType::Unknown,
            text,
            note,
        }
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn formula_type(&self) -> FormulaType {
        self.formula_type
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}
