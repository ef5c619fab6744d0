//! Formula adapters.
//!
//! An adapter recognises one family of spreadsheet formulas and converts
//! it to macro text. The pipeline asks adapters in priority order; the
//! first one whose [`FormulaAdapter::matches`] accepts a cell transforms it.

use crate::migration::{
    TransformationError,
    expr::{BinaryOp, Expr},
    formula::{Cell, FormulaType},
    layout::WorkbookLayout,
    translate::{Translator, is_date, render_number},
};

/// Priority of adapters that do not override [`FormulaAdapter::priority`]
pub const DEFAULT_PRIORITY: u32 = 100;

/// Converts one family of formulas.
pub trait FormulaAdapter: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    fn formula_type(&self) -> FormulaType;

    /// Lower values are asked first.
    fn priority(&self) -> u32 {
        DEFAULT_PRIORITY
    }

    fn matches(&self, cell: &Cell) -> bool;

    /// Macro text for a cell this adapter matches.
    fn transform(&self, cell: &Cell, layout: &WorkbookLayout)
    -> Result<String, TransformationError>;
}

/// Every built-in adapter.
pub fn builtin_adapters() -> Vec<Box<dyn FormulaAdapter>> {
    vec![
        Box::new(LiteralAdapter),
        Box::new(UuidAdapter),
        Box::new(DateAdapter),
        Box::new(RandomBetweenAdapter),
        Box::new(SumAdapter),
        Box::new(ConcatenateAdapter),
        Box::new(ReferenceAdapter),
    ]
}

fn expression(cell: &Cell) -> Result<&Expr, TransformationError> {
    cell.expression().ok_or_else(|| {
        TransformationError::InvalidFormat(
            cell.parse_error()
                .unwrap_or("cell holds no formula")
                .to_string(),
        )
    })
}

/// Plain values: non-formula cells and constant formulas like `="abc"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralAdapter;

impl FormulaAdapter for LiteralAdapter {
    fn name(&self) -> &str {
        "literal"
    }

    fn formula_type(&self) -> FormulaType {
        FormulaType::Literal
    }

    fn priority(&self) -> u32 {
        10
    }

    fn matches(&self, cell: &Cell) -> bool {
        !cell.is_formula() || matches!(cell.expression(), Some(Expr::Text(_) | Expr::Number(_)))
    }

    fn transform(
        &self,
        cell: &Cell,
        _layout: &WorkbookLayout,
    ) -> Result<String, TransformationError> {
        Ok(match cell.expression() {
            Some(Expr::Text(text)) => text.clone(),
            Some(Expr::Number(value)) => render_number(*value),
            _ => cell.text().to_string(),
        })
    }
}

/// `=UUID()` and `=GUID()` custom functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidAdapter;

impl FormulaAdapter for UuidAdapter {
    fn name(&self) -> &str {
        "uuid"
    }

    fn formula_type(&self) -> FormulaType {
        FormulaType::Uuid
    }

    fn priority(&self) -> u32 {
        50
    }

    fn matches(&self, cell: &Cell) -> bool {
        cell.expression()
            .is_some_and(|expr| expr.is_call("UUID") || expr.is_call("GUID"))
    }

    fn transform(
        &self,
        cell: &Cell,
        layout: &WorkbookLayout,
    ) -> Result<String, TransformationError> {
        Translator::new(cell, layout).uuid(expression(cell)?)
    }
}

/// `=TODAY()`, `=NOW()`, `=TODAY()+n` and `=TEXT(TODAY()-n, "format")`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateAdapter;

impl FormulaAdapter for DateAdapter {
    fn name(&self) -> &str {
        "date"
    }

    fn formula_type(&self) -> FormulaType {
        FormulaType::Date
    }

    fn priority(&self) -> u32 {
        50
    }

    fn matches(&self, cell: &Cell) -> bool {
        cell.expression().is_some_and(is_date)
    }

    fn transform(
        &self,
        cell: &Cell,
        layout: &WorkbookLayout,
    ) -> Result<String, TransformationError> {
        Translator::new(cell, layout).date(expression(cell)?)
    }
}

/// `=RANDBETWEEN(min, max)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomBetweenAdapter;

impl FormulaAdapter for RandomBetweenAdapter {
    fn name(&self) -> &str {
        "random-between"
    }

    fn formula_type(&self) -> FormulaType {
        FormulaType::RandomBetween
    }

    fn priority(&self) -> u32 {
        50
    }

    fn matches(&self, cell: &Cell) -> bool {
        cell.expression()
            .is_some_and(|expr| expr.is_call("RANDBETWEEN"))
    }

    fn transform(
        &self,
        cell: &Cell,
        layout: &WorkbookLayout,
    ) -> Result<String, TransformationError> {
        Translator::new(cell, layout).random_between(expression(cell)?)
    }
}

/// `=SUM(...)` and numeric `+`/`-` that is not date arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumAdapter;

impl FormulaAdapter for SumAdapter {
    fn name(&self) -> &str {
        "sum"
    }

    fn formula_type(&self) -> FormulaType {
        FormulaType::Sum
    }

    fn priority(&self) -> u32 {
        50
    }

    fn matches(&self, cell: &Cell) -> bool {
        match cell.expression() {
            Some(expr) if expr.is_call("SUM") => true,
            Some(
                expr @ Expr::Binary {
                    op: BinaryOp::Add | BinaryOp::Subtract,
                    ..
                },
            ) => !is_date(expr),
            _ => false,
        }
    }

    fn transform(
        &self,
        cell: &Cell,
        layout: &WorkbookLayout,
    ) -> Result<String, TransformationError> {
        let expr = expression(cell)?;
        let translator = Translator::new(cell, layout);
        if expr.is_call("SUM") {
            translator.sum(expr)
        } else {
            translator.translate(expr)
        }
    }
}

/// `=CONCATENATE(...)` and `&` chains.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatenateAdapter;

impl FormulaAdapter for ConcatenateAdapter {
    fn name(&self) -> &str {
        "concatenate"
    }

    fn formula_type(&self) -> FormulaType {
        FormulaType::Concatenate
    }

    fn priority(&self) -> u32 {
        60
    }

    fn matches(&self, cell: &Cell) -> bool {
        cell.expression().is_some_and(|expr| {
            expr.is_call("CONCATENATE")
                || expr.is_call("CONCAT")
                || matches!(
                    expr,
                    Expr::Binary {
                        op: BinaryOp::Concat,
                        ..
                    }
                )
        })
    }

    fn transform(
        &self,
        cell: &Cell,
        layout: &WorkbookLayout,
    ) -> Result<String, TransformationError> {
        Translator::new(cell, layout).concatenate(expression(cell)?)
    }
}

/// `=C5`, `=$C$5` and `=Sheet!C5`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceAdapter;

impl FormulaAdapter for ReferenceAdapter {
    fn name(&self) -> &str {
        "reference"
    }

    fn formula_type(&self) -> FormulaType {
        FormulaType::Reference
    }

    fn priority(&self) -> u32 {
        90
    }

    fn matches(&self, cell: &Cell) -> bool {
        matches!(cell.expression(), Some(Expr::Reference(_)))
    }

    fn transform(
        &self,
        cell: &Cell,
        layout: &WorkbookLayout,
    ) -> Result<String, TransformationError> {
        match expression(cell)? {
            Expr::Reference(target) => Translator::new(cell, layout).reference(target),
            _ => Err(TransformationError::Unsupported(
                "expected a cell reference".to_string(),
            )),
        }
    }
}
