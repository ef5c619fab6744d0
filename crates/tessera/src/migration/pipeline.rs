//! Cell-by-cell migration through the adapter chain.

use std::fmt;

use log::{debug, info};

use crate::{
    escape::DateMacroEscaper,
    migration::{
        adapters::{FormulaAdapter, builtin_adapters},
        fallout::{FalloutReason, FalloutReport},
        formula::{Cell, Formula},
        layout::WorkbookLayout,
    },
};

/// Ordered adapter chain.
///
/// Adapters are asked in ascending [`FormulaAdapter::priority`]; adapters of
/// equal priority keep their registration order. The first adapter that
/// matches a cell converts it, and a failed conversion is not retried with
/// later adapters.
#[derive(Default)]
pub struct MigrationPipeline {
    adapters: Vec<Box<dyn FormulaAdapter>>,
    escaper: Option<DateMacroEscaper>,
}

impl MigrationPipeline {
    /// A pipeline without adapters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pipeline with every built-in adapter.
    pub fn with_builtin_adapters() -> Self {
        builtin_adapters()
            .into_iter()
            .fold(Self::new(), |pipeline, adapter| pipeline.with_adapter(adapter))
    }

    pub fn with_adapter(mut self, adapter: Box<dyn FormulaAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Escape date macro quotes in every converted formula.
    pub fn with_escaper(mut self, escaper: DateMacroEscaper) -> Self {
        self.escaper = Some(escaper);
        self
    }

    /// Add an adapter behind every adapter of lower or equal priority.
    pub fn register(&mut self, adapter: Box<dyn FormulaAdapter>) {
        let priority = adapter.priority();
        let position = self
            .adapters
            .iter()
            .position(|existing| existing.priority() > priority)
            .unwrap_or(self.adapters.len());
        self.adapters.insert(position, adapter);
    }

    /// Adapter names in the order they are asked.
    pub fn adapter_names(&self) -> impl Iterator<Item = &str> {
        self.adapters.iter().map(|adapter| adapter.name())
    }

    /// Migrate one cell. Always returns a formula; cells that need manual
    /// attention come back as [`FormulaType::Unknown`](crate::migration::FormulaType::Unknown)
    /// with an entry in `report`.
    pub fn migrate(&self, cell: Cell, layout: &WorkbookLayout, report: &mut FalloutReport) -> Formula {
        if let Some(err) = cell.parse_error() {
            let detail = err.to_string();
            report.record(
                cell.location().clone(),
                cell.text(),
                FalloutReason::UnknownFormula,
                Some(detail.clone()),
            );
            return Formula::unknown(cell, Some(detail));
        }

        let Some(adapter) = self.adapters.iter().find(|adapter| adapter.matches(&cell)) else {
            report.record(
                cell.location().clone(),
                cell.text(),
                FalloutReason::UnknownFormula,
                None,
            );
            return Formula::unknown(cell, Some("no adapter matches".to_string()));
        };

        debug!(
            cell = cell.location().to_string(),
            adapter = adapter.name();
            "Adapter selected"
        );
        match adapter.transform(&cell, layout) {
            Ok(text) => {
                let text = match &self.escaper {
                    Some(escaper) => escaper.escape_date_quotes(&text),
                    None => text,
                };
                Formula::new(cell, adapter.formula_type(), text)
            }
            Err(err) => {
                let detail = err.to_string();
                report.record(
                    cell.location().clone(),
                    cell.text(),
                    FalloutReason::TransformationFailed,
                    Some(detail.clone()),
                );
                Formula::unknown(cell, Some(detail))
            }
        }
    }

    /// Migrate cells lazily, one per call to `next`. Dropping the iterator
    /// stops the run; `report` keeps the entries of the cells seen so far.
    pub fn run<'a, I>(
        &'a self,
        layout: &'a WorkbookLayout,
        cells: I,
        report: &'a mut FalloutReport,
    ) -> impl Iterator<Item = Formula> + 'a
    where
        I: IntoIterator<Item = Cell>,
        I::IntoIter: 'a,
    {
        cells
            .into_iter()
            .map(move |cell| self.migrate(cell, layout, report))
    }

    /// Migrate every cell.
    pub fn migrate_all(
        &self,
        layout: &WorkbookLayout,
        cells: impl IntoIterator<Item = Cell>,
        report: &mut FalloutReport,
    ) -> Vec<Formula> {
        let before = report.len();
        let formulas: Vec<Formula> = self.run(layout, cells, report).collect();
        info!(
            cells = formulas.len(),
            fallout = report.len() - before;
            "Migration finished"
        );
        formulas
    }
}

impl fmt::Debug for MigrationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationPipeline")
            .field("adapters", &self.adapter_names().collect::<Vec<_>>())
            .field("escaper", &self.escaper.is_some())
            .finish()
    }
}
