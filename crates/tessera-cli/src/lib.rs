//! Tessera CLI library
//!
//! This module contains the core CLI logic for the Tessera tool: evaluating
//! macro text against a fixture store, escaping date macros, migrating a
//! legacy workbook and checking macro text for malformed calls.

pub mod error_adapter;
pub mod fixture;

mod args;
mod config;

pub use args::{Args, Command};

use std::{fs, io::Write};

use log::{info, warn};

use tessera::{
    MacroEngine, TesseraError,
    eval::{MacroRegistry, Subject},
    migration::WorkbookLayout,
    service::Services,
    store::MemoryStore,
};

use error_adapter::render_diagnostics;
use fixture::{StoreFixture, WorkbookFixture};

/// Run the Tessera CLI application
///
/// Results are written to `out`; warnings are logged.
///
/// # Errors
///
/// Returns `TesseraError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Malformed fixtures
/// - Evaluations aborted by a reference cycle or missing context
pub fn run(args: &Args, out: &mut dyn Write) -> Result<(), TesseraError> {
    let app_config = config::load_config(args.config.as_ref())?;
    let engine = MacroEngine::new(app_config)?;

    match &args.command {
        Command::Eval {
            store,
            list,
            dataset,
            text,
        } => {
            let store = match store {
                Some(path) => {
                    info!(store_path = path.as_str(); "Loading fixture store");
                    StoreFixture::from_toml(&fs::read_to_string(path)?)?.into_store()?
                }
                None => MemoryStore::default(),
            };
            let services = Services::from_backend(&store);
            let subject = match (list, dataset) {
                (Some(list), Some(dataset)) => Some(find_subject(services, list, dataset)?),
                _ => None,
            };

            let evaluation = engine.evaluate(services, text, subject)?;
            for warning in render_diagnostics(evaluation.diagnostics(), text) {
                warn!("{warning}");
            }
            writeln!(out, "{}", evaluation.text())?;
        }
        Command::Escape { text } => {
            writeln!(out, "{}", engine.escaper()?.escape_date_quotes(text))?;
        }
        Command::Migrate { input, report } => {
            info!(input_path = input.as_str(); "Migrating workbook");
            let cells = WorkbookFixture::from_toml(&fs::read_to_string(input)?)?.into_cells()?;
            let layout = WorkbookLayout::from_cells(&cells);
            let (formulas, fallout) = engine.migrate(&layout, cells)?;

            for formula in &formulas {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    formula.cell().location(),
                    formula.formula_type(),
                    formula.text()
                )?;
            }

            if let Some(path) = report {
                let content = toml::to_string(&fallout)
                    .map_err(|err| TesseraError::Fixture(err.to_string()))?;
                fs::write(path, content)?;
                info!(report_path = path.as_str(), entries = fallout.len(); "Fallout report written");
            } else if !fallout.is_empty() {
                warn!(entries = fallout.len(); "Formulas left for manual migration");
            }
        }
        Command::Check { text } => {
            let parsed = tessera_parser::parse(text);
            let registry = MacroRegistry::with_builtins();
            for call in parsed.macro_calls() {
                for call in std::iter::once(call).chain(call.nested_calls()) {
                    let status = if registry.contains(call.name()) {
                        "ok"
                    } else {
                        "unknown macro"
                    };
                    writeln!(out, "{}\t{}\t{status}", call.span(), call.source(text))?;
                }
            }
            for rendered in render_diagnostics(parsed.diagnostics(), text) {
                writeln!(out, "{rendered}")?;
            }
        }
    }

    Ok(())
}

fn find_subject(
    services: Services<'_>,
    list: &str,
    dataset: &str,
) -> Result<Subject, TesseraError> {
    let found = services
        .lists()
        .find_list(list)
        .and_then(|list| services.datasets().find_dataset(list.id(), dataset))
        .ok_or_else(|| {
            TesseraError::Fixture(format!("no data set `{dataset}` in list `{list}`"))
        })?;
    Ok(Subject::dataset(found.id()))
}
