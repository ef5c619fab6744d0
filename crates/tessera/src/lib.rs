//! Tessera - macros embedded in test-data parameter values.
//!
//! Evaluation of macro text such as `#DATE(yyyy-MM-dd,+1d)` or
//! `#REF(DSL.Customers.alice.age)` against a data set graph, and migration
//! of legacy spreadsheet formulas into that macro text.

pub mod config;
pub mod escape;
pub mod eval;
pub mod migration;
pub mod resolve;

mod error;

pub use tessera_core::{alias, entity, service, store};

pub use error::TesseraError;

use log::debug;
use rand::{SeedableRng, rngs::StdRng};
use uuid::Uuid;

use tessera_core::{entity::ParameterValue, service::Services};

use config::AppConfig;
use escape::DateMacroEscaper;
use eval::{Clock, Evaluation, Evaluator, MacroRegistry, Subject, SystemClock};
use migration::{Cell, FalloutReport, Formula, MigrationPipeline, WorkbookLayout};

/// Entry point for evaluating macro text and migrating formulas.
///
/// The engine owns the macro registry and the clock; the data set graph is
/// passed per call so one engine can serve many stores.
///
/// # Examples
///
/// ```rust,no_run
/// use tessera::{MacroEngine, config::AppConfig, service::Services, store::MemoryStore};
///
/// let store = MemoryStore::builder()
///     .list("Customers", |list| {
///         list.attribute("age").dataset("alice", |ds| ds.text("age", "42"))
///     })
///     .build()
///     .expect("valid store");
///
/// let engine = MacroEngine::new(AppConfig::default()).expect("valid config");
/// let evaluation = engine
///     .evaluate(Services::from_backend(&store), "#REF(DSL.Customers.alice.age)", None)
///     .expect("no cycle");
/// assert_eq!(evaluation.text(), "42");
/// ```
pub struct MacroEngine {
    config: AppConfig,
    registry: MacroRegistry,
    clock: Box<dyn Clock>,
}

impl MacroEngine {
    /// Create an engine with the built-in macros.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::Config` if the configured `now` is not a valid
    /// timestamp.
    pub fn new(config: AppConfig) -> Result<Self, TesseraError> {
        let clock: Box<dyn Clock> = match config
            .evaluation()
            .clock()
            .map_err(TesseraError::Config)?
        {
            Some(fixed) => Box::new(fixed),
            None => Box::new(SystemClock),
        };
        Ok(Self {
            config,
            registry: MacroRegistry::with_builtins(),
            clock,
        })
    }

    /// Replace the clock, e.g. with a [`FixedClock`](eval::FixedClock).
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_registry(mut self, registry: MacroRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register additional macros.
    pub fn registry_mut(&mut self) -> &mut MacroRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// A random source for one pass: seeded when the config has a seed.
    pub fn rng(&self) -> StdRng {
        match self.config.evaluation().seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// An evaluator over `services` using this engine's macros and settings.
    pub fn evaluator<'a>(&'a self, services: Services<'a>) -> Evaluator<'a> {
        let evaluation = self.config.evaluation();
        Evaluator::new(&self.registry, services, self.clock.as_ref())
            .with_max_depth(evaluation.max_depth())
            .with_error_marker(evaluation.error_marker())
    }

    /// Evaluate `text`, optionally on behalf of a data set or parameter.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::Evaluation` when a reference cycle or a fatal
    /// context error aborts the pass. Failed macro calls are not errors:
    /// they are rendered inline and listed in
    /// [`Evaluation::diagnostics`].
    pub fn evaluate(
        &self,
        services: Services<'_>,
        text: &str,
        subject: Option<Subject>,
    ) -> Result<Evaluation, TesseraError> {
        let mut rng = self.rng();
        let evaluation = self
            .evaluator(services)
            .evaluate(text, subject, &mut rng)
            .map_err(|diagnostic| TesseraError::new_evaluation_error(diagnostic, text))?;

        if !evaluation.diagnostics().is_empty() {
            debug!(warnings = evaluation.diagnostics().len(); "Evaluated with failed calls");
        }
        Ok(evaluation)
    }

    /// Evaluate the stored value of `attribute` in `dataset`.
    ///
    /// # Errors
    ///
    /// Fails like [`MacroEngine::evaluate`], and when the parameter does not
    /// exist.
    pub fn evaluate_parameter(
        &self,
        services: Services<'_>,
        dataset: Uuid,
        attribute: Uuid,
    ) -> Result<Evaluation, TesseraError> {
        let source = services
            .attributes()
            .parameter(dataset, attribute)
            .and_then(|parameter| match parameter.value() {
                ParameterValue::Text(text) => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_default();

        let mut rng = self.rng();
        self.evaluator(services)
            .evaluate_parameter(dataset, attribute, &mut rng)
            .map_err(|diagnostic| TesseraError::new_evaluation_error(diagnostic, source))
    }

    /// The date macro quote escaper.
    ///
    /// # Errors
    ///
    /// Returns `TesseraError::Pattern` if the escaper's patterns fail to
    /// compile.
    pub fn escaper(&self) -> Result<DateMacroEscaper, TesseraError> {
        Ok(DateMacroEscaper::new()?)
    }

    /// A pipeline with the built-in adapters, escaping date quotes when the
    /// config asks for it.
    ///
    /// # Errors
    ///
    /// Fails like [`MacroEngine::escaper`].
    pub fn migration_pipeline(&self) -> Result<MigrationPipeline, TesseraError> {
        let pipeline = MigrationPipeline::with_builtin_adapters();
        if self.config.migration().escape_date_quotes() {
            Ok(pipeline.with_escaper(self.escaper()?))
        } else {
            Ok(pipeline)
        }
    }

    /// Migrate every cell of a workbook with a fresh fallout report.
    ///
    /// # Errors
    ///
    /// Fails like [`MacroEngine::migration_pipeline`]. Unconvertible cells
    /// are never errors; they are listed in the returned report.
    pub fn migrate(
        &self,
        layout: &WorkbookLayout,
        cells: impl IntoIterator<Item = Cell>,
    ) -> Result<(Vec<Formula>, FalloutReport), TesseraError> {
        let pipeline = self.migration_pipeline()?;
        let mut report = FalloutReport::new();
        let formulas = pipeline.migrate_all(layout, cells, &mut report);
        Ok((formulas, report))
    }
}

impl Default for MacroEngine {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            registry: MacroRegistry::with_builtins(),
            clock: Box::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for MacroEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroEngine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
