//! The evaluation pass.
//!
//! An [`Evaluator`] turns macro text into plain text. Each call to
//! [`Evaluator::evaluate`] is one pass with its own context stack, value
//! cache and diagnostics. Macros see the pass through a [`Scope`].

use chrono::{DateTime, FixedOffset};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use uuid::Uuid;

use tessera_core::{
    entity::{Parameter, ParameterValue},
    service::Services,
};
use tessera_parser::{
    MacroCall, Segment,
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
};

use crate::{
    eval::{
        cache::{CachedParameterKey, MacroCache},
        clock::Clock,
        context::{ContextError, ContextStack, Subject},
        registry::{MacroError, MacroRegistry},
    },
    resolve::{ReferencePath, ResolvedParameter, Resolver},
};

/// Default limit on nested reference resolution.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Root frame description of text evaluated without a subject
const FREE_TEXT: &str = "<text>";

/// Result of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    text: String,
    diagnostics: Vec<Diagnostic>,
    cache_hits: usize,
    cache_misses: usize,
}

impl Evaluation {
    /// The evaluated text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Parser warnings and macro call failures, in source order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses
    }
}

/// Mutable state of one pass.
struct Pass<'r> {
    stack: ContextStack,
    cache: MacroCache,
    rng: &'r mut StdRng,
    diagnostics: DiagnosticCollector,
}

/// Evaluates macro text against a dataset graph.
pub struct Evaluator<'a> {
    registry: &'a MacroRegistry,
    services: Services<'a>,
    clock: &'a dyn Clock,
    max_depth: usize,
    error_marker: bool,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a MacroRegistry, services: Services<'a>, clock: &'a dyn Clock) -> Self {
        Self {
            registry,
            services,
            clock,
            max_depth: DEFAULT_MAX_DEPTH,
            error_marker: true,
        }
    }

    /// Limit the number of nested frames, root included.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Render failed calls as `[ERROR: ...]` (the default) or keep their
    /// source text unchanged.
    pub fn with_error_marker(mut self, error_marker: bool) -> Self {
        self.error_marker = error_marker;
        self
    }

    pub fn registry(&self) -> &MacroRegistry {
        self.registry
    }

    /// Evaluate `text` on behalf of `subject`.
    ///
    /// Relative references (`DS`, `ATTR`) resolve against the subject's data
    /// set. Failed macro calls are replaced inline and reported as warnings.
    ///
    /// # Errors
    ///
    /// A reference cycle, a too deep chain of references or a relative
    /// reference without a subject aborts the pass with an error diagnostic
    /// labelled at the top-level call that triggered it.
    pub fn evaluate(
        &self,
        text: &str,
        subject: Option<Subject>,
        rng: &mut StdRng,
    ) -> Result<Evaluation, Diagnostic> {
        let description = match subject {
            Some(subject) => self.describe(subject),
            None => FREE_TEXT.to_string(),
        };
        self.run(text, subject, description, rng)
    }

    /// Evaluate the stored value of `attribute` in `dataset`.
    ///
    /// # Errors
    ///
    /// Fails like [`Evaluator::evaluate`], and with an error diagnostic when
    /// the parameter does not exist.
    pub fn evaluate_parameter(
        &self,
        dataset: Uuid,
        attribute: Uuid,
        rng: &mut StdRng,
    ) -> Result<Evaluation, Diagnostic> {
        let subject = Subject::parameter(dataset, attribute);
        let parameter = self.lookup_parameter(dataset, attribute)?;

        let text = match parameter.value() {
            ParameterValue::Text(text) => {
                return self.run(text, Some(subject), self.describe(subject), rng);
            }
            ParameterValue::ListValue(id) => self
                .services
                .attributes()
                .get_attribute(attribute)
                .and_then(|attribute| attribute.list_value(*id).map(|v| v.text().to_string())),
            ParameterValue::DataSetReference(id) => self
                .services
                .datasets()
                .get_dataset(*id)
                .map(|dataset| dataset.name().to_string()),
        };

        let text = text.ok_or_else(|| {
            Diagnostic::error(format!(
                "value of `{}` points at a missing entity",
                self.describe(subject)
            ))
            .with_code(ErrorCode::E203)
        })?;
        Ok(Evaluation {
            text,
            diagnostics: Vec::new(),
            cache_hits: 0,
            cache_misses: 0,
        })
    }

    fn lookup_parameter(&self, dataset: Uuid, attribute: Uuid) -> Result<Parameter, Diagnostic> {
        self.services
            .attributes()
            .parameter(dataset, attribute)
            .ok_or_else(|| {
                let err = MacroError::ReferenceNotFound(format!(
                    "parameter of `{}`",
                    self.describe(Subject::parameter(dataset, attribute))
                ));
                Diagnostic::error(err.to_string()).with_code(err.code())
            })
    }

    fn run(
        &self,
        text: &str,
        subject: Option<Subject>,
        description: String,
        rng: &mut StdRng,
    ) -> Result<Evaluation, Diagnostic> {
        info!(subject = description.as_str(); "Evaluating text");

        let mut pass = Pass {
            stack: ContextStack::new(subject, description, self.max_depth),
            cache: MacroCache::new(),
            rng,
            diagnostics: DiagnosticCollector::new(),
        };

        let parsed = tessera_parser::parse(text);
        let (segments, parse_diagnostics) = parsed.into_parts();
        pass.diagnostics.extend(parse_diagnostics);

        let mut output = String::with_capacity(text.len());
        for segment in &segments {
            match segment {
                Segment::Literal(literal) => output.push_str(literal.inner()),
                Segment::Macro(call) => {
                    let value = self
                        .evaluate_call(&mut pass, text, call, true)
                        .map_err(|err| fatal_diagnostic(err, call))?;
                    output.push_str(&value);
                }
            }
        }

        debug!(
            hits = pass.cache.hits(),
            misses = pass.cache.misses(),
            diagnostics = pass.diagnostics.diagnostics().len();
            "Evaluation finished"
        );

        Ok(Evaluation {
            text: output,
            cache_hits: pass.cache.hits(),
            cache_misses: pass.cache.misses(),
            diagnostics: pass.diagnostics.into_diagnostics(),
        })
    }

    /// Concatenate the output of `segments`.
    ///
    /// `report` is set while evaluating the pass's own text; call failures in
    /// referenced values are logged instead, since their spans belong to
    /// another source.
    fn evaluate_segments(
        &self,
        pass: &mut Pass<'_>,
        source: &str,
        segments: &[Segment],
        report: bool,
    ) -> Result<String, ContextError> {
        let mut output = String::new();
        for segment in segments {
            match segment {
                Segment::Literal(literal) => output.push_str(literal.inner()),
                Segment::Macro(call) => {
                    output.push_str(&self.evaluate_call(pass, source, call, report)?);
                }
            }
        }
        Ok(output)
    }

    /// Evaluate arguments left to right, then run the macro.
    fn evaluate_call(
        &self,
        pass: &mut Pass<'_>,
        source: &str,
        call: &MacroCall,
        report: bool,
    ) -> Result<String, ContextError> {
        let mut args = Vec::with_capacity(call.args().len());
        for arg in call.args() {
            args.push(self.evaluate_segments(pass, source, arg.segments(), report)?);
        }

        let result = {
            let mut scope = Scope {
                evaluator: self,
                pass: &mut *pass,
                macro_name: call.name(),
            };
            self.registry.dispatch(call.name(), &args, &mut scope)
        };

        match result {
            Ok(value) => {
                trace!(name = call.name(), value = value.as_str(); "Macro evaluated");
                Ok(value)
            }
            Err(MacroError::Context(err)) => Err(err),
            Err(err) => {
                if report {
                    pass.diagnostics.emit(
                        Diagnostic::warning(err.to_string())
                            .with_code(err.code())
                            .with_label(call.span(), "call failed")
                            .with_secondary_label(call.name_span(), "macro"),
                    );
                } else {
                    warn!(
                        name = call.name(),
                        frame = pass.stack.current().description(),
                        error = err.to_string();
                        "Macro failed in referenced value"
                    );
                }
                Ok(self.failure_text(&err, call, source))
            }
        }
    }

    fn failure_text(&self, err: &MacroError, call: &MacroCall, source: &str) -> String {
        if self.error_marker {
            format!("[ERROR: {err}]")
        } else {
            call.source(source).to_string()
        }
    }

    /// Resolve `path` from the current frame and render the value it points
    /// at, evaluating nested macros in a child frame.
    fn resolve_reference(
        &self,
        pass: &mut Pass<'_>,
        path: &ReferencePath,
        macro_name: &str,
    ) -> Result<String, MacroError> {
        let current = pass.stack.current().subject();
        let resolved = Resolver::new(self.services).resolve(path, current, macro_name)?;

        let top_dataset = pass
            .stack
            .root()
            .subject()
            .map(|subject| subject.dataset_id())
            .unwrap_or_else(Uuid::nil);
        let key = CachedParameterKey::new(
            resolved.parameter().id(),
            resolved.path().to_vec(),
            top_dataset,
        );
        if let Some(value) = pass.cache.get(&key) {
            return Ok(value.to_string());
        }

        let value = self.render(pass, &resolved)?;
        Ok(pass.cache.insert(key, value).to_string())
    }

    fn render(&self, pass: &mut Pass<'_>, resolved: &ResolvedParameter) -> Result<String, MacroError> {
        match resolved.parameter().value() {
            ParameterValue::Text(text) => {
                let frame = pass.stack.enter(
                    resolved.subject(),
                    resolved.description(),
                    resolved.path().to_vec(),
                )?;

                let parsed = tessera_parser::parse(text);
                for diagnostic in parsed.diagnostics() {
                    debug!(
                        frame = pass.stack.current().description(),
                        diagnostic = diagnostic.to_string();
                        "Referenced value is malformed"
                    );
                }
                let result = self.evaluate_segments(pass, text, parsed.segments(), false);
                pass.stack.leave(frame);
                Ok(result?)
            }
            ParameterValue::ListValue(id) => resolved
                .attribute()
                .list_value(*id)
                .map(|value| value.text().to_string())
                .ok_or_else(|| {
                    MacroError::ReferenceNotFound(format!(
                        "list value of `{}`",
                        resolved.description()
                    ))
                }),
            ParameterValue::DataSetReference(id) => self
                .services
                .datasets()
                .get_dataset(*id)
                .map(|dataset| dataset.name().to_string())
                .ok_or_else(|| {
                    MacroError::ReferenceNotFound(format!(
                        "data set referenced by `{}`",
                        resolved.description()
                    ))
                }),
        }
    }

    /// `List.dataset[.attribute]` for trails and logs
    fn describe(&self, subject: Subject) -> String {
        let dataset = self.services.datasets().get_dataset(subject.dataset_id());
        let list = dataset
            .as_ref()
            .and_then(|dataset| self.services.lists().get_list(dataset.list_id()));

        let mut description = match (list, dataset) {
            (Some(list), Some(dataset)) => format!("{}.{}", list.name(), dataset.name()),
            (None, Some(dataset)) => dataset.name().to_string(),
            _ => subject.dataset_id().to_string(),
        };
        if let Some(attribute) = subject.attribute_id() {
            let name = self
                .services
                .attributes()
                .get_attribute(attribute)
                .map(|attribute| attribute.name().to_string())
                .unwrap_or_else(|| attribute.to_string());
            description.push('.');
            description.push_str(&name);
        }
        description
    }
}

fn fatal_diagnostic(err: ContextError, call: &MacroCall) -> Diagnostic {
    let help = match &err {
        ContextError::Cycle { .. } => "remove one of the references in the cycle",
        ContextError::DepthExceeded { .. } => "shorten the reference chain or raise `max_depth`",
        ContextError::MissingContext { .. } => {
            "evaluate the text for a data set, or use a `DSL` reference"
        }
    };
    let message = err.to_string();
    let code = MacroError::from(err).code();
    Diagnostic::error(message)
        .with_code(code)
        .with_label(call.span(), "evaluation aborted here")
        .with_help(help)
}

/// The view of a pass handed to a running macro.
pub struct Scope<'s, 'r> {
    evaluator: &'s Evaluator<'s>,
    pass: &'s mut Pass<'r>,
    macro_name: &'s str,
}

impl Scope<'_, '_> {
    /// The pass's random source. Reuse it for every draw so a seeded pass
    /// stays reproducible.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut *self.pass.rng
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.evaluator.clock.now()
    }

    /// Name of the macro being called.
    pub fn macro_name(&self) -> &str {
        self.macro_name
    }

    /// Subject of the innermost frame.
    pub fn current_subject(&self) -> Option<Subject> {
        self.pass.stack.current().subject()
    }

    pub fn services(&self) -> Services<'_> {
        self.evaluator.services
    }

    /// Resolve a reference and return its rendered, cached value.
    pub fn resolve(&mut self, path: &ReferencePath) -> Result<String, MacroError> {
        self.evaluator
            .resolve_reference(self.pass, path, self.macro_name)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use tessera_core::store::MemoryStore;

    use super::*;
    use crate::eval::{
        clock::FixedClock,
        registry::{Arity, Macro},
    };

    struct Echo;

    impl Macro for Echo {
        fn name(&self) -> &str {
            "ECHO"
        }

        fn arity(&self) -> Arity {
            Arity::AtLeast(0)
        }

        fn call(&self, args: &[String], _scope: &mut Scope<'_, '_>) -> Result<String, MacroError> {
            Ok(format!("<{}>", args.join("|")))
        }
    }

    fn clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2024-03-01T10:00:00+00:00").expect("valid date"),
        )
    }

    fn store() -> MemoryStore {
        MemoryStore::builder()
            .list("Loops", |list| {
                list.attribute("a")
                    .attribute("b")
                    .attribute("c")
                    .dataset("one", |ds| {
                        ds.text("a", "A(#REF(ATTR.b))")
                            .text("b", "B(#REF(ATTR.a))")
                            .text("c", "C(#REF(ATTR.b) #REF(ATTR.b))")
                    })
                    .dataset("two", |ds| {
                        ds.text("a", "x#REF(ATTR.b)")
                            .text("b", "y#REF(ATTR.c)")
                            .text("c", "z")
                    })
            })
            .build()
            .expect("valid store")
    }

    fn subject(store: &MemoryStore, dataset: &str, attribute: Option<&str>) -> Subject {
        let services = Services::from_backend(store);
        let list = services.lists().find_list("Loops").expect("list");
        let dataset = services
            .datasets()
            .find_dataset(list.id(), dataset)
            .expect("dataset");
        match attribute {
            Some(name) => {
                let attribute = services
                    .attributes()
                    .find_attribute(list.id(), name)
                    .expect("attribute");
                Subject::parameter(dataset.id(), attribute.id())
            }
            None => Subject::dataset(dataset.id()),
        }
    }

    fn registry() -> MacroRegistry {
        let mut registry = MacroRegistry::with_builtins();
        registry.register(Echo);
        registry
    }

    #[test]
    fn test_literal_text_is_unchanged() {
        let store = store();
        let registry = registry();
        let clock = clock();
        let evaluator = Evaluator::new(&registry, Services::from_backend(&store), &clock);

        let mut rng = StdRng::seed_from_u64(1);
        let evaluation = evaluator
            .evaluate("no macros (here), at all", None, &mut rng)
            .expect("evaluates");
        assert_eq!(evaluation.text(), "no macros (here), at all");
        assert!(evaluation.diagnostics().is_empty());
    }

    #[test]
    fn test_nested_arguments_are_evaluated_first() {
        let store = store();
        let registry = registry();
        let clock = clock();
        let evaluator = Evaluator::new(&registry, Services::from_backend(&store), &clock);

        let mut rng = StdRng::seed_from_u64(1);
        let evaluation = evaluator
            .evaluate("#ECHO(a,#ECHO(b,c))!", None, &mut rng)
            .expect("evaluates");
        assert_eq!(evaluation.text(), "<a|<b|c>>!");
    }

    #[test]
    fn test_unknown_macro_renders_marker_and_warning() {
        let store = store();
        let registry = registry();
        let clock = clock();
        let evaluator = Evaluator::new(&registry, Services::from_backend(&store), &clock);

        let mut rng = StdRng::seed_from_u64(1);
        let evaluation = evaluator
            .evaluate("x #NOPE(1) y", None, &mut rng)
            .expect("evaluates");
        assert_eq!(evaluation.text(), "x [ERROR: unknown macro `NOPE`] y");

        let diagnostics = evaluation.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E200));
        assert!(diagnostics[0].severity().is_warning());
        assert_eq!(diagnostics[0].primary_span().map(|s| s.range()), Some(2..10));
    }

    #[test]
    fn test_failed_call_does_not_stop_siblings() {
        let store = store();
        let registry = registry();
        let clock = clock();
        let evaluator = Evaluator::new(&registry, Services::from_backend(&store), &clock);

        let mut rng = StdRng::seed_from_u64(1);
        let evaluation = evaluator
            .evaluate("#CONCAT(#NOPE(),#SUM(1,2)) #SUM(3,4) #GONE()", None, &mut rng)
            .expect("evaluates");
        assert_eq!(
            evaluation.text(),
            "[ERROR: unknown macro `NOPE`]3 7 [ERROR: unknown macro `GONE`]"
        );

        let spans: Vec<_> = evaluation
            .diagnostics()
            .iter()
            .map(|diagnostic| diagnostic.primary_span().map(|s| s.range()))
            .collect();
        assert_eq!(spans, [Some(8..15), Some(37..44)]);
    }

    #[test]
    fn test_error_marker_can_be_disabled() {
        let store = store();
        let registry = registry();
        let clock = clock();
        let evaluator = Evaluator::new(&registry, Services::from_backend(&store), &clock)
            .with_error_marker(false);

        let mut rng = StdRng::seed_from_u64(1);
        let evaluation = evaluator
            .evaluate("x #NOPE(1) y", None, &mut rng)
            .expect("evaluates");
        assert_eq!(evaluation.text(), "x #NOPE(1) y");
        assert_eq!(evaluation.diagnostics().len(), 1);
    }

    #[test]
    fn test_parse_warnings_are_reported() {
        let store = store();
        let registry = registry();
        let clock = clock();
        let evaluator = Evaluator::new(&registry, Services::from_backend(&store), &clock);

        let mut rng = StdRng::seed_from_u64(1);
        let evaluation = evaluator
            .evaluate("#ECHO(1", None, &mut rng)
            .expect("evaluates");
        assert_eq!(evaluation.text(), "#ECHO(1");
        assert_eq!(
            evaluation.diagnostics()[0].code(),
            Some(ErrorCode::E100)
        );
    }

    #[test]
    fn test_reference_chain_resolves() {
        let store = store();
        let registry = registry();
        let clock = clock();
        let evaluator = Evaluator::new(&registry, Services::from_backend(&store), &clock);

        let mut rng = StdRng::seed_from_u64(1);
        let evaluation = evaluator
            .evaluate("#REF(ATTR.a)", Some(subject(&store, "two", None)), &mut rng)
            .expect("A -> B -> C has no cycle");
        assert_eq!(evaluation.text(), "xyz");
    }

    #[test]
    fn test_cycle_aborts_the_pass() {
        let store = store();
        let registry = registry();
        let clock = clock();
        let evaluator = Evaluator::new(&registry, Services::from_backend(&store), &clock);

        let mut rng = StdRng::seed_from_u64(1);
        let err = evaluator
            .evaluate_parameter_at(&store, "one", "a", &mut rng)
            .expect_err("cycle");
        assert_eq!(err.code(), Some(ErrorCode::E300));
        assert!(err.severity().is_error());
        assert!(err.message().contains("Loops.one.a -> Loops.one.b -> Loops.one.a"));
    }

    #[test]
    fn test_repeated_reference_hits_cache() {
        let store = store();
        let registry = registry();
        let clock = clock();
        let evaluator = Evaluator::new(&registry, Services::from_backend(&store), &clock);

        let mut rng = StdRng::seed_from_u64(1);
        let evaluation = evaluator
            .evaluate(
                "#REF(ATTR.c)/#REF(ATTR.c)",
                Some(subject(&store, "two", None)),
                &mut rng,
            )
            .expect("evaluates");
        assert_eq!(evaluation.text(), "z/z");
        assert_eq!(evaluation.cache_misses(), 1);
        assert_eq!(evaluation.cache_hits(), 1);
    }

    #[test]
    fn test_relative_reference_without_subject_is_fatal() {
        let store = store();
        let registry = registry();
        let clock = clock();
        let evaluator = Evaluator::new(&registry, Services::from_backend(&store), &clock);

        let mut rng = StdRng::seed_from_u64(1);
        let err = evaluator
            .evaluate("ok #REF(ATTR.a)", None, &mut rng)
            .expect_err("no context");
        assert_eq!(err.code(), Some(ErrorCode::E302));
        assert_eq!(err.primary_span().map(|s| s.range()), Some(3..15));
    }

    #[test]
    fn test_depth_limit_is_fatal() {
        let store = store();
        let registry = registry();
        let clock = clock();
        let evaluator =
            Evaluator::new(&registry, Services::from_backend(&store), &clock).with_max_depth(2);

        let mut rng = StdRng::seed_from_u64(1);
        let err = evaluator
            .evaluate("#REF(ATTR.a)", Some(subject(&store, "two", None)), &mut rng)
            .expect_err("too deep");
        assert_eq!(err.code(), Some(ErrorCode::E301));
    }

    impl Evaluator<'_> {
        fn evaluate_parameter_at(
            &self,
            store: &MemoryStore,
            dataset: &str,
            attribute: &str,
            rng: &mut StdRng,
        ) -> Result<Evaluation, Diagnostic> {
            let subject = subject(store, dataset, Some(attribute));
            let attribute = subject.attribute_id().expect("parameter subject");
            self.evaluate_parameter(subject.dataset_id(), attribute, rng)
        }
    }
}
