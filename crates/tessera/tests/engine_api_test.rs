//! Integration tests for the MacroEngine API

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tessera::{
    MacroEngine, TesseraError,
    config::{AppConfig, EvaluationConfig, MigrationConfig},
    eval::{Arity, Macro, MacroError, Scope, Subject},
    migration::{Cell, CellLocation, FalloutReason, FormulaType, WorkbookLayout},
    service::Services,
    store::MemoryStore,
};
use tessera_parser::error::ErrorCode;

fn engine() -> MacroEngine {
    let evaluation = EvaluationConfig::default()
        .with_seed(42)
        .with_now("2024-02-29T13:45:07+01:00");
    MacroEngine::new(AppConfig::new(evaluation, MigrationConfig::default()))
        .expect("valid config")
}

fn store() -> MemoryStore {
    MemoryStore::builder()
        .list("myList", |list| {
            list.attribute("attr1")
                .attribute("attr2")
                .dataset("first", |ds| ds.text("attr1", "42").text("attr2", "#COUNT()"))
        })
        .list("Loop", |list| {
            list.attribute("a")
                .attribute("b")
                .attribute("c")
                .dataset("one", |ds| ds.text("a", "#REF(ATTR.b)").text("b", "#REF(ATTR.a)"))
                .dataset("two", |ds| {
                    ds.text("a", "#REF(ATTR.b)")
                        .text("b", "#REF(ATTR.c)")
                        .text("c", "xyz")
                })
        })
        .build()
        .expect("valid store")
}

/// Counts its calls and renders the count.
struct Count(Arc<AtomicUsize>);

impl Macro for Count {
    fn name(&self) -> &str {
        "COUNT"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn call(&self, _args: &[String], _scope: &mut Scope<'_, '_>) -> Result<String, MacroError> {
        let count = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(count.to_string())
    }
}

#[test]
fn test_engine_default_exists() {
    let _engine = MacroEngine::default();
}

#[test]
fn test_invalid_now_is_a_config_error() {
    let evaluation = EvaluationConfig::default().with_now("yesterday");
    let result = MacroEngine::new(AppConfig::new(evaluation, MigrationConfig::default()));
    assert!(matches!(result, Err(TesseraError::Config(_))));
}

#[test]
fn test_seeded_evaluation_is_deterministic() {
    let store = store();
    let text = "#UUID() #RANDOM_CHAR(8) #RANDOM(4) #RANDOM_BETWEEN(1,100) #DATE(yyyy-MM-dd HH:mm)";

    let first = engine()
        .evaluate(Services::from_backend(&store), text, None)
        .expect("evaluates");
    let second = engine()
        .evaluate(Services::from_backend(&store), text, None)
        .expect("evaluates");

    assert_eq!(first.text(), second.text());
    assert!(first.text().ends_with("2024-02-29 13:45"));
    assert!(first.diagnostics().is_empty());
}

#[test]
fn test_uuid_and_random_char_shapes() {
    let store = store();
    let engine = engine();

    let uuid = engine
        .evaluate(Services::from_backend(&store), "#UUID()", None)
        .expect("evaluates")
        .into_text();
    let parsed = uuid::Uuid::parse_str(&uuid).expect("canonical uuid");
    assert_eq!(parsed.to_string(), uuid);

    for n in [0, 1, 7, 64] {
        let text = format!("#RANDOM_CHAR({n})");
        let chars = engine
            .evaluate(Services::from_backend(&store), &text, None)
            .expect("evaluates")
            .into_text();
        assert_eq!(chars.len(), n);
        assert!(chars.chars().all(|c| c.is_ascii_lowercase()));
    }
}

#[test]
fn test_reference_scenario() {
    let store = store();
    let engine = engine();

    let found = engine
        .evaluate(Services::from_backend(&store), "#REF(DSL.myList.attr1)", None)
        .expect("evaluates");
    assert_eq!(found.text(), "42");

    let missing = engine
        .evaluate(Services::from_backend(&store), "#REF(DSL.myList.attr9)", None)
        .expect("missing references are not fatal");
    assert!(missing.text().starts_with("[ERROR: reference not found"));
    assert_eq!(missing.diagnostics().len(), 1);
    assert_eq!(missing.diagnostics()[0].code(), Some(ErrorCode::E203));
}

#[test]
fn test_missing_reference_leaves_siblings_intact() {
    let store = store();
    let evaluation = engine()
        .evaluate(
            Services::from_backend(&store),
            "#CONCAT(#REF(DSL.myList.first.attr9),-,#REF(DSL.myList.first.attr1)) #REF(DSL.Loop.two.c)",
            None,
        )
        .expect("missing references are not fatal");

    let (marker, rest) = evaluation.text().split_once(']').expect("marker");
    assert!(marker.starts_with("[ERROR: reference not found"));
    assert_eq!(rest, "-42 xyz");
    assert_eq!(evaluation.diagnostics().len(), 1);
    assert_eq!(evaluation.diagnostics()[0].code(), Some(ErrorCode::E203));
}

#[test]
fn test_cached_reference_renders_once() {
    let store = store();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut engine = engine();
    engine.registry_mut().register(Count(Arc::clone(&calls)));

    let text = "#REF(DSL.myList.first.attr2)/#REF(DSL.myList.first.attr2)";
    let evaluation = engine
        .evaluate(Services::from_backend(&store), text, None)
        .expect("evaluates");

    assert_eq!(evaluation.text(), "1/1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(evaluation.cache_misses(), 1);
    assert_eq!(evaluation.cache_hits(), 1);

    // A new pass starts with an empty cache.
    let again = engine
        .evaluate(Services::from_backend(&store), text, None)
        .expect("evaluates");
    assert_eq!(again.text(), "2/2");
}

#[test]
fn test_reference_cycle_aborts_with_trail() {
    let store = store();
    let err = engine()
        .evaluate(Services::from_backend(&store), "value: #REF(DSL.Loop.one.a)", None)
        .expect_err("cycle");

    let (diagnostic, src) = match err {
        TesseraError::Evaluation { diagnostic, src } => (diagnostic, src),
        other => panic!("expected an evaluation error, got {other:?}"),
    };
    assert_eq!(diagnostic.code(), Some(ErrorCode::E300));
    assert!(diagnostic.message().contains("Loop.one.a"));
    assert!(diagnostic.message().contains("Loop.one.b"));
    assert_eq!(src, "value: #REF(DSL.Loop.one.a)");
}

#[test]
fn test_reference_chain_without_repeat_succeeds() {
    let store = store();
    let evaluation = engine()
        .evaluate(Services::from_backend(&store), "#REF(DSL.Loop.two.a)", None)
        .expect("no cycle");
    assert_eq!(evaluation.text(), "xyz");
}

#[test]
fn test_evaluate_parameter() {
    let store = store();
    let services = Services::from_backend(&store);
    let list = services.lists().find_list("Loop").expect("list");
    let dataset = services.datasets().find_dataset(list.id(), "two").expect("dataset");
    let attribute = services.attributes().find_attribute(list.id(), "a").expect("attribute");

    let evaluation = engine()
        .evaluate_parameter(services, dataset.id(), attribute.id())
        .expect("evaluates");
    assert_eq!(evaluation.text(), "xyz");

    let relative = engine()
        .evaluate(services, "#REF(ATTR.c)!", Some(Subject::dataset(dataset.id())))
        .expect("evaluates");
    assert_eq!(relative.text(), "xyz!");
}

#[test]
fn test_escaper_scenario_and_idempotence() {
    let escaper = engine().escaper().expect("patterns compile");
    let escaped = escaper.escape_date_quotes("Value: #DATE(yyyy-MM-dd'T'HH:mm:ss'Z')");
    assert_eq!(escaped, r"Value: #DATE(yyyy-MM-dd\'T\'HH:mm:ss\'Z\')");
    assert_eq!(escaper.escape_date_quotes(&escaped), escaped);
    assert_eq!(
        escaper.escape_date_quotes("#DATE(yyyy-mm-dd'T')"),
        r"#DATE(yyyy-mm-dd\'T\')"
    );
}

#[test]
fn test_migration_never_loses_a_cell() {
    let cell = |column: &str, row, text: &str| Cell::new(CellLocation::new("Orders", column, row), text);
    let cells = vec![
        cell("B", 1, "first"),
        cell("C", 1, "second"),
        cell("A", 2, "total"),
        cell("A", 3, "due"),
        cell("B", 2, "=RANDBETWEEN(1,9)"),
        cell("C", 2, "=B2"),
        cell("B", 3, "=TEXT(TODAY()+1,\"yyyy-mm-dd\")"),
        cell("C", 3, "=VLOOKUP(B2,B2:C3,2)"),
        cell("D", 3, "=Q7"),
    ];
    let layout = WorkbookLayout::from_cells(&cells);

    let (formulas, report) = engine().migrate(&layout, cells.clone()).expect("pipeline");

    assert_eq!(formulas.len(), cells.len());
    let unknown = formulas
        .iter()
        .filter(|formula| formula.formula_type() == FormulaType::Unknown)
        .count();
    assert_eq!(unknown, report.len());
    assert_eq!(
        report.entries().iter().map(|entry| entry.reason()).collect::<Vec<_>>(),
        [FalloutReason::UnknownFormula, FalloutReason::TransformationFailed]
    );
    assert_eq!(formulas[5].text(), "#REF(DS.first.total)");
    assert_eq!(formulas[6].formula_type(), FormulaType::Date);
}
