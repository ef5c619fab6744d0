use tessera_parser::{Segment, TokenKind, error::ErrorCode, parse, tokenize};

#[test]
fn test_reference_macro() {
    let parsed = parse("#REF(DSL.myList.attr1)");

    assert!(parsed.diagnostics().is_empty());
    let call = parsed.macro_calls().next().expect("call");
    assert_eq!(call.name(), "REF");
    assert_eq!(call.args().len(), 1);
    assert_eq!(call.args()[0].as_literal(), Some("DSL.myList.attr1"));
}

#[test]
fn test_date_macro_with_escaped_quotes() {
    let parsed = parse(r"Value: #DATE(yyyy-MM-dd\'T\'HH:mm, +1d)");

    match parsed.segments() {
        [Segment::Literal(prefix), Segment::Macro(call)] => {
            assert_eq!(prefix.inner(), "Value: ");
            assert_eq!(call.name(), "DATE");
            assert_eq!(call.args()[0].as_literal(), Some("yyyy-MM-dd'T'HH:mm"));
            assert_eq!(call.args()[1].as_literal(), Some(" +1d"));
        }
        other => panic!("unexpected segments: {other:?}"),
    }
}

#[test]
fn test_deeply_nested_calls() {
    let parsed = parse("#CONCAT(#CONCAT(#CONCAT(#UUID(), a), b), c)");
    let call = parsed.macro_calls().next().expect("call");

    assert_eq!(call.args().len(), 2);
    assert_eq!(call.nested_calls().len(), 3);
    assert!(parsed.diagnostics().is_empty());
}

#[test]
fn test_malformed_input_degrades_to_text() {
    let source = "Price: $5, see #NOTE and #OPEN(unclosed";
    let parsed = parse(source);

    let text: String = parsed
        .segments()
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => text.inner().clone(),
            Segment::Macro(call) => call.source(source).to_string(),
        })
        .collect();
    assert_eq!(text, source);

    let codes: Vec<_> = parsed.diagnostics().iter().map(|d| d.code()).collect();
    assert_eq!(codes, [Some(ErrorCode::E101), Some(ErrorCode::E100)]);
}

#[test]
fn test_tokens_are_lazy_and_ordered() {
    let kinds: Vec<_> = tokenize("x#A(y)").iter().map(|t| t.kind()).collect();
    assert_eq!(
        kinds,
        [
            TokenKind::Literal,
            TokenKind::MacroStart,
            TokenKind::Ident,
            TokenKind::Open,
            TokenKind::Literal,
            TokenKind::Close,
        ]
    );
}
