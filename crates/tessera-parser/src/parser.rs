//! State-machine parser for macro text.
//!
//! This module turns the token stream of the [`lexer`](super::lexer) into the
//! tree defined in [`parser_types`](super::parser_types). The parser is
//! tolerant: anything that does not form a complete call is kept as literal
//! source text and reported as a warning.

use log::trace;

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    lexer::Lexer,
    parser_types::{Argument, MacroCall, ParsedText, Segment},
    span::{Span, Spanned},
    tokens::{PositionedToken, Token},
};

/// Parser states, derived from the pending macro and the open call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Plain text at the top level
    OutsideMacro,
    /// A top-level sigil was seen, waiting for the name and `(`
    InMacroName,
    /// Inside the argument list of an open call
    InArgs,
    /// A sigil was seen inside an argument list
    InNestedMacro,
}

/// A sigil and name that have not been followed by `(` yet.
#[derive(Debug)]
struct PendingMacro {
    sigil: char,
    start: usize,
    name: Option<Spanned<String>>,
}

/// A call whose argument list is open.
#[derive(Debug)]
struct OpenCall {
    sigil: char,
    name: Spanned<String>,
    start: usize,
    args: Vec<Argument>,
    current: Vec<Segment>,
    current_start: usize,
    /// Plain parentheses opened inside the current argument
    paren_depth: usize,
    saw_separator: bool,
}

impl OpenCall {
    fn finish_argument(&mut self, end: usize, next_start: usize) {
        let segments = std::mem::take(&mut self.current);
        self.args
            .push(Argument::new(segments, Span::new(self.current_start..end)));
        self.current_start = next_start;
    }

    fn into_call(mut self, close: Span) -> MacroCall {
        // `#NAME()` has no arguments, `#NAME(a,)` has two
        if self.saw_separator || !self.current.is_empty() {
            self.finish_argument(close.start(), close.end());
        }
        MacroCall::new(
            self.sigil,
            self.name,
            self.args,
            Span::new(self.start..close.end()),
        )
    }
}

struct Parser<'src> {
    source: &'src str,
    segments: Vec<Segment>,
    stack: Vec<OpenCall>,
    pending: Option<PendingMacro>,
    diagnostics: DiagnosticCollector,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            segments: Vec::new(),
            stack: Vec::new(),
            pending: None,
            diagnostics: DiagnosticCollector::new(),
        }
    }

    fn state(&self) -> State {
        match (self.stack.is_empty(), self.pending.is_some()) {
            (true, false) => State::OutsideMacro,
            (true, true) => State::InMacroName,
            (false, false) => State::InArgs,
            (false, true) => State::InNestedMacro,
        }
    }

    /// Segments of the innermost open argument, or the top level.
    fn target(&mut self) -> &mut Vec<Segment> {
        match self.stack.last_mut() {
            Some(call) => &mut call.current,
            None => &mut self.segments,
        }
    }

    /// Append text, merging it into a directly preceding literal.
    fn push_literal(&mut self, text: &str, span: Span) {
        let target = self.target();
        if let Some(Segment::Literal(previous)) = target.last_mut() {
            let mut merged = previous.inner().clone();
            merged.push_str(text);
            *previous = Spanned::new(merged, previous.span().union(span));
        } else {
            target.push(Segment::Literal(Spanned::new(text.to_string(), span)));
        }
    }

    fn push_source(&mut self, span: Span) {
        let source = self.source;
        let text = source.get(span.range()).unwrap_or_default();
        self.push_literal(text, span);
    }

    fn feed(&mut self, token: PositionedToken<'src>) {
        let state = self.state();
        trace!(state:?, token:?; "Parser step");

        match state {
            State::OutsideMacro => match token.token {
                Token::Literal(text) => self.push_literal(text, token.span),
                Token::MacroStart(sigil) => self.begin_macro(sigil, token.span),
                _ => self.push_source(token.span),
            },
            State::InMacroName | State::InNestedMacro => {
                let Some(mut pending) = self.pending.take() else {
                    return;
                };
                match (pending.name.is_some(), token.token) {
                    (false, Token::Ident(name)) => {
                        pending.name = Some(Spanned::new(name.to_string(), token.span));
                        self.pending = Some(pending);
                    }
                    (true, Token::Open) => self.open_call(pending, token.span),
                    _ => {
                        self.abandon(pending, token.span.start());
                        self.feed(token);
                    }
                }
            }
            State::InArgs => self.feed_argument(token),
        }
    }

    fn feed_argument(&mut self, token: PositionedToken<'src>) {
        let Some(call) = self.stack.last_mut() else {
            return;
        };

        match token.token {
            Token::Literal(text) => self.push_literal(text, token.span),
            Token::MacroStart(sigil) => self.begin_macro(sigil, token.span),
            Token::Open => {
                call.paren_depth += 1;
                self.push_literal("(", token.span);
            }
            Token::Close if call.paren_depth > 0 => {
                call.paren_depth -= 1;
                self.push_literal(")", token.span);
            }
            Token::Close => self.close_call(token.span),
            Token::ArgSep if call.paren_depth > 0 => self.push_literal(",", token.span),
            Token::ArgSep => {
                call.saw_separator = true;
                call.finish_argument(token.span.start(), token.span.end());
            }
            Token::Ident(_) => self.push_source(token.span),
        }
    }

    fn begin_macro(&mut self, sigil: char, span: Span) {
        self.pending = Some(PendingMacro {
            sigil,
            start: span.start(),
            name: None,
        });
    }

    fn open_call(&mut self, pending: PendingMacro, open: Span) {
        let Some(name) = pending.name else {
            return;
        };
        self.stack.push(OpenCall {
            sigil: pending.sigil,
            name,
            start: pending.start,
            args: Vec::new(),
            current: Vec::new(),
            current_start: open.end(),
            paren_depth: 0,
            saw_separator: false,
        });
    }

    fn close_call(&mut self, close: Span) {
        let Some(call) = self.stack.pop() else {
            return;
        };
        let call = call.into_call(close);
        self.target().push(Segment::Macro(call));
    }

    /// Keep a sigil and name that were not followed by `(` as text.
    fn abandon(&mut self, pending: PendingMacro, end: usize) {
        let span = Span::new(pending.start..end);
        let name = pending
            .name
            .as_ref()
            .map(|name| name.inner().as_str())
            .unwrap_or_default();
        self.diagnostics.emit(
            Diagnostic::warning(format!(
                "`{}{name}` has no argument list and is kept as text",
                pending.sigil
            ))
            .with_code(ErrorCode::E101)
            .with_label(span, "expected `(` after the macro name")
            .with_help(format!("write `{}{name}()` to call the macro", pending.sigil)),
        );
        self.push_source(span);
    }

    fn finish(mut self) -> ParsedText {
        let end = self.source.len();
        if let Some(pending) = self.pending.take() {
            self.abandon(pending, end);
        }

        // Everything from the outermost unterminated call onwards is text
        if let Some(outermost) = self.stack.first() {
            let span = Span::new(outermost.start..end);
            let name_span = outermost.name.span();
            self.diagnostics.emit(
                Diagnostic::warning(format!(
                    "unterminated macro call `{}{}`",
                    outermost.sigil,
                    outermost.name.inner()
                ))
                .with_code(ErrorCode::E100)
                .with_label(span, "this call is never closed")
                .with_secondary_label(name_span, "opened here")
                .with_help("add the missing `)`"),
            );
            self.stack.clear();
            self.push_source(span);
        }

        ParsedText::new(self.segments, self.diagnostics.into_diagnostics())
    }
}

/// Parse macro text into segments.
pub fn parse_tokens<'src>(source: &'src str, tokens: Lexer<'src>) -> ParsedText {
    let mut parser = Parser::new(source);
    for token in tokens {
        parser.feed(token);
    }
    parser.finish()
}
