//! Parse tree of macro text.
//!
//! A [`ParsedText`] is an ordered list of [`Segment`]s. Concatenating the
//! evaluated segments left to right reproduces the final text.

use crate::{
    error::Diagnostic,
    span::{Span, Spanned},
};

/// One piece of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied to the output unchanged
    Literal(Spanned<String>),
    /// A macro call evaluated to text
    Macro(MacroCall),
}

impl Segment {
    pub fn span(&self) -> Span {
        match self {
            Segment::Literal(text) => text.span(),
            Segment::Macro(call) => call.span(),
        }
    }

    pub fn as_macro(&self) -> Option<&MacroCall> {
        match self {
            Segment::Macro(call) => Some(call),
            Segment::Literal(_) => None,
        }
    }
}

/// A call such as `#DATE(yyyy-MM-dd, +1d)`.
///
/// The span covers the whole call, from the sigil to the closing
/// parenthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroCall {
    sigil: char,
    name: Spanned<String>,
    args: Vec<Argument>,
    span: Span,
}

impl MacroCall {
    pub fn new(sigil: char, name: Spanned<String>, args: Vec<Argument>, span: Span) -> Self {
        Self {
            sigil,
            name,
            args,
            span,
        }
    }

    pub fn sigil(&self) -> char {
        self.sigil
    }

    /// The macro name, case-sensitive
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_span(&self) -> Span {
        self.name.span()
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The source text this call was parsed from.
    ///
    /// Returns an empty string if `source` is not the text that was parsed.
    pub fn source<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.span.range()).unwrap_or_default()
    }

    /// Calls nested anywhere inside the arguments, depth first.
    pub fn nested_calls(&self) -> Vec<&MacroCall> {
        let mut calls = Vec::new();
        for arg in &self.args {
            for call in arg.segments.iter().filter_map(Segment::as_macro) {
                calls.push(call);
                calls.extend(call.nested_calls());
            }
        }
        calls
    }
}

/// One comma-separated argument of a call.
///
/// An argument may mix literal text and nested calls, as in
/// `#CONCAT(id-#UUID())`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    segments: Vec<Segment>,
    span: Span,
}

impl Argument {
    pub fn new(segments: Vec<Segment>, span: Span) -> Self {
        Self { segments, span }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The argument text if it contains no nested calls.
    pub fn as_literal(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [] => Some(""),
            [Segment::Literal(text)] => Some(text.inner()),
            _ => None,
        }
    }
}

/// The result of parsing one input string.
///
/// Parsing never fails; malformed calls are kept as literal text and
/// reported in [`ParsedText::diagnostics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedText {
    segments: Vec<Segment>,
    diagnostics: Vec<Diagnostic>,
}

impl ParsedText {
    pub fn new(segments: Vec<Segment>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            segments,
            diagnostics,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Top-level macro calls in source order.
    pub fn macro_calls(&self) -> impl Iterator<Item = &MacroCall> {
        self.segments.iter().filter_map(Segment::as_macro)
    }

    pub fn has_macros(&self) -> bool {
        self.macro_calls().next().is_some()
    }

    pub fn into_parts(self) -> (Vec<Segment>, Vec<Diagnostic>) {
        (self.segments, self.diagnostics)
    }
}
