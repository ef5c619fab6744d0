//! The core diagnostic type.

use std::fmt;

use crate::{
    error::{ErrorCode, Label, Severity},
    span::Span,
};

/// A diagnostic message with source location information.
///
/// ```text
/// warning[E200]: unknown macro `FOO`
///   |
/// 1 | Hello #FOO(1)
///   |       ^^^^^^^ not registered
///   |
///   = help: check the macro name for typos
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    message: String,
    labels: Vec<Label>,
    help: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    ///
    /// # Example
    ///
    /// ```
    /// # use tessera_parser::error::{Diagnostic, ErrorCode};
    /// # use tessera_parser::Span;
    ///
    /// let diag = Diagnostic::error("reference cycle: A -> B -> A")
    ///     .with_code(ErrorCode::E300)
    ///     .with_label(Span::new(0..12), "cycle closes here");
    /// assert!(diag.severity().is_error());
    /// ```
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// The span of the first primary label, if any.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|label| label.is_primary())
            .map(Label::span)
    }

    /// Set the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Add a primary label to this diagnostic.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(span, message));
        self
    }

    /// Add a secondary label to this diagnostic.
    pub fn with_secondary_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(span, message));
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Shift every label by `offset` bytes.
    ///
    /// Used when a diagnostic produced for a fragment is reported against
    /// the enclosing text.
    pub fn offset_by(mut self, offset: usize) -> Self {
        self.labels = self
            .labels
            .into_iter()
            .map(|label| {
                let span = Span::new(label.span().start() + offset..label.span().end() + offset);
                if label.is_primary() {
                    Label::primary(span, label.message())
                } else {
                    Label::secondary(span, label.message())
                }
            })
            .collect();
        self
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            help: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "error[E300]: message" or "warning: message"
        write!(f, "{}", self.severity)?;
        if let Some(code) = self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_new() {
        let diag = Diagnostic::new(Severity::Error, "test error");

        assert!(diag.severity().is_error());
        assert_eq!(diag.message(), "test error");
        assert!(diag.code().is_none());
        assert!(diag.labels().is_empty());
        assert!(diag.help().is_none());
    }

    #[test]
    fn test_diagnostic_builder_chain() {
        let diag = Diagnostic::warning("wrong argument count for `UUID`")
            .with_code(ErrorCode::E201)
            .with_label(Span::new(6..14), "called with 2 arguments")
            .with_secondary_label(Span::new(0..20), "in this call")
            .with_help("`UUID` takes no arguments");

        assert!(diag.severity().is_warning());
        assert_eq!(diag.code(), Some(ErrorCode::E201));
        assert_eq!(diag.labels().len(), 2);
        assert_eq!(diag.primary_span(), Some(Span::new(6..14)));
        assert_eq!(diag.help(), Some("`UUID` takes no arguments"));
    }

    #[test]
    fn test_diagnostic_display() {
        let with_code = Diagnostic::error("reference cycle").with_code(ErrorCode::E300);
        assert_eq!(with_code.to_string(), "error[E300]: reference cycle");

        let without_code = Diagnostic::warning("dropped call");
        assert_eq!(without_code.to_string(), "warning: dropped call");
    }

    #[test]
    fn test_offset_by_shifts_all_labels() {
        let diag = Diagnostic::warning("x")
            .with_label(Span::new(1..3), "a")
            .with_secondary_label(Span::new(0..5), "b")
            .offset_by(10);

        assert_eq!(diag.labels()[0].span(), Span::new(11..13));
        assert!(diag.labels()[0].is_primary());
        assert_eq!(diag.labels()[1].span(), Span::new(10..15));
        assert!(diag.labels()[1].is_secondary());
    }
}
