//! Error adapter for converting TesseraError to miette diagnostics.
//!
//! This module provides the bridge between the library's error types and
//! miette's rich diagnostic formatting used in the CLI. Warnings of a
//! successful evaluation go through the same [`DiagnosticAdapter`].

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, GraphicalReportHandler, LabeledSpan, SourceSpan};

use tessera::TesseraError;
use tessera_parser::{Span, error::Diagnostic};

/// Adapter for a single tessera diagnostic.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    /// Text the diagnostic's spans point into
    src: &'a str,
}

impl<'a> DiagnosticAdapter<'a> {
    pub fn new(diag: &'a Diagnostic, src: &'a str) -> Self {
        Self { diag, src }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diag.message())
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(if self.diag.severity().is_error() {
            miette::Severity::Error
        } else {
            miette::Severity::Warning
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = self.diag.labels();
        if labels.is_empty() {
            return None;
        }

        Some(Box::new(labels.iter().map(|label| {
            let span = span_to_miette(label.span());
            let message = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(message, span)
            } else {
                LabeledSpan::new_with_span(message, span)
            }
        })))
    }
}

/// Adapter for [`TesseraError`] variants without source spans.
pub struct ErrorAdapter<'a>(pub &'a TesseraError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            TesseraError::Io(_) => "tessera::io",
            TesseraError::Config(_) | TesseraError::ConfigFile { .. } => "tessera::config",
            TesseraError::Evaluation { .. } => return None,
            TesseraError::Fixture(_) => "tessera::fixture",
            TesseraError::Core(_) => "tessera::store",
            TesseraError::Pattern(_) => "tessera::pattern",
        };
        Some(Box::new(code))
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A rich diagnostic with source location information.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

fn span_to_miette(span: Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// Convert a [`TesseraError`] into a list of reportable errors.
///
/// [`TesseraError::Evaluation`] renders its diagnostic against the
/// evaluated text; every other variant is a single plain report.
pub fn to_reportables(err: &TesseraError) -> Vec<Reportable<'_>> {
    match err {
        TesseraError::Evaluation { diagnostic, src } => {
            vec![Reportable::Diagnostic(DiagnosticAdapter::new(diagnostic, src))]
        }
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

/// Render diagnostics of `src` with miette's graphical handler, one string
/// per diagnostic.
pub fn render_diagnostics(diagnostics: &[Diagnostic], src: &str) -> Vec<String> {
    let reporter = GraphicalReportHandler::new();
    diagnostics
        .iter()
        .map(|diagnostic| {
            let adapter = DiagnosticAdapter::new(diagnostic, src);
            let mut writer = String::new();
            if reporter.render_report(&mut writer, &adapter).is_err() {
                writer = diagnostic.to_string();
            }
            writer
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use tessera_parser::error::ErrorCode;

    use super::*;

    #[test]
    fn test_evaluation_error_is_a_diagnostic() {
        let diag = Diagnostic::error("reference cycle")
            .with_code(ErrorCode::E300)
            .with_label(Span::new(0..5), "here")
            .with_help("remove one reference");
        let err = TesseraError::new_evaluation_error(diag, "#REF(DS.a.b)");

        let reportables = to_reportables(&err);
        assert_eq!(reportables.len(), 1);
        match &reportables[0] {
            Reportable::Diagnostic(d) => {
                assert_eq!(d.to_string(), "reference cycle");
                assert_eq!(
                    d.code().map(|code| code.to_string()),
                    Some("E300".to_string())
                );
            }
            Reportable::Error(_) => panic!("Expected Diagnostic"),
        }
    }

    #[test]
    fn test_plain_error() {
        let err = TesseraError::Fixture("bad fixture".to_string());

        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 1);
        match &reportables[0] {
            Reportable::Error(e) => {
                assert_eq!(e.to_string(), "Fixture error: bad fixture");
                assert_eq!(
                    e.code().map(|code| code.to_string()),
                    Some("tessera::fixture".to_string())
                );
            }
            Reportable::Diagnostic(_) => panic!("Expected Error"),
        }
    }

    #[test]
    fn test_all_labels_returned() {
        let diag = Diagnostic::warning("call failed")
            .with_label(Span::new(0..5), "primary label")
            .with_secondary_label(Span::new(1..4), "secondary label");

        let adapter = DiagnosticAdapter::new(&diag, "#FOO() tail");

        let labels: Vec<_> = adapter.labels().expect("labels").collect();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].label(), Some("primary label"));
        assert!(labels[0].primary());
        assert!(!labels[1].primary());
        assert_eq!(adapter.severity(), Some(miette::Severity::Warning));
    }

    #[test]
    fn test_render_diagnostics() {
        let diag = Diagnostic::warning("unknown macro `FOO`").with_label(Span::new(0..6), "call failed");
        let rendered = render_diagnostics(&[diag], "#FOO() tail");
        assert_eq!(rendered.len(), 1);
        assert!(rendered[0].contains("unknown macro `FOO`"));
    }
}
