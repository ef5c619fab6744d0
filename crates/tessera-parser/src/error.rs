//! Diagnostics for the Tessera macro language.
//!
//! Parsing and evaluation never abort on the first problem. Instead they
//! report [`Diagnostic`]s, each with a severity, an optional [`ErrorCode`],
//! labeled spans into the source text and optional help. Diagnostics are
//! accumulated with a [`DiagnosticCollector`].
//!
//! # Example
//!
//! ```
//! # use tessera_parser::error::{Diagnostic, ErrorCode};
//! # use tessera_parser::Span;
//!
//! let diag = Diagnostic::error("unknown macro `FOO`")
//!     .with_code(ErrorCode::E200)
//!     .with_label(Span::new(0..4), "not registered")
//!     .with_help("check the macro name for typos");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod severity;

pub use collector::DiagnosticCollector;
pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use severity::Severity;
