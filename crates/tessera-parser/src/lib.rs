//! # Tessera Parser
//!
//! Tokenizer and parser for the Tessera macro language. Macro text is plain
//! text with embedded calls such as `#DATE(yyyy-MM-dd)` or
//! `$REF(DSL.Customers.alice.age)`. Both `#` and `$` introduce a call; names
//! are case-sensitive identifiers; arguments are comma-separated and may
//! contain nested calls.
//!
//! ## Usage
//!
//! ```
//! use tessera_parser::{Segment, parse};
//!
//! let parsed = parse("Hello #RANDOM_CHAR(5)!");
//! assert_eq!(parsed.segments().len(), 3);
//! assert!(parsed.diagnostics().is_empty());
//!
//! let call = parsed.macro_calls().next().unwrap();
//! assert_eq!(call.name(), "RANDOM_CHAR");
//! assert_eq!(call.args()[0].as_literal(), Some("5"));
//! assert!(matches!(parsed.segments()[0], Segment::Literal(_)));
//! ```
//!
//! Parsing never fails. Malformed calls are kept as literal text and come
//! with warning [`error::Diagnostic`]s.

pub mod error;
pub mod lexer;
mod parser;
mod parser_types;
mod span;
mod tokens;

pub use lexer::{Lexer, tokenize};
pub use parser_types::{Argument, MacroCall, ParsedText, Segment};
pub use span::{Span, Spanned};
pub use tokens::{PositionedToken, Token, TokenKind};

use log::debug;

/// Parse macro text.
///
/// 1. **Tokenize** - lazily split the text into literal and macro tokens
/// 2. **Parse** - run the state machine over the tokens, building the call tree
pub fn parse(source: &str) -> ParsedText {
    let parsed = parser::parse_tokens(source, Lexer::new(source));
    debug!(
        segments = parsed.segments().len(),
        diagnostics = parsed.diagnostics().len();
        "Parsed macro text"
    );
    parsed
}
