//! Error codes for the Tessera diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E1xx` - Parser errors
//! - `E2xx` - Macro call errors
//! - `E3xx` - Evaluation context errors

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Parser Errors (E1xx)
    // =========================================================================
    /// Unterminated macro call.
    ///
    /// The input ended while an argument list was still open. The call is
    /// kept as literal text.
    E100,

    /// Missing argument list.
    ///
    /// A macro name was not followed by `(`. The name is kept as literal
    /// text.
    E101,

    // =========================================================================
    // Macro Call Errors (E2xx)
    // =========================================================================
    /// Unknown macro.
    ///
    /// No macro with this name is registered.
    E200,

    /// Wrong argument count.
    ///
    /// The macro was called with a number of arguments outside its arity.
    E201,

    /// Invalid argument.
    ///
    /// An argument could not be interpreted, for example a non-numeric
    /// length or an unsupported date pattern.
    E202,

    /// Reference not found.
    ///
    /// A reference path names an entity that does not exist.
    E203,

    /// Invalid reference path.
    ///
    /// A reference path is malformed or uses an unknown alias.
    E204,

    // =========================================================================
    // Evaluation Context Errors (E3xx)
    // =========================================================================
    /// Reference cycle.
    ///
    /// Evaluating a parameter led back to a parameter that is already being
    /// evaluated.
    E300,

    /// Nesting too deep.
    ///
    /// The evaluation context stack exceeded its configured maximum depth.
    E301,

    /// Missing evaluation context.
    ///
    /// A macro that reads the current data set was evaluated without one.
    E302,
}

impl ErrorCode {
    /// Returns the code as a string (e.g., "E100").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E100 => "unterminated macro call",
            ErrorCode::E101 => "missing argument list",
            ErrorCode::E200 => "unknown macro",
            ErrorCode::E201 => "wrong argument count",
            ErrorCode::E202 => "invalid argument",
            ErrorCode::E203 => "reference not found",
            ErrorCode::E204 => "invalid reference path",
            ErrorCode::E300 => "reference cycle",
            ErrorCode::E301 => "nesting too deep",
            ErrorCode::E302 => "missing evaluation context",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
