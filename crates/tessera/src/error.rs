//! Error types for Tessera operations.
//!
//! [`TesseraError`] wraps the conditions a caller of the top-level API can
//! hit. Call-scoped macro failures are not errors at this level: they are
//! rendered inline and reported as warnings on the
//! [`Evaluation`](crate::eval::Evaluation).

use std::{io, path::PathBuf};

use thiserror::Error;

use tessera_core::CoreError;
use tessera_parser::error::Diagnostic;

/// The main error type for Tessera operations.
///
/// # Diagnostic Variants
///
/// `Evaluation` carries the fatal diagnostic together with the evaluated
/// text, so it can be rendered with source spans.
#[derive(Debug, Error)]
pub enum TesseraError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config error in {}: {reason}", path.display())]
    ConfigFile { path: PathBuf, reason: String },

    #[error("{diagnostic}")]
    Evaluation { diagnostic: Diagnostic, src: String },

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("Data set graph error: {0}")]
    Core(#[from] CoreError),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl TesseraError {
    /// Create a new `Evaluation` error with the associated source text.
    pub fn new_evaluation_error(diagnostic: Diagnostic, src: impl Into<String>) -> Self {
        Self::Evaluation {
            diagnostic,
            src: src.into(),
        }
    }
}
