//! Macro registry.
//!
//! Macros are looked up by name in a table built at startup. New macros
//! are added with [`MacroRegistry::register`]; there is no dynamic loading.

use std::fmt;

use indexmap::IndexMap;
use log::trace;
use thiserror::Error;

use tessera_parser::error::ErrorCode;

use crate::eval::{context::ContextError, evaluator::Scope};

/// Number of arguments a macro accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// Inclusive bounds
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
        match *self {
            Arity::Exact(n) => write!(f, "exactly {n} {}", plural(n)),
            Arity::Range(min, max) => write!(f, "{min} to {max} arguments"),
            Arity::AtLeast(n) => write!(f, "at least {n} {}", plural(n)),
        }
    }
}

/// Errors raised by a macro call.
///
/// All variants except [`MacroError::Context`] are scoped to the failing
/// call, which renders as an inline error marker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacroError {
    #[error("unknown macro `{0}`")]
    UnknownMacro(String),

    #[error("`{name}` takes {expected}, got {found}")]
    WrongArgumentCount {
        name: String,
        expected: Arity,
        found: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("invalid reference `{path}`: {reason}")]
    InvalidReference { path: String, reason: String },

    #[error(transparent)]
    Context(#[from] ContextError),
}

impl MacroError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            MacroError::UnknownMacro(_) => ErrorCode::E200,
            MacroError::WrongArgumentCount { .. } => ErrorCode::E201,
            MacroError::InvalidArgument(_) => ErrorCode::E202,
            MacroError::ReferenceNotFound(_) => ErrorCode::E203,
            MacroError::InvalidReference { .. } => ErrorCode::E204,
            MacroError::Context(ContextError::Cycle { .. }) => ErrorCode::E300,
            MacroError::Context(ContextError::DepthExceeded { .. }) => ErrorCode::E301,
            MacroError::Context(ContextError::MissingContext { .. }) => ErrorCode::E302,
        }
    }

    /// Whether the error aborts the whole evaluation pass.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MacroError::Context(_))
    }
}

/// A named macro implementation.
///
/// Arguments arrive fully evaluated: nested calls inside them have already
/// been replaced by their output. Argument count is checked against
/// [`Macro::arity`] before `call` runs.
pub trait Macro: Send + Sync {
    fn name(&self) -> &str;

    fn arity(&self) -> Arity;

    fn call(&self, args: &[String], scope: &mut Scope<'_, '_>) -> Result<String, MacroError>;
}

/// Name to implementation table.
#[derive(Default)]
pub struct MacroRegistry {
    macros: IndexMap<String, Box<dyn Macro>>,
}

impl MacroRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in macro.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::eval::builtins::register_all(&mut registry);
        registry
    }

    /// Add a macro, replacing any macro with the same name.
    pub fn register(&mut self, r#macro: impl Macro + 'static) -> &mut Self {
        self.macros
            .insert(r#macro.name().to_string(), Box::new(r#macro));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Macro> {
        self.macros.get(name).map(|m| m.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.macros.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Look up `name`, validate the argument count and run the macro.
    pub fn dispatch(
        &self,
        name: &str,
        args: &[String],
        scope: &mut Scope<'_, '_>,
    ) -> Result<String, MacroError> {
        let r#macro = self
            .get(name)
            .ok_or_else(|| MacroError::UnknownMacro(name.to_string()))?;

        let expected = r#macro.arity();
        if !expected.accepts(args.len()) {
            return Err(MacroError::WrongArgumentCount {
                name: name.to_string(),
                expected,
                found: args.len(),
            });
        }

        trace!(name, args:?; "Dispatching macro");
        r#macro.call(args, scope)
    }
}

impl fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroRegistry")
            .field("macros", &self.macros.keys().collect::<Vec<_>>())
            .finish()
    }
}
