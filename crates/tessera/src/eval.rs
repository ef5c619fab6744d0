//! Macro evaluation.
//!
//! - [`registry`]: the [`Macro`] trait and the name to macro table
//! - [`builtins`]: the macros every registry starts with
//! - [`context`]: frames and cycle detection
//! - [`cache`]: per-pass memo of resolved values
//! - [`evaluator`]: the pass itself

pub mod builtins;
pub mod cache;
pub mod clock;
pub mod context;
pub mod evaluator;
pub mod registry;

pub use cache::{CachedParameterKey, MacroCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{ContextError, ContextStack, Subject};
pub use evaluator::{DEFAULT_MAX_DEPTH, Evaluation, Evaluator, Scope};
pub use registry::{Arity, Macro, MacroError, MacroRegistry};
