//! Error types for the dataset graph.

use thiserror::Error;

use crate::entity::EntityKind;

/// Errors raised while building or querying the dataset graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unknown reference alias `{0}`")]
    UnknownAlias(String),

    #[error("expected a {expected}, found a {found} named `{name}`")]
    WrongEntityKind {
        expected: EntityKind,
        found: EntityKind,
        name: String,
    },

    #[error("{kind} `{name}` is defined more than once")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("{kind} `{name}` does not exist")]
    MissingEntity { kind: EntityKind, name: String },

    #[error("`{value}` is not an option of list attribute `{attribute}`")]
    UnknownListValue { attribute: String, value: String },

    #[error("attribute `{attribute}` does not accept a {value_kind} value")]
    ValueKindMismatch {
        attribute: String,
        value_kind: &'static str,
    },
}
