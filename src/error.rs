//! Error types for the context field system.

use thiserror::Error;

/// Declaration-time errors.
///
/// All of these surface while a context class is being built, never at first
/// access.
#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("field `{0}` cannot specify both a default and a default factory")]
    DefaultConflict(String),

    #[error("mutable default ({kind}) is not allowed for field `{name}`: use a default factory")]
    MutableDefault { name: String, kind: &'static str },

    #[error(
        "class `{class}` must share the context of its base `{base}` \
         (bound to `{bound}`, base uses `{expected}`)"
    )]
    ContextMismatch {
        class: String,
        base: String,
        bound: String,
        expected: String,
    },

    #[error("class `{class}` declares field `{field}` more than once")]
    DuplicateField { class: String, field: String },
}

/// Access-time errors.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("field `{0}` is not set in the current context")]
    Unset(String),

    #[error("no field `{field}` declared on context class `{class}`")]
    UnknownField { class: String, field: String },

    #[error("`{0}` is not a registered context class")]
    NotAContextClass(String),

    #[error("no value for key `{0}`")]
    MissingKey(String),

    #[error("deletion is not supported through the mapping view")]
    UnsupportedDeletion,

    #[error("value conversion failed: {0}")]
    Value(#[from] serde_json::Error),

    #[error("declaration error: {0}")]
    Declaration(#[from] DeclarationError),
}
