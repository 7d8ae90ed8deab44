//! Error types for yli_core

use thiserror::Error;

/// Errors that can occur while manipulating the ontology
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OntologyError {
    /// Name does not match `[A-Za-z][A-Za-z0-9_-]*`
    #[error("invalid name: `{0}`")]
    InvalidName(String),

    /// Name is already bound in the target scope
    #[error("name `{0}` is already in use")]
    DuplicateName(String),

    /// The entity has been terminated
    #[error("entity is no longer alive")]
    DeadEntity,

    /// The handle refers to a slot that has been freed or reused
    #[error("stale handle")]
    StaleHandle,

    /// The entity has no parent scope (the universe root)
    #[error("entity has no parent scope")]
    NoParent,

    /// Name or path did not resolve
    #[error("not found: `{0}`")]
    NotFound(String),

    /// The value or entity is of the wrong type
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A string could not be parsed into the requested type
    #[error("cannot parse `{input}` as {datatype}")]
    ParseFailure { input: String, datatype: String },

    /// The entity is not a variable
    #[error("entity is not a variable")]
    NotAVariable,

    /// The new parent is the entity itself or one of its descendants
    #[error("cannot bind an entity under itself")]
    CyclicParent,
}

/// Result type for yli_core operations
pub type Result<T> = std::result::Result<T, OntologyError>;
