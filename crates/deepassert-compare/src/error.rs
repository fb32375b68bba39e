//! Error types for the compare crate.
//!
//! These are usage errors and copy failures. Data mismatches are never
//! errors: they are recorded on a [`Report`](crate::Report).

use deepassert_types::TypeError;

/// Errors that abort a comparison or copy.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CompareError {
    /// The comparison root is an object whose type is not registered.
    #[error("type {0} is not registered as an entity, value object, or ignored type")]
    UnregisteredType(String),

    /// The comparison root is null.
    #[error("comparison root must not be null")]
    NullRoot,

    /// A structured object could not be cloned.
    #[error("cannot copy {type_name}: {reason}")]
    CopyFailure { type_name: String, reason: String },

    /// A declared property could not be read during comparison.
    #[error("property `{property}` of {type_name} is not readable")]
    UnreadableProperty { type_name: String, property: String },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Convenience alias for compare results.
pub type CompareResult<T> = Result<T, CompareError>;
