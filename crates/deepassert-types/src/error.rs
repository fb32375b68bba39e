use thiserror::Error;

/// Errors produced by type-level operations: path parsing and property access.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("property path must not be empty (got {0:?})")]
    EmptyPath(String),

    #[error("type {type_name} has no property `{property}`")]
    UnknownProperty { type_name: String, property: String },

    #[error("property `{property}` of {type_name} is not writable")]
    ReadOnlyProperty { type_name: String, property: String },

    #[error("property `{property}` of {type_name} cannot hold {found}")]
    WrongKind {
        type_name: String,
        property: String,
        found: String,
    },
}
