use deepassert_compare::{CompareError, Report};

/// Errors raised by an [`EntityStore`](crate::EntityStore) backend.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backend failed to read or write.
    #[error("store backend failure: {0}")]
    Backend(String),

    /// The requested type is not a registered entity type.
    #[error("entity type {0} is not known to the store")]
    UnknownType(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by an [`AssertSession`](crate::AssertSession).
///
/// Everything except [`AssertError::Failed`] is a usage error or a
/// collaborator failure. `Failed` carries the aggregated report of a
/// comparison, capture or reconciliation that did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum AssertError {
    #[error(transparent)]
    Usage(#[from] CompareError),

    /// A snapshot comparison was requested without any override.
    #[error("comparing {type_name} against its snapshot requires at least one override")]
    NoOverrides { type_name: String },

    /// The entity has no identifier, so it cannot be tracked.
    #[error("{type_name} has a null id")]
    NullId { type_name: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A snapshot operation ran before `begin_snapshot`.
    #[error("no snapshot has been started")]
    SnapshotNotStarted,

    /// The aggregated report has at least one failure.
    #[error("assertion failed with {} failure(s):\n{report}", report.failure_count())]
    Failed { report: Report },
}

impl AssertError {
    /// The failing report, for [`AssertError::Failed`].
    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Failed { report } => Some(report),
            _ => None,
        }
    }
}

/// Result alias for session operations.
pub type AssertResult<T> = Result<T, AssertError>;
