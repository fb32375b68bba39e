//! Structural comparison engine for deep object-graph assertions.
//!
//! Walks an expected and an actual graph in lockstep, classifying each node
//! through the [`TypeRegistry`](deepassert_types::TypeRegistry), consuming
//! caller overrides by path, and recording every terminal comparison on a
//! [`Report`]. Also provides the cycle-preserving [`DeepCopier`] used to take
//! snapshots.
//!
//! # Key Types
//!
//! - [`Comparator`] -- Expected-graph and override-only comparisons
//! - [`Report`] / [`Comment`] / [`FailureKind`] -- Hierarchical comparison results
//! - [`DeepCopier`] / [`CopyTracker`] -- Structural clones that keep shared references and cycles
//! - [`Introspector`] -- Cached, ordered property lists per runtime type
//! - [`IdentityTracker`] / [`OverrideSet`] -- Per-pass traversal state
//! - [`AssertConfig`] / [`ScalarEquality`] -- Comparison knobs

pub mod config;
pub mod copier;
pub mod engine;
pub mod error;
pub mod identity;
pub mod introspect;
pub mod overrides;
pub mod report;
pub mod scalar;

pub use config::AssertConfig;
pub use copier::{CopyTracker, DeepCopier};
pub use engine::Comparator;
pub use error::{CompareError, CompareResult};
pub use identity::{IdentityTracker, PairStatus};
pub use introspect::Introspector;
pub use overrides::OverrideSet;
pub use report::{Comment, FailureKind, Outcome, Report};
pub use scalar::{DefaultScalarEquality, ScalarEquality};
