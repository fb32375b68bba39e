//! Entity snapshots and the assertion session for deep object-graph assertions.
//!
//! A test captures the persisted entity population before it runs, asserts
//! the changes it expects, and reconciles at teardown: any entity that was
//! mutated, created or deleted without a matching assertion fails the test.
//!
//! # Key Types
//!
//! - [`AssertSession`] -- The operations a test lifecycle drives (capture, compare, reconcile)
//! - [`Snapshot`] / [`CopyAssert`] -- Captured clones and their asserted flags per entity type and id
//! - [`EntityStore`] / [`InMemoryEntityStore`] -- Read access to the persisted population
//! - [`AssertError`] -- Usage errors, store failures, and the escalated failing report

pub mod error;
pub mod session;
pub mod snapshot;
pub mod store;

pub use error::{AssertError, AssertResult, StoreError, StoreResult};
pub use session::AssertSession;
pub use snapshot::{CopyAssert, Snapshot};
pub use store::{EntityStore, InMemoryEntityStore};
