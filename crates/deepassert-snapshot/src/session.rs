use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use deepassert_compare::{AssertConfig, CompareError, Comparator, FailureKind, Report};
use deepassert_types::{Category, ObjectRef, Override, PropertyPath, TypeRegistry, Value};

use crate::error::{AssertError, AssertResult};
use crate::snapshot::Snapshot;
use crate::store::EntityStore;

/// The assertion operations a test lifecycle drives, for one test.
///
/// Owns the comparator, the snapshot and the store handle. Comparisons and
/// reconciliation return the full report on success and escalate to
/// [`AssertError::Failed`] when it holds any failure.
pub struct AssertSession<S: EntityStore> {
    comparator: Comparator,
    store: S,
    snapshot: Snapshot,
}

impl<S: EntityStore> AssertSession<S> {
    /// A session with the default configuration.
    pub fn new(registry: Arc<TypeRegistry>, store: S) -> Self {
        Self::with_config(registry, AssertConfig::default(), store)
    }

    /// A session whose comparator uses `config`.
    pub fn with_config(registry: Arc<TypeRegistry>, config: AssertConfig, store: S) -> Self {
        Self::with_comparator(Comparator::with_config(registry, config), store)
    }

    /// Use a preconfigured comparator, e.g. one with a custom scalar equality.
    pub fn with_comparator(comparator: Comparator, store: S) -> Self {
        Self {
            comparator,
            store,
            snapshot: Snapshot::new(),
        }
    }

    /// The comparator every assertion in this session runs through.
    pub fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    /// The entity store captured and reconciled against.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current snapshot state.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn registry(&self) -> &TypeRegistry {
        self.comparator.registry()
    }

    /// Discard any previous snapshot and start tracking every entity type.
    pub fn begin_snapshot(&mut self) {
        self.snapshot.begin(self.comparator.registry());
    }

    /// Capture every persisted instance of every registered entity type.
    pub fn capture_snapshot(&mut self) -> AssertResult<Report> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();
        for entity_type in self.registry().entity_types() {
            for entity in self.store.read_all(entity_type)? {
                // A subtype instance is returned once per tracked ancestor.
                if seen.insert(entity.identity()) {
                    entities.push(entity);
                }
            }
        }
        self.capture_objects(&entities)
    }

    /// Capture explicit entity instances.
    pub fn capture_objects(&mut self, objects: &[ObjectRef]) -> AssertResult<Report> {
        let report = self.snapshot.capture(&self.comparator, objects)?;
        escalate(report)
    }

    /// Compare `actual` against overrides alone; every field must be covered.
    pub fn compare_object(
        &mut self,
        actual: &ObjectRef,
        overrides: Vec<Override>,
    ) -> AssertResult<Report> {
        let mut report = self.comparator.compare_with_overrides(actual, overrides)?;
        self.mark_root_asserted(&mut report, actual)?;
        escalate(report)
    }

    /// Compare an expected graph against `actual`.
    pub fn compare_objects(
        &mut self,
        expected: &Value,
        actual: &Value,
        overrides: Vec<Override>,
    ) -> AssertResult<Report> {
        let mut report = self.comparator.compare(expected, actual, overrides)?;
        if let Value::Object(root) = actual {
            self.mark_root_asserted(&mut report, root)?;
        }
        escalate(report)
    }

    /// Compare `entity` against its captured copy, with the changes the test
    /// made spelled out as overrides.
    ///
    /// An entity created after capture has no copy and is compared against
    /// the overrides alone.
    pub fn compare_entity_against_snapshot(
        &mut self,
        entity: &ObjectRef,
        overrides: Vec<Override>,
    ) -> AssertResult<Report> {
        let type_name = entity.type_name();
        if overrides.is_empty() {
            return Err(AssertError::NoOverrides {
                type_name: type_name.to_string(),
            });
        }
        if !self.snapshot.is_started() {
            return Err(AssertError::SnapshotNotStarted);
        }
        self.require_entity(entity)?;
        if self.registry().entity_key(entity).is_none() {
            return Err(AssertError::NullId {
                type_name: type_name.to_string(),
            });
        }

        let copy = self
            .snapshot
            .entry_for(self.registry(), entity)
            .and_then(|entry| entry.copy().cloned());
        debug!(type_name, captured = copy.is_some(), "comparing against snapshot");
        let report = match copy {
            Some(copy) => self.comparator.compare(
                &Value::Object(copy),
                &Value::Object(entity.clone()),
                overrides,
            )?,
            None => self.comparator.compare_with_overrides(entity, overrides)?,
        };
        if report.is_success() {
            self.snapshot.mark_asserted(self.comparator.registry(), entity)?;
        }
        escalate(report)
    }

    /// Assert that `entity` no longer exists in the store.
    pub fn mark_entity_deleted(&mut self, entity: &ObjectRef) -> AssertResult<Report> {
        self.require_entity(entity)?;
        let type_name = entity.type_name();
        let key = self
            .registry()
            .entity_key(entity)
            .ok_or_else(|| AssertError::NullId {
                type_name: type_name.to_string(),
            })?;

        let path = PropertyPath::root(type_name).child(&key);
        let mut report = Report::new(path.to_string());
        if self.store.read_by_id(type_name, &key)?.is_some() {
            report.failure(
                &path,
                FailureKind::NotDeleted,
                format!("{type_name} {key} still exists"),
            );
        } else {
            if self.comparator.config().record_successes {
                report.success(&path, "deleted");
            }
            if self.snapshot.is_started() {
                self.snapshot.mark_asserted(self.comparator.registry(), entity)?;
            }
        }
        escalate(report)
    }

    /// Exclude `entity` from reconciliation without checking it.
    pub fn ignore_entity(&mut self, entity: &ObjectRef) -> AssertResult<()> {
        self.require_entity(entity)?;
        self.snapshot.mark_asserted(self.comparator.registry(), entity)
    }

    /// Reconcile the snapshot against the store for every tracked type.
    pub fn reconcile_snapshot(&self) -> AssertResult<Report> {
        let report = self.snapshot.reconcile(&self.comparator, &self.store)?;
        escalate(report)
    }

    fn require_entity(&self, entity: &ObjectRef) -> AssertResult<()> {
        match self.registry().classify_type(entity.type_name()) {
            Some(Category::Entity) => Ok(()),
            _ => Err(CompareError::UnregisteredType(entity.type_name().to_string()).into()),
        }
    }

    /// A successfully compared root entity counts as asserted.
    fn mark_root_asserted(&mut self, report: &mut Report, root: &ObjectRef) -> AssertResult<()> {
        let registry = self.comparator.registry();
        if !self.snapshot.is_started()
            || registry.classify_type(root.type_name()) != Some(Category::Entity)
        {
            return Ok(());
        }
        if registry.entity_key(root).is_none() {
            report.failure(
                &PropertyPath::root(root.type_name()),
                FailureKind::IdMissing,
                "a compared entity must have an id to be tracked",
            );
            return Ok(());
        }
        if report.is_success() {
            self.snapshot.mark_asserted(registry, root)?;
        }
        Ok(())
    }
}

impl<S: EntityStore + std::fmt::Debug> std::fmt::Debug for AssertSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertSession")
            .field("store", &self.store)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}

fn escalate(report: Report) -> AssertResult<Report> {
    if report.is_success() {
        Ok(report)
    } else {
        Err(AssertError::Failed { report })
    }
}
