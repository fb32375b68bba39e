//! Before/after state of the tracked entity population.
//!
//! A [`Snapshot`] holds, per registered entity type, one [`CopyAssert`] per
//! entity id: a structural clone taken at capture time plus an `asserted`
//! flag. Reconciliation compares the snapshot against the current store
//! contents and reports every change that no assertion accounted for.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use deepassert_compare::{CompareError, Comparator, FailureKind, Report};
use deepassert_types::{Key, ObjectRef, PropertyPath, TypeRegistry, Value};

use crate::error::{AssertError, AssertResult};
use crate::store::EntityStore;

/// Captured clone of one entity and whether an assertion has touched it.
#[derive(Clone, Debug)]
pub struct CopyAssert {
    copy: Option<ObjectRef>,
    asserted: bool,
}

impl CopyAssert {
    fn captured(copy: ObjectRef) -> Self {
        Self {
            copy: Some(copy),
            asserted: false,
        }
    }

    /// Entry for an entity first seen after capture.
    fn created() -> Self {
        Self {
            copy: None,
            asserted: true,
        }
    }

    /// The clone taken at capture, `None` for an entity created during the test.
    pub fn copy(&self) -> Option<&ObjectRef> {
        self.copy.as_ref()
    }

    /// Whether an assertion has accounted for this entity.
    pub fn is_asserted(&self) -> bool {
        self.asserted
    }
}

/// Tracked entity type -> id -> captured state.
#[derive(Debug, Default)]
pub struct Snapshot {
    started: bool,
    tracked: HashMap<String, BTreeMap<Key, CopyAssert>>,
}

impl Snapshot {
    /// An empty snapshot; call [`begin`](Self::begin) before capturing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`begin`](Self::begin) has run.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Clear all state and open an empty map for every registered entity type.
    pub fn begin(&mut self, registry: &TypeRegistry) {
        self.tracked = registry
            .entity_types()
            .map(|t| (t.to_string(), BTreeMap::new()))
            .collect();
        self.started = true;
        debug!(types = self.tracked.len(), "snapshot started");
    }

    /// Number of tracked entries under `entity_type`.
    pub fn len_of(&self, entity_type: &str) -> usize {
        self.tracked.get(entity_type).map_or(0, BTreeMap::len)
    }

    /// The entry for `id` under the tracked type `entity_type`.
    pub fn entry(&self, entity_type: &str, id: &Key) -> Option<&CopyAssert> {
        self.tracked.get(entity_type)?.get(id)
    }

    /// The entry for `entity`, looked up under its most specific tracked type.
    pub fn entry_for(&self, registry: &TypeRegistry, entity: &ObjectRef) -> Option<&CopyAssert> {
        let key = registry.entity_key(entity)?;
        let tracked = registry.tracked_types_of(entity.type_name());
        tracked.first().and_then(|t| self.entry(t, &key))
    }

    /// Deep-copy each entity into the snapshot as unasserted.
    ///
    /// A failing entity is recorded on the returned report and skipped; the
    /// rest are still captured.
    pub fn capture(
        &mut self,
        comparator: &Comparator,
        entities: &[ObjectRef],
    ) -> AssertResult<Report> {
        self.require_started()?;
        let registry = comparator.registry();
        let copier = comparator.copier();
        let mut report = Report::new("capture");

        for entity in entities {
            let type_name = entity.type_name();
            let tracked = registry.tracked_types_of(type_name);
            if tracked.is_empty() {
                return Err(CompareError::UnregisteredType(type_name.to_string()).into());
            }
            let path = PropertyPath::root(type_name);
            let Some(key) = registry.entity_key(entity) else {
                report.failure(&path, FailureKind::IdMissing, "cannot capture an entity without an id");
                continue;
            };
            let path = path.child(&key);

            let copy = match copier.copy_root(&Value::Object(entity.clone())) {
                Ok(Value::Object(copy)) => copy,
                Ok(other) => {
                    report.failure(
                        &path,
                        FailureKind::CopyFailure,
                        format!("copy produced a {} instead of an object", other.shape()),
                    );
                    continue;
                }
                Err(err) => {
                    warn!(entity = %path, error = %err, "snapshot capture failed");
                    report.failure(&path, FailureKind::CopyFailure, err.to_string());
                    continue;
                }
            };

            for tracked_type in tracked {
                self.tracked
                    .entry(tracked_type.to_string())
                    .or_default()
                    .insert(key.clone(), CopyAssert::captured(copy.clone()));
            }
            if comparator.config().record_successes {
                report.success(&path, "captured");
            }
        }

        debug!(
            entities = entities.len(),
            failures = report.failure_count(),
            "snapshot captured"
        );
        Ok(report)
    }

    /// Flag `entity` as asserted under its type and every tracked ancestor.
    ///
    /// An entity unknown to the snapshot gets an entry without a copy.
    pub fn mark_asserted(&mut self, registry: &TypeRegistry, entity: &ObjectRef) -> AssertResult<()> {
        self.require_started()?;
        let type_name = entity.type_name();
        let key = registry.entity_key(entity).ok_or_else(|| AssertError::NullId {
            type_name: type_name.to_string(),
        })?;
        for tracked_type in registry.tracked_types_of(type_name) {
            self.tracked
                .entry(tracked_type.to_string())
                .or_default()
                .entry(key.clone())
                .or_insert_with(CopyAssert::created)
                .asserted = true;
        }
        Ok(())
    }

    /// Compare the snapshot against the store, one child report per tracked type.
    ///
    /// Unasserted entities that vanished fail as disappeared; entities with no
    /// snapshot entry fail as never asserted; unasserted survivors are compared
    /// field by field against their captured copy.
    pub fn reconcile(
        &self,
        comparator: &Comparator,
        store: &dyn EntityStore,
    ) -> AssertResult<Report> {
        self.require_started()?;
        let registry = comparator.registry();
        let mut report = Report::new("reconcile");

        for entity_type in registry.entity_types() {
            let captured = self.tracked.get(entity_type);
            let type_report = report.child(entity_type);
            let root = PropertyPath::root(entity_type);

            let mut current = BTreeMap::new();
            for entity in store.read_all(entity_type)? {
                match registry.entity_key(&entity) {
                    Some(key) => {
                        current.insert(key, entity);
                    }
                    None => type_report.failure(
                        &root,
                        FailureKind::IdMissing,
                        format!("stored {} has a null id", entity.type_name()),
                    ),
                }
            }
            debug!(
                entity_type,
                captured = captured.map_or(0, BTreeMap::len),
                current = current.len(),
                "reconciling"
            );

            let empty = BTreeMap::new();
            let captured = captured.unwrap_or(&empty);
            for (key, entry) in captured {
                let path = root.child(key);
                match (current.get(key), entry.copy()) {
                    _ if entry.asserted => {}
                    (None, _) => type_report.failure(
                        &path,
                        FailureKind::Disappeared,
                        "disappeared without being asserted as deleted",
                    ),
                    (Some(now), Some(copy)) => {
                        let entity_root = PropertyPath::root(now.type_name()).child(key);
                        let diff = comparator.compare_at(
                            &entity_root,
                            &Value::Object(copy.clone()),
                            &Value::Object(now.clone()),
                            Vec::new(),
                        )?;
                        type_report.attach(diff);
                    }
                    (Some(_), None) => {}
                }
            }

            for key in current.keys().filter(|k| !captured.contains_key(*k)) {
                type_report.failure(
                    &root.child(key),
                    FailureKind::NeverAsserted,
                    "new entity was never asserted",
                );
            }
        }

        debug!(failures = report.failure_count(), "snapshot reconciled");
        Ok(report)
    }

    fn require_started(&self) -> AssertResult<()> {
        if self.started {
            Ok(())
        } else {
            Err(AssertError::SnapshotNotStarted)
        }
    }
}
