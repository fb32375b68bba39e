//! The recursive comparison engine.
//!
//! [`Comparator`] holds the long-lived parts (registry, introspection cache,
//! configuration, scalar equality). Every root comparison runs in its own
//! [`Pass`], which owns the identity tracker and the consumable override set
//! for exactly that call.
//!
//! Per node the order is fixed: reference and null checks, then the
//! identity-pair check (recording the pair before descending), then dispatch
//! on the expected value's category. Mismatches are recorded on the report
//! and the walk continues; only usage errors abort.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};

use deepassert_types::{
    Category, Expectation, Key, ObjectRef, Override, PropertyPath, TypeRegistry, Value,
};

use crate::config::AssertConfig;
use crate::copier::DeepCopier;
use crate::error::{CompareError, CompareResult};
use crate::identity::{IdentityTracker, PairStatus};
use crate::introspect::Introspector;
use crate::overrides::OverrideSet;
use crate::report::{FailureKind, Report};
use crate::scalar::{DefaultScalarEquality, ScalarEquality};

/// Structural comparison of object graphs.
#[derive(Clone)]
pub struct Comparator {
    introspector: Arc<Introspector>,
    config: AssertConfig,
    scalar: Arc<dyn ScalarEquality>,
}

impl Comparator {
    /// A comparator with the default configuration.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_config(registry, AssertConfig::default())
    }

    /// A comparator with explicit tolerance and reporting settings.
    pub fn with_config(registry: Arc<TypeRegistry>, config: AssertConfig) -> Self {
        Self::from_introspector(Arc::new(Introspector::new(registry)), config)
    }

    /// Share an existing introspection cache.
    pub fn from_introspector(introspector: Arc<Introspector>, config: AssertConfig) -> Self {
        let scalar = Arc::new(DefaultScalarEquality::from_config(&config));
        Self {
            introspector,
            config,
            scalar,
        }
    }

    /// Replace the equality used for Primitive values.
    pub fn with_scalar_equality(mut self, scalar: Arc<dyn ScalarEquality>) -> Self {
        self.scalar = scalar;
        self
    }

    /// The registry categories are resolved against.
    pub fn registry(&self) -> &TypeRegistry {
        self.introspector.registry()
    }

    /// The shared per-type property cache.
    pub fn introspector(&self) -> &Arc<Introspector> {
        &self.introspector
    }

    /// The settings this comparator was built with.
    pub fn config(&self) -> &AssertConfig {
        &self.config
    }

    /// A copier sharing this comparator's introspection cache.
    pub fn copier(&self) -> DeepCopier {
        DeepCopier::new(Arc::clone(&self.introspector))
    }

    /// Compare an expected graph against an actual one.
    ///
    /// Properties without an override must match the expected graph's own
    /// value at the same path.
    pub fn compare(
        &self,
        expected: &Value,
        actual: &Value,
        overrides: Vec<Override>,
    ) -> CompareResult<Report> {
        let root = PropertyPath::root(root_name(actual));
        self.compare_at(&root, expected, actual, overrides)
    }

    /// [`compare`](Self::compare) with every reported path starting at `root`.
    ///
    /// `root` may span several segments, e.g. `Person.7` to name one entity
    /// among many. Override paths stay relative to the compared object and
    /// may still be qualified with its type name.
    pub fn compare_at(
        &self,
        root: &PropertyPath,
        expected: &Value,
        actual: &Value,
        overrides: Vec<Override>,
    ) -> CompareResult<Report> {
        if expected.is_null() || actual.is_null() {
            return Err(CompareError::NullRoot);
        }
        for side in [expected, actual] {
            if let Value::Object(o) = side {
                self.require_registered(o)?;
            }
        }

        let mut pass = Pass::new(self, overrides, root, &root_name(actual));
        let mut report = Report::new(root.to_string());
        pass.compare_values(&mut report, root, expected, actual, true)?;
        pass.finish(&mut report);
        debug!(
            root = %root,
            failures = report.failure_count(),
            "comparison finished"
        );
        Ok(report)
    }

    /// Compare an object against overrides alone.
    ///
    /// Every property must be covered by an override, except value-object
    /// properties, which are descended into so nested overrides can cover
    /// their fields.
    pub fn compare_with_overrides(
        &self,
        actual: &ObjectRef,
        overrides: Vec<Override>,
    ) -> CompareResult<Report> {
        let category = self.require_registered(actual)?;
        if !category.is_structured() {
            return Err(CompareError::UnregisteredType(actual.type_name().to_string()));
        }

        let root = PropertyPath::root(actual.type_name());
        let mut pass = Pass::new(self, overrides, &root, actual.type_name());
        let mut report = Report::new(root.to_string());
        pass.visit_actual(actual);
        pass.compare_properties(&mut report, &root, None, actual)?;
        pass.finish(&mut report);
        debug!(
            root = %root,
            failures = report.failure_count(),
            "override comparison finished"
        );
        Ok(report)
    }

    fn require_registered(&self, object: &ObjectRef) -> CompareResult<Category> {
        self.registry()
            .classify_type(object.type_name())
            .ok_or_else(|| CompareError::UnregisteredType(object.type_name().to_string()))
    }
}

fn root_name(value: &Value) -> String {
    match value {
        Value::Object(o) => o.type_name().to_string(),
        other => other.shape().to_string(),
    }
}

/// State owned by one root comparison.
struct Pass<'c> {
    cmp: &'c Comparator,
    root: PropertyPath,
    tracker: IdentityTracker,
    overrides: OverrideSet,
    visited_actual: HashSet<usize>,
    retained: Vec<ObjectRef>,
}

impl<'c> Pass<'c> {
    fn new(
        cmp: &'c Comparator,
        overrides: Vec<Override>,
        root: &PropertyPath,
        qualifier: &str,
    ) -> Self {
        let mut overrides = OverrideSet::new(overrides);
        overrides.qualify_for_root(qualifier);
        Self {
            cmp,
            root: root.clone(),
            tracker: IdentityTracker::new(),
            overrides,
            visited_actual: HashSet::new(),
            retained: Vec::new(),
        }
    }

    /// Segments of `path` below the comparison root; override paths use these.
    fn relative<'p>(&self, path: &'p PropertyPath) -> &'p [String] {
        &path.segments()[self.root.len()..]
    }

    /// An override path re-attached under the comparison root.
    fn rooted(&self, rel: &PropertyPath) -> PropertyPath {
        rel.segments()
            .iter()
            .fold(self.root.clone(), |p, s| p.child(s))
    }

    fn registry(&self) -> &'c TypeRegistry {
        self.cmp.registry()
    }

    fn ok(&self, report: &mut Report, path: &PropertyPath, message: impl Into<String>) {
        if self.cmp.config.record_successes {
            report.success(path, message);
        }
    }

    /// Report everything still unconsumed as excess.
    fn finish(&mut self, report: &mut Report) {
        for excess in self.overrides.drain_all() {
            report.failure(
                &self.rooted(&excess.path),
                FailureKind::ExcessOverride,
                format!("override `{excess}` matched no property"),
            );
        }
    }

    /// Mark an actual-side object as visited in override-only mode.
    /// Returns `false` when it was already visited.
    fn visit_actual(&mut self, actual: &ObjectRef) -> bool {
        if self.visited_actual.insert(actual.identity()) {
            self.retained.push(actual.clone());
            true
        } else {
            false
        }
    }

    fn compare_values(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        expected: &Value,
        actual: &Value,
        at_root: bool,
    ) -> CompareResult<()> {
        if let (Value::Object(e), Value::Object(a)) = (expected, actual) {
            if e.ptr_eq(a) {
                self.ok(report, path, "same reference");
                return Ok(());
            }
        }
        match (expected.is_null(), actual.is_null()) {
            (true, true) => {
                self.ok(report, path, "both null");
                return Ok(());
            }
            (true, false) => {
                report.failure(
                    path,
                    FailureKind::ExclusiveNull,
                    format!("expected null but was {actual}"),
                );
                return Ok(());
            }
            (false, true) => {
                report.failure(
                    path,
                    FailureKind::ExclusiveNull,
                    format!("expected {expected} but was null"),
                );
                return Ok(());
            }
            (false, false) => {}
        }

        if let (Value::Object(e), Value::Object(a)) = (expected, actual) {
            match self.tracker.check(e, a) {
                PairStatus::ExactPairSeen => {
                    self.ok(report, path, "already compared in this pass");
                    return Ok(());
                }
                PairStatus::CrossedRole => {
                    report.failure(
                        path,
                        FailureKind::CrossRoleReference,
                        format!("{e:?} / {a:?} was already visited in the opposite role"),
                    );
                    return Ok(());
                }
                PairStatus::NewPair => self.tracker.record(e, a),
            }
        }

        let category = self.registry().classify(expected);
        trace!(path = %path, ?category, "comparing node");
        match (category, expected) {
            (Category::Ignored, _) => {
                self.ok(report, path, "ignored type");
                Ok(())
            }
            (Category::ValueObject, Value::Object(e)) => {
                self.compare_structured(report, path, e, actual)
            }
            (Category::Entity, Value::Object(e)) if at_root => {
                self.compare_structured(report, path, e, actual)
            }
            (Category::Entity, Value::Object(e)) => {
                self.compare_entity_ids(report, path, e, actual);
                Ok(())
            }
            (Category::List, Value::List(items)) => self.compare_lists(report, path, items, actual),
            (Category::Set, Value::Set(items)) => self.compare_sets(report, path, items, actual),
            (Category::Map, Value::Map(entries)) => self.compare_maps(report, path, entries, actual),
            (Category::Optional, Value::Optional(inner)) => {
                self.compare_optionals(report, path, inner.as_deref(), actual)
            }
            _ => {
                self.compare_scalars(report, path, expected, actual);
                Ok(())
            }
        }
    }

    fn compare_structured(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        expected: &ObjectRef,
        actual: &Value,
    ) -> CompareResult<()> {
        let Value::Object(actual) = actual else {
            shape_mismatch(report, path, &Value::Object(expected.clone()), actual);
            return Ok(());
        };
        if path.len() == self.root.len() {
            return self.compare_properties(report, path, Some(expected), actual);
        }
        let child = report.child(path.to_string());
        self.compare_properties(child, path, Some(expected), actual)
    }

    /// Walk the properties of one structured node.
    ///
    /// With an expected object, unmatched properties compare against its
    /// values; without one, they need an override.
    fn compare_properties(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        expected: Option<&ObjectRef>,
        actual: &ObjectRef,
    ) -> CompareResult<()> {
        let descriptors = self.cmp.introspector.describe(expected.unwrap_or(actual));
        for descriptor in descriptors.iter() {
            let child_path = path.child(&descriptor.name);
            let Some(actual_value) = actual.get(&descriptor.name) else {
                report.failure(
                    &child_path,
                    FailureKind::ScalarMismatch,
                    format!(
                        "{} has no readable property `{}`",
                        actual.type_name(),
                        descriptor.name
                    ),
                );
                continue;
            };

            let rel = self.relative(&child_path);
            if let Some(expectation) = self.overrides.take(rel) {
                self.apply(report, &child_path, expectation, &actual_value)?;
                continue;
            }

            match expected {
                Some(e) => {
                    let expected_value = e.get(&descriptor.name).ok_or_else(|| {
                        CompareError::UnreadableProperty {
                            type_name: e.type_name().to_string(),
                            property: descriptor.name.clone(),
                        }
                    })?;
                    self.compare_values(report, &child_path, &expected_value, &actual_value, false)?;
                }
                None => self.require_override(report, &child_path, &actual_value)?,
            }
        }

        let below = self.relative(path);
        for excess in self.overrides.drain_under(below) {
            report.failure(
                &self.rooted(&excess.path),
                FailureKind::ExcessOverride,
                format!("override `{excess}` matched no property"),
            );
        }
        Ok(())
    }

    fn require_override(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        actual: &Value,
    ) -> CompareResult<()> {
        if let Value::Object(a) = actual {
            if self.registry().classify(actual) == Category::ValueObject {
                if !self.visit_actual(a) {
                    self.ok(report, path, "already visited in this pass");
                    return Ok(());
                }
                let child = report.child(path.to_string());
                return self.compare_properties(child, path, None, a);
            }
        }
        report.failure(
            path,
            FailureKind::MissingOverride,
            format!(
                "no override supplied for `{}` (actual {actual})",
                self.relative(path).join(".")
            ),
        );
        Ok(())
    }

    fn apply(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        expectation: Expectation,
        actual: &Value,
    ) -> CompareResult<()> {
        match expectation {
            Expectation::Value(expected) => {
                return self.compare_values(report, path, &expected, actual, false);
            }
            Expectation::NotNull if actual.is_absent() => report.failure(
                path,
                FailureKind::ExclusiveNull,
                format!("expected a value but was {actual}"),
            ),
            Expectation::NotNull => self.ok(report, path, "not null"),
            Expectation::Null if actual.is_absent() => self.ok(report, path, "null"),
            Expectation::Null => report.failure(
                path,
                FailureKind::ExclusiveNull,
                format!("expected null but was {actual}"),
            ),
            Expectation::Empty | Expectation::NotEmpty => {
                let want_empty = matches!(expectation, Expectation::Empty);
                match actual.is_empty() {
                    None => report.failure(
                        path,
                        FailureKind::ScalarMismatch,
                        format!("{actual} cannot be empty or non-empty"),
                    ),
                    Some(empty) if empty == want_empty => {
                        self.ok(report, path, if empty { "empty" } else { "not empty" })
                    }
                    Some(true) => report.failure(
                        path,
                        FailureKind::SizeMismatch,
                        format!("expected a non-empty value but was {actual}"),
                    ),
                    Some(false) => report.failure(
                        path,
                        FailureKind::SizeMismatch,
                        format!(
                            "expected an empty value but was {actual} with {} elements",
                            actual.len().unwrap_or(0)
                        ),
                    ),
                }
            }
            Expectation::Ignored => self.ok(report, path, "ignored by override"),
        }
        Ok(())
    }

    /// Nested entities are compared by id only.
    fn compare_entity_ids(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        expected: &ObjectRef,
        actual: &Value,
    ) {
        let registry = self.registry();
        let Value::Object(actual_obj) = actual else {
            shape_mismatch(report, path, &Value::Object(expected.clone()), actual);
            return;
        };
        if registry.classify(actual) != Category::Entity {
            report.failure(
                path,
                FailureKind::ScalarMismatch,
                format!("expected entity {expected:?} but was {actual_obj:?}"),
            );
            return;
        }

        let expected_id = registry.entity_id(expected);
        if expected_id.is_null() {
            report.failure(
                path,
                FailureKind::IdMissing,
                format!("expected {} has no id", expected.type_name()),
            );
            return;
        }
        let actual_id = registry.entity_id(actual_obj);
        if actual_id.is_null() {
            report.failure(
                path,
                FailureKind::IdMissing,
                format!("actual {} has no id", actual_obj.type_name()),
            );
            return;
        }

        if self.cmp.scalar.scalar_equals(&expected_id, &actual_id) {
            self.ok(report, path, format!("{}#{expected_id}", expected.type_name()));
        } else {
            report.failure(
                path,
                FailureKind::ScalarMismatch,
                format!(
                    "expected {}#{expected_id} but was {}#{actual_id}",
                    expected.type_name(),
                    actual_obj.type_name()
                ),
            );
        }
    }

    fn compare_lists(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        expected: &[Value],
        actual: &Value,
    ) -> CompareResult<()> {
        let Value::List(actual_items) = actual else {
            shape_mismatch(report, path, &Value::List(expected.to_vec()), actual);
            return Ok(());
        };
        if expected.len() != actual_items.len() {
            report.failure(
                path,
                FailureKind::SizeMismatch,
                format!(
                    "expected {} elements but was {}",
                    expected.len(),
                    actual_items.len()
                ),
            );
            return Ok(());
        }
        for (index, (e, a)) in expected.iter().zip(actual_items).enumerate() {
            self.compare_values(report, &path.child(index), e, a, false)?;
        }
        Ok(())
    }

    fn compare_sets(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        expected: &[Value],
        actual: &Value,
    ) -> CompareResult<()> {
        let Value::Set(actual_items) = actual else {
            shape_mismatch(report, path, &Value::Set(expected.to_vec()), actual);
            return Ok(());
        };
        let registry = self.registry();
        let grouped = |items: &[Value]| -> BTreeMap<Key, Vec<Value>> {
            let mut groups: BTreeMap<Key, Vec<Value>> = BTreeMap::new();
            for v in items {
                groups.entry(registry.element_key(v)).or_default().push(v.clone());
            }
            groups
        };
        let expected = grouped(expected);
        let actual = grouped(actual_items);
        let none = Vec::new();

        for (key, e) in &expected {
            let a = actual.get(key).unwrap_or(&none);
            let key_path = path.child(key);
            for (expected_item, actual_item) in e.iter().zip(a) {
                self.compare_values(report, &key_path, expected_item, actual_item, false)?;
            }
            if e.len() > a.len() {
                report.failure(
                    &key_path,
                    FailureKind::ExcessExpected,
                    element_count_message(key, e.len(), a.len()),
                );
            }
        }
        for (key, a) in &actual {
            let e = expected.get(key).unwrap_or(&none);
            if a.len() > e.len() {
                report.failure(
                    &path.child(key),
                    FailureKind::ExcessActual,
                    element_count_message(key, e.len(), a.len()),
                );
            }
        }
        Ok(())
    }

    fn compare_maps(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        expected: &BTreeMap<Key, Value>,
        actual: &Value,
    ) -> CompareResult<()> {
        let Value::Map(actual_entries) = actual else {
            shape_mismatch(report, path, &Value::Map(expected.clone()), actual);
            return Ok(());
        };
        self.compare_keyed(report, path, expected, actual_entries)
    }

    fn compare_keyed(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        expected: &BTreeMap<Key, Value>,
        actual: &BTreeMap<Key, Value>,
    ) -> CompareResult<()> {
        for (key, e) in expected {
            let key_path = path.child(key);
            match actual.get(key) {
                Some(a) => self.compare_values(report, &key_path, e, a, false)?,
                None => report.failure(
                    &key_path,
                    FailureKind::ExcessExpected,
                    format!("key {key} is expected but absent from actual"),
                ),
            }
        }
        for key in actual.keys().filter(|k| !expected.contains_key(*k)) {
            report.failure(
                &path.child(key),
                FailureKind::ExcessActual,
                format!("key {key} is present in actual but not expected"),
            );
        }
        Ok(())
    }

    fn compare_optionals(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        expected: Option<&Value>,
        actual: &Value,
    ) -> CompareResult<()> {
        let Value::Optional(actual_inner) = actual else {
            let expected = Value::Optional(expected.cloned().map(Box::new));
            shape_mismatch(report, path, &expected, actual);
            return Ok(());
        };
        match (expected, actual_inner.as_deref()) {
            (None, None) => self.ok(report, path, "both empty"),
            (Some(e), None) => report.failure(
                path,
                FailureKind::ExclusiveNull,
                format!("expected some({e}) but was none"),
            ),
            (None, Some(a)) => report.failure(
                path,
                FailureKind::ExclusiveNull,
                format!("expected none but was some({a})"),
            ),
            (Some(e), Some(a)) => return self.compare_values(report, path, e, a, false),
        }
        Ok(())
    }

    fn compare_scalars(
        &mut self,
        report: &mut Report,
        path: &PropertyPath,
        expected: &Value,
        actual: &Value,
    ) {
        if self.cmp.scalar.scalar_equals(expected, actual) {
            self.ok(report, path, expected.to_string());
        } else {
            report.failure(
                path,
                FailureKind::ScalarMismatch,
                mismatch_message(expected, actual),
            );
        }
    }
}

fn element_count_message(key: &Key, expected: usize, actual: usize) -> String {
    format!("expected {expected} element(s) keyed {key} but was {actual}")
}

fn shape_mismatch(report: &mut Report, path: &PropertyPath, expected: &Value, actual: &Value) {
    report.failure(
        path,
        FailureKind::ScalarMismatch,
        format!(
            "expected a {} ({expected}) but was a {} ({actual})",
            expected.shape(),
            actual.shape()
        ),
    );
}

/// `expected X but was Y`; multi-line text also gets a unified diff.
fn mismatch_message(expected: &Value, actual: &Value) -> String {
    match (expected, actual) {
        (Value::Text(e), Value::Text(a)) if e.contains('\n') || a.contains('\n') => {
            let diff = similar::TextDiff::from_lines(e.as_str(), a.as_str());
            let unified = diff
                .unified_diff()
                .header("expected", "actual")
                .to_string();
            format!("expected {e:?} but was {a:?}\n{unified}")
        }
        _ => format!("expected {expected} but was {actual}"),
    }
}
