//! Structural cloning of object graphs for snapshots.
//!
//! Primitive and ignored values are shared with the source. Value objects and
//! entities are rebuilt from a fresh argument-less instance of the same
//! runtime type; containers are rebuilt element by element. A
//! [`CopyTracker`] maps each source object to its clone so shared references
//! and cycles are reproduced, not unrolled.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use deepassert_types::{Category, ObjectRef, Value};

use crate::error::{CompareError, CompareResult};
use crate::introspect::Introspector;

/// Source identity -> clone, for one root copy.
#[derive(Debug, Default)]
pub struct CopyTracker {
    // The source handle is retained so its address cannot be reused mid-copy.
    copies: HashMap<usize, (ObjectRef, ObjectRef)>,
}

impl CopyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &ObjectRef) -> Option<&ObjectRef> {
        self.copies.get(&source.identity()).map(|(_, clone)| clone)
    }

    fn insert(&mut self, source: &ObjectRef, clone: &ObjectRef) {
        self.copies
            .insert(source.identity(), (source.clone(), clone.clone()));
    }

    /// Number of objects cloned so far.
    pub fn len(&self) -> usize {
        self.copies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }
}

/// Deep copier over registered types.
#[derive(Debug, Clone)]
pub struct DeepCopier {
    introspector: Arc<Introspector>,
}

impl DeepCopier {
    pub fn new(introspector: Arc<Introspector>) -> Self {
        Self { introspector }
    }

    /// Copy a whole graph with a fresh tracker.
    pub fn copy_root(&self, value: &Value) -> CompareResult<Value> {
        self.copy(value, &mut CopyTracker::new())
    }

    /// Copy `value`, reusing clones already recorded in `tracker`.
    pub fn copy(&self, value: &Value, tracker: &mut CopyTracker) -> CompareResult<Value> {
        match value {
            Value::Object(source) => self.copy_object(source, tracker),
            Value::List(items) => Ok(Value::List(self.copy_all(items, tracker)?)),
            Value::Set(items) => Ok(Value::Set(self.copy_all(items, tracker)?)),
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.copy(v, tracker)?)))
                .collect::<CompareResult<_>>()
                .map(Value::Map),
            Value::Optional(inner) => match inner {
                Some(v) => Ok(Value::Optional(Some(Box::new(self.copy(v, tracker)?)))),
                None => Ok(Value::Optional(None)),
            },
            scalar => Ok(scalar.clone()),
        }
    }

    fn copy_all(&self, items: &[Value], tracker: &mut CopyTracker) -> CompareResult<Vec<Value>> {
        items.iter().map(|v| self.copy(v, tracker)).collect()
    }

    fn copy_object(&self, source: &ObjectRef, tracker: &mut CopyTracker) -> CompareResult<Value> {
        let registry = self.introspector.registry();
        let category = registry
            .classify_type(source.type_name())
            .unwrap_or(Category::Primitive);
        if !category.is_structured() {
            return Ok(Value::Object(source.clone()));
        }
        if let Some(existing) = tracker.get(source) {
            return Ok(Value::Object(existing.clone()));
        }

        let type_name = source.type_name();
        let clone = source
            .instantiate()
            .ok_or_else(|| copy_failure(type_name, "no zero-argument constructor"))?;
        // Registered before descending so that back-references resolve to this clone.
        tracker.insert(source, &clone);
        trace!(type_name, "copying object");

        let descriptors = self.introspector.describe(source);
        for descriptor in descriptors.iter() {
            self.copy_property(source, &clone, &descriptor.name, tracker)?;
        }

        if category == Category::Entity {
            if let Some(id) = registry.id_property(type_name) {
                if !descriptors.iter().any(|d| d.name == id) {
                    self.copy_property(source, &clone, id, tracker)?;
                }
            }
        }

        Ok(Value::Object(clone))
    }

    fn copy_property(
        &self,
        source: &ObjectRef,
        clone: &ObjectRef,
        property: &str,
        tracker: &mut CopyTracker,
    ) -> CompareResult<()> {
        let type_name = source.type_name();
        let value = source
            .get(property)
            .ok_or_else(|| copy_failure(type_name, format!("property `{property}` is not readable")))?;
        let copied = self.copy(&value, tracker)?;
        clone
            .set(property, copied)
            .map_err(|e| copy_failure(type_name, e.to_string()))
    }
}

fn copy_failure(type_name: &str, reason: impl Into<String>) -> CompareError {
    CompareError::CopyFailure {
        type_name: type_name.to_string(),
        reason: reason.into(),
    }
}
