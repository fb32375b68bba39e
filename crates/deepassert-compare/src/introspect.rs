//! Per-type property discovery.
//!
//! [`Introspector::describe`] returns the comparable properties of a type in
//! traversal order. Discovery runs once per type name; the result is cached
//! for the lifetime of the introspector and shared across threads.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use deepassert_types::{Category, ObjectRef, PropertyDescriptor, TypeRegistry, Value};

use crate::error::{CompareError, CompareResult};

/// Cached, ordered property descriptors per runtime type.
#[derive(Debug)]
pub struct Introspector {
    registry: Arc<TypeRegistry>,
    cache: RwLock<HashMap<&'static str, Arc<[PropertyDescriptor]>>>,
}

impl Introspector {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Comparable properties of `object`'s runtime type.
    ///
    /// Entity types drop their list, set and map properties. Properties whose
    /// declared type is a value object or entity come last, in declaration
    /// order among themselves.
    pub fn describe(&self, object: &ObjectRef) -> Arc<[PropertyDescriptor]> {
        let type_name = object.type_name();
        if let Some(hit) = self.cache.read().expect("lock poisoned").get(type_name) {
            return Arc::clone(hit);
        }

        let discovered = self.discover(type_name, object);
        let mut cache = self.cache.write().expect("lock poisoned");
        // A racing thread may have populated the entry; keep whichever landed first.
        Arc::clone(cache.entry(type_name).or_insert(discovered))
    }

    /// Read every described property of `object`, in traversal order.
    pub fn read(&self, object: &ObjectRef) -> CompareResult<Vec<(PropertyDescriptor, Value)>> {
        self.describe(object)
            .iter()
            .map(|d| {
                let value = object
                    .get(&d.name)
                    .ok_or_else(|| CompareError::UnreadableProperty {
                        type_name: object.type_name().to_string(),
                        property: d.name.clone(),
                    })?;
                Ok((d.clone(), value))
            })
            .collect()
    }

    /// Number of cached types.
    pub fn cached_types(&self) -> usize {
        self.cache.read().expect("lock poisoned").len()
    }

    fn discover(&self, type_name: &str, object: &ObjectRef) -> Arc<[PropertyDescriptor]> {
        let is_entity = self.registry.classify_type(type_name) == Some(Category::Entity);
        let (nested, mut flat): (Vec<_>, Vec<_>) = object
            .properties()
            .into_iter()
            .filter(|d| !(is_entity && d.kind.is_collection()))
            .partition(|d| self.registry.classify_kind(&d.kind).is_structured());
        flat.extend(nested);
        debug!(type_name, properties = flat.len(), "described type");
        flat.into()
    }
}
