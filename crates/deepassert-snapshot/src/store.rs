use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use deepassert_types::{Category, Key, ObjectRef, TypeRegistry};

use crate::error::{StoreError, StoreResult};

/// Read access to the persisted entity population.
///
/// Implementations are supplied by the host. Lookups by a supertype must
/// include instances of its declared subtypes. Failures propagate to the
/// caller unchanged; the session never retries.
pub trait EntityStore: Send + Sync {
    /// Every persisted instance of `entity_type`.
    fn read_all(&self, entity_type: &str) -> StoreResult<Vec<ObjectRef>>;

    /// The instance of `entity_type` with identifier `id`.
    ///
    /// Returns `Ok(None)` when no such instance exists.
    fn read_by_id(&self, entity_type: &str, id: &Key) -> StoreResult<Option<ObjectRef>>;
}

impl<S: EntityStore + ?Sized> EntityStore for Arc<S> {
    fn read_all(&self, entity_type: &str) -> StoreResult<Vec<ObjectRef>> {
        (**self).read_all(entity_type)
    }

    fn read_by_id(&self, entity_type: &str, id: &Key) -> StoreResult<Option<ObjectRef>> {
        (**self).read_by_id(entity_type, id)
    }
}

/// In-memory entity store keyed by runtime type and id.
///
/// Intended for tests and embedding. Instances are held by reference, so
/// mutating an inserted object is visible to later reads.
pub struct InMemoryEntityStore {
    registry: Arc<TypeRegistry>,
    entities: RwLock<HashMap<&'static str, BTreeMap<Key, ObjectRef>>>,
}

impl InMemoryEntityStore {
    /// An empty store that resolves types through `registry`.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Persist `entity`, replacing any instance of the same type and id.
    pub fn insert(&self, entity: &ObjectRef) -> StoreResult<()> {
        let type_name = entity.type_name();
        self.require_entity_type(type_name)?;
        let key = self
            .registry
            .entity_key(entity)
            .ok_or_else(|| StoreError::Backend(format!("cannot store {type_name} without an id")))?;
        self.entities
            .write()
            .expect("lock poisoned")
            .entry(type_name)
            .or_default()
            .insert(key, entity.clone());
        Ok(())
    }

    /// Delete the instance of `entity_type` (or a subtype) with `id`.
    /// Returns `true` if it existed.
    pub fn remove(&self, entity_type: &str, id: &Key) -> bool {
        let mut map = self.entities.write().expect("lock poisoned");
        for (stored_type, by_id) in map.iter_mut() {
            if self.registry.lineage(stored_type).contains(&entity_type)
                && by_id.remove(id).is_some()
            {
                return true;
            }
        }
        false
    }

    /// Number of stored instances across all types.
    pub fn len(&self) -> usize {
        self.entities
            .read()
            .expect("lock poisoned")
            .values()
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every stored instance.
    pub fn clear(&self) {
        self.entities.write().expect("lock poisoned").clear();
    }

    fn require_entity_type(&self, entity_type: &str) -> StoreResult<()> {
        match self.registry.classify_type(entity_type) {
            Some(Category::Entity) => Ok(()),
            _ => Err(StoreError::UnknownType(entity_type.to_string())),
        }
    }

    /// Stored runtime types that are `entity_type` or one of its subtypes, sorted.
    fn matching_types(
        &self,
        map: &HashMap<&'static str, BTreeMap<Key, ObjectRef>>,
        entity_type: &str,
    ) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = map
            .keys()
            .copied()
            .filter(|t| self.registry.lineage(t).contains(&entity_type))
            .collect();
        types.sort_unstable();
        types
    }
}

impl EntityStore for InMemoryEntityStore {
    fn read_all(&self, entity_type: &str) -> StoreResult<Vec<ObjectRef>> {
        self.require_entity_type(entity_type)?;
        let map = self.entities.read().expect("lock poisoned");
        Ok(self
            .matching_types(&map, entity_type)
            .into_iter()
            .flat_map(|t| map[t].values().cloned())
            .collect())
    }

    fn read_by_id(&self, entity_type: &str, id: &Key) -> StoreResult<Option<ObjectRef>> {
        self.require_entity_type(entity_type)?;
        let map = self.entities.read().expect("lock poisoned");
        Ok(self
            .matching_types(&map, entity_type)
            .into_iter()
            .find_map(|t| map[t].get(id).cloned()))
    }
}

impl std::fmt::Debug for InMemoryEntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEntityStore")
            .field("entity_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepassert_types::{Record, Value};

    fn registry() -> Arc<TypeRegistry> {
        let mut r = TypeRegistry::new();
        r.register_entity("Animal", "id")
            .declare_subtype("Dog", "Animal")
            .declare_subtype("Cat", "Animal")
            .register_value_object("Address");
        Arc::new(r)
    }

    fn entity(type_name: &'static str, id: i64) -> ObjectRef {
        Record::new(type_name).with("id", id).into_ref()
    }

    #[test]
    fn insert_and_read_back() {
        let store = InMemoryEntityStore::new(registry());
        let dog = entity("Dog", 1);
        store.insert(&dog).unwrap();
        assert_eq!(store.len(), 1);

        let found = store.read_by_id("Dog", &Key::Int(1)).unwrap().unwrap();
        assert!(found.ptr_eq(&dog));
        assert!(store.read_by_id("Dog", &Key::Int(2)).unwrap().is_none());
    }

    #[test]
    fn supertype_reads_include_subtypes() {
        let store = InMemoryEntityStore::new(registry());
        store.insert(&entity("Dog", 1)).unwrap();
        store.insert(&entity("Cat", 2)).unwrap();

        assert_eq!(store.read_all("Animal").unwrap().len(), 2);
        assert_eq!(store.read_all("Dog").unwrap().len(), 1);
        assert!(store.read_by_id("Animal", &Key::Int(2)).unwrap().is_some());
        assert!(store.read_by_id("Dog", &Key::Int(2)).unwrap().is_none());
    }

    #[test]
    fn remove_deletes_one_instance() {
        let store = InMemoryEntityStore::new(registry());
        store.insert(&entity("Dog", 1)).unwrap();
        assert!(store.remove("Animal", &Key::Int(1)));
        assert!(!store.remove("Animal", &Key::Int(1)));
        assert!(store.is_empty());
    }

    #[test]
    fn non_entity_types_are_rejected() {
        let store = InMemoryEntityStore::new(registry());
        let address = Record::new("Address").with("id", 1).into_ref();
        assert_eq!(
            store.insert(&address),
            Err(StoreError::UnknownType("Address".into()))
        );
        assert!(matches!(store.read_all("Address"), Err(StoreError::UnknownType(_))));
    }

    #[test]
    fn entities_need_an_id() {
        let store = InMemoryEntityStore::new(registry());
        let anonymous = Record::new("Dog").with("id", Value::Null).into_ref();
        assert!(matches!(store.insert(&anonymous), Err(StoreError::Backend(_))));
    }
}
