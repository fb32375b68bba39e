//! Type registration and classification.
//!
//! Hosts register which runtime types are entities, value objects, or
//! ignored, and declare subtype relations between type names. A type
//! inherits the registration of any declared ancestor; registering a
//! subtype never affects its supertype.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::object::{ObjectRef, PropertyKind};
use crate::value::{Key, Value};

/// How a value is compared and copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Primitive,
    ValueObject,
    Entity,
    Ignored,
    List,
    Set,
    Map,
    Optional,
}

impl Category {
    /// Value objects and entities: the categories walked property by property.
    pub fn is_structured(self) -> bool {
        matches!(self, Self::ValueObject | Self::Entity)
    }
}

/// Registry of entity, value-object and ignored types.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    /// Entity type -> name of its identifier property.
    entities: HashMap<String, String>,
    value_objects: HashSet<String>,
    ignored: HashSet<String>,
    /// Subtype -> declared direct supertypes, in declaration order.
    parents: HashMap<String, Vec<String>>,
    /// Registration order of entity types, for deterministic iteration.
    entity_order: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type identified by `id_property`.
    pub fn register_entity(&mut self, type_name: &str, id_property: &str) -> &mut Self {
        if self
            .entities
            .insert(type_name.to_string(), id_property.to_string())
            .is_none()
        {
            self.entity_order.push(type_name.to_string());
        }
        self
    }

    /// Register a type compared property by property.
    pub fn register_value_object(&mut self, type_name: &str) -> &mut Self {
        self.value_objects.insert(type_name.to_string());
        self
    }

    /// Register a type that is never inspected or copied.
    pub fn register_ignored(&mut self, type_name: &str) -> &mut Self {
        self.ignored.insert(type_name.to_string());
        self
    }

    /// Declare that `subtype` extends `supertype`.
    pub fn declare_subtype(&mut self, subtype: &str, supertype: &str) -> &mut Self {
        let parents = self.parents.entry(subtype.to_string()).or_default();
        if !parents.iter().any(|p| p == supertype) {
            parents.push(supertype.to_string());
        }
        self
    }

    /// The type itself followed by its declared ancestors, breadth-first.
    pub fn lineage<'a>(&'a self, type_name: &'a str) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut queue = VecDeque::from([type_name]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            if let Some(parents) = self.parents.get(current) {
                queue.extend(parents.iter().map(String::as_str));
            }
        }
        out
    }

    /// Category of a registered type, or `None` when neither the type nor
    /// any ancestor is registered.
    ///
    /// Precedence across the whole lineage: Ignored, then Entity, then ValueObject.
    pub fn classify_type(&self, type_name: &str) -> Option<Category> {
        let lineage = self.lineage(type_name);
        if lineage.iter().any(|t| self.ignored.contains(*t)) {
            Some(Category::Ignored)
        } else if lineage.iter().any(|t| self.entities.contains_key(*t)) {
            Some(Category::Entity)
        } else if lineage.iter().any(|t| self.value_objects.contains(*t)) {
            Some(Category::ValueObject)
        } else {
            None
        }
    }

    /// Category of a runtime value. Unregistered objects and scalars are Primitive.
    pub fn classify(&self, value: &Value) -> Category {
        match value {
            Value::Object(o) => self
                .classify_type(o.type_name())
                .unwrap_or(Category::Primitive),
            Value::List(_) => Category::List,
            Value::Set(_) => Category::Set,
            Value::Map(_) => Category::Map,
            Value::Optional(_) => Category::Optional,
            _ => Category::Primitive,
        }
    }

    /// Category implied by a declared property kind.
    pub fn classify_kind(&self, kind: &PropertyKind) -> Category {
        match kind {
            PropertyKind::Object(t) => self.classify_type(t).unwrap_or(Category::Primitive),
            PropertyKind::List => Category::List,
            PropertyKind::Set => Category::Set,
            PropertyKind::Map => Category::Map,
            PropertyKind::Optional => Category::Optional,
            PropertyKind::Scalar => Category::Primitive,
        }
    }

    /// Registered entity types in registration order.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.entity_order.iter().map(String::as_str)
    }

    /// The registered entity types an instance of `type_name` is tracked under:
    /// the type itself (when registered) and every registered ancestor.
    pub fn tracked_types_of<'a>(&'a self, type_name: &'a str) -> Vec<&'a str> {
        self.lineage(type_name)
            .into_iter()
            .filter(|t| self.entities.contains_key(*t))
            .collect()
    }

    /// Name of the identifier property, resolved through the lineage.
    pub fn id_property(&self, type_name: &str) -> Option<&str> {
        self.lineage(type_name)
            .into_iter()
            .find_map(|t| self.entities.get(t).map(String::as_str))
    }

    /// The identifier of an entity instance; `Null` when unset or unreadable.
    pub fn entity_id(&self, entity: &ObjectRef) -> Value {
        self.id_property(entity.type_name())
            .and_then(|p| entity.get(p))
            .unwrap_or(Value::Null)
    }

    /// Identifier as a key, `None` when the id is null or not a scalar.
    pub fn entity_key(&self, entity: &ObjectRef) -> Option<Key> {
        match self.entity_id(entity) {
            Value::Null => None,
            id => id.scalar_key(),
        }
    }

    /// Key used to match a set element against the other side.
    ///
    /// Scalars key as themselves and entities by their id. Value objects,
    /// and entities whose id is still null, key as a composite of their
    /// properties; a reference back into an object already being keyed
    /// contributes `Null`. Other objects key by type name and identity.
    pub fn element_key(&self, value: &Value) -> Key {
        let mut visiting = HashSet::new();
        self.element_key_inner(value, &mut visiting)
    }

    fn element_key_inner(&self, value: &Value, visiting: &mut HashSet<usize>) -> Key {
        if let Some(key) = value.scalar_key() {
            return key;
        }
        match value {
            Value::Object(o) => match self.classify(value) {
                Category::Entity => match self.entity_key(o) {
                    Some(key) => key,
                    None => self.composite_key(o, visiting),
                },
                Category::Ignored => Key::Text(o.type_name().to_string()),
                Category::ValueObject => self.composite_key(o, visiting),
                _ => Key::Text(format!("{o:?}")),
            },
            Value::List(items) | Value::Set(items) => Key::Composite(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), self.element_key_inner(v, visiting)))
                    .collect(),
            ),
            Value::Map(entries) => Key::Composite(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), self.element_key_inner(v, visiting)))
                    .collect(),
            ),
            Value::Optional(inner) => inner
                .as_deref()
                .map(|v| self.element_key_inner(v, visiting))
                .unwrap_or(Key::Null),
            _ => Key::Null,
        }
    }

    fn composite_key(&self, o: &ObjectRef, visiting: &mut HashSet<usize>) -> Key {
        if !visiting.insert(o.identity()) {
            return Key::Null;
        }
        let parts = o
            .properties()
            .into_iter()
            .map(|d| {
                let v = o.get(&d.name).unwrap_or_default();
                let k = self.element_key_inner(&v, visiting);
                (d.name, k)
            })
            .collect();
        visiting.remove(&o.identity());
        Key::Composite(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn registry() -> TypeRegistry {
        let mut r = TypeRegistry::new();
        r.register_entity("Animal", "id")
            .register_entity("Dog", "id")
            .register_value_object("Address")
            .register_ignored("Clock")
            .declare_subtype("Dog", "Animal")
            .declare_subtype("Puppy", "Dog")
            .declare_subtype("HomeAddress", "Address")
            .declare_subtype("AtomicClock", "Clock");
        r
    }

    #[test]
    fn subtype_inherits_registration() {
        let r = registry();
        assert_eq!(r.classify_type("Puppy"), Some(Category::Entity));
        assert_eq!(r.classify_type("HomeAddress"), Some(Category::ValueObject));
        assert_eq!(r.classify_type("AtomicClock"), Some(Category::Ignored));
    }

    #[test]
    fn supertype_does_not_match_registered_subtype() {
        let mut r = TypeRegistry::new();
        r.register_value_object("Circle").declare_subtype("Circle", "Shape");
        assert_eq!(r.classify_type("Shape"), None);
        assert_eq!(r.classify_type("Circle"), Some(Category::ValueObject));
    }

    #[test]
    fn ignored_wins_over_entity() {
        let mut r = registry();
        r.register_ignored("Dog");
        assert_eq!(r.classify_type("Puppy"), Some(Category::Ignored));
        assert_eq!(r.classify_type("Animal"), Some(Category::Entity));
    }

    #[test]
    fn entity_wins_over_value_object() {
        let mut r = TypeRegistry::new();
        r.register_value_object("Base")
            .register_entity("Derived", "id")
            .declare_subtype("Derived", "Base");
        assert_eq!(r.classify_type("Derived"), Some(Category::Entity));
    }

    #[test]
    fn unregistered_objects_are_primitive() {
        let r = registry();
        let v = Value::Object(Record::new("Money").with("cents", 5).into_ref());
        assert_eq!(r.classify(&v), Category::Primitive);
        assert_eq!(r.classify(&Value::Int(1)), Category::Primitive);
        assert_eq!(r.classify(&Value::list([1])), Category::List);
        assert_eq!(r.classify(&Value::none()), Category::Optional);
    }

    #[test]
    fn lineage_survives_declared_cycles() {
        let mut r = TypeRegistry::new();
        r.declare_subtype("A", "B").declare_subtype("B", "A");
        assert_eq!(r.lineage("A"), vec!["A", "B"]);
        assert_eq!(r.classify_type("A"), None);
    }

    #[test]
    fn tracked_types_include_every_registered_ancestor() {
        let r = registry();
        assert_eq!(r.tracked_types_of("Puppy"), vec!["Dog", "Animal"]);
        assert_eq!(r.tracked_types_of("Dog"), vec!["Dog", "Animal"]);
        assert_eq!(r.id_property("Puppy"), Some("id"));
        assert_eq!(r.entity_types().collect::<Vec<_>>(), vec!["Animal", "Dog"]);
    }

    #[test]
    fn entity_ids_and_keys() {
        let r = registry();
        let dog = Record::new("Dog").with("id", 7).into_ref();
        let anonymous = Record::new("Dog").with("id", Value::Null).into_ref();
        assert_eq!(r.entity_key(&dog), Some(Key::Int(7)));
        assert!(r.entity_id(&anonymous).is_null());
        assert_eq!(r.entity_key(&anonymous), None);
    }

    #[test]
    fn value_objects_key_structurally() {
        let r = registry();
        let a = Record::new("Address").with("street", "Main").into_ref();
        let b = Record::new("Address").with("street", "Main").into_ref();
        assert_eq!(
            r.element_key(&Value::Object(a)),
            r.element_key(&Value::Object(b))
        );
    }

    #[test]
    fn unsaved_entities_key_structurally() {
        let r = registry();
        let a = Record::new("Dog").with("id", Value::Null).with("name", "rex").into_ref();
        let b = Record::new("Dog").with("id", Value::Null).with("name", "rex").into_ref();
        let key = r.element_key(&Value::Object(a));
        assert_eq!(key, r.element_key(&Value::Object(b)));
        assert!(!key.to_string().contains('@'));
    }

    #[test]
    fn self_referencing_value_object_key_terminates() {
        let r = registry();
        let a = Record::new("Address")
            .with("street", "Main")
            .with_kind("next", PropertyKind::Object("Address"), Value::Null)
            .into_ref();
        a.set("next", Value::Object(a.clone())).unwrap();
        let key = r.element_key(&Value::Object(a));
        assert_eq!(
            key,
            Key::Composite(vec![
                ("street".into(), Key::from("Main")),
                ("next".into(), Key::Null),
            ])
        );
    }
}
