//! The dynamic value model walked by comparisons and copies.
//!
//! A [`Value`] is either a scalar, a reference to a host object
//! ([`ObjectRef`]), or one of the four container shapes. Scalars and
//! containers are plain data; only [`Value::Object`] carries reference
//! identity.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::ObjectRef;

/// A node in an object graph.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Reference to a host object; identity is the allocation, not the contents.
    Object(ObjectRef),
    List(Vec<Value>),
    /// Unordered collection. Elements are matched by [`Key`] when compared.
    Set(Vec<Value>),
    Map(BTreeMap<Key, Value>),
    Optional(Option<Box<Value>>),
}

impl Value {
    /// Build a list from anything convertible into values.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a set from anything convertible into values.
    pub fn set<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// Build a map from key/value pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// A present optional.
    pub fn some(value: impl Into<Value>) -> Self {
        Self::Optional(Some(Box::new(value.into())))
    }

    /// An absent optional.
    pub fn none() -> Self {
        Self::Optional(None)
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for `Null` and for an absent optional.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Null | Self::Optional(None))
    }

    /// Returns `true` for `Null`, booleans, numbers and text.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Text(_)
        )
    }

    /// The referenced object, if this is an object value.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Emptiness for values where it is meaningful.
    ///
    /// `Null` counts as empty. Numbers, booleans and objects return `None`.
    pub fn is_empty(&self) -> Option<bool> {
        match self {
            Self::Null => Some(true),
            Self::Text(s) => Some(s.is_empty()),
            Self::List(items) | Self::Set(items) => Some(items.is_empty()),
            Self::Map(entries) => Some(entries.is_empty()),
            Self::Optional(inner) => Some(inner.is_none()),
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Object(_) => None,
        }
    }

    /// Number of elements for containers and characters for text.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Text(s) => Some(s.chars().count()),
            Self::List(items) | Self::Set(items) => Some(items.len()),
            Self::Map(entries) => Some(entries.len()),
            Self::Optional(inner) => Some(usize::from(inner.is_some())),
            _ => None,
        }
    }

    /// Key for a scalar value, `None` for objects and containers.
    pub fn scalar_key(&self) -> Option<Key> {
        match self {
            Self::Null => Some(Key::Null),
            Self::Bool(b) => Some(Key::Bool(*b)),
            Self::Int(i) => Some(Key::Int(*i)),
            Self::Float(f) => Some(Key::Float(f.to_bits())),
            Self::Text(s) => Some(Key::Text(s.clone())),
            _ => None,
        }
    }

    /// Short name of the value's shape, used in mismatch messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Object(_) => "object",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Optional(_) => "optional",
        }
    }
}

/// One-line rendering. Containers show their size, never their contents,
/// so rendering a cyclic graph terminates.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Object(o) => write!(f, "{o:?}"),
            Self::List(items) => write!(f, "list[{}]", items.len()),
            Self::Set(items) => write!(f, "set[{}]", items.len()),
            Self::Map(entries) => write!(f, "map[{}]", entries.len()),
            Self::Optional(None) => write!(f, "none"),
            Self::Optional(Some(inner)) => write!(f, "some({inner})"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Self::Object(o)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<Option<Value>> for Value {
    fn from(inner: Option<Value>) -> Self {
        Self::Optional(inner.map(Box::new))
    }
}

/// Ordered key for map entries and set elements.
///
/// Floats are keyed by their bit pattern so that keys stay totally ordered.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
    /// Structural key of a value object: property name to property key.
    Composite(Vec<(String, Key)>),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Self::Text(s) => write!(f, "{s}"),
            Self::Composite(parts) => {
                write!(f, "{{")?;
                for (i, (name, key)) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{name}={key}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness_of_each_shape() {
        assert_eq!(Value::Null.is_empty(), Some(true));
        assert_eq!(Value::from("").is_empty(), Some(true));
        assert_eq!(Value::from("x").is_empty(), Some(false));
        assert_eq!(Value::list(Vec::<Value>::new()).is_empty(), Some(true));
        assert_eq!(Value::map([("a", 1)]).is_empty(), Some(false));
        assert_eq!(Value::none().is_empty(), Some(true));
        assert_eq!(Value::some(3).is_empty(), Some(false));
        assert_eq!(Value::Int(0).is_empty(), None);
    }

    #[test]
    fn absent_covers_null_and_none() {
        assert!(Value::Null.is_absent());
        assert!(Value::none().is_absent());
        assert!(!Value::some(Value::Null).is_absent());
        assert!(!Value::Int(1).is_absent());
    }

    #[test]
    fn scalar_keys_order_totally() {
        let mut keys = vec![Key::from("b"), Key::Int(2), Key::from("a"), Key::Int(1)];
        keys.sort();
        assert_eq!(
            keys,
            vec![Key::Int(1), Key::Int(2), Key::from("a"), Key::from("b")]
        );
        assert_eq!(Value::Float(1.5).scalar_key(), Some(Key::Float(1.5f64.to_bits())));
    }

    #[test]
    fn display_does_not_expand_containers() {
        let v = Value::list([1, 2, 3]);
        assert_eq!(v.to_string(), "list[3]");
        assert_eq!(Value::some("x").to_string(), "some(\"x\")");
    }

    #[test]
    fn composite_key_display() {
        let key = Key::Composite(vec![("a".into(), Key::Int(1)), ("b".into(), Key::from("x"))]);
        assert_eq!(key.to_string(), "{a=1,b=x}");
    }

    #[test]
    fn key_serializes() {
        let json = serde_json::to_string(&Key::Int(7)).unwrap();
        assert_eq!(json, r#"{"Int":7}"#);
    }
}
