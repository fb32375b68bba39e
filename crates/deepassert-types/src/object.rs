//! Reflection boundary between host objects and the assertion engine.
//!
//! Host types implement [`Reflect`] (by hand, through a generator, or by
//! using [`Record`](crate::Record)) and are shared as [`ObjectRef`] handles.
//! The engine only ever reads through these handles; the copier is the one
//! caller that writes, and it only writes to clones it created itself.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::error::TypeError;
use crate::value::Value;

/// Declared type of a property, as opposed to the runtime value it holds.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PropertyKind {
    Scalar,
    /// Reference to an object of the named type (or a subtype).
    Object(&'static str),
    List,
    Set,
    Map,
    Optional,
}

impl PropertyKind {
    /// Returns `true` for list, set and map properties.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List | Self::Set | Self::Map)
    }
}

/// A named, readable property of a host type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Runtime introspection for a host type.
///
/// `properties` must return the same descriptors for every instance of a
/// type: the engine caches them per [`type_name`](Reflect::type_name).
pub trait Reflect: Send + Sync + 'static {
    /// Runtime type name. Registry lookups and caches key on this.
    fn type_name(&self) -> &'static str;

    /// Declared properties in declaration order.
    fn properties(&self) -> Vec<PropertyDescriptor>;

    /// Read a property. `None` when the property does not exist or is not readable.
    fn get(&self, property: &str) -> Option<Value>;

    /// Write a property.
    fn set(&mut self, property: &str, value: Value) -> Result<(), TypeError>;

    /// A fresh instance of the same runtime type built without arguments,
    /// or `None` when the type offers no such constructor.
    fn instantiate(&self) -> Option<ObjectRef>;
}

/// Shared handle to a host object.
///
/// Cloning the handle shares the object. Two handles are the same node of a
/// graph exactly when [`ObjectRef::ptr_eq`] holds; structural equality plays
/// no part in identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<dyn Reflect>>);

impl ObjectRef {
    /// Wrap a host object in a new handle.
    pub fn new<T: Reflect>(object: T) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    /// Address of the shared allocation. Stable for as long as any handle lives.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Reference identity.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.identity() == other.identity()
    }

    pub fn type_name(&self) -> &'static str {
        self.read().type_name()
    }

    pub fn properties(&self) -> Vec<PropertyDescriptor> {
        self.read().properties()
    }

    pub fn get(&self, property: &str) -> Option<Value> {
        self.read().get(property)
    }

    pub fn set(&self, property: &str, value: Value) -> Result<(), TypeError> {
        self.write().set(property, value)
    }

    pub fn instantiate(&self) -> Option<ObjectRef> {
        self.read().instantiate()
    }

    /// Shared read access to the underlying object.
    pub fn read(&self) -> RwLockReadGuard<'_, dyn Reflect> {
        self.0.read().expect("lock poisoned")
    }

    /// Exclusive write access to the underlying object.
    pub fn write(&self) -> RwLockWriteGuard<'_, dyn Reflect> {
        self.0.write().expect("lock poisoned")
    }
}

/// Prints `Type@0xaddr` only, so that debugging a cyclic graph terminates.
impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Ok(guard) => write!(f, "{}@{:#x}", guard.type_name(), self.identity()),
            Err(_) => write!(f, "<locked>@{:#x}", self.identity()),
        }
    }
}
