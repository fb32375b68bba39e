//! [`Record`]: a dynamic [`Reflect`] implementation.
//!
//! Records let hosts without generated reflection (and the test-suites)
//! describe objects as a type name plus ordered, declared fields. All
//! records sharing a type name must declare the same fields, because
//! property discovery is cached per type name.

use crate::error::TypeError;
use crate::object::{ObjectRef, PropertyDescriptor, PropertyKind, Reflect};
use crate::value::Value;

#[derive(Clone, Debug)]
struct Field {
    descriptor: PropertyDescriptor,
    value: Value,
    readable: bool,
    writable: bool,
}

/// A named bag of declared, typed fields.
#[derive(Clone, Debug)]
pub struct Record {
    type_name: &'static str,
    fields: Vec<Field>,
    constructible: bool,
}

impl Record {
    /// An empty record of the given type that can be instantiated without arguments.
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            fields: Vec::new(),
            constructible: true,
        }
    }

    /// Add a field, inferring its declared kind from the value.
    ///
    /// `Null` infers [`PropertyKind::Scalar`]; use [`Record::with_kind`] for
    /// object or container fields that start out null.
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let kind = infer_kind(&value);
        self.with_kind(name, kind, value)
    }

    /// Add a field with an explicit declared kind.
    pub fn with_kind(
        mut self,
        name: impl Into<String>,
        kind: PropertyKind,
        value: impl Into<Value>,
    ) -> Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.descriptor.name == name) {
            Some(field) => {
                field.descriptor.kind = kind;
                field.value = value;
            }
            None => self.fields.push(Field {
                descriptor: PropertyDescriptor::new(name, kind),
                value,
                readable: true,
                writable: true,
            }),
        }
        self
    }

    /// Mark a field as not writable.
    pub fn read_only(mut self, name: &str) -> Self {
        if let Some(field) = self.fields.iter_mut().find(|f| f.descriptor.name == name) {
            field.writable = false;
        }
        self
    }

    /// Mark a field as declared but not readable.
    pub fn write_only(mut self, name: &str) -> Self {
        if let Some(field) = self.fields.iter_mut().find(|f| f.descriptor.name == name) {
            field.readable = false;
        }
        self
    }

    /// Make the type refuse argument-less construction.
    pub fn sealed(mut self) -> Self {
        self.constructible = false;
        self
    }

    /// Wrap in a shared handle.
    pub fn into_ref(self) -> ObjectRef {
        ObjectRef::new(self)
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.descriptor.name == name)
    }
}

fn infer_kind(value: &Value) -> PropertyKind {
    match value {
        Value::Object(o) => PropertyKind::Object(o.type_name()),
        Value::List(_) => PropertyKind::List,
        Value::Set(_) => PropertyKind::Set,
        Value::Map(_) => PropertyKind::Map,
        Value::Optional(_) => PropertyKind::Optional,
        _ => PropertyKind::Scalar,
    }
}

/// The value a field holds in a freshly constructed instance.
fn default_for(kind: &PropertyKind) -> Value {
    match kind {
        PropertyKind::List => Value::List(Vec::new()),
        PropertyKind::Set => Value::Set(Vec::new()),
        PropertyKind::Map => Value::Map(Default::default()),
        PropertyKind::Optional => Value::Optional(None),
        PropertyKind::Scalar | PropertyKind::Object(_) => Value::Null,
    }
}

fn accepts(kind: &PropertyKind, value: &Value) -> bool {
    match (kind, value) {
        (_, Value::Null) => true,
        (PropertyKind::Scalar, v) => v.is_scalar(),
        (PropertyKind::Object(_), Value::Object(_)) => true,
        (PropertyKind::List, Value::List(_)) => true,
        (PropertyKind::Set, Value::Set(_)) => true,
        (PropertyKind::Map, Value::Map(_)) => true,
        (PropertyKind::Optional, Value::Optional(_)) => true,
        _ => false,
    }
}

impl Reflect for Record {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn properties(&self) -> Vec<PropertyDescriptor> {
        self.fields.iter().map(|f| f.descriptor.clone()).collect()
    }

    fn get(&self, property: &str) -> Option<Value> {
        self.field(property)
            .filter(|f| f.readable)
            .map(|f| f.value.clone())
    }

    fn set(&mut self, property: &str, value: Value) -> Result<(), TypeError> {
        let type_name = self.type_name;
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.descriptor.name == property)
            .ok_or_else(|| TypeError::UnknownProperty {
                type_name: type_name.to_string(),
                property: property.to_string(),
            })?;
        if !field.writable {
            return Err(TypeError::ReadOnlyProperty {
                type_name: type_name.to_string(),
                property: property.to_string(),
            });
        }
        if !accepts(&field.descriptor.kind, &value) {
            return Err(TypeError::WrongKind {
                type_name: type_name.to_string(),
                property: property.to_string(),
                found: value.shape().to_string(),
            });
        }
        field.value = value;
        Ok(())
    }

    fn instantiate(&self) -> Option<ObjectRef> {
        if !self.constructible {
            return None;
        }
        let fields = self
            .fields
            .iter()
            .map(|f| Field {
                value: default_for(&f.descriptor.kind),
                ..f.clone()
            })
            .collect();
        Some(ObjectRef::new(Record {
            type_name: self.type_name,
            fields,
            constructible: true,
        }))
    }
}
