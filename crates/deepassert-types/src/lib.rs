//! Foundation types for deep object-graph assertions.
//!
//! Every other deepassert crate depends on `deepassert-types`.
//!
//! # Key Types
//!
//! - [`Value`] / [`Key`] -- the dynamic value model and ordered map/set keys
//! - [`Reflect`] / [`ObjectRef`] -- host-object introspection and shared, identity-bearing handles
//! - [`Record`] -- a ready-made dynamic [`Reflect`] implementation
//! - [`TypeRegistry`] / [`Category`] -- entity, value-object and ignored registrations
//! - [`PropertyPath`] / [`Override`] / [`Expectation`] -- path-keyed caller overrides

pub mod error;
pub mod object;
pub mod path;
pub mod record;
pub mod registry;
pub mod value;

pub use error::TypeError;
pub use object::{ObjectRef, PropertyDescriptor, PropertyKind, Reflect};
pub use path::{Expectation, Override, PropertyPath};
pub use record::Record;
pub use registry::{Category, TypeRegistry};
pub use value::{Key, Value};
