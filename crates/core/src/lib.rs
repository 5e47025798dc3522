//! `domaincraft-core` — factories for validated domain building blocks.
//!
//! Two sibling factories share one pattern: [`ValueObjectFactory`] builds
//! immutable, attribute-compared records; [`EntityFactory`] builds mutable,
//! identity-compared records with optional change history. Both validate
//! input through a [`domaincraft_schema::Schema`], bind caller-supplied
//! behavior, and raise exactly two error kinds at their boundary
//! (configuration and validation). The [`adapter`] module lets value objects
//! nest as fields inside larger composite schemas.

pub mod adapter;
pub mod entity;
pub mod error;
pub mod value_object;

pub use adapter::{GenericValueObject, TypeCheck, generic_value_object_schema, specific_value_object_schema};
pub use entity::{
    Entity, EntityExtension, EntityFactory, EntityMethod, EntityMethodMap, EntityMethodsFactory,
    EntitySpec, Snapshot,
};
pub use error::{ConfigurationError, DomainError, DomainResult, ValidationError};
pub use value_object::{
    Method, MethodMap, MethodsFactory, SchemaComposer, ValueObject, ValueObjectExtension,
    ValueObjectFactory, ValueObjectSpec,
};
