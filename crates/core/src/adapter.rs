//! Schema adapters: nest value objects inside larger composite schemas.
//!
//! Two constructors wrap value-object semantics into something that plugs in
//! as a field schema: a generic, predicate-narrowed contract for "some value
//! object", and a specific one whose membership test is "this factory
//! accepts it".

use std::sync::Arc;

use serde_json::Value;

use domaincraft_schema::{BaseKind, Schema, SchemaError, SchemaRef};

use crate::error::DomainError;
use crate::value_object::ValueObjectFactory;

/// Predicate narrowing the values a generic adapter accepts.
pub type TypeCheck = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Configuration for [`generic_value_object_schema`].
#[derive(Clone, Default)]
pub struct GenericValueObject {
    type_name: Option<String>,
    type_check: Option<TypeCheck>,
}

impl GenericValueObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name used in issue messages when a value is rejected.
    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn type_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.type_check = Some(Arc::new(check));
        self
    }
}

struct GenericSchema {
    label: String,
    check: Option<TypeCheck>,
}

impl Schema for GenericSchema {
    fn parse(&self, input: &Value) -> Result<Value, SchemaError> {
        if input.is_null() {
            return Err(SchemaError::root(format!("expected a {}", self.label)));
        }
        if let Some(check) = &self.check {
            if !check(input) {
                return Err(SchemaError::root(format!("not a valid {}", self.label)));
            }
        }
        Ok(input.clone())
    }
}

/// Schema accepting any value-object-shaped value, optionally narrowed by a
/// custom predicate. Useful when a composite schema nests a value object
/// whose concrete type is left open.
pub fn generic_value_object_schema(config: GenericValueObject) -> SchemaRef {
    Arc::new(GenericSchema {
        label: config.type_name.unwrap_or_else(|| "value object".to_string()),
        check: config.type_check,
    })
}

struct SpecificSchema {
    factory: ValueObjectFactory,
}

impl Schema for SpecificSchema {
    fn parse(&self, input: &Value) -> Result<Value, SchemaError> {
        match self.factory.create(input.clone()) {
            Ok(instance) => Ok(if instance.is_primitive() {
                instance.value_of()
            } else {
                instance.as_value().clone()
            }),
            Err(DomainError::Validation(err)) => Err(err.source),
            Err(other) => Err(SchemaError::root(other.to_string())),
        }
    }

    fn base_kind(&self) -> BaseKind {
        self.factory.schema().base_kind()
    }
}

/// Schema accepting exactly the values the given factory accepts; parsing
/// yields the factory's canonical representation (the unwrapped primitive
/// for primitive wrappers, the validated field map otherwise).
pub fn specific_value_object_schema(factory: &ValueObjectFactory) -> SchemaRef {
    Arc::new(SpecificSchema {
        factory: factory.clone(),
    })
}
