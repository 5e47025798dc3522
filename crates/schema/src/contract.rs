//! The validation contract consumed by the factories.

use std::sync::Arc;

use serde_json::Value;

use crate::error::SchemaError;

/// Declared base kind of a schema's accepted values.
///
/// Factories use this to classify value objects as primitive wrappers
/// (string/number/boolean) versus composites.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BaseKind {
    String,
    Number,
    Boolean,
    Object,
}

impl BaseKind {
    pub fn is_primitive(self) -> bool {
        !matches!(self, BaseKind::Object)
    }
}

/// A validation schema.
///
/// `parse` either returns the validated (possibly canonicalized) value or a
/// [`SchemaError`] carrying the ordered list of field-level issues. Schemas
/// are immutable once built and shared via [`SchemaRef`].
pub trait Schema: Send + Sync {
    fn parse(&self, input: &Value) -> Result<Value, SchemaError>;

    /// Base kind introspection; composites report [`BaseKind::Object`].
    fn base_kind(&self) -> BaseKind {
        BaseKind::Object
    }
}

/// Shared handle to a schema.
pub type SchemaRef = Arc<dyn Schema>;
