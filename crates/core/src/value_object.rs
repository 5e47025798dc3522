//! Value object factory: immutable, attribute-compared records.
//!
//! A factory is a named, reusable blueprint. It validates input through its
//! schema, builds a record from the validated fields and binds the behavior
//! returned by the factory's methods closure. Instances expose no mutators;
//! any "change" produces a brand-new instance.
//!
//! The methods closure receives a handle to the factory itself, so method
//! bodies can call `create` recursively (e.g. `add` producing a new `Money`).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use domaincraft_schema::SchemaRef;

use crate::error::{DomainError, DomainResult};

/// A custom behavior bound to value object instances.
pub type Method = Arc<dyn Fn(&ValueObject, &[ValueObject]) -> DomainResult<ValueObject> + Send + Sync>;

/// Method name → behavior. Ordered so composition stays deterministic.
pub type MethodMap = BTreeMap<String, Method>;

/// Builds the method set for a factory, given a handle to that factory.
pub type MethodsFactory = Arc<dyn Fn(&ValueObjectFactory) -> MethodMap + Send + Sync>;

/// Derives an extended factory's schema from its parent's.
pub type SchemaComposer = Box<dyn FnOnce(SchemaRef) -> SchemaRef + Send>;

/// Arguments for [`ValueObjectFactory::new`].
pub struct ValueObjectSpec {
    name: String,
    schema: SchemaRef,
    methods_factory: MethodsFactory,
    override_is_primitive: Option<bool>,
}

impl ValueObjectSpec {
    pub fn new(name: impl Into<String>, schema: SchemaRef) -> Self {
        Self {
            name: name.into(),
            schema,
            methods_factory: Arc::new(|_| MethodMap::new()),
            override_is_primitive: None,
        }
    }

    /// Supply custom methods. The closure runs on every `create`, with the
    /// factory handle as argument; close over a clone of the handle inside
    /// method bodies to build instances recursively.
    pub fn methods<F>(mut self, methods_factory: F) -> Self
    where
        F: Fn(&ValueObjectFactory) -> MethodMap + Send + Sync + 'static,
    {
        self.methods_factory = Arc::new(methods_factory);
        self
    }

    /// Force the primitive-wrapper classification instead of deriving it
    /// from the schema's base kind.
    pub fn override_is_primitive(mut self, primitive: bool) -> Self {
        self.override_is_primitive = Some(primitive);
        self
    }
}

/// Arguments for [`ValueObjectFactory::extend`].
pub struct ValueObjectExtension {
    name: String,
    schema: Option<SchemaComposer>,
    methods_factory: MethodsFactory,
}

impl ValueObjectExtension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            methods_factory: Arc::new(|_| MethodMap::new()),
        }
    }

    /// Derive the extended schema from the parent's. Without this the
    /// parent's schema is reused as-is.
    pub fn schema<F>(mut self, compose: F) -> Self
    where
        F: FnOnce(SchemaRef) -> SchemaRef + Send + 'static,
    {
        self.schema = Some(Box::new(compose));
        self
    }

    pub fn methods<F>(mut self, methods_factory: F) -> Self
    where
        F: Fn(&ValueObjectFactory) -> MethodMap + Send + Sync + 'static,
    {
        self.methods_factory = Arc::new(methods_factory);
        self
    }
}

struct FactoryInner {
    name: Arc<str>,
    schema: SchemaRef,
    primitive: bool,
    override_is_primitive: Option<bool>,
    methods_factory: MethodsFactory,
}

/// Named, reusable blueprint for value objects. Cheap to clone; clones
/// share the same blueprint.
#[derive(Clone)]
pub struct ValueObjectFactory {
    inner: Arc<FactoryInner>,
}

impl ValueObjectFactory {
    pub fn new(spec: ValueObjectSpec) -> DomainResult<Self> {
        if spec.name.trim().is_empty() {
            return Err(DomainError::configuration("value object name must not be empty"));
        }
        let primitive = spec
            .override_is_primitive
            .unwrap_or_else(|| spec.schema.base_kind().is_primitive());
        tracing::debug!(name = %spec.name, primitive, "value object factory constructed");
        Ok(Self {
            inner: Arc::new(FactoryInner {
                name: spec.name.into(),
                schema: spec.schema,
                primitive,
                override_is_primitive: spec.override_is_primitive,
                methods_factory: spec.methods_factory,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn schema(&self) -> SchemaRef {
        self.inner.schema.clone()
    }

    /// Whether instances wrap a single string/number/boolean primitive.
    /// Computed once at construction time.
    pub fn is_primitive(&self) -> bool {
        self.inner.primitive
    }

    /// Validate `data` and build an instance with bound behavior.
    pub fn create(&self, data: Value) -> DomainResult<ValueObject> {
        let validated = self.inner.schema.parse(&data).map_err(|source| {
            tracing::debug!(name = %self.inner.name, %source, "value object input rejected");
            DomainError::validation(self.inner.name.as_ref(), data, source)
        })?;
        let methods = Arc::new((self.inner.methods_factory)(self));
        Ok(ValueObject {
            type_name: self.inner.name.clone(),
            primitive: self.inner.primitive,
            value: validated,
            methods,
        })
    }

    /// Derive a new, independent factory. The child owns its own name and
    /// schema; its method set is the parent's overridden by the child's
    /// (child wins on name collision). The parent is unaffected.
    pub fn extend(&self, extension: ValueObjectExtension) -> DomainResult<Self> {
        if extension.name.trim().is_empty() {
            return Err(DomainError::configuration("extended value object name must not be empty"));
        }
        let schema = match extension.schema {
            Some(compose) => compose(self.inner.schema.clone()),
            None => self.inner.schema.clone(),
        };
        let parent_methods = self.inner.methods_factory.clone();
        let child_methods = extension.methods_factory;
        let methods_factory: MethodsFactory = Arc::new(move |factory| {
            let mut methods = parent_methods(factory);
            methods.extend(child_methods(factory));
            methods
        });
        let primitive = self
            .inner
            .override_is_primitive
            .unwrap_or_else(|| schema.base_kind().is_primitive());
        tracing::debug!(parent = %self.inner.name, child = %extension.name, "value object factory extended");
        Ok(Self {
            inner: Arc::new(FactoryInner {
                name: extension.name.into(),
                schema,
                primitive,
                override_is_primitive: self.inner.override_is_primitive,
                methods_factory,
            }),
        })
    }
}

impl fmt::Debug for ValueObjectFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueObjectFactory")
            .field("name", &self.inner.name)
            .field("primitive", &self.inner.primitive)
            .finish()
    }
}

/// An immutable, attribute-compared instance.
///
/// Fields are only readable; cloning shares the bound method set.
#[derive(Clone)]
pub struct ValueObject {
    type_name: Arc<str>,
    primitive: bool,
    value: Value,
    methods: Arc<MethodMap>,
}

impl ValueObject {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive
    }

    /// The validated value: a field map for composites, a bare primitive
    /// for primitive wrappers.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Validated fields, when the instance is a composite.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.value.as_object()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    /// Unwrap toward a primitive: primitive wrappers yield their wrapped
    /// value; composites with exactly one non-object field yield that
    /// field's value; anything else yields the full validated value.
    pub fn value_of(&self) -> Value {
        match &self.value {
            Value::Object(map) => {
                let mut non_object = map.values().filter(|v| !v.is_object());
                match (non_object.next(), non_object.next()) {
                    (Some(single), None) => single.clone(),
                    _ => self.value.clone(),
                }
            }
            scalar => scalar.clone(),
        }
    }

    /// Structural equality: primitive wrappers compare their unwrapped
    /// values, composites compare their full field sets.
    pub fn equals(&self, other: &ValueObject) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.primitive || other.primitive {
            self.value_of() == other.value_of()
        } else {
            self.value == other.value
        }
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Call a bound custom method.
    pub fn invoke(&self, method: &str, args: &[ValueObject]) -> DomainResult<ValueObject> {
        let behavior = self.methods.get(method).ok_or_else(|| {
            DomainError::configuration(format!("no method `{method}` on {}", self.type_name))
        })?;
        behavior(self, args)
    }
}

impl PartialEq for ValueObject {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for ValueObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.primitive {
            match self.value_of() {
                Value::String(s) => write!(f, "{s}"),
                v => write!(f, "{v}"),
            }
        } else {
            write!(f, "{}({})", self.type_name, self.value)
        }
    }
}

impl fmt::Debug for ValueObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueObject")
            .field("type_name", &self.type_name)
            .field("primitive", &self.primitive)
            .field("value", &self.value)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}
