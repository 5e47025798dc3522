//! Entity factory: mutable, identity-compared records with a lifecycle.
//!
//! Structurally parallel to the value object factory, but instances carry a
//! designated identity field, are updated in place through the factory, and
//! can record an append-only log of pre-update snapshots.
//!
//! Entities are not safe for unmediated concurrent mutation; callers that
//! share an entity across threads must synchronize around `update`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use domaincraft_schema::SchemaRef;

use crate::error::{DomainError, DomainResult};
use crate::value_object::SchemaComposer;

/// A custom behavior bound to entity instances. Entity methods derive
/// values; state changes go through [`EntityFactory::update`].
pub type EntityMethod = Arc<dyn Fn(&Entity, &[Value]) -> DomainResult<Value> + Send + Sync>;

/// Method name → behavior.
pub type EntityMethodMap = BTreeMap<String, EntityMethod>;

/// Builds the method set for a factory, given a handle to that factory.
pub type EntityMethodsFactory = Arc<dyn Fn(&EntityFactory) -> EntityMethodMap + Send + Sync>;

/// A pre-update snapshot of an entity's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub recorded_at: DateTime<Utc>,
    pub fields: Map<String, Value>,
}

/// Arguments for [`EntityFactory::new`].
pub struct EntitySpec {
    name: String,
    schema: SchemaRef,
    identity: String,
    historize: bool,
    methods_factory: EntityMethodsFactory,
}

impl EntitySpec {
    pub fn new(name: impl Into<String>, schema: SchemaRef, identity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema,
            identity: identity.into(),
            historize: false,
            methods_factory: Arc::new(|_| EntityMethodMap::new()),
        }
    }

    /// Record a snapshot of the previous state on every successful update.
    pub fn historize(mut self, historize: bool) -> Self {
        self.historize = historize;
        self
    }

    pub fn methods<F>(mut self, methods_factory: F) -> Self
    where
        F: Fn(&EntityFactory) -> EntityMethodMap + Send + Sync + 'static,
    {
        self.methods_factory = Arc::new(methods_factory);
        self
    }
}

/// Arguments for [`EntityFactory::extend`]. Identity field and historize
/// flag propagate from the parent unless overridden.
pub struct EntityExtension {
    name: String,
    schema: Option<SchemaComposer>,
    identity: Option<String>,
    historize: Option<bool>,
    methods_factory: EntityMethodsFactory,
}

impl EntityExtension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            identity: None,
            historize: None,
            methods_factory: Arc::new(|_| EntityMethodMap::new()),
        }
    }

    pub fn schema<F>(mut self, compose: F) -> Self
    where
        F: FnOnce(SchemaRef) -> SchemaRef + Send + 'static,
    {
        self.schema = Some(Box::new(compose));
        self
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn historize(mut self, historize: bool) -> Self {
        self.historize = Some(historize);
        self
    }

    pub fn methods<F>(mut self, methods_factory: F) -> Self
    where
        F: Fn(&EntityFactory) -> EntityMethodMap + Send + Sync + 'static,
    {
        self.methods_factory = Arc::new(methods_factory);
        self
    }
}

struct EntityInner {
    name: Arc<str>,
    schema: SchemaRef,
    identity: Arc<str>,
    historize: bool,
    methods_factory: EntityMethodsFactory,
}

/// Named, reusable blueprint for entities. Cheap to clone; clones share
/// the same blueprint.
#[derive(Clone)]
pub struct EntityFactory {
    inner: Arc<EntityInner>,
}

impl EntityFactory {
    pub fn new(spec: EntitySpec) -> DomainResult<Self> {
        if spec.name.trim().is_empty() {
            return Err(DomainError::configuration("entity name must not be empty"));
        }
        if spec.identity.trim().is_empty() {
            return Err(DomainError::configuration("entity identity field must not be empty"));
        }
        tracing::debug!(name = %spec.name, identity = %spec.identity, historize = spec.historize, "entity factory constructed");
        Ok(Self {
            inner: Arc::new(EntityInner {
                name: spec.name.into(),
                schema: spec.schema,
                identity: spec.identity.into(),
                historize: spec.historize,
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

    /// Name of the field that is the primary key.
    pub fn identity(&self) -> &str {
        &self.inner.identity
    }

    pub fn historize(&self) -> bool {
        self.inner.historize
    }

    /// Validate `data` and build a mutable entity with bound behavior.
    pub fn create(&self, data: Value) -> DomainResult<Entity> {
        let validated = self.inner.schema.parse(&data).map_err(|source| {
            tracing::debug!(name = %self.inner.name, %source, "entity input rejected");
            DomainError::validation(self.inner.name.as_ref(), data, source)
        })?;
        let Value::Object(fields) = validated else {
            return Err(DomainError::configuration(format!(
                "entity schema for {} must validate to an object",
                self.inner.name
            )));
        };
        if !fields.contains_key(self.inner.identity.as_ref()) {
            return Err(DomainError::configuration(format!(
                "identity field `{}` missing from validated {} data",
                self.inner.identity, self.inner.name
            )));
        }
        let methods = Arc::new((self.inner.methods_factory)(self));
        Ok(Entity {
            type_name: self.inner.name.clone(),
            identity_field: self.inner.identity.clone(),
            fields,
            methods,
            history: self.inner.historize.then(Vec::new),
        })
    }

    /// Merge `patch` over the entity's fields, re-validate and apply in
    /// place. All-or-nothing: a failed validation leaves the entity
    /// untouched. The identity field must not appear in the patch.
    pub fn update(&self, entity: &mut Entity, patch: Value) -> DomainResult<()> {
        let Value::Object(patch) = patch else {
            return Err(DomainError::configuration("update patch must be an object"));
        };
        if entity.type_name.as_ref() != self.inner.name.as_ref() {
            return Err(DomainError::configuration(format!(
                "entity of type {} was not created by the {} factory",
                entity.type_name, self.inner.name
            )));
        }
        if patch.contains_key(self.inner.identity.as_ref()) {
            return Err(DomainError::configuration(format!(
                "identity field `{}` must not be updated",
                self.inner.identity
            )));
        }

        let mut merged = entity.fields.clone();
        merged.extend(patch);
        let merged = Value::Object(merged);
        let validated = self
            .inner
            .schema
            .parse(&merged)
            .map_err(|source| DomainError::validation(self.inner.name.as_ref(), merged.clone(), source))?;
        let Value::Object(new_fields) = validated else {
            return Err(DomainError::configuration(format!(
                "entity schema for {} must validate to an object",
                self.inner.name
            )));
        };
        if new_fields.get(self.inner.identity.as_ref()) != Some(entity.id()) {
            return Err(DomainError::invariant(format!(
                "identity field `{}` value changed during update",
                self.inner.identity
            )));
        }

        tracing::debug!(name = %self.inner.name, id = %entity.id(), "entity updated");
        let previous = std::mem::replace(&mut entity.fields, new_fields);
        if let Some(history) = entity.history.as_mut() {
            history.push(Snapshot {
                recorded_at: Utc::now(),
                fields: previous,
            });
        }
        Ok(())
    }

    /// Derive a new, independent factory; see [`ValueObjectFactory::extend`]
    /// for the composition rules.
    ///
    /// [`ValueObjectFactory::extend`]: crate::value_object::ValueObjectFactory::extend
    pub fn extend(&self, extension: EntityExtension) -> DomainResult<Self> {
        if extension.name.trim().is_empty() {
            return Err(DomainError::configuration("extended entity name must not be empty"));
        }
        let schema = match extension.schema {
            Some(compose) => compose(self.inner.schema.clone()),
            None => self.inner.schema.clone(),
        };
        let identity = extension
            .identity
            .unwrap_or_else(|| self.inner.identity.to_string());
        if identity.trim().is_empty() {
            return Err(DomainError::configuration("entity identity field must not be empty"));
        }
        let parent_methods = self.inner.methods_factory.clone();
        let child_methods = extension.methods_factory;
        let methods_factory: EntityMethodsFactory = Arc::new(move |factory| {
            let mut methods = parent_methods(factory);
            methods.extend(child_methods(factory));
            methods
        });
        tracing::debug!(parent = %self.inner.name, child = %extension.name, "entity factory extended");
        Ok(Self {
            inner: Arc::new(EntityInner {
                name: extension.name.into(),
                schema,
                identity: identity.into(),
                historize: extension.historize.unwrap_or(self.inner.historize),
                methods_factory,
            }),
        })
    }
}

impl fmt::Debug for EntityFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFactory")
            .field("name", &self.inner.name)
            .field("identity", &self.inner.identity)
            .field("historize", &self.inner.historize)
            .finish()
    }
}

/// A mutable, identity-compared instance. Mutation happens only through
/// [`EntityFactory::update`]; the identity field value never changes over
/// the entity's lifetime.
#[derive(Clone)]
pub struct Entity {
    type_name: Arc<str>,
    identity_field: Arc<str>,
    fields: Map<String, Value>,
    methods: Arc<EntityMethodMap>,
    history: Option<Vec<Snapshot>>,
}

impl Entity {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Value of the identity field.
    pub fn id(&self) -> &Value {
        // The factory guarantees presence at creation and across updates.
        self.fields
            .get(self.identity_field.as_ref())
            .unwrap_or(&Value::Null)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Identity-based equality: other field values are irrelevant.
    pub fn equals(&self, other: &Entity) -> bool {
        self.id() == other.id()
    }

    /// Pre-update snapshots, oldest first. Empty when the factory does not
    /// historize.
    pub fn history(&self) -> &[Snapshot] {
        self.history.as_deref().unwrap_or(&[])
    }

    pub fn is_historized(&self) -> bool {
        self.history.is_some()
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Call a bound custom method.
    pub fn invoke(&self, method: &str, args: &[Value]) -> DomainResult<Value> {
        let behavior = self.methods.get(method).ok_or_else(|| {
            DomainError::configuration(format!("no method `{method}` on {}", self.type_name))
        })?;
        behavior(self, args)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name, Value::Object(self.fields.clone()))
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type_name", &self.type_name)
            .field("identity_field", &self.identity_field)
            .field("fields", &self.fields)
            .field("history_len", &self.history.as_ref().map(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domaincraft_schema::{number, object, string};
    use proptest::prelude::*;
    use serde_json::json;

    fn customer_schema() -> SchemaRef {
        object()
            .field("id", string().non_empty().into_schema())
            .field("name", string().non_empty().into_schema())
            .field("credit", number().min(0.0).into_schema())
            .into_schema()
    }

    fn customer_factory() -> EntityFactory {
        EntityFactory::new(EntitySpec::new("Customer", customer_schema(), "id")).unwrap()
    }

    fn historized_factory() -> EntityFactory {
        EntityFactory::new(EntitySpec::new("Customer", customer_schema(), "id").historize(true))
            .unwrap()
    }

    #[test]
    fn empty_identity_is_a_configuration_error() {
        let err = EntityFactory::new(EntitySpec::new("Customer", customer_schema(), " "))
            .unwrap_err();
        match err {
            DomainError::Configuration(_) => {}
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn missing_identity_field_in_data_is_rejected() {
        let schema = object().field("name", string().into_schema()).into_schema();
        let factory = EntityFactory::new(EntitySpec::new("Customer", schema, "id")).unwrap();
        let err = factory.create(json!({"name": "Ada"})).unwrap_err();
        match err {
            DomainError::Configuration(c) => assert!(c.message.contains("id")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn equality_is_identity_based() {
        let factory = customer_factory();
        let a = factory
            .create(json!({"id": "c-1", "name": "Ada", "credit": 10}))
            .unwrap();
        let b = factory
            .create(json!({"id": "c-1", "name": "Grace", "credit": 99}))
            .unwrap();
        let c = factory
            .create(json!({"id": "c-2", "name": "Ada", "credit": 10}))
            .unwrap();
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
    }

    #[test]
    fn update_applies_in_place_and_preserves_identity() {
        let factory = customer_factory();
        let mut customer = factory
            .create(json!({"id": "c-1", "name": "Ada", "credit": 10}))
            .unwrap();

        factory.update(&mut customer, json!({"credit": 25})).unwrap();
        assert_eq!(customer.get("credit"), Some(&json!(25)));
        assert_eq!(customer.get("name"), Some(&json!("Ada")));
        assert_eq!(customer.id(), &json!("c-1"));
    }

    #[test]
    fn update_rejects_identity_field_in_patch() {
        let factory = customer_factory();
        let mut customer = factory
            .create(json!({"id": "c-1", "name": "Ada", "credit": 10}))
            .unwrap();

        let err = factory
            .update(&mut customer, json!({"id": "c-2"}))
            .unwrap_err();
        match err {
            DomainError::Configuration(c) => assert!(c.message.contains("id")),
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert_eq!(customer.id(), &json!("c-1"));
    }

    #[test]
    fn failed_update_leaves_entity_untouched() {
        let factory = customer_factory();
        let mut customer = factory
            .create(json!({"id": "c-1", "name": "Ada", "credit": 10}))
            .unwrap();
        let before = customer.fields().clone();

        let err = factory
            .update(&mut customer, json!({"credit": -5}))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(customer.fields(), &before);
        assert!(customer.history().is_empty());
    }

    #[test]
    fn history_records_one_snapshot_per_successful_update() {
        let factory = historized_factory();
        let mut customer = factory
            .create(json!({"id": "c-1", "name": "Ada", "credit": 10}))
            .unwrap();
        assert!(customer.is_historized());
        assert!(customer.history().is_empty());

        factory.update(&mut customer, json!({"credit": 20})).unwrap();
        factory.update(&mut customer, json!({"name": "Grace"})).unwrap();

        let history = customer.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].fields.get("credit"), Some(&json!(10)));
        assert_eq!(history[1].fields.get("credit"), Some(&json!(20)));
        assert_eq!(history[1].fields.get("name"), Some(&json!("Ada")));
        assert!(history[0].recorded_at <= history[1].recorded_at);
    }

    #[test]
    fn non_historized_entity_keeps_no_snapshots() {
        let factory = customer_factory();
        let mut customer = factory
            .create(json!({"id": "c-1", "name": "Ada", "credit": 10}))
            .unwrap();
        factory.update(&mut customer, json!({"credit": 20})).unwrap();
        assert!(!customer.is_historized());
        assert!(customer.history().is_empty());
    }

    #[test]
    fn foreign_entity_is_rejected_by_update() {
        let factory = customer_factory();
        let other = EntityFactory::new(EntitySpec::new("Supplier", customer_schema(), "id")).unwrap();
        let mut supplier = other
            .create(json!({"id": "s-1", "name": "Acme", "credit": 0}))
            .unwrap();

        let err = factory.update(&mut supplier, json!({"credit": 1})).unwrap_err();
        match err {
            DomainError::Configuration(_) => {}
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn entity_methods_derive_values() {
        let factory = EntityFactory::new(
            EntitySpec::new("Customer", customer_schema(), "id").methods(|_| {
                let mut methods = EntityMethodMap::new();
                methods.insert(
                    "display_name".into(),
                    Arc::new(|this: &Entity, _: &[Value]| {
                        let name = this.get("name").and_then(Value::as_str).unwrap_or("?");
                        Ok(json!(format!("Customer {name}")))
                    }) as EntityMethod,
                );
                methods
            }),
        )
        .unwrap();

        let customer = factory
            .create(json!({"id": "c-1", "name": "Ada", "credit": 10}))
            .unwrap();
        assert_eq!(
            customer.invoke("display_name", &[]).unwrap(),
            json!("Customer Ada")
        );
    }

    #[test]
    fn extend_propagates_identity_and_historize_unless_overridden() {
        let parent = historized_factory();

        let inherited = parent.extend(EntityExtension::new("Vip")).unwrap();
        assert_eq!(inherited.identity(), "id");
        assert!(inherited.historize());

        let overridden = parent
            .extend(EntityExtension::new("Lead").historize(false))
            .unwrap();
        assert!(!overridden.historize());
    }

    #[test]
    fn extend_leaves_parent_behavior_unchanged() {
        let base_schema = object()
            .field("id", string().non_empty().into_schema())
            .field("name", string().non_empty().into_schema())
            .field("credit", number().min(0.0).into_schema());
        let parent = EntityFactory::new(EntitySpec::new(
            "Customer",
            base_schema.clone().into_schema(),
            "id",
        ))
        .unwrap();

        let child = parent
            .extend(EntityExtension::new("Vip").schema(move |_| {
                base_schema
                    .clone()
                    .merge(&object().field("tier", string().into_schema()))
                    .into_schema()
            }))
            .unwrap();

        assert!(child
            .create(json!({"id": "c-1", "name": "Ada", "credit": 1, "tier": "gold"}))
            .is_ok());
        assert!(parent
            .create(json!({"id": "c-1", "name": "Ada", "credit": 1, "tier": "gold"}))
            .is_err());
        assert!(parent
            .create(json!({"id": "c-1", "name": "Ada", "credit": 1}))
            .is_ok());
    }

    proptest! {
        /// A rejected patch never changes entity state, regardless of what
        /// valid updates happened before it.
        #[test]
        fn update_is_all_or_nothing(
            credits in prop::collection::vec(0i64..1_000, 0..5),
            bad_credit in -1_000i64..-1,
        ) {
            let factory = historized_factory();
            let mut customer = factory
                .create(json!({"id": "c-1", "name": "Ada", "credit": 0}))
                .unwrap();

            for credit in &credits {
                factory.update(&mut customer, json!({"credit": credit})).unwrap();
            }
            let before = customer.fields().clone();
            let history_len = customer.history().len();

            let err = factory.update(&mut customer, json!({"credit": bad_credit})).unwrap_err();
            prop_assert!(err.is_validation());
            prop_assert_eq!(customer.fields(), &before);
            prop_assert_eq!(customer.history().len(), history_len);
        }
    }
}
