//! Built-in combinator engine.
//!
//! Intentionally small: string/number/boolean primitives with the usual
//! constraints, and an object combinator that aggregates issues across
//! fields. Each combinator is a plain value; finish with `.into_schema()`
//! (or `Arc::new`) to obtain a [`SchemaRef`].

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::contract::{BaseKind, Schema, SchemaRef};
use crate::error::{SchemaError, SchemaIssue};

/// String schema with optional length constraints.
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    min_len: Option<usize>,
    max_len: Option<usize>,
    exact_len: Option<usize>,
}

/// Start building a string schema.
pub fn string() -> StringSchema {
    StringSchema::default()
}

impl StringSchema {
    pub fn min_len(mut self, len: usize) -> Self {
        self.min_len = Some(len);
        self
    }

    pub fn max_len(mut self, len: usize) -> Self {
        self.max_len = Some(len);
        self
    }

    pub fn exact_len(mut self, len: usize) -> Self {
        self.exact_len = Some(len);
        self
    }

    pub fn non_empty(self) -> Self {
        self.min_len(1)
    }

    pub fn into_schema(self) -> SchemaRef {
        Arc::new(self)
    }
}

impl Schema for StringSchema {
    fn parse(&self, input: &Value) -> Result<Value, SchemaError> {
        let Value::String(s) = input else {
            return Err(SchemaError::root("expected a string"));
        };
        let len = s.chars().count();
        let mut issues = Vec::new();
        if let Some(exact) = self.exact_len {
            if len != exact {
                issues.push(SchemaIssue::root(format!("length must be exactly {exact}")));
            }
        }
        if let Some(min) = self.min_len {
            if len < min {
                issues.push(SchemaIssue::root(format!("length must be at least {min}")));
            }
        }
        if let Some(max) = self.max_len {
            if len > max {
                issues.push(SchemaIssue::root(format!("length must be at most {max}")));
            }
        }
        if issues.is_empty() {
            Ok(input.clone())
        } else {
            Err(SchemaError::new(issues))
        }
    }

    fn base_kind(&self) -> BaseKind {
        BaseKind::String
    }
}

/// Number schema with optional range/integrality constraints.
#[derive(Debug, Clone, Default)]
pub struct NumberSchema {
    min: Option<f64>,
    max: Option<f64>,
    positive: bool,
    integer: bool,
}

/// Start building a number schema.
pub fn number() -> NumberSchema {
    NumberSchema::default()
}

impl NumberSchema {
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Strictly greater than zero.
    pub fn positive(mut self) -> Self {
        self.positive = true;
        self
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn into_schema(self) -> SchemaRef {
        Arc::new(self)
    }
}

impl Schema for NumberSchema {
    fn parse(&self, input: &Value) -> Result<Value, SchemaError> {
        let Value::Number(n) = input else {
            return Err(SchemaError::root("expected a number"));
        };
        let Some(v) = n.as_f64() else {
            return Err(SchemaError::root("number out of representable range"));
        };
        let mut issues = Vec::new();
        if self.positive && v <= 0.0 {
            issues.push(SchemaIssue::root("must be positive"));
        }
        if self.integer && v.fract() != 0.0 {
            issues.push(SchemaIssue::root("must be an integer"));
        }
        if let Some(min) = self.min {
            if v < min {
                issues.push(SchemaIssue::root(format!("must be at least {min}")));
            }
        }
        if let Some(max) = self.max {
            if v > max {
                issues.push(SchemaIssue::root(format!("must be at most {max}")));
            }
        }
        if issues.is_empty() {
            Ok(input.clone())
        } else {
            Err(SchemaError::new(issues))
        }
    }

    fn base_kind(&self) -> BaseKind {
        BaseKind::Number
    }
}

/// Boolean schema.
#[derive(Debug, Clone, Default)]
pub struct BooleanSchema;

pub fn boolean() -> BooleanSchema {
    BooleanSchema
}

impl BooleanSchema {
    pub fn into_schema(self) -> SchemaRef {
        Arc::new(self)
    }
}

impl Schema for BooleanSchema {
    fn parse(&self, input: &Value) -> Result<Value, SchemaError> {
        match input {
            Value::Bool(_) => Ok(input.clone()),
            _ => Err(SchemaError::root("expected a boolean")),
        }
    }

    fn base_kind(&self) -> BaseKind {
        BaseKind::Boolean
    }
}

#[derive(Clone)]
struct FieldSpec {
    name: String,
    schema: SchemaRef,
    required: bool,
}

/// Object schema: named fields, each validated by its own schema.
///
/// Unknown keys are rejected; missing required fields and per-field failures
/// are aggregated into one [`SchemaError`], issues in declaration order.
#[derive(Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<FieldSpec>,
}

/// Start building an object schema.
pub fn object() -> ObjectSchema {
    ObjectSchema::default()
}

impl ObjectSchema {
    pub fn field(mut self, name: impl Into<String>, schema: SchemaRef) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            schema,
            required: true,
        });
        self
    }

    pub fn optional_field(mut self, name: impl Into<String>, schema: SchemaRef) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            schema,
            required: false,
        });
        self
    }

    /// Fold another object schema's fields into this one. A field declared
    /// on both sides takes `other`'s definition.
    pub fn merge(mut self, other: &ObjectSchema) -> Self {
        for spec in &other.fields {
            self.fields.retain(|f| f.name != spec.name);
            self.fields.push(spec.clone());
        }
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn into_schema(self) -> SchemaRef {
        Arc::new(self)
    }
}

impl Schema for ObjectSchema {
    fn parse(&self, input: &Value) -> Result<Value, SchemaError> {
        let Value::Object(map) = input else {
            return Err(SchemaError::root("expected an object"));
        };

        let mut issues = Vec::new();
        let mut out = Map::with_capacity(self.fields.len());

        for spec in &self.fields {
            match map.get(&spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        issues.push(SchemaIssue::new(&spec.name, "required field is missing"));
                    }
                }
                Some(value) => match spec.schema.parse(value) {
                    Ok(validated) => {
                        out.insert(spec.name.clone(), validated);
                    }
                    Err(err) => {
                        issues.extend(err.issues.into_iter().map(|i| i.nested_under(&spec.name)));
                    }
                },
            }
        }

        for key in map.keys() {
            if !self.fields.iter().any(|f| f.name == *key) {
                issues.push(SchemaIssue::new(key, "unknown field"));
            }
        }

        if issues.is_empty() {
            Ok(Value::Object(out))
        } else {
            Err(SchemaError::new(issues))
        }
    }
}

impl core::fmt::Debug for ObjectSchema {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObjectSchema")
            .field("fields", &self.fields.iter().map(|s| s.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn string_length_constraints() {
        let schema = string().exact_len(3);
        assert_eq!(schema.parse(&json!("USD")).unwrap(), json!("USD"));

        let err = schema.parse(&json!("US")).unwrap_err();
        assert!(err.to_string().contains("exactly 3"));

        assert!(string().non_empty().parse(&json!("")).is_err());
        assert!(string().parse(&json!(42)).is_err());
    }

    #[test]
    fn number_constraints() {
        let schema = number().positive();
        assert!(schema.parse(&json!(0.01)).is_ok());
        assert!(schema.parse(&json!(0)).is_err());
        assert!(schema.parse(&json!(-3)).is_err());
        assert!(schema.parse(&json!("3")).is_err());

        assert!(number().integer().parse(&json!(2.5)).is_err());
        assert!(number().min(10.0).max(20.0).parse(&json!(15)).is_ok());
        assert!(number().min(10.0).parse(&json!(5)).is_err());
    }

    #[test]
    fn boolean_accepts_only_bools() {
        assert!(boolean().parse(&json!(true)).is_ok());
        assert!(boolean().parse(&json!("true")).is_err());
    }

    #[test]
    fn object_aggregates_issues_in_declaration_order() {
        let schema = object()
            .field("amount", number().positive().into_schema())
            .field("currency", string().exact_len(3).into_schema());

        let err = schema
            .parse(&json!({"amount": -1, "currency": "ZZZZ"}))
            .unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert_eq!(err.issues[0].path, "amount");
        assert_eq!(err.issues[1].path, "currency");
    }

    #[test]
    fn object_rejects_unknown_and_missing_fields() {
        let schema = object().field("name", string().non_empty().into_schema());

        let err = schema.parse(&json!({})).unwrap_err();
        assert!(err.mentions("name"));

        let err = schema
            .parse(&json!({"name": "x", "extra": 1}))
            .unwrap_err();
        assert!(err.mentions("extra"));
    }

    #[test]
    fn optional_fields_may_be_absent_or_null() {
        let schema = object()
            .field("name", string().non_empty().into_schema())
            .optional_field("nickname", string().into_schema());

        let parsed = schema.parse(&json!({"name": "Ada"})).unwrap();
        assert_eq!(parsed, json!({"name": "Ada"}));

        let parsed = schema
            .parse(&json!({"name": "Ada", "nickname": null}))
            .unwrap();
        assert_eq!(parsed, json!({"name": "Ada"}));
    }

    #[test]
    fn nested_object_issues_carry_dotted_paths() {
        let schema = object().field(
            "price",
            object()
                .field("amount", number().positive().into_schema())
                .field("currency", string().exact_len(3).into_schema())
                .into_schema(),
        );

        let err = schema
            .parse(&json!({"price": {"amount": -1, "currency": "USD"}}))
            .unwrap_err();
        assert!(err.mentions("price.amount"));
        assert!(!err.mentions("price.currency"));
    }

    #[test]
    fn merge_overrides_colliding_fields() {
        let base = object()
            .field("name", string().non_empty().into_schema())
            .field("age", number().min(0.0).into_schema());
        let extended = base
            .clone()
            .merge(&object().field("age", number().min(18.0).into_schema()));

        assert!(extended.parse(&json!({"name": "Ada", "age": 30})).is_ok());
        assert!(extended.parse(&json!({"name": "Ada", "age": 16})).is_err());
    }

    #[test]
    fn base_kinds_are_reported() {
        assert_eq!(string().base_kind(), BaseKind::String);
        assert_eq!(number().base_kind(), BaseKind::Number);
        assert_eq!(boolean().base_kind(), BaseKind::Boolean);
        assert_eq!(object().base_kind(), BaseKind::Object);
        assert!(BaseKind::String.is_primitive());
        assert!(!BaseKind::Object.is_primitive());
    }

    proptest! {
        #[test]
        fn strings_within_bounds_always_parse(s in "[a-z]{1,8}") {
            let schema = string().min_len(1).max_len(8);
            prop_assert!(schema.parse(&json!(s)).is_ok());
        }

        #[test]
        fn positive_numbers_parse_and_their_negation_does_not(n in 1i64..1_000_000) {
            prop_assert!(number().positive().parse(&json!(n)).is_ok());
            prop_assert!(number().positive().parse(&json!(-n)).is_err());
        }
    }
}
