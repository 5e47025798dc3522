//! `domaincraft-schema` — validation contract and a compact combinator engine.
//!
//! The factories in `domaincraft-core` only depend on the [`Schema`] trait;
//! any engine that can parse a `serde_json::Value` and report field-level
//! issues can stand behind it. The combinators in [`engine`] are the built-in
//! implementation used across the workspace and its tests.

pub mod contract;
pub mod engine;
pub mod error;

pub use contract::{BaseKind, Schema, SchemaRef};
pub use engine::{BooleanSchema, NumberSchema, ObjectSchema, StringSchema, boolean, number, object, string};
pub use error::{SchemaError, SchemaIssue};
