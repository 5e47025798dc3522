//! Domain error model.
//!
//! Exactly two error kinds cross the factory boundary: configuration
//! problems raised while building or extending a factory, and validation
//! failures raised while creating or updating instances. A third variant
//! carries domain-rule violations raised inside custom methods.

use serde_json::Value;
use thiserror::Error;

use domaincraft_schema::{SchemaError, SchemaIssue};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// A factory was constructed or extended with malformed arguments.
///
/// Always fatal to the call that raised it; never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid factory configuration: {message}")]
pub struct ConfigurationError {
    pub message: String,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Input data failed schema validation.
///
/// Carries the aggregated engine issues, the name of the type being built
/// and the offending input. The sole error kind raised for data-shape
/// problems; state is never partially applied when it occurs.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("validation of {object_type} failed: {source}")]
pub struct ValidationError {
    pub object_type: String,
    pub input: Value,
    #[source]
    pub source: SchemaError,
}

impl ValidationError {
    pub fn new(object_type: impl Into<String>, input: Value, source: SchemaError) -> Self {
        Self {
            object_type: object_type.into(),
            input,
            source,
        }
    }

    /// Ordered field-level issues from the underlying engine.
    pub fn issues(&self) -> &[SchemaIssue] {
        &self.source.issues
    }
}

/// Domain-level error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A domain rule enforced by a custom method was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(ConfigurationError::new(message))
    }

    pub fn validation(object_type: impl Into<String>, input: Value, source: SchemaError) -> Self {
        Self::Validation(ValidationError::new(object_type, input, source))
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
