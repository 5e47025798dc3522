//! Schema error model: ordered, field-addressed issues.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level problem found while parsing input.
///
/// `path` is a dotted path into the input (`"address.city"`); the empty
/// string addresses the input value itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// An issue addressing the input value as a whole.
    pub fn root(message: impl Into<String>) -> Self {
        Self::new("", message)
    }

    /// Re-address this issue one object level deeper.
    pub fn nested_under(mut self, field: &str) -> Self {
        self.path = if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{field}.{}", self.path)
        };
        self
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Aggregate parse failure: the ordered list of everything wrong with the
/// input, in schema declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub struct SchemaError {
    pub issues: Vec<SchemaIssue>,
}

impl SchemaError {
    pub fn new(issues: Vec<SchemaIssue>) -> Self {
        Self { issues }
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![SchemaIssue::new(path, message)])
    }

    pub fn root(message: impl Into<String>) -> Self {
        Self::new(vec![SchemaIssue::root(message)])
    }

    /// True if any issue addresses `path` (exactly, or as a prefix segment).
    pub fn mentions(&self, path: &str) -> bool {
        self.issues
            .iter()
            .any(|i| i.path == path || i.path.starts_with(&format!("{path}.")))
    }

    pub fn merge(&mut self, other: SchemaError) {
        self.issues.extend(other.issues);
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "schema parse failed");
        }
        write!(f, "schema parse failed with {} issue(s):", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  {issue}")?;
        }
        Ok(())
    }
}

impl From<SchemaIssue> for SchemaError {
    fn from(issue: SchemaIssue) -> Self {
        Self::new(vec![issue])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_under_builds_dotted_paths() {
        let issue = SchemaIssue::root("must be positive").nested_under("amount");
        assert_eq!(issue.path, "amount");

        let deeper = issue.nested_under("price");
        assert_eq!(deeper.path, "price.amount");
    }

    #[test]
    fn mentions_matches_exact_and_nested_paths() {
        let err = SchemaError::single("amount", "must be positive");
        assert!(err.mentions("amount"));
        assert!(!err.mentions("currency"));

        let nested = SchemaError::single("price.amount", "must be positive");
        assert!(nested.mentions("price"));
    }

    #[test]
    fn display_lists_every_issue() {
        let mut err = SchemaError::single("amount", "must be positive");
        err.merge(SchemaError::single("currency", "length must be 3"));

        let rendered = err.to_string();
        assert!(rendered.contains("2 issue(s)"));
        assert!(rendered.contains("amount: must be positive"));
        assert!(rendered.contains("currency: length must be 3"));
    }
}
