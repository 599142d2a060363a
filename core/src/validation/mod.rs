use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A single broken rule, addressed by the field path it was found at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Output does not match the schema: {0}")]
    Malformed(String),
    #[error("Output breaks {} rule(s): {}", .0.len(), join(.0))]
    Violations(Vec<Violation>),
    #[error("Gave up after {attempts} attempt(s), last error: {last}")]
    RepairBudgetExhausted {
        attempts: usize,
        last: Box<ValidationError>,
    },
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects violations while a value is being checked.
#[derive(Debug, Default)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Records a violation when `value` is empty or only whitespace
    pub fn require_text(&mut self, path: impl Into<String>, value: &str) {
        if value.trim().is_empty() {
            self.push(path, "must not be blank");
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result<T>(self, value: T) -> Result<T, ValidationError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError::Violations(self.0))
        }
    }
}

/// Joins a parent path and a field name, `""` being the root
#[must_use]
pub fn child(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

/// Post-decode rules for a decoded value.
///
/// Implementations may normalise fields in place (e.g. sentinel substitution)
/// and record every broken rule instead of stopping at the first one.
pub trait Validate {
    fn validate(&mut self, path: &str, violations: &mut Violations);
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&mut self, path: &str, violations: &mut Violations) {
        for (i, item) in self.iter_mut().enumerate() {
            item.validate(&format!("{path}[{i}]"), violations);
        }
    }
}

/// Runs the rules of `value` from the root and hands it back if none broke.
pub fn check<T: Validate>(mut value: T) -> Result<T, ValidationError> {
    let mut violations = Violations::default();
    value.validate("", &mut violations);
    violations.into_result(value)
}
