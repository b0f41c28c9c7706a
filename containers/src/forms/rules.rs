//! Validation rules.
//!
//! A rule maps a field value to an error message, or `None` when the value
//! is acceptable. Rules must be pure: the form calls them again whenever a
//! value it depends on might have changed.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type RuleFn = dyn Fn(&Value) -> Option<String> + Send + Sync;

/// A shareable validation rule
#[derive(Clone)]
pub struct ValidationRule(Arc<RuleFn>);

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidationRule(<fn>)")
    }
}

impl ValidationRule {
    /// Wrap a closure
    pub fn new<F>(rule: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(rule))
    }

    /// Run the rule against `value`
    #[must_use]
    pub fn check(&self, value: &Value) -> Option<String> {
        (self.0)(value)
    }
}

/// Length of a string in characters or an array in elements
fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Fails on null, blank strings, and empty arrays or objects
#[must_use]
pub fn required() -> ValidationRule {
    ValidationRule::new(|value| {
        let missing = match value {
            Value::Null => true,
            Value::String(text) => text.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        };
        missing.then(|| "This field is required".to_string())
    })
}

/// Fails on strings or arrays shorter than `min`; other values pass
#[must_use]
pub fn min_length(min: usize) -> ValidationRule {
    ValidationRule::new(move |value| {
        length(value)
            .filter(|len| *len < min)
            .map(|_| format!("Must be at least {min} characters"))
    })
}

/// Fails on strings or arrays longer than `max`; other values pass
#[must_use]
pub fn max_length(max: usize) -> ValidationRule {
    ValidationRule::new(move |value| {
        length(value)
            .filter(|len| *len > max)
            .map(|_| format!("Must be at most {max} characters"))
    })
}
