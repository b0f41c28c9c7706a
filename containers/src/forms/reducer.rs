//! Form state and reducer.

use super::rules::ValidationRule;
use composable_state_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use serde_json::Value;
use std::collections::BTreeMap;

/// State of a form
///
/// Invariant: `errors` holds an entry for a field exactly when that field's
/// rule rejected its value at the last validation.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    initial: BTreeMap<String, Value>,
    values: BTreeMap<String, Value>,
    rules: BTreeMap<String, ValidationRule>,
    errors: BTreeMap<String, String>,
    touched: BTreeMap<String, bool>,
}

impl FormState {
    /// A form whose reset target is `initial`
    #[must_use]
    pub fn new(initial: BTreeMap<String, Value>) -> Self {
        Self {
            values: initial.clone(),
            initial,
            ..Self::default()
        }
    }

    /// Current values
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Current value of `field`
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Error messages by field
    #[must_use]
    pub const fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Error message of `field`
    #[must_use]
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    /// Whether `field` has been touched
    #[must_use]
    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.get(field).copied().unwrap_or(false)
    }

    /// Whether `field` has a rule
    #[must_use]
    pub fn has_rule(&self, field: &str) -> bool {
        self.rules.contains_key(field)
    }

    /// No field has an error
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn validate_field(&mut self, field: &str) {
        let Some(rule) = self.rules.get(field) else {
            return;
        };

        let value = self.values.get(field).unwrap_or(&Value::Null);
        match rule.check(value) {
            Some(message) => {
                tracing::trace!(field, %message, "Field invalid");
                self.errors.insert(field.to_string(), message);
            },
            None => {
                self.errors.remove(field);
            },
        }
    }

    /// Validate `changed` and every touched field
    fn revalidate_after_change(&mut self, changed: &str) {
        self.validate_field(changed);

        let touched: Vec<String> = self
            .touched
            .iter()
            .filter(|(field, touched)| **touched && field.as_str() != changed)
            .map(|(field, _)| field.clone())
            .collect();
        for field in touched {
            self.validate_field(&field);
        }
    }
}

/// Form actions
#[derive(Debug, Clone)]
pub enum FormAction {
    /// Replace a field's value
    SetValue {
        /// Field name
        field: String,
        /// New value
        value: Value,
    },
    /// Replace a value nested inside a field, addressed by a JSON pointer
    SetValueAt {
        /// Field name
        field: String,
        /// RFC 6901 pointer relative to the field's value
        pointer: String,
        /// New value
        value: Value,
    },
    /// Set or clear a field's touched flag
    SetTouched {
        /// Field name
        field: String,
        /// New flag
        touched: bool,
    },
    /// Install or replace a field's rule
    SetRule {
        /// Field name
        field: String,
        /// Rule to install
        rule: ValidationRule,
    },
    /// Run a field's rule
    ValidateField(String),
    /// Touch and validate every field that has a rule
    ValidateAll,
    /// Restore construction values and clear errors and touched flags
    Reset,
}

/// Form reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct FormReducer;

impl Reducer for FormReducer {
    type State = FormState;
    type Action = FormAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            FormAction::SetValue { field, value } => {
                state.values.insert(field.clone(), value);
                state.revalidate_after_change(&field);
            },
            FormAction::SetValueAt {
                field,
                pointer,
                value,
            } => {
                let target = state
                    .values
                    .get_mut(&field)
                    .and_then(|root| root.pointer_mut(&pointer));
                match target {
                    Some(slot) => {
                        *slot = value;
                        state.revalidate_after_change(&field);
                    },
                    None => {
                        tracing::debug!(%field, %pointer, "Pointer does not resolve, ignoring");
                    },
                }
            },
            FormAction::SetTouched { field, touched } => {
                state.touched.insert(field, touched);
            },
            FormAction::SetRule { field, rule } => {
                state.rules.insert(field.clone(), rule);
                if state.is_touched(&field) || state.errors.contains_key(&field) {
                    state.validate_field(&field);
                }
            },
            FormAction::ValidateField(field) => state.validate_field(&field),
            FormAction::ValidateAll => {
                let fields: Vec<String> = state.rules.keys().cloned().collect();
                for field in fields {
                    state.touched.insert(field.clone(), true);
                    state.validate_field(&field);
                }
            },
            FormAction::Reset => {
                state.values = state.initial.clone();
                state.errors.clear();
                state.touched.clear();
            },
        }

        smallvec![Effect::None]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::rules::{min_length, required};
    use composable_state_testing::{assertions, ReducerTest};
    use serde_json::json;

    fn form() -> FormState {
        FormState::new(BTreeMap::from([
            ("name".to_string(), json!("")),
            ("email".to_string(), json!("")),
            ("address".to_string(), json!({ "city": "Berlin", "zip": "10115" })),
        ]))
    }

    fn set(field: &str, value: Value) -> FormAction {
        FormAction::SetValue {
            field: field.to_string(),
            value,
        }
    }

    fn rule(field: &str, rule: ValidationRule) -> FormAction {
        FormAction::SetRule {
            field: field.to_string(),
            rule,
        }
    }

    #[test]
    fn test_set_value_validates_field() {
        ReducerTest::new(FormReducer)
            .with_env(())
            .given_state(form())
            .when_actions([rule("name", min_length(3)), set("name", json!("Al"))])
            .then_state(|state| {
                assert_eq!(state.error("name"), Some("Must be at least 3 characters"));
                assert!(!state.is_valid());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_valid_value_clears_error() {
        ReducerTest::new(FormReducer)
            .with_env(())
            .given_state(form())
            .when_actions([
                rule("name", min_length(3)),
                set("name", json!("Al")),
                set("name", json!("Alice")),
            ])
            .then_state(|state| {
                assert_eq!(state.error("name"), None);
                assert!(state.is_valid());
            })
            .run();
    }

    #[test]
    fn test_change_revalidates_touched_fields() {
        let mut state = form();
        let _ = FormReducer.reduce(&mut state, rule("email", required()), &());
        let _ = FormReducer.reduce(
            &mut state,
            FormAction::SetTouched {
                field: "email".to_string(),
                touched: true,
            },
            &(),
        );
        assert!(state.error("email").is_none());

        let _ = FormReducer.reduce(&mut state, set("name", json!("Bob")), &());
        assert_eq!(state.error("email"), Some("This field is required"));
    }

    #[test]
    fn test_untouched_fields_are_not_revalidated() {
        let mut state = form();
        let _ = FormReducer.reduce(&mut state, rule("email", required()), &());
        let _ = FormReducer.reduce(&mut state, set("name", json!("Bob")), &());
        assert!(state.is_valid());
    }

    #[test]
    fn test_validate_all_touches_ruled_fields() {
        ReducerTest::new(FormReducer)
            .with_env(())
            .given_state(form())
            .when_actions([
                rule("name", required()),
                rule("email", required()),
                set("name", json!("Bob")),
                FormAction::ValidateAll,
            ])
            .then_state(|state| {
                assert!(state.is_touched("name"));
                assert!(state.is_touched("email"));
                assert!(!state.is_touched("address"));
                assert_eq!(state.errors().len(), 1);
                assert!(!state.is_valid());
            })
            .run();
    }

    #[test]
    fn test_validate_field_without_rule_is_noop() {
        let mut state = form();
        let _ = FormReducer.reduce(&mut state, FormAction::ValidateField("name".to_string()), &());
        assert!(state.is_valid());
        assert!(!state.has_rule("name"));
    }

    #[test]
    fn test_nested_mutation() {
        let city_rule = ValidationRule::new(|value| {
            value
                .pointer("/city")
                .and_then(Value::as_str)
                .filter(|city| city.is_empty())
                .map(|_| "City is required".to_string())
        });

        let mut state = form();
        let _ = FormReducer.reduce(&mut state, rule("address", city_rule), &());
        let _ = FormReducer.reduce(
            &mut state,
            FormAction::SetValueAt {
                field: "address".to_string(),
                pointer: "/city".to_string(),
                value: json!(""),
            },
            &(),
        );

        assert_eq!(state.value("address"), Some(&json!({ "city": "", "zip": "10115" })));
        assert_eq!(state.error("address"), Some("City is required"));
    }

    #[test]
    fn test_unresolvable_pointer_is_noop() {
        let mut state = form();
        let _ = FormReducer.reduce(
            &mut state,
            FormAction::SetValueAt {
                field: "address".to_string(),
                pointer: "/country/code".to_string(),
                value: json!("DE"),
            },
            &(),
        );
        assert_eq!(state.values(), form().values());
    }

    #[test]
    fn test_replacing_rule_updates_stale_error() {
        let mut state = form();
        let _ = FormReducer.reduce(&mut state, rule("name", required()), &());
        let _ = FormReducer.reduce(&mut state, FormAction::ValidateField("name".to_string()), &());
        assert!(state.error("name").is_some());

        let _ = FormReducer.reduce(&mut state, rule("name", ValidationRule::new(|_| None)), &());
        assert!(state.is_valid());
    }

    #[test]
    fn test_reset_restores_initial_values() {
        let mut state = form();
        let _ = FormReducer.reduce(&mut state, rule("name", min_length(10)), &());
        let _ = FormReducer.reduce(&mut state, set("name", json!("short")), &());
        let _ = FormReducer.reduce(&mut state, FormAction::Reset, &());

        assert_eq!(state.value("name"), Some(&json!("")));
        assert!(state.is_valid());
        assert!(!state.is_touched("name"));
        assert!(state.has_rule("name"));
    }
}
