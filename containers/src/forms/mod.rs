//! Form validation.
//!
//! A form holds JSON values by field name, an optional rule per field, the
//! current error messages and which fields the user has touched. Every
//! value change re-validates the changed field and all touched fields.
//!
//! ```
//! use composable_state_containers::forms::{rules, FormAction, FormReducer, FormState};
//! use composable_state_core::reducer::Reducer;
//! use serde_json::json;
//!
//! let mut state = FormState::default();
//! let _ = FormReducer.reduce(
//!     &mut state,
//!     FormAction::SetRule { field: "name".into(), rule: rules::required() },
//!     &(),
//! );
//! let _ = FormReducer.reduce(&mut state, FormAction::ValidateAll, &());
//! assert_eq!(state.error("name"), Some("This field is required"));
//! ```

mod reducer;
pub mod rules;

pub use reducer::{FormAction, FormReducer, FormState};
pub use rules::ValidationRule;

use composable_state_runtime::{Store, StoreError};
use serde_json::Value;
use std::collections::BTreeMap;

/// Form container
#[derive(Clone)]
pub struct Form {
    store: Store<FormState, FormAction, (), FormReducer>,
}

impl Form {
    /// A form starting from, and resetting to, `initial`
    #[must_use]
    pub fn new<I, K>(initial: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let initial: BTreeMap<String, Value> = initial
            .into_iter()
            .map(|(field, value)| (field.into(), value))
            .collect();
        Self {
            store: Store::new(FormState::new(initial), FormReducer, ()),
        }
    }

    async fn dispatch(&self, action: FormAction) -> Result<(), StoreError> {
        self.store.send(action).await.map(drop)
    }

    /// Replace a field's value
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn set_value(&self, field: &str, value: Value) -> Result<(), StoreError> {
        self.dispatch(FormAction::SetValue {
            field: field.to_string(),
            value,
        })
        .await
    }

    /// Replace the value at `pointer` inside a field
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn set_value_at(
        &self,
        field: &str,
        pointer: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.dispatch(FormAction::SetValueAt {
            field: field.to_string(),
            pointer: pointer.to_string(),
            value,
        })
        .await
    }

    /// Mark a field touched
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn touch(&self, field: &str) -> Result<(), StoreError> {
        self.set_touched(field, true).await
    }

    /// Set a field's touched flag
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn set_touched(&self, field: &str, touched: bool) -> Result<(), StoreError> {
        self.dispatch(FormAction::SetTouched {
            field: field.to_string(),
            touched,
        })
        .await
    }

    /// Install a rule for a field
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn set_rule(&self, field: &str, rule: ValidationRule) -> Result<(), StoreError> {
        self.dispatch(FormAction::SetRule {
            field: field.to_string(),
            rule,
        })
        .await
    }

    /// Run a field's rule
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn validate_field(&self, field: &str) -> Result<(), StoreError> {
        self.dispatch(FormAction::ValidateField(field.to_string()))
            .await
    }

    /// Touch and validate every ruled field, returning whether the form is valid
    ///
    /// Validity is read under the same lock as the validation, so a
    /// concurrent `set_value` cannot change the answer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn validate_all(&self) -> Result<bool, StoreError> {
        self.store
            .send_and_read(FormAction::ValidateAll, FormState::is_valid)
            .await
            .map(|(_, valid)| valid)
    }

    /// Restore construction values and clear errors and touched flags
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.dispatch(FormAction::Reset).await
    }

    /// Whether no field has an error
    pub async fn is_valid(&self) -> bool {
        self.store.state(FormState::is_valid).await
    }

    /// Current value of a field
    pub async fn value(&self, field: &str) -> Option<Value> {
        self.store.state(|state| state.value(field).cloned()).await
    }

    /// Error message of a field
    pub async fn error(&self, field: &str) -> Option<String> {
        self.store
            .state(|state| state.error(field).map(str::to_string))
            .await
    }

    /// Error messages by field
    pub async fn errors(&self) -> BTreeMap<String, String> {
        self.store.state(|state| state.errors().clone()).await
    }

    /// Whether a field is touched
    pub async fn is_touched(&self, field: &str) -> bool {
        self.store.state(|state| state.is_touched(field)).await
    }

    /// Current state
    pub async fn snapshot(&self) -> FormState {
        self.store.state(FormState::clone).await
    }
}
