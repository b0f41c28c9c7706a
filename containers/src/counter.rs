//! Bounded counter.
//!
//! An integer that moves by a fixed step inside optional `[min, max]`
//! bounds. Operations never fail: a step that would leave the bounds is
//! ignored, and `set` clamps its argument.
//!
//! ```
//! use composable_state_containers::counter::{CounterAction, CounterOptions, CounterReducer, CounterState};
//! use composable_state_containers::counter::CounterEnvironment;
//! use composable_state_core::reducer::Reducer;
//!
//! let options = CounterOptions::new().with_min(0).with_max(3).with_step(2);
//! let mut state = CounterState::new(&options);
//!
//! let _ = CounterReducer.reduce(&mut state, CounterAction::Increment, &CounterEnvironment);
//! assert_eq!(state.value(), 2);
//! assert!(!state.can_increment());
//! ```

use composable_state_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use composable_state_runtime::{Store, StoreError};
use serde::{Deserialize, Serialize};

/// Construction options for a [`CounterState`]
///
/// Missing bounds mean the counter is unbounded in that direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterOptions {
    /// Starting value, clamped into the bounds
    pub initial: i64,
    /// Lower bound
    pub min: Option<i64>,
    /// Upper bound
    pub max: Option<i64>,
    /// Amount moved by one increment or decrement
    pub step: i64,
}

impl Default for CounterOptions {
    fn default() -> Self {
        Self {
            initial: 0,
            min: None,
            max: None,
            step: 1,
        }
    }
}

impl CounterOptions {
    /// Unbounded counter starting at 0 with step 1
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the starting value
    #[must_use]
    pub const fn with_initial(mut self, initial: i64) -> Self {
        self.initial = initial;
        self
    }

    /// Set the lower bound
    #[must_use]
    pub const fn with_min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    /// Set the upper bound
    #[must_use]
    pub const fn with_max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    /// Set the step
    #[must_use]
    pub const fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }
}

/// Normalized bounds, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterBounds {
    min: i64,
    max: i64,
    step: i64,
    initial: i64,
}

impl CounterBounds {
    /// Normalize options: swap inverted bounds, force a positive step and
    /// clamp the initial value.
    #[must_use]
    pub fn from_options(options: &CounterOptions) -> Self {
        let mut min = options.min.unwrap_or(i64::MIN);
        let mut max = options.max.unwrap_or(i64::MAX);
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }
        let step = i64::try_from(options.step.unsigned_abs())
            .unwrap_or(i64::MAX)
            .max(1);
        let initial = options.initial.clamp(min, max);

        Self {
            min,
            max,
            step,
            initial,
        }
    }

    /// Lower bound (`i64::MIN` when unbounded)
    #[must_use]
    pub const fn min(&self) -> i64 {
        self.min
    }

    /// Upper bound (`i64::MAX` when unbounded)
    #[must_use]
    pub const fn max(&self) -> i64 {
        self.max
    }

    /// Step applied by increment and decrement
    #[must_use]
    pub const fn step(&self) -> i64 {
        self.step
    }

    /// Value restored by reset
    #[must_use]
    pub const fn initial(&self) -> i64 {
        self.initial
    }

    /// Clamp `value` into `[min, max]`
    #[must_use]
    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }
}

/// Counter state
///
/// `value` is private so it can only move through [`CounterReducer`],
/// which keeps it inside the bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterState {
    value: i64,
    bounds: CounterBounds,
}

impl CounterState {
    /// Create a counter at its clamped initial value
    #[must_use]
    pub fn new(options: &CounterOptions) -> Self {
        let bounds = CounterBounds::from_options(options);
        Self {
            value: bounds.initial,
            bounds,
        }
    }

    /// Current value
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }

    /// Bounds fixed at construction
    #[must_use]
    pub const fn bounds(&self) -> &CounterBounds {
        &self.bounds
    }

    /// Twice the current value (saturating)
    #[must_use]
    pub const fn doubled(&self) -> i64 {
        self.value.saturating_mul(2)
    }

    /// Whether the value sits on the lower bound
    #[must_use]
    pub const fn is_at_min(&self) -> bool {
        self.value <= self.bounds.min
    }

    /// Whether the value sits on the upper bound
    #[must_use]
    pub const fn is_at_max(&self) -> bool {
        self.value >= self.bounds.max
    }

    /// Whether one more step up stays within bounds
    #[must_use]
    pub fn can_increment(&self) -> bool {
        self.value
            .checked_add(self.bounds.step)
            .is_some_and(|next| next <= self.bounds.max)
    }

    /// Whether one more step down stays within bounds
    #[must_use]
    pub fn can_decrement(&self) -> bool {
        self.value
            .checked_sub(self.bounds.step)
            .is_some_and(|next| next >= self.bounds.min)
    }
}

impl Default for CounterState {
    fn default() -> Self {
        Self::new(&CounterOptions::default())
    }
}

/// Counter actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterAction {
    /// Move up one step, unless that would pass the upper bound
    Increment,
    /// Move down one step, unless that would pass the lower bound
    Decrement,
    /// Restore the clamped initial value
    Reset,
    /// Set the value, clamped into bounds
    Set(i64),
}

/// Counter environment (the counter has no dependencies)
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterEnvironment;

/// Counter reducer
///
/// A pure state machine: every action returns `Effect::None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;
    type Environment = CounterEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _environment: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CounterAction::Increment => {
                if state.can_increment() {
                    state.value = state.bounds.clamp(state.value + state.bounds.step);
                } else {
                    tracing::debug!(value = state.value, "Increment ignored at upper bound");
                }
            },
            CounterAction::Decrement => {
                if state.can_decrement() {
                    state.value = state.bounds.clamp(state.value - state.bounds.step);
                } else {
                    tracing::debug!(value = state.value, "Decrement ignored at lower bound");
                }
            },
            CounterAction::Reset => {
                state.value = state.bounds.initial;
            },
            CounterAction::Set(value) => {
                state.value = state.bounds.clamp(value);
            },
        }

        smallvec![Effect::None]
    }
}

/// A bounded counter running in its own [`Store`]
#[derive(Clone)]
pub struct Counter {
    store: Store<CounterState, CounterAction, CounterEnvironment, CounterReducer>,
}

impl Counter {
    /// Create a counter from options
    #[must_use]
    pub fn new(options: &CounterOptions) -> Self {
        Self {
            store: Store::new(CounterState::new(options), CounterReducer, CounterEnvironment),
        }
    }

    /// Step up
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn increment(&self) -> Result<(), StoreError> {
        self.store.send(CounterAction::Increment).await.map(drop)
    }

    /// Step down
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn decrement(&self) -> Result<(), StoreError> {
        self.store.send(CounterAction::Decrement).await.map(drop)
    }

    /// Restore the initial value
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.store.send(CounterAction::Reset).await.map(drop)
    }

    /// Set a clamped value
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn set(&self, value: i64) -> Result<(), StoreError> {
        self.store.send(CounterAction::Set(value)).await.map(drop)
    }

    /// Current value
    pub async fn value(&self) -> i64 {
        self.store.state(CounterState::value).await
    }

    /// Copy of the full state, for reading derived values
    pub async fn snapshot(&self) -> CounterState {
        self.store.state(Clone::clone).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composable_state_testing::{assertions, ReducerTest};
    use proptest::prelude::*;

    fn bounded() -> CounterOptions {
        CounterOptions::new().with_initial(5).with_min(0).with_max(10)
    }

    #[test]
    fn test_initial_value_is_clamped() {
        let state = CounterState::new(&CounterOptions::new().with_initial(50).with_max(10));
        assert_eq!(state.value(), 10);
        assert!(state.is_at_max());
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let state = CounterState::new(&CounterOptions::new().with_min(10).with_max(0));
        assert_eq!(state.bounds().min(), 0);
        assert_eq!(state.bounds().max(), 10);
        assert_eq!(state.value(), 0);
    }

    #[test]
    fn test_step_is_normalized() {
        assert_eq!(CounterBounds::from_options(&CounterOptions::new().with_step(0)).step(), 1);
        assert_eq!(CounterBounds::from_options(&CounterOptions::new().with_step(-3)).step(), 3);
        assert_eq!(
            CounterBounds::from_options(&CounterOptions::new().with_step(i64::MIN)).step(),
            i64::MAX
        );
    }

    #[test]
    fn test_increment() {
        ReducerTest::new(CounterReducer)
            .with_env(CounterEnvironment)
            .given_state(CounterState::new(&bounded()))
            .when_action(CounterAction::Increment)
            .then_state(|state| {
                assert_eq!(state.value(), 6);
                assert_eq!(state.doubled(), 12);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_increment_at_max_is_noop() {
        ReducerTest::new(CounterReducer)
            .with_env(CounterEnvironment)
            .given_state(CounterState::new(&bounded().with_initial(10)))
            .when_action(CounterAction::Increment)
            .then_state(|state| {
                assert_eq!(state.value(), 10);
                assert!(state.is_at_max());
                assert!(!state.can_increment());
                assert!(state.can_decrement());
            })
            .run();
    }

    #[test]
    fn test_step_that_would_overshoot_is_ignored() {
        // 9 + 3 > 10, so the increment does not happen at all
        ReducerTest::new(CounterReducer)
            .with_env(CounterEnvironment)
            .given_state(CounterState::new(&bounded().with_initial(9).with_step(3)))
            .when_action(CounterAction::Increment)
            .then_state(|state| {
                assert_eq!(state.value(), 9);
                assert!(!state.is_at_max());
            })
            .run();
    }

    #[test]
    fn test_decrement_at_min_is_noop() {
        ReducerTest::new(CounterReducer)
            .with_env(CounterEnvironment)
            .given_state(CounterState::new(&bounded().with_initial(0)))
            .when_action(CounterAction::Decrement)
            .then_state(|state| {
                assert_eq!(state.value(), 0);
                assert!(state.is_at_min());
                assert!(!state.can_decrement());
            })
            .run();
    }

    #[test]
    fn test_set_clamps() {
        ReducerTest::new(CounterReducer)
            .with_env(CounterEnvironment)
            .given_state(CounterState::new(&bounded()))
            .when_actions([CounterAction::Set(-4)])
            .then_state(|state| assert_eq!(state.value(), 0))
            .run();

        ReducerTest::new(CounterReducer)
            .with_env(CounterEnvironment)
            .given_state(CounterState::new(&bounded()))
            .when_action(CounterAction::Set(7))
            .then_state(|state| assert_eq!(state.value(), 7))
            .run();
    }

    #[test]
    fn test_unbounded_counter_does_not_overflow() {
        ReducerTest::new(CounterReducer)
            .with_env(CounterEnvironment)
            .given_state(CounterState::new(&CounterOptions::new().with_initial(i64::MAX)))
            .when_action(CounterAction::Increment)
            .then_state(|state| {
                assert_eq!(state.value(), i64::MAX);
                assert_eq!(state.doubled(), i64::MAX);
            })
            .run();
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let parsed = serde_json::from_str::<CounterOptions>(r#"{"max": 3}"#);
        assert!(matches!(parsed, Ok(options) if options == CounterOptions::new().with_max(3)));
    }

    #[tokio::test]
    async fn test_counter_facade() {
        let counter = Counter::new(&bounded());

        assert!(counter.increment().await.is_ok());
        assert!(counter.increment().await.is_ok());
        assert_eq!(counter.value().await, 7);

        assert!(counter.set(100).await.is_ok());
        assert!(counter.snapshot().await.is_at_max());

        assert!(counter.reset().await.is_ok());
        assert!(counter.decrement().await.is_ok());
        assert_eq!(counter.value().await, 4);
    }

    fn counter_action() -> impl Strategy<Value = CounterAction> {
        prop_oneof![
            Just(CounterAction::Increment),
            Just(CounterAction::Decrement),
            Just(CounterAction::Reset),
            any::<i64>().prop_map(CounterAction::Set),
        ]
    }

    proptest! {
        #[test]
        fn prop_value_stays_within_bounds(
            min in -1_000_i64..1_000,
            span in 0_i64..1_000,
            step in 1_i64..50,
            initial in -5_000_i64..5_000,
            actions in proptest::collection::vec(counter_action(), 0..100),
        ) {
            let options = CounterOptions::new()
                .with_initial(initial)
                .with_min(min)
                .with_max(min + span)
                .with_step(step);
            let mut state = CounterState::new(&options);

            for action in actions {
                let _ = CounterReducer.reduce(&mut state, action, &CounterEnvironment);
                prop_assert!(state.value() >= min && state.value() <= min + span);
            }
        }

        #[test]
        fn prop_reset_restores_clamped_initial(
            initial in any::<i64>(),
            actions in proptest::collection::vec(counter_action(), 0..50),
        ) {
            let options = bounded().with_initial(initial);
            let mut state = CounterState::new(&options);

            for action in actions {
                let _ = CounterReducer.reduce(&mut state, action, &CounterEnvironment);
            }
            let _ = CounterReducer.reduce(&mut state, CounterAction::Reset, &CounterEnvironment);

            prop_assert_eq!(state.value(), initial.clamp(0, 10));
        }
    }
}
