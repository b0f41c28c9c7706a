//! Application counter store.
//!
//! An unbounded count paired with a multiplier, shared by whichever parts
//! of an application hold a clone of the [`CounterStore`]. There is no
//! global instance; callers construct one and pass it around.

use composable_state_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use composable_state_runtime::{Store, StoreError};

/// Multiplier a fresh store starts with
pub const DEFAULT_MULTIPLIER: i64 = 2;

/// Counter store state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterStoreState {
    /// Current count
    pub count: i64,
    /// Factor used by [`CounterStoreState::multiplied_count`]
    pub multiplier: i64,
}

impl Default for CounterStoreState {
    fn default() -> Self {
        Self {
            count: 0,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl CounterStoreState {
    /// `count * 2`
    #[must_use]
    pub const fn double_count(&self) -> i64 {
        self.count.saturating_mul(2)
    }

    /// `count * multiplier`
    #[must_use]
    pub const fn multiplied_count(&self) -> i64 {
        self.count.saturating_mul(self.multiplier)
    }
}

/// Counter store actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStoreAction {
    /// Add one
    Increment,
    /// Subtract one
    Decrement,
    /// Back to zero (the multiplier is kept)
    Reset,
    /// Replace the multiplier
    SetMultiplier(i64),
}

/// Counter store reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterStoreReducer;

impl Reducer for CounterStoreReducer {
    type State = CounterStoreState;
    type Action = CounterStoreAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _environment: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CounterStoreAction::Increment => state.count = state.count.saturating_add(1),
            CounterStoreAction::Decrement => state.count = state.count.saturating_sub(1),
            CounterStoreAction::Reset => state.count = 0,
            CounterStoreAction::SetMultiplier(multiplier) => state.multiplier = multiplier,
        }

        smallvec![Effect::None]
    }
}

/// Shared handle to an application counter
#[derive(Clone)]
pub struct CounterStore {
    store: Store<CounterStoreState, CounterStoreAction, (), CounterStoreReducer>,
}

impl Default for CounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore {
    /// A store at count 0 with multiplier 2
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Store::new(CounterStoreState::default(), CounterStoreReducer, ()),
        }
    }

    /// Dispatch an action
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn dispatch(&self, action: CounterStoreAction) -> Result<(), StoreError> {
        self.store.send(action).await.map(drop)
    }

    /// Add one
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn increment(&self) -> Result<(), StoreError> {
        self.dispatch(CounterStoreAction::Increment).await
    }

    /// Subtract one
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn decrement(&self) -> Result<(), StoreError> {
        self.dispatch(CounterStoreAction::Decrement).await
    }

    /// Back to zero
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.dispatch(CounterStoreAction::Reset).await
    }

    /// Replace the multiplier
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is shut down.
    pub async fn set_multiplier(&self, multiplier: i64) -> Result<(), StoreError> {
        self.dispatch(CounterStoreAction::SetMultiplier(multiplier)).await
    }

    /// Current state
    pub async fn snapshot(&self) -> CounterStoreState {
        self.store.state(|state| *state).await
    }
}
