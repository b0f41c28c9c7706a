//! # Composable State Core
//!
//! Core traits and types for composable state containers.
//!
//! A state container is a small piece of mutable state guarded by a reducer.
//! Callers never mutate the state directly: they send actions, the reducer
//! applies them while upholding the container's invariants, and any side
//! effect (a periodic tick, a write to a key-value store) is returned as an
//! [`Effect`](effect::Effect) description for the runtime to execute.
//!
//! ## Core Concepts
//!
//! - **State**: The container's data plus derived accessors
//! - **Action**: All possible inputs to a reducer
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```
//! use composable_state_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct ClicksState {
//!     clicks: u32,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum ClicksAction {
//!     Click,
//! }
//!
//! #[derive(Clone)]
//! struct ClicksReducer;
//!
//! impl Reducer for ClicksReducer {
//!     type State = ClicksState;
//!     type Action = ClicksAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ClicksState,
//!         action: ClicksAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<ClicksAction>; 4]> {
//!         match action {
//!             ClicksAction::Click => state.clicks = state.clicks.saturating_add(1),
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = ClicksState::default();
//! let _ = ClicksReducer.reduce(&mut state, ClicksAction::Click, &());
//! assert_eq!(state.clicks, 1);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Key-value storage abstraction used for optional persistence
pub mod storage;

/// Reducer module - The core trait for container logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all mutation logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for container logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Checks the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most reducers return zero or one effect, hence the inline
        /// capacity of four.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable and cancellable.
pub mod effect {
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Identifier of a scheduled (cancellable) effect
    ///
    /// Scheduling a periodic effect under an id that is already active
    /// replaces the previous schedule.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct EffectId(String);

    impl EffectId {
        /// Create an effect id from a name
        #[must_use]
        pub fn new(name: impl Into<String>) -> Self {
            Self(name.into())
        }

        /// The id as a string slice
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for EffectId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Dispatch `action` every `period` until cancelled
        ///
        /// The first dispatch happens one full period after scheduling.
        Interval {
            /// Identifier used to cancel the schedule
            id: EffectId,
            /// Time between dispatches
            period: Duration,
            /// Action dispatched on every tick
            action: Box<Action>,
        },

        /// Cancel a scheduled effect
        ///
        /// Cancelling an id that is not scheduled is a no-op.
        Cancel(EffectId),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> fmt::Debug for Effect<Action>
    where
        Action: fmt::Debug,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Interval { id, period, action } => f
                    .debug_struct("Effect::Interval")
                    .field("id", id)
                    .field("period", period)
                    .field("action", action)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Schedule `action` every `period` under `id`
        #[must_use]
        pub fn interval(id: EffectId, period: Duration, action: Action) -> Effect<Action> {
            Effect::Interval {
                id,
                period,
                action: Box::new(action),
            }
        }

        /// Whether this effect does nothing
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use composable_state_core::environment::{Clock, SystemClock};
    ///
    /// let before = chrono::Utc::now();
    /// assert!(SystemClock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
