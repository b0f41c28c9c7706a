//! # Composable State Testing
//!
//! Testing utilities and helpers for composable state containers.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (clocks, key-value stores)
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use composable_state_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(TodoReducer::new())
//!     .with_env(TodoEnvironment::new(Arc::new(test_clock())))
//!     .given_state(TodoState::default())
//!     .when_action(TodoAction::add("Buy milk"))
//!     .then_state(|state| assert_eq!(state.total(), 1))
//!     .run();
//! ```

use chrono::{DateTime, Duration, Utc};
use composable_state_core::environment::Clock;
use std::sync::{Mutex, PoisonError};


/// Key-value store mocks
pub mod storage_mocks;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Duration, Mutex, PoisonError, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use composable_state_testing::mocks::FixedClock;
    /// use composable_state_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that moves forward by a fixed step on every reading
    ///
    /// Useful when a test needs successive timestamps to differ, e.g. to
    /// observe that an update stamped a later time than the creation.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: Duration,
    }

    impl SteppingClock {
        /// Start at `start`, advancing by `step` after each reading
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
            let now = *next;
            *next = now + self.step;
            now
        }
    }

    /// The fixed instant used by [`test_clock`] (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_instant() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_instant())
    }

    /// Create a clock starting at [`test_instant`] that advances one second per reading
    #[must_use]
    pub fn stepping_clock() -> SteppingClock {
        SteppingClock::new(test_instant(), Duration::seconds(1))
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SteppingClock, stepping_clock, test_clock, test_instant};
pub use reducer_test::{assertions, ReducerTest};
pub use storage_mocks::{FailingStore, RecordingStore};
