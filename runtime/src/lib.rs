//! # Composable State Runtime
//!
//! Runtime implementation for composable state containers.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling, including the periodic scheduler behind
//! [`Effect::Interval`] and [`Effect::Cancel`].
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Scheduler**: Cancellable periodic tasks keyed by [`EffectId`]
//! - **Storage**: [`InMemoryStore`] and [`FileStore`] key-value backends
//!
//! ## Example
//!
//! ```ignore
//! use composable_state_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use composable_state_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::AbortHandle;

/// Key-value store implementations
pub mod storage;

pub use storage::{FileStore, InMemoryStore};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use composable_state_runtime::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default().with_shutdown_timeout(Duration::from_secs(1));
/// assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Timeout used by [`Store::close`]
    pub shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the shutdown timeout used by [`Store::close`]
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects started
/// by that action to complete. Periodic effects are not tracked: they run
/// until cancelled.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(TodoAction::ClearCompleted).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // The snapshot write triggered by ClearCompleted has finished
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of tracked effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all tracked effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Ensures the effect counter is always decremented, even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Internal: registry of running periodic effects
type Schedule = Arc<Mutex<HashMap<EffectId, AbortHandle>>>;

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectId, EffectTracking, HashMap, Mutex, MutexGuard, Ordering,
        PoisonError, Reducer, RwLock, Schedule, StoreConfig, StoreError,
    };
    use tokio::time::{Instant, MissedTickBehavior};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`, reducers run one at a time)
    /// 2. Reducer (container logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    /// 5. Scheduled periodic effects, cancellable by id
    ///
    /// Cloning a Store yields another handle to the same state and schedule.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        schedule: Schedule,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                config,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                schedule: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        /// The environment this store was built with
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Applies returned effects before releasing the lock
        /// 4. Effects may produce more actions (feedback loop)
        ///
        /// Schedules and cancellations take effect under the write lock, so
        /// the next action always sees the schedule its predecessor left.
        /// `Future` effects run in spawned tasks tracked by the returned handle.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.send_and_read(action, |_| ()).await.map(|(handle, ())| handle)
        }

        /// Send an action and read the resulting state under the same lock
        ///
        /// `read` sees the state exactly as the reducer left it, before any
        /// other action can run.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action, read), name = "store_send")]
        pub async fn send_and_read<F, T>(
            &self,
            action: A,
            read: F,
        ) -> Result<(EffectHandle, T), StoreError>
        where
            F: FnOnce(&S) -> T,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let mut state = self.state.write().await;
            tracing::trace!("Acquired write lock on state");

            let effects = {
                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();
                self.reducer.reduce(&mut *state, action, &self.environment)
            };
            tracing::trace!("Reducer completed, returned {} effects", effects.len());

            for effect in effects {
                self.execute_effect(effect, &tracking);
            }

            let value = read(&*state);
            drop(state);

            Ok((handle, value))
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.count()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Whether a periodic effect is scheduled under `id`
        #[must_use]
        pub fn is_scheduled(&self, id: &EffectId) -> bool {
            self.lock_schedule().contains_key(id)
        }

        /// Number of periodic effects currently scheduled
        #[must_use]
        pub fn scheduled_count(&self) -> usize {
            self.lock_schedule().len()
        }

        /// Cancel the periodic effect scheduled under `id`
        ///
        /// Returns `true` if something was cancelled.
        pub fn cancel(&self, id: &EffectId) -> bool {
            let Some(task) = self.lock_schedule().remove(id) else {
                return false;
            };
            task.abort();
            tracing::debug!(id = %id, "Cancelled scheduled effect");
            true
        }

        /// Cancel every scheduled periodic effect
        pub fn cancel_all(&self) {
            let tasks: Vec<_> = self.lock_schedule().drain().collect();
            for (id, task) in tasks {
                task.abort();
                tracing::debug!(id = %id, "Cancelled scheduled effect");
            }
        }

        /// Initiate graceful shutdown
        ///
        /// Rejects new actions, cancels every scheduled periodic effect,
        /// then waits for in-flight effects.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);
            self.cancel_all();

            let start = Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Shut down using the configured timeout
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// when the configured timeout elapses.
        pub async fn close(&self) -> Result<(), StoreError> {
            self.shutdown(self.config.shutdown_timeout).await
        }

        fn lock_schedule(&self) -> MutexGuard<'_, HashMap<EffectId, tokio::task::AbortHandle>> {
            self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Start a global pending-effect guard for shutdown tracking
        fn pending_guard(&self) -> AtomicCounterGuard {
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            AtomicCounterGuard(Arc::clone(&self.pending_effects))
        }

        /// Execute an effect with tracking
        ///
        /// Never awaits: called while `send` holds the state write lock.
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, sends resulting action if `Some`
        /// - `Interval`: Schedules a repeating action under an id
        /// - `Cancel`: Aborts a scheduled interval immediately
        #[tracing::instrument(skip(self, effect, tracking), name = "execute_effect")]
        fn execute_effect(&self, effect: Effect<A>, tracking: &EffectTracking) {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    tracking.increment();
                    let tracking = tracking.clone();
                    let pending_guard = self.pending_guard();
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking);
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            let _ = store.send(action).await;
                        }
                    });
                },
                Effect::Interval { id, period, action } => {
                    metrics::counter!("store.effects.executed", "type" => "interval").increment(1);
                    if period.is_zero() {
                        tracing::warn!(id = %id, "Ignoring interval with zero period");
                        return;
                    }

                    let store = self.clone();
                    let task_id = id.clone();
                    let task = tokio::spawn(async move {
                        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                        loop {
                            ticker.tick().await;
                            tracing::trace!(id = %task_id, "Interval tick");
                            if store.send((*action).clone()).await.is_err() {
                                break;
                            }
                        }
                    });

                    let previous = self.lock_schedule().insert(id.clone(), task.abort_handle());
                    if let Some(previous) = previous {
                        previous.abort();
                        tracing::debug!(id = %id, "Replaced scheduled effect");
                    } else {
                        tracing::debug!(id = %id, period_ms = period.as_millis(), "Scheduled effect");
                    }
                },
                Effect::Cancel(id) => {
                    metrics::counter!("store.effects.executed", "type" => "cancel").increment(1);
                    if !self.cancel(&id) {
                        tracing::trace!(id = %id, "Cancel for unscheduled effect ignored");
                    }
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                config: self.config.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                schedule: Arc::clone(&self.schedule),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use composable_state_core::{smallvec, SmallVec};

    #[derive(Debug, Clone)]
    struct TestState {
        value: i32,
        ticking: bool,
    }

    #[derive(Debug, Clone)]
    enum TestAction {
        Increment,
        Decrement,
        NoOp,
        ProduceEffect,
        ProduceTwoEffects,
        StartTicking,
        StopTicking,
    }

    #[derive(Debug, Clone)]
    struct TestEnv;

    #[derive(Debug, Clone)]
    struct TestReducer;

    fn ticks() -> EffectId {
        EffectId::new("test.ticks")
    }

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                TestAction::Decrement => {
                    state.value -= 1;
                    smallvec![Effect::None]
                },
                TestAction::NoOp => smallvec![Effect::None],
                TestAction::ProduceEffect => {
                    smallvec![Effect::Future(Box::pin(async {
                        Some(TestAction::Increment)
                    }))]
                },
                TestAction::ProduceTwoEffects => {
                    smallvec![
                        Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                        Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                    ]
                },
                TestAction::StartTicking => {
                    state.ticking = true;
                    smallvec![Effect::interval(
                        ticks(),
                        Duration::from_secs(1),
                        TestAction::Increment
                    )]
                },
                TestAction::StopTicking => {
                    state.ticking = false;
                    smallvec![Effect::Cancel(ticks())]
                },
            }
        }
    }

    fn test_store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(
            TestState {
                value: 0,
                ticking: false,
            },
            TestReducer,
            TestEnv,
        )
    }

    #[tokio::test]
    async fn test_store_creation() {
        let store = test_store();
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_multiple_actions() {
        let store = test_store();

        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Decrement).await;
        let _ = store.send(TestAction::NoOp).await;

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_future_effect_feeds_back() {
        let store = test_store();

        let Ok(mut handle) = store.send(TestAction::ProduceEffect).await else {
            unreachable!("store is not shutting down");
        };
        handle.wait().await;

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_handle_tracks_every_future() {
        let store = test_store();

        let Ok(mut handle) = store.send(TestAction::ProduceTwoEffects).await else {
            unreachable!("store is not shutting down");
        };
        handle.wait().await;

        assert_eq!(handle.pending(), 0);
        assert_eq!(store.state(|s| s.value).await, 2);
    }

    #[tokio::test]
    async fn test_send_and_read_sees_reduced_state() {
        let store = test_store();
        let _ = store.send(TestAction::Increment).await;

        let Ok((_, value)) = store
            .send_and_read(TestAction::Increment, |s| s.value)
            .await
        else {
            unreachable!("store is not shutting down");
        };
        assert_eq!(value, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_schedule_matches_state_under_concurrent_sends() {
        let store = test_store();

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                tokio::spawn(async move {
                    for round in 0..200 {
                        let action = if (worker + round) % 2 == 0 {
                            TestAction::StartTicking
                        } else {
                            TestAction::StopTicking
                        };
                        let _ = store.send(action).await;
                    }
                })
            })
            .collect();
        for worker in workers {
            assert!(worker.await.is_ok());
        }

        let ticking = store.state(|s| s.ticking).await;
        assert_eq!(ticking, store.is_scheduled(&ticks()));
        assert!(store.scheduled_count() <= 1);
        store.cancel_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticks_until_cancelled() {
        let store = test_store();

        let _ = store.send(TestAction::StartTicking).await;
        assert!(store.is_scheduled(&ticks()));

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(store.state(|s| s.value).await, 3);

        let _ = store.send(TestAction::StopTicking).await;
        assert!(!store.is_scheduled(&ticks()));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.state(|s| s.value).await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_replaces_interval() {
        let store = test_store();

        let _ = store.send(TestAction::StartTicking).await;
        let _ = store.send(TestAction::StartTicking).await;
        assert_eq!(store.scheduled_count(), 1);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(store.state(|s| s.value).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_stops_every_interval() {
        let store = test_store();

        let _ = store.send(TestAction::StartTicking).await;
        store.cancel_all();
        assert_eq!(store.scheduled_count(), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_cancel_unscheduled_is_noop() {
        let store = test_store();
        assert!(!store.cancel(&ticks()));
        let _ = store.send(TestAction::StopTicking).await;
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_actions_and_cancels_schedule() {
        let store = test_store();
        let _ = store.send(TestAction::StartTicking).await;

        assert!(store.shutdown(Duration::from_secs(1)).await.is_ok());
        assert_eq!(store.scheduled_count(), 0);
        assert!(matches!(
            store.send(TestAction::Increment).await,
            Err(StoreError::ShutdownInProgress)
        ));
    }

    #[tokio::test]
    async fn test_completed_handle() {
        let mut handle = EffectHandle::completed();
        assert_eq!(handle.pending(), 0);
        assert!(handle.wait_with_timeout(Duration::from_millis(10)).await.is_ok());
    }
}
