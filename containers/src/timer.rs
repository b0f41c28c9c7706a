//! Stopwatch / countdown timer.
//!
//! While running, the timer changes its elapsed seconds once per interval:
//! up by one in stopwatch mode, down by one in countdown mode. A countdown
//! pauses itself when it reaches zero and never goes below it.
//!
//! Ticks come from an [`Effect::Interval`] scheduled by `Start` and
//! cancelled by `Pause`. Every start opens a new generation; a tick from an
//! older generation (one delivered after a pause) is ignored, so elapsed
//! time only moves while the timer is running.

use composable_state_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
    smallvec, SmallVec,
};
use composable_state_runtime::{Store, StoreError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default tick interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;

/// Id of the periodic tick scheduled by a running timer
#[must_use]
pub fn tick_id() -> EffectId {
    EffectId::new("timer.tick")
}

/// Construction options for a timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerOptions {
    /// Start ticking as soon as the timer is created
    pub auto_start: bool,
    /// Milliseconds between ticks
    pub interval_ms: u64,
    /// Count down towards zero instead of up
    pub countdown: bool,
    /// Seconds on the clock at construction and after reset
    pub initial: i64,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self {
            auto_start: false,
            interval_ms: DEFAULT_INTERVAL_MS,
            countdown: false,
            initial: 0,
        }
    }
}

impl TimerOptions {
    /// Stopwatch starting at zero, ticking every second
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Countdown from `seconds`
    #[must_use]
    pub fn countdown(seconds: i64) -> Self {
        Self {
            countdown: true,
            initial: seconds,
            ..Self::default()
        }
    }

    /// Start immediately on construction
    #[must_use]
    pub const fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Set the tick interval
    #[must_use]
    pub const fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Set the initial seconds
    #[must_use]
    pub const fn with_initial(mut self, initial: i64) -> Self {
        self.initial = initial;
        self
    }

    /// Tick interval (at least one millisecond)
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Timer state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    seconds: i64,
    running: bool,
    generation: u64,
    options: TimerOptions,
}

impl TimerState {
    /// A paused timer showing `options.initial`
    #[must_use]
    pub fn new(options: TimerOptions) -> Self {
        Self {
            seconds: options.initial,
            running: false,
            generation: 0,
            options,
        }
    }

    /// Elapsed (or remaining, for a countdown) seconds
    #[must_use]
    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Whether the timer is ticking
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Options the timer was built with
    #[must_use]
    pub const fn options(&self) -> &TimerOptions {
        &self.options
    }

    /// Whole minutes, rounded towards negative infinity
    #[must_use]
    pub const fn minutes(&self) -> i64 {
        self.seconds.div_euclid(60)
    }

    /// Whole hours, rounded towards negative infinity
    #[must_use]
    pub const fn hours(&self) -> i64 {
        self.seconds.div_euclid(3_600)
    }

    /// `MM:SS`, or `HH:MM:SS` once there is at least an hour, with a leading
    /// `-` for negative values
    #[must_use]
    pub fn formatted_time(&self) -> String {
        format_seconds(self.seconds)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(TimerOptions::default())
    }
}

/// Render seconds as `MM:SS` or `HH:MM:SS`
#[must_use]
pub fn format_seconds(seconds: i64) -> String {
    let total = seconds.unsigned_abs();
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;
    let sign = if seconds < 0 { "-" } else { "" };

    if hours > 0 {
        format!("{sign}{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{sign}{minutes:02}:{secs:02}")
    }
}

/// Timer actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerAction {
    /// Begin ticking (no-op while running)
    Start,
    /// Stop ticking (no-op while paused)
    Pause,
    /// Stop and restore the initial seconds
    Reset,
    /// Start when paused, pause when running
    Toggle,
    /// One interval elapsed for the schedule opened by `generation`
    Tick {
        /// Generation of the start that scheduled this tick
        generation: u64,
    },
}

/// Timer environment (ticks come from the runtime scheduler)
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerEnvironment;

/// Timer reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerReducer;

impl TimerReducer {
    fn start(state: &mut TimerState) -> SmallVec<[Effect<TimerAction>; 4]> {
        if state.running {
            tracing::debug!("Start ignored: timer already running");
            return smallvec![Effect::None];
        }

        state.running = true;
        state.generation = state.generation.wrapping_add(1);
        tracing::debug!(generation = state.generation, "Timer started");

        smallvec![Effect::interval(
            tick_id(),
            state.options.interval(),
            TimerAction::Tick {
                generation: state.generation,
            },
        )]
    }

    fn pause(state: &mut TimerState) -> SmallVec<[Effect<TimerAction>; 4]> {
        if !state.running {
            return smallvec![Effect::None];
        }

        state.running = false;
        tracing::debug!(seconds = state.seconds, "Timer paused");
        smallvec![Effect::Cancel(tick_id())]
    }

    fn tick(state: &mut TimerState, generation: u64) -> SmallVec<[Effect<TimerAction>; 4]> {
        if !state.running || generation != state.generation {
            tracing::trace!(generation, "Stale tick ignored");
            return smallvec![Effect::None];
        }

        if state.options.countdown {
            state.seconds = state.seconds.saturating_sub(1);
            if state.seconds <= 0 {
                state.seconds = 0;
                tracing::debug!("Countdown finished");
                return Self::pause(state);
            }
        } else {
            state.seconds = state.seconds.saturating_add(1);
        }

        smallvec![Effect::None]
    }
}

impl Reducer for TimerReducer {
    type State = TimerState;
    type Action = TimerAction;
    type Environment = TimerEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _environment: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TimerAction::Start => Self::start(state),
            TimerAction::Pause => Self::pause(state),
            TimerAction::Reset => {
                let effects = Self::pause(state);
                state.seconds = state.options.initial;
                effects
            },
            TimerAction::Toggle => {
                if state.running {
                    Self::pause(state)
                } else {
                    Self::start(state)
                }
            },
            TimerAction::Tick { generation } => Self::tick(state, generation),
        }
    }
}

/// A timer running in its own [`Store`]
///
/// Dropping the timer cancels its periodic tick.
pub struct Timer {
    store: Store<TimerState, TimerAction, TimerEnvironment, TimerReducer>,
}

impl Timer {
    /// Create a timer, starting it right away when `options.auto_start` is set
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the auto-start action is rejected.
    pub async fn new(options: TimerOptions) -> Result<Self, StoreError> {
        let auto_start = options.auto_start;
        let timer = Self {
            store: Store::new(TimerState::new(options), TimerReducer, TimerEnvironment),
        };

        if auto_start {
            timer.start().await?;
        }
        Ok(timer)
    }

    /// Begin ticking
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the timer is closed.
    pub async fn start(&self) -> Result<(), StoreError> {
        self.store.send(TimerAction::Start).await.map(drop)
    }

    /// Stop ticking
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the timer is closed.
    pub async fn pause(&self) -> Result<(), StoreError> {
        self.store.send(TimerAction::Pause).await.map(drop)
    }

    /// Stop and restore the initial seconds
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the timer is closed.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.store.send(TimerAction::Reset).await.map(drop)
    }

    /// Start or pause
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the timer is closed.
    pub async fn toggle(&self) -> Result<(), StoreError> {
        self.store.send(TimerAction::Toggle).await.map(drop)
    }

    /// Current seconds
    pub async fn seconds(&self) -> i64 {
        self.store.state(TimerState::seconds).await
    }

    /// Whether the timer is running
    pub async fn is_running(&self) -> bool {
        self.store.state(TimerState::is_running).await
    }

    /// Current seconds as `MM:SS` / `HH:MM:SS`
    pub async fn formatted_time(&self) -> String {
        self.store.state(TimerState::formatted_time).await
    }

    /// Copy of the full state
    pub async fn snapshot(&self) -> TimerState {
        self.store.state(TimerState::clone).await
    }

    /// Number of tick schedules currently active (0 or 1)
    #[must_use]
    pub fn active_schedules(&self) -> usize {
        self.store.scheduled_count()
    }

    /// Stop accepting actions and cancel the tick
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if in-flight effects outlive
    /// the store's shutdown timeout.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.store.close().await
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.store.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composable_state_testing::{assertions, ReducerTest};

    fn running(options: TimerOptions) -> TimerState {
        let mut state = TimerState::new(options);
        let _ = TimerReducer.reduce(&mut state, TimerAction::Start, &TimerEnvironment);
        state
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0), "00:00");
        assert_eq!(format_seconds(59), "00:59");
        assert_eq!(format_seconds(61), "01:01");
        assert_eq!(format_seconds(3_599), "59:59");
        assert_eq!(format_seconds(3_600), "01:00:00");
        assert_eq!(format_seconds(37_230), "10:20:30");
        assert_eq!(format_seconds(-5), "-00:05");
        assert_eq!(format_seconds(-3_661), "-01:01:01");
        assert_eq!(format_seconds(i64::MIN).chars().next(), Some('-'));
    }

    #[test]
    fn test_minutes_and_hours_floor() {
        let state = TimerState::new(TimerOptions::new().with_initial(3_725));
        assert_eq!(state.minutes(), 62);
        assert_eq!(state.hours(), 1);

        let negative = TimerState::new(TimerOptions::new().with_initial(-30));
        assert_eq!(negative.minutes(), -1);
        assert_eq!(negative.hours(), -1);
    }

    #[test]
    fn test_start_schedules_tick() {
        ReducerTest::new(TimerReducer)
            .with_env(TimerEnvironment)
            .given_state(TimerState::default())
            .when_action(TimerAction::Start)
            .then_state(|state| assert!(state.is_running()))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_schedules(effects, &tick_id());
            })
            .run();
    }

    #[test]
    fn test_start_while_running_schedules_nothing() {
        ReducerTest::new(TimerReducer)
            .with_env(TimerEnvironment)
            .given_state(running(TimerOptions::new()))
            .when_action(TimerAction::Start)
            .then_state(|state| assert!(state.is_running()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_pause_cancels_tick() {
        ReducerTest::new(TimerReducer)
            .with_env(TimerEnvironment)
            .given_state(running(TimerOptions::new()))
            .when_action(TimerAction::Pause)
            .then_state(|state| assert!(!state.is_running()))
            .then_effects(|effects| assertions::assert_cancels(effects, &tick_id()))
            .run();
    }

    #[test]
    fn test_pause_while_paused_is_noop() {
        ReducerTest::new(TimerReducer)
            .with_env(TimerEnvironment)
            .given_state(TimerState::default())
            .when_action(TimerAction::Pause)
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_ticks_count_up() {
        let mut state = running(TimerOptions::new());
        for _ in 0..5 {
            let _ = TimerReducer.reduce(&mut state, TimerAction::Tick { generation: 1 }, &TimerEnvironment);
        }
        assert_eq!(state.seconds(), 5);
        assert_eq!(state.formatted_time(), "00:05");
    }

    #[test]
    fn test_tick_while_paused_is_ignored() {
        ReducerTest::new(TimerReducer)
            .with_env(TimerEnvironment)
            .given_state(TimerState::default())
            .when_action(TimerAction::Tick { generation: 0 })
            .then_state(|state| assert_eq!(state.seconds(), 0))
            .run();
    }

    #[test]
    fn test_tick_from_previous_start_is_ignored() {
        ReducerTest::new(TimerReducer)
            .with_env(TimerEnvironment)
            .given_state(running(TimerOptions::new()))
            .when_actions([
                TimerAction::Pause,
                TimerAction::Start,
                TimerAction::Tick { generation: 1 },
            ])
            .then_state(|state| assert_eq!(state.seconds(), 0))
            .run();
    }

    #[test]
    fn test_countdown_stops_at_zero() {
        ReducerTest::new(TimerReducer)
            .with_env(TimerEnvironment)
            .given_state(running(TimerOptions::countdown(2)))
            .when_actions([
                TimerAction::Tick { generation: 1 },
                TimerAction::Tick { generation: 1 },
            ])
            .then_state(|state| {
                assert_eq!(state.seconds(), 0);
                assert!(!state.is_running());
            })
            .then_effects(|effects| assertions::assert_cancels(effects, &tick_id()))
            .run();
    }

    #[test]
    fn test_countdown_from_zero_clamps() {
        ReducerTest::new(TimerReducer)
            .with_env(TimerEnvironment)
            .given_state(running(TimerOptions::countdown(0)))
            .when_action(TimerAction::Tick { generation: 1 })
            .then_state(|state| {
                assert_eq!(state.seconds(), 0);
                assert!(!state.is_running());
            })
            .run();
    }

    #[test]
    fn test_reset_pauses_and_restores() {
        let mut state = running(TimerOptions::new().with_initial(10));
        let _ = TimerReducer.reduce(&mut state, TimerAction::Tick { generation: 1 }, &TimerEnvironment);
        assert_eq!(state.seconds(), 11);

        let effects = TimerReducer.reduce(&mut state, TimerAction::Reset, &TimerEnvironment);
        assert_eq!(state.seconds(), 10);
        assert!(!state.is_running());
        assertions::assert_cancels(&effects, &tick_id());
    }

    #[test]
    fn test_toggle_flips() {
        ReducerTest::new(TimerReducer)
            .with_env(TimerEnvironment)
            .given_state(TimerState::default())
            .when_action(TimerAction::Toggle)
            .then_state(|state| assert!(state.is_running()))
            .then_effects(|effects| assertions::assert_schedules(effects, &tick_id()))
            .run();

        ReducerTest::new(TimerReducer)
            .with_env(TimerEnvironment)
            .given_state(TimerState::default())
            .when_actions([TimerAction::Toggle, TimerAction::Toggle])
            .then_state(|state| assert!(!state.is_running()))
            .then_effects(|effects| assertions::assert_cancels(effects, &tick_id()))
            .run();
    }

    #[test]
    fn test_zero_interval_is_raised_to_one_millisecond() {
        assert_eq!(
            TimerOptions::new().with_interval_ms(0).interval(),
            Duration::from_millis(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_tick() {
        let timer = Timer::new(TimerOptions::new().with_auto_start(true))
            .await
            .unwrap_or_else(|error| unreachable!("fresh timer rejected start: {error}"));
        let store = timer.store.clone();
        assert!(store.is_scheduled(&tick_id()));

        drop(timer);
        assert_eq!(store.scheduled_count(), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.state(TimerState::seconds).await, 0);
    }
}
