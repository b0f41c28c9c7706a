//! # Composable State Containers
//!
//! Small reactive state containers built on the composable state runtime:
//!
//! - [`counter`]: an integer stepping inside optional bounds
//! - [`counter_store`]: a shared count with a multiplier
//! - [`timer`]: stopwatch and countdown driven by a periodic tick
//! - [`todos`]: a todo list with optional auto-save to a key-value store
//! - [`forms`]: field values, validation rules, errors and touched flags
//!
//! Every container is a state type, an action enum and a reducer, plus a
//! facade that owns a [`Store`](composable_state_runtime::Store) and exposes
//! the operations as async methods. Derived values are plain methods on the
//! state types.

pub mod config;
pub mod counter;
pub mod counter_store;
pub mod forms;
pub mod timer;
pub mod todos;

pub use config::{ConfigError, DemoConfig};
pub use counter::Counter;
pub use counter_store::CounterStore;
pub use forms::Form;
pub use timer::Timer;
pub use todos::TodoList;
