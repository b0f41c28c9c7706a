//! Demo configuration read from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `COMPOSABLE_STATE_STORAGE_DIR` | unset (todos kept in memory) |
//! | `COMPOSABLE_STATE_TODOS_AUTOSAVE` | `true` |
//! | `COMPOSABLE_STATE_TODOS_KEY` | `todos` |
//! | `COMPOSABLE_STATE_TIMER_INTERVAL_MS` | `1000` |

use crate::timer::{TimerOptions, DEFAULT_INTERVAL_MS};
use crate::todos::{TodoOptions, DEFAULT_STORAGE_KEY};
use std::path::PathBuf;
use thiserror::Error;

/// Directory for `FileStore`
pub const STORAGE_DIR_VAR: &str = "COMPOSABLE_STATE_STORAGE_DIR";
/// Todo auto-save switch
pub const TODOS_AUTOSAVE_VAR: &str = "COMPOSABLE_STATE_TODOS_AUTOSAVE";
/// Todo storage key
pub const TODOS_KEY_VAR: &str = "COMPOSABLE_STATE_TODOS_KEY";
/// Timer tick interval
pub const TIMER_INTERVAL_VAR: &str = "COMPOSABLE_STATE_TIMER_INTERVAL_MS";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable that should hold a boolean holds something else
    #[error("{var} must be a boolean, got {value:?}")]
    InvalidBool {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },

    /// A variable that should hold a positive integer holds something else
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidInterval {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },

    /// The storage key is empty or not a plain name
    #[error("{var} must be a non-empty name without path separators, got {value:?}")]
    InvalidKey {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
}

/// Settings of the demo binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Where todos are saved; `None` keeps them in memory
    pub storage_dir: Option<PathBuf>,
    /// Whether todos are restored and saved
    pub todos_auto_save: bool,
    /// Key the todo list is saved under
    pub todos_key: String,
    /// Timer tick interval in milliseconds
    pub timer_interval_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            todos_auto_save: true,
            todos_key: DEFAULT_STORAGE_KEY.to_string(),
            timer_interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl DemoConfig {
    /// Read the configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a set variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a set variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(STORAGE_DIR_VAR).filter(|dir| !dir.trim().is_empty()) {
            config.storage_dir = Some(PathBuf::from(dir));
        }

        if let Some(value) = lookup(TODOS_AUTOSAVE_VAR) {
            config.todos_auto_save = parse_bool(TODOS_AUTOSAVE_VAR, &value)?;
        }

        if let Some(key) = lookup(TODOS_KEY_VAR) {
            let trimmed = key.trim();
            if trimmed.is_empty() || trimmed.contains(['/', '\\']) || trimmed.starts_with('.') {
                return Err(ConfigError::InvalidKey {
                    var: TODOS_KEY_VAR,
                    value: key,
                });
            }
            config.todos_key = trimmed.to_string();
        }

        if let Some(value) = lookup(TIMER_INTERVAL_VAR) {
            config.timer_interval_ms = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidInterval {
                    var: TIMER_INTERVAL_VAR,
                    value,
                })?;
        }

        Ok(config)
    }

    /// Options for the demo todo list
    #[must_use]
    pub fn todo_options(&self) -> TodoOptions {
        TodoOptions::new()
            .with_auto_save(self.todos_auto_save)
            .with_storage_key(self.todos_key.clone())
    }

    /// Options for the demo timer
    #[must_use]
    pub fn timer_options(&self) -> TimerOptions {
        TimerOptions::new().with_interval_ms(self.timer_interval_ms)
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}
