//! Configuration types for rust-broadcast.
//!
//! This module defines per-broadcast [`Settings`], the engine-wide
//! [`EngineConfig`] and logging configuration. Configuration can be loaded
//! from TOML or JSON files ([`file`]) and overridden from environment
//! variables ([`env`]).

pub mod env;
pub mod file;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use env::EnvConfig;
pub use file::{ConfigFormat, ConfigLoader};

/// Default per-session timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of broadcast results retained in history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Default number of compiled filter regexes kept in the cache.
pub const DEFAULT_REGEX_CACHE_SIZE: usize = 100;

/// Default log filter directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Execution settings snapshotted for one broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Run all sessions concurrently instead of one at a time.
    pub parallel_execution: bool,

    /// Sequential only: skip the remaining sessions after the first failure.
    pub stop_on_first_error: bool,

    /// Presentation hint: show each session's output.
    pub show_individual_output: bool,

    /// Build a combined output block in the broadcast result.
    pub aggregate_output: bool,

    /// Per-session execution timeout.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,

    /// Presentation hint: ask the user before running.
    pub confirm_before_execution: bool,

    /// Include the command text in log events.
    pub log_commands: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parallel_execution: true,
            stop_on_first_error: false,
            show_individual_output: true,
            aggregate_output: false,
            timeout: DEFAULT_TIMEOUT,
            confirm_before_execution: false,
            log_commands: true,
        }
    }
}

impl Settings {
    /// Create settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings for a one-at-a-time broadcast.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel_execution: false,
            ..Self::default()
        }
    }

    /// Set parallel execution.
    #[must_use]
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.parallel_execution = parallel;
        self
    }

    /// Set stop-on-first-error.
    #[must_use]
    pub const fn stop_on_first_error(mut self, stop: bool) -> Self {
        self.stop_on_first_error = stop;
        self
    }

    /// Set the per-session timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set whether to aggregate output.
    #[must_use]
    pub const fn aggregate_output(mut self, aggregate: bool) -> Self {
        self.aggregate_output = aggregate;
        self
    }

    /// Set whether to show individual output.
    #[must_use]
    pub const fn show_individual_output(mut self, show: bool) -> Self {
        self.show_individual_output = show;
        self
    }

    /// Set whether callers should confirm before running.
    #[must_use]
    pub const fn confirm_before_execution(mut self, confirm: bool) -> Self {
        self.confirm_before_execution = confirm;
        self
    }

    /// Set whether the command text is logged.
    #[must_use]
    pub const fn log_commands(mut self, log: bool) -> Self {
        self.log_commands = log;
        self
    }
}

/// Engine-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Settings used for ad-hoc session-list broadcasts and for groups
    /// created without explicit settings.
    pub default_settings: Settings,

    /// Number of broadcast results retained in history.
    pub history_capacity: usize,

    /// Number of compiled filter regexes to cache.
    pub regex_cache_size: usize,

    /// Leave skipped sessions out of the average execution time.
    pub exclude_skipped_from_average: bool,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_settings: Settings::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            regex_cache_size: DEFAULT_REGEX_CACHE_SIZE,
            exclude_skipped_from_average: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default settings.
    #[must_use]
    pub fn default_settings(mut self, settings: Settings) -> Self {
        self.default_settings = settings;
        self
    }

    /// Set the history capacity.
    #[must_use]
    pub const fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the regex cache size.
    #[must_use]
    pub const fn regex_cache_size(mut self, size: usize) -> Self {
        self.regex_cache_size = size;
        self
    }

    /// Set whether skipped sessions are left out of the average.
    #[must_use]
    pub const fn exclude_skipped_from_average(mut self, exclude: bool) -> Self {
        self.exclude_skipped_from_average = exclude;
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Check the configuration for values the engine cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.history_capacity == 0 {
            return Err(crate::BroadcastError::config(
                "history_capacity must be at least 1",
            ));
        }
        if self.regex_cache_size == 0 {
            return Err(crate::BroadcastError::config(
                "regex_cache_size must be at least 1",
            ));
        }
        if self.default_settings.timeout.is_zero() {
            return Err(crate::BroadcastError::config("timeout must be non-zero"));
        }
        Ok(())
    }
}

/// Configuration for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (e.g. `info` or `rust_broadcast=debug`).
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to emit ANSI colours.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::default(),
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter directive.
    #[must_use]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the log format.
    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set whether to emit ANSI colours.
    #[must_use]
    pub const fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-line human readable output.
    Pretty,

    /// Single-line human readable output.
    #[default]
    Compact,

    /// Newline-delimited JSON.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = crate::BroadcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" | "ndjson" => Ok(Self::Json),
            other => Err(crate::BroadcastError::config(format!(
                "unknown log format: {other}"
            ))),
        }
    }
}

/// Serde helper storing a [`Duration`] as whole milliseconds.
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
