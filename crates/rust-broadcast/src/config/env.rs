//! Environment-based configuration.

use std::collections::HashMap;
use std::time::Duration;

use super::{EngineConfig, LogFormat};

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "BROADCAST";

/// Environment variable reader.
///
/// Reads the process environment by default; [`EnvConfig::from_vars`] reads
/// from a fixed set of variables instead.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Fixed variables used instead of the process environment.
    vars: Option<HashMap<String, String>>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a new environment config reader.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vars: None,
        }
    }

    /// Create a reader over a fixed set of variables.
    #[must_use]
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let var_name = self.var_name(name);
        match &self.vars {
            Some(vars) => vars.get(&var_name).cloned(),
            None => std::env::var(&var_name).ok(),
        }
    }

    /// Get a parsed value.
    #[must_use]
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }

    /// Get a boolean value.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| {
            matches!(
                v.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enabled"
            )
        })
    }

    /// Get a duration in milliseconds.
    #[must_use]
    pub fn duration_millis(&self, name: &str) -> Option<Duration> {
        self.parse::<u64>(name).map(Duration::from_millis)
    }

    /// Apply every recognised variable on top of `config`.
    ///
    /// Unparseable values are ignored and the base value is kept.
    #[must_use]
    pub fn apply_to(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(timeout) = self.duration_millis("timeout_ms") {
            config.default_settings.timeout = timeout;
        }
        if let Some(parallel) = self.bool("parallel") {
            config.default_settings.parallel_execution = parallel;
        }
        if let Some(stop) = self.bool("stop_on_first_error") {
            config.default_settings.stop_on_first_error = stop;
        }
        if let Some(log) = self.bool("log_commands") {
            config.default_settings.log_commands = log;
        }
        if let Some(capacity) = self.parse::<usize>("history_capacity") {
            config.history_capacity = capacity;
        }
        if let Some(exclude) = self.bool("exclude_skipped_from_average") {
            config.exclude_skipped_from_average = exclude;
        }
        if let Some(level) = self.get("log_level") {
            config.logging.level = level;
        }
        if let Some(format) = self.parse::<LogFormat>("log_format") {
            config.logging.format = format;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_name_uses_prefix() {
        let env = EnvConfig::new("APP");
        assert_eq!(env.var_name("timeout_ms"), "APP_TIMEOUT_MS");
        assert_eq!(EnvConfig::new("").var_name("x"), "X");
    }

    #[test]
    fn apply_overrides() {
        let env = EnvConfig::from_vars(
            DEFAULT_PREFIX,
            [
                ("BROADCAST_TIMEOUT_MS", "750"),
                ("BROADCAST_PARALLEL", "false"),
                ("BROADCAST_STOP_ON_FIRST_ERROR", "yes"),
                ("BROADCAST_HISTORY_CAPACITY", "12"),
                ("BROADCAST_LOG_FORMAT", "json"),
            ],
        );

        let config = env.apply_to(EngineConfig::default());
        assert_eq!(config.default_settings.timeout, Duration::from_millis(750));
        assert!(!config.default_settings.parallel_execution);
        assert!(config.default_settings.stop_on_first_error);
        assert_eq!(config.history_capacity, 12);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn unparseable_values_keep_base() {
        let env = EnvConfig::from_vars(
            DEFAULT_PREFIX,
            [("BROADCAST_HISTORY_CAPACITY", "lots"), ("BROADCAST_LOG_FORMAT", "xml")],
        );
        let config = env.apply_to(EngineConfig::default());
        assert_eq!(config.history_capacity, crate::config::DEFAULT_HISTORY_CAPACITY);
        assert_eq!(config.logging.format, LogFormat::default());
    }
}
