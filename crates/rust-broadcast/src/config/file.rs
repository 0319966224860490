//! File-based configuration loading.

use std::path::{Path, PathBuf};

use super::EngineConfig;
use crate::error::{BroadcastError, Result};

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Configuration file loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Search paths.
    search_paths: Vec<PathBuf>,
    /// Format used when the extension is not recognised.
    default_format: Option<ConfigFormat>,
}

impl ConfigLoader {
    /// Create a new loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a search path.
    #[must_use]
    pub fn add_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Set default format.
    #[must_use]
    pub const fn with_format(mut self, format: ConfigFormat) -> Self {
        self.default_format = Some(format);
        self
    }

    /// Find a config file by name, trying known extensions.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let extensions = ["toml", "json"];

        for search_path in &self.search_paths {
            let path = search_path.join(name);
            if path.is_file() {
                return Some(path);
            }

            for ext in &extensions {
                let path = search_path.join(format!("{name}.{ext}"));
                if path.is_file() {
                    return Some(path);
                }
            }
        }

        None
    }

    /// Load a config file.
    pub fn load(&self, path: &Path) -> Result<EngineConfig> {
        let content = BroadcastError::with_io_context(
            std::fs::read_to_string(path),
            format!("reading config file {}", path.display()),
        )?;

        let format = ConfigFormat::from_path(path)
            .or(self.default_format)
            .ok_or_else(|| {
                BroadcastError::config(format!("unknown config format: {}", path.display()))
            })?;

        let config = parse_config(&content, format)?;
        config.validate()?;
        Ok(config)
    }

    /// Load by name (searches paths).
    pub fn load_by_name(&self, name: &str) -> Result<EngineConfig> {
        let path = self
            .find(name)
            .ok_or_else(|| BroadcastError::config(format!("config file not found: {name}")))?;
        self.load(&path)
    }
}

/// Parse config content. Missing keys take their default values.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<EngineConfig> {
    let config = match format {
        ConfigFormat::Toml => toml::from_str(content)?,
        ConfigFormat::Json => serde_json::from_str(content)?,
    };
    Ok(config)
}

/// Render a config in the given format.
pub fn render_config(config: &EngineConfig, format: ConfigFormat) -> Result<String> {
    let rendered = match format {
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::LogFormat;

    #[test]
    fn parse_toml_partial() {
        let content = r#"
            history_capacity = 50
            exclude_skipped_from_average = true

            [default_settings]
            parallel_execution = false
            timeout_ms = 2500

            [logging]
            format = "json"
        "#;

        let config = parse_config(content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.history_capacity, 50);
        assert!(config.exclude_skipped_from_average);
        assert!(!config.default_settings.parallel_execution);
        assert_eq!(config.default_settings.timeout, Duration::from_millis(2500));
        // Untouched keys keep defaults
        assert!(!config.default_settings.stop_on_first_error);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_json_basic() {
        let content = r#"{ "regex_cache_size": 8, "default_settings": { "stop_on_first_error": true } }"#;
        let config = parse_config(content, ConfigFormat::Json).unwrap();
        assert_eq!(config.regex_cache_size, 8);
        assert!(config.default_settings.stop_on_first_error);
    }

    #[test]
    fn parse_rejects_unknown_log_format() {
        let content = "[logging]\nformat = \"xml\"\n";
        assert!(parse_config(content, ConfigFormat::Toml).is_err());
    }

    #[test]
    fn render_then_parse_toml() {
        let config = EngineConfig::default().history_capacity(10);
        let rendered = render_config(&config, ConfigFormat::Toml).unwrap();
        assert_eq!(parse_config(&rendered, ConfigFormat::Toml).unwrap(), config);
    }

    #[test]
    fn config_format_detection() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("JSON"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
