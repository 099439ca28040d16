//! Engine configuration
//!
//! Loaded from TOML. Every section and every key is optional:
//!
//! ```toml
//! [execution]
//! strict = true
//! speculation = true
//!
//! [pattern]
//! cache_capacity = 64
//!
//! [intl]
//! default_locale = "en"
//! available_locales = ["en", "de", "fr", "es"]
//!
//! [logging]
//! level = "info"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::intl::canonicalize_language_tag;

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub execution: ExecutionConfig,
    pub pattern: PatternConfig,
    pub intl: IntlConfig,
    pub logging: LoggingConfig,
}

/// The `[execution]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Default strictness for nodes built by the factory
    pub strict: bool,
    /// Use the typed int/double channels; when off every node runs generic
    pub speculation: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            strict: false,
            speculation: true,
        }
    }
}

/// The `[pattern]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatternConfig {
    /// Number of compiled patterns kept in the LRU cache
    pub cache_capacity: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        PatternConfig { cache_capacity: 64 }
    }
}

/// The `[intl]` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntlConfig {
    /// Locale used when none of the requested locales is available
    pub default_locale: String,
    /// Locales the formatting data provider claims to support
    pub available_locales: Vec<String>,
}

impl Default for IntlConfig {
    fn default() -> Self {
        IntlConfig {
            default_locale: "en".to_string(),
            available_locales: ["en", "de", "fr", "es"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// The `[logging]` section
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

/// Maximum level passed to the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// File could not be read
    Io(PathBuf, String),
    /// File is not valid TOML or has unknown keys
    Parse(String),
    /// Values are well-formed but unusable
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, err) => {
                write!(f, "Failed to read '{}': {}", path.display(), err)
            }
            ConfigError::Parse(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Configuration rejected: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;
        Self::from_toml_str(&text)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pattern.cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "pattern.cache_capacity must be at least 1".to_string(),
            ));
        }
        let default = canonicalize_language_tag(&self.intl.default_locale).map_err(|_| {
            ConfigError::Invalid(format!(
                "intl.default_locale '{}' is not a valid language tag",
                self.intl.default_locale
            ))
        })?;
        let mut has_default = false;
        for locale in &self.intl.available_locales {
            let canonical = canonicalize_language_tag(locale).map_err(|_| {
                ConfigError::Invalid(format!(
                    "intl.available_locales entry '{}' is not a valid language tag",
                    locale
                ))
            })?;
            has_default |= canonical == default;
        }
        if !has_default {
            return Err(ConfigError::Invalid(format!(
                "intl.default_locale '{}' is not listed in intl.available_locales",
                self.intl.default_locale
            )));
        }
        Ok(())
    }
}
