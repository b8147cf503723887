//! Configuration for the cleaning agent.
//!
//! The entry point name, retry budget and source persistence settings live
//! here and are handed to the agent at construction. There is no global state.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default name of the routine the generated source must define.
pub const DEFAULT_FUNCTION_NAME: &str = "data_cleaner";

/// Default number of repair cycles per invocation.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Default file name for persisted source.
pub const DEFAULT_FILE_NAME: &str = "data_cleaner.clean";

/// Default directory for persisted source.
pub const DEFAULT_LOG_PATH: &str = "logs";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex: identifier"));

/// Configuration for [`CleaningAgent`](crate::CleaningAgent).
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaner::AgentConfig;
///
/// let config = AgentConfig::builder()
///     .function_name("tidy")
///     .max_retries(5)
///     .log_source(true)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name of the entry point the generated routine must define.
    /// Default: "data_cleaner"
    pub function_name: String,

    /// Repair budget used when a request does not set one.
    /// Default: 3
    pub max_retries: usize,

    /// Whether to persist generated source through a file sink.
    /// Default: false
    pub log_source: bool,

    /// Directory for persisted source when `log_source` is set.
    /// Default: "logs"
    pub log_path: PathBuf,

    /// File name for persisted source.
    /// Default: "data_cleaner.clean"
    pub file_name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            function_name: DEFAULT_FUNCTION_NAME.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            log_source: false,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl AgentConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !IDENTIFIER.is_match(&self.function_name) {
            return Err(ConfigValidationError::InvalidFunctionName(
                self.function_name.clone(),
            ));
        }

        if self.file_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyFileName);
        }

        if self.log_source && self.log_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyLogPath);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid function name '{0}' (must be an identifier)")]
    InvalidFunctionName(String),

    #[error("File name for persisted source must not be empty")]
    EmptyFileName,

    #[error("Log path must not be empty when source logging is enabled")]
    EmptyLogPath,
}

/// Builder for [`AgentConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AgentConfigBuilder {
    function_name: Option<String>,
    max_retries: Option<usize>,
    log_source: Option<bool>,
    log_path: Option<PathBuf>,
    file_name: Option<String>,
}

impl AgentConfigBuilder {
    /// Set the entry point name the generated routine must define.
    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Set the default repair budget.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Enable or disable persisting generated source to disk.
    pub fn log_source(mut self, enable: bool) -> Self {
        self.log_source = Some(enable);
        self
    }

    /// Set the directory for persisted source.
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Set the file name for persisted source.
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<AgentConfig, ConfigValidationError> {
        let config = AgentConfig {
            function_name: self
                .function_name
                .unwrap_or_else(|| DEFAULT_FUNCTION_NAME.to_string()),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            log_source: self.log_source.unwrap_or(false),
            log_path: self
                .log_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
            file_name: self
                .file_name
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
        };

        config.validate()?;
        Ok(config)
    }
}
