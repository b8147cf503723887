//! Error types for the cleaning agent.
//!
//! Two families of failure exist and they never mix:
//!
//! - [`CleaningError`] is returned as `Err` from the agent. It covers fatal
//!   conditions (the generation capability failing, bad configuration, IO)
//!   and the terminal [`CleaningError::RetryBudgetExhausted`] produced by
//!   [`WorkflowState::into_cleaned`](crate::WorkflowState::into_cleaned).
//! - [`ExecutionFailure`] describes why a single execution attempt of a
//!   generated routine failed. It is recoverable and only ever travels
//!   through the repair loop as a diagnostic string.
//!
//! Errors are serializable so the CLI can emit them as JSON.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning agent.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// The generation capability failed (quota, timeout, transport, empty reply).
    #[error("Generation failed ({provider}): {message}")]
    GenerationFailed { provider: String, message: String },

    /// Every attempt failed and the retry budget is spent.
    #[error("Retry budget exhausted after {retries} repair(s): {last_error}")]
    RetryBudgetExhausted {
        retries: usize,
        last_error: String,
        function_source: String,
    },

    /// The workflow was asked for a result before reaching a terminal stage.
    #[error("Workflow has not reached a terminal stage (currently {0})")]
    NotTerminal(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Build a generation failure from a provider name and any displayable error.
    pub fn generation(provider: impl Into<String>, err: impl std::fmt::Display) -> Self {
        CleaningError::GenerationFailed {
            provider: provider.into(),
            message: err.to_string(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for machine consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::GenerationFailed { .. } => "GENERATION_FAILED",
            Self::RetryBudgetExhausted { .. } => "RETRY_BUDGET_EXHAUSTED",
            Self::NotTerminal(_) => "NOT_TERMINAL",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error aborted the workflow outside the repair loop.
    ///
    /// `RetryBudgetExhausted` is not fatal in this sense: the loop ran to
    /// completion and the last source and error are attached.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::RetryBudgetExhausted { .. } | Self::NotTerminal(_) => false,
            Self::WithContext { source, .. } => source.is_fatal(),
            _ => true,
        }
    }
}

impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Io(e).with_context(context))
    }
}

/// Why a single execution attempt of a generated routine failed.
///
/// Every variant is recoverable: the orchestrator routes it into the repair
/// loop while budget remains.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionFailure {
    /// The source could not be parsed as a cleaning script.
    #[error("syntax error on line {line}: {message}")]
    Compile { line: usize, message: String },

    /// The program does not define the required entry point.
    #[error("Function '{name}' not found in generated code (defined: {})", format_available(.available))]
    EntryPointMissing { name: String, available: Vec<String> },

    /// A statement raised while the routine was running.
    #[error("line {line}: {message}")]
    Runtime { line: usize, message: String },

    /// The routine finished without returning a dataset.
    #[error("Function '{0}' did not return a dataset")]
    NotTabular(String),

    /// The interpreter panicked; caught at the failure boundary.
    #[error("execution panicked: {0}")]
    Panicked(String),
}

fn format_available(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

impl ExecutionFailure {
    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Compile { .. } => "compile",
            Self::EntryPointMissing { .. } => "entry_point_missing",
            Self::Runtime { .. } => "runtime",
            Self::NotTabular(_) => "not_tabular",
            Self::Panicked(_) => "panicked",
        }
    }

    /// The diagnostic stored in `last_error` and handed to the repairer.
    pub fn diagnostic(&self) -> String {
        format!("An error occurred during data cleaning: {}", self)
    }
}
