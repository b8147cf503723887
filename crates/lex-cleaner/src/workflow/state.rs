//! Workflow stages and the state record carried through one invocation.

use crate::error::{CleaningError, ExecutionFailure, Result};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Stages of the generate, execute, repair loop.
///
/// ```text
/// Init -> Generate -> Execute -> Success
///                       ^  |
///                       |  v
///                      Repair    (Execute -> Failure once the budget is spent)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Init,
    Generate,
    Execute,
    Repair,
    Success,
    Failure,
}

impl WorkflowStage {
    /// The stage that follows this one.
    ///
    /// Only `Execute` branches: on `has_error` it goes to `Repair` while
    /// `retry_count < max_retries` and to `Failure` otherwise. Terminal stages
    /// return `None`.
    pub fn next(self, has_error: bool, retry_count: usize, max_retries: usize) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Generate),
            Self::Generate => Some(Self::Execute),
            Self::Execute if !has_error => Some(Self::Success),
            Self::Execute if retry_count < max_retries => Some(Self::Repair),
            Self::Execute => Some(Self::Failure),
            Self::Repair => Some(Self::Execute),
            Self::Success | Self::Failure => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    /// Returns a human-readable name for the stage.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::Generate => "Generate",
            Self::Execute => "Execute",
            Self::Repair => "Repair",
            Self::Success => "Success",
            Self::Failure => "Failure",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Everything one invocation knows about its progress.
///
/// Owned by the agent while the workflow runs and handed back to the
/// caller once a terminal stage is reached.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    stage: WorkflowStage,
    instructions: Option<String>,
    raw_dataset: DataFrame,
    cleaned_dataset: Option<DataFrame>,
    function_name: String,
    function_source: String,
    source_path: Option<PathBuf>,
    last_error: Option<String>,
    last_failure: Option<ExecutionFailure>,
    retry_count: usize,
    max_retries: usize,
}

impl WorkflowState {
    pub(crate) fn new(
        raw_dataset: DataFrame,
        instructions: Option<String>,
        function_name: impl Into<String>,
        max_retries: usize,
    ) -> Self {
        Self {
            stage: WorkflowStage::Init,
            instructions,
            raw_dataset,
            cleaned_dataset: None,
            function_name: function_name.into(),
            function_source: String::new(),
            source_path: None,
            last_error: None,
            last_failure: None,
            retry_count: 0,
            max_retries,
        }
    }

    // ---- accessors ----

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// The dataset as supplied by the caller. Never modified.
    pub fn raw_dataset(&self) -> &DataFrame {
        &self.raw_dataset
    }

    /// The cleaned dataset; only present after `Success`.
    pub fn cleaned_dataset(&self) -> Option<&DataFrame> {
        self.cleaned_dataset.as_ref()
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// The latest generated or repaired routine.
    pub fn function_source(&self) -> &str {
        &self.function_source
    }

    /// Where the latest routine was persisted, if a sink is configured.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Structured form of [`last_error`](Self::last_error).
    pub fn last_failure(&self) -> Option<&ExecutionFailure> {
        self.last_failure.as_ref()
    }

    pub fn retry_count(&self) -> usize {
        self.retry_count
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn is_success(&self) -> bool {
        self.stage == WorkflowStage::Success
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Convert a terminal state into the cleaned dataset.
    pub fn into_cleaned(self) -> Result<DataFrame> {
        match (self.stage, self.cleaned_dataset) {
            (WorkflowStage::Success, Some(df)) => Ok(df),
            (WorkflowStage::Failure, _) => Err(CleaningError::RetryBudgetExhausted {
                retries: self.retry_count,
                last_error: self.last_error.unwrap_or_default(),
                function_source: self.function_source,
            }),
            (stage, _) => Err(CleaningError::NotTerminal(stage.to_string())),
        }
    }

    // ---- transitions, driven by the agent ----

    pub(crate) fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    pub(crate) fn enter(&mut self, stage: WorkflowStage) {
        self.stage = stage;
    }

    pub(crate) fn set_source(&mut self, source: String) {
        self.function_source = source;
    }

    pub(crate) fn set_source_path(&mut self, path: PathBuf) {
        self.source_path = Some(path);
    }

    pub(crate) fn record_success(&mut self, cleaned: DataFrame) {
        self.cleaned_dataset = Some(cleaned);
        self.last_error = None;
        self.last_failure = None;
    }

    pub(crate) fn record_failure(&mut self, failure: ExecutionFailure) {
        self.cleaned_dataset = None;
        self.last_error = Some(failure.diagnostic());
        self.last_failure = Some(failure);
    }

    /// Install repaired source: clears the error and spends one retry.
    pub(crate) fn record_repair(&mut self, source: String) {
        self.function_source = source;
        self.last_error = None;
        self.last_failure = None;
        self.retry_count += 1;
    }
}
