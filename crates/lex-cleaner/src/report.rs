//! Run reports for the CLI and callers that want a serializable summary.

use crate::error::Result;
use crate::utils::{duplicate_row_count, total_nulls};
use crate::workflow::{WorkflowStage, WorkflowState};
use chrono::{DateTime, Local};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Shape and quality counters of one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetrics {
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
    pub duplicate_rows: usize,
}

impl DatasetMetrics {
    pub fn compute(df: &DataFrame) -> Result<Self> {
        Ok(Self {
            rows: df.height(),
            columns: df.width(),
            missing_cells: total_nulls(df),
            duplicate_rows: duplicate_row_count(df)?,
        })
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    pub stage: WorkflowStage,
    pub success: bool,
    pub retry_count: usize,
    pub max_retries: usize,
    pub function_name: String,
    pub function_source: String,
    pub source_path: Option<String>,
    pub last_error: Option<String>,
    pub before: DatasetMetrics,
    /// Absent unless the run succeeded.
    pub after: Option<DatasetMetrics>,
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: i64,
}

impl CleaningReport {
    pub fn from_state(
        state: &WorkflowState,
        started_at: DateTime<Local>,
        finished_at: DateTime<Local>,
    ) -> Result<Self> {
        let after = match state.cleaned_dataset() {
            Some(df) if state.stage() == WorkflowStage::Success => {
                Some(DatasetMetrics::compute(df)?)
            }
            _ => None,
        };

        Ok(Self {
            stage: state.stage(),
            success: state.is_success(),
            retry_count: state.retry_count(),
            max_retries: state.max_retries(),
            function_name: state.function_name().to_string(),
            function_source: state.function_source().to_string(),
            source_path: state.source_path().map(|p| p.display().to_string()),
            last_error: state.last_error().map(str::to_string),
            before: DatasetMetrics::compute(state.raw_dataset())?,
            after,
            started_at: started_at.to_rfc3339(),
            finished_at: finished_at.to_rfc3339(),
            duration_ms: (finished_at - started_at).num_milliseconds(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
