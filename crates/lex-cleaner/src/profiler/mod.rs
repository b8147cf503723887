//! Dataset profiling for prompt construction.
//!
//! [`DataProfiler::summarize`] reads a frame and reports, per column:
//! - the data type
//! - the missing-value percentage (sorted, highest first)
//! - outlier fences for numeric columns
//! - a handful of distinct sample values for text columns
//!
//! The frame is only read. Calling the profiler twice on the same frame
//! yields the same summary.

mod statistics;

use crate::error::Result;
use crate::utils::{DtypeCategory, distinct_samples, get_dtype_category};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use statistics::{missing_percentage, outlier_bounds};

/// Maximum number of sample values reported per text column.
pub const MAX_SAMPLE_VALUES: usize = 10;

/// Data type of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnType {
    pub column: String,
    pub dtype: String,
}

/// Missing-value share of one column, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingStat {
    pub column: String,
    pub percentage: f64,
}

/// Outlier fences of one numeric column.
///
/// `bounds` is `None` when the column holds no numeric values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierStat {
    pub column: String,
    pub bounds: Option<(f64, f64)>,
}

/// Distinct sample values of one text column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleStat {
    pub column: String,
    pub values: Vec<String>,
}

/// Structured dataset summary; `Display` renders the prompt text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: usize,
    pub column_types: Vec<ColumnType>,
    pub missing: Vec<MissingStat>,
    pub outliers: Vec<OutlierStat>,
    pub samples: Vec<SampleStat>,
}

/// Data profiler producing [`DatasetSummary`] values.
pub struct DataProfiler;

impl DataProfiler {
    /// Summarize a dataset without modifying it.
    pub fn summarize(df: &DataFrame) -> Result<DatasetSummary> {
        let rows = df.height();
        let mut column_types = Vec::with_capacity(df.width());
        let mut missing = Vec::with_capacity(df.width());
        let mut outliers = Vec::new();
        let mut samples = Vec::new();

        for col in df.get_columns() {
            let series = col.as_materialized_series();
            let name = series.name().to_string();

            column_types.push(ColumnType {
                column: name.clone(),
                dtype: format!("{:?}", series.dtype()),
            });
            missing.push(MissingStat {
                column: name.clone(),
                percentage: missing_percentage(series, rows),
            });

            match get_dtype_category(series.dtype()) {
                DtypeCategory::Numeric => outliers.push(OutlierStat {
                    column: name,
                    bounds: outlier_bounds(series)?,
                }),
                DtypeCategory::String => samples.push(SampleStat {
                    column: name,
                    values: distinct_samples(series, MAX_SAMPLE_VALUES)?,
                }),
                _ => {}
            }
        }

        // Stable sort: equal percentages keep column order.
        missing.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));

        debug!(
            rows,
            columns = df.width(),
            numeric = outliers.len(),
            text = samples.len(),
            "Profiled dataset"
        );

        Ok(DatasetSummary {
            rows,
            columns: df.width(),
            column_types,
            missing,
            outliers,
            samples,
        })
    }

    /// Summarize a dataset and render the summary as prompt text.
    pub fn summary_text(df: &DataFrame) -> Result<String> {
        Ok(Self::summarize(df)?.to_string())
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset Summary:")?;
        writeln!(f, "----------------")?;
        writeln!(f, "Shape: {} rows x {} columns", self.rows, self.columns)?;

        writeln!(f, "\nColumn Data Types:")?;
        for ct in &self.column_types {
            writeln!(f, "  {}: {}", ct.column, ct.dtype)?;
        }

        writeln!(f, "\nMissing Value Percentage:")?;
        for m in &self.missing {
            writeln!(f, "  {}: {:.2}%", m.column, m.percentage)?;
        }

        writeln!(f, "\nOutlier Stats (numerical cols):")?;
        if self.outliers.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for o in &self.outliers {
            match o.bounds {
                Some((lower, upper)) => writeln!(
                    f,
                    "  {}: Lower Bound: {:.2}, Upper Bound: {:.2}",
                    o.column, lower, upper
                )?,
                None => writeln!(f, "  {}: no numeric values", o.column)?,
            }
        }

        writeln!(f, "\nSample Values (text cols):")?;
        if self.samples.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for s in &self.samples {
            writeln!(f, "  {}: {}", s.column, s.values.join(", "))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_frame() -> DataFrame {
        df![
            "id" => [1i64, 2, 3, 4],
            "age" => [Some(30i64), None, None, Some(40)],
            "city" => [Some("Paris"), Some("Rome"), None, Some("Paris")],
            "score" => [Some(1.5f64), None, Some(2.5), Some(3.5)],
        ]
        .unwrap()
    }

    #[test]
    fn test_summarize_column_types_in_frame_order() {
        let summary = DataProfiler::summarize(&sample_frame()).unwrap();
        let names: Vec<&str> = summary
            .column_types
            .iter()
            .map(|c| c.column.as_str())
            .collect();
        assert_eq!(names, vec!["id", "age", "city", "score"]);
        assert_eq!(summary.column_types[0].dtype, "Int64");
        assert_eq!(summary.column_types[2].dtype, "String");
    }

    #[test]
    fn test_missing_sorted_descending_with_stable_ties() {
        let summary = DataProfiler::summarize(&sample_frame()).unwrap();
        let order: Vec<(&str, f64)> = summary
            .missing
            .iter()
            .map(|m| (m.column.as_str(), m.percentage))
            .collect();
        assert_eq!(
            order,
            vec![("age", 50.0), ("city", 25.0), ("score", 25.0), ("id", 0.0)]
        );
    }

    #[test]
    fn test_outliers_only_for_numeric_columns() {
        let summary = DataProfiler::summarize(&sample_frame()).unwrap();
        let cols: Vec<&str> = summary.outliers.iter().map(|o| o.column.as_str()).collect();
        assert_eq!(cols, vec!["id", "age", "score"]);
        assert!(summary.outliers.iter().all(|o| o.bounds.is_some()));
    }

    #[test]
    fn test_samples_only_for_text_columns() {
        let summary = DataProfiler::summarize(&sample_frame()).unwrap();
        assert_eq!(summary.samples.len(), 1);
        assert_eq!(summary.samples[0].column, "city");
        assert_eq!(summary.samples[0].values, vec!["Paris", "Rome"]);
    }

    #[test]
    fn test_samples_capped_at_ten() {
        let values: Vec<String> = (0..25).map(|i| format!("v{i}")).collect();
        let df = df!["label" => values].unwrap();
        let summary = DataProfiler::summarize(&df).unwrap();
        assert_eq!(summary.samples[0].values.len(), MAX_SAMPLE_VALUES);
        assert_eq!(summary.samples[0].values[9], "v9");
    }

    #[test]
    fn test_all_null_numeric_column() {
        let df = df!["x" => [Option::<f64>::None, None]].unwrap();
        let summary = DataProfiler::summarize(&df).unwrap();
        assert_eq!(summary.outliers[0].bounds, None);
        assert!(summary.to_string().contains("x: no numeric values"));
    }

    #[test]
    fn test_zero_row_frame_reports_zero_missing() {
        let df = df!["a" => Vec::<i64>::new(), "b" => Vec::<String>::new()].unwrap();
        let summary = DataProfiler::summarize(&df).unwrap();
        assert!(summary.missing.iter().all(|m| m.percentage == 0.0));
        assert!(summary.to_string().contains("a: 0.00%"));
    }

    #[test]
    fn test_summary_text_layout() {
        let df = df![
            "n" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
            "s" => ["a", "b", "a", "c", "b"],
        ]
        .unwrap();
        let text = DataProfiler::summary_text(&df).unwrap();

        let expected = "Dataset Summary:\n\
            ----------------\n\
            Shape: 5 rows x 2 columns\n\
            \n\
            Column Data Types:\n  n: Float64\n  s: String\n\
            \n\
            Missing Value Percentage:\n  n: 0.00%\n  s: 0.00%\n\
            \n\
            Outlier Stats (numerical cols):\n  n: Lower Bound: -4.20, Upper Bound: 10.20\n\
            \n\
            Sample Values (text cols):\n  s: a, b, c\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_profiler_is_deterministic_and_non_mutating() {
        let df = sample_frame();
        let before = df.clone();

        let first = DataProfiler::summary_text(&df).unwrap();
        let second = DataProfiler::summary_text(&df).unwrap();

        assert_eq!(first, second);
        assert!(df.equals_missing(&before));
    }
}
