//! Column statistics used by the dataset summary.

use crate::utils::{numeric_values, quantile_sorted, sorted_values};
use polars::prelude::*;

/// Lower quantile used for the outlier fences.
const LOWER_QUANTILE: f64 = 0.05;

/// Upper quantile used for the outlier fences.
const UPPER_QUANTILE: f64 = 0.95;

/// Fence width in multiples of the inter-quantile range.
const FENCE_MULTIPLIER: f64 = 1.5;

/// Percentage of null cells in a series; 0 for an empty frame.
pub(crate) fn missing_percentage(series: &Series, rows: usize) -> f64 {
    if rows == 0 {
        return 0.0;
    }
    series.null_count() as f64 / rows as f64 * 100.0
}

/// Outlier fences `Q05 - 1.5*IQR` and `Q95 + 1.5*IQR` with `IQR = Q95 - Q05`.
///
/// Returns `None` when the column has no finite values.
pub(crate) fn outlier_bounds(series: &Series) -> PolarsResult<Option<(f64, f64)>> {
    let values: Vec<f64> = numeric_values(series)?
        .into_iter()
        .filter(|v| v.is_finite())
        .collect();
    let sorted = sorted_values(values);

    let (Some(low), Some(high)) = (
        quantile_sorted(&sorted, LOWER_QUANTILE),
        quantile_sorted(&sorted, UPPER_QUANTILE),
    ) else {
        return Ok(None);
    };

    let range = high - low;
    Ok(Some((
        low - FENCE_MULTIPLIER * range,
        high + FENCE_MULTIPLIER * range,
    )))
}
