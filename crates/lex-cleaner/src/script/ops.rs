//! Built-in operations available to cleaning scripts.
//!
//! Every operation takes its arguments by reference and returns a new
//! value; frames passed in are never modified.

use super::value::{Value, format_number};
use crate::utils::{
    DtypeCategory, columns_of_category, drop_duplicate_rows, fill_numeric_nulls,
    fill_string_nulls, get_dtype_category, numeric_values, quantile_sorted, sorted_values,
    string_mode,
};
use polars::prelude::*;
use std::fmt;
use thiserror::Error;

/// Failure raised by an operation. The interpreter adds the line number.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct OpError(pub String);

impl From<PolarsError> for OpError {
    fn from(err: PolarsError) -> Self {
        OpError(err.to_string())
    }
}

pub(crate) type OpResult = Result<Value, OpError>;

pub(crate) type Builtin = fn(&Args<'_>) -> OpResult;

/// Names of all built-in operations.
pub const BUILTINS: &[&str] = &[
    "drop_columns",
    "select_columns",
    "rename_column",
    "drop_missing_columns",
    "drop_missing_rows",
    "impute_mean",
    "impute_median",
    "impute_mode",
    "fill_missing",
    "drop_duplicates",
    "clip_outliers",
    "remove_outliers",
    "normalize_strings",
    "cast_column",
    "filter_rows",
    "fail",
];

/// Resolve a built-in by name.
pub(crate) fn lookup(name: &str) -> Option<Builtin> {
    let op: Builtin = match name {
        "drop_columns" => drop_columns,
        "select_columns" => select_columns,
        "rename_column" => rename_column,
        "drop_missing_columns" => drop_missing_columns,
        "drop_missing_rows" => drop_missing_rows,
        "impute_mean" => impute_mean,
        "impute_median" => impute_median,
        "impute_mode" => impute_mode,
        "fill_missing" => fill_missing,
        "drop_duplicates" => drop_duplicates,
        "clip_outliers" => clip_outliers,
        "remove_outliers" => remove_outliers,
        "normalize_strings" => normalize_strings,
        "cast_column" => cast_column,
        "filter_rows" => filter_rows,
        "fail" => fail,
        _ => return None,
    };
    Some(op)
}

// =============================================================================
// Argument access
// =============================================================================

/// Evaluated arguments of one call.
pub(crate) struct Args<'a> {
    pub op: &'a str,
    pub values: &'a [Value],
}

impl<'a> Args<'a> {
    fn error(&self, message: impl fmt::Display) -> OpError {
        OpError(format!("{}: {}", self.op, message))
    }

    fn arity(&self, min: usize, max: usize) -> Result<(), OpError> {
        let n = self.values.len();
        if n < min || n > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            };
            return Err(self.error(format!("expected {} argument(s), got {}", expected, n)));
        }
        Ok(())
    }

    fn get(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }

    fn mismatch(&self, index: usize, expected: &str) -> OpError {
        let found = self.get(index).map_or("nothing", Value::type_name);
        self.error(format!(
            "argument {} must be a {}, got {}",
            index + 1,
            expected,
            found
        ))
    }

    fn frame(&self, index: usize) -> Result<&'a DataFrame, OpError> {
        match self.get(index) {
            Some(Value::Frame(df)) => Ok(df),
            _ => Err(self.mismatch(index, "dataset")),
        }
    }

    fn number(&self, index: usize) -> Result<f64, OpError> {
        match self.get(index) {
            Some(Value::Number(n)) => Ok(*n),
            _ => Err(self.mismatch(index, "number")),
        }
    }

    fn string(&self, index: usize) -> Result<&'a str, OpError> {
        match self.get(index) {
            Some(Value::Str(s)) => Ok(s),
            _ => Err(self.mismatch(index, "string")),
        }
    }

    /// A list of column names; a single string counts as a one-item list.
    fn string_list(&self, index: usize) -> Result<Vec<String>, OpError> {
        match self.get(index) {
            Some(Value::Str(s)) => Ok(vec![s.clone()]),
            Some(Value::List(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Str(s) => Ok(s.clone()),
                    _ => Err(self.mismatch(index, "list of strings")),
                })
                .collect(),
            _ => Err(self.mismatch(index, "list of strings")),
        }
    }

    fn fraction(&self, index: usize) -> Result<f64, OpError> {
        let value = self.number(index)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(self.error(format!(
                "argument {} must be between 0 and 1, got {}",
                index + 1,
                value
            )));
        }
        Ok(value)
    }

    fn column<'d>(&self, df: &'d DataFrame, name: &str) -> Result<&'d Series, OpError> {
        df.column(name)
            .map(|col| col.as_materialized_series())
            .map_err(|_| {
                let available: Vec<String> = df
                    .get_column_names()
                    .into_iter()
                    .map(|s| s.to_string())
                    .collect();
                self.error(format!(
                    "column '{}' not found (columns: {})",
                    name,
                    available.join(", ")
                ))
            })
    }

    /// Explicit columns from argument `index`, checked against `category`, or
    /// every column of that category when the argument is absent.
    fn target_columns(
        &self,
        df: &DataFrame,
        index: usize,
        category: DtypeCategory,
        kind: &str,
    ) -> Result<Vec<String>, OpError> {
        if self.get(index).is_none() {
            return Ok(columns_of_category(df, category));
        }
        let names = self.string_list(index)?;
        for name in &names {
            let series = self.column(df, name)?;
            if get_dtype_category(series.dtype()) != category {
                return Err(self.error(format!(
                    "column '{}' is not {} ({:?})",
                    name,
                    kind,
                    series.dtype()
                )));
            }
        }
        Ok(names)
    }
}

fn finite_sorted(series: &Series) -> PolarsResult<Vec<f64>> {
    Ok(sorted_values(
        numeric_values(series)?
            .into_iter()
            .filter(|v| v.is_finite())
            .collect(),
    ))
}

// =============================================================================
// Column operations
// =============================================================================

fn drop_columns(args: &Args<'_>) -> OpResult {
    args.arity(2, 2)?;
    let df = args.frame(0)?;
    let names = args.string_list(1)?;
    for name in &names {
        args.column(df, name)?;
    }
    let names: Vec<PlSmallStr> = names.iter().map(|s| s.as_str().into()).collect();
    Ok(Value::Frame(df.drop_many(names)))
}

fn select_columns(args: &Args<'_>) -> OpResult {
    args.arity(2, 2)?;
    let df = args.frame(0)?;
    let names = args.string_list(1)?;
    for name in &names {
        args.column(df, name)?;
    }
    Ok(Value::Frame(df.select(names.iter().map(|s| s.as_str()))?))
}

fn rename_column(args: &Args<'_>) -> OpResult {
    args.arity(3, 3)?;
    let df = args.frame(0)?;
    let old = args.string(1)?;
    let new = args.string(2)?;
    args.column(df, old)?;
    if old != new && df.column(new).is_ok() {
        return Err(args.error(format!("column '{}' already exists", new)));
    }
    let mut out = df.clone();
    out.rename(old, new.into())?;
    Ok(Value::Frame(out))
}

fn cast_column(args: &Args<'_>) -> OpResult {
    args.arity(3, 3)?;
    let df = args.frame(0)?;
    let name = args.string(1)?;
    let target = args.string(2)?;
    let series = args.column(df, name)?;

    let cast = match target {
        "int" => series.strict_cast(&DataType::Int64),
        "float" => series.strict_cast(&DataType::Float64),
        "str" => series.cast(&DataType::String),
        "bool" if series.dtype() == &DataType::String => {
            return cast_text_to_bool(args, df, series);
        }
        "bool" => series.strict_cast(&DataType::Boolean),
        other => {
            return Err(args.error(format!(
                "unknown type '{}' (expected int, float, str or bool)",
                other
            )));
        }
    }
    .map_err(|e| args.error(format!("cannot convert column '{}' to {}: {}", name, target, e)))?;

    let mut out = df.clone();
    out.replace(name, cast)?;
    Ok(Value::Frame(out))
}

fn cast_text_to_bool(args: &Args<'_>, df: &DataFrame, series: &Series) -> OpResult {
    let mut values: Vec<Option<bool>> = Vec::with_capacity(series.len());
    for opt in series.str()?.into_iter() {
        let parsed = match opt.map(|s| s.trim().to_lowercase()) {
            None => None,
            Some(s) => match s.as_str() {
                "true" | "1" | "yes" | "y" => Some(true),
                "false" | "0" | "no" | "n" => Some(false),
                _ => {
                    return Err(args.error(format!(
                        "cannot convert '{}' in column '{}' to bool",
                        s,
                        series.name()
                    )));
                }
            },
        };
        values.push(parsed);
    }
    let mut out = df.clone();
    out.replace(series.name().as_str(), Series::new(series.name().clone(), values))?;
    Ok(Value::Frame(out))
}

// =============================================================================
// Missing values
// =============================================================================

fn drop_missing_columns(args: &Args<'_>) -> OpResult {
    args.arity(2, 2)?;
    let df = args.frame(0)?;
    let threshold = args.fraction(1)?;
    let rows = df.height();
    if rows == 0 {
        return Ok(Value::Frame(df.clone()));
    }

    let to_drop: Vec<PlSmallStr> = df
        .get_columns()
        .iter()
        .filter(|col| col.null_count() as f64 / rows as f64 > threshold)
        .map(|col| col.name().clone())
        .collect();
    Ok(Value::Frame(df.drop_many(to_drop)))
}

fn drop_missing_rows(args: &Args<'_>) -> OpResult {
    args.arity(1, 2)?;
    let df = args.frame(0)?;
    let threshold = match args.get(1) {
        Some(_) => Some(args.fraction(1)?),
        None => None,
    };
    let width = df.width();
    if width == 0 {
        return Ok(Value::Frame(df.clone()));
    }

    let mut null_counts = vec![0usize; df.height()];
    for col in df.get_columns() {
        let mask = col.as_materialized_series().is_null();
        for (row, is_null) in mask.into_iter().enumerate() {
            if is_null == Some(true) {
                null_counts[row] += 1;
            }
        }
    }

    let keep: Vec<bool> = null_counts
        .iter()
        .map(|&nulls| match threshold {
            Some(t) => nulls as f64 / width as f64 <= t,
            None => nulls == 0,
        })
        .collect();
    let mask = BooleanChunked::from_slice("mask".into(), &keep);
    Ok(Value::Frame(df.filter(&mask)?))
}

fn impute_mean(args: &Args<'_>) -> OpResult {
    impute_numeric(args, |s| s.mean())
}

fn impute_median(args: &Args<'_>) -> OpResult {
    impute_numeric(args, |s| s.median())
}

fn impute_numeric(args: &Args<'_>, statistic: fn(&Series) -> Option<f64>) -> OpResult {
    args.arity(1, 2)?;
    let df = args.frame(0)?;
    let targets = args.target_columns(df, 1, DtypeCategory::Numeric, "numeric")?;

    let mut out = df.clone();
    for name in targets {
        let series = args.column(df, &name)?;
        if series.null_count() == 0 {
            continue;
        }
        if let Some(value) = statistic(series) {
            out.replace(&name, fill_numeric_nulls(series, value)?)?;
        }
    }
    Ok(Value::Frame(out))
}

fn impute_mode(args: &Args<'_>) -> OpResult {
    args.arity(1, 2)?;
    let df = args.frame(0)?;
    let targets = args.target_columns(df, 1, DtypeCategory::String, "text")?;

    let mut out = df.clone();
    for name in targets {
        let series = args.column(df, &name)?;
        if series.null_count() == 0 {
            continue;
        }
        if let Some(mode) = string_mode(series) {
            out.replace(&name, fill_string_nulls(series, &mode)?)?;
        }
    }
    Ok(Value::Frame(out))
}

fn fill_missing(args: &Args<'_>) -> OpResult {
    args.arity(3, 3)?;
    let df = args.frame(0)?;
    let name = args.string(1)?;
    let series = args.column(df, name)?;
    let category = get_dtype_category(series.dtype());

    let filled = match (args.get(2), category) {
        (Some(Value::Number(n)), DtypeCategory::Numeric) => fill_numeric_nulls(series, *n)?,
        (Some(Value::Str(s)), DtypeCategory::String) => fill_string_nulls(series, s)?,
        (Some(Value::Number(n)), DtypeCategory::String) => {
            fill_string_nulls(series, &format_number(*n))?
        }
        (value, _) => {
            return Err(args.error(format!(
                "cannot fill {:?} column '{}' with a {}",
                series.dtype(),
                name,
                value.map_or("nothing", Value::type_name)
            )));
        }
    };

    let mut out = df.clone();
    out.replace(name, filled)?;
    Ok(Value::Frame(out))
}

// =============================================================================
// Rows
// =============================================================================

fn drop_duplicates(args: &Args<'_>) -> OpResult {
    args.arity(1, 1)?;
    let df = args.frame(0)?;
    Ok(Value::Frame(drop_duplicate_rows(df)?))
}

#[derive(Debug, Clone, Copy)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "==" => Comparison::Eq,
            "!=" => Comparison::Ne,
            "<" => Comparison::Lt,
            "<=" => Comparison::Le,
            ">" => Comparison::Gt,
            ">=" => Comparison::Ge,
            _ => return None,
        })
    }

    fn holds<T: PartialOrd + ?Sized>(self, left: &T, right: &T) -> bool {
        match self {
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
        }
    }
}

fn filter_rows(args: &Args<'_>) -> OpResult {
    args.arity(4, 4)?;
    let df = args.frame(0)?;
    let name = args.string(1)?;
    let op = args.string(2)?;
    let series = args.column(df, name)?;
    let comparison = Comparison::parse(op).ok_or_else(|| {
        args.error(format!(
            "unknown comparison '{}' (expected ==, !=, <, <=, > or >=)",
            op
        ))
    })?;
    let category = get_dtype_category(series.dtype());

    let keep: Vec<bool> = match (args.get(3), category) {
        (Some(Value::Number(target)), DtypeCategory::Numeric) => {
            let cast = series.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.is_some_and(|v| comparison.holds(&v, target)))
                .collect()
        }
        (Some(Value::Str(target)), DtypeCategory::String) => series
            .str()?
            .into_iter()
            .map(|v| v.is_some_and(|v| comparison.holds(v, target.as_str())))
            .collect(),
        (value, _) => {
            return Err(args.error(format!(
                "cannot compare {:?} column '{}' with a {}",
                series.dtype(),
                name,
                value.map_or("nothing", Value::type_name)
            )));
        }
    };

    let mask = BooleanChunked::from_slice("mask".into(), &keep);
    Ok(Value::Frame(df.filter(&mask)?))
}

// =============================================================================
// Outliers
// =============================================================================

fn clip_outliers(args: &Args<'_>) -> OpResult {
    args.arity(3, 4)?;
    let df = args.frame(0)?;
    let lower_q = args.fraction(1)?;
    let upper_q = args.fraction(2)?;
    if lower_q > upper_q {
        return Err(args.error(format!(
            "lower quantile {} is above upper quantile {}",
            lower_q, upper_q
        )));
    }
    let targets = args.target_columns(df, 3, DtypeCategory::Numeric, "numeric")?;

    let mut out = df.clone();
    for name in targets {
        let series = args.column(df, &name)?;
        let sorted = finite_sorted(series)?;
        let (Some(low), Some(high)) = (
            quantile_sorted(&sorted, lower_q),
            quantile_sorted(&sorted, upper_q),
        ) else {
            continue;
        };

        let cast = series.cast(&DataType::Float64)?;
        let clipped = cast.f64()?.apply(|v| v.map(|x| x.clamp(low, high)));
        out.replace(&name, clipped.into_series())?;
    }
    Ok(Value::Frame(out))
}

fn remove_outliers(args: &Args<'_>) -> OpResult {
    args.arity(1, 2)?;
    let df = args.frame(0)?;
    let multiplier = match args.get(1) {
        Some(_) => args.number(1)?,
        None => 1.5,
    };
    if multiplier < 0.0 {
        return Err(args.error("multiplier must not be negative"));
    }

    let mut keep = vec![true; df.height()];
    for name in columns_of_category(df, DtypeCategory::Numeric) {
        let series = args.column(df, &name)?;
        let sorted = finite_sorted(series)?;
        let (Some(q1), Some(q3)) = (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75))
        else {
            continue;
        };
        let iqr = q3 - q1;
        let (lower, upper) = (q1 - multiplier * iqr, q3 + multiplier * iqr);

        let cast = series.cast(&DataType::Float64)?;
        for (row, value) in cast.f64()?.into_iter().enumerate() {
            // nulls are kept
            if let Some(v) = value
                && (v < lower || v > upper)
            {
                keep[row] = false;
            }
        }
    }

    let mask = BooleanChunked::from_slice("mask".into(), &keep);
    Ok(Value::Frame(df.filter(&mask)?))
}

// =============================================================================
// Text
// =============================================================================

fn normalize_strings(args: &Args<'_>) -> OpResult {
    args.arity(1, 2)?;
    let df = args.frame(0)?;
    let targets = args.target_columns(df, 1, DtypeCategory::String, "text")?;

    let mut out = df.clone();
    for name in targets {
        let series = args.column(df, &name)?;
        let normalized: Vec<Option<String>> = series
            .str()?
            .into_iter()
            .map(|v| {
                v.map(|s| {
                    s.split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                        .to_lowercase()
                })
            })
            .collect();
        out.replace(&name, Series::new(series.name().clone(), normalized))?;
    }
    Ok(Value::Frame(out))
}

fn fail(args: &Args<'_>) -> OpResult {
    args.arity(1, 1)?;
    let message = match args.get(0) {
        Some(Value::Str(s)) => s.clone(),
        Some(Value::Number(n)) => format_number(*n),
        Some(other) => other.type_name().to_string(),
        None => String::new(),
    };
    Err(OpError(message))
}

// =============================================================================
// Tests
// =============================================================================
