//! The cleaning-script language.
//!
//! Generated routines are written in a small, side-effect free language
//! whose only capabilities are the dataset operations in [`ops`]. Source is
//! parsed into a [`Program`] and evaluated by an [`Interpreter`]; there is no
//! file, network or process access from inside a script.
//!
//! ```text
//! fn data_cleaner(df) {
//!     df = drop_missing_columns(df, 0.4)
//!     df = impute_mean(df)
//!     return df
//! }
//! ```

mod ast;
mod interpreter;
mod lexer;
mod ops;
mod parse;
mod value;

pub use ast::{Expr, Program, Routine, Statement, StatementKind};
pub use interpreter::{Interpreter, MAX_CALL_DEPTH, RuntimeError};
pub use ops::{BUILTINS, OpError};
pub use parse::{MAX_NESTING, parse_program};
pub use value::Value;

use thiserror::Error;

/// A syntax error with the line it was found on.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("line {line}: {message}")]
pub struct CompileError {
    pub line: usize,
    pub message: String,
}

impl CompileError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Language reference embedded in generation and repair prompts.
pub const REFERENCE: &str = r#"Cleaning script language:
- A program is one or more routines: fn name(param) { statements }
- One statement per line: `name = expr`, `return expr`, or a bare call.
- Expressions: numbers (0.4), strings ("text"), lists (["a", "b"]), variables, calls name(args).
- Comments start with '#'.
- Each routine has its own variables; there are no globals.
- Every operation returns a new dataset. Reassign the result: df = impute_mean(df)
- The routine must end with `return df`.

Operations ([...] marks optional arguments, cols is a list of column names):
  drop_columns(df, cols)                 remove the named columns
  select_columns(df, cols)               keep only the named columns
  rename_column(df, old, new)            rename one column
  drop_missing_columns(df, threshold)    remove columns whose missing fraction > threshold (0-1)
  drop_missing_rows(df[, threshold])     remove rows with any missing value, or missing fraction > threshold
  impute_mean(df[, cols])                fill missing numeric values with the column mean
  impute_median(df[, cols])              fill missing numeric values with the column median
  impute_mode(df[, cols])                fill missing text values with the most frequent value
  fill_missing(df, col, value)           fill missing values of one column with a constant
  drop_duplicates(df)                    remove repeated rows, keeping the first
  clip_outliers(df, lower_q, upper_q[, cols])  clamp numeric columns to the given quantiles
  remove_outliers(df[, multiplier])      remove rows outside Q1/Q3 -/+ multiplier * IQR (default 1.5)
  normalize_strings(df[, cols])          trim, collapse spaces and lowercase text columns
  cast_column(df, col, type)             convert a column; type is "int", "float", "str" or "bool"
  filter_rows(df, col, op, value)        keep rows where col op value holds; op is ==, !=, <, <=, >, >=
  fail(message)                          stop with an error

Without cols, imputation, clipping and normalization apply to every column of the matching type."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_lists_every_builtin() {
        for name in BUILTINS {
            assert!(
                REFERENCE.contains(&format!("{}(", name)),
                "{name} missing from reference"
            );
        }
    }

    #[test]
    fn test_reference_example_parses() {
        let source = "fn data_cleaner(df) {\n    df = drop_missing_columns(df, 0.4)\n    return df\n}";
        assert!(parse_program(source).is_ok());
    }
}
