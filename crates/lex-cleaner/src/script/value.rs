//! Runtime values of the cleaning-script interpreter.

use polars::prelude::DataFrame;

/// A value bound to a variable or passed to an operation.
///
/// Frames are cheap to clone: Polars shares column buffers and every
/// operation returns a new frame.
#[derive(Debug, Clone)]
pub enum Value {
    Frame(DataFrame),
    Number(f64),
    Str(String),
    List(Vec<Value>),
    /// Result of a routine that finished without `return`.
    Nothing,
}

impl Value {
    /// Name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Frame(_) => "dataset",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Nothing => "nothing",
        }
    }

    pub fn into_frame(self) -> Option<DataFrame> {
        match self {
            Value::Frame(df) => Some(df),
            _ => None,
        }
    }
}

/// Render a number without a trailing `.0` when it is integral.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Number(1.0).type_name(), "number");
        assert_eq!(Value::Str("x".into()).type_name(), "string");
        assert_eq!(Value::List(vec![]).type_name(), "list");
        assert_eq!(Value::Nothing.type_name(), "nothing");
        assert_eq!(Value::Frame(DataFrame::empty()).type_name(), "dataset");
    }

    #[test]
    fn test_into_frame() {
        assert!(Value::Frame(DataFrame::empty()).into_frame().is_some());
        assert!(Value::Number(3.0).into_frame().is_none());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(0.25), "0.25");
    }
}
