//! Runs generated cleaning routines against a dataset.
//!
//! Every attempt materializes the source into a fresh [`CompiledScript`];
//! nothing survives from one attempt to the next. Any failure, panics
//! included, comes back as an [`ExecutionFailure`].

use crate::error::ExecutionFailure;
use crate::script::{Interpreter, Program, Value, parse_program};
use polars::prelude::DataFrame;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Something that can turn a dataset into a cleaned dataset.
pub trait Executable {
    fn run(&self, df: DataFrame) -> Result<DataFrame, ExecutionFailure>;
}

/// A parsed program bound to its entry point.
#[derive(Debug, Clone)]
pub struct CompiledScript {
    program: Program,
    entry: String,
}

impl CompiledScript {
    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn program(&self) -> &Program {
        &self.program
    }
}

impl Executable for CompiledScript {
    fn run(&self, df: DataFrame) -> Result<DataFrame, ExecutionFailure> {
        let line = self
            .program
            .routine(&self.entry)
            .map(|r| r.line)
            .unwrap_or_default();

        let interpreter = Interpreter::new(&self.program);
        let value = interpreter
            .call(&self.entry, vec![Value::Frame(df)], line)
            .map_err(|e| ExecutionFailure::Runtime {
                line: e.line,
                message: e.message,
            })?;

        match value {
            Value::Frame(out) => Ok(out),
            other => {
                debug!("Routine '{}' returned a {}", self.entry, other.type_name());
                Err(ExecutionFailure::NotTabular(self.entry.clone()))
            }
        }
    }
}

/// Materializes and runs generated source.
pub struct ScriptExecutor;

impl ScriptExecutor {
    /// Parse `source` and resolve `function_name` as a one-argument routine.
    pub fn materialize(source: &str, function_name: &str) -> Result<CompiledScript, ExecutionFailure> {
        let program = parse_program(source).map_err(|e| ExecutionFailure::Compile {
            line: e.line,
            message: e.message,
        })?;

        match program.routine(function_name) {
            Some(routine) if routine.params.len() == 1 => {}
            _ => {
                return Err(ExecutionFailure::EntryPointMissing {
                    name: function_name.to_string(),
                    available: program
                        .routines
                        .iter()
                        .map(|r| format!("{}/{}", r.name, r.params.len()))
                        .collect(),
                });
            }
        }

        Ok(CompiledScript {
            program,
            entry: function_name.to_string(),
        })
    }

    /// Materialize `source` and run it on a copy of `df`.
    ///
    /// Never panics and never touches `df`.
    pub fn execute(
        source: &str,
        function_name: &str,
        df: &DataFrame,
    ) -> Result<DataFrame, ExecutionFailure> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let script = Self::materialize(source, function_name)?;
            script.run(df.clone())
        }));

        outcome.unwrap_or_else(|payload| Err(ExecutionFailure::Panicked(panic_message(&*payload))))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
