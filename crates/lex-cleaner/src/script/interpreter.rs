//! Tree-walking evaluator for parsed cleaning scripts.

use super::ast::{Expr, Program, Routine, StatementKind};
use super::ops::{self, Args};
use super::parse::MAX_NESTING;
use super::value::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Deepest allowed chain of routine calls.
pub const MAX_CALL_DEPTH: usize = 32;

/// A failure raised while a routine runs.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("line {line}: {message}")]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Evaluates routines of one program.
///
/// Holds no variables itself; every invocation builds its own scope from
/// the call arguments.
pub struct Interpreter<'p> {
    program: &'p Program,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// Invoke the routine `name` with `args`.
    pub fn call(&self, name: &str, args: Vec<Value>, line: usize) -> Result<Value, RuntimeError> {
        self.call_at_depth(name, args, line, 0, 0)
    }

    fn call_at_depth(
        &self,
        name: &str,
        args: Vec<Value>,
        line: usize,
        depth: usize,
        nesting: usize,
    ) -> Result<Value, RuntimeError> {
        if let Some(routine) = self.program.routine(name) {
            return self.invoke(routine, args, line, depth, nesting);
        }

        match ops::lookup(name) {
            Some(op) => op(&Args {
                op: name,
                values: &args,
            })
            .map_err(|e| RuntimeError::new(line, e.0)),
            None => Err(RuntimeError::new(
                line,
                format!("unknown function '{}'", name),
            )),
        }
    }

    fn invoke(
        &self,
        routine: &Routine,
        args: Vec<Value>,
        line: usize,
        depth: usize,
        nesting: usize,
    ) -> Result<Value, RuntimeError> {
        if depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::new(
                line,
                format!(
                    "call depth limit of {} exceeded in '{}'",
                    MAX_CALL_DEPTH, routine.name
                ),
            ));
        }
        if args.len() != routine.params.len() {
            return Err(RuntimeError::new(
                line,
                format!(
                    "'{}' takes {} argument(s), got {}",
                    routine.name,
                    routine.params.len(),
                    args.len()
                ),
            ));
        }

        let mut scope: HashMap<String, Value> = routine.params.iter().cloned().zip(args).collect();

        for statement in &routine.body {
            match &statement.kind {
                StatementKind::Assign { name, value } => {
                    let value = self.eval(value, &scope, statement.line, depth, nesting)?;
                    scope.insert(name.clone(), value);
                }
                StatementKind::Return(expr) => {
                    return self.eval(expr, &scope, statement.line, depth, nesting);
                }
                StatementKind::Expr(expr) => {
                    self.eval(expr, &scope, statement.line, depth, nesting)?;
                }
            }
        }

        Ok(Value::Nothing)
    }

    // `nesting` counts enclosing lists and call arguments, including those
    // of the callers, so the evaluator's own stack use stays bounded.
    fn eval(
        &self,
        expr: &Expr,
        scope: &HashMap<String, Value>,
        line: usize,
        depth: usize,
        nesting: usize,
    ) -> Result<Value, RuntimeError> {
        let inner = match expr {
            Expr::List(_) | Expr::Call { .. } if nesting >= MAX_NESTING => {
                return Err(RuntimeError::new(
                    line,
                    format!("expression nesting limit of {} exceeded", MAX_NESTING),
                ));
            }
            _ => nesting + 1,
        };

        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item, scope, line, depth, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Var(name) => scope
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::new(line, format!("undefined variable '{}'", name))),
            Expr::Call { name, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg, scope, line, depth, inner))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_at_depth(name, values, line, depth + 1, inner)
            }
        }
    }
}
