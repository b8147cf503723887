//! Syntax tree of a cleaning script.

/// A parsed program: the routines it defines, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub routines: Vec<Routine>,
}

impl Program {
    /// Look up a routine by name.
    pub fn routine(&self, name: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.name == name)
    }

    /// Names of all defined routines, in source order.
    pub fn routine_names(&self) -> Vec<String> {
        self.routines.iter().map(|r| r.name.clone()).collect()
    }
}

/// `fn name(params) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
    pub line: usize,
}

/// One statement with the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `name = expr`
    Assign { name: String, value: Expr },
    /// `return expr`
    Return(Expr),
    /// A bare expression, evaluated for its effect (e.g. `fail("...")`).
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    List(Vec<Expr>),
    Var(String),
    Call { name: String, args: Vec<Expr> },
}
