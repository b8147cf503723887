//! Recursive-descent parser for cleaning scripts.

use super::CompileError;
use super::ast::{Expr, Program, Routine, Statement, StatementKind};
use super::lexer::{Token, TokenKind, tokenize};

/// Deepest allowed nesting of lists and call arguments in one expression.
pub const MAX_NESTING: usize = 64;

/// Parse a complete program.
///
/// Fails on the first syntax error. Defining the same routine twice is an
/// error.
pub fn parse_program(source: &str) -> Result<Program, CompileError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
    };
    parser.program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always ends with Eof, and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let token = self.peek();
        CompileError::new(
            token.line,
            format!("expected {}, found {}", expected, token.kind.describe()),
        )
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, CompileError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(String, usize), CompileError> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                let line = self.advance().line;
                Ok((name, line))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name == keyword)
    }

    fn program(&mut self) -> Result<Program, CompileError> {
        let mut routines: Vec<Routine> = Vec::new();
        self.skip_newlines();

        while self.peek().kind != TokenKind::Eof {
            if !self.at_keyword("fn") {
                return Err(self.unexpected("'fn'"));
            }
            let routine = self.routine()?;
            if routines.iter().any(|r| r.name == routine.name) {
                return Err(CompileError::new(
                    routine.line,
                    format!("routine '{}' is defined more than once", routine.name),
                ));
            }
            routines.push(routine);
            self.skip_newlines();
        }

        Ok(Program { routines })
    }

    fn routine(&mut self) -> Result<Routine, CompileError> {
        let line = self.advance().line; // fn
        let (name, _) = self.expect_ident("routine name")?;

        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            loop {
                let (param, _) = self.expect_ident("parameter name")?;
                params.push(param);
                if self.peek().kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        self.skip_newlines();
        self.expect(TokenKind::LBrace, "'{'")?;

        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek().kind {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => return Err(self.unexpected("'}'")),
                _ => body.push(self.statement()?),
            }
        }

        Ok(Routine {
            name,
            params,
            body,
            line,
        })
    }

    fn statement(&mut self) -> Result<Statement, CompileError> {
        let line = self.peek().line;

        if self.at_keyword("fn") {
            return Err(CompileError::new(
                line,
                "routines cannot be defined inside other routines",
            ));
        }

        let kind = if self.at_keyword("return") {
            self.advance();
            StatementKind::Return(self.expr()?)
        } else {
            if self.at_keyword("let") {
                self.advance();
            }
            let is_assignment = matches!(self.peek().kind, TokenKind::Ident(_))
                && self
                    .tokens
                    .get(self.pos + 1)
                    .is_some_and(|t| t.kind == TokenKind::Assign);
            if is_assignment {
                let (name, _) = self.expect_ident("variable name")?;
                self.advance(); // =
                StatementKind::Assign {
                    name,
                    value: self.expr()?,
                }
            } else {
                StatementKind::Expr(self.expr()?)
            }
        };

        match self.peek().kind {
            TokenKind::Newline => {
                self.advance();
            }
            TokenKind::RBrace => {}
            _ => return Err(self.unexpected("end of statement")),
        }

        Ok(Statement { kind, line })
    }

    fn expr(&mut self) -> Result<Expr, CompileError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.nested(token.line, |p| p.sequence(TokenKind::RBracket, "']'"))?;
                Ok(Expr::List(items))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.peek().kind == TokenKind::LParen {
                    self.advance();
                    let args = self.nested(token.line, |p| p.sequence(TokenKind::RParen, "')'"))?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Var(name))
                }
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn nested<T>(
        &mut self,
        line: usize,
        parse: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        if self.nesting >= MAX_NESTING {
            return Err(CompileError::new(
                line,
                format!("expression nesting limit of {} exceeded", MAX_NESTING),
            ));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    // Comma separated expressions up to `close`; line breaks are allowed
    // between items.
    fn sequence(&mut self, close: TokenKind, expected: &str) -> Result<Vec<Expr>, CompileError> {
        let mut items = Vec::new();
        self.skip_newlines();
        if self.peek().kind == close {
            self.advance();
            return Ok(items);
        }
        loop {
            self.skip_newlines();
            items.push(self.expr()?);
            self.skip_newlines();
            if self.peek().kind == TokenKind::Comma {
                self.advance();
                self.skip_newlines();
                // trailing comma
                if self.peek().kind == close {
                    self.advance();
                    return Ok(items);
                }
            } else {
                self.expect(close, expected)?;
                return Ok(items);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_routine() {
        let program = parse_program("fn data_cleaner(df) {\n    return df\n}").unwrap();
        assert_eq!(program.routines.len(), 1);

        let routine = &program.routines[0];
        assert_eq!(routine.name, "data_cleaner");
        assert_eq!(routine.params, vec!["df".to_string()]);
        assert_eq!(
            routine.body,
            vec![Statement {
                kind: StatementKind::Return(Expr::Var("df".into())),
                line: 2,
            }]
        );
    }

    #[test]
    fn test_parse_assignments_and_calls() {
        let source = r#"
# default policy
fn data_cleaner(df) {
    let df = drop_columns(df, ["a", "b"])
    df = clip_outliers(df, 0.05, 0.95)
    fail("stop")
    return df
}
"#;
        let program = parse_program(source).unwrap();
        let body = &program.routines[0].body;
        assert_eq!(body.len(), 4);
        assert_eq!(
            body[0].kind,
            StatementKind::Assign {
                name: "df".into(),
                value: Expr::Call {
                    name: "drop_columns".into(),
                    args: vec![
                        Expr::Var("df".into()),
                        Expr::List(vec![Expr::Str("a".into()), Expr::Str("b".into())]),
                    ],
                },
            }
        );
        assert_eq!(body[0].line, 4);
        assert!(matches!(body[2].kind, StatementKind::Expr(Expr::Call { .. })));
    }

    #[test]
    fn test_parse_multiline_arguments() {
        let source = "fn f(df) {\n  df = drop_columns(\n    df,\n    [\"a\",\n     \"b\",],\n  )\n  return df\n}";
        let program = parse_program(source).unwrap();
        assert_eq!(program.routines[0].body.len(), 2);
    }

    #[test]
    fn test_parse_multiple_routines() {
        let source = "fn helper(df) { return df }\nfn data_cleaner(df) { return helper(df) }";
        let program = parse_program(source).unwrap();
        assert_eq!(
            program.routine_names(),
            vec!["helper".to_string(), "data_cleaner".to_string()]
        );
        assert!(program.routine("helper").is_some());
        assert!(program.routine("missing").is_none());
    }

    #[test]
    fn test_parse_empty_program() {
        let program = parse_program("\n# nothing here\n").unwrap();
        assert!(program.routines.is_empty());
    }

    #[test]
    fn test_error_missing_closing_brace() {
        let err = parse_program("fn f(df) {\n  return df\n").unwrap_err();
        assert!(err.message.contains("expected '}'"));
    }

    #[test]
    fn test_error_top_level_statement() {
        let err = parse_program("df = impute_mean(df)").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("expected 'fn'"));
    }

    #[test]
    fn test_error_two_statements_on_one_line() {
        let err = parse_program("fn f(df) {\n  df = a(df) b(df)\n}").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("end of statement"));
    }

    #[test]
    fn test_error_duplicate_routine() {
        let err = parse_program("fn f(df) { return df }\nfn f(df) { return df }").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("more than once"));
    }

    #[test]
    fn test_error_nested_routine() {
        let err = parse_program("fn f(df) {\n  fn g(x) { return x }\n}").unwrap_err();
        assert!(err.message.contains("inside other routines"));
    }

    #[test]
    fn test_nesting_up_to_limit_parses() {
        let list = format!("{}{}", "[".repeat(MAX_NESTING), "]".repeat(MAX_NESTING));
        let source = format!("fn f(df) {{\n  x = {}\n  return df\n}}", list);
        assert!(parse_program(&source).is_ok());
    }

    #[test]
    fn test_error_nesting_too_deep() {
        let depth = 10_000;
        let list = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let source = format!("fn f(df) {{\n  x = {}\n  return df\n}}", list);
        let err = parse_program(&source).unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("nesting limit of 64"));

        let calls = format!("{}df{}", "drop_duplicates(".repeat(depth), ")".repeat(depth));
        let source = format!("fn f(df) {{\n  return {}\n}}", calls);
        let err = parse_program(&source).unwrap_err();
        assert!(err.message.contains("nesting limit"));
    }
}
