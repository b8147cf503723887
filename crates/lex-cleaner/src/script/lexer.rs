//! Tokenizer for cleaning scripts.

use super::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Assign,
    /// End of a statement: a line break or `;`.
    Newline,
    Eof,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("'{}'", name),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Assign => "'='".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Split `source` into tokens. The last token is always `Eof`.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::Newline,
                    line,
                });
                line += 1;
            }
            ';' => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::Newline,
                    line,
                });
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' => {
                chars.next();
                if chars.peek() != Some(&'/') {
                    return Err(CompileError::new(line, "unexpected character '/'"));
                }
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '(' | ')' | '{' | '}' | '[' | ']' | ',' | '=' => {
                chars.next();
                let kind = match c {
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    ',' => TokenKind::Comma,
                    _ => TokenKind::Assign,
                };
                tokens.push(Token { kind, line });
            }
            '"' | '\'' => {
                chars.next();
                let text = read_string(&mut chars, c, line)?;
                tokens.push(Token {
                    kind: TokenKind::Str(text),
                    line,
                });
            }
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                let mut literal = String::new();
                literal.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    let exponent_sign = (d == '-' || d == '+') && literal.ends_with(['e', 'E']);
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = literal.parse().map_err(|_| {
                    CompileError::new(line, format!("invalid number literal '{}'", literal))
                })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    line,
                });
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(ident),
                    line,
                });
            }
            other => {
                return Err(CompileError::new(
                    line,
                    format!("unexpected character '{}'", other),
                ));
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(tokens)
}

fn read_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
    line: usize,
) -> Result<String, CompileError> {
    let mut text = String::new();
    loop {
        match chars.next() {
            Some(c) if c == quote => return Ok(text),
            Some('\\') => match chars.next() {
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some(c) => text.push(c),
                None => break,
            },
            Some('\n') | None => break,
            Some(c) => text.push(c),
        }
    }
    Err(CompileError::new(line, "unterminated string literal"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_assignment_with_call() {
        assert_eq!(
            kinds("df = drop_duplicates(df)"),
            vec![
                TokenKind::Ident("df".into()),
                TokenKind::Assign,
                TokenKind::Ident("drop_duplicates".into()),
                TokenKind::LParen,
                TokenKind::Ident("df".into()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_literals() {
        assert_eq!(
            kinds(r#"[0.4, -2, "a \"b\"", 'c']"#),
            vec![
                TokenKind::LBracket,
                TokenKind::Number(0.4),
                TokenKind::Comma,
                TokenKind::Number(-2.0),
                TokenKind::Comma,
                TokenKind::Str("a \"b\"".into()),
                TokenKind::Comma,
                TokenKind::Str("c".into()),
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_line_numbers() {
        let tokens = tokenize("# header\nx = 1 // trailing\n\ny = 2").unwrap();
        let y = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Ident("y".into()))
            .unwrap();
        assert_eq!(y.line, 4);
    }

    #[test]
    fn test_semicolon_separates_statements() {
        assert!(kinds("a = 1; b = 2").contains(&TokenKind::Newline));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("x = \"abc\ny = 1").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("def data_cleaner(df):\n    return df").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("':'"));
    }

    #[test]
    fn test_invalid_number() {
        let err = tokenize("x = 1.2.3").unwrap_err();
        assert!(err.message.contains("invalid number"));
    }
}
