//! Expression parser for `write` instructions.
//!
//! ```text
//! expr     := primary ("??" primary)*
//! primary  := path | string | number | "true" | "false" | "null" | "(" expr ")"
//! path     := ident ("." ident | "[" (integer | string) "]")*
//! ```

use serde_json::{Number, Value as JsonValue};

use crate::runtime::program::{Expr, PathStep};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Coalesce,
}

fn tokenize(code: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = code.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '?' => {
                chars.next();
                match chars.next() {
                    Some((_, '?')) => tokens.push(Token::Coalesce),
                    _ => return Err(format!("expected '??' at offset {start}")),
                }
            }
            '"' => {
                chars.next();
                tokens.push(Token::Str(read_string(&mut chars, start)?));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut end = start;
                let mut text = String::new();
                while let Some(&(i, d)) = chars.peek() {
                    let sign = d == '-' && i == start;
                    if !(d.is_ascii_digit() || d == '.' || sign) {
                        break;
                    }
                    // a second '.' ends the number
                    if d == '.' && text.contains('.') {
                        break;
                    }
                    text.push(d);
                    end = i + d.len_utf8();
                    chars.next();
                }
                tokens.push(number(&text).ok_or_else(|| {
                    format!("invalid number '{}' at offset {start}", &code[start..end])
                })?);
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !(d.is_alphanumeric() || d == '_') {
                        break;
                    }
                    ident.push(d);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("unexpected character '{other}' at offset {start}")),
        }
    }

    Ok(tokens)
}

fn read_string(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    start: usize,
) -> Result<String, String> {
    let mut out = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '"' => return Ok(out),
            '\\' => match chars.next() {
                Some((_, '"')) => out.push('"'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, other)) => return Err(format!("invalid escape '\\{other}' in string")),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err(format!("unterminated string starting at offset {start}"))
}

fn number(text: &str) -> Option<Token> {
    if text.contains('.') {
        text.parse::<f64>().ok().filter(|f| f.is_finite()).map(Token::Float)
    } else {
        text.parse::<i64>().ok().map(Token::Int)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let mut operands = vec![self.primary()?];
        while self.peek() == Some(&Token::Coalesce) {
            self.pos += 1;
            operands.push(self.primary()?);
        }

        Ok(if operands.len() == 1 {
            operands.remove(0)
        } else {
            Expr::Coalesce(operands)
        })
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(JsonValue::Bool(true))),
                "false" => Ok(Expr::Literal(JsonValue::Bool(false))),
                "null" => Ok(Expr::Literal(JsonValue::Null)),
                _ => self.path(name),
            },
            Some(Token::Str(s)) => Ok(Expr::Literal(JsonValue::String(s))),
            Some(Token::Int(i)) => Ok(Expr::Literal(JsonValue::from(i))),
            Some(Token::Float(f)) => Number::from_f64(f)
                .map(|n| Expr::Literal(JsonValue::Number(n)))
                .ok_or_else(|| format!("invalid number {f}")),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("expected ')'".to_string()),
                }
            }
            Some(other) => Err(format!("unexpected {other:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn path(&mut self, root: String) -> Result<Expr, String> {
        let mut steps = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Ident(member)) => steps.push(PathStep::Member(member)),
                        _ => return Err(format!("expected a member name after '{root}.'")),
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let step = match self.next() {
                        Some(Token::Int(i)) => usize::try_from(i)
                            .map(PathStep::Index)
                            .map_err(|_| format!("negative index {i}"))?,
                        Some(Token::Str(key)) => PathStep::Key(key),
                        _ => return Err("expected an index or a string key".to_string()),
                    };
                    if self.next() != Some(Token::RBracket) {
                        return Err("expected ']'".to_string());
                    }
                    steps.push(step);
                }
                _ => return Ok(Expr::Path { root, steps }),
            }
        }
    }
}

/// Parse expression code into an [`Expr`]
pub fn parse_expression(code: &str) -> Result<Expr, String> {
    let tokens = tokenize(code)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;

    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected {token:?} after expression")),
    }
}
