//! Recursive-descent parser for condition expressions.
//!
//! ```text
//! expr       := or
//! or         := and ('||' and)*
//! and        := unary ('&&' unary)*
//! unary      := '!' unary | '(' expr ')' | comparison
//! comparison := path (op literal)?
//! path       := '$' ('.' name | '.*' | '[' (int | '*' | quoted) ']')*
//! literal    := null | true | false | number | quoted
//! ```

use serde_json::{Number, Value};

use crate::ast::{CmpOp, Expr, PathExpr, Segment};
use crate::error::CompileError;

pub(crate) fn parse(source: &str) -> Result<Expr, CompileError> {
    let mut parser = Parser {
        chars: source.chars().collect(),
        pos: 0,
    };
    parser.skip_ws();
    if parser.at_end() {
        return Err(CompileError::new(0, "empty condition"));
    }
    let expr = parser.parse_or()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error(format!(
            "unexpected trailing input '{}'",
            parser.rest()
        )));
    }
    Ok(expr)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn rest(&self) -> String {
        self.chars[self.pos.min(self.chars.len())..].iter().collect()
    }

    fn error(&self, reason: impl Into<String>) -> CompileError {
        CompileError::new(self.pos, reason)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        let matches = token
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c));
        if matches {
            self.pos += token.chars().count();
        }
        matches
    }

    fn expect(&mut self, c: char) -> Result<(), CompileError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_and()?;
        loop {
            self.skip_ws();
            if !self.eat("||") {
                return Ok(lhs);
            }
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_unary()?;
        loop {
            self.skip_ws();
            if !self.eat("&&") {
                return Ok(lhs);
            }
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        self.skip_ws();
        match self.peek() {
            Some('!') if self.peek_at(1) != Some('=') => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.skip_ws();
                self.expect(')')?;
                Ok(inner)
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, CompileError> {
        let path = self.parse_path()?;
        self.skip_ws();
        let Some(op) = self.parse_op() else {
            return Ok(Expr::Truthy(path));
        };
        self.skip_ws();
        let literal = self.parse_literal()?;
        Ok(Expr::Compare { path, op, literal })
    }

    fn parse_op(&mut self) -> Option<CmpOp> {
        // Two-character operators first so `<=` is not read as `<`.
        for (token, op) in [
            ("==", CmpOp::Eq),
            ("!=", CmpOp::Ne),
            ("<=", CmpOp::Le),
            (">=", CmpOp::Ge),
            ("<", CmpOp::Lt),
            (">", CmpOp::Gt),
        ] {
            if self.eat(token) {
                return Some(op);
            }
        }
        None
    }

    fn parse_path(&mut self) -> Result<PathExpr, CompileError> {
        if self.peek() != Some('$') {
            return Err(self.error("expected '$' to start a JSONPath expression"));
        }
        self.pos += 1;
        let mut segments = Vec::new();
        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    match self.peek() {
                        Some('.') => {
                            return Err(self.error("recursive descent '..' is not supported"));
                        }
                        Some('*') => {
                            self.pos += 1;
                            segments.push(Segment::Wildcard);
                        }
                        _ => segments.push(Segment::Key(self.parse_name()?)),
                    }
                }
                Some('[') => {
                    self.pos += 1;
                    self.skip_ws();
                    let segment = match self.peek() {
                        Some('*') => {
                            self.pos += 1;
                            Segment::Wildcard
                        }
                        Some('\'' | '"') => Segment::Key(self.parse_quoted()?),
                        Some(c) if c == '-' || c.is_ascii_digit() => {
                            Segment::Index(self.parse_index()?)
                        }
                        _ => return Err(self.error("expected index, '*', or quoted key")),
                    };
                    self.skip_ws();
                    self.expect(']')?;
                    segments.push(segment);
                }
                _ => return Ok(PathExpr { segments }),
            }
        }
    }

    fn parse_name(&mut self) -> Result<String, CompileError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a member name after '.'"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_index(&mut self) -> Result<i64, CompileError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<i64>()
            .map_err(|_| CompileError::new(start, format!("invalid array index '{text}'")))
    }

    fn parse_quoted(&mut self) -> Result<String, CompileError> {
        let start = self.pos;
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(CompileError::new(start, "unterminated string literal")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    let escaped = match self.peek_at(1) {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(c @ ('\\' | '\'' | '"')) => c,
                        _ => return Err(self.error("invalid escape sequence")),
                    };
                    out.push(escaped);
                    self.pos += 2;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_literal(&mut self) -> Result<Value, CompileError> {
        for (keyword, value) in [
            ("null", Value::Null),
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
        ] {
            let boundary = self
                .peek_at(keyword.len())
                .map_or(true, |c| !c.is_alphanumeric() && c != '_');
            if boundary && self.eat(keyword) {
                return Ok(value);
            }
        }
        match self.peek() {
            Some('\'' | '"') => Ok(Value::String(self.parse_quoted()?)),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            _ => Err(self.error("expected a literal (null, true, false, number, or string)")),
        }
    }

    fn parse_number(&mut self) -> Result<Value, CompileError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| CompileError::new(start, format!("invalid number '{text}'")))
    }
}
