//! Filter predicates with positional parameters.
//!
//! A filter is a small textual predicate such as
//! `region = ? AND (version > ? OR NOT active = ?)` plus the values bound to
//! its `?` placeholders, in order. Filters are validated when built, so a
//! [`Filter`] in hand always has exactly one value per placeholder.

use crate::record::{Record, RecordType};
use crate::types::Value;
use std::fmt;
use thiserror::Error;

/// Result type for filter construction.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors raised while building a filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The expression is not well formed.
    #[error("malformed filter at offset {offset}: {message}")]
    Syntax {
        /// Byte offset of the offending token.
        offset: usize,
        /// What went wrong.
        message: String,
    },

    /// Placeholder and value counts differ.
    #[error("filter has {placeholders} placeholder(s) but {values} value(s) were supplied")]
    ParameterCount {
        /// Number of `?` placeholders in the expression.
        placeholders: usize,
        /// Number of values supplied.
        values: usize,
    },
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=` or `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// Parsed predicate tree. Parameters are referenced by position.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Compare {
        field: String,
        op: CompareOp,
        param: usize,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

/// A validated filter predicate with its bound values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    expression: String,
    values: Vec<Value>,
    predicate: Predicate,
}

impl Filter {
    /// Parses `expression` and binds `values` to its placeholders.
    pub fn new(expression: impl Into<String>, values: Vec<Value>) -> FilterResult<Self> {
        let expression = expression.into();
        let tokens = tokenize(&expression)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            params: 0,
            end: expression.len(),
        };
        let predicate = parser.parse_or()?;
        if let Some((offset, token)) = parser.tokens.get(parser.pos) {
            return Err(FilterError::Syntax {
                offset: *offset,
                message: format!("unexpected {token}"),
            });
        }
        if parser.params != values.len() {
            return Err(FilterError::ParameterCount {
                placeholders: parser.params,
                values: values.len(),
            });
        }
        Ok(Self {
            expression,
            values,
            predicate,
        })
    }

    /// Builds an optional filter from optional text and values.
    ///
    /// Returns `Ok(None)` when there is no text and no values. Values
    /// without text are a parameter-count error.
    pub fn optional(expression: Option<&str>, values: &[Value]) -> FilterResult<Option<Self>> {
        match expression {
            Some(text) => Self::new(text, values.to_vec()).map(Some),
            None if values.is_empty() => Ok(None),
            None => Err(FilterError::ParameterCount {
                placeholders: 0,
                values: values.len(),
            }),
        }
    }

    /// The source text.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The bound values, in placeholder order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Evaluates the filter against a record of `record_type`.
    #[must_use]
    pub fn matches(&self, record_type: &RecordType, record: &Record) -> bool {
        self.eval(&self.predicate, record_type, record)
    }

    fn eval(&self, predicate: &Predicate, record_type: &RecordType, record: &Record) -> bool {
        match predicate {
            Predicate::Compare { field, op, param } => {
                let actual = record.resolve(record_type, field);
                compare(&actual, *op, &self.values[*param])
            }
            Predicate::And(lhs, rhs) => {
                self.eval(lhs, record_type, record) && self.eval(rhs, record_type, record)
            }
            Predicate::Or(lhs, rhs) => {
                self.eval(lhs, record_type, record) || self.eval(rhs, record_type, record)
            }
            Predicate::Not(inner) => !self.eval(inner, record_type, record),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)?;
        if !self.values.is_empty() {
            f.write_str(" with (")?;
            for (i, value) in self.values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{value}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Null only equals null; ordering comparisons against null never match.
fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    if actual.is_null() || expected.is_null() {
        return match op {
            CompareOp::Eq => actual.is_null() && expected.is_null(),
            CompareOp::Ne => actual.is_null() != expected.is_null(),
            _ => false,
        };
    }
    match op {
        CompareOp::Eq => actual == expected,
        CompareOp::Ne => actual != expected,
        CompareOp::Lt => actual < expected,
        CompareOp::Le => actual <= expected,
        CompareOp::Gt => actual > expected,
        CompareOp::Ge => actual >= expected,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Op(CompareOp),
    Param,
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier '{name}'"),
            Token::Op(op) => write!(f, "operator '{op}'"),
            Token::Param => f.write_str("'?'"),
            Token::And => f.write_str("AND"),
            Token::Or => f.write_str("OR"),
            Token::Not => f.write_str("NOT"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
        }
    }
}

fn tokenize(input: &str) -> FilterResult<Vec<(usize, Token)>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let token = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'?' => {
                i += 1;
                Token::Param
            }
            b'(' => {
                i += 1;
                Token::LParen
            }
            b')' => {
                i += 1;
                Token::RParen
            }
            b'=' => {
                i += 1;
                Token::Op(CompareOp::Eq)
            }
            b'!' if bytes.get(i + 1) == Some(&b'=') => {
                i += 2;
                Token::Op(CompareOp::Ne)
            }
            b'<' => match bytes.get(i + 1) {
                Some(b'=') => {
                    i += 2;
                    Token::Op(CompareOp::Le)
                }
                Some(b'>') => {
                    i += 2;
                    Token::Op(CompareOp::Ne)
                }
                _ => {
                    i += 1;
                    Token::Op(CompareOp::Lt)
                }
            },
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                    Token::Op(CompareOp::Ge)
                } else {
                    i += 1;
                    Token::Op(CompareOp::Gt)
                }
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let word = &input[start..i];
                match word.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    _ => Token::Ident(word.to_string()),
                }
            }
            _ => {
                let found = input[start..].chars().next().unwrap_or('?');
                return Err(FilterError::Syntax {
                    offset: start,
                    message: format!("unexpected character '{found}'"),
                });
            }
        };
        tokens.push((start, token));
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    params: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(o, _)| *o)
    }

    fn syntax(&self, message: impl Into<String>) -> FilterError {
        FilterError::Syntax {
            offset: self.offset(),
            message: message.into(),
        }
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> FilterResult<Predicate> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Predicate::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> FilterResult<Predicate> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Predicate::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> FilterResult<Predicate> {
        let offset = self.offset();
        match self.next() {
            Some(Token::Not) => Ok(Predicate::Not(Box::new(self.parse_unary()?))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(FilterError::Syntax {
                        offset,
                        message: "unclosed '('".into(),
                    }),
                }
            }
            Some(Token::Ident(field)) => {
                let op = match self.next() {
                    Some(Token::Op(op)) => op,
                    _ => return Err(self.syntax(format!("expected operator after '{field}'"))),
                };
                match self.next() {
                    Some(Token::Param) => {
                        let param = self.params;
                        self.params += 1;
                        Ok(Predicate::Compare { field, op, param })
                    }
                    _ => Err(self.syntax("expected '?'")),
                }
            }
            Some(other) => Err(FilterError::Syntax {
                offset,
                message: format!("unexpected {other}"),
            }),
            None => Err(self.syntax("unexpected end of filter")),
        }
    }
}
