//! Reader: source text to value trees
//!
//! Tokenizing and parsing are separate passes. Every list, vector, map, set
//! and symbol read from source carries `{:file :line :column}` metadata.

mod parser;
mod token;

pub use parser::Parser;
pub use token::{tokenize, Token, TokenKind};

use crate::error::{ParseError, SourceLocation};
use crate::value::Value;

fn end_of(text: &str, source: &str) -> SourceLocation {
    let line = text.lines().count().max(1);
    let column = text.lines().last().map_or(0, |l| l.chars().count()) + 1;
    SourceLocation::new(source, line, column)
}

/// Read every top-level form in `text`.
pub fn read_str(text: &str, source: &str) -> Result<Vec<Value>, ParseError> {
    let tokens = tokenize(text, source)?;
    Parser::new(tokens, end_of(text, source)).parse_all()
}

/// Read the first form in `text`, or `nil` for blank input.
pub fn read_one(text: &str, source: &str) -> Result<Value, ParseError> {
    let tokens = tokenize(text, source)?;
    let mut parser = Parser::new(tokens, end_of(text, source));
    if parser.at_end() {
        return Ok(Value::Nil);
    }
    parser.parse_form()
}
