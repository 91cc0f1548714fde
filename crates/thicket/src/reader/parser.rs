//! Single-lookahead recursive descent over tokens

use std::sync::Arc;

use super::token::{Token, TokenKind};
use crate::error::{ParseError, SourceLocation};
use crate::eval::{STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::value::{Meta, Value, ValueMap, ValueSet};

/// Deepest form nesting the reader accepts.
pub const MAX_READ_DEPTH: usize = 1024;

/// Parser state: the token sequence and a cursor.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    end: SourceLocation,
}

fn position_meta(location: &SourceLocation) -> ValueMap {
    let mut meta = ValueMap::new();
    meta.insert(Value::keyword("file"), Value::string(&location.file));
    meta.insert(Value::keyword("line"), Value::Integer(location.line as i64));
    meta.insert(Value::keyword("column"), Value::Integer(location.column as i64));
    meta
}

/// Merge `extra` entries over any metadata the form already carries.
fn merge_meta(form: &Value, extra: ValueMap) -> Meta {
    let mut merged = form.meta().map(|m| m.as_ref().clone()).unwrap_or_default();
    merged.extend(extra);
    Some(Arc::new(merged))
}

fn can_carry_meta(form: &Value) -> bool {
    matches!(
        form,
        Value::List(..) | Value::Vector(..) | Value::Map(..) | Value::Set(..) | Value::Symbol(_)
    )
}

impl Parser {
    /// Create a parser over `tokens`; `end` is reported for premature end of input.
    pub fn new(tokens: Vec<Token>, end: SourceLocation) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            end,
        }
    }

    /// Whether all tokens have been consumed.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Parse every remaining form.
    pub fn parse_all(&mut self) -> Result<Vec<Value>, ParseError> {
        let mut forms = Vec::new();
        while !self.at_end() {
            forms.push(self.parse_form()?);
        }
        Ok(forms)
    }

    /// Parse exactly one form.
    pub fn parse_form(&mut self) -> Result<Value, ParseError> {
        if self.depth >= MAX_READ_DEPTH {
            let location = self.peek().map_or_else(|| self.end.clone(), |t| t.location.clone());
            return Err(ParseError::new(
                format!("Forms nested deeper than {} levels", MAX_READ_DEPTH),
                location,
            ));
        }
        self.depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.parse_next());
        self.depth -= 1;
        result
    }

    fn parse_next(&mut self) -> Result<Value, ParseError> {
        let token = self
            .next()
            .ok_or_else(|| ParseError::new("Unexpected end of input", self.end.clone()))?;
        let location = token.location.clone();

        let form = match token.kind {
            TokenKind::Nil => return Ok(Value::Nil),
            TokenKind::Bool(b) => return Ok(Value::Bool(b)),
            TokenKind::Integer(n) => return Ok(Value::Integer(n)),
            TokenKind::Float(f) => return Ok(Value::Float(f)),
            TokenKind::Decimal(d) => return Ok(Value::Decimal(d)),
            TokenKind::Str(s) => return Ok(Value::string(s)),
            TokenKind::Keyword(k) => return Ok(Value::keyword(k)),
            TokenKind::Symbol(s) => Value::symbol(s),

            TokenKind::LParen => Value::list(self.parse_until(TokenKind::RParen, ')', &location)?),
            TokenKind::LBracket => {
                Value::vector(self.parse_until(TokenKind::RBracket, ']', &location)?)
            }
            TokenKind::LBrace => {
                let items = self.parse_until(TokenKind::RBrace, '}', &location)?;
                if items.len() % 2 != 0 {
                    return Err(ParseError::new(
                        "Map literal must contain an even number of forms",
                        location,
                    ));
                }
                let mut map = ValueMap::new();
                let mut iter = items.into_iter();
                while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                    map.insert(k, v);
                }
                Value::map(map)
            }
            TokenKind::HashBrace => {
                let items = self.parse_until(TokenKind::RBrace, '}', &location)?;
                Value::set(items.into_iter().collect::<ValueSet>())
            }

            TokenKind::Quote => self.wrap_prefix("quote")?,
            TokenKind::SyntaxQuote => self.wrap_prefix("syntax-quote")?,
            TokenKind::Unquote => self.wrap_prefix("unquote")?,
            TokenKind::UnquoteSplicing => self.wrap_prefix("unquote-splicing")?,
            TokenKind::Deref => self.wrap_prefix("deref")?,
            TokenKind::Meta => return self.parse_with_meta(location),

            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                return Err(ParseError::new(
                    format!("Unexpected '{}'", token.lexeme),
                    location,
                ))
            }
        };

        Ok(form.with_meta(merge_meta(&form, position_meta(&location))))
    }

    fn wrap_prefix(&mut self, special: &str) -> Result<Value, ParseError> {
        let inner = self.parse_form()?;
        Ok(Value::list(vec![Value::symbol(special), inner]))
    }

    fn parse_until(
        &mut self,
        closer: TokenKind,
        closer_char: char,
        open: &SourceLocation,
    ) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::new(
                        format!("Unterminated form: expected '{}'", closer_char),
                        open.clone(),
                    ))
                }
                Some(t) if t.kind == closer => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(t)
                    if matches!(
                        t.kind,
                        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
                    ) =>
                {
                    return Err(ParseError::new(
                        format!("Expected '{}' but found '{}'", closer_char, t.lexeme),
                        t.location.clone(),
                    ))
                }
                Some(_) => items.push(self.parse_form()?),
            }
        }
    }

    fn parse_with_meta(&mut self, location: SourceLocation) -> Result<Value, ParseError> {
        let meta_form = self.parse_form()?;
        let entries = match meta_form {
            Value::Keyword(_) => {
                let mut m = ValueMap::new();
                m.insert(meta_form, Value::Bool(true));
                m
            }
            Value::Map(map, _) => map.as_ref().clone(),
            Value::Symbol(_) | Value::String(_) => {
                let mut m = ValueMap::new();
                m.insert(Value::keyword("tag"), meta_form);
                m
            }
            other => {
                return Err(ParseError::new(
                    format!("Metadata must be a keyword, symbol, string or map, got {}", other),
                    location,
                ))
            }
        };
        let target = self.parse_form()?;
        if !can_carry_meta(&target) {
            return Err(ParseError::new(
                "Metadata can only be attached to symbols and collections",
                location,
            ));
        }
        Ok(target.with_meta(merge_meta(&target, entries)))
    }
}
