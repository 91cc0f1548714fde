//! Tokenizer

use crate::error::{ParseError, SourceLocation};
use crate::value::Decimal;

/// Token classes produced by [`tokenize`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `#{`
    HashBrace,
    /// `'`
    Quote,
    /// `` ` ``
    SyntaxQuote,
    /// `~`
    Unquote,
    /// `~@`
    UnquoteSplicing,
    /// `@`
    Deref,
    /// `^`
    Meta,
    /// String literal with escapes decoded
    Str(String),
    /// Integer literal
    Integer(i64),
    /// Floating point literal
    Float(f64),
    /// Decimal literal (trailing `M`)
    Decimal(Decimal),
    /// `nil`
    Nil,
    /// `true` or `false`
    Bool(bool),
    /// Keyword without its leading colon
    Keyword(String),
    /// Any other atom
    Symbol(String),
}

/// A token with its lexeme and position.
#[derive(Debug, Clone)]
pub struct Token {
    /// Token class and payload
    pub kind: TokenKind,
    /// Source text of the token
    pub lexeme: String,
    /// Where the token starts
    pub location: SourceLocation,
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';' | '`' | '~')
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    source: &'a str,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.source, self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ',' {
                self.bump();
            } else if c == ';' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn read_atom(&mut self, first: char) -> String {
        let mut text = String::from(first);
        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }

    fn read_string(&mut self, start: &SourceLocation) -> Result<(String, String), ParseError> {
        let mut value = String::new();
        let mut lexeme = String::from('"');
        loop {
            let c = self
                .bump()
                .ok_or_else(|| ParseError::new("Unterminated string: expected '\"'", start.clone()))?;
            lexeme.push(c);
            match c {
                '"' => return Ok((value, lexeme)),
                '\\' => {
                    let at = self.location();
                    let esc = self.bump().ok_or_else(|| {
                        ParseError::new("Unterminated string: expected '\"'", start.clone())
                    })?;
                    lexeme.push(esc);
                    match esc {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        'u' => {
                            let mut hex = String::new();
                            for _ in 0..4 {
                                let h = self.bump().ok_or_else(|| {
                                    ParseError::new("Incomplete \\u escape", at.clone())
                                })?;
                                lexeme.push(h);
                                hex.push(h);
                            }
                            let decoded = u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| {
                                    ParseError::new(format!("Invalid \\u escape '{}'", hex), at)
                                })?;
                            value.push(decoded);
                        }
                        other => {
                            return Err(ParseError::new(
                                format!("Unsupported escape '\\{}'", other),
                                at,
                            ))
                        }
                    }
                }
                c => value.push(c),
            }
        }
    }
}

fn looks_numeric(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('+') | Some('-') => chars.next().map_or(false, |c| c.is_ascii_digit()),
        _ => false,
    }
}

fn classify_number(text: &str, location: &SourceLocation) -> Result<TokenKind, ParseError> {
    let invalid = || ParseError::new(format!("Invalid number '{}'", text), location.clone());
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    if let Some(digits) = unsigned.strip_suffix('M') {
        return Decimal::parse(digits).map(TokenKind::Decimal).ok_or_else(invalid);
    }
    if unsigned.contains(['.', 'e', 'E']) {
        return unsigned.parse::<f64>().map(TokenKind::Float).map_err(|_| invalid());
    }
    if !unsigned
        .trim_start_matches('-')
        .chars()
        .all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    unsigned.parse::<i64>().map(TokenKind::Integer).map_err(|_| {
        ParseError::new(
            format!("Integer literal '{}' out of range", text),
            location.clone(),
        )
    })
}

/// Split source text into tokens.
pub fn tokenize(text: &str, source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        chars: text.chars().peekable(),
        source,
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();

    loop {
        lexer.skip_trivia();
        let location = lexer.location();
        let c = match lexer.bump() {
            Some(c) => c,
            None => break,
        };
        let simple = |kind: TokenKind, lexeme: &str| Token {
            kind,
            lexeme: lexeme.to_string(),
            location: location.clone(),
        };
        let token = match c {
            '(' => simple(TokenKind::LParen, "("),
            ')' => simple(TokenKind::RParen, ")"),
            '[' => simple(TokenKind::LBracket, "["),
            ']' => simple(TokenKind::RBracket, "]"),
            '{' => simple(TokenKind::LBrace, "{"),
            '}' => simple(TokenKind::RBrace, "}"),
            '\'' => simple(TokenKind::Quote, "'"),
            '`' => simple(TokenKind::SyntaxQuote, "`"),
            '@' => simple(TokenKind::Deref, "@"),
            '^' => simple(TokenKind::Meta, "^"),
            '~' => {
                if lexer.peek() == Some('@') {
                    lexer.bump();
                    simple(TokenKind::UnquoteSplicing, "~@")
                } else {
                    simple(TokenKind::Unquote, "~")
                }
            }
            '#' => match lexer.peek() {
                Some('{') => {
                    lexer.bump();
                    simple(TokenKind::HashBrace, "#{")
                }
                Some('#') => {
                    lexer.bump();
                    let text = lexer.read_atom('#');
                    let value = match text.as_str() {
                        "#Inf" => f64::INFINITY,
                        "#-Inf" => f64::NEG_INFINITY,
                        "#NaN" => f64::NAN,
                        _ => {
                            return Err(ParseError::new(
                                format!("Unknown symbolic value '#{}'", text),
                                location,
                            ))
                        }
                    };
                    Token {
                        kind: TokenKind::Float(value),
                        lexeme: format!("#{}", text),
                        location,
                    }
                }
                _ => return Err(ParseError::new("Unsupported dispatch character '#'", location)),
            },
            '"' => {
                let (value, lexeme) = lexer.read_string(&location)?;
                Token {
                    kind: TokenKind::Str(value),
                    lexeme,
                    location,
                }
            }
            ':' => {
                let text = lexer.read_atom(':');
                if text.len() == 1 {
                    return Err(ParseError::new("Keyword name expected after ':'", location));
                }
                Token {
                    kind: TokenKind::Keyword(text[1..].to_string()),
                    lexeme: text,
                    location,
                }
            }
            first => {
                let text = lexer.read_atom(first);
                let kind = match text.as_str() {
                    "nil" => TokenKind::Nil,
                    "true" => TokenKind::Bool(true),
                    "false" => TokenKind::Bool(false),
                    t if looks_numeric(t) => classify_number(t, &location)?,
                    t => TokenKind::Symbol(t.to_string()),
                };
                Token {
                    kind,
                    lexeme: text,
                    location,
                }
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}
