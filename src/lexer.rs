use std::fmt;

use thiserror::Error;

use crate::{ast::Token, value::Value};

/// Character offset into the format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset {}", self.offset)
    }
}

/// Malformed token in the format string.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: Position },

    #[error("invalid escape sequence '\\{sequence}' at {position}")]
    InvalidEscape { position: Position, sequence: String },

    #[error("malformed number '{text}' at {position}")]
    MalformedNumber { position: Position, text: String },

    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedCharacter { position: Position, ch: char },

    #[error("unknown placeholder '%{text}' at {position}")]
    UnknownPlaceholder { position: Position, text: String },

    #[error("placeholder '%{placeholder}' at {position} has no matching argument")]
    MissingArgument {
        position: Position,
        placeholder: String,
    },

    #[error("placeholder '%{placeholder}' at {position} cannot take an argument of type {found}")]
    InvalidArgument {
        position: Position,
        placeholder: String,
        found: &'static str,
    },
}

fn keyword(ident: &str) -> Option<Token> {
    let token = match ident.to_ascii_uppercase().as_str() {
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        "ANY" | "SOME" => Token::Any,
        "ALL" => Token::All,
        "NONE" => Token::None,
        "IN" => Token::In,
        "CONTAINS" => Token::Contains,
        "BEGINSWITH" => Token::BeginsWith,
        "ENDSWITH" => Token::EndsWith,
        "MATCHES" => Token::Matches,
        "LIKE" => Token::Like,
        "BETWEEN" => Token::Between,
        "TRUEPREDICATE" => Token::TruePredicate,
        "FALSEPREDICATE" => Token::FalsePredicate,
        "SELF" => Token::SelfRef,
        "NIL" | "NULL" => Token::Nil,
        "YES" | "TRUE" => Token::Boolean(true),
        "NO" | "FALSE" => Token::Boolean(false),
        "SUBQUERY" => Token::Subquery,
        "FUNCTION" => Token::Function,
        "CAST" => Token::Cast,
        _ => return None,
    };
    Some(token)
}

/// Whether `ident` would lex as a keyword rather than an identifier.
pub fn is_reserved_word(ident: &str) -> bool {
    keyword(ident).is_some()
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    token_start: usize,
    arguments: Vec<Value>,
    next_argument: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer::with_arguments(input, Vec::new())
    }

    /// Lexer whose `%@ %d %ld %f %K` placeholders consume `arguments` left to right.
    pub fn with_arguments(input: &str, arguments: Vec<Value>) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            token_start: 0,
            arguments,
            next_argument: 0,
        }
    }

    /// Start of the most recently returned token.
    pub fn token_start(&self) -> Position {
        Position {
            offset: self.token_start,
        }
    }

    fn here(&self) -> Position {
        Position {
            offset: self.position,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.here();
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.here();
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('0') => result.push('\0'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some('u') => {
                            result.push(self.read_unicode_escape(escape_at)?);
                            continue;
                        }
                        Some(other) => {
                            return Err(LexError::InvalidEscape {
                                position: escape_at,
                                sequence: other.to_string(),
                            });
                        }
                        None => return Err(LexError::UnterminatedString { position: start }),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { position: start })
    }

    /// Reads `uXXXX` (the backslash is already consumed), leaving the cursor after it.
    fn read_unicode_escape(&mut self, escape_at: Position) -> Result<char, LexError> {
        self.advance(); // 'u'
        let mut hex = String::new();
        for _ in 0..4 {
            match self.current_char() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.advance();
                }
                _ => break,
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|_| hex.len() == 4)
            .and_then(char::from_u32)
            .ok_or(LexError::InvalidEscape {
                position: escape_at,
                sequence: format!("u{}", hex),
            })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.here();

        if self.current_char() == Some('0')
            && let Some(radix) = match self.peek_char(1) {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            }
        {
            self.advance();
            self.advance();
            let mut digits = String::new();
            while let Some(ch) = self.current_char() {
                if ch.is_alphanumeric() {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            return i64::from_str_radix(&digits, radix)
                .map(Token::Integer)
                .map_err(|_| LexError::MalformedNumber {
                    position: start,
                    text: self.input[start.offset..self.position].iter().collect(),
                });
        }

        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if matches!(self.current_char(), Some('e' | 'E')) {
            is_float = true;
            number.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.current_char() {
                number.push(sign);
                self.advance();
            }
            let mut exponent_digits = 0;
            while let Some(ch) = self.current_char().filter(char::is_ascii_digit) {
                number.push(ch);
                exponent_digits += 1;
                self.advance();
            }
            if exponent_digits == 0 {
                return Err(self.malformed_number(start));
            }
        }

        // `1.2.3`, `12abc`
        let trailing_garbage = match self.current_char() {
            Some('.') => self.peek_char(1).is_some_and(|c| c.is_ascii_digit()),
            Some(c) => c.is_alphanumeric() || c == '_',
            None => false,
        };
        if trailing_garbage {
            return Err(self.malformed_number(start));
        }

        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| self.malformed_number(start))
        } else {
            match number.parse::<i64>() {
                Ok(n) => Ok(Token::Integer(n)),
                // Out of i64 range: keep the magnitude as a float.
                Err(_) => number
                    .parse::<f64>()
                    .map(Token::Float)
                    .map_err(|_| self.malformed_number(start)),
            }
        }
    }

    fn malformed_number(&mut self, start: Position) -> LexError {
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '.' || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        LexError::MalformedNumber {
            position: start,
            text: self.input[start.offset..self.position].iter().collect(),
        }
    }

    fn take_argument(&mut self, placeholder: &str, position: Position) -> Result<Value, LexError> {
        let value = self
            .arguments
            .get(self.next_argument)
            .cloned()
            .ok_or_else(|| LexError::MissingArgument {
                position,
                placeholder: placeholder.to_string(),
            })?;
        self.next_argument += 1;
        Ok(value)
    }

    fn read_placeholder(&mut self) -> Result<Token, LexError> {
        let position = self.here();
        self.advance(); // '%'

        let mut conversion = String::new();
        while let Some(ch) = self.current_char() {
            if matches!(ch, 'l' | 'h') && conversion.len() < 2 {
                conversion.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        match self.current_char() {
            Some(ch @ ('@' | 'K' | 'd' | 'i' | 'u' | 'f')) => {
                conversion.push(ch);
                self.advance();
            }
            _ => {
                return Err(LexError::UnknownPlaceholder {
                    position,
                    text: conversion,
                });
            }
        }

        let value = self.take_argument(&conversion, position)?;
        let invalid = |value: &Value| LexError::InvalidArgument {
            position,
            placeholder: conversion.clone(),
            found: value.type_name(),
        };

        let integer = |value: &Value| match value {
            Value::Boolean(b) => Some(*b as i64),
            other => other.as_i64(),
        };

        let token = match conversion.as_str() {
            "@" => Token::Argument(value),
            "K" => match &value {
                Value::String(path) => {
                    Token::KeyPathArgument(path.split('.').map(str::to_string).collect())
                }
                other => return Err(invalid(other)),
            },
            "d" | "i" | "hd" | "hi" => {
                let n = integer(&value).ok_or_else(|| invalid(&value))?;
                let v = if conversion.starts_with('h') {
                    i16::try_from(n).map(Value::I16).ok()
                } else {
                    i32::try_from(n).map(Value::I32).ok()
                };
                Token::Argument(v.ok_or_else(|| invalid(&value))?)
            }
            "ld" | "li" | "lld" | "lli" => {
                Token::Argument(Value::I64(integer(&value).ok_or_else(|| invalid(&value))?))
            }
            "u" | "lu" | "llu" => {
                let n = integer(&value).ok_or_else(|| invalid(&value))?;
                let v = if conversion == "u" {
                    u32::try_from(n).map(Value::U32).ok()
                } else {
                    u64::try_from(n).map(Value::U64).ok()
                };
                Token::Argument(v.ok_or_else(|| invalid(&value))?)
            }
            "f" | "lf" => Token::Argument(Value::F64(
                value.as_f64().ok_or_else(|| invalid(&value))?,
            )),
            _ => {
                return Err(LexError::UnknownPlaceholder {
                    position,
                    text: conversion.clone(),
                });
            }
        };
        Ok(token)
    }

    /// Consumes `second` if it is the next character, yielding `double`; otherwise `single`.
    fn one_or_two(&mut self, second: char, double: Token, single: Token) -> Token {
        self.advance();
        if self.current_char() == Some(second) {
            self.advance();
            double
        } else {
            single
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        self.token_start = self.position;

        let token = match self.current_char() {
            None => Token::Eof,
            Some('$') => {
                if self
                    .peek_char(1)
                    .is_some_and(|c| c.is_alphabetic() || c == '_')
                {
                    self.advance();
                    Token::Variable(self.read_identifier())
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        position: self.here(),
                        ch: '$',
                    });
                }
            }
            Some('#') => {
                if self
                    .peek_char(1)
                    .is_some_and(|c| c.is_alphabetic() || c == '_')
                {
                    self.advance();
                    Token::Identifier(self.read_identifier())
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        position: self.here(),
                        ch: '#',
                    });
                }
            }
            Some('%') => self.read_placeholder()?,
            Some('@') => {
                self.advance();
                Token::At
            }
            Some('.') => {
                self.advance();
                Token::Dot
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some('+') => {
                self.advance();
                Token::Plus
            }
            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('*') => self.one_or_two('*', Token::StarStar, Token::Star),
            Some('/') => {
                self.advance();
                Token::Slash
            }
            Some('=') => {
                self.advance();
                match self.current_char() {
                    Some('=') => {
                        self.advance();
                        Token::Eq
                    }
                    Some('<') => {
                        self.advance();
                        Token::LtEq
                    }
                    Some('>') => {
                        self.advance();
                        Token::GtEq
                    }
                    _ => Token::Eq,
                }
            }
            Some(':') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::ColonEqual
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        position: self.here(),
                        ch: ':',
                    });
                }
            }
            Some('>') => self.one_or_two('=', Token::GtEq, Token::Gt),
            Some('<') => {
                self.advance();
                match self.current_char() {
                    Some('=') => {
                        self.advance();
                        Token::LtEq
                    }
                    Some('>') => {
                        self.advance();
                        Token::NotEq
                    }
                    _ => Token::Lt,
                }
            }
            Some('!') => self.one_or_two('=', Token::NotEq, Token::Not),
            Some('&') if self.peek_char(1) == Some('&') => {
                self.advance();
                self.advance();
                Token::And
            }
            Some('|') if self.peek_char(1) == Some('|') => {
                self.advance();
                self.advance();
                Token::Or
            }
            Some('{') => {
                self.advance();
                Token::LBrace
            }
            Some('}') => {
                self.advance();
                Token::RBrace
            }
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some('[') => {
                self.advance();
                Token::LBracket
            }
            Some(']') => {
                self.advance();
                Token::RBracket
            }
            Some('"') => Token::String(self.read_string('"')?),
            Some('\'') => Token::String(self.read_string('\'')?),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                keyword(&ident).unwrap_or(Token::Identifier(ident))
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) => {
                return Err(LexError::UnexpectedCharacter {
                    position: self.here(),
                    ch,
                });
            }
        };
        Ok(token)
    }

    /// Lex the whole input, pairing each token with its start position. The final token
    /// is always [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<(Token, Position)>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let at_end = token == Token::Eof;
            tokens.push((token, self.token_start()));
            if at_end {
                return Ok(tokens);
            }
        }
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("and Or NOT yes nil");
    assert_eq!(lexer.next_token().unwrap(), Token::And);
    assert_eq!(lexer.next_token().unwrap(), Token::Or);
    assert_eq!(lexer.next_token().unwrap(), Token::Not);
    assert_eq!(lexer.next_token().unwrap(), Token::Boolean(true));
    assert_eq!(lexer.next_token().unwrap(), Token::Nil);
}

#[test]
fn test_comparison_with_options() {
    let mut lexer = Lexer::new("Name ==[cd] 'x'");
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("Name".into()));
    assert_eq!(lexer.next_token().unwrap(), Token::Eq);
    assert_eq!(lexer.next_token().unwrap(), Token::LBracket);
    assert_eq!(lexer.next_token().unwrap(), Token::Identifier("cd".into()));
    assert_eq!(lexer.next_token().unwrap(), Token::RBracket);
    assert_eq!(lexer.next_token().unwrap(), Token::String("x".into()));
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}
