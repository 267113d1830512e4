use std::mem;

use thiserror::Error;

use crate::{
    ast::{
        ArithOp, Comparison, ComparisonOp, ComparisonOptions, Expr, IndexKind, Modifier,
        Predicate, Token,
    },
    lexer::{LexError, Lexer, Position},
    types::ValueType,
    value::Value,
};

/// Malformed construct in a format string. Parsing never returns a partial tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("expected {expected} at {position}, found {found}")]
    Unexpected {
        position: Position,
        expected: String,
        found: String,
    },

    #[error("unknown cast type '{name}' at {position}")]
    UnknownCastType { position: Position, name: String },

    #[error("unknown comparison option '[{letters}]' at {position}")]
    UnknownOption { position: Position, letters: String },

    #[error("unknown aggregate '@{name}' at {position}")]
    UnknownAggregate { position: Position, name: String },
}

pub struct Parser {
    tokens: Vec<(Token, Position)>,
    cursor: usize,
}

impl Parser {
    /// Lexes the whole input up front; lexical errors surface here.
    pub fn new(lexer: Lexer) -> Result<Self, ParseError> {
        Ok(Parser {
            tokens: lexer.tokenize()?,
            cursor: 0,
        })
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.cursor)
            .map(|(token, _)| token)
            .unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.cursor + 1)
            .map(|(token, _)| token)
            .unwrap_or(&Token::Eof)
    }

    fn position(&self) -> Position {
        self.tokens
            .get(self.cursor)
            .or(self.tokens.last())
            .map(|(_, position)| *position)
            .unwrap_or_default()
    }

    fn advance(&mut self) {
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
    }

    /// Returns the current token and moves past it. The buffer is left intact so the
    /// cursor can be rewound.
    fn take(&mut self) -> Token {
        let token = self.current().clone();
        self.advance();
        token
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(self.current()) == mem::discriminant(token)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::Unexpected {
            position: self.position(),
            expected: expected.to_string(),
            found: self.current().describe(),
        }
    }

    fn expect(&mut self, expected: Token, description: &str) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(description));
        }
        self.advance();
        Ok(())
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.check(&Token::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    /// Parse a complete predicate; trailing tokens are an error.
    pub fn parse_predicate(&mut self) -> Result<Predicate, ParseError> {
        let predicate = self.parse_or()?;
        self.expect_end()?;
        Ok(predicate)
    }

    /// Parse a complete value expression; trailing tokens are an error.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        self.expect_end()?;
        Ok(expr)
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    fn parse_or(&mut self) -> Result<Predicate, ParseError> {
        let first = self.parse_and()?;
        if !self.check(&Token::Or) {
            return Ok(first);
        }

        let mut subpredicates = vec![first];
        while self.check(&Token::Or) {
            self.advance();
            subpredicates.push(self.parse_and()?);
        }
        Ok(Predicate::or(subpredicates))
    }

    fn parse_and(&mut self) -> Result<Predicate, ParseError> {
        let first = self.parse_not()?;
        if !self.check(&Token::And) {
            return Ok(first);
        }

        let mut subpredicates = vec![first];
        while self.check(&Token::And) {
            self.advance();
            subpredicates.push(self.parse_not()?);
        }
        Ok(Predicate::and(subpredicates))
    }

    fn parse_not(&mut self) -> Result<Predicate, ParseError> {
        if self.check(&Token::Not) {
            self.advance();
            return Ok(Predicate::not(self.parse_not()?));
        }
        self.parse_primary_predicate()
    }

    fn parse_primary_predicate(&mut self) -> Result<Predicate, ParseError> {
        match self.current() {
            Token::TruePredicate => {
                self.advance();
                Ok(Predicate::Constant(true))
            }
            Token::FalsePredicate => {
                self.advance();
                Ok(Predicate::Constant(false))
            }
            Token::LParen => {
                // `(a OR b)` or `(a + b) > 3`: try the predicate reading first.
                let start = self.cursor;
                self.advance();
                let grouped = self
                    .parse_or()
                    .and_then(|p| self.expect(Token::RParen, "')'").map(|_| p));
                match grouped {
                    Ok(predicate) => Ok(predicate),
                    Err(_) => {
                        self.cursor = start;
                        self.parse_comparison(Modifier::Direct)
                    }
                }
            }
            // nothing else can start a predicate with IN, so it reads as ANY
            Token::Any | Token::In => {
                self.advance();
                self.parse_comparison(Modifier::Any)
            }
            Token::All => {
                self.advance();
                self.parse_comparison(Modifier::All)
            }
            Token::None => {
                self.advance();
                Ok(Predicate::not(self.parse_comparison(Modifier::Any)?))
            }
            _ => self.parse_comparison(Modifier::Direct),
        }
    }

    fn parse_comparison(&mut self, modifier: Modifier) -> Result<Predicate, ParseError> {
        let left = self.parse_expr()?;

        let op = match self.current() {
            Token::Eq => ComparisonOp::EqualTo,
            Token::NotEq => ComparisonOp::NotEqualTo,
            Token::Lt => ComparisonOp::LessThan,
            Token::LtEq => ComparisonOp::LessThanOrEqualTo,
            Token::Gt => ComparisonOp::GreaterThan,
            Token::GtEq => ComparisonOp::GreaterThanOrEqualTo,
            Token::Matches => ComparisonOp::Matches,
            Token::Like => ComparisonOp::Like,
            Token::BeginsWith => ComparisonOp::BeginsWith,
            Token::EndsWith => ComparisonOp::EndsWith,
            Token::In => ComparisonOp::In,
            Token::Contains => ComparisonOp::Contains,
            Token::Between => ComparisonOp::Between,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.advance();

        let options = self.parse_options()?;
        let right = self.parse_expr()?;

        Ok(Comparison::new(left, op, right)
            .with_modifier(modifier)
            .with_options(options)
            .into())
    }

    /// Optional `[cd]` suffix right after a comparison operator.
    fn parse_options(&mut self) -> Result<ComparisonOptions, ParseError> {
        if !self.check(&Token::LBracket) {
            return Ok(ComparisonOptions::NONE);
        }
        self.advance();

        let position = self.position();
        let letters = match self.take() {
            Token::Identifier(letters) => letters,
            _ => {
                self.cursor -= 1;
                return Err(self.unexpected("comparison options"));
            }
        };
        let options =
            ComparisonOptions::from_letters(&letters).ok_or(ParseError::UnknownOption {
                position,
                letters,
            })?;
        self.expect(Token::RBracket, "']'")?;
        Ok(options)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        if let (Token::Variable(name), Token::ColonEqual) = (self.current(), self.peek()) {
            let variable = name.clone();
            self.advance();
            self.advance(); // ':='
            let value = self.parse_expr()?;
            return Ok(Expr::assign(variable, value));
        }
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current() {
                Token::Plus => ArithOp::Add,
                Token::Minus => ArithOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::arithmetic(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_power()?;

        loop {
            let op = match self.current() {
                Token::Star => ArithOp::Multiply,
                Token::Slash => ArithOp::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            left = Expr::arithmetic(op, left, right);
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_unary()?;
        if self.check(&Token::StarStar) {
            self.advance();
            let exponent = self.parse_power()?; // right-associative
            return Ok(Expr::arithmetic(ArithOp::Power, base, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if !self.check(&Token::Minus) {
            return self.parse_postfix();
        }
        self.advance();

        // Negative numeric literals stay literals.
        Ok(match self.parse_unary()? {
            Expr::Constant(Value::I64(n)) if n != i64::MIN => Expr::Constant(Value::I64(-n)),
            Expr::Constant(Value::F64(n)) => Expr::Constant(Value::F64(-n)),
            operand => Expr::negate(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&Token::Dot) {
                self.advance();
                let position = self.position();
                match self.take() {
                    Token::Identifier(name) => {
                        expr = Expr::key_path_from(expr, vec![name]);
                    }
                    Token::KeyPathArgument(components) => {
                        expr = Expr::key_path_from(expr, components);
                    }
                    Token::At => {
                        let name = match self.take() {
                            Token::Identifier(name) => name,
                            _ => {
                                self.cursor -= 1;
                                return Err(self.unexpected("aggregate name after '@'"));
                            }
                        };
                        let function = match name.to_ascii_lowercase().as_str() {
                            "count" => "COUNT",
                            "sum" => "SUM",
                            "avg" | "average" => "AVERAGE",
                            "min" => "MIN",
                            "max" => "MAX",
                            _ => return Err(ParseError::UnknownAggregate { position, name }),
                        };
                        expr = Expr::function(function, vec![expr]);
                    }
                    _ => {
                        self.cursor -= 1;
                        return Err(self.unexpected("member name after '.'"));
                    }
                }
            } else if self.check(&Token::LBracket) {
                self.advance();
                let index = self.parse_index()?;
                self.expect(Token::RBracket, "']'")?;
                expr = Expr::index(expr, index);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_index(&mut self) -> Result<IndexKind, ParseError> {
        if let (Token::Identifier(name), Token::RBracket) = (self.current(), self.peek()) {
            let kind = match name.to_ascii_uppercase().as_str() {
                "FIRST" => Some(IndexKind::First),
                "LAST" => Some(IndexKind::Last),
                "SIZE" => Some(IndexKind::Size),
                _ => None,
            };
            if let Some(kind) = kind {
                self.advance();
                return Ok(kind);
            }
        }
        Ok(IndexKind::At(Box::new(self.parse_expr()?)))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.position();
        match self.take() {
            // Literals
            Token::Integer(n) => Ok(Expr::Constant(Value::I64(n))),
            Token::Float(n) => Ok(Expr::Constant(Value::F64(n))),
            Token::String(s) => Ok(Expr::Constant(Value::String(s))),
            Token::Boolean(b) => Ok(Expr::Constant(Value::Boolean(b))),
            Token::Nil => Ok(Expr::nil()),
            Token::Argument(value) => Ok(Expr::Constant(value)),

            // References
            Token::SelfRef => Ok(Expr::SelfObject),
            Token::Variable(name) => Ok(Expr::Variable(name)),
            Token::KeyPathArgument(components) => {
                Ok(Expr::key_path_from(Expr::SelfObject, components))
            }
            Token::Identifier(name) => {
                if self.check(&Token::LParen) {
                    let args = self.parse_call_arguments()?;
                    Ok(Expr::function(&name, args))
                } else {
                    Ok(Expr::key_path_from(Expr::SelfObject, vec![name]))
                }
            }

            Token::LParen => {
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }

            Token::LBrace => {
                let mut items = vec![];
                while !self.check(&Token::RBrace) {
                    items.push(self.parse_expr()?);
                    if !self.check(&Token::RBrace) {
                        self.expect(Token::Comma, "',' or '}'")?;
                    }
                }
                self.advance();
                Ok(Expr::aggregate(items))
            }

            Token::Subquery => self.parse_subquery(),
            Token::Function => self.parse_function(),
            Token::Cast => self.parse_cast(),

            _ => {
                self.cursor -= 1;
                Err(ParseError::Unexpected {
                    position,
                    expected: "expression".to_string(),
                    found: self.current().describe(),
                })
            }
        }
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Token::LParen, "'('")?;
        let mut args = vec![];
        while !self.check(&Token::RParen) {
            args.push(self.parse_expr()?);
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma, "',' or ')'")?;
            }
        }
        self.advance();
        Ok(args)
    }

    /// `SUBQUERY(collection, $var, predicate)`
    fn parse_subquery(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::LParen, "'(' after SUBQUERY")?;
        let collection = self.parse_expr()?;
        self.expect(Token::Comma, "','")?;

        let variable = match self.take() {
            Token::Variable(name) => name,
            _ => {
                self.cursor -= 1;
                return Err(self.unexpected("subquery variable"));
            }
        };
        self.expect(Token::Comma, "','")?;

        let predicate = self.parse_or()?;
        self.expect(Token::RParen, "')'")?;
        Ok(Expr::subquery(collection, variable, predicate))
    }

    /// `FUNCTION(target, 'selector:', args...)` or the targetless `FUNCTION('selector:', args...)`.
    fn parse_function(&mut self) -> Result<Expr, ParseError> {
        let position = self.position();
        let mut args = self.parse_call_arguments()?.into_iter();

        let first = args.next().ok_or_else(|| ParseError::Unexpected {
            position,
            expected: "FUNCTION arguments".to_string(),
            found: "empty argument list".to_string(),
        })?;
        let rest: Vec<Expr> = args.collect();

        // A leading selector string means no target, unless it is followed by another
        // string and reads like a plain value rather than a `name:` selector.
        let second_is_string = matches!(rest.first(), Some(Expr::Constant(Value::String(_))));
        let first = match first {
            Expr::Constant(Value::String(selector))
                if selector.ends_with(':') || !second_is_string =>
            {
                return Ok(Expr::selector(None, selector, rest));
            }
            first => first,
        };

        let mut rest = rest.into_iter();
        match rest.next() {
            Some(Expr::Constant(Value::String(selector))) => {
                Ok(Expr::selector(Some(first), selector, rest.collect()))
            }
            other => Err(ParseError::Unexpected {
                position,
                expected: "selector string as second FUNCTION argument".to_string(),
                found: other
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "nothing".to_string()),
            }),
        }
    }

    /// `CAST(expr, 'TypeName')`
    fn parse_cast(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::LParen, "'(' after CAST")?;
        let expr = self.parse_expr()?;
        self.expect(Token::Comma, "','")?;

        let position = self.position();
        let name = match self.take() {
            Token::String(name) => name,
            _ => {
                self.cursor -= 1;
                return Err(self.unexpected("type name string"));
            }
        };
        let to = ValueType::from_cast_name(&name)
            .ok_or(ParseError::UnknownCastType { position, name })?;

        self.expect(Token::RParen, "')'")?;
        Ok(Expr::cast(expr, to))
    }
}

impl Predicate {
    /// Parse a predicate format string, substituting placeholders from `args` in order.
    ///
    /// ```
    /// use predicate_lang::{Predicate, Value};
    ///
    /// let p = Predicate::parse("%K ==[c] %@", vec!["Name".into(), Value::from("ada")]).unwrap();
    /// assert_eq!(p.to_string(), "(Name ==[c] \"ada\")");
    /// ```
    pub fn parse(format: &str, args: Vec<Value>) -> Result<Predicate, ParseError> {
        Parser::new(Lexer::with_arguments(format, args))?.parse_predicate()
    }
}

impl Expr {
    /// Parse a value expression, substituting placeholders from `args` in order.
    pub fn parse(format: &str, args: Vec<Value>) -> Result<Expr, ParseError> {
        Parser::new(Lexer::with_arguments(format, args))?.parse_expression()
    }
}
