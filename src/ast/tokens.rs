use crate::value::Value;

/// Lexical token.
///
/// Keywords are matched case-insensitively by the lexer, so `and`, `And` and `AND` all
/// produce [`Token::And`].
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Integer literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 0x2A
    /// ```
    Integer(i64),

    /// Floating-point literal
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 1e3
    /// ```
    Float(f64),

    /// String literal in single or double quotes
    String(String),

    /// `YES`, `NO`, `TRUE`, `FALSE`
    Boolean(bool),

    /// `NIL` or `NULL`
    Nil,

    /// Substituted `%@`, `%d`, `%ld` or `%f` argument
    Argument(Value),

    /// Substituted `%K` argument, already split on `.`
    KeyPathArgument(Vec<String>),

    // Identifiers and references
    /// Member name or built-in function name
    ///
    /// A leading `#` escapes a reserved word: `#size` is the identifier `size`.
    Identifier(String),

    /// Variable reference (`$name`)
    Variable(String),

    // Keywords
    And,
    Or,
    Not,
    Any,
    All,
    None,
    In,
    Contains,
    BeginsWith,
    EndsWith,
    Matches,
    Like,
    Between,
    TruePredicate,
    FalsePredicate,
    SelfRef,
    Subquery,
    Function,
    Cast,

    // Comparison
    /// `=` or `==`
    Eq,
    /// `!=` or `<>`
    NotEq,
    Lt,
    /// `<=` or `=<`
    LtEq,
    Gt,
    /// `>=` or `=>`
    GtEq,

    // Arithmetic
    Plus,
    Minus,
    Star,
    /// Power (`**`)
    StarStar,
    Slash,

    /// Variable assignment (`:=`)
    ColonEqual,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    /// Aggregate key-path marker (`@` in `.@count`)
    At,

    /// End of input
    Eof,
}

impl Token {
    /// Short description used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Integer(n) => format!("number {}", n),
            Token::Float(n) => format!("number {}", n),
            Token::String(s) => format!("string '{}'", s),
            Token::Boolean(b) => format!("boolean {}", if *b { "YES" } else { "NO" }),
            Token::Nil => "NIL".to_string(),
            Token::Argument(v) => format!("argument of type {}", v.type_name()),
            Token::KeyPathArgument(path) => format!("key path argument '{}'", path.join(".")),
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::Variable(name) => format!("variable ${}", name),
            Token::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::And => "AND",
            Token::Or => "OR",
            Token::Not => "NOT",
            Token::Any => "ANY",
            Token::All => "ALL",
            Token::None => "NONE",
            Token::In => "IN",
            Token::Contains => "CONTAINS",
            Token::BeginsWith => "BEGINSWITH",
            Token::EndsWith => "ENDSWITH",
            Token::Matches => "MATCHES",
            Token::Like => "LIKE",
            Token::Between => "BETWEEN",
            Token::TruePredicate => "TRUEPREDICATE",
            Token::FalsePredicate => "FALSEPREDICATE",
            Token::SelfRef => "SELF",
            Token::Subquery => "SUBQUERY",
            Token::Function => "FUNCTION",
            Token::Cast => "CAST",
            Token::Eq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::StarStar => "**",
            Token::Slash => "/",
            Token::ColonEqual => ":=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::At => "@",
            _ => "?",
        }
    }
}
