use std::{fmt, ops::BitOr};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// Less than (`<`)
    LessThan,
    /// Less than or equal (`<=`)
    LessThanOrEqualTo,
    /// Greater than (`>`)
    GreaterThan,
    /// Greater than or equal (`>=`)
    GreaterThanOrEqualTo,
    /// Equal (`==`)
    EqualTo,
    /// Not equal (`!=`)
    NotEqualTo,
    /// Regular expression match (`MATCHES`)
    Matches,
    /// Glob match with `*` and `?` (`LIKE`)
    Like,
    BeginsWith,
    EndsWith,
    /// Left operand is an element of the right collection, or a substring of the right string
    In,
    /// Right operand is an element of the left collection, or a substring of the left string
    Contains,
    /// Inclusive range test against a two-element right operand
    Between,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanOrEqualTo => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanOrEqualTo => ">=",
            ComparisonOp::EqualTo => "==",
            ComparisonOp::NotEqualTo => "!=",
            ComparisonOp::Matches => "MATCHES",
            ComparisonOp::Like => "LIKE",
            ComparisonOp::BeginsWith => "BEGINSWITH",
            ComparisonOp::EndsWith => "ENDSWITH",
            ComparisonOp::In => "IN",
            ComparisonOp::Contains => "CONTAINS",
            ComparisonOp::Between => "BETWEEN",
        }
    }

    /// Operators that only make sense over strings.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            ComparisonOp::Matches
                | ComparisonOp::Like
                | ComparisonOp::BeginsWith
                | ComparisonOp::EndsWith
        )
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Exponentiation (`**`), right-associative
    Power,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Subtract => "-",
            ArithOp::Multiply => "*",
            ArithOp::Divide => "/",
            ArithOp::Power => "**",
        }
    }
}

/// Quantifier applied when the left side of a comparison is a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Modifier {
    /// Compare the operands as they are
    #[default]
    Direct,
    /// Every element must satisfy the comparison
    All,
    /// At least one element must satisfy the comparison
    Any,
}

/// Comparison option flags, written as a bracketed suffix: `==[cd]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComparisonOptions(u8);

impl ComparisonOptions {
    pub const NONE: ComparisonOptions = ComparisonOptions(0);
    /// `c`
    pub const CASE_INSENSITIVE: ComparisonOptions = ComparisonOptions(0x01);
    /// `d`
    pub const DIACRITIC_INSENSITIVE: ComparisonOptions = ComparisonOptions(0x02);
    /// `n`: operands are already normalized, folding is skipped
    pub const NORMALIZED: ComparisonOptions = ComparisonOptions(0x04);

    pub fn contains(&self, other: ComparisonOptions) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn case_insensitive(&self) -> bool {
        self.contains(Self::CASE_INSENSITIVE)
    }

    pub fn diacritic_insensitive(&self) -> bool {
        self.contains(Self::DIACRITIC_INSENSITIVE)
    }

    pub fn normalized(&self) -> bool {
        self.contains(Self::NORMALIZED)
    }

    /// Parse the letters between the brackets. `None` on an unknown letter.
    pub fn from_letters(letters: &str) -> Option<Self> {
        let mut options = Self::NONE;
        for ch in letters.chars() {
            options = options
                | match ch.to_ascii_lowercase() {
                    'c' => Self::CASE_INSENSITIVE,
                    'd' => Self::DIACRITIC_INSENSITIVE,
                    'n' => Self::NORMALIZED,
                    _ => return None,
                };
        }
        Some(options)
    }
}

impl BitOr for ComparisonOptions {
    type Output = ComparisonOptions;

    fn bitor(self, rhs: Self) -> Self::Output {
        ComparisonOptions(self.0 | rhs.0)
    }
}

impl fmt::Display for ComparisonOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "[")?;
        if self.case_insensitive() {
            write!(f, "c")?;
        }
        if self.diacritic_insensitive() {
            write!(f, "d")?;
        }
        if self.normalized() {
            write!(f, "n")?;
        }
        write!(f, "]")
    }
}
