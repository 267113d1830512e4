use std::fmt;

use crate::ast::{ComparisonOp, ComparisonOptions, Expr, Modifier};

/// Boolean-producing node of the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `left op right`, optionally quantified and with option flags
    Comparison(Comparison),

    /// `AND`, `OR` or `NOT` over sub-predicates, in source order
    ///
    /// `Not` always carries exactly one sub-predicate; the compiler rejects anything else.
    Compound {
        kind: CompoundKind,
        subpredicates: Vec<Predicate>,
    },

    /// `TRUEPREDICATE` / `FALSEPREDICATE`
    Constant(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompoundKind {
    And,
    Or,
    Not,
}

/// A single comparison.
///
/// # Example
///
/// ```
/// use predicate_lang::{Comparison, ComparisonOp, ComparisonOptions, Expr, Modifier, Predicate};
///
/// // ANY Tags.Name BEGINSWITH[c] 'bug'
/// let p: Predicate = Comparison::new(
///     Expr::key_path("Tags.Name"),
///     ComparisonOp::BeginsWith,
///     Expr::constant("bug"),
/// )
/// .with_modifier(Modifier::Any)
/// .with_options(ComparisonOptions::CASE_INSENSITIVE)
/// .into();
///
/// assert_eq!(p.to_string(), "(ANY Tags.Name BEGINSWITH[c] \"bug\")");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: Expr,
    pub op: ComparisonOp,
    pub right: Expr,
    pub modifier: Modifier,
    pub options: ComparisonOptions,
}

impl Comparison {
    pub fn new(left: Expr, op: ComparisonOp, right: Expr) -> Self {
        Comparison {
            left,
            op,
            right,
            modifier: Modifier::Direct,
            options: ComparisonOptions::NONE,
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn with_options(mut self, options: ComparisonOptions) -> Self {
        self.options = options;
        self
    }
}

impl From<Comparison> for Predicate {
    fn from(c: Comparison) -> Self {
        Predicate::Comparison(c)
    }
}

macro_rules! comparison_constructors {
    ($($(#[$doc:meta])* $name:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(left: Expr, right: Expr) -> Self {
                Predicate::Comparison(Comparison::new(left, ComparisonOp::$op, right))
            }
        )*
    };
}

impl Predicate {
    comparison_constructors! {
        less_than => LessThan,
        less_than_or_equal_to => LessThanOrEqualTo,
        greater_than => GreaterThan,
        greater_than_or_equal_to => GreaterThanOrEqualTo,
        equal_to => EqualTo,
        not_equal_to => NotEqualTo,
        matches => Matches,
        like => Like,
        begins_with => BeginsWith,
        ends_with => EndsWith,
        is_in => In,
        contains => Contains,
        /// `right` must evaluate to a two-element collection.
        between => Between,
    }

    pub fn and(subpredicates: Vec<Predicate>) -> Self {
        Predicate::Compound {
            kind: CompoundKind::And,
            subpredicates,
        }
    }

    pub fn or(subpredicates: Vec<Predicate>) -> Self {
        Predicate::Compound {
            kind: CompoundKind::Or,
            subpredicates,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(subpredicate: Predicate) -> Self {
        Predicate::Compound {
            kind: CompoundKind::Not,
            subpredicates: vec![subpredicate],
        }
    }

    pub fn constant(value: bool) -> Self {
        Predicate::Constant(value)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        match self.modifier {
            Modifier::Direct => {}
            Modifier::All => write!(f, "ALL ")?,
            Modifier::Any => write!(f, "ANY ")?,
        }
        write!(
            f,
            "{} {}{} {})",
            self.left,
            self.op.symbol(),
            self.options,
            self.right
        )
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Comparison(c) => write!(f, "{}", c),
            Predicate::Constant(true) => write!(f, "TRUEPREDICATE"),
            Predicate::Constant(false) => write!(f, "FALSEPREDICATE"),
            Predicate::Compound {
                kind: CompoundKind::Not,
                subpredicates,
            } => match subpredicates.first() {
                Some(sub) => write!(f, "NOT {}", sub),
                None => write!(f, "NOT FALSEPREDICATE"),
            },
            Predicate::Compound {
                kind,
                subpredicates,
            } => {
                // Empty compounds compile to FALSEPREDICATE, so they format as one.
                if subpredicates.is_empty() {
                    return write!(f, "FALSEPREDICATE");
                }
                let joiner = if *kind == CompoundKind::And {
                    " AND "
                } else {
                    " OR "
                };
                write!(f, "(")?;
                for (i, sub) in subpredicates.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", joiner)?;
                    }
                    write!(f, "{}", sub)?;
                }
                write!(f, ")")
            }
        }
    }
}
