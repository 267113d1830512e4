use std::fmt;

use crate::{
    ast::{ArithOp, Predicate},
    lexer::is_reserved_word,
    types::ValueType,
    value::{Value, seconds_since_reference},
};

/// Value-producing node of the syntax tree.
///
/// Trees are built once by the parser (or by the constructors below), optionally rewritten
/// in place by a [`crate::visit::Rewriter`], then handed read-only to the compiler.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Typed literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 'hello'
    /// YES
    /// nil
    /// %@
    /// ```
    Constant(Value),

    /// The evaluated object (`SELF`); also the implicit root of bare key paths.
    SelfObject,

    /// Variable reference (`$name`), stored without the `$`.
    Variable(String),

    /// Dotted member access
    ///
    /// # Examples
    /// ```text
    /// Author.Name            // root SELF, components [Author, Name]
    /// $user.Name             // root $user
    /// ```
    KeyPath {
        root: Box<Expr>,
        components: Vec<String>,
    },

    /// Built-in function or `FUNCTION(...)` selector call
    FunctionCall(FunctionCall),

    /// Literal finite collection (`{1, 2, 3}`)
    Aggregate(Vec<Expr>),

    /// Filtered view of a collection
    ///
    /// # Example
    /// ```text
    /// SUBQUERY(Tags, $t, $t.Name BEGINSWITH 'bug')
    /// ```
    Subquery {
        collection: Box<Expr>,
        variable: String,
        predicate: Box<Predicate>,
    },

    /// Negation (`-expr`)
    UnaryMinus(Box<Expr>),

    /// `+ - * / **`
    Arithmetic {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `[FIRST]`, `[LAST]`, `[SIZE]` or `[n]`
    Index {
        collection: Box<Expr>,
        index: IndexKind,
    },

    /// `CAST(expr, 'Type')`
    Cast { expr: Box<Expr>, to: ValueType },

    /// `$name := expr`
    Assignment { variable: String, value: Box<Expr> },
}

/// Bracket index applied to a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKind {
    First,
    Last,
    Size,
    At(Box<Expr>),
}

/// A call to something the compiler dispatches by name.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub callee: Callee,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    /// `NOW()`, `RANDOM()`, `SUM(...)`, ...; name stored upper-cased
    Builtin(String),
    /// `FUNCTION(target, 'selector:', ...)`; `target` is `None` for free selectors
    Selector {
        target: Option<Box<Expr>>,
        selector: String,
    },
}

impl Expr {
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    pub fn nil() -> Self {
        Expr::Constant(Value::Null)
    }

    /// Variable reference; a leading `$` is accepted and dropped.
    pub fn variable(name: impl Into<String>) -> Self {
        let name = name.into();
        Expr::Variable(name.strip_prefix('$').map(str::to_string).unwrap_or(name))
    }

    /// Key path rooted at the evaluated object, split on `.`.
    pub fn key_path(path: &str) -> Self {
        Expr::key_path_from(Expr::SelfObject, path.split('.').map(str::to_string).collect())
    }

    /// Key path rooted at an arbitrary expression. Appending to an existing key path
    /// extends it instead of nesting.
    pub fn key_path_from(root: Expr, components: Vec<String>) -> Self {
        match root {
            Expr::KeyPath {
                root,
                components: mut existing,
            } => {
                existing.extend(components);
                Expr::KeyPath {
                    root,
                    components: existing,
                }
            }
            root => Expr::KeyPath {
                root: Box::new(root),
                components,
            },
        }
    }

    pub fn function(name: &str, args: Vec<Expr>) -> Self {
        Expr::FunctionCall(FunctionCall {
            callee: Callee::Builtin(name.to_ascii_uppercase()),
            args,
        })
    }

    pub fn selector(target: Option<Expr>, selector: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::FunctionCall(FunctionCall {
            callee: Callee::Selector {
                target: target.map(Box::new),
                selector: selector.into(),
            },
            args,
        })
    }

    pub fn aggregate(items: Vec<Expr>) -> Self {
        Expr::Aggregate(items)
    }

    pub fn subquery(collection: Expr, variable: impl Into<String>, predicate: Predicate) -> Self {
        let variable = variable.into();
        Expr::Subquery {
            collection: Box::new(collection),
            variable: variable.strip_prefix('$').map(str::to_string).unwrap_or(variable),
            predicate: Box::new(predicate),
        }
    }

    pub fn negate(expr: Expr) -> Self {
        Expr::UnaryMinus(Box::new(expr))
    }

    pub fn arithmetic(op: ArithOp, left: Expr, right: Expr) -> Self {
        Expr::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn index(collection: Expr, index: IndexKind) -> Self {
        Expr::Index {
            collection: Box::new(collection),
            index,
        }
    }

    pub fn cast(expr: Expr, to: ValueType) -> Self {
        Expr::Cast {
            expr: Box::new(expr),
            to,
        }
    }

    pub fn assign(variable: impl Into<String>, value: Expr) -> Self {
        let variable = variable.into();
        Expr::Assignment {
            variable: variable.strip_prefix('$').map(str::to_string).unwrap_or(variable),
            value: Box::new(value),
        }
    }

    /// Operands that need parentheses when used as the root of a postfix access.
    fn needs_parens(&self) -> bool {
        // arithmetic and assignments already print their own parentheses
        matches!(self, Expr::UnaryMinus(_))
    }
}

fn write_component(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_reserved_word(name) {
        write!(f, "#{}", name)
    } else {
        write!(f, "{}", name)
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    if expr.needs_parens() {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Quote a string literal, reproducing the escapes the lexer understands.
pub(crate) fn write_string_literal(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

fn write_float(f: &mut fmt::Formatter<'_>, n: f64, cast: &str) -> fmt::Result {
    if !n.is_finite() {
        write!(f, "CAST('{}', '{}')", n, cast)
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{:.1}", n)
    } else {
        write!(f, "{}", n)
    }
}

/// Literal syntax for a constant value.
pub(crate) fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => write!(f, "nil"),
        Value::Boolean(b) => write!(f, "{}", if *b { "YES" } else { "NO" }),
        Value::F32(n) => write_float(f, *n as f64, "f32"),
        Value::F64(n) => write_float(f, *n, "NSNumber"),
        Value::Decimal(d) => write!(f, "CAST('{}', 'decimal')", d),
        Value::String(s) => write_string_literal(f, s),
        Value::Uuid(u) => write!(f, "CAST('{}', 'NSUUID')", u.hyphenated()),
        Value::Date(d) => {
            write!(f, "CAST(")?;
            write_float(f, seconds_since_reference(d), "NSNumber")?;
            write!(f, ", 'NSDate')")
        }
        Value::Data(_) => write!(f, "CAST('{}', 'NSData')", value.as_string()),
        Value::Array(items) => {
            write!(f, "{{")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_literal(f, item)?;
            }
            write!(f, "}}")
        }
        Value::Object(obj) => write!(f, "<{}>", obj.shape()),
        integer => write!(f, "{}", integer.as_string()),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(value) => write_literal(f, value),
            Expr::SelfObject => write!(f, "SELF"),
            Expr::Variable(name) => write!(f, "${}", name),
            Expr::KeyPath { root, components } => {
                let mut first = true;
                if **root != Expr::SelfObject {
                    write_operand(f, root)?;
                    first = false;
                }
                for component in components {
                    if !first {
                        write!(f, ".")?;
                    }
                    write_component(f, component)?;
                    first = false;
                }
                Ok(())
            }
            Expr::FunctionCall(call) => match &call.callee {
                Callee::Builtin(name) => {
                    write!(f, "{}(", name)?;
                    write_list(f, &call.args)?;
                    write!(f, ")")
                }
                Callee::Selector { target, selector } => {
                    write!(f, "FUNCTION(")?;
                    if let Some(target) = target {
                        write!(f, "{}, ", target)?;
                    }
                    write_string_literal(f, selector)?;
                    for arg in &call.args {
                        write!(f, ", {}", arg)?;
                    }
                    write!(f, ")")
                }
            },
            Expr::Aggregate(items) => {
                write!(f, "{{")?;
                write_list(f, items)?;
                write!(f, "}}")
            }
            Expr::Subquery {
                collection,
                variable,
                predicate,
            } => write!(f, "SUBQUERY({}, ${}, {})", collection, variable, predicate),
            Expr::UnaryMinus(expr) => write!(f, "-({})", expr),
            Expr::Arithmetic { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Index { collection, index } => {
                write_operand(f, collection)?;
                match index {
                    IndexKind::First => write!(f, "[FIRST]"),
                    IndexKind::Last => write!(f, "[LAST]"),
                    IndexKind::Size => write!(f, "[SIZE]"),
                    IndexKind::At(i) => write!(f, "[{}]", i),
                }
            }
            Expr::Cast { expr, to } => {
                write!(f, "CAST({}, '{}')", expr, to.cast_name().unwrap_or("NSString"))
            }
            Expr::Assignment { variable, value } => write!(f, "(${} := {})", variable, value),
        }
    }
}
