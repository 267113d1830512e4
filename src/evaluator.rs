use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use regex::{Regex, RegexBuilder};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use thiserror::Error;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{
    ast::{ArithOp, ComparisonOp},
    coerce::{self, CoercionError},
    compiler::Bindings,
    functions,
    ir::{Index, Node, Pattern, Quantifier, Step},
    resolve::MemberResolver,
    value::{Value, seconds_since_reference},
};

/// Runtime failure inside a compiled predicate or expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("selector '{selector}' not found on {receiver}")]
    SelectorNotFound {
        selector: String,
        receiver: &'static str,
    },

    #[error("expected a collection, found {found}")]
    NotACollection { found: &'static str },

    #[error("cannot read member '{member}' of {found}")]
    NotAnObject { member: String, found: &'static str },

    #[error("variable ${name} is not bound")]
    UnboundVariable { name: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow in '{op}'")]
    Overflow { op: &'static str },

    #[error("'{op}' is not defined for {left} and {right}")]
    UnsupportedOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("'{op}' is not defined for {found}")]
    UnsupportedOperand {
        op: &'static str,
        found: &'static str,
    },

    #[error("{op} is not defined for nil operands")]
    NullOperand { op: &'static str },

    #[error("BETWEEN needs a two-element collection, found {found} elements")]
    BetweenShape { found: usize },

    #[error("index {index} out of bounds for collection of {len} elements")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

/// Interprets a compiled [`Node`] graph against one evaluated object.
///
/// Local names (subquery variables, quantifier elements, `:=` assignments) live on a stack
/// that is unwound when the construct that introduced them finishes.
pub(crate) struct Evaluator<'a> {
    current: &'a Value,
    bindings: &'a Bindings,
    overrides: Option<&'a Bindings>,
    resolver: &'a dyn MemberResolver,
    locals: Vec<(String, Value)>,
}

impl<'a> Evaluator<'a> {
    pub fn new(current: &'a Value, bindings: &'a Bindings, resolver: &'a dyn MemberResolver) -> Self {
        Evaluator {
            current,
            bindings,
            overrides: None,
            resolver,
            locals: Vec::new(),
        }
    }

    /// Bindings consulted before the compile-time ones, for this evaluation only.
    pub fn with_overrides(mut self, overrides: &'a Bindings) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn eval_bool(&mut self, node: &Node) -> Result<bool, EvaluationError> {
        Ok(self.eval(node)?.as_bool())
    }

    pub fn eval(&mut self, node: &Node) -> Result<Value, EvaluationError> {
        match node {
            Node::Const(value) => Ok(value.clone()),
            Node::Current => Ok(self.current.clone()),
            Node::Variable(name) => self.lookup(name),
            Node::KeyPath {
                root,
                steps,
                default,
            } => {
                let root = self.eval(root)?;
                self.walk(root, steps, default)
            }
            Node::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::Array(values))
            }
            Node::Subquery {
                collection,
                variable,
                predicate,
            } => {
                let items = collection_items(self.eval(collection)?)?;
                let mut matching = Vec::new();
                for item in items {
                    let keep = self.with_local(variable, item.clone(), |ev| {
                        ev.eval_bool(predicate)
                    })?;
                    if keep {
                        matching.push(item);
                    }
                }
                Ok(Value::Array(matching))
            }
            Node::Negate(node) => negate(self.eval(node)?),
            Node::Arithmetic { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                arithmetic(*op, left, right)
            }
            Node::Index { collection, index } => {
                let collection = self.eval(collection)?;
                self.eval_index(collection, index)
            }
            Node::Cast { node, to } => Ok(coerce::cast_value(self.eval(node)?, to)?),
            Node::Assign { variable, value } => {
                let value = self.eval(value)?;
                self.locals.push((variable.clone(), value.clone()));
                Ok(value)
            }
            Node::Call { function, args } => {
                let args = self.eval_all(args)?;
                functions::call(*function, args)
            }
            Node::Invoke {
                target,
                method,
                args,
            } => {
                let target = self.eval(target)?;
                let args = self.eval_all(args)?;
                functions::invoke(*method, target, args)
            }
            Node::Compare {
                op,
                left,
                right,
                null_safe,
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                compare(*op, left, right, *null_safe).map(Value::Boolean)
            }
            Node::Match {
                subject,
                pattern,
                null_safe,
            } => {
                let subject = self.eval(subject)?;
                self.eval_match(subject, pattern, *null_safe)
                    .map(Value::Boolean)
            }
            Node::Quantified {
                quantifier,
                collection,
                variable,
                body,
            } => {
                let items = collection_items(self.eval(collection)?)?;
                for item in items {
                    let satisfied = self.with_local(variable, item, |ev| ev.eval_bool(body))?;
                    match (quantifier, satisfied) {
                        (Quantifier::Any, true) => return Ok(Value::Boolean(true)),
                        (Quantifier::All, false) => return Ok(Value::Boolean(false)),
                        _ => {}
                    }
                }
                Ok(Value::Boolean(*quantifier == Quantifier::All))
            }
            Node::And(items) => {
                for item in items {
                    if !self.eval_bool(item)? {
                        return Ok(Value::Boolean(false));
                    }
                }
                Ok(Value::Boolean(true))
            }
            Node::Or(items) => {
                for item in items {
                    if self.eval_bool(item)? {
                        return Ok(Value::Boolean(true));
                    }
                }
                Ok(Value::Boolean(false))
            }
            Node::Not(node) => Ok(Value::Boolean(!self.eval_bool(node)?)),
            Node::Fold {
                node,
                case,
                diacritic,
            } => Ok(fold(self.eval(node)?, *case, *diacritic)),
        }
    }

    fn eval_all(&mut self, nodes: &[Node]) -> Result<Vec<Value>, EvaluationError> {
        nodes.iter().map(|node| self.eval(node)).collect()
    }

    fn with_local<T>(
        &mut self,
        name: &str,
        value: Value,
        f: impl FnOnce(&mut Self) -> Result<T, EvaluationError>,
    ) -> Result<T, EvaluationError> {
        let mark = self.locals.len();
        self.locals.push((name.to_string(), value));
        let result = f(self);
        self.locals.truncate(mark);
        result
    }

    fn lookup(&self, name: &str) -> Result<Value, EvaluationError> {
        if let Some((_, value)) = self.locals.iter().rev().find(|(local, _)| local == name) {
            return Ok(value.clone());
        }
        self.overrides
            .and_then(|overrides| overrides.get(name))
            .or_else(|| self.bindings.get(name))
            .cloned()
            .ok_or_else(|| EvaluationError::UnboundVariable {
                name: name.to_string(),
            })
    }

    // ========================================
    // Key paths and indexing
    // ========================================

    /// Follow `steps` from `value`. An absent link anywhere yields `default`.
    fn walk(&self, mut value: Value, steps: &[Step], default: &Value) -> Result<Value, EvaluationError> {
        for step in steps {
            if value.is_null() {
                return Ok(default.clone());
            }
            value = self.step(value, step)?;
        }
        if value.is_null() {
            return Ok(default.clone());
        }
        Ok(value)
    }

    fn step(&self, value: Value, step: &Step) -> Result<Value, EvaluationError> {
        match value {
            Value::Object(object) => {
                let found = match step {
                    Step::Member(member) => member.get(object.as_ref()),
                    Step::Dynamic(name) => self
                        .resolver
                        .resolve(object.shape(), name)
                        .and_then(|member| member.get(object.as_ref())),
                };
                Ok(found.unwrap_or(Value::Null))
            }
            // Key paths through collections map over the elements.
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Null => Ok(Value::Null),
                    item => self.step(item, step),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(EvaluationError::NotAnObject {
                member: step.name().to_string(),
                found: other.type_name(),
            }),
        }
    }

    fn eval_index(&mut self, collection: Value, index: &Index) -> Result<Value, EvaluationError> {
        match (collection, index) {
            (Value::Null, Index::Size) => Ok(Value::I64(0)),
            (Value::Null, _) => Ok(Value::Null),
            (Value::Array(items), Index::First) => {
                Ok(items.into_iter().next().unwrap_or(Value::Null))
            }
            (Value::Array(items), Index::Last) => Ok(items.into_iter().last().unwrap_or(Value::Null)),
            (Value::Array(items), Index::Size) => Ok(Value::I64(items.len() as i64)),
            (Value::String(s), Index::Size) => Ok(Value::I64(s.chars().count() as i64)),
            (Value::Array(items), Index::At(at)) => {
                let at = self.eval(at)?;
                let index = at.as_i64().ok_or(EvaluationError::UnsupportedOperand {
                    op: "[]",
                    found: at.type_name(),
                })?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .ok_or(EvaluationError::IndexOutOfBounds {
                        index,
                        len: items.len(),
                    })
            }
            (Value::Object(object), Index::At(at)) => match self.eval(at)? {
                Value::String(name) => Ok(self
                    .resolver
                    .resolve(object.shape(), &name)
                    .and_then(|member| member.get(object.as_ref()))
                    .unwrap_or(Value::Null)),
                other => Err(EvaluationError::UnsupportedOperands {
                    op: "[]",
                    left: "object",
                    right: other.type_name(),
                }),
            },
            (other, _) => Err(EvaluationError::NotACollection {
                found: other.type_name(),
            }),
        }
    }

    // ========================================
    // Pattern matching
    // ========================================

    fn eval_match(
        &mut self,
        subject: Value,
        pattern: &Pattern,
        null_safe: bool,
    ) -> Result<bool, EvaluationError> {
        let op = match pattern {
            Pattern::Compiled { glob: true, .. } | Pattern::Dynamic { glob: true, .. } => "LIKE",
            _ => "MATCHES",
        };
        let text = match subject {
            Value::String(text) => text,
            Value::Null if null_safe => return Ok(false),
            Value::Null => return Err(EvaluationError::NullOperand { op }),
            other => {
                return Err(EvaluationError::UnsupportedOperand {
                    op,
                    found: other.type_name(),
                });
            }
        };

        match pattern {
            Pattern::Compiled { regex, .. } => Ok(regex.is_match(&text)),
            Pattern::Dynamic {
                node,
                glob,
                case_insensitive,
            } => match self.eval(node)? {
                Value::String(source) => {
                    let regex = build_pattern(&source, *glob, *case_insensitive).map_err(|e| {
                        EvaluationError::InvalidPattern {
                            pattern: source.clone(),
                            message: e.to_string(),
                        }
                    })?;
                    Ok(regex.is_match(&text))
                }
                Value::Null if null_safe => Ok(false),
                Value::Null => Err(EvaluationError::NullOperand { op }),
                other => Err(EvaluationError::UnsupportedOperands {
                    op,
                    left: "string",
                    right: other.type_name(),
                }),
            },
        }
    }
}

/// Compile a `MATCHES` regex or `LIKE` glob. Both must match the whole subject.
pub(crate) fn build_pattern(
    source: &str,
    glob: bool,
    case_insensitive: bool,
) -> Result<Regex, regex::Error> {
    let body = if glob {
        let mut body = String::with_capacity(source.len() * 2);
        let mut chars = source.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '*' => body.push_str(".*"),
                '?' => body.push('.'),
                '\\' => match chars.next() {
                    Some(escaped) => body.push_str(&regex::escape(&escaped.to_string())),
                    None => body.push_str(r"\\"),
                },
                other => body.push_str(&regex::escape(&other.to_string())),
            }
        }
        body
    } else {
        source.to_string()
    };
    RegexBuilder::new(&format!("^(?:{})$", body))
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(glob)
        .build()
}

fn collection_items(value: Value) -> Result<Vec<Value>, EvaluationError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(EvaluationError::NotACollection {
            found: other.type_name(),
        }),
    }
}

// ========================================
// Folding
// ========================================

/// Letters whose accent is a stroke or ligature rather than a combining mark, so canonical
/// decomposition leaves them whole.
fn undecomposable_base(ch: char) -> Option<&'static str> {
    Some(match ch {
        'Ø' => "O",
        'ø' => "o",
        'Ł' => "L",
        'ł' => "l",
        'Đ' | 'Ð' => "D",
        'đ' | 'ð' => "d",
        'Ħ' => "H",
        'ħ' => "h",
        'ı' => "i",
        'Æ' => "AE",
        'æ' => "ae",
        'Œ' => "OE",
        'œ' => "oe",
        'Þ' => "TH",
        'þ' => "th",
        'ß' => "ss",
        _ => return None,
    })
}

pub(crate) fn fold_text(text: &str, case: bool, diacritic: bool) -> String {
    let stripped: String = if diacritic {
        let mut bare = String::with_capacity(text.len());
        for ch in text.nfd().filter(|c| !is_combining_mark(*c)) {
            match undecomposable_base(ch) {
                Some(base) => bare.push_str(base),
                None => bare.push(ch),
            }
        }
        // decomposition also splits characters without marks, such as Hangul syllables
        bare.nfc().collect()
    } else {
        text.to_string()
    };
    if case {
        stripped.to_lowercase()
    } else {
        stripped
    }
}

pub(crate) fn fold(value: Value, case: bool, diacritic: bool) -> Value {
    match value {
        Value::String(s) => Value::String(fold_text(&s, case, diacritic)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| fold(item, case, diacritic))
                .collect(),
        ),
        other => other,
    }
}

// ========================================
// Comparison
// ========================================

fn exact_integer(value: &Value) -> Option<i128> {
    match value {
        Value::U8(n) => Some(*n as i128),
        Value::I8(n) => Some(*n as i128),
        Value::U16(n) => Some(*n as i128),
        Value::I16(n) => Some(*n as i128),
        Value::U32(n) => Some(*n as i128),
        Value::I32(n) => Some(*n as i128),
        Value::U64(n) => Some(*n as i128),
        Value::I64(n) => Some(*n as i128),
        _ => None,
    }
}

/// Ordering of two values of compatible types; `None` when they have no natural order.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
        (Value::Data(a), Value::Data(b)) => Some(a.cmp(b)),
        (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
        _ => match (exact_integer(a), exact_integer(b)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loosely_equal(x, y))
        }
        _ if a == b => true,
        _ if a.value_type().is_numeric() && b.value_type().is_numeric() => {
            compare_values(a, b) == Some(Ordering::Equal)
        }
        _ => false,
    }
}

/// Equality after runtime coercion; values that cannot be reconciled are simply unequal.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    coerce::reconcile(a.clone(), b.clone())
        .map(|(a, b)| values_equal(&a, &b))
        .unwrap_or(false)
}

fn ordered(op: ComparisonOp, left: Value, right: Value) -> Result<Option<Ordering>, EvaluationError> {
    let (left, right) = coerce::reconcile(left, right)?;
    if left.is_null() || right.is_null() {
        return Ok(None);
    }
    compare_values(&left, &right)
        .map(Some)
        .ok_or(EvaluationError::UnsupportedOperands {
            op: op.symbol(),
            left: left.type_name(),
            right: right.type_name(),
        })
}

fn text_operands(
    op: ComparisonOp,
    left: Value,
    right: Value,
    null_safe: bool,
) -> Result<Option<(String, String)>, EvaluationError> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(Some((a, b))),
        (Value::Null, _) | (_, Value::Null) if null_safe => Ok(None),
        (Value::Null, _) | (_, Value::Null) => Err(EvaluationError::NullOperand { op: op.symbol() }),
        (a, b) => Err(EvaluationError::UnsupportedOperands {
            op: op.symbol(),
            left: a.type_name(),
            right: b.type_name(),
        }),
    }
}

fn contains(
    op: ComparisonOp,
    haystack: Value,
    needle: Value,
    null_safe: bool,
) -> Result<bool, EvaluationError> {
    match haystack {
        Value::Array(items) => Ok(items.iter().any(|item| loosely_equal(item, &needle))),
        Value::String(_) => {
            Ok(text_operands(op, haystack, needle, null_safe)?.is_some_and(|(h, n)| h.contains(&n)))
        }
        Value::Null if null_safe => Ok(false),
        Value::Null => Err(EvaluationError::NullOperand { op: op.symbol() }),
        other => Err(EvaluationError::UnsupportedOperands {
            op: op.symbol(),
            left: other.type_name(),
            right: needle.type_name(),
        }),
    }
}

/// Evaluate one comparison operator over two already evaluated operands.
pub(crate) fn compare(
    op: ComparisonOp,
    left: Value,
    right: Value,
    null_safe: bool,
) -> Result<bool, EvaluationError> {
    match op {
        ComparisonOp::EqualTo => {
            let (left, right) = coerce::reconcile(left, right)?;
            Ok(values_equal(&left, &right))
        }
        ComparisonOp::NotEqualTo => {
            let (left, right) = coerce::reconcile(left, right)?;
            Ok(!values_equal(&left, &right))
        }
        ComparisonOp::LessThan => Ok(ordered(op, left, right)?.is_some_and(Ordering::is_lt)),
        ComparisonOp::LessThanOrEqualTo => Ok(ordered(op, left, right)?.is_some_and(Ordering::is_le)),
        ComparisonOp::GreaterThan => Ok(ordered(op, left, right)?.is_some_and(Ordering::is_gt)),
        ComparisonOp::GreaterThanOrEqualTo => {
            Ok(ordered(op, left, right)?.is_some_and(Ordering::is_ge))
        }
        ComparisonOp::BeginsWith => Ok(text_operands(op, left, right, null_safe)?
            .is_some_and(|(text, prefix)| text.starts_with(&prefix))),
        ComparisonOp::EndsWith => Ok(text_operands(op, left, right, null_safe)?
            .is_some_and(|(text, suffix)| text.ends_with(&suffix))),
        ComparisonOp::In => contains(op, right, left, null_safe),
        ComparisonOp::Contains => contains(op, left, right, null_safe),
        ComparisonOp::Between => match right {
            Value::Array(bounds) if bounds.len() == 2 => {
                let mut bounds = bounds.into_iter();
                let (lower, upper) = match (bounds.next(), bounds.next()) {
                    (Some(lower), Some(upper)) => (lower, upper),
                    _ => return Err(EvaluationError::BetweenShape { found: 0 }),
                };
                let above = ordered(op, left.clone(), lower)?.is_some_and(Ordering::is_ge);
                Ok(above && ordered(op, left, upper)?.is_some_and(Ordering::is_le))
            }
            Value::Array(bounds) => Err(EvaluationError::BetweenShape {
                found: bounds.len(),
            }),
            Value::Null if null_safe => Ok(false),
            other => Err(EvaluationError::UnsupportedOperands {
                op: op.symbol(),
                left: left.type_name(),
                right: other.type_name(),
            }),
        },
        ComparisonOp::Matches | ComparisonOp::Like => {
            match text_operands(op, left, right, null_safe)? {
                Some((text, source)) => {
                    let glob = op == ComparisonOp::Like;
                    let regex = build_pattern(&source, glob, false).map_err(|e| {
                        EvaluationError::InvalidPattern {
                            pattern: source.clone(),
                            message: e.to_string(),
                        }
                    })?;
                    Ok(regex.is_match(&text))
                }
                None => Ok(false),
            }
        }
    }
}

// ========================================
// Arithmetic
// ========================================

/// Numeric operation after both operands are coerced to one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Numeric {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Remainder,
}

impl Numeric {
    fn symbol(&self) -> &'static str {
        match self {
            Numeric::Add => "+",
            Numeric::Subtract => "-",
            Numeric::Multiply => "*",
            Numeric::Divide => "/",
            Numeric::Power => "**",
            Numeric::Remainder => "%",
        }
    }
}

impl From<ArithOp> for Numeric {
    fn from(op: ArithOp) -> Self {
        match op {
            ArithOp::Add => Numeric::Add,
            ArithOp::Subtract => Numeric::Subtract,
            ArithOp::Multiply => Numeric::Multiply,
            ArithOp::Divide => Numeric::Divide,
            ArithOp::Power => Numeric::Power,
        }
    }
}

/// Date shifted by a (possibly fractional) number of seconds.
pub(crate) fn shift_date(date: &DateTime<Utc>, seconds: f64) -> Result<DateTime<Utc>, EvaluationError> {
    let micros = (seconds * 1_000_000.0).round();
    if !micros.is_finite() || micros.abs() > i64::MAX as f64 {
        return Err(EvaluationError::Overflow { op: "+" });
    }
    date.checked_add_signed(Duration::microseconds(micros as i64))
        .ok_or(EvaluationError::Overflow { op: "+" })
}

/// `+ - * / **` with string concatenation and date offsets. `nil` operands yield `nil`.
pub(crate) fn arithmetic(op: ArithOp, left: Value, right: Value) -> Result<Value, EvaluationError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    match (op, &left, &right) {
        (ArithOp::Add, Value::String(a), b) => {
            return Ok(Value::String(format!("{}{}", a, b.as_string())));
        }
        (ArithOp::Add, a, Value::String(b)) => {
            return Ok(Value::String(format!("{}{}", a.as_string(), b)));
        }
        (ArithOp::Add, Value::Date(date), offset) | (ArithOp::Add, offset, Value::Date(date))
            if offset.as_f64().is_some() =>
        {
            let seconds = offset.as_f64().unwrap_or_default();
            return shift_date(date, seconds).map(Value::Date);
        }
        (ArithOp::Subtract, Value::Date(date), offset) if offset.as_f64().is_some() => {
            let seconds = offset.as_f64().unwrap_or_default();
            return shift_date(date, -seconds).map(Value::Date);
        }
        (ArithOp::Subtract, Value::Date(a), Value::Date(b)) => {
            return Ok(Value::F64(seconds_since_reference(a) - seconds_since_reference(b)));
        }
        _ => {}
    }

    numeric(op.into(), left, right)
}

macro_rules! integer_op {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {{
        let (a, b) = ($a, $b);
        let result = match $op {
            Numeric::Add => a.checked_add(b),
            Numeric::Subtract => a.checked_sub(b),
            Numeric::Multiply => a.checked_mul(b),
            Numeric::Divide | Numeric::Remainder if b == 0 => {
                return Err(EvaluationError::DivisionByZero);
            }
            Numeric::Divide => a.checked_div(b),
            Numeric::Remainder => a.checked_rem(b),
            Numeric::Power => {
                let exponent = i128::from(b);
                if exponent < 0 {
                    return Ok(Value::F64((a as f64).powf(exponent as f64)));
                }
                u32::try_from(exponent).ok().and_then(|e| a.checked_pow(e))
            }
        };
        result
            .map(Value::$variant)
            .ok_or(EvaluationError::Overflow { op: $op.symbol() })
    }};
}

macro_rules! float_op {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {{
        let (a, b) = ($a, $b);
        match $op {
            Numeric::Divide | Numeric::Remainder if b == 0.0 => Err(EvaluationError::DivisionByZero),
            Numeric::Add => Ok(Value::$variant(a + b)),
            Numeric::Subtract => Ok(Value::$variant(a - b)),
            Numeric::Multiply => Ok(Value::$variant(a * b)),
            Numeric::Divide => Ok(Value::$variant(a / b)),
            Numeric::Remainder => Ok(Value::$variant(a % b)),
            Numeric::Power => Ok(Value::$variant(a.powf(b))),
        }
    }};
}

fn decimal_op(op: Numeric, a: Decimal, b: Decimal) -> Result<Value, EvaluationError> {
    let result = match op {
        Numeric::Add => a.checked_add(b),
        Numeric::Subtract => a.checked_sub(b),
        Numeric::Multiply => a.checked_mul(b),
        Numeric::Divide | Numeric::Remainder if b.is_zero() => {
            return Err(EvaluationError::DivisionByZero);
        }
        Numeric::Divide => a.checked_div(b),
        Numeric::Remainder => a.checked_rem(b),
        Numeric::Power => match (a.to_f64(), b.to_f64()) {
            (Some(a), Some(b)) => Decimal::try_from(a.powf(b)).ok(),
            _ => None,
        },
    };
    result
        .map(Value::Decimal)
        .ok_or(EvaluationError::Overflow { op: op.symbol() })
}

/// Apply `op` after coercing both operands to their common numeric type.
pub(crate) fn numeric(op: Numeric, left: Value, right: Value) -> Result<Value, EvaluationError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let is_number = |v: &Value| v.as_f64().is_some();
    if !is_number(&left) || !is_number(&right) {
        return Err(EvaluationError::UnsupportedOperands {
            op: op.symbol(),
            left: left.type_name(),
            right: right.type_name(),
        });
    }

    let (left, right) = coerce::reconcile(left, right)?;
    match (left, right) {
        (Value::U8(a), Value::U8(b)) => integer_op!(op, a, b, U8),
        (Value::I8(a), Value::I8(b)) => integer_op!(op, a, b, I8),
        (Value::U16(a), Value::U16(b)) => integer_op!(op, a, b, U16),
        (Value::I16(a), Value::I16(b)) => integer_op!(op, a, b, I16),
        (Value::U32(a), Value::U32(b)) => integer_op!(op, a, b, U32),
        (Value::I32(a), Value::I32(b)) => integer_op!(op, a, b, I32),
        (Value::U64(a), Value::U64(b)) => integer_op!(op, a, b, U64),
        (Value::I64(a), Value::I64(b)) => integer_op!(op, a, b, I64),
        (Value::F32(a), Value::F32(b)) => float_op!(op, a, b, F32),
        (Value::F64(a), Value::F64(b)) => float_op!(op, a, b, F64),
        (Value::Decimal(a), Value::Decimal(b)) => decimal_op(op, a, b),
        (a, b) => Err(EvaluationError::UnsupportedOperands {
            op: op.symbol(),
            left: a.type_name(),
            right: b.type_name(),
        }),
    }
}

pub(crate) fn negate(value: Value) -> Result<Value, EvaluationError> {
    let overflow = EvaluationError::Overflow { op: "-" };
    match value {
        Value::Null => Ok(Value::Null),
        Value::I8(n) => n.checked_neg().map(Value::I8).ok_or(overflow),
        Value::I16(n) => n.checked_neg().map(Value::I16).ok_or(overflow),
        Value::I32(n) => n.checked_neg().map(Value::I32).ok_or(overflow),
        Value::I64(n) => n.checked_neg().map(Value::I64).ok_or(overflow),
        Value::U8(n) => Ok(Value::I64(-(n as i64))),
        Value::U16(n) => Ok(Value::I64(-(n as i64))),
        Value::U32(n) => Ok(Value::I64(-(n as i64))),
        Value::U64(n) => i64::try_from(n)
            .map(|n| Value::I64(-n))
            .map_err(|_| overflow),
        Value::F32(n) => Ok(Value::F32(-n)),
        Value::F64(n) => Ok(Value::F64(-n)),
        Value::Decimal(d) => Ok(Value::Decimal(-d)),
        other => Err(EvaluationError::UnsupportedOperand {
            op: "-",
            found: other.type_name(),
        }),
    }
}
