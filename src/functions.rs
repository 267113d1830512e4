//! Built-in functions and selector dispatch.
//!
//! Free functions (`NOW()`, `SUM(...)`, `FUNCTION('modulus:by:', a, b)`) lower to
//! [`Function`]; selectors sent to a target (`FUNCTION(date, 'dateByAddingDays:', 2)`) lower to
//! [`Method`]. Names and arities are checked by the compiler, so the dispatch here only
//! deals with runtime values.

use std::{cmp::Ordering, fmt};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    ast::ArithOp,
    coerce,
    evaluator::{self, EvaluationError, Numeric},
    types::ValueType,
    value::{Value, seconds_since_reference},
};

/// Number of arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == *n,
            Arity::AtLeast(n) => count >= *n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Now,
    Random,
    Count,
    Sum,
    Average,
    Min,
    Max,
    Abs,
    Sqrt,
    Lowercase,
    Uppercase,
    /// `add:to:`
    Add,
    /// `from:subtract:`
    Subtract,
    /// `multiply:by:`
    Multiply,
    /// `divide:by:`
    Divide,
    /// `modulus:by:`
    Modulus,
}

impl Function {
    /// Built-in called by name, e.g. `NOW()`. `name` must already be upper-cased.
    pub fn from_builtin(name: &str) -> Option<Self> {
        let function = match name {
            "NOW" => Function::Now,
            "RANDOM" => Function::Random,
            "COUNT" => Function::Count,
            "SUM" => Function::Sum,
            "AVERAGE" | "AVG" => Function::Average,
            "MIN" => Function::Min,
            "MAX" => Function::Max,
            "ABS" => Function::Abs,
            "SQRT" => Function::Sqrt,
            "LOWERCASE" => Function::Lowercase,
            "UPPERCASE" => Function::Uppercase,
            _ => return None,
        };
        Some(function)
    }

    /// Targetless selector, e.g. `FUNCTION('modulus:by:', 10, 7)`.
    pub fn from_selector(selector: &str) -> Option<Self> {
        let function = match selector {
            "now" => Function::Now,
            "random" => Function::Random,
            "count:" => Function::Count,
            "sum:" => Function::Sum,
            "average:" => Function::Average,
            "min:" => Function::Min,
            "max:" => Function::Max,
            "abs:" => Function::Abs,
            "sqrt:" => Function::Sqrt,
            "lowercase:" => Function::Lowercase,
            "uppercase:" => Function::Uppercase,
            "add:to:" => Function::Add,
            "from:subtract:" => Function::Subtract,
            "multiply:by:" => Function::Multiply,
            "divide:by:" => Function::Divide,
            "modulus:by:" => Function::Modulus,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Now => "now",
            Function::Random => "random",
            Function::Count => "count",
            Function::Sum => "sum",
            Function::Average => "average",
            Function::Min => "min",
            Function::Max => "max",
            Function::Abs => "abs",
            Function::Sqrt => "sqrt",
            Function::Lowercase => "lowercase",
            Function::Uppercase => "uppercase",
            Function::Add => "add",
            Function::Subtract => "subtract",
            Function::Multiply => "multiply",
            Function::Divide => "divide",
            Function::Modulus => "modulus",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Function::Now | Function::Random => Arity::Exact(0),
            Function::Count
            | Function::Sum
            | Function::Average
            | Function::Min
            | Function::Max => Arity::AtLeast(1),
            Function::Abs | Function::Sqrt | Function::Lowercase | Function::Uppercase => {
                Arity::Exact(1)
            }
            Function::Add
            | Function::Subtract
            | Function::Multiply
            | Function::Divide
            | Function::Modulus => Arity::Exact(2),
        }
    }

    /// Aggregates reduce a single collection argument, or their argument list.
    pub fn is_aggregate(&self) -> bool {
        matches!(self.arity(), Arity::AtLeast(_))
    }

    /// Static result type given the static argument types.
    pub fn result_type(&self, args: &[ValueType]) -> ValueType {
        let element = match args {
            [ValueType::Collection(element)] => (**element).clone(),
            [single] => single.clone(),
            _ => ValueType::Any,
        };
        match self {
            Function::Now => ValueType::Date,
            Function::Random | Function::Count => ValueType::I64,
            Function::Sqrt => ValueType::F64,
            Function::Lowercase | Function::Uppercase => ValueType::String,
            Function::Min | Function::Max => element,
            Function::Sum if element.is_numeric() => element,
            Function::Average if *element.underlying() == ValueType::Decimal => ValueType::Decimal,
            Function::Average if element.is_numeric() => ValueType::F64,
            Function::Abs if args.first().is_some_and(ValueType::is_numeric) => args[0].clone(),
            _ => ValueType::Any,
        }
    }
}

/// Selector sent to a target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    DateByAddingDays,
    DateByAddingHours,
    DateByAddingMinutes,
    DateByAddingSeconds,
    TimeIntervalSinceReferenceDate,
    LowercaseString,
    UppercaseString,
    Length,
    StringByAppendingString,
    StringValue,
    DoubleValue,
    IntegerValue,
    Count,
}

/// Kind of value a [`Method`] can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Receiver {
    Date,
    String,
    Number,
    Collection,
}

impl Method {
    pub fn from_selector(selector: &str) -> Option<Self> {
        let method = match selector {
            "dateByAddingDays:" => Method::DateByAddingDays,
            "dateByAddingHours:" => Method::DateByAddingHours,
            "dateByAddingMinutes:" => Method::DateByAddingMinutes,
            "dateByAddingSeconds:" | "dateByAddingTimeInterval:" => Method::DateByAddingSeconds,
            "timeIntervalSinceReferenceDate" => Method::TimeIntervalSinceReferenceDate,
            "lowercaseString" => Method::LowercaseString,
            "uppercaseString" => Method::UppercaseString,
            "length" => Method::Length,
            "stringByAppendingString:" => Method::StringByAppendingString,
            "stringValue" => Method::StringValue,
            "doubleValue" => Method::DoubleValue,
            "integerValue" => Method::IntegerValue,
            "count" => Method::Count,
            _ => return None,
        };
        Some(method)
    }

    pub fn selector(&self) -> &'static str {
        match self {
            Method::DateByAddingDays => "dateByAddingDays:",
            Method::DateByAddingHours => "dateByAddingHours:",
            Method::DateByAddingMinutes => "dateByAddingMinutes:",
            Method::DateByAddingSeconds => "dateByAddingSeconds:",
            Method::TimeIntervalSinceReferenceDate => "timeIntervalSinceReferenceDate",
            Method::LowercaseString => "lowercaseString",
            Method::UppercaseString => "uppercaseString",
            Method::Length => "length",
            Method::StringByAppendingString => "stringByAppendingString:",
            Method::StringValue => "stringValue",
            Method::DoubleValue => "doubleValue",
            Method::IntegerValue => "integerValue",
            Method::Count => "count",
        }
    }

    /// Arguments after the target; one per `:` in the selector.
    pub fn arity(&self) -> usize {
        self.selector().matches(':').count()
    }

    fn receiver(&self) -> Receiver {
        match self {
            Method::DateByAddingDays
            | Method::DateByAddingHours
            | Method::DateByAddingMinutes
            | Method::DateByAddingSeconds
            | Method::TimeIntervalSinceReferenceDate => Receiver::Date,
            Method::LowercaseString
            | Method::UppercaseString
            | Method::Length
            | Method::StringByAppendingString => Receiver::String,
            Method::StringValue | Method::DoubleValue | Method::IntegerValue => Receiver::Number,
            Method::Count => Receiver::Collection,
        }
    }

    /// Whether a target of static type `ty` responds to this selector.
    pub fn accepts(&self, ty: &ValueType) -> bool {
        let ty = ty.underlying();
        match ty {
            ValueType::Any | ValueType::Null => true,
            _ => match self.receiver() {
                Receiver::Date => *ty == ValueType::Date,
                Receiver::String => *ty == ValueType::String,
                Receiver::Number => ty.is_numeric() || *ty == ValueType::Bool,
                Receiver::Collection => ty.is_collection(),
            },
        }
    }

    pub fn result_type(&self) -> ValueType {
        match self.receiver() {
            Receiver::Date if *self == Method::TimeIntervalSinceReferenceDate => ValueType::F64,
            Receiver::Date => ValueType::Date,
            Receiver::String if *self == Method::Length => ValueType::I64,
            Receiver::String => ValueType::String,
            Receiver::Number => match self {
                Method::StringValue => ValueType::String,
                Method::DoubleValue => ValueType::F64,
                _ => ValueType::I64,
            },
            Receiver::Collection => ValueType::I64,
        }
    }
}

// ========================================
// Free functions
// ========================================

/// Invoke a free function on evaluated arguments.
pub(crate) fn call(function: Function, args: Vec<Value>) -> Result<Value, EvaluationError> {
    match function {
        Function::Now => Ok(Value::Date(Utc::now())),
        Function::Random => Ok(Value::I64(rand::random::<u32>() as i64)),
        Function::Count => Ok(Value::I64(aggregate_items(args)?.len() as i64)),
        Function::Sum => sum(aggregate_items(args)?),
        Function::Average => average(aggregate_items(args)?),
        Function::Min => extreme(aggregate_items(args)?, Ordering::Less),
        Function::Max => extreme(aggregate_items(args)?, Ordering::Greater),
        Function::Abs => abs(first(args)),
        Function::Sqrt => match first(args) {
            Value::Null => Ok(Value::Null),
            value => value
                .as_f64()
                .map(|n| Value::F64(n.sqrt()))
                .ok_or(EvaluationError::UnsupportedOperand {
                    op: "sqrt",
                    found: value.type_name(),
                }),
        },
        Function::Lowercase => map_string(first(args), "lowercase", |s| s.to_lowercase()),
        Function::Uppercase => map_string(first(args), "uppercase", |s| s.to_uppercase()),
        Function::Add => binary(args, |a, b| evaluator::arithmetic(ArithOp::Add, a, b)),
        Function::Subtract => binary(args, |a, b| evaluator::arithmetic(ArithOp::Subtract, a, b)),
        Function::Multiply => binary(args, |a, b| evaluator::arithmetic(ArithOp::Multiply, a, b)),
        Function::Divide => binary(args, |a, b| evaluator::arithmetic(ArithOp::Divide, a, b)),
        Function::Modulus => binary(args, |a, b| evaluator::numeric(Numeric::Remainder, a, b)),
    }
}

fn first(args: Vec<Value>) -> Value {
    args.into_iter().next().unwrap_or(Value::Null)
}

fn binary(
    args: Vec<Value>,
    f: impl FnOnce(Value, Value) -> Result<Value, EvaluationError>,
) -> Result<Value, EvaluationError> {
    let mut args = args.into_iter();
    let left = args.next().unwrap_or(Value::Null);
    let right = args.next().unwrap_or(Value::Null);
    f(left, right)
}

/// A single argument is the collection to reduce; several arguments are reduced directly.
fn aggregate_items(args: Vec<Value>) -> Result<Vec<Value>, EvaluationError> {
    if args.len() != 1 {
        return Ok(args);
    }
    match first(args) {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(EvaluationError::NotACollection {
            found: other.type_name(),
        }),
    }
}

fn sum(items: Vec<Value>) -> Result<Value, EvaluationError> {
    let mut total: Option<Value> = None;
    for item in items {
        let item = match item {
            Value::Null => continue,
            item if item.as_f64().is_some() => item,
            other => coerce::cast_value(other, &ValueType::F64)?,
        };
        total = Some(match total {
            None => item,
            Some(total) => evaluator::numeric(Numeric::Add, total, item)?,
        });
    }
    Ok(total.unwrap_or(Value::I64(0)))
}

fn average(items: Vec<Value>) -> Result<Value, EvaluationError> {
    let count = items.iter().filter(|item| !item.is_null()).count();
    if count == 0 {
        return Ok(Value::Null);
    }
    match sum(items)? {
        Value::Decimal(total) => Ok(Value::Decimal(total / Decimal::from(count))),
        total => total
            .as_f64()
            .map(|total| Value::F64(total / count as f64))
            .ok_or(EvaluationError::UnsupportedOperand {
                op: "average",
                found: total.type_name(),
            }),
    }
}

/// Smallest (`Less`) or largest (`Greater`) non-nil element.
fn extreme(items: Vec<Value>, wanted: Ordering) -> Result<Value, EvaluationError> {
    let mut best: Option<Value> = None;
    for item in items.into_iter().filter(|item| !item.is_null()) {
        best = Some(match best {
            None => item,
            Some(current) => {
                let (a, b) = coerce::reconcile(item.clone(), current.clone())?;
                match evaluator::compare_values(&a, &b) {
                    Some(ordering) if ordering == wanted => item,
                    Some(_) => current,
                    None => {
                        return Err(EvaluationError::UnsupportedOperands {
                            op: if wanted == Ordering::Less { "min" } else { "max" },
                            left: a.type_name(),
                            right: b.type_name(),
                        });
                    }
                }
            }
        });
    }
    Ok(best.unwrap_or(Value::Null))
}

fn abs(value: Value) -> Result<Value, EvaluationError> {
    let overflow = EvaluationError::Overflow { op: "abs" };
    match value {
        Value::I8(n) => n.checked_abs().map(Value::I8).ok_or(overflow),
        Value::I16(n) => n.checked_abs().map(Value::I16).ok_or(overflow),
        Value::I32(n) => n.checked_abs().map(Value::I32).ok_or(overflow),
        Value::I64(n) => n.checked_abs().map(Value::I64).ok_or(overflow),
        Value::F32(n) => Ok(Value::F32(n.abs())),
        Value::F64(n) => Ok(Value::F64(n.abs())),
        Value::Decimal(d) => Ok(Value::Decimal(d.abs())),
        unsigned @ (Value::U8(_) | Value::U16(_) | Value::U32(_) | Value::U64(_)) => Ok(unsigned),
        Value::Null => Ok(Value::Null),
        other => Err(EvaluationError::UnsupportedOperand {
            op: "abs",
            found: other.type_name(),
        }),
    }
}

fn map_string(
    value: Value,
    op: &'static str,
    f: impl FnOnce(&str) -> String,
) -> Result<Value, EvaluationError> {
    match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        Value::Null => Ok(Value::Null),
        other => Err(EvaluationError::UnsupportedOperand {
            op,
            found: other.type_name(),
        }),
    }
}

// ========================================
// Selectors
// ========================================

/// Send `method` to `target`. Messages to `nil` return `nil`.
pub(crate) fn invoke(method: Method, target: Value, args: Vec<Value>) -> Result<Value, EvaluationError> {
    if target.is_null() {
        return Ok(Value::Null);
    }
    if !method.accepts(&target.value_type()) {
        return Err(EvaluationError::SelectorNotFound {
            selector: method.selector().to_string(),
            receiver: target.type_name(),
        });
    }

    let argument = first(args);
    match (method, target) {
        (Method::DateByAddingDays, Value::Date(date)) => add_to_date(&date, argument, 86_400.0),
        (Method::DateByAddingHours, Value::Date(date)) => add_to_date(&date, argument, 3_600.0),
        (Method::DateByAddingMinutes, Value::Date(date)) => add_to_date(&date, argument, 60.0),
        (Method::DateByAddingSeconds, Value::Date(date)) => add_to_date(&date, argument, 1.0),
        (Method::TimeIntervalSinceReferenceDate, Value::Date(date)) => {
            Ok(Value::F64(seconds_since_reference(&date)))
        }
        (Method::LowercaseString, Value::String(s)) => Ok(Value::String(s.to_lowercase())),
        (Method::UppercaseString, Value::String(s)) => Ok(Value::String(s.to_uppercase())),
        (Method::Length, Value::String(s)) => Ok(Value::I64(s.chars().count() as i64)),
        (Method::StringByAppendingString, Value::String(s)) => match argument {
            Value::Null => Ok(Value::String(s)),
            suffix => Ok(Value::String(s + &suffix.as_string())),
        },
        (Method::StringValue, number) => Ok(Value::String(number.as_string())),
        (Method::DoubleValue, number) => Ok(coerce::cast_value(number, &ValueType::F64)?),
        (Method::IntegerValue, number) => {
            let truncated = match number {
                Value::F32(n) => Value::F64(n.trunc() as f64),
                Value::F64(n) => Value::F64(n.trunc()),
                Value::Decimal(d) => Value::Decimal(d.trunc()),
                other => other,
            };
            Ok(coerce::cast_value(truncated, &ValueType::I64)?)
        }
        (Method::Count, Value::Array(items)) => Ok(Value::I64(items.len() as i64)),
        (method, target) => Err(EvaluationError::SelectorNotFound {
            selector: method.selector().to_string(),
            receiver: target.type_name(),
        }),
    }
}

fn add_to_date(
    date: &DateTime<Utc>,
    amount: Value,
    unit_seconds: f64,
) -> Result<Value, EvaluationError> {
    let amount = amount.as_f64().ok_or(EvaluationError::UnsupportedOperand {
        op: "dateByAdding",
        found: amount.type_name(),
    })?;
    evaluator::shift_date(date, amount * unit_seconds).map(Value::Date)
}
