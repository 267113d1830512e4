use std::{any::Any, collections::BTreeMap, fmt, sync::Arc};

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use uuid::Uuid;

use crate::types::ValueType;

/// A runtime value flowing through parsing, compilation and evaluation.
///
/// Numeric values keep their exact width so that the coercion rules (8-bit widens to
/// 64-bit, integers widen to floating point, ...) can be observed and tested.
///
/// # Examples
///
/// ```
/// use predicate_lang::{Record, Value};
///
/// let author = Record::new("User").with("Name", "Ada");
/// let doc = Record::new("Document")
///     .with("Author", author)
///     .with("Tags", vec!["bug", "ui"])
///     .into_value();
///
/// assert!(matches!(doc, Value::Object(_)));
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value (`nil`)
    Null,
    Boolean(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    /// Exact decimal number
    Decimal(Decimal),
    /// UTF-8 string
    String(String),
    /// Structured identifier
    Uuid(Uuid),
    /// UTC instant
    Date(DateTime<Utc>),
    /// Binary blob
    Data(Vec<u8>),
    /// Ordered collection
    Array(Vec<Value>),
    /// Host object, resolved through a [`crate::resolve::MemberResolver`]
    Object(Arc<dyn Object>),
}

/// A host object of some named shape.
///
/// Members are never looked up through this trait directly: the compiler asks a
/// [`crate::resolve::MemberResolver`] for an accessor once per `(shape, member)` pair, and the
/// accessor downcasts through [`Object::as_any`].
pub trait Object: fmt::Debug + Send + Sync + 'static {
    /// Name of the object's shape, used as the resolver cache key.
    fn shape(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Dynamic, map-backed host object.
///
/// This is what JSON documents convert into, and what [`crate::resolve::RecordResolver`]
/// knows how to read.
#[derive(Debug, Clone, Default)]
pub struct Record {
    shape: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(shape: impl Into<String>) -> Self {
        Record {
            shape: shape.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Exact field lookup.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field lookup that prefers an exact match and falls back to ASCII case-insensitive
    /// comparison, so `collection.s` finds a field named `Collection.S`.
    pub fn field_ignore_case(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).or_else(|| {
            self.fields
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn into_value(self) -> Value {
        Value::Object(Arc::new(self))
    }
}

impl Object for Record {
    fn shape(&self) -> &str {
        &self.shape
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Returns the reference date used for date <-> number conversions (2001-01-01T00:00:00Z).
pub fn reference_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Seconds elapsed between the reference date and `date`.
pub fn seconds_since_reference(date: &DateTime<Utc>) -> f64 {
    let span = *date - reference_date();
    span.num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or_else(|| span.num_seconds() as f64)
}

/// Date `seconds` after the reference date. `None` when out of range.
pub fn date_from_reference_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros.abs() > i64::MAX as f64 {
        return None;
    }
    reference_date().checked_add_signed(Duration::microseconds(micros as i64))
}

impl Value {
    /// Runtime type of this value. Arrays report the type shared by their non-null elements,
    /// or `Any` when the elements disagree.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Bool,
            Value::U8(_) => ValueType::U8,
            Value::I8(_) => ValueType::I8,
            Value::U16(_) => ValueType::U16,
            Value::I16(_) => ValueType::I16,
            Value::U32(_) => ValueType::U32,
            Value::I32(_) => ValueType::I32,
            Value::U64(_) => ValueType::U64,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::Decimal(_) => ValueType::Decimal,
            Value::String(_) => ValueType::String,
            Value::Uuid(_) => ValueType::Uuid,
            Value::Date(_) => ValueType::Date,
            Value::Data(_) => ValueType::Data,
            Value::Array(items) => {
                let mut element: Option<ValueType> = None;
                for ty in items.iter().filter(|v| !v.is_null()).map(Value::value_type) {
                    match &element {
                        None => element = Some(ty),
                        Some(current) if *current == ty => {}
                        Some(_) => return ValueType::collection_of(ValueType::Any),
                    }
                }
                ValueType::collection_of(element.unwrap_or(ValueType::Any))
            }
            Value::Object(obj) => ValueType::Object(obj.shape().to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if the value is truthy (for conditions)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Data(bytes) => !bytes.is_empty(),
            Value::Object(_) | Value::Uuid(_) | Value::Date(_) => true,
            numeric => numeric.as_f64().is_some_and(|n| n != 0.0),
        }
    }

    /// Convert to boolean for conditions
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            _ => self.is_truthy(),
        }
    }

    /// Numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::U8(n) => Some(*n as f64),
            Value::I8(n) => Some(*n as f64),
            Value::U16(n) => Some(*n as f64),
            Value::I16(n) => Some(*n as f64),
            Value::U32(n) => Some(*n as f64),
            Value::I32(n) => Some(*n as f64),
            Value::U64(n) => Some(*n as f64),
            Value::I64(n) => Some(*n as f64),
            Value::F32(n) => Some(*n as f64),
            Value::F64(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Integral value; floats are accepted only when they have no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::U8(n) => Some(*n as i64),
            Value::I8(n) => Some(*n as i64),
            Value::U16(n) => Some(*n as i64),
            Value::I16(n) => Some(*n as i64),
            Value::U32(n) => Some(*n as i64),
            Value::I32(n) => Some(*n as i64),
            Value::U64(n) => i64::try_from(*n).ok(),
            Value::I64(n) => Some(*n),
            Value::F32(n) if n.fract() == 0.0 => Some(*n as i64),
            Value::F64(n) if n.fract() == 0.0 => Some(*n as i64),
            Value::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get as string (concatenation, stringification casts)
    pub fn as_string(&self) -> String {
        match self {
            Value::Null => "nil".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::U8(n) => n.to_string(),
            Value::I8(n) => n.to_string(),
            Value::U16(n) => n.to_string(),
            Value::I16(n) => n.to_string(),
            Value::U32(n) => n.to_string(),
            Value::I32(n) => n.to_string(),
            Value::U64(n) => n.to_string(),
            Value::I64(n) => n.to_string(),
            Value::F32(n) => n.to_string(),
            Value::F64(n) => n.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => s.clone(),
            Value::Uuid(u) => u.hyphenated().to_string(),
            Value::Date(d) => d.to_rfc3339(),
            Value::Data(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
            Value::Array(_) | Value::Object(_) => format!("{:?}", self),
        }
    }

    /// Human-readable type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nil",
            Value::Boolean(_) => "boolean",
            Value::U8(_) => "u8",
            Value::I8(_) => "i8",
            Value::U16(_) => "u16",
            Value::I16(_) => "i16",
            Value::U32(_) => "u32",
            Value::I32(_) => "i32",
            Value::U64(_) => "u64",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Data(_) => "data",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl PartialEq for Value {
    /// Structural equality on the exact variant; host objects compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Boolean,
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    String => String,
    Uuid => Uuid,
    DateTime<Utc> => Date,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        v.into_value()
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
