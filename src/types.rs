use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::value::Value;

/// Static type tag of an operand.
///
/// The compiler tracks one of these for every lowered node. Constants and bound variables
/// have exact types; key paths have whatever the member resolver reports, or [`ValueType::Any`]
/// when the shape of the evaluated object is not known until evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Unknown until evaluation
    Any,
    /// The type of the `nil` literal
    Null,
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Decimal,
    String,
    Uuid,
    Date,
    Data,
    /// Host object of the named shape
    Object(String),
    /// Homogeneous collection
    Collection(Box<ValueType>),
    /// Value type that may be absent
    Nullable(Box<ValueType>),
}

/// Precision order used by coercion, least precise first.
const PRECISION: [ValueType; 13] = [
    ValueType::U8,
    ValueType::I8,
    ValueType::U16,
    ValueType::I16,
    ValueType::U32,
    ValueType::I32,
    ValueType::U64,
    ValueType::I64,
    ValueType::F32,
    ValueType::F64,
    ValueType::Decimal,
    ValueType::String,
    ValueType::Uuid,
];

impl ValueType {
    pub fn collection_of(element: ValueType) -> Self {
        ValueType::Collection(Box::new(element))
    }

    /// Nullable form of a value type. Reference-like types are already nullable and are
    /// returned unchanged.
    pub fn nullable(self) -> Self {
        if self.is_value_type() {
            ValueType::Nullable(Box::new(self))
        } else {
            self
        }
    }

    /// The type wrapped by `Nullable`, or `self`.
    pub fn underlying(&self) -> &ValueType {
        match self {
            ValueType::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueType::Nullable(_))
    }

    /// Plain value types: these can never hold `nil` unless wrapped in `Nullable`.
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            ValueType::Bool
                | ValueType::U8
                | ValueType::I8
                | ValueType::U16
                | ValueType::I16
                | ValueType::U32
                | ValueType::I32
                | ValueType::U64
                | ValueType::I64
                | ValueType::F32
                | ValueType::F64
                | ValueType::Decimal
                | ValueType::Uuid
                | ValueType::Date
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.underlying(),
            ValueType::U8
                | ValueType::I8
                | ValueType::U16
                | ValueType::I16
                | ValueType::U32
                | ValueType::I32
                | ValueType::U64
                | ValueType::I64
                | ValueType::F32
                | ValueType::F64
                | ValueType::Decimal
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_numeric()
            && !matches!(
                self.underlying(),
                ValueType::F32 | ValueType::F64 | ValueType::Decimal
            )
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, ValueType::Collection(_))
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ValueType::Any)
    }

    /// Element type of a collection; `Any` for everything else.
    pub fn element_type(&self) -> ValueType {
        match self {
            ValueType::Collection(element) => (**element).clone(),
            _ => ValueType::Any,
        }
    }

    /// Whether the coercion engine may insert casts for this type.
    pub fn is_castable(&self) -> bool {
        self.is_numeric() || self.is_nullable() || self.is_value_type() || *self == ValueType::String
    }

    /// Position in the precision order, ignoring nullability. `None` for unranked types.
    pub fn precision_rank(&self) -> Option<usize> {
        let bare = self.underlying();
        PRECISION.iter().position(|t| t == bare)
    }

    /// Value a key path of this type yields when an intermediate component is absent.
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Boolean(false),
            ValueType::U8 => Value::U8(0),
            ValueType::I8 => Value::I8(0),
            ValueType::U16 => Value::U16(0),
            ValueType::I16 => Value::I16(0),
            ValueType::U32 => Value::U32(0),
            ValueType::I32 => Value::I32(0),
            ValueType::U64 => Value::U64(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
            ValueType::Decimal => Value::Decimal(Decimal::ZERO),
            ValueType::Uuid => Value::Uuid(Uuid::nil()),
            ValueType::Date => Value::Date(DateTime::<Utc>::UNIX_EPOCH),
            _ => Value::Null,
        }
    }

    /// Parse the type name used in `CAST(expr, 'Name')`.
    pub fn from_cast_name(name: &str) -> Option<Self> {
        let ty = match name {
            "NSNumber" | "number" | "f64" | "double" => ValueType::F64,
            "NSString" | "string" => ValueType::String,
            "NSDate" | "date" => ValueType::Date,
            "NSUUID" | "uuid" => ValueType::Uuid,
            "NSData" | "data" => ValueType::Data,
            "NSDecimalNumber" | "decimal" => ValueType::Decimal,
            "bool" => ValueType::Bool,
            "u8" => ValueType::U8,
            "i8" => ValueType::I8,
            "u16" => ValueType::U16,
            "i16" => ValueType::I16,
            "u32" => ValueType::U32,
            "i32" => ValueType::I32,
            "u64" => ValueType::U64,
            "i64" => ValueType::I64,
            "f32" => ValueType::F32,
            _ => return None,
        };
        Some(ty)
    }

    /// Name accepted back by [`ValueType::from_cast_name`]; `None` for types a cast cannot target.
    pub fn cast_name(&self) -> Option<&'static str> {
        let name = match self.underlying() {
            ValueType::F64 => "NSNumber",
            ValueType::String => "NSString",
            ValueType::Date => "NSDate",
            ValueType::Uuid => "NSUUID",
            ValueType::Data => "NSData",
            ValueType::Decimal => "decimal",
            ValueType::Bool => "bool",
            ValueType::U8 => "u8",
            ValueType::I8 => "i8",
            ValueType::U16 => "u16",
            ValueType::I16 => "i16",
            ValueType::U32 => "u32",
            ValueType::I32 => "i32",
            ValueType::U64 => "u64",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => write!(f, "any"),
            ValueType::Null => write!(f, "nil"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::U8 => write!(f, "u8"),
            ValueType::I8 => write!(f, "i8"),
            ValueType::U16 => write!(f, "u16"),
            ValueType::I16 => write!(f, "i16"),
            ValueType::U32 => write!(f, "u32"),
            ValueType::I32 => write!(f, "i32"),
            ValueType::U64 => write!(f, "u64"),
            ValueType::I64 => write!(f, "i64"),
            ValueType::F32 => write!(f, "f32"),
            ValueType::F64 => write!(f, "f64"),
            ValueType::Decimal => write!(f, "decimal"),
            ValueType::String => write!(f, "string"),
            ValueType::Uuid => write!(f, "uuid"),
            ValueType::Date => write!(f, "date"),
            ValueType::Data => write!(f, "data"),
            ValueType::Object(shape) => write!(f, "object<{}>", shape),
            ValueType::Collection(element) => write!(f, "[{}]", element),
            ValueType::Nullable(inner) => write!(f, "{}?", inner),
        }
    }
}
