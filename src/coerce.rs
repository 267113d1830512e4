//! Comparability rules for pairs of operand types.
//!
//! [`plan`] is pure: it looks only at the two static types and decides which side (if any)
//! must be converted, and to what. The compiler applies the plan by folding constants
//! through [`cast_value`] or by inserting cast nodes; the evaluator re-plans at runtime when
//! an operand's static type was [`ValueType::Any`].

use std::{cmp::Ordering, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, prelude::{FromPrimitive, ToPrimitive}};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    types::ValueType,
    value::{Value, date_from_reference_seconds, seconds_since_reference},
};

/// Operands that cannot be brought to a common comparable type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("cannot compare {left} with {right}")]
    Incomparable { left: ValueType, right: ValueType },

    #[error("cannot convert {from} value '{value}' to {to}")]
    Conversion {
        value: String,
        from: &'static str,
        to: ValueType,
    },

    #[error("'{text}' is not a valid identifier")]
    InvalidUuid { text: String },
}

/// Conversions to apply to each side of a binary operation. `None` leaves that side alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    pub left: Option<ValueType>,
    pub right: Option<ValueType>,
}

impl Plan {
    pub fn unchanged() -> Self {
        Plan::default()
    }

    pub fn is_unchanged(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    fn between(original: (&ValueType, &ValueType), result: (ValueType, ValueType)) -> Self {
        Plan {
            left: (result.0 != *original.0).then_some(result.0),
            right: (result.1 != *original.1).then_some(result.1),
        }
    }
}

/// Decide how to make `left` and `right` comparable.
///
/// 1. Identical types need nothing.
/// 2. A scalar against a collection is cast to the collection's element type when their
///    precision ranks differ.
/// 3. Two castable types first agree on nullability, then the less precise side is cast to
///    the more precise side's type. A signed and an unsigned integer both widen to the
///    narrowest type that holds either range (`U64` with any signed type meets at `Decimal`).
/// 4. Anything else passes through unchanged for the evaluation layer to compare natively.
///
/// ```
/// use predicate_lang::{coerce::plan, ValueType};
///
/// let p = plan(&ValueType::U8, &ValueType::I64).unwrap();
/// assert_eq!(p.left, Some(ValueType::I64));
/// assert_eq!(p.right, None);
/// ```
pub fn plan(left: &ValueType, right: &ValueType) -> Result<Plan, CoercionError> {
    if left == right || !left.is_known() || !right.is_known() {
        return Ok(Plan::unchanged());
    }

    match (left.is_collection(), right.is_collection()) {
        (true, false) => {
            return Ok(Plan {
                left: None,
                right: vector_cast(right, &left.element_type()),
            });
        }
        (false, true) => {
            return Ok(Plan {
                left: vector_cast(left, &right.element_type()),
                right: None,
            });
        }
        _ => {}
    }

    if castable(left) && castable(right) {
        let (l, r) = promote_nullability(left.clone(), right.clone());
        let (l, r) = rank(l, r)?;
        return Ok(Plan::between((left, right), (l, r)));
    }

    Ok(Plan::unchanged())
}

fn castable(ty: &ValueType) -> bool {
    *ty == ValueType::Null || ty.is_castable()
}

fn vector_cast(needle: &ValueType, element: &ValueType) -> Option<ValueType> {
    if !element.is_known() || *needle == ValueType::Null {
        return None;
    }
    // the element type cannot hold every needle; elements are compared one by one instead
    if let Some(common) = mixed_sign_common(needle, element)
        && common != *element.underlying()
    {
        return None;
    }
    (needle.precision_rank() != element.precision_rank()).then(|| element.clone())
}

/// Value types score 0, nullable value types 1, reference-like types 2.
fn nullability_score(ty: &ValueType) -> u8 {
    if ty.is_nullable() {
        1
    } else if ty.is_value_type() {
        0
    } else {
        2
    }
}

fn promote_nullability(left: ValueType, right: ValueType) -> (ValueType, ValueType) {
    let involved = |t: &ValueType| t.is_nullable() || *t == ValueType::Null;
    if !involved(&left) && !involved(&right) {
        return (left, right);
    }

    let flip = nullability_score(&right) < nullability_score(&left);
    let (lower, higher) = if flip { (right, left) } else { (left, right) };

    let (lower, higher) = if higher == ValueType::Null {
        let promoted = lower.underlying().clone().nullable();
        (promoted.clone(), promoted)
    } else {
        (lower.nullable(), higher)
    };

    if flip { (higher, lower) } else { (lower, higher) }
}

/// Signedness and width of an integer type.
fn integer_layout(ty: &ValueType) -> Option<(bool, u32)> {
    match ty.underlying() {
        ValueType::U8 => Some((false, 8)),
        ValueType::I8 => Some((true, 8)),
        ValueType::U16 => Some((false, 16)),
        ValueType::I16 => Some((true, 16)),
        ValueType::U32 => Some((false, 32)),
        ValueType::I32 => Some((true, 32)),
        ValueType::U64 => Some((false, 64)),
        ValueType::I64 => Some((true, 64)),
        _ => None,
    }
}

/// Narrowest type holding every value of a signed and an unsigned integer type. Past 64
/// signed bits only `Decimal` is exact.
fn mixed_sign_common(a: &ValueType, b: &ValueType) -> Option<ValueType> {
    let (a_signed, a_bits) = integer_layout(a)?;
    let (b_signed, b_bits) = integer_layout(b)?;
    if a_signed == b_signed {
        return None;
    }
    let (signed, unsigned) = if a_signed { (a_bits, b_bits) } else { (b_bits, a_bits) };
    Some(match signed.max(unsigned * 2) {
        ..=16 => ValueType::I16,
        ..=32 => ValueType::I32,
        ..=64 => ValueType::I64,
        _ => ValueType::Decimal,
    })
}

fn rank(left: ValueType, right: ValueType) -> Result<(ValueType, ValueType), CoercionError> {
    if left.underlying() == right.underlying() {
        return Ok((left, right));
    }

    if let Some(common) = mixed_sign_common(&left, &right) {
        let common = if left.is_nullable() || right.is_nullable() {
            common.nullable()
        } else {
            common
        };
        return Ok((common.clone(), common));
    }

    let to_date = |t: &ValueType| t.is_numeric() || *t == ValueType::String;
    let cast_right = match (left.underlying(), right.underlying()) {
        (ValueType::Date, other) if to_date(other) => true,
        (other, ValueType::Date) if to_date(other) => false,
        // Unranked types sort below every ranked type.
        _ => match left.precision_rank().cmp(&right.precision_rank()) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => return Err(CoercionError::Incomparable { left, right }),
        },
    };

    let (from, target) = if cast_right {
        (&right, left.clone())
    } else {
        (&left, right.clone())
    };
    if !can_convert(from, &target) {
        return Err(CoercionError::Incomparable { left, right });
    }
    Ok((target.clone(), target))
}

/// Whether [`cast_value`] has a conversion from `from` to `to` for at least some values.
pub fn can_convert(from: &ValueType, to: &ValueType) -> bool {
    let (from, to) = (from.underlying(), to.underlying());
    if from == to || *from == ValueType::Null || !from.is_known() || !to.is_known() {
        return true;
    }
    let scalar = |t: &ValueType| t.is_numeric() || *t == ValueType::Bool;
    match (from, to) {
        (f, t) if scalar(f) && scalar(t) => true,
        (ValueType::String, t) => {
            scalar(t) || matches!(t, ValueType::Uuid | ValueType::Date | ValueType::Data)
        }
        (f, ValueType::String) => {
            scalar(f) || matches!(f, ValueType::Uuid | ValueType::Date | ValueType::Data)
        }
        (f, ValueType::Date) => f.is_numeric(),
        (ValueType::Date, t) => t.is_numeric(),
        (ValueType::Uuid, ValueType::Data) | (ValueType::Data, ValueType::Uuid) => true,
        (ValueType::Collection(a), ValueType::Collection(b)) => can_convert(a, b),
        _ => false,
    }
}

fn integral(value: &Value) -> Option<i128> {
    match value {
        Value::Boolean(b) => Some(*b as i128),
        Value::U8(n) => Some(*n as i128),
        Value::I8(n) => Some(*n as i128),
        Value::U16(n) => Some(*n as i128),
        Value::I16(n) => Some(*n as i128),
        Value::U32(n) => Some(*n as i128),
        Value::I32(n) => Some(*n as i128),
        Value::U64(n) => Some(*n as i128),
        Value::I64(n) => Some(*n as i128),
        Value::F32(n) if n.is_finite() => Some(n.trunc() as i128),
        Value::F64(n) if n.is_finite() => Some(n.trunc() as i128),
        Value::Decimal(d) => d.trunc().to_i128(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i128>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(|n| n.trunc() as i128)
            })
        }
        Value::Date(d) => Some(seconds_since_reference(d).trunc() as i128),
        _ => None,
    }
}

fn floating(value: &Value) -> Option<f64> {
    match value {
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Date(d) => Some(seconds_since_reference(d)),
        other => other.as_f64(),
    }
}

fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Decimal(d) => Some(*d),
        Value::F32(n) => Decimal::try_from(*n).ok(),
        Value::F64(n) => Decimal::try_from(*n).ok(),
        Value::String(s) => Decimal::from_str(s.trim())
            .ok()
            .or_else(|| Decimal::from_scientific(s.trim()).ok()),
        Value::Date(d) => Decimal::try_from(seconds_since_reference(d)).ok(),
        other => integral(other).and_then(Decimal::from_i128),
    }
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 || !text.is_ascii() {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}

macro_rules! narrow {
    ($value:expr, $ty:ty, $variant:ident) => {
        integral($value)
            .and_then(|n| <$ty>::try_from(n).ok())
            .map(Value::$variant)
    };
}

/// Convert `value` to `to`.
///
/// `nil` converts to `nil` for every target. Conversions between numbers and dates go
/// through seconds since the reference date (2001-01-01T00:00:00Z).
pub fn cast_value(value: Value, to: &ValueType) -> Result<Value, CoercionError> {
    if value.is_null() || !to.is_known() {
        return Ok(value);
    }
    if let ValueType::Nullable(inner) = to {
        return cast_value(value, inner);
    }
    if value.value_type() == *to {
        return Ok(value);
    }

    let converted = match to {
        ValueType::Bool => match &value {
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "true" | "1" => Some(Value::Boolean(true)),
                "no" | "false" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            other => other.as_f64().map(|n| Value::Boolean(n != 0.0)),
        },
        ValueType::U8 => narrow!(&value, u8, U8),
        ValueType::I8 => narrow!(&value, i8, I8),
        ValueType::U16 => narrow!(&value, u16, U16),
        ValueType::I16 => narrow!(&value, i16, I16),
        ValueType::U32 => narrow!(&value, u32, U32),
        ValueType::I32 => narrow!(&value, i32, I32),
        ValueType::U64 => narrow!(&value, u64, U64),
        ValueType::I64 => narrow!(&value, i64, I64),
        ValueType::F32 => floating(&value).map(|n| Value::F32(n as f32)),
        ValueType::F64 => floating(&value).map(Value::F64),
        ValueType::Decimal => decimal(&value).map(Value::Decimal),
        ValueType::String => match &value {
            Value::Array(_) | Value::Object(_) => None,
            other => Some(Value::String(other.as_string())),
        },
        ValueType::Uuid => match &value {
            Value::String(s) => {
                return Uuid::parse_str(s.trim())
                    .map(Value::Uuid)
                    .map_err(|_| CoercionError::InvalidUuid { text: s.clone() });
            }
            Value::Data(bytes) => Uuid::from_slice(bytes).ok().map(Value::Uuid),
            _ => None,
        },
        ValueType::Date => match &value {
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|d| Value::Date(d.with_timezone(&Utc)))
                .or_else(|| {
                    s.trim()
                        .parse::<f64>()
                        .ok()
                        .and_then(date_from_reference_seconds)
                        .map(Value::Date)
                }),
            other => other
                .as_f64()
                .and_then(date_from_reference_seconds)
                .map(Value::Date),
        },
        ValueType::Data => match &value {
            Value::String(s) => {
                Some(Value::Data(decode_hex(s).unwrap_or_else(|| s.as_bytes().to_vec())))
            }
            Value::Uuid(u) => Some(Value::Data(u.as_bytes().to_vec())),
            _ => None,
        },
        ValueType::Collection(element) => match value {
            Value::Array(items) => {
                let items = items
                    .into_iter()
                    .map(|item| cast_value(item, element))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Value::Array(items));
            }
            other => return Err(conversion_error(&other, to)),
        },
        _ => None,
    };

    converted.ok_or_else(|| conversion_error(&value, to))
}

fn conversion_error(value: &Value, to: &ValueType) -> CoercionError {
    let mut text = value.as_string();
    if text.chars().count() > 40 {
        text = text.chars().take(40).collect::<String>() + "...";
    }
    CoercionError::Conversion {
        value: text,
        from: value.type_name(),
        to: to.clone(),
    }
}

/// Apply one side of a [`Plan`] to a runtime value.
pub fn apply(value: Value, cast: Option<&ValueType>) -> Result<Value, CoercionError> {
    match cast {
        Some(to) => cast_value(value, to),
        None => Ok(value),
    }
}

/// Re-plan two runtime values by their dynamic types and convert them.
pub fn reconcile(left: Value, right: Value) -> Result<(Value, Value), CoercionError> {
    let plan = plan(&left.value_type(), &right.value_type())?;
    Ok((
        apply(left, plan.left.as_ref())?,
        apply(right, plan.right.as_ref())?,
    ))
}
