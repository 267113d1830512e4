//! JSON <-> [`Value`] conversion.
//!
//! JSON objects become [`Record`]s of shape `"object"`, so key paths over parsed documents
//! resolve through the default [`crate::resolve::RecordResolver`].

use crate::value::{Record, Value};

/// Shape given to records built from JSON objects.
pub const JSON_OBJECT_SHAPE: &str = "object";

/// Convert a `serde_json::Value` into a [`Value`]. Integers keep `I64` (or `U64` above
/// `i64::MAX`); other numbers become `F64`.
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::I64(i)
            } else if let Some(u) = n.as_u64() {
                Value::U64(u)
            } else {
                n.as_f64().map(Value::F64).unwrap_or(Value::Null)
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            let mut record = Record::new(JSON_OBJECT_SHAPE);
            for (k, v) in obj {
                record.insert(k, json_to_value(v));
            }
            record.into_value()
        }
    }
}

/// Convert a [`Value`] to `serde_json::Value`.
///
/// Typed values without a JSON counterpart use their string form (identifiers, dates as
/// RFC 3339, data as hex, decimals). Host objects other than [`Record`] become their shape name.
pub fn value_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::U8(n) => (*n).into(),
        Value::I8(n) => (*n).into(),
        Value::U16(n) => (*n).into(),
        Value::I16(n) => (*n).into(),
        Value::U32(n) => (*n).into(),
        Value::I32(n) => (*n).into(),
        Value::U64(n) => (*n).into(),
        Value::I64(n) => (*n).into(),
        Value::F32(f) => float_to_json(*f as f64),
        Value::F64(f) => float_to_json(*f),
        Value::Decimal(_) | Value::Uuid(_) | Value::Date(_) | Value::Data(_) | Value::String(_) => {
            serde_json::Value::String(v.as_string())
        }
        Value::Array(arr) => serde_json::Value::Array(arr.iter().map(value_to_json).collect()),
        Value::Object(obj) => match obj.as_any().downcast_ref::<Record>() {
            Some(record) => serde_json::Value::Object(
                record
                    .fields()
                    .map(|(k, v)| (k.clone(), value_to_json(v)))
                    .collect(),
            ),
            None => serde_json::Value::String(obj.shape().to_string()),
        },
    }
}

fn float_to_json(f: f64) -> serde_json::Value {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
