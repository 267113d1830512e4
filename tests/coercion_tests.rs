// tests/coercion_tests.rs

use predicate_lang::coerce::{Plan, can_convert, cast_value, plan, reconcile};
use predicate_lang::value::reference_date;
use predicate_lang::{CoercionError, Value, ValueType};
use rust_decimal::Decimal;
use uuid::Uuid;

fn nullable(ty: ValueType) -> ValueType {
    ValueType::Nullable(Box::new(ty))
}

fn planned(left: ValueType, right: ValueType) -> Plan {
    plan(&left, &right).unwrap()
}

/// Every ranked type, least precise first.
fn ranked() -> Vec<ValueType> {
    vec![
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
    ]
}

/// Values of `ty` that any widening must carry over, including the integer extremes.
fn samples(ty: &ValueType) -> Vec<Value> {
    match ty.underlying() {
        ValueType::U8 => vec![Value::U8(0), Value::U8(u8::MAX)],
        ValueType::I8 => vec![Value::I8(i8::MIN), Value::I8(i8::MAX)],
        ValueType::U16 => vec![Value::U16(0), Value::U16(u16::MAX)],
        ValueType::I16 => vec![Value::I16(i16::MIN), Value::I16(i16::MAX)],
        ValueType::U32 => vec![Value::U32(0), Value::U32(u32::MAX)],
        ValueType::I32 => vec![Value::I32(i32::MIN), Value::I32(i32::MAX)],
        ValueType::U64 => vec![Value::U64(0), Value::U64(u64::MAX)],
        ValueType::I64 => vec![Value::I64(i64::MIN), Value::I64(i64::MAX)],
        ValueType::F32 => vec![Value::F32(-1.5), Value::F32(2.25)],
        ValueType::F64 => vec![Value::F64(-1.5), Value::F64(1e12)],
        ValueType::Decimal => vec![Value::Decimal(Decimal::new(-12345, 2))],
        // spelled like an identifier so it survives the cast to `Uuid`
        ValueType::String => vec![Value::from(Uuid::nil().to_string())],
        ValueType::Uuid => vec![Value::Uuid(Uuid::nil())],
        _ => vec![Value::Null],
    }
}

fn involves_nil(ty: &ValueType) -> bool {
    ty.is_nullable() || *ty == ValueType::Null
}

/// Plans `left` against `right` and checks the result is a lossless meeting point.
fn assert_pairing(left: &ValueType, right: &ValueType) {
    let uuid_and_number = |a: &ValueType, b: &ValueType| {
        *a.underlying() == ValueType::Uuid && b.is_numeric()
    };
    if uuid_and_number(left, right) || uuid_and_number(right, left) {
        assert!(
            matches!(plan(left, right), Err(CoercionError::Incomparable { .. })),
            "{} vs {}",
            left,
            right
        );
        return;
    }

    let p = plan(left, right).unwrap_or_else(|e| panic!("{} vs {}: {}", left, right, e));
    let resolved_left = p.left.clone().unwrap_or_else(|| left.clone());
    let resolved_right = p.right.clone().unwrap_or_else(|| right.clone());
    assert_eq!(resolved_left, resolved_right, "{} vs {}", left, right);

    let common = resolved_left;
    for side in [left, right] {
        if let (Some(side_rank), Some(common_rank)) = (side.precision_rank(), common.precision_rank()) {
            assert!(common_rank >= side_rank, "{} narrowed to {}", side, common);
        }
    }
    if (involves_nil(left) || involves_nil(right)) && common.underlying().is_value_type() {
        assert!(common.is_nullable(), "{} vs {} lost nullability", left, right);
    }

    for (side, cast) in [(left, &p.left), (right, &p.right)] {
        for sample in samples(side) {
            let cast = cast_value(sample.clone(), cast.as_ref().unwrap_or(side));
            assert!(
                cast.is_ok(),
                "{:?} ({} vs {}) did not convert: {:?}",
                sample,
                left,
                right,
                cast
            );
        }
    }
}

// ============================================================================
// Planning
// ============================================================================

#[test]
fn test_identical_types_are_unchanged() {
    assert!(planned(ValueType::I64, ValueType::I64).is_unchanged());
    assert!(planned(ValueType::String, ValueType::String).is_unchanged());
}

#[test]
fn test_unknown_types_are_unchanged() {
    assert!(planned(ValueType::Any, ValueType::I64).is_unchanged());
    assert!(planned(ValueType::Date, ValueType::Any).is_unchanged());
}

#[test]
fn test_less_precise_integer_widens() {
    let p = planned(ValueType::U8, ValueType::I64);
    assert_eq!(p.left, Some(ValueType::I64));
    assert_eq!(p.right, None);
}

#[test]
fn test_mixed_sign_integers_meet_at_a_wider_type() {
    let p = planned(ValueType::U64, ValueType::I64);
    assert_eq!(p.left, Some(ValueType::Decimal));
    assert_eq!(p.right, Some(ValueType::Decimal));

    let p = planned(ValueType::U8, ValueType::I8);
    assert_eq!(p.left, Some(ValueType::I16));
    assert_eq!(p.right, Some(ValueType::I16));

    let p = planned(ValueType::I8, ValueType::U16);
    assert_eq!(p.left, Some(ValueType::I32));
    assert_eq!(p.right, Some(ValueType::I32));

    let p = planned(nullable(ValueType::U32), ValueType::I32);
    assert_eq!(p.left, Some(nullable(ValueType::I64)));
    assert_eq!(p.right, Some(nullable(ValueType::I64)));
}

#[test]
fn test_mixed_sign_integers_against_collection() {
    // the needle would not survive a cast to the element type
    assert!(planned(ValueType::collection_of(ValueType::I64), ValueType::U64).is_unchanged());
    assert!(planned(ValueType::I8, ValueType::collection_of(ValueType::U32)).is_unchanged());
}

#[test]
fn test_integer_widens_to_float() {
    let p = planned(ValueType::I32, ValueType::F64);
    assert_eq!(p.left, Some(ValueType::F64));
    assert_eq!(p.right, None);
}

#[test]
fn test_nullable_is_promoted_on_both_sides() {
    let p = planned(nullable(ValueType::I32), ValueType::I64);
    assert_eq!(p.left, Some(nullable(ValueType::I64)));
    assert_eq!(p.right, Some(nullable(ValueType::I64)));
}

#[test]
fn test_nil_against_value_type() {
    let p = planned(ValueType::Null, ValueType::I32);
    assert_eq!(p.left, Some(nullable(ValueType::I32)));
    assert_eq!(p.right, Some(nullable(ValueType::I32)));
}

#[test]
fn test_scalar_against_collection_casts_to_element() {
    let p = planned(ValueType::collection_of(ValueType::I64), ValueType::U8);
    assert_eq!(p.left, None);
    assert_eq!(p.right, Some(ValueType::I64));

    let p = planned(ValueType::U8, ValueType::collection_of(ValueType::I64));
    assert_eq!(p.left, Some(ValueType::I64));
    assert_eq!(p.right, None);
}

#[test]
fn test_scalar_matching_element_rank_is_unchanged() {
    assert!(planned(ValueType::collection_of(ValueType::I64), ValueType::I64).is_unchanged());
}

#[test]
fn test_numbers_become_dates() {
    let p = planned(ValueType::Date, ValueType::F64);
    assert_eq!(p.left, None);
    assert_eq!(p.right, Some(ValueType::Date));

    let p = planned(ValueType::I64, ValueType::Date);
    assert_eq!(p.left, Some(ValueType::Date));
    assert_eq!(p.right, None);
}

#[test]
fn test_numbers_rank_below_strings() {
    let p = planned(ValueType::String, ValueType::I32);
    assert_eq!(p.left, None);
    assert_eq!(p.right, Some(ValueType::String));
}

#[test]
fn test_strings_rank_below_uuids() {
    let p = planned(ValueType::Uuid, ValueType::String);
    assert_eq!(p.left, None);
    assert_eq!(p.right, Some(ValueType::Uuid));

    let p = planned(ValueType::String, ValueType::Uuid);
    assert_eq!(p.left, Some(ValueType::Uuid));
    assert_eq!(p.right, None);
}

#[test]
fn test_incomparable_types() {
    assert_eq!(
        plan(&ValueType::Bool, &ValueType::Date),
        Err(CoercionError::Incomparable {
            left: ValueType::Bool,
            right: ValueType::Date,
        })
    );
}

#[test]
fn test_non_castable_types_pass_through() {
    assert!(planned(ValueType::Data, ValueType::I32).is_unchanged());
    assert!(planned(ValueType::Object("Doc".into()), ValueType::String).is_unchanged());
}

#[test]
fn test_every_ranked_pairing() {
    let types = ranked();
    for left in &types {
        for right in &types {
            assert_pairing(left, right);
        }
    }
}

#[test]
fn test_every_ranked_pairing_with_nullable_side() {
    let types = ranked();
    for left in &types {
        for right in &types {
            let optional = left.clone().nullable();
            assert_pairing(&optional, right);
            assert_pairing(right, &optional);
            assert_pairing(&optional, &right.clone().nullable());
        }
    }
}

#[test]
fn test_every_ranked_type_against_nil() {
    for ty in ranked() {
        assert_pairing(&ValueType::Null, &ty);
        assert_pairing(&ty, &ValueType::Null);
        assert_pairing(&ValueType::Null, &ty.clone().nullable());
    }
}

// ============================================================================
// Conversion table
// ============================================================================

#[test]
fn test_can_convert() {
    assert!(can_convert(&ValueType::String, &ValueType::F64));
    assert!(can_convert(&ValueType::I64, &ValueType::Date));
    assert!(can_convert(&ValueType::Uuid, &ValueType::Data));
    assert!(can_convert(&ValueType::Null, &ValueType::Uuid));
    assert!(!can_convert(&ValueType::Bool, &ValueType::Date));
    assert!(!can_convert(&ValueType::Uuid, &ValueType::I64));
}

// ============================================================================
// Value casts
// ============================================================================

#[test]
fn test_string_to_number() {
    assert_eq!(
        cast_value(Value::from("123.0"), &ValueType::F64).unwrap(),
        Value::F64(123.0)
    );
    assert_eq!(
        cast_value(Value::from(" 42 "), &ValueType::I32).unwrap(),
        Value::I32(42)
    );
}

#[test]
fn test_float_to_integer_truncates() {
    assert_eq!(
        cast_value(Value::F64(3.9), &ValueType::I32).unwrap(),
        Value::I32(3)
    );
}

#[test]
fn test_narrowing_out_of_range_fails() {
    assert!(matches!(
        cast_value(Value::I64(300), &ValueType::U8),
        Err(CoercionError::Conversion { from: "i64", .. })
    ));
}

#[test]
fn test_nil_casts_to_nil() {
    assert_eq!(cast_value(Value::Null, &ValueType::I32).unwrap(), Value::Null);
    assert_eq!(
        cast_value(Value::Null, &nullable(ValueType::Date)).unwrap(),
        Value::Null
    );
}

#[test]
fn test_nullable_target_casts_to_inner_type() {
    assert_eq!(
        cast_value(Value::I32(5), &nullable(ValueType::I64)).unwrap(),
        Value::I64(5)
    );
}

#[test]
fn test_number_to_date_uses_reference_date() {
    assert_eq!(
        cast_value(Value::F64(0.0), &ValueType::Date).unwrap(),
        Value::Date(reference_date())
    );
    assert_eq!(
        cast_value(Value::Date(reference_date()), &ValueType::F64).unwrap(),
        Value::F64(0.0)
    );
}

#[test]
fn test_string_to_bool() {
    assert_eq!(
        cast_value(Value::from("YES"), &ValueType::Bool).unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        cast_value(Value::from("0"), &ValueType::Bool).unwrap(),
        Value::Boolean(false)
    );
}

#[test]
fn test_invalid_uuid() {
    assert!(matches!(
        cast_value(Value::from("not-a-uuid"), &ValueType::Uuid),
        Err(CoercionError::InvalidUuid { .. })
    ));
}

#[test]
fn test_hex_string_to_data() {
    assert_eq!(
        cast_value(Value::from("0a0b"), &ValueType::Data).unwrap(),
        Value::Data(vec![10, 11])
    );
}

#[test]
fn test_collection_casts_each_element() {
    assert_eq!(
        cast_value(
            Value::from(vec![1i64, 2]),
            &ValueType::collection_of(ValueType::F64)
        )
        .unwrap(),
        Value::Array(vec![Value::F64(1.0), Value::F64(2.0)])
    );
}

#[test]
fn test_mixed_array_has_no_element_type() {
    assert_eq!(
        Value::Array(vec![Value::I64(1), Value::from("a")]).value_type(),
        ValueType::collection_of(ValueType::Any)
    );
    assert_eq!(
        Value::Array(vec![Value::Null, Value::I64(1), Value::I64(2)]).value_type(),
        ValueType::collection_of(ValueType::I64)
    );
}

#[test]
fn test_reconcile_runtime_values() {
    assert_eq!(
        reconcile(Value::I32(1), Value::F64(1.5)).unwrap(),
        (Value::F64(1.0), Value::F64(1.5))
    );
    assert_eq!(
        reconcile(Value::from("7"), Value::I64(7)).unwrap(),
        (Value::from("7"), Value::from("7"))
    );
}
