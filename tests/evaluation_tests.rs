// tests/evaluation_tests.rs

use std::sync::Arc;

use chrono::{Duration, Utc};
use predicate_lang::value::reference_date;
use predicate_lang::{
    Bindings, CompileError, Compiler, EvaluationError, Expr, Predicate, Record, SchemaResolver,
    Value, ValueType,
};
use uuid::Uuid;

/// Compiler traces go to the test harness's captured output.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

fn eval(format: &str, args: Vec<Value>, object: &Value) -> bool {
    init_tracing();
    let predicate = Predicate::parse(format, args).unwrap();
    Compiler::default()
        .compile_predicate(&predicate)
        .unwrap()
        .evaluate(object)
        .unwrap()
}

fn eval_error(format: &str, object: &Value) -> EvaluationError {
    let predicate = Predicate::parse(format, vec![]).unwrap();
    Compiler::default()
        .compile_predicate(&predicate)
        .unwrap()
        .evaluate(object)
        .unwrap_err()
}

fn value(format: &str, args: Vec<Value>) -> Value {
    let expr = Expr::parse(format, args).unwrap();
    Compiler::default()
        .compile_expression(&expr)
        .unwrap()
        .value(&Value::Null)
        .unwrap()
}

fn value_error(format: &str) -> EvaluationError {
    let expr = Expr::parse(format, vec![]).unwrap();
    Compiler::default()
        .compile_expression(&expr)
        .unwrap()
        .value(&Value::Null)
        .unwrap_err()
}

fn compile_error(format: &str) -> CompileError {
    init_tracing();
    let predicate = Predicate::parse(format, vec![]).unwrap();
    Compiler::default().compile_predicate(&predicate).unwrap_err()
}

fn person() -> Value {
    let address = Record::new("Address").with("City", "Paris");
    let author = Record::new("Author").with("Address", address);
    Record::new("Person")
        .with("Name", "Ada")
        .with("Age", 36i64)
        .with("Nickname", "Café")
        .with("Tags", vec!["bug", "ui"])
        .with("Numbers", vec![0i64, 1, 1, 2, 3, 5, 8, 13, 21])
        .with("Author", author)
        .into_value()
}

// ============================================================================
// Comparisons
// ============================================================================

#[test]
fn test_equality_across_integer_widths() {
    assert!(!eval("%d == 1", vec![Value::I64(10)], &Value::Null));
    assert!(eval("%d == %ld", vec![Value::I64(42), Value::I64(42)], &Value::Null));
    assert!(eval("10 < 11.0", vec![], &Value::Null));
    assert!(eval("2 != 3", vec![], &Value::Null));
}

#[test]
fn test_key_path_comparisons() {
    let p = person();
    assert!(eval("Name == 'Ada'", vec![], &p));
    assert!(eval("Age >= 18 AND Age <= 40", vec![], &p));
    assert!(eval("Age > %d", vec![Value::I32(30)], &p));
    assert!(!eval("Age < 36", vec![], &p));
}

#[test]
fn test_key_path_placeholder_case_insensitive() {
    let p = Record::new("Greeting").with("Name", "hi").into_value();
    assert!(eval("%K ==[c] 'Hi'", vec![Value::from("Name")], &p));
    assert!(!eval("%K == 'Hi'", vec![Value::from("Name")], &p));
}

#[test]
fn test_diacritic_insensitive() {
    let p = person();
    assert!(eval("Nickname ==[cd] 'CAFE'", vec![], &p));
    assert!(!eval("Nickname ==[c] 'cafe'", vec![], &p));
    assert!(eval("Nickname BEGINSWITH[d] 'Caf'", vec![], &p));
}

#[test]
fn test_diacritic_folding_beyond_latin1() {
    let named = |name: &str| Record::new("Word").with("Name", name).into_value();
    assert!(eval("Name ==[d] 'Tieng'", vec![], &named("Tiếng")));
    assert!(eval("Name ==[d] 'Lodz'", vec![], &named("Łódź")));
    assert!(eval("Name ==[cd] 'aesir'", vec![], &named("Æsir")));
    assert!(eval("Name ==[cd] 'strasse'", vec![], &named("Straße")));
    assert!(eval("Name ==[d] 'Cafe'", vec![], &named("Cafe\u{301}")));
    assert!(eval("Name ==[d] '한국어'", vec![], &named("한국어")));
    assert!(!eval("Name == 'Tieng'", vec![], &named("Tiếng")));
}

#[test]
fn test_self_string_operators() {
    let name = Value::from("Nick");
    assert!(eval("SELF BEGINSWITH 'N'", vec![], &name));
    assert!(eval("SELF ENDSWITH 'ck'", vec![], &name));
    assert!(eval("SELF CONTAINS[c] 'IC'", vec![], &name));
    assert!(!eval("SELF BEGINSWITH 'n'", vec![], &name));
}

#[test]
fn test_matches_is_anchored() {
    let p = Record::new("Greeting").with("Text", "Hello World").into_value();
    assert!(eval("Text MATCHES '.*World$'", vec![], &p));
    assert!(!eval("Text MATCHES 'World'", vec![], &p));
    assert!(eval("Text MATCHES[c] 'hello.*'", vec![], &p));
}

#[test]
fn test_like_globs() {
    let p = Record::new("User").with("Name", "John").into_value();
    assert!(eval("Name LIKE 'J*n'", vec![], &p));
    assert!(eval("Name LIKE 'J??n'", vec![], &p));
    assert!(!eval("Name LIKE 'J?n'", vec![], &p));
    assert!(eval("Name LIKE[c] 'john'", vec![], &p));
    assert!(!eval("Name LIKE 'Jo.n'", vec![], &p));
}

#[test]
fn test_membership() {
    let p = person();
    assert!(eval("'ui' IN Tags", vec![], &p));
    assert!(eval("Tags CONTAINS 'bug'", vec![], &p));
    assert!(eval("%@ IN Numbers", vec![Value::I32(13)], &p));
    assert!(!eval("4 IN Numbers", vec![], &p));
    assert!(eval("'d' IN 'Ada'", vec![], &p));
    assert!(eval("Name IN {'Ada', 'Grace'}", vec![], &p));
}

#[test]
fn test_between() {
    assert!(eval("%@ BETWEEN {0, 2}", vec![Value::I64(1)], &Value::Null));
    assert!(eval("%@ BETWEEN {0, 2}", vec![Value::I64(2)], &Value::Null));
    assert!(!eval("%@ BETWEEN {0, 2}", vec![Value::I64(3)], &Value::Null));
    assert!(eval("Age BETWEEN {30.5, 40}", vec![], &person()));
}

#[test]
fn test_uuid_against_string_in_both_orders() {
    let id = Uuid::new_v4();
    let text = Value::from(id.hyphenated().to_string());
    assert!(eval("%@ == %@", vec![Value::Uuid(id), text.clone()], &Value::Null));
    assert!(eval("%@ == %@", vec![text.clone(), Value::Uuid(id)], &Value::Null));

    let object = Record::new("Item").with("Id", id).into_value();
    assert!(eval("Id == %@", vec![text.clone()], &object));
    assert!(eval("%@ == Id", vec![text], &object));
}

#[test]
fn test_unsigned_extremes_against_signed() {
    let max = Value::U64(u64::MAX);
    assert!(eval("%@ > 1", vec![max.clone()], &Value::Null));
    assert!(eval("%@ != %@", vec![max.clone(), Value::I64(-1)], &Value::Null));
    assert!(!eval("%@ IN {1, 2}", vec![max], &Value::Null));
    assert!(eval("%@ IN {1, 2}", vec![Value::U64(2)], &Value::Null));
    assert!(eval("%@ < %@", vec![Value::I8(-1), Value::U8(200)], &Value::Null));

    let counter = Record::new("Counter").with("Hits", Value::U64(u64::MAX)).into_value();
    assert!(eval("Hits > 0", vec![], &counter));
}

#[test]
fn test_membership_in_mixed_collection() {
    let mixed = Value::Array(vec![Value::I64(1), Value::from("a")]);
    assert!(eval("'a' IN %@", vec![mixed.clone()], &Value::Null));
    assert!(eval("1 IN %@", vec![mixed.clone()], &Value::Null));
    assert!(!eval("'b' IN %@", vec![mixed], &Value::Null));
}

#[test]
fn test_unicode_escape_in_literal() {
    let p = Record::new("Weather").with("Icon", "\u{2602}").into_value();
    assert!(eval("Icon == '\\u2602'", vec![], &p));
}

// ============================================================================
// nil handling
// ============================================================================

#[test]
fn test_missing_member_is_nil() {
    let p = person();
    assert!(eval("SELF.Missing == nil", vec![], &p));
    assert!(eval("Author.Missing.City == nil", vec![], &p));
    assert!(!eval("Missing == 1", vec![], &p));
    assert!(eval("Missing != 1", vec![], &p));
}

#[test]
fn test_nil_is_not_ordered() {
    let p = person();
    assert!(!eval("Missing > 1", vec![], &p));
    assert!(!eval("Missing < 1", vec![], &p));
}

#[test]
fn test_nil_string_operands_do_not_match() {
    let p = person();
    assert!(!eval("Missing BEGINSWITH 'a'", vec![], &p));
    assert!(!eval("Missing MATCHES '.*'", vec![], &p));
    assert!(!eval("Missing CONTAINS 'a'", vec![], &p));
}

#[test]
fn test_predicate_constants_ignore_object() {
    assert!(eval("TRUEPREDICATE", vec![], &Value::Null));
    assert!(!eval("FALSEPREDICATE", vec![], &Value::Null));
}

// ============================================================================
// Compounds
// ============================================================================

#[test]
fn test_truth_tables() {
    let cases = [
        ("TRUEPREDICATE AND TRUEPREDICATE", true),
        ("TRUEPREDICATE AND FALSEPREDICATE", false),
        ("FALSEPREDICATE AND FALSEPREDICATE", false),
        ("TRUEPREDICATE OR FALSEPREDICATE", true),
        ("FALSEPREDICATE OR FALSEPREDICATE", false),
        ("NOT FALSEPREDICATE", true),
        ("NOT TRUEPREDICATE", false),
        ("NOT (TRUEPREDICATE AND FALSEPREDICATE)", true),
    ];
    for (format, expected) in cases {
        assert_eq!(eval(format, vec![], &Value::Null), expected, "{}", format);
    }
}

#[test]
fn test_empty_and_single_compounds() {
    let compiler = Compiler::default();
    let run = |p: Predicate| compiler.compile_predicate(&p).unwrap().evaluate(&Value::Null).unwrap();

    assert!(!run(Predicate::and(vec![])));
    assert!(!run(Predicate::or(vec![])));
    assert!(run(Predicate::and(vec![Predicate::constant(true)])));
    assert!(!run(Predicate::or(vec![Predicate::constant(false)])));
}

#[test]
fn test_short_circuit_skips_failing_operand() {
    // The right operand would fail: Name is a string, not an object.
    let p = person();
    assert!(!eval("FALSEPREDICATE AND Name.First == 1", vec![], &p));
    assert!(eval("TRUEPREDICATE OR Name.First == 1", vec![], &p));
}

// ============================================================================
// Key paths, indexes and quantifiers
// ============================================================================

#[test]
fn test_nested_key_paths() {
    assert!(eval("Author.Address.City == 'Paris'", vec![], &person()));
}

#[test]
fn test_index_keywords() {
    let p = person();
    assert!(eval("Numbers[FIRST] == 0", vec![], &p));
    assert!(eval("Numbers[LAST] == 21", vec![], &p));
    assert!(eval("Numbers[SIZE] == 9", vec![], &p));
    assert!(eval("Numbers[4] == 3", vec![], &p));
    assert!(eval("Name[SIZE] == 3", vec![], &p));
    assert!(eval("Missing[SIZE] == 0", vec![], &p));
}

#[test]
fn test_index_out_of_bounds() {
    assert_eq!(
        eval_error("Numbers[20] == 1", &person()),
        EvaluationError::IndexOutOfBounds { index: 20, len: 9 }
    );
}

#[test]
fn test_quantifiers_over_nested_collections() {
    let element = |s: &str| Record::new("Element").with("S", s);
    let inner = Record::new("B").with("Collection", vec![element("x"), element("y")]);
    let object = Record::new("A").with("B", inner).into_value();

    // Member names resolve case-insensitively on records.
    assert!(eval("ANY b.collection.s == 'x'", vec![], &object));
    assert!(!eval("ALL b.collection.s == 'x'", vec![], &object));
    assert!(eval("ALL B.Collection.S IN {'x', 'y'}", vec![], &object));
    assert!(eval("NONE B.Collection.S == 'z'", vec![], &object));
    assert!(!eval("NONE B.Collection.S ==[c] 'Y'", vec![], &object));
}

#[test]
fn test_quantifier_over_empty_collection() {
    let object = Record::new("A").with("Items", Vec::<i64>::new()).into_value();
    assert!(!eval("ANY Items == 1", vec![], &object));
    assert!(eval("ALL Items == 1", vec![], &object));
}

#[test]
fn test_subquery() {
    let p = person();
    assert!(eval("SUBQUERY(Numbers, $n, $n > 5).@count == 3", vec![], &p));
    assert!(eval("SUBQUERY(Numbers, $n, $n > 5)[SIZE] == 3", vec![], &p));
    assert!(eval("SUBQUERY(Numbers, $n, $n > 5)[FIRST] == 8", vec![], &p));
    assert!(eval(
        "SUBQUERY(Tags, $t, $t BEGINSWITH 'b').@count == 1",
        vec![],
        &p
    ));
}

#[test]
fn test_collection_operators() {
    let p = person();
    assert!(eval("Numbers.@count == 9", vec![], &p));
    assert!(eval("Numbers.@sum == 54", vec![], &p));
    assert!(eval("Numbers.@max == 21", vec![], &p));
    assert!(eval("Numbers.@min == 0", vec![], &p));
    assert!(eval("Numbers.@avg == 6", vec![], &p));
}

#[test]
fn test_member_of_scalar_fails() {
    assert!(matches!(
        eval_error("Name.First == 1", &person()),
        EvaluationError::NotAnObject { found: "string", .. }
    ));
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_arithmetic() {
    assert_eq!(value("1 + 2 + 3 * 9", vec![]), Value::I64(30));
    assert_eq!(value("2.0 ** 3.0", vec![]), Value::F64(8.0));
    assert_eq!(value("-(1 + 2)", vec![]), Value::I64(-3));
    assert_eq!(value("3 - 2", vec![]), Value::I64(1));
    assert_eq!(value("100 / 10", vec![]), Value::I64(10));
    assert_eq!(value("7 / 2.0", vec![]), Value::F64(3.5));
    assert_eq!(value("2 ** -1", vec![]), Value::F64(0.5));
}

#[test]
fn test_arithmetic_errors() {
    assert_eq!(value_error("1 / 0"), EvaluationError::DivisionByZero);
    assert_eq!(value_error("1.0 / 0.0"), EvaluationError::DivisionByZero);
    assert_eq!(
        value_error("9223372036854775807 + 1"),
        EvaluationError::Overflow { op: "+" }
    );
}

#[test]
fn test_string_concatenation() {
    assert_eq!(value("'a' + 1", vec![]), Value::from("a1"));
    assert_eq!(value("'a' + 'b'", vec![]), Value::from("ab"));
}

#[test]
fn test_nil_arithmetic_is_nil() {
    assert_eq!(value("nil + 1", vec![]), Value::Null);
}

#[test]
fn test_literals() {
    assert_eq!(value("YES", vec![]), Value::Boolean(true));
    assert_eq!(value("NO", vec![]), Value::Boolean(false));
    assert_eq!(value("nil", vec![]), Value::Null);
    assert_eq!(value("'\\u2602'", vec![]), Value::from("\u{2602}"));
}

#[test]
fn test_aggregate_literals() {
    assert_eq!(value("{}.@count", vec![]), Value::I64(0));
    assert_eq!(value("{0, 1, 2}.@count", vec![]), Value::I64(3));
    assert_eq!(
        value("{1, 'a'}", vec![]),
        Value::Array(vec![Value::I64(1), Value::from("a")])
    );
}

#[test]
fn test_assignment() {
    assert_eq!(value("$a := 1 + 2", vec![]), Value::I64(3));
}

#[test]
fn test_builtin_functions() {
    assert_eq!(
        value("SUM(%@)", vec![Value::from(vec![5i64, 8])]),
        Value::I64(13)
    );
    assert_eq!(value("COUNT(1, 2, 3)", vec![]), Value::I64(3));
    assert_eq!(value("AVERAGE({1, 2})", vec![]), Value::F64(1.5));
    assert_eq!(value("MIN({3, 1, 2})", vec![]), Value::I64(1));
    assert_eq!(value("MAX({3, 1, 2})", vec![]), Value::I64(3));
    assert_eq!(value("ABS(-3)", vec![]), Value::I64(3));
    assert_eq!(value("SQRT(16)", vec![]), Value::F64(4.0));
    assert_eq!(value("UPPERCASE('ab')", vec![]), Value::from("AB"));
    assert_eq!(value("lowercase('AB')", vec![]), Value::from("ab"));
    assert_eq!(value("AVERAGE({})", vec![]), Value::Null);
}

#[test]
fn test_now_and_random() {
    match value("NOW()", vec![]) {
        Value::Date(now) => assert!((Utc::now() - now).num_milliseconds().abs() < 1000),
        other => panic!("expected a date, got {:?}", other),
    }
    assert_ne!(value("RANDOM()", vec![]), value("RANDOM()", vec![]));
}

#[test]
fn test_targetless_function_selectors() {
    assert_eq!(value("FUNCTION('modulus:by:', 10, 7)", vec![]), Value::I64(3));
    assert_eq!(value("FUNCTION('add:to:', 1, 2)", vec![]), Value::I64(3));
    assert_eq!(value("FUNCTION('from:subtract:', 5, 2)", vec![]), Value::I64(3));
    assert_eq!(value("FUNCTION('multiply:by:', 4, 2)", vec![]), Value::I64(8));
    assert_eq!(value("FUNCTION('divide:by:', 9, 3)", vec![]), Value::I64(3));
}

#[test]
fn test_selectors_on_targets() {
    assert_eq!(
        value("FUNCTION('abc', 'uppercaseString')", vec![]),
        Value::from("ABC")
    );
    assert_eq!(value("FUNCTION('abc', 'length')", vec![]), Value::I64(3));
    assert_eq!(
        value("FUNCTION('ab', 'stringByAppendingString:', 'cd')", vec![]),
        Value::from("abcd")
    );
    assert_eq!(value("FUNCTION(3.7, 'integerValue')", vec![]), Value::I64(3));
    assert_eq!(value("FUNCTION(5, 'stringValue')", vec![]), Value::from("5"));
    assert_eq!(value("FUNCTION({1, 2}, 'count')", vec![]), Value::I64(2));
}

#[test]
fn test_selector_on_nil_is_nil() {
    let object = Record::new("Empty").into_value();
    let expr = Expr::parse("FUNCTION(Missing, 'uppercaseString')", vec![]).unwrap();
    assert_eq!(expr.evaluate_object(&object).unwrap(), Value::Null);
}

#[test]
fn test_selector_on_wrong_runtime_type() {
    let object = Record::new("Item").with("Count", 3i64).into_value();
    let expr = Expr::parse("FUNCTION(Count, 'uppercaseString')", vec![]).unwrap();
    let compiled = Compiler::default().compile_expression(&expr).unwrap();
    assert_eq!(
        compiled.value(&object).unwrap_err(),
        EvaluationError::SelectorNotFound {
            selector: "uppercaseString".into(),
            receiver: "i64",
        }
    );
}

#[test]
fn test_date_arithmetic() {
    assert_eq!(
        value("CAST(0, 'NSDate') + 60", vec![]),
        Value::Date(reference_date() + Duration::seconds(60))
    );
    assert_eq!(
        value("CAST(60, 'NSDate') - CAST(0, 'NSDate')", vec![]),
        Value::F64(60.0)
    );
}

#[test]
fn test_date_by_adding_days() {
    match value("FUNCTION(now(), 'dateByAddingDays:', -2)", vec![]) {
        Value::Date(date) => {
            let minutes = (Utc::now() - date).num_minutes();
            assert!((2 * 24 * 60 - 1..=2 * 24 * 60 + 1).contains(&minutes));
        }
        other => panic!("expected a date, got {:?}", other),
    }
}

#[test]
fn test_casts() {
    assert_eq!(value("CAST('123.0', 'NSNumber')", vec![]), Value::F64(123.0));
    assert_eq!(value("CAST(12, 'NSString')", vec![]), Value::from("12"));
    match value("CAST(CAST(now(), 'NSNumber'), 'NSDate')", vec![]) {
        Value::Date(date) => assert!((Utc::now() - date).num_milliseconds().abs() < 1000),
        other => panic!("expected a date, got {:?}", other),
    }
}

// ============================================================================
// Variables
// ============================================================================

#[test]
fn test_bound_variables_can_be_overridden() {
    let mut bindings = Bindings::new();
    bindings.insert("varA".into(), Value::I64(1));
    bindings.insert("varB".into(), Value::I64(1));

    let predicate = Predicate::parse("$varA == $varB", vec![]).unwrap();
    let compiled = Compiler::default()
        .with_bindings(bindings)
        .compile_predicate(&predicate)
        .unwrap();
    assert!(compiled.evaluate(&Value::Null).unwrap());

    let mut overrides = Bindings::new();
    overrides.insert("varB".into(), Value::from("x"));
    assert!(!compiled.evaluate_with(&Value::Null, &overrides).unwrap());

    overrides.insert("varB".into(), Value::F64(1.0));
    assert!(compiled.evaluate_with(&Value::Null, &overrides).unwrap());
}

#[test]
fn test_assignment_visible_to_later_operands() {
    let record = person();
    assert!(eval("($a := 1 + 2) == 3 AND $a == 3", vec![], &record));
    assert!(eval("($a := 2) > 1 AND $a * 2 == 4", vec![], &record));
    assert!(eval("($n := Name) == 'Ada' AND $n BEGINSWITH 'A'", vec![], &record));
    // an OR operand only runs after the ones before it were false
    assert!(eval("($a := 1) == 2 OR $a == 1", vec![], &record));
    assert!(eval("(($a := 5) == 5 AND TRUEPREDICATE) AND $a == 5", vec![], &record));
}

#[test]
fn test_assignment_in_conditional_branch_is_not_visible() {
    let unknown = |name: &str| CompileError::UnknownVariable { name: name.into() };
    assert_eq!(
        compile_error("(FALSEPREDICATE AND ($a := 1) == 1) OR $a == 1"),
        unknown("a")
    );
    assert_eq!(
        compile_error("(Age > 100 OR ($a := 1) == 1) AND $a == 1"),
        unknown("a")
    );
    assert_eq!(
        compile_error("ANY {1, 2} == ($x := 1) AND $x == 1"),
        unknown("x")
    );
    assert_eq!(
        compile_error("SUBQUERY({1, 2}, $e, ($y := $e) == 1).@count == 1 AND $y == 1"),
        unknown("y")
    );
    assert_eq!(
        compile_error("Name MATCHES ($p := '.*') AND $p == '.*'"),
        unknown("p")
    );
}

#[test]
fn test_variable_key_path() {
    let mut bindings = Bindings::new();
    bindings.insert("user".into(), person());
    let predicate = Predicate::parse("$user.Name == 'Ada'", vec![]).unwrap();
    let compiled = Compiler::default()
        .with_bindings(bindings)
        .compile_predicate(&predicate)
        .unwrap();
    assert!(compiled.evaluate(&Value::Null).unwrap());
}

// ============================================================================
// Typed schemas
// ============================================================================

fn typed_compiler() -> Compiler {
    let schema = SchemaResolver::new()
        .field("User", "Age", ValueType::I32)
        .field("User", "Name", ValueType::String)
        .field("User", "Scores", ValueType::collection_of(ValueType::I64));
    Compiler::default()
        .with_resolver(Arc::new(schema))
        .with_root_type(ValueType::Object("User".into()))
}

fn user() -> Value {
    Record::new("User")
        .with("Age", 36i32)
        .with("Name", "Ada")
        .with("Scores", vec![3i64, 9])
        .into_value()
}

#[test]
fn test_typed_members_coerce() {
    let compiler = typed_compiler();
    for (format, expected) in [
        ("Age > 30", true),
        ("Age == 36.0", true),
        ("name ==[c] 'ADA'", true),
        ("ANY Scores > 8", true),
        ("ALL Scores > 8", false),
    ] {
        let predicate = Predicate::parse(format, vec![]).unwrap();
        let compiled = compiler.compile_predicate(&predicate).unwrap();
        assert_eq!(compiled.evaluate(&user()).unwrap(), expected, "{}", format);
    }
}

#[test]
fn test_typed_compile_errors() {
    let compiler = typed_compiler();
    let error = |format: &str| {
        compiler
            .compile_predicate(&Predicate::parse(format, vec![]).unwrap())
            .unwrap_err()
    };

    assert_eq!(
        error("Email == 'x'"),
        CompileError::UnknownMember {
            shape: "User".into(),
            member: "Email".into(),
        }
    );
    assert!(matches!(error("Name.First == 1"), CompileError::NotAnObject { .. }));
    assert!(matches!(error("Age BEGINSWITH '3'"), CompileError::UnsupportedOperands { .. }));
    assert!(matches!(error("ANY Age == 1"), CompileError::UnsupportedModifier { modifier: "ANY", .. }));
}

#[test]
fn test_filter() {
    let predicate = Predicate::parse("Age >= 18", vec![]).unwrap();
    let compiled = Compiler::default().compile_predicate(&predicate).unwrap();
    let people = vec![
        Record::new("P").with("Age", 12i64).into_value(),
        Record::new("P").with("Age", 30i64).into_value(),
        Record::new("P").with("Age", 18i64).into_value(),
    ];
    let adults = compiled.filter(&people).unwrap();
    assert_eq!(adults.len(), 2);
    assert!(adults[0] == &people[1]);
}

// ============================================================================
// Compile errors
// ============================================================================

#[test]
fn test_compile_errors() {
    assert_eq!(
        compile_error("$nope == 1"),
        CompileError::UnknownVariable { name: "nope".into() }
    );
    assert!(matches!(
        compile_error("NOW(1) == 1"),
        CompileError::Arity { found: 1, .. }
    ));
    assert_eq!(
        compile_error("Age BETWEEN {1}"),
        CompileError::MalformedBetween { found: 1 }
    );
    assert!(matches!(
        compile_error("FOO() == 1"),
        CompileError::UnknownFunction { .. }
    ));
    assert!(matches!(
        compile_error("FUNCTION('nope:', 1) == 1"),
        CompileError::UnknownSelector { .. }
    ));
    assert!(matches!(
        compile_error("FUNCTION(1, 'uppercaseString') == 'x'"),
        CompileError::UnsupportedSelector { .. }
    ));
    assert!(matches!(
        compile_error("ANY 5 == 1"),
        CompileError::UnsupportedModifier { .. }
    ));
    assert!(matches!(
        compile_error("5 BEGINSWITH 'a'"),
        CompileError::UnsupportedOperands { .. }
    ));
    assert!(matches!(
        compile_error("CAST(YES, 'NSDate') == 1"),
        CompileError::InvalidCast { .. }
    ));
    assert!(matches!(
        compile_error("Name MATCHES '('"),
        CompileError::InvalidPattern { .. }
    ));
    assert!(matches!(
        compile_error("SUM(5) == 5"),
        CompileError::NotACollection { .. }
    ));
    assert!(matches!(
        compile_error("YES == CAST(0, 'NSDate')"),
        CompileError::Coercion(_)
    ));
}

#[test]
fn test_malformed_not() {
    let predicate = Predicate::Compound {
        kind: predicate_lang::CompoundKind::Not,
        subpredicates: vec![],
    };
    assert_eq!(
        Compiler::default().compile_predicate(&predicate).unwrap_err(),
        CompileError::MalformedNot { found: 0 }
    );
}

#[test]
fn test_evaluate_object_convenience() {
    let predicate = Predicate::parse("Age > 30", vec![]).unwrap();
    assert!(predicate.evaluate_object(&person()).unwrap());
}
