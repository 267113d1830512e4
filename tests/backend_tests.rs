// tests/backend_tests.rs

use predicate_lang::ir::Node;
use predicate_lang::{
    BackendCapabilities, CompiledPredicate, Compiler, Dialect, EvaluationError, Predicate, Record,
    Value,
};

/// Compiler traces go to the test harness's captured output.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

fn backend(case_insensitive_collation: bool) -> Dialect {
    Dialect::Backend(BackendCapabilities {
        case_insensitive_collation,
    })
}

fn compile(dialect: Dialect, format: &str) -> CompiledPredicate {
    init_tracing();
    let predicate = Predicate::parse(format, vec![]).unwrap();
    Compiler::new(dialect).compile_predicate(&predicate).unwrap()
}

fn has_fold(compiled: &CompiledPredicate) -> bool {
    compiled.node().any(&|node| matches!(node, Node::Fold { .. }))
}

// ============================================================================
// Case folding
// ============================================================================

#[test]
fn test_in_memory_folds_case() {
    assert!(has_fold(&compile(Dialect::InMemory, "Name ==[c] 'Hi'")));
}

#[test]
fn test_backend_without_collation_folds_case() {
    assert!(has_fold(&compile(backend(false), "Name ==[c] 'Hi'")));
}

#[test]
fn test_backend_with_collation_emits_no_folding() {
    let compiled = compile(backend(true), "Name ==[c] 'Hi' AND Name BEGINSWITH[c] 'h'");
    assert!(!has_fold(&compiled));
    assert_eq!(
        compiled.to_string(),
        "(and (== (path self Name) \"Hi\") (BEGINSWITH (path self Name) \"h\"))"
    );
}

#[test]
fn test_backend_with_collation_still_folds_diacritics() {
    assert!(has_fold(&compile(backend(true), "Name ==[cd] 'Hi'")));
}

#[test]
fn test_normalized_option_skips_folding() {
    assert!(!has_fold(&compile(Dialect::InMemory, "Name ==[cn] 'Hi'")));
}

#[test]
fn test_constant_operands_fold_in_place() {
    let compiled = compile(Dialect::InMemory, "Name ==[c] 'Hi'");
    assert_eq!(
        compiled.to_string(),
        "(==? (fold-c (path self Name)) \"hi\")"
    );
}

// ============================================================================
// Null safety
// ============================================================================

#[test]
fn test_in_memory_operators_are_null_safe() {
    let compiled = compile(Dialect::InMemory, "Name BEGINSWITH 'a'");
    assert!(compiled.node().any(&|node| matches!(
        node,
        Node::Compare {
            null_safe: true,
            ..
        }
    )));
    let object = Record::new("User").into_value();
    assert!(!compiled.evaluate(&object).unwrap());
}

#[test]
fn test_backend_operators_are_plain() {
    let compiled = compile(backend(false), "Name BEGINSWITH 'a'");
    assert!(!compiled.node().any(&|node| matches!(
        node,
        Node::Compare {
            null_safe: true,
            ..
        }
    )));
    let object = Record::new("User").into_value();
    assert_eq!(
        compiled.evaluate(&object).unwrap_err(),
        EvaluationError::NullOperand { op: "BEGINSWITH" }
    );
}

#[test]
fn test_backend_match_is_plain() {
    let compiled = compile(backend(false), "Name LIKE 'a*'");
    assert!(compiled.node().any(&|node| matches!(
        node,
        Node::Match {
            null_safe: false,
            ..
        }
    )));
}

// ============================================================================
// Shared behavior
// ============================================================================

#[test]
fn test_dialect_is_recorded() {
    assert_eq!(compile(backend(true), "TRUEPREDICATE").dialect(), backend(true));
    assert_eq!(Compiler::default().dialect(), Dialect::InMemory);
}

#[test]
fn test_constants_are_coerced_at_compile_time() {
    let compiled = compile(backend(false), "1 == 1.5 OR 2 < 3.0");
    assert!(!compiled.node().any(&|node| matches!(node, Node::Cast { .. })));
    assert!(compiled.evaluate(&Value::Null).unwrap());
}

#[test]
fn test_quantifier_shape() {
    let compiled = compile(Dialect::InMemory, "ANY Tags == 'x'");
    assert_eq!(
        compiled.to_string(),
        "(any $#elem0 (path self Tags) (==? $#elem0 \"x\"))"
    );
    let object = Record::new("Doc")
        .with("Tags", vec!["x", "y"])
        .into_value();
    assert!(compiled.evaluate(&object).unwrap());
    assert!(!compiled.evaluate(&Value::Null).unwrap());
}
