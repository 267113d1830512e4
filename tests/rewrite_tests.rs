// tests/rewrite_tests.rs

use predicate_lang::rewriters::{Casing, key_path_casing, literal_shapes};
use predicate_lang::visit::{NodeKind, Rewriter};
use predicate_lang::{ComparisonOp, Compiler, Expr, Predicate, Record, Value};
use uuid::Uuid;

const ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

fn parse(format: &str) -> Predicate {
    Predicate::parse(format, vec![]).unwrap()
}

fn rewritten(mut rewriter: Rewriter, format: &str) -> Predicate {
    let mut predicate = parse(format);
    rewriter.rewrite_predicate(&mut predicate);
    predicate
}

// ============================================================================
// Node kinds
// ============================================================================

#[test]
fn test_node_kinds() {
    assert_eq!(NodeKind::of_expr(&Expr::key_path("A.B")), NodeKind::KeyPath);
    assert_eq!(NodeKind::of_expr(&Expr::nil()), NodeKind::Constant);
    assert_eq!(
        NodeKind::of_predicate(&Predicate::constant(true)),
        NodeKind::PredicateConstant
    );
    assert!(NodeKind::Compound.is_predicate());
    assert!(!NodeKind::Cast.is_predicate());
}

#[test]
fn test_handles_registered_kinds() {
    let rewriter = Rewriter::new().on_expr(NodeKind::Variable, |_| {});
    assert!(rewriter.handles(NodeKind::Variable));
    assert!(!rewriter.handles(NodeKind::KeyPath));
}

// ============================================================================
// Custom hooks
// ============================================================================

#[test]
fn test_expression_hook_replaces_nodes() {
    let rewriter = Rewriter::new().on_expr(NodeKind::Variable, |expr| {
        *expr = Expr::constant(1i64);
    });
    assert_eq!(rewritten(rewriter, "$x == 1").to_string(), "(1 == 1)");
}

#[test]
fn test_predicate_hook() {
    let rewriter = Rewriter::new().on_predicate(NodeKind::Comparison, |predicate| {
        if let Predicate::Comparison(c) = predicate
            && c.op == ComparisonOp::EqualTo
        {
            c.op = ComparisonOp::NotEqualTo;
        }
    });
    assert_eq!(
        rewritten(rewriter, "A == 1 OR NOT (B == 2)").to_string(),
        "((A != 1) OR NOT (B != 2))"
    );
}

#[test]
fn test_hooks_reach_nested_nodes() {
    let rewriter = Rewriter::new().on_expr(NodeKind::Constant, |expr| {
        if let Expr::Constant(Value::I64(n)) = expr {
            *n *= 10;
        }
    });
    assert_eq!(
        rewritten(
            rewriter,
            "SUBQUERY(Items, $i, $i.Price > 1).@count == FUNCTION('add:to:', 2, 3)"
        )
        .to_string(),
        "(COUNT(SUBQUERY(Items, $i, ($i.Price > 10))) == FUNCTION(\"add:to:\", 20, 30))"
    );
}

#[test]
fn test_hook_registered_under_wrong_family_never_fires() {
    let rewriter = Rewriter::new().on_expr(NodeKind::Comparison, |expr| {
        *expr = Expr::nil();
    });
    assert_eq!(rewritten(rewriter, "A == 1").to_string(), "(A == 1)");
}

#[test]
fn test_rewriter_collects_state() {
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut rewriter = Rewriter::new().on_expr(NodeKind::KeyPath, move |expr| {
        if let Ok(mut seen) = sink.lock() {
            seen.push(expr.to_string());
        }
    });
    let mut predicate = parse("Author.Name == 'x' AND ANY Tags == 'y'");
    rewriter.rewrite_predicate(&mut predicate);
    assert_eq!(*seen.lock().unwrap(), vec!["Author.Name", "Tags"]);
}

// ============================================================================
// Key path casing
// ============================================================================

#[test]
fn test_casing_conventions() {
    assert_eq!(Casing::Pascal.apply("author"), "Author");
    assert_eq!(Casing::Camel.apply("Author"), "author");
    assert_eq!(Casing::Lower.apply("AuthorName"), "authorname");
    assert_eq!(Casing::Pascal.apply(""), "");
}

#[test]
fn test_key_path_casing() {
    assert_eq!(
        rewritten(key_path_casing(Casing::Pascal), "author.name == 'Ada' AND $u.age > 3").to_string(),
        "((Author.Name == \"Ada\") AND ($u.Age > 3))"
    );
    assert_eq!(
        rewritten(key_path_casing(Casing::Camel), "Author.Name == 'Ada'").to_string(),
        "(author.name == \"Ada\")"
    );
}

#[test]
fn test_key_path_casing_is_idempotent() {
    let once = rewritten(key_path_casing(Casing::Pascal), "tags.@count > 1 AND author.name == 'x'");
    let mut twice = once.clone();
    key_path_casing(Casing::Pascal).rewrite_predicate(&mut twice);
    assert_eq!(once, twice);
}

#[test]
fn test_rewritten_tree_round_trips() {
    let predicate = rewritten(
        key_path_casing(Casing::Pascal),
        "any tags.name BEGINSWITH[c] 'bug' OR author.address.city == 'Paris'",
    );
    assert_eq!(parse(&predicate.to_string()), predicate);
}

#[test]
fn test_rewritten_tree_still_evaluates() {
    let predicate = rewritten(key_path_casing(Casing::Pascal), "name == 'Ada'");
    let compiled = Compiler::default().compile_predicate(&predicate).unwrap();
    let ada = Record::new("User").with("Name", "Ada").into_value();
    assert!(compiled.evaluate(&ada).unwrap());
}

// ============================================================================
// Literal shapes
// ============================================================================

#[test]
fn test_uuid_literals_are_retyped() {
    let predicate = rewritten(literal_shapes(), &format!("Id == '{}'", ID));
    let expected = Uuid::parse_str(ID).unwrap();
    match predicate {
        Predicate::Comparison(c) => assert_eq!(c.right, Expr::constant(expected)),
        other => panic!("expected comparison, got {:?}", other),
    }
}

#[test]
fn test_uuid_literals_inside_aggregates_and_arguments() {
    let predicate = rewritten(literal_shapes(), &format!("Id IN {{'{}', 'plain'}}", ID));
    assert_eq!(
        predicate.to_string(),
        format!("(Id IN {{CAST('{}', 'NSUUID'), \"plain\"}})", ID)
    );

    let mut predicate =
        Predicate::parse("Id IN %@", vec![Value::from(vec![ID, "plain"])]).unwrap();
    literal_shapes().rewrite_predicate(&mut predicate);
    match predicate {
        Predicate::Comparison(c) => assert_eq!(
            c.right,
            Expr::Constant(Value::Array(vec![
                Value::Uuid(Uuid::parse_str(ID).unwrap()),
                Value::from("plain"),
            ]))
        ),
        other => panic!("expected comparison, got {:?}", other),
    }
}

#[test]
fn test_non_canonical_strings_are_kept() {
    for text in ["0f8fad5bd9cb469fa16570867728950e", "hello", "0f8fad5b-d9cb-469f-a165-70867728950"] {
        let predicate = rewritten(literal_shapes(), &format!("Id == '{}'", text));
        match predicate {
            Predicate::Comparison(c) => assert_eq!(c.right, Expr::constant(text), "{}", text),
            other => panic!("expected comparison, got {:?}", other),
        }
    }
}

#[test]
fn test_literal_shapes_is_idempotent() {
    let once = rewritten(literal_shapes(), &format!("Id == '{}' OR Name == 'x'", ID));
    let mut twice = once.clone();
    literal_shapes().rewrite_predicate(&mut twice);
    assert_eq!(once, twice);
}
