//! Stock rewriters. Each is idempotent: a second pass leaves the tree unchanged.

use uuid::Uuid;

use crate::{
    ast::Expr,
    value::Value,
    visit::{NodeKind, Rewriter},
};

/// Casing convention for key-path components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Casing {
    /// `author.name` → `Author.Name`
    Pascal,
    /// `Author.Name` → `author.name`
    Camel,
    /// Every character lower-cased
    Lower,
}

impl Casing {
    pub fn apply(&self, name: &str) -> String {
        let mut chars = name.chars();
        match (self, chars.next()) {
            (_, None) => String::new(),
            (Casing::Pascal, Some(first)) => first.to_uppercase().chain(chars).collect(),
            (Casing::Camel, Some(first)) => first.to_lowercase().chain(chars).collect(),
            (Casing::Lower, Some(_)) => name.to_lowercase(),
        }
    }
}

/// Normalize every key-path component to `casing`.
///
/// ```
/// use predicate_lang::{Predicate, rewriters::{key_path_casing, Casing}};
///
/// let mut p = Predicate::parse("author.name == 'Ada'", vec![]).unwrap();
/// key_path_casing(Casing::Pascal).rewrite_predicate(&mut p);
/// assert_eq!(p.to_string(), "(Author.Name == \"Ada\")");
/// ```
pub fn key_path_casing(casing: Casing) -> Rewriter {
    Rewriter::new().on_expr(NodeKind::KeyPath, move |expr| {
        if let Expr::KeyPath { components, .. } = expr {
            for component in components.iter_mut() {
                *component = casing.apply(component);
            }
        }
    })
}

/// Only the canonical hyphenated form is recognized.
fn looks_like_uuid(text: &str) -> Option<Uuid> {
    let hyphens = [8, 13, 18, 23];
    let shaped = text.len() == 36
        && text
            .char_indices()
            .all(|(i, c)| if hyphens.contains(&i) { c == '-' } else { c.is_ascii_hexdigit() });
    if shaped { Uuid::try_parse(text).ok() } else { None }
}

fn reshape(value: &mut Value) {
    match value {
        Value::String(text) => {
            if let Some(uuid) = looks_like_uuid(text) {
                *value = Value::Uuid(uuid);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(reshape),
        _ => {}
    }
}

/// Retype string constants that are spelled like identifiers (`'0f8fad5b-d9cb-469f-...'`)
/// as [`Value::Uuid`], so comparisons against identifier members need no `CAST`.
pub fn literal_shapes() -> Rewriter {
    Rewriter::new().on_expr(NodeKind::Constant, |expr| {
        if let Expr::Constant(value) = expr {
            reshape(value);
        }
    })
}
