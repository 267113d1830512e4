//! Pre-order tree rewriting through a table of per-kind hooks.
//!
//! A [`Rewriter`] holds at most one hook per [`NodeKind`]. Walking a tree calls the hook for
//! each node whose kind is registered, then descends into the children of whatever the
//! hook left in place. Kinds without a hook are traversed untouched.
//!
//! ```
//! use predicate_lang::{Expr, Predicate, visit::{NodeKind, Rewriter}};
//!
//! let mut p = Predicate::parse("Name == 'a' AND Age > 3", vec![]).unwrap();
//! let mut rewriter = Rewriter::new().on_expr(NodeKind::KeyPath, |expr| {
//!     if let Expr::KeyPath { components, .. } = expr {
//!         for c in components.iter_mut() {
//!             *c = c.to_lowercase();
//!         }
//!     }
//! });
//! rewriter.rewrite_predicate(&mut p);
//! assert_eq!(p.to_string(), "((name == \"a\") AND (age > 3))");
//! ```

use std::{collections::HashMap, fmt};

use crate::ast::{Callee, Expr, IndexKind, Predicate};

/// Tag of every node a tree can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // expressions
    Constant,
    SelfObject,
    Variable,
    KeyPath,
    FunctionCall,
    Aggregate,
    Subquery,
    UnaryMinus,
    Arithmetic,
    Index,
    Cast,
    Assignment,
    // predicates
    Comparison,
    Compound,
    PredicateConstant,
}

impl NodeKind {
    pub fn of_expr(expr: &Expr) -> Self {
        match expr {
            Expr::Constant(_) => NodeKind::Constant,
            Expr::SelfObject => NodeKind::SelfObject,
            Expr::Variable(_) => NodeKind::Variable,
            Expr::KeyPath { .. } => NodeKind::KeyPath,
            Expr::FunctionCall(_) => NodeKind::FunctionCall,
            Expr::Aggregate(_) => NodeKind::Aggregate,
            Expr::Subquery { .. } => NodeKind::Subquery,
            Expr::UnaryMinus(_) => NodeKind::UnaryMinus,
            Expr::Arithmetic { .. } => NodeKind::Arithmetic,
            Expr::Index { .. } => NodeKind::Index,
            Expr::Cast { .. } => NodeKind::Cast,
            Expr::Assignment { .. } => NodeKind::Assignment,
        }
    }

    pub fn of_predicate(predicate: &Predicate) -> Self {
        match predicate {
            Predicate::Comparison(_) => NodeKind::Comparison,
            Predicate::Compound { .. } => NodeKind::Compound,
            Predicate::Constant(_) => NodeKind::PredicateConstant,
        }
    }

    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            NodeKind::Comparison | NodeKind::Compound | NodeKind::PredicateConstant
        )
    }
}

type ExprHook = Box<dyn FnMut(&mut Expr) + Send>;
type PredicateHook = Box<dyn FnMut(&mut Predicate) + Send>;

enum Hook {
    Expr(ExprHook),
    Predicate(PredicateHook),
}

/// Dispatch table from node kind to an in-place rewrite.
#[derive(Default)]
pub struct Rewriter {
    hooks: HashMap<NodeKind, Hook>,
}

impl Rewriter {
    pub fn new() -> Self {
        Rewriter::default()
    }

    /// Register the hook for an expression kind, replacing any previous one. Hooks
    /// registered under a predicate kind never fire.
    pub fn on_expr(mut self, kind: NodeKind, hook: impl FnMut(&mut Expr) + Send + 'static) -> Self {
        self.hooks.insert(kind, Hook::Expr(Box::new(hook)));
        self
    }

    /// Register the hook for a predicate kind, replacing any previous one. Hooks
    /// registered under an expression kind never fire.
    pub fn on_predicate(
        mut self,
        kind: NodeKind,
        hook: impl FnMut(&mut Predicate) + Send + 'static,
    ) -> Self {
        self.hooks.insert(kind, Hook::Predicate(Box::new(hook)));
        self
    }

    pub fn handles(&self, kind: NodeKind) -> bool {
        self.hooks.contains_key(&kind)
    }

    pub fn rewrite_predicate(&mut self, predicate: &mut Predicate) {
        if let Some(Hook::Predicate(hook)) = self.hooks.get_mut(&NodeKind::of_predicate(predicate)) {
            hook(predicate);
        }

        match predicate {
            Predicate::Comparison(comparison) => {
                self.rewrite_expr(&mut comparison.left);
                self.rewrite_expr(&mut comparison.right);
            }
            Predicate::Compound { subpredicates, .. } => {
                for sub in subpredicates {
                    self.rewrite_predicate(sub);
                }
            }
            Predicate::Constant(_) => {}
        }
    }

    pub fn rewrite_expr(&mut self, expr: &mut Expr) {
        if let Some(Hook::Expr(hook)) = self.hooks.get_mut(&NodeKind::of_expr(expr)) {
            hook(expr);
        }

        match expr {
            Expr::Constant(_) | Expr::SelfObject | Expr::Variable(_) => {}
            Expr::KeyPath { root, .. } => self.rewrite_expr(root),
            Expr::FunctionCall(call) => {
                if let Callee::Selector {
                    target: Some(target),
                    ..
                } = &mut call.callee
                {
                    self.rewrite_expr(target);
                }
                for arg in &mut call.args {
                    self.rewrite_expr(arg);
                }
            }
            Expr::Aggregate(items) => {
                for item in items {
                    self.rewrite_expr(item);
                }
            }
            Expr::Subquery {
                collection,
                predicate,
                ..
            } => {
                self.rewrite_expr(collection);
                self.rewrite_predicate(predicate);
            }
            Expr::UnaryMinus(inner) => self.rewrite_expr(inner),
            Expr::Arithmetic { left, right, .. } => {
                self.rewrite_expr(left);
                self.rewrite_expr(right);
            }
            Expr::Index { collection, index } => {
                self.rewrite_expr(collection);
                if let IndexKind::At(at) = index {
                    self.rewrite_expr(at);
                }
            }
            Expr::Cast { expr, .. } => self.rewrite_expr(expr),
            Expr::Assignment { value, .. } => self.rewrite_expr(value),
        }
    }
}

impl fmt::Debug for Rewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.hooks.keys().collect();
        kinds.sort_by_key(|kind| format!("{:?}", kind));
        f.debug_struct("Rewriter").field("hooks", &kinds).finish()
    }
}
