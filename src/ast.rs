//! # Predicate Language - Abstract Syntax Tree
//!
//! This module defines the syntax tree for the predicate language: textual filters such as
//! `Author.Name == 'X' AND ANY Tags.Name BEGINSWITH 'bug'` parse into these nodes, and every
//! node formats back to surface syntax through `Display`.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Value-producing nodes (literals, key paths, calls, subqueries)
//! - **[predicates]** - Boolean-producing nodes (comparisons, compounds, constants)
//! - **[operators]** - Comparison and arithmetic operators, modifiers and option flags
//!
//! ## Core Concepts
//!
//! ### Key paths
//!
//! A bare identifier starts a key path rooted at the evaluated object:
//!
//! ```text
//! Author.Name            // SELF.Author.Name
//! $user.Name             // rooted at a variable
//! ```
//!
//! ### Modifiers and options
//!
//! ```text
//! ANY Tags.Name BEGINSWITH 'bug'      // also SOME, or a leading IN
//! ALL Scores > 3
//! NONE Tags.Name ==[cd] 'wontfix'      // NOT (ANY ...)
//! ```
//!
//! ### Subqueries
//!
//! ```text
//! SUBQUERY(Tags, $t, $t.Name BEGINSWITH 'bug').@count > 0
//! ```
//!
//! ## Format round-trip
//!
//! Formatting is canonical rather than byte-preserving: comparisons and compounds are
//! parenthesized, strings are double-quoted, and typed constants without a literal form
//! (dates, identifiers, decimals) are written as `CAST`s. Reparsing the output yields an
//! equivalent tree.
pub mod expressions;
pub mod operators;
pub mod predicates;
pub mod tokens;

pub use expressions::{Callee, Expr, FunctionCall, IndexKind};
pub use operators::{ArithOp, ComparisonOp, ComparisonOptions, Modifier};
pub use predicates::{Comparison, CompoundKind, Predicate};
pub use tokens::Token;
