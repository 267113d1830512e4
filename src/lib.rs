//! # predicate-lang
//!
//! A string-based object filtering language. Predicates such as
//! `Author.Name ==[c] 'ada' AND ANY Tags.Name BEGINSWITH 'bug'` are lexed and parsed into an
//! [`ast`], optionally rewritten ([`visit`], [`rewriters`]), then compiled for a [`Dialect`]
//! into an [`ir::Node`] graph that evaluates against [`Value`]s.
//!
//! ```
//! use predicate_lang::{Compiler, Dialect, Predicate, Record, Value};
//!
//! let predicate = Predicate::parse("Age >= %d AND Name BEGINSWITH[c] 'a'", vec![Value::I32(18)])?;
//! let compiled = Compiler::new(Dialect::InMemory).compile_predicate(&predicate)?;
//!
//! let ada = Record::new("User").with("Name", "Ada").with("Age", 36i64).into_value();
//! assert!(compiled.evaluate(&ada)?);
//! # Ok::<(), predicate_lang::Error>(())
//! ```

pub mod ast;
pub mod coerce;
pub mod compiler;
pub mod convert;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod rewriters;
pub mod types;
pub mod value;
pub mod visit;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{
    ArithOp, Comparison, ComparisonOp, ComparisonOptions, CompoundKind, Expr, Modifier, Predicate,
    Token,
};
pub use coerce::CoercionError;
pub use compiler::{
    BackendCapabilities, Bindings, CompileError, CompiledExpression, CompiledPredicate, Compiler,
    Dialect,
};
pub use error::{Error, Result};
pub use evaluator::EvaluationError;
pub use lexer::{LexError, Lexer, Position};
pub use parser::{ParseError, Parser};
pub use resolve::{CachingResolver, Member, MemberResolver, RecordResolver, SchemaResolver};
pub use types::ValueType;
pub use value::{Object, Record, Value};
