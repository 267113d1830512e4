use thiserror::Error;

use crate::{
    coerce::CoercionError, compiler::CompileError, evaluator::EvaluationError, lexer::LexError,
    parser::ParseError,
};

/// Any failure from parsing through evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("type error: {0}")]
    Coercion(#[from] CoercionError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
}

pub type Result<T> = std::result::Result<T, Error>;
