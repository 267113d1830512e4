//! Evaluate predicates and expressions against JSON input

use super::CliError;
use crate::{
    Compiler, Expr, Predicate, Value,
    convert::{json_to_value, value_to_json},
};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Predicate (or expression) format string
    pub predicate: String,
    /// JSON input string
    pub input: Option<String>,
    /// JSON values substituted for `%@`, `%d`, `%K`, ... in order
    pub args: Vec<String>,
    /// Parse an expression instead of a predicate
    pub expression: bool,
    /// Pretty-print the output
    pub pretty: bool,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// The predicate's verdict
    Matched(bool),
    /// An expression's value
    Value(serde_json::Value),
}

fn parse_args(args: &[String]) -> Result<Vec<Value>, CliError> {
    args.iter()
        .map(|arg| Ok(json_to_value(serde_json::from_str(arg)?)))
        .collect()
}

fn parse_input(input: Option<&String>) -> Result<Option<Value>, CliError> {
    input
        .map(|json| Ok(json_to_value(serde_json::from_str(json)?)))
        .transpose()
}

/// Parse, compile (in-memory dialect) and evaluate.
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let args = parse_args(&options.args)?;
    let compiler = Compiler::default();

    if options.expression {
        let expr = Expr::parse(&options.predicate, args)?;
        if options.syntax_only {
            return Ok(CheckResult::SyntaxValid);
        }
        let compiled = compiler.compile_expression(&expr)?;
        let input = parse_input(options.input.as_ref())?.unwrap_or(Value::Null);
        return Ok(CheckResult::Value(value_to_json(&compiled.value(&input)?)));
    }

    let predicate = Predicate::parse(&options.predicate, args)?;
    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }
    let compiled = compiler.compile_predicate(&predicate)?;
    let input = parse_input(options.input.as_ref())?.ok_or(CliError::NoInput)?;
    Ok(CheckResult::Matched(compiled.evaluate(&input)?))
}

/// Canonical formatting of a predicate (or expression).
pub fn execute_format(text: &str, args: &[String], expression: bool) -> Result<String, CliError> {
    let args = parse_args(args)?;
    if expression {
        Ok(Expr::parse(text, args)?.to_string())
    } else {
        Ok(Predicate::parse(text, args)?.to_string())
    }
}
