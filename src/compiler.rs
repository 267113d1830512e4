//! Lowering of syntax trees into executable [`Node`] graphs.
//!
//! Compilation is where static typing happens: constants and bound variables carry exact
//! types, key paths are typed through the [`MemberResolver`], and every comparison is run
//! through [`coerce::plan`]. Casts on constant operands are folded at compile time; casts on
//! computed operands become `Cast` nodes.
//!
//! The [`Dialect`] decides the shape of what is produced:
//!
//! - [`Dialect::InMemory`] string and collection operators are null-safe, and case or
//!   diacritic insensitive comparisons fold both operands.
//! - [`Dialect::Backend`] operators are emitted plain. A backend that reports a
//!   case-insensitive collation gets no case folding nodes at all.

use std::{collections::HashMap, fmt, sync::Arc};

use thiserror::Error;

use crate::{
    ast::{
        ArithOp, Callee, ComparisonOp, ComparisonOptions, CompoundKind, Expr, FunctionCall,
        IndexKind, Modifier, Predicate, predicates::Comparison,
    },
    coerce::{self, CoercionError},
    evaluator::{self, EvaluationError, Evaluator},
    functions::{Arity, Function, Method},
    ir::{Index, Node, Pattern, Quantifier, Step},
    resolve::{CachingResolver, MemberResolver, RecordResolver},
    types::ValueType,
    value::Value,
};

/// Variable bindings by name, without the `$`.
pub type Bindings = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("unknown variable ${name}")]
    UnknownVariable { name: String },

    #[error("unknown function {name}()")]
    UnknownFunction { name: String },

    #[error("unknown selector '{selector}'")]
    UnknownSelector { selector: String },

    #[error("{receiver} does not respond to '{selector}'")]
    UnsupportedSelector { selector: String, receiver: ValueType },

    #[error("{name} takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: Arity,
        found: usize,
    },

    #[error("{shape} has no member '{member}'")]
    UnknownMember { shape: String, member: String },

    #[error("cannot read member '{member}' of {ty}")]
    NotAnObject { member: String, ty: ValueType },

    #[error("expected a collection, found {ty}")]
    NotACollection { ty: ValueType },

    #[error("{modifier} requires a collection on the left, found {ty}")]
    UnsupportedModifier { modifier: &'static str, ty: ValueType },

    #[error("'{op}' is not defined for {left} and {right}")]
    UnsupportedOperands {
        op: &'static str,
        left: ValueType,
        right: ValueType,
    },

    #[error("BETWEEN needs a two-element collection, found {found} elements")]
    MalformedBetween { found: usize },

    #[error("NOT takes exactly one sub-predicate, got {found}")]
    MalformedNot { found: usize },

    #[error("cannot cast {from} to {to}")]
    InvalidCast { from: ValueType, to: ValueType },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

/// Capabilities of an external query backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendCapabilities {
    /// String comparisons in the backend already ignore case.
    pub case_insensitive_collation: bool,
}

/// Execution target of a compiled predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    InMemory,
    Backend(BackendCapabilities),
}

impl Dialect {
    fn null_safe(&self) -> bool {
        matches!(self, Dialect::InMemory)
    }

    fn folds_case(&self) -> bool {
        !matches!(self, Dialect::Backend(caps) if caps.case_insensitive_collation)
    }
}

/// Compiles predicates and expressions for one dialect.
///
/// # Example
///
/// ```
/// use predicate_lang::{Compiler, Dialect, Predicate, Record};
///
/// let predicate = Predicate::parse("Name BEGINSWITH[c] 'a'", vec![]).unwrap();
/// let compiled = Compiler::new(Dialect::InMemory).compile_predicate(&predicate).unwrap();
///
/// let ada = Record::new("User").with("Name", "Ada").into_value();
/// assert!(compiled.evaluate(&ada).unwrap());
/// ```
#[derive(Clone)]
pub struct Compiler {
    dialect: Dialect,
    bindings: Bindings,
    resolver: Arc<dyn MemberResolver>,
    root_type: ValueType,
}

impl Compiler {
    pub fn new(dialect: Dialect) -> Self {
        Compiler {
            dialect,
            bindings: Bindings::new(),
            resolver: Arc::new(CachingResolver::new(Arc::new(RecordResolver))),
            root_type: ValueType::Any,
        }
    }

    /// Variables visible to compiled code. Evaluation may override their values but not
    /// introduce new names.
    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn MemberResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Static type of `SELF`. With [`ValueType::Any`] (the default) every member is resolved
    /// at evaluation time.
    pub fn with_root_type(mut self, root_type: ValueType) -> Self {
        self.root_type = root_type;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[tracing::instrument(skip(self, predicate), fields(dialect = ?self.dialect))]
    pub fn compile_predicate(&self, predicate: &Predicate) -> Result<CompiledPredicate, CompileError> {
        let node = Scope::new(self).predicate(predicate)?;
        tracing::debug!(nodes = node.size(), "compiled predicate");
        Ok(CompiledPredicate {
            node,
            bindings: Arc::new(self.bindings.clone()),
            resolver: self.resolver.clone(),
            dialect: self.dialect,
        })
    }

    #[tracing::instrument(skip(self, expr), fields(dialect = ?self.dialect))]
    pub fn compile_expression(&self, expr: &Expr) -> Result<CompiledExpression, CompileError> {
        let (node, ty) = Scope::new(self).expr(expr)?;
        tracing::debug!(nodes = node.size(), %ty, "compiled expression");
        Ok(CompiledExpression {
            node,
            ty,
            bindings: Arc::new(self.bindings.clone()),
            resolver: self.resolver.clone(),
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new(Dialect::InMemory)
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("dialect", &self.dialect)
            .field("bindings", &self.bindings)
            .field("root_type", &self.root_type)
            .finish_non_exhaustive()
    }
}

/// A predicate ready to be evaluated, any number of times, from any thread.
#[derive(Clone)]
pub struct CompiledPredicate {
    node: Node,
    bindings: Arc<Bindings>,
    resolver: Arc<dyn MemberResolver>,
    dialect: Dialect,
}

impl CompiledPredicate {
    pub fn evaluate(&self, object: &Value) -> Result<bool, EvaluationError> {
        Evaluator::new(object, &self.bindings, self.resolver.as_ref()).eval_bool(&self.node)
    }

    /// Evaluate with `bindings` taking precedence over the compile-time ones.
    pub fn evaluate_with(&self, object: &Value, bindings: &Bindings) -> Result<bool, EvaluationError> {
        Evaluator::new(object, &self.bindings, self.resolver.as_ref())
            .with_overrides(bindings)
            .eval_bool(&self.node)
    }

    /// Objects for which the predicate holds, in order.
    pub fn filter<'v>(&self, objects: &'v [Value]) -> Result<Vec<&'v Value>, EvaluationError> {
        let mut matching = Vec::new();
        for object in objects {
            if self.evaluate(object)? {
                matching.push(object);
            }
        }
        Ok(matching)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl fmt::Display for CompiledPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)
    }
}

impl fmt::Debug for CompiledPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPredicate")
            .field("node", &self.node)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

/// A value-producing expression ready to be evaluated.
#[derive(Clone)]
pub struct CompiledExpression {
    node: Node,
    ty: ValueType,
    bindings: Arc<Bindings>,
    resolver: Arc<dyn MemberResolver>,
}

impl CompiledExpression {
    pub fn value(&self, object: &Value) -> Result<Value, EvaluationError> {
        Evaluator::new(object, &self.bindings, self.resolver.as_ref()).eval(&self.node)
    }

    pub fn value_with(&self, object: &Value, bindings: &Bindings) -> Result<Value, EvaluationError> {
        Evaluator::new(object, &self.bindings, self.resolver.as_ref())
            .with_overrides(bindings)
            .eval(&self.node)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Static result type; [`ValueType::Any`] when it depends on the evaluated object.
    pub fn ty(&self) -> &ValueType {
        &self.ty
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("node", &self.node)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

type Typed = (Node, ValueType);

/// Per-compilation state: names introduced by subqueries, quantifiers and assignments.
///
/// A local is visible exactly where the evaluator is guaranteed to have bound it, so a name
/// assigned in a branch that may not run is reported as unknown here rather than unbound later.
struct Scope<'c> {
    compiler: &'c Compiler,
    locals: Vec<(String, ValueType)>,
    next_element: usize,
}

impl<'c> Scope<'c> {
    fn new(compiler: &'c Compiler) -> Self {
        Scope {
            compiler,
            locals: Vec::new(),
            next_element: 0,
        }
    }

    fn dialect(&self) -> Dialect {
        self.compiler.dialect
    }

    // ========================================
    // Predicates
    // ========================================

    fn predicate(&mut self, predicate: &Predicate) -> Result<Node, CompileError> {
        match predicate {
            Predicate::Constant(value) => Ok(Node::boolean(*value)),
            Predicate::Compound {
                kind: CompoundKind::Not,
                subpredicates,
            } => match subpredicates.as_slice() {
                [single] => Ok(Node::Not(Box::new(self.predicate(single)?))),
                other => Err(CompileError::MalformedNot { found: other.len() }),
            },
            Predicate::Compound {
                kind,
                subpredicates,
            } => {
                // Only the first sub-predicate always runs. Later ones see the assignments of
                // those before them, but nothing after the compound does.
                let mut kept = self.locals.len();
                let mut nodes = Vec::with_capacity(subpredicates.len());
                for (i, sub) in subpredicates.iter().enumerate() {
                    nodes.push(self.predicate(sub)?);
                    if i == 0 {
                        kept = self.locals.len();
                    }
                }
                self.locals.truncate(kept);
                match nodes.len() {
                    0 => Ok(Node::boolean(false)),
                    1 => Ok(nodes.remove(0)),
                    _ if *kind == CompoundKind::And => Ok(Node::And(nodes)),
                    _ => Ok(Node::Or(nodes)),
                }
            }
            Predicate::Comparison(comparison) => self.comparison(comparison),
        }
    }

    fn comparison(&mut self, comparison: &Comparison) -> Result<Node, CompileError> {
        let left = self.expr(&comparison.left)?;
        let mark = self.locals.len();
        let right = self.expr(&comparison.right)?;

        let quantifier = match comparison.modifier {
            Modifier::Direct => {
                // a pattern operand is skipped when the subject is nil
                if matches!(comparison.op, ComparisonOp::Matches | ComparisonOp::Like) {
                    self.locals.truncate(mark);
                }
                return self.compare(comparison.op, comparison.options, left, right);
            }
            Modifier::Any => Quantifier::Any,
            Modifier::All => Quantifier::All,
        };
        // the right side runs once per element, inside the element's scope
        self.locals.truncate(mark);

        let (collection, collection_ty) = left;
        if collection_ty.is_known() && !collection_ty.is_collection() && collection_ty != ValueType::Null {
            return Err(CompileError::UnsupportedModifier {
                modifier: if quantifier == Quantifier::Any { "ANY" } else { "ALL" },
                ty: collection_ty,
            });
        }

        let variable = format!("#elem{}", self.next_element);
        self.next_element += 1;
        let element = (Node::Variable(variable.clone()), collection_ty.element_type());
        let body = self.compare(comparison.op, comparison.options, element, right)?;
        Ok(Node::Quantified {
            quantifier,
            collection: Box::new(collection),
            variable,
            body: Box::new(body),
        })
    }

    fn compare(
        &mut self,
        op: ComparisonOp,
        options: ComparisonOptions,
        left: Typed,
        right: Typed,
    ) -> Result<Node, CompileError> {
        let (left, left_ty) = left;
        let (right, right_ty) = right;

        if op.is_textual() && (!textual(&left_ty) || !textual(&right_ty)) {
            return Err(CompileError::UnsupportedOperands {
                op: op.symbol(),
                left: left_ty,
                right: right_ty,
            });
        }

        let folding = !options.normalized();
        let fold_case = folding && options.case_insensitive() && self.dialect().folds_case();
        let fold_diacritic = folding && options.diacritic_insensitive();
        let null_safe = self.dialect().null_safe();

        if matches!(op, ComparisonOp::Matches | ComparisonOp::Like) {
            let subject = fold_operand(left, &left_ty, fold_case, fold_diacritic);
            let pattern = pattern(
                right,
                op == ComparisonOp::Like,
                options.case_insensitive() && folding,
                fold_diacritic,
            )?;
            return Ok(Node::Match {
                subject: Box::new(subject),
                pattern,
                null_safe,
            });
        }

        if op == ComparisonOp::Between {
            let found = match &right {
                Node::List(items) => Some(items.len()),
                Node::Const(Value::Array(items)) => Some(items.len()),
                _ => None,
            };
            if let Some(found) = found.filter(|found| *found != 2) {
                return Err(CompileError::MalformedBetween { found });
            }
            if right_ty.is_known() && !right_ty.is_collection() && right_ty != ValueType::Null {
                return Err(CompileError::UnsupportedOperands {
                    op: op.symbol(),
                    left: left_ty,
                    right: right_ty,
                });
            }
        }

        let plan = coerce::plan(&left_ty, &right_ty)?;
        let left = cast(left, plan.left)?;
        let right = cast(right, plan.right)?;
        let left = fold_operand(left, &left_ty, fold_case, fold_diacritic);
        let right = fold_operand(right, &right_ty, fold_case, fold_diacritic);

        Ok(Node::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
            null_safe,
        })
    }

    // ========================================
    // Expressions
    // ========================================

    fn expr(&mut self, expr: &Expr) -> Result<Typed, CompileError> {
        match expr {
            Expr::Constant(value) => Ok((Node::Const(value.clone()), value.value_type())),
            Expr::SelfObject => Ok((Node::Current, self.compiler.root_type.clone())),
            Expr::Variable(name) => {
                let ty = self.variable_type(name)?;
                Ok((Node::Variable(name.clone()), ty))
            }
            Expr::KeyPath { root, components } => self.key_path(root, components),
            Expr::FunctionCall(call) => self.call(call),
            Expr::Aggregate(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                let mut element: Option<ValueType> = None;
                for item in items {
                    let (node, ty) = self.expr(item)?;
                    element = match element {
                        None => Some(ty),
                        Some(current) if current == ty || ty == ValueType::Null => Some(current),
                        Some(_) => Some(ValueType::Any),
                    };
                    nodes.push(node);
                }
                let element = element.unwrap_or(ValueType::Any);
                Ok((Node::List(nodes), ValueType::collection_of(element)))
            }
            Expr::Subquery {
                collection,
                variable,
                predicate,
            } => {
                let (collection, collection_ty) = self.expr(collection)?;
                if collection_ty.is_known()
                    && !collection_ty.is_collection()
                    && collection_ty != ValueType::Null
                {
                    return Err(CompileError::NotACollection { ty: collection_ty });
                }
                let mark = self.locals.len();
                self.locals
                    .push((variable.clone(), collection_ty.element_type()));
                let predicate = self.predicate(predicate);
                self.locals.truncate(mark);

                let ty = match collection_ty {
                    ValueType::Collection(_) => collection_ty,
                    _ => ValueType::collection_of(ValueType::Any),
                };
                Ok((
                    Node::Subquery {
                        collection: Box::new(collection),
                        variable: variable.clone(),
                        predicate: Box::new(predicate?),
                    },
                    ty,
                ))
            }
            Expr::UnaryMinus(inner) => {
                let (node, ty) = self.expr(inner)?;
                if let Node::Const(value) = &node
                    && let Ok(negated) = evaluator::negate(value.clone())
                {
                    let ty = negated.value_type();
                    return Ok((Node::Const(negated), ty));
                }
                let ty = if ty.is_numeric() { ty } else { ValueType::Any };
                Ok((Node::Negate(Box::new(node)), ty))
            }
            Expr::Arithmetic { op, left, right } => {
                let (left, left_ty) = self.expr(left)?;
                let (right, right_ty) = self.expr(right)?;
                let ty = arithmetic_type(*op, &left_ty, &right_ty);
                Ok((
                    Node::Arithmetic {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    ty,
                ))
            }
            Expr::Index { collection, index } => {
                let (collection, collection_ty) = self.expr(collection)?;
                let (index, ty) = match index {
                    IndexKind::First => (Index::First, collection_ty.element_type()),
                    IndexKind::Last => (Index::Last, collection_ty.element_type()),
                    IndexKind::Size => (Index::Size, ValueType::I64),
                    IndexKind::At(at) => {
                        let mark = self.locals.len();
                        let (at, _) = self.expr(at)?;
                        self.locals.truncate(mark);
                        (Index::At(Box::new(at)), collection_ty.element_type())
                    }
                };
                Ok((
                    Node::Index {
                        collection: Box::new(collection),
                        index,
                    },
                    ty,
                ))
            }
            Expr::Cast { expr, to } => {
                let (node, from) = self.expr(expr)?;
                if !coerce::can_convert(&from, to) {
                    return Err(CompileError::InvalidCast {
                        from,
                        to: to.clone(),
                    });
                }
                Ok((cast(node, Some(to.clone()))?, to.clone()))
            }
            Expr::Assignment { variable, value } => {
                let (value, ty) = self.expr(value)?;
                self.locals.push((variable.clone(), ty.clone()));
                Ok((
                    Node::Assign {
                        variable: variable.clone(),
                        value: Box::new(value),
                    },
                    ty,
                ))
            }
        }
    }

    /// Locals shadow bindings. Bound values may be replaced per evaluation, so their
    /// static type is left open.
    fn variable_type(&self, name: &str) -> Result<ValueType, CompileError> {
        if let Some((_, ty)) = self.locals.iter().rev().find(|(local, _)| local == name) {
            return Ok(ty.clone());
        }
        if self.compiler.bindings.contains_key(name) {
            return Ok(ValueType::Any);
        }
        Err(CompileError::UnknownVariable {
            name: name.to_string(),
        })
    }

    fn key_path(&mut self, root: &Expr, components: &[String]) -> Result<Typed, CompileError> {
        let (root, mut ty) = self.expr(root)?;
        let mut steps = Vec::with_capacity(components.len());
        for name in components {
            let (step, next) = self.member(&ty, name)?;
            steps.push(step);
            ty = next;
        }
        let default = ty.default_value();
        Ok((
            Node::KeyPath {
                root: Box::new(root),
                steps,
                default,
            },
            ty,
        ))
    }

    fn member(&self, ty: &ValueType, name: &str) -> Result<(Step, ValueType), CompileError> {
        match ty.underlying() {
            ValueType::Object(shape) => self
                .compiler
                .resolver
                .resolve(shape, name)
                .map(|member| {
                    let ty = member.ty.clone();
                    (Step::Member(member), ty)
                })
                .ok_or_else(|| CompileError::UnknownMember {
                    shape: shape.clone(),
                    member: name.to_string(),
                }),
            ValueType::Collection(element) => {
                let (step, ty) = self.member(element, name)?;
                Ok((step, ValueType::collection_of(ty)))
            }
            ValueType::Any | ValueType::Null => Ok((Step::Dynamic(name.to_string()), ValueType::Any)),
            other => Err(CompileError::NotAnObject {
                member: name.to_string(),
                ty: other.clone(),
            }),
        }
    }

    fn call(&mut self, call: &FunctionCall) -> Result<Typed, CompileError> {
        match &call.callee {
            Callee::Builtin(name) => {
                let function = Function::from_builtin(name).ok_or_else(|| {
                    CompileError::UnknownFunction { name: name.clone() }
                })?;
                self.free_function(function, name, &call.args)
            }
            Callee::Selector {
                target: None,
                selector,
            } => {
                let function = Function::from_selector(selector).ok_or_else(|| {
                    CompileError::UnknownSelector {
                        selector: selector.clone(),
                    }
                })?;
                self.free_function(function, selector, &call.args)
            }
            Callee::Selector {
                target: Some(target),
                selector,
            } => {
                let method = Method::from_selector(selector).ok_or_else(|| {
                    CompileError::UnknownSelector {
                        selector: selector.clone(),
                    }
                })?;
                check_arity(selector, Arity::Exact(method.arity()), call.args.len())?;
                let (target, target_ty) = self.expr(target)?;
                if !method.accepts(&target_ty) {
                    return Err(CompileError::UnsupportedSelector {
                        selector: selector.clone(),
                        receiver: target_ty,
                    });
                }
                let args = self.exprs(&call.args)?.into_iter().map(|(node, _)| node).collect();
                Ok((
                    Node::Invoke {
                        target: Box::new(target),
                        method,
                        args,
                    },
                    method.result_type(),
                ))
            }
        }
    }

    fn free_function(&mut self, function: Function, name: &str, args: &[Expr]) -> Result<Typed, CompileError> {
        check_arity(name, function.arity(), args.len())?;
        let (args, types): (Vec<Node>, Vec<ValueType>) = self.exprs(args)?.into_iter().unzip();
        if function.is_aggregate()
            && let [single] = types.as_slice()
            && single.is_known()
            && !single.is_collection()
            && *single != ValueType::Null
        {
            return Err(CompileError::NotACollection { ty: single.clone() });
        }
        let ty = function.result_type(&types);
        Ok((Node::Call { function, args }, ty))
    }

    fn exprs(&mut self, exprs: &[Expr]) -> Result<Vec<Typed>, CompileError> {
        exprs.iter().map(|expr| self.expr(expr)).collect()
    }
}

fn check_arity(name: &str, expected: Arity, found: usize) -> Result<(), CompileError> {
    if expected.accepts(found) {
        Ok(())
    } else {
        Err(CompileError::Arity {
            name: name.to_string(),
            expected,
            found,
        })
    }
}

/// Types a string operator can be applied to without a static error.
fn textual(ty: &ValueType) -> bool {
    match ty.underlying() {
        ValueType::String | ValueType::Any | ValueType::Null => true,
        ValueType::Collection(element) => textual(element),
        _ => false,
    }
}

fn cast(node: Node, to: Option<ValueType>) -> Result<Node, CompileError> {
    match (node, to) {
        (node, None) => Ok(node),
        (Node::Const(value), Some(to)) => Ok(Node::Const(coerce::cast_value(value, &to)?)),
        (node, Some(to)) => Ok(Node::Cast {
            node: Box::new(node),
            to,
        }),
    }
}

/// Wrap a string operand in a `Fold` node; constants are folded in place.
fn fold_operand(node: Node, ty: &ValueType, case: bool, diacritic: bool) -> Node {
    if (!case && !diacritic) || !textual(ty) {
        return node;
    }
    match node {
        Node::Const(value) => Node::Const(evaluator::fold(value, case, diacritic)),
        node => Node::Fold {
            node: Box::new(node),
            case,
            diacritic,
        },
    }
}

fn pattern(
    node: Node,
    glob: bool,
    case_insensitive: bool,
    diacritic: bool,
) -> Result<Pattern, CompileError> {
    match node {
        Node::Const(Value::String(source)) => {
            let source = if diacritic {
                evaluator::fold_text(&source, false, true)
            } else {
                source
            };
            let regex = evaluator::build_pattern(&source, glob, case_insensitive).map_err(|e| {
                CompileError::InvalidPattern {
                    pattern: source.clone(),
                    message: e.to_string(),
                }
            })?;
            Ok(Pattern::Compiled {
                source,
                regex,
                glob,
            })
        }
        node => Ok(Pattern::Dynamic {
            node: Box::new(fold_operand(node, &ValueType::String, false, diacritic)),
            glob,
            case_insensitive,
        }),
    }
}

fn arithmetic_type(op: ArithOp, left: &ValueType, right: &ValueType) -> ValueType {
    match (op, left.underlying(), right.underlying()) {
        (ArithOp::Add, ValueType::String, _) | (ArithOp::Add, _, ValueType::String) => ValueType::String,
        (ArithOp::Add | ArithOp::Subtract, ValueType::Date, other) if other.is_numeric() => {
            ValueType::Date
        }
        (ArithOp::Add, other, ValueType::Date) if other.is_numeric() => ValueType::Date,
        (ArithOp::Subtract, ValueType::Date, ValueType::Date) => ValueType::F64,
        (ArithOp::Power, l, r) if l.is_integer() && r.is_integer() => ValueType::Any,
        (_, l, r) if l.is_numeric() && r.is_numeric() => match coerce::plan(left, right) {
            Ok(plan) => plan.left.unwrap_or_else(|| left.clone()),
            Err(_) => ValueType::Any,
        },
        _ => ValueType::Any,
    }
}

impl Predicate {
    /// Compile for the in-memory dialect and evaluate once against `object`.
    pub fn evaluate_object(&self, object: &Value) -> crate::Result<bool> {
        Ok(Compiler::default().compile_predicate(self)?.evaluate(object)?)
    }
}

impl Expr {
    /// Compile for the in-memory dialect and evaluate once against `object`.
    pub fn evaluate_object(&self, object: &Value) -> crate::Result<Value> {
        Ok(Compiler::default().compile_expression(self)?.value(object)?)
    }
}
