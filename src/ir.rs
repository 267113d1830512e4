//! Target-neutral executable form.
//!
//! The compiler lowers [`crate::ast`] trees into a [`Node`] graph. The graph is what the
//! in-memory evaluator interprets and what an external query provider consumes; dialect
//! differences show up as different node shapes (a `Fold` inserted or not, null-safe or
//! plain string operators), never as different node types.
//!
//! `Display` renders a node as an s-expression:
//!
//! ```text
//! (and (== (path self Author Name) "Ada") (any $#elem0 (path self Tags Name) (BEGINSWITH $#elem0 "bug")))
//! ```

use std::fmt;

use regex::Regex;

use crate::{
    ast::{ArithOp, ComparisonOp, expressions::write_literal},
    functions::{Function, Method},
    resolve::Member,
    types::ValueType,
    value::Value,
};

#[derive(Debug, Clone)]
pub enum Node {
    Const(Value),
    /// The evaluated object.
    Current,
    /// Bound variable, subquery variable, quantifier element or assigned local.
    Variable(String),
    /// Member chain; `default` is produced when an intermediate step is absent.
    KeyPath {
        root: Box<Node>,
        steps: Vec<Step>,
        default: Value,
    },
    /// Literal collection.
    List(Vec<Node>),
    Subquery {
        collection: Box<Node>,
        variable: String,
        predicate: Box<Node>,
    },
    Negate(Box<Node>),
    Arithmetic {
        op: ArithOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Index {
        collection: Box<Node>,
        index: Index,
    },
    Cast {
        node: Box<Node>,
        to: ValueType,
    },
    Assign {
        variable: String,
        value: Box<Node>,
    },
    /// Built-in function or targetless selector.
    Call {
        function: Function,
        args: Vec<Node>,
    },
    /// Selector dispatched on the runtime type of `target`.
    Invoke {
        target: Box<Node>,
        method: Method,
        args: Vec<Node>,
    },
    /// Binary comparison other than pattern matching.
    ///
    /// `null_safe` comparisons treat a `nil` string or collection operand as not matching
    /// instead of failing.
    Compare {
        op: ComparisonOp,
        left: Box<Node>,
        right: Box<Node>,
        null_safe: bool,
    },
    /// `MATCHES` / `LIKE`.
    Match {
        subject: Box<Node>,
        pattern: Pattern,
        null_safe: bool,
    },
    Quantified {
        quantifier: Quantifier,
        collection: Box<Node>,
        variable: String,
        body: Box<Node>,
    },
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    /// Case and/or diacritic folding of a string operand.
    Fold {
        node: Box<Node>,
        case: bool,
        diacritic: bool,
    },
}

/// One member access in a key path.
#[derive(Debug, Clone)]
pub enum Step {
    /// Resolved at compile time from the static object type.
    Member(Member),
    /// Resolved at evaluation time from the runtime object shape.
    Dynamic(String),
}

impl Step {
    pub fn name(&self) -> &str {
        match self {
            Step::Member(member) => &member.name,
            Step::Dynamic(name) => name,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Index {
    First,
    Last,
    Size,
    At(Box<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    All,
    Any,
}

/// Pattern operand of a `Match` node.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Constant pattern, compiled once. Always anchored at both ends.
    Compiled { source: String, regex: Regex, glob: bool },
    /// Pattern computed at evaluation time.
    Dynamic {
        node: Box<Node>,
        glob: bool,
        case_insensitive: bool,
    },
}

impl Node {
    pub fn boolean(value: bool) -> Self {
        Node::Const(Value::Boolean(value))
    }

    /// Number of nodes in this graph.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|child| child.size()).sum::<usize>()
    }

    /// Whether any node in this graph satisfies `f`.
    pub fn any(&self, f: &dyn Fn(&Node) -> bool) -> bool {
        f(self) || self.children().iter().any(|child| child.any(f))
    }

    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Const(_) | Node::Current | Node::Variable(_) => vec![],
            Node::KeyPath { root, .. } => vec![&**root],
            Node::List(items) | Node::And(items) | Node::Or(items) => items.iter().collect(),
            Node::Subquery {
                collection,
                predicate,
                ..
            } => vec![&**collection, &**predicate],
            Node::Negate(node) | Node::Not(node) => vec![&**node],
            Node::Cast { node, .. } | Node::Fold { node, .. } => vec![&**node],
            Node::Arithmetic { left, right, .. } | Node::Compare { left, right, .. } => {
                vec![&**left, &**right]
            }
            Node::Index { collection, index } => match index {
                Index::At(at) => vec![&**collection, &**at],
                _ => vec![&**collection],
            },
            Node::Assign { value, .. } => vec![&**value],
            Node::Call { args, .. } => args.iter().collect(),
            Node::Invoke { target, args, .. } => {
                std::iter::once(&**target).chain(args.iter()).collect()
            }
            Node::Match {
                subject, pattern, ..
            } => match pattern {
                Pattern::Dynamic { node, .. } => vec![&**subject, &**node],
                Pattern::Compiled { .. } => vec![&**subject],
            },
            Node::Quantified {
                collection, body, ..
            } => vec![&**collection, &**body],
        }
    }
}

fn write_all(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    for node in nodes {
        write!(f, " {}", node)?;
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Const(value) => write_literal(f, value),
            Node::Current => write!(f, "self"),
            Node::Variable(name) => write!(f, "${}", name),
            Node::KeyPath { root, steps, .. } => {
                write!(f, "(path {}", root)?;
                for step in steps {
                    write!(f, " {}", step.name())?;
                }
                write!(f, ")")
            }
            Node::List(items) => {
                write!(f, "(list")?;
                write_all(f, items)?;
                write!(f, ")")
            }
            Node::Subquery {
                collection,
                variable,
                predicate,
            } => write!(f, "(subquery {} ${} {})", collection, variable, predicate),
            Node::Negate(node) => write!(f, "(neg {})", node),
            Node::Arithmetic { op, left, right } => {
                write!(f, "({} {} {})", op.symbol(), left, right)
            }
            Node::Index { collection, index } => match index {
                Index::First => write!(f, "(index {} first)", collection),
                Index::Last => write!(f, "(index {} last)", collection),
                Index::Size => write!(f, "(index {} size)", collection),
                Index::At(at) => write!(f, "(index {} {})", collection, at),
            },
            Node::Cast { node, to } => write!(f, "(cast {} {})", node, to),
            Node::Assign { variable, value } => write!(f, "(:= ${} {})", variable, value),
            Node::Call { function, args } => {
                write!(f, "({}", function.name())?;
                write_all(f, args)?;
                write!(f, ")")
            }
            Node::Invoke {
                target,
                method,
                args,
            } => {
                write!(f, "(invoke {} {}", target, method.selector())?;
                write_all(f, args)?;
                write!(f, ")")
            }
            Node::Compare {
                op,
                left,
                right,
                null_safe,
            } => {
                let safe = if *null_safe { "?" } else { "" };
                write!(f, "({}{} {} {})", op.symbol(), safe, left, right)
            }
            Node::Match {
                subject,
                pattern,
                null_safe,
            } => {
                let safe = if *null_safe { "?" } else { "" };
                match pattern {
                    Pattern::Compiled { source, glob, .. } => {
                        let op = if *glob { "LIKE" } else { "MATCHES" };
                        write!(f, "({}{} {} /{}/)", op, safe, subject, source)
                    }
                    Pattern::Dynamic { node, glob, .. } => {
                        let op = if *glob { "LIKE" } else { "MATCHES" };
                        write!(f, "({}{} {} {})", op, safe, subject, node)
                    }
                }
            }
            Node::Quantified {
                quantifier,
                collection,
                variable,
                body,
            } => {
                let q = match quantifier {
                    Quantifier::All => "all",
                    Quantifier::Any => "any",
                };
                write!(f, "({} ${} {} {})", q, variable, collection, body)
            }
            Node::And(items) => {
                write!(f, "(and")?;
                write_all(f, items)?;
                write!(f, ")")
            }
            Node::Or(items) => {
                write!(f, "(or")?;
                write_all(f, items)?;
                write!(f, ")")
            }
            Node::Not(node) => write!(f, "(not {})", node),
            Node::Fold {
                node,
                case,
                diacritic,
            } => {
                write!(f, "(fold-")?;
                if *case {
                    write!(f, "c")?;
                }
                if *diacritic {
                    write!(f, "d")?;
                }
                write!(f, " {})", node)
            }
        }
    }
}
