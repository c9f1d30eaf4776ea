use std::sync::Arc;

use super::value::{Constant, Symbol, Value};

/// Opaque handle of a runtime environment attached to a promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvRef(pub u32);

/// Abstract Syntax Tree node of the source language.
///
/// Nodes are produced by the host parser (or by partial evaluation) and
/// consumed by the bytecode compiler.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // ───────────────────────────── Application ──────────────────────────
    /// Function application `callee(args...)`.
    Call {
        /// The called expression; usually a bare symbol.
        callee: Box<Node>,
        /// Arguments in source order.
        args: Vec<Arg>,
    },

    // ────────────────────────────── Lookup ──────────────────────────────
    /// Variable reference.
    Symbol(Symbol),

    // ─────────────────────── Partially evaluated ────────────────────────
    /// An already-forced promise spliced into an expression, as produced by
    /// complex-assignment rewriting.
    ///
    /// A well-formed node has a value and no environment.
    Promise {
        /// The forced value; `None` if the promise was never evaluated.
        value: Option<Arc<Constant>>,
        /// Environment the promise still closes over.
        env: Option<EnvRef>,
    },

    /// Already-compiled bytecode. Never valid in source position.
    Bytecode,

    // ───────────────────────────── Literals ─────────────────────────────
    /// Any other embedded constant.
    Literal(Arc<Constant>),
}

/// One argument of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    /// `Some(tag)` for `tag = value` arguments.
    pub tag: Option<Symbol>,
    pub value: Node,
}

impl Arg {
    pub fn positional(value: Node) -> Self {
        Self { tag: None, value }
    }

    pub fn named(tag: impl Into<String>, value: Node) -> Self {
        Self {
            tag: Some(Symbol::named(tag)),
            value,
        }
    }

    /// True for the rest-args symbol `...` passed through as an argument.
    pub fn is_dots(&self) -> bool {
        matches!(self.value, Node::Symbol(Symbol::Dots))
    }
}

impl Node {
    pub fn call(callee: Node, args: Vec<Arg>) -> Self {
        Node::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn sym(name: impl Into<String>) -> Self {
        Node::Symbol(Symbol::named(name))
    }

    pub fn missing() -> Self {
        Node::Symbol(Symbol::Missing)
    }

    pub fn literal(value: Value) -> Self {
        Node::Literal(Arc::new(Constant::new(value)))
    }

    /// A forced promise without environment.
    pub fn forced(value: Value) -> Self {
        Node::Promise {
            value: Some(Arc::new(Constant::new(value))),
            env: None,
        }
    }

    /// Structural equality with constants compared by
    /// [`Value::is_identical`], so a tree always matches its own clone.
    pub fn is_identical(&self, other: &Node) -> bool {
        match (self, other) {
            (
                Node::Call { callee, args },
                Node::Call {
                    callee: other_callee,
                    args: other_args,
                },
            ) => {
                callee.is_identical(other_callee)
                    && args.len() == other_args.len()
                    && args
                        .iter()
                        .zip(other_args)
                        .all(|(a, b)| a.tag == b.tag && a.value.is_identical(&b.value))
            }
            (Node::Symbol(a), Node::Symbol(b)) => a == b,
            (
                Node::Promise { value, env },
                Node::Promise {
                    value: other_value,
                    env: other_env,
                },
            ) => {
                env == other_env
                    && match (value, other_value) {
                        (Some(a), Some(b)) => same_constant(a, b),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (Node::Bytecode, Node::Bytecode) => true,
            (Node::Literal(a), Node::Literal(b)) => same_constant(a, b),
            _ => false,
        }
    }

    /// Human-readable name of the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Call { .. } => "call",
            Node::Symbol(Symbol::Missing) => "missing argument",
            Node::Symbol(Symbol::DotDot(_)) => "varargs element",
            Node::Symbol(_) => "symbol",
            Node::Promise { .. } => "promise",
            Node::Bytecode => "bytecode",
            Node::Literal(_) => "literal",
        }
    }
}

fn same_constant(a: &Arc<Constant>, b: &Arc<Constant>) -> bool {
    Arc::ptr_eq(a, b) || a.value().is_identical(b.value())
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match &arg.tag {
                        Some(tag) => write!(f, "{} = {}", tag, arg.value)?,
                        None => write!(f, "{}", arg.value)?,
                    }
                }
                write!(f, ")")
            }
            Node::Symbol(sym) => write!(f, "{}", sym),
            Node::Promise { value: Some(c), .. } => write!(f, "<promise: {}>", c.value()),
            Node::Promise { value: None, .. } => write!(f, "<promise>"),
            Node::Bytecode => write!(f, "<bytecode>"),
            Node::Literal(c) => write!(f, "{}", c.value()),
        }
    }
}
