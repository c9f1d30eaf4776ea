use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Sharing count a constant is saturated to once compiled code may alias it.
pub const NAMED_MAX: u8 = 2;

/// A symbol of the source language.
///
/// Besides ordinary names, three symbols are distinguished by the compiler:
/// the missing-argument sentinel, the rest-args symbol `...` and the varargs
/// element references `..1`, `..2`, ...
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// An ordinary identifier.
    Named(String),

    /// The missing-argument sentinel: "no value supplied".
    Missing,

    /// The rest-args symbol `...`.
    Dots,

    /// A varargs element reference `..N` (1-based).
    DotDot(u32),
}

impl Symbol {
    /// Symbol spelled `name`; `...` and `..N` map to their special forms.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == "..." {
            return Symbol::Dots;
        }
        match name.strip_prefix("..").and_then(|n| n.parse::<u32>().ok()) {
            Some(n) if n > 0 => Symbol::DotDot(n),
            _ => Symbol::Named(name),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Symbol::Missing)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Named(name) => write!(f, "{}", name),
            Symbol::Missing => write!(f, "<missing>"),
            Symbol::Dots => write!(f, "..."),
            Symbol::DotDot(n) => write!(f, "..{}", n),
        }
    }
}

/// Name recorded for one argument of a call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgName {
    /// Positional argument.
    Unnamed,

    /// Argument supplied as `tag = value`.
    Tag(Symbol),

    /// The argument is the rest-args symbol `...`, expanded by the callee.
    Dots,
}

impl std::fmt::Display for ArgName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgName::Unnamed => write!(f, "_"),
            ArgName::Tag(sym) => write!(f, "{}", sym),
            ArgName::Dots => write!(f, "..."),
        }
    }
}

/// Runtime value of the source language.
///
/// Values are what the constant pool stores and what `push` places on the
/// operand stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The empty value.
    Null,

    /// Logical scalar.
    Logical(bool),

    /// 64-bit signed integer.
    Integer(i64),

    /// 64-bit floating-point number.
    Real(f64),

    /// UTF-8 string value.
    Str(String),

    /// A symbol, used both as a lookup key and as a literal.
    Symbol(Symbol),

    /// Ordered argument names of a `call_named` instruction.
    Names(Vec<ArgName>),
}

impl Value {
    /// Equality that treats a real as its bit pattern, so `NaN` matches itself.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    pub fn as_names(&self) -> Option<&[ArgName]> {
        match self {
            Value::Names(names) => Some(names),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    /// Format a value using surface syntax.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Logical(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(n) => write!(f, "{}L", n),
            Value::Real(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Symbol(sym) => write!(f, "`{}`", sym),
            Value::Names(names) => {
                write!(f, "(")?;
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", name)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A literal constant embedded in the AST.
///
/// The runtime tracks whether a value may be aliased; compiled code pushes
/// the very same constant every time it runs, so the compiler marks it
/// shared before emitting the push.
#[derive(Debug)]
pub struct Constant {
    value: Value,
    named: AtomicU8,
}

impl Constant {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            named: AtomicU8::new(0),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Current sharing count.
    pub fn named(&self) -> u8 {
        self.named.load(Ordering::Relaxed)
    }

    pub fn mark_shared(&self) {
        self.named.store(NAMED_MAX, Ordering::Relaxed);
    }
}

impl Clone for Constant {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            named: AtomicU8::new(self.named()),
        }
    }
}

impl PartialEq for Constant {
    /// Constants compare by value; the sharing count is bookkeeping.
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
