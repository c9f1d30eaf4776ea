use super::node::Node;
use super::value::Symbol;

/// One formal parameter of a closure.
#[derive(Debug, Clone, PartialEq)]
pub struct Formal {
    pub name: Symbol,
    /// Default expression; the missing-argument sentinel when there is none.
    pub default: Node,
}

impl Formal {
    pub fn new(name: impl Into<String>, default: Node) -> Self {
        Self {
            name: Symbol::named(name),
            default,
        }
    }

    /// A parameter without default value.
    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, Node::missing())
    }

    pub fn has_default(&self) -> bool {
        !matches!(&self.default, Node::Symbol(sym) if sym.is_missing())
    }
}
