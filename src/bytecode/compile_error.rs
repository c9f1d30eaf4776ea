use thiserror::Error;

use crate::bytecode::op::FunIdx;
use crate::bytecode::verify_error::VerifyError;
use crate::lang::{node::Node, value::Symbol};

/// Errors that abort compilation.
///
/// None of these is a user-facing language error: they report a broken
/// upstream invariant, a capacity limit of the instruction encoding, or
/// misuse of the code-table protocol.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// A node that may never appear in source position
    #[error("compile error: cannot compile '{node_type}' node: {reason}")]
    InvalidNode {
        node_type: &'static str,
        reason: &'static str,
    },

    #[error("compile error: call has {count} arguments (limit: {max})")]
    TooManyArguments { count: usize, max: usize },

    #[error("compile error: function has too many code objects (limit: {max})")]
    TooManyCodes { max: usize },

    #[error("compile error: constant pool is full (limit: {max})")]
    TooManyConstants { max: usize },

    #[error("compile error: slot {index} was never reserved (function has {len} slots)")]
    UnreservedSlot { index: usize, len: usize },

    #[error("compile error: slot {index} is already filled")]
    SlotAlreadyFilled { index: FunIdx },

    /// The optimizer removed or replaced the promise code of a formal
    #[error("compile error: code #{index} for default of formal '{name}' did not survive optimization")]
    FormalCodeDropped { name: Symbol, index: FunIdx },

    #[error("compile error: optimized function has no body in slot 0")]
    MissingBody,

    #[error("compile error: {0}")]
    Verify(#[from] VerifyError),
}

impl CompileError {
    /// A forced promise that still carries an environment.
    pub fn promise_with_env() -> Self {
        CompileError::InvalidNode {
            node_type: "promise",
            reason: "embedded promises must not carry an environment",
        }
    }

    /// A promise node whose value was never computed.
    pub fn unevaluated_promise() -> Self {
        CompileError::InvalidNode {
            node_type: "promise",
            reason: "embedded promises must already be evaluated",
        }
    }

    /// Pre-compiled bytecode found where source was expected.
    pub fn bytecode_in_source() -> Self {
        CompileError::InvalidNode {
            node_type: "bytecode",
            reason: "compiled code cannot appear in source position",
        }
    }

    /// True if this is an [`CompileError::InvalidNode`] for `node`'s kind.
    pub fn is_about(&self, node: &Node) -> bool {
        matches!(self, CompileError::InvalidNode { node_type, .. } if *node_type == node.kind_name())
    }
}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;
