use thiserror::Error;

use crate::bytecode::op::{Bc, DecodeError, FunIdx, PoolIdx};

/// Reasons a code object or function is rejected by the verifier.
///
/// Any of these makes the whole function unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("stack underflow at offset {offset}: '{bc}' with depth {depth}")]
    StackUnderflow { offset: usize, bc: Bc, depth: usize },

    #[error("aux stack underflow at offset {offset}: '{bc}' with aux depth {depth}")]
    AuxUnderflow { offset: usize, bc: Bc, depth: usize },

    #[error("code does not end in 'ret'")]
    MissingReturn,

    #[error("malformed bytecode: {0}")]
    Decode(#[from] DecodeError),

    #[error("slot {index} was reserved but never filled")]
    UnfilledSlot { index: FunIdx },

    #[error("'{bc}' at offset {offset} references code #{target}, which does not exist")]
    DanglingFunIdx { offset: usize, bc: Bc, target: FunIdx },

    #[error("'{bc}' at offset {offset} references pool entry @{index}, which does not exist")]
    DanglingPoolIdx { offset: usize, bc: Bc, index: PoolIdx },

    #[error("'{bc}' at offset {offset}: pool entry @{index} is not a name list")]
    MalformedNames { offset: usize, bc: Bc, index: PoolIdx },

    #[error("in code #{index}: {error}")]
    InCode {
        index: FunIdx,
        #[source]
        error: Box<VerifyError>,
    },
}

impl VerifyError {
    pub(crate) fn in_code(index: FunIdx, error: VerifyError) -> Self {
        VerifyError::InCode {
            index,
            error: Box::new(error),
        }
    }

    /// The error without its code-index context.
    pub fn root(&self) -> &VerifyError {
        match self {
            VerifyError::InCode { error, .. } => error.root(),
            other => other,
        }
    }
}

/// Result type for verification
pub type VerifyResult<T> = Result<T, VerifyError>;
