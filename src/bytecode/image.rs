//! Persisted form of a compiled function.
//!
//! An image holds the constant pool and the raw byte stream of every slot,
//! serialized with postcard. Source ASTs and stack sizes are not kept: a
//! restored function has to go through the verifier again before use.

use postcard::{from_bytes, to_allocvec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::ir::{Code, Function};
use crate::bytecode::pool::ConstantPool;
use crate::lang::value::Value;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image encoding failed: {0}")]
    Encode(#[source] postcard::Error),

    #[error("image is corrupt: {0}")]
    Decode(#[source] postcard::Error),

    #[error("image does not fit a function: {0}")]
    Layout(#[from] CompileError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionImage {
    pub pool: Vec<Value>,
    /// One entry per slot; `None` for a slot reserved but never filled.
    pub codes: Vec<Option<Vec<u8>>>,
}

impl FunctionImage {
    pub fn capture(function: &Function, pool: &ConstantPool) -> Self {
        FunctionImage {
            pool: pool.snapshot(),
            codes: function
                .slots()
                .map(|(_, code)| code.map(|c| c.bytes().to_vec()))
                .collect(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ImageError> {
        to_allocvec(self).map_err(ImageError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        from_bytes(bytes).map_err(ImageError::Decode)
    }

    /// Rebuild the function and a fresh pool. Unfilled slots stay unfilled.
    pub fn restore(self) -> Result<(Function, ConstantPool), ImageError> {
        let pool = ConstantPool::from_values(self.pool);
        let mut function = Function::new();
        for code in self.codes {
            let idx = function.next()?;
            if let Some(bytes) = code {
                function.add_code(idx, Code::from_bytes(bytes))?;
            }
        }
        tracing::debug!(codes = function.len(), constants = pool.len(), "image restored");
        Ok((function, pool))
    }
}
