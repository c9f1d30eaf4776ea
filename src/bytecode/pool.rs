use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::op::{MAX_POOL_IDX, PoolIdx};
use crate::lang::value::{Symbol, Value};

/// Shared, append-only constant pool.
///
/// Cloning the pool clones the handle: every clone sees the same entries.
/// Reads may happen concurrently; appends are serialized by the write lock.
/// Symbols are interned by content, every other value gets a fresh entry.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    inner: Arc<RwLock<PoolInner>>,
}

#[derive(Debug)]
struct PoolInner {
    values: Vec<Value>,
    symbols: FxHashMap<Symbol, PoolIdx>,
    limit: usize,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::with_limit(MAX_POOL_IDX)
    }

    /// Pool holding at most `limit` entries (never more than the index width allows).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(PoolInner {
                values: Vec::new(),
                symbols: FxHashMap::default(),
                limit: limit.min(MAX_POOL_IDX),
            })),
        }
    }

    /// Rebuild a pool from a snapshot, keeping every index stable.
    pub fn from_values(values: Vec<Value>) -> Self {
        let pool = Self::new();
        {
            let mut inner = pool.inner.write();
            for (idx, value) in values.iter().enumerate() {
                if let Value::Symbol(sym) = value {
                    inner.symbols.entry(sym.clone()).or_insert(idx as PoolIdx);
                }
            }
            inner.values = values;
        }
        pool
    }

    /// Append a value and return its index.
    pub fn insert(&self, value: Value) -> Result<PoolIdx, CompileError> {
        if let Value::Symbol(sym) = &value {
            return self.intern(sym);
        }
        let mut inner = self.inner.write();
        inner.append(value)
    }

    /// Index of `sym`, appending it on first use.
    pub fn intern(&self, sym: &Symbol) -> Result<PoolIdx, CompileError> {
        if let Some(&idx) = self.inner.read().symbols.get(sym) {
            return Ok(idx);
        }

        let mut inner = self.inner.write();
        // Another writer may have interned it between the two locks.
        if let Some(&idx) = inner.symbols.get(sym) {
            return Ok(idx);
        }
        let idx = inner.append(Value::Symbol(sym.clone()))?;
        inner.symbols.insert(sym.clone(), idx);
        Ok(idx)
    }

    pub fn get(&self, idx: PoolIdx) -> Option<Value> {
        self.inner.read().values.get(idx as usize).cloned()
    }

    pub fn contains(&self, idx: PoolIdx) -> bool {
        (idx as usize) < self.len()
    }

    /// Length of the name list stored at `idx`, if that entry is one.
    pub fn names_len(&self, idx: PoolIdx) -> Option<usize> {
        self.inner
            .read()
            .values
            .get(idx as usize)
            .and_then(Value::as_names)
            .map(<[_]>::len)
    }

    pub fn len(&self) -> usize {
        self.inner.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry, in index order.
    pub fn snapshot(&self) -> Vec<Value> {
        self.inner.read().values.clone()
    }
}

impl PoolInner {
    fn append(&mut self, value: Value) -> Result<PoolIdx, CompileError> {
        if self.values.len() >= self.limit {
            return Err(CompileError::TooManyConstants { max: self.limit });
        }
        let idx = self.values.len() as PoolIdx;
        tracing::trace!(idx, %value, "pool append");
        self.values.push(value);
        Ok(idx)
    }
}
