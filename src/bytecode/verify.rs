use crate::bytecode::framework::{Cursor, Dispatch, Dispatcher, LinearDriver};
use crate::bytecode::ir::{Code, Function, StackSize};
use crate::bytecode::op::{Bc, StackEffect};
use crate::bytecode::pool::ConstantPool;
use crate::bytecode::verify_error::{VerifyError, VerifyResult};

/// Verification of code objects and functions.
///
/// The pool is needed to resolve the arity of `call_named` and to check
/// pool references.
#[derive(Debug, Clone, Copy)]
pub struct CodeVerifier<'p> {
    pool: &'p ConstantPool,
}

impl<'p> CodeVerifier<'p> {
    pub fn new(pool: &'p ConstantPool) -> Self {
        Self { pool }
    }

    /// Verify the stack discipline of `code` and record its stack size.
    pub fn calculate_and_verify_stack(&self, code: &mut Code) -> VerifyResult<StackSize> {
        let size = self.check_stack(code.bytes())?;
        code.set_stack_size(size);
        Ok(size)
    }

    /// Verify every slot of `function`.
    ///
    /// Stack sizes are only written back when the whole function is valid.
    pub fn verify_function_layout(&self, function: &mut Function) -> VerifyResult<()> {
        let mut sizes = Vec::with_capacity(function.len());

        for (idx, code) in function.slots() {
            let code = code.ok_or(VerifyError::UnfilledSlot { index: idx })?;
            let size = self
                .check_stack(code.bytes())
                .map_err(|e| VerifyError::in_code(idx, e))?;
            self.check_references(function, code.bytes())
                .map_err(|e| VerifyError::in_code(idx, e))?;
            sizes.push((idx, size));
        }

        for (idx, size) in sizes {
            tracing::trace!(idx, max_stack = size.max_stack, max_aux = size.max_aux, "stack size");
            if let Some(code) = function.code_mut(idx) {
                code.set_stack_size(size);
            }
        }
        tracing::debug!(codes = function.len(), "function layout verified");
        Ok(())
    }

    fn check_stack(&self, bytes: &[u8]) -> VerifyResult<StackSize> {
        let mut check = StackCheck::new(self.pool);
        LinearDriver::run(bytes, &mut check);
        check.finish()
    }

    fn check_references(&self, function: &Function, bytes: &[u8]) -> VerifyResult<()> {
        let mut check = ReferenceCheck {
            function,
            pool: self.pool,
            error: None,
        };
        LinearDriver::run(bytes, &mut check);
        check.error.map_or(Ok(()), Err)
    }
}

/// Abstract interpretation of operand and aux stack depth.
struct StackCheck<'p> {
    pool: &'p ConstantPool,
    depth: usize,
    aux: usize,
    size: StackSize,
    last: Option<Bc>,
    /// Set at the first `ret`; later instructions are unreachable.
    returned: bool,
    error: Option<VerifyError>,
}

impl<'p> StackCheck<'p> {
    fn new(pool: &'p ConstantPool) -> Self {
        Self {
            pool,
            depth: 0,
            aux: 0,
            size: StackSize {
                max_stack: 0,
                max_aux: 0,
            },
            last: None,
            returned: false,
            error: None,
        }
    }

    fn effect(&self, offset: usize, bc: Bc) -> VerifyResult<StackEffect> {
        if let Some(effect) = bc.effect() {
            return Ok(effect);
        }
        // call_named: arity is the length of the name list
        let index = bc.pool_idx().unwrap_or_default();
        match self.pool.names_len(index) {
            Some(args) => Ok(StackEffect::call(args)),
            None if self.pool.contains(index) => {
                Err(VerifyError::MalformedNames { offset, bc, index })
            }
            None => Err(VerifyError::DanglingPoolIdx { offset, bc, index }),
        }
    }

    fn apply(&mut self, offset: usize, bc: Bc) -> VerifyResult<()> {
        if self.returned {
            self.last = Some(bc);
            return Ok(());
        }
        let effect = self.effect(offset, bc)?;

        if self.depth < effect.pops {
            return Err(VerifyError::StackUnderflow {
                offset,
                bc,
                depth: self.depth,
            });
        }
        if self.aux < effect.aux_pops {
            return Err(VerifyError::AuxUnderflow {
                offset,
                bc,
                depth: self.aux,
            });
        }

        self.depth = self.depth - effect.pops + effect.pushes;
        self.aux = self.aux - effect.aux_pops + effect.aux_pushes;
        self.size.max_stack = self.size.max_stack.max(self.depth);
        self.size.max_aux = self.size.max_aux.max(self.aux);
        self.last = Some(bc);
        self.returned = bc == Bc::Ret;
        Ok(())
    }

    fn finish(self) -> VerifyResult<StackSize> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match self.last {
            Some(Bc::Ret) => Ok(self.size),
            _ => Err(VerifyError::MissingReturn),
        }
    }
}

impl Dispatcher for StackCheck<'_> {
    fn do_dispatch(&mut self, cursor: &mut Cursor<'_>, dispatch: &mut Dispatch) {
        let offset = cursor.pc();
        let result = cursor
            .advance()
            .map_err(VerifyError::from)
            .and_then(|bc| self.apply(offset, bc));

        if let Err(error) = result {
            self.error = Some(error);
            dispatch.halt();
        }
    }
}

/// Checks that every function-table and pool index resolves.
struct ReferenceCheck<'a> {
    function: &'a Function,
    pool: &'a ConstantPool,
    error: Option<VerifyError>,
}

impl ReferenceCheck<'_> {
    fn check(&self, offset: usize, bc: Bc) -> VerifyResult<()> {
        if let Some(target) = bc.fun_idx() {
            if !self.function.is_filled(target) {
                return Err(VerifyError::DanglingFunIdx { offset, bc, target });
            }
        }
        if let Some(index) = bc.pool_idx() {
            if !self.pool.contains(index) {
                return Err(VerifyError::DanglingPoolIdx { offset, bc, index });
            }
            if matches!(bc, Bc::CallNamed(_)) && self.pool.names_len(index).is_none() {
                return Err(VerifyError::MalformedNames { offset, bc, index });
            }
        }
        Ok(())
    }
}

impl Dispatcher for ReferenceCheck<'_> {
    fn do_dispatch(&mut self, cursor: &mut Cursor<'_>, dispatch: &mut Dispatch) {
        let offset = cursor.pc();
        let result = cursor
            .advance()
            .map_err(VerifyError::from)
            .and_then(|bc| self.check(offset, bc));

        if let Err(error) = result {
            self.error = Some(error);
            dispatch.halt();
        }
    }
}
