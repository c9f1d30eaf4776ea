use crate::bytecode::ir::Function;

/// Transform applied to a freshly compiled function before it is used.
///
/// An optimizer must return a function of the same shape: slot 0 is the
/// body and every index referenced by code resolves. Its output is verified
/// again by the compiler.
pub trait Optimizer {
    fn optimize(&self, function: Function) -> Function;
}

/// Returns the function unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOptimizer;

impl Optimizer for NoopOptimizer {
    fn optimize(&self, function: Function) -> Function {
        function
    }
}

impl<F> Optimizer for F
where
    F: Fn(Function) -> Function,
{
    fn optimize(&self, function: Function) -> Function {
        self(function)
    }
}
