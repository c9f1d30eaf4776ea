use crate::bytecode::compile_error::{CompileError, CompileResult};
use crate::bytecode::op::{Bc, DecodeError, FunIdx, MAX_FUN_IDX, decode_all, encode_all};
use crate::lang::node::Node;

/// Stack capacities a code object needs, as computed by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackSize {
    /// Maximum operand-stack depth.
    pub max_stack: usize,
    /// Maximum auxiliary-stack depth.
    pub max_aux: usize,
}

/// A single sealed instruction stream.
///
/// The byte sequence never changes once the code is built; the only later
/// mutation is the verifier recording its [`StackSize`].
#[derive(Debug, Clone)]
pub struct Code {
    bytes: Vec<u8>,
    /// Expression this code was compiled from.
    source: Option<Node>,
    /// Call expressions, keyed by the offset of their call instruction.
    ast_map: Vec<(usize, Node)>,
    stack: Option<StackSize>,
}

impl Code {
    /// Code with no source expression, e.g. hand-assembled or loaded from an image.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            source: None,
            ast_map: Vec::new(),
            stack: None,
        }
    }

    pub fn from_ops(ops: &[Bc]) -> Self {
        Self::from_bytes(encode_all(ops))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn ops(&self) -> Result<Vec<Bc>, DecodeError> {
        decode_all(&self.bytes)
    }

    pub fn source(&self) -> Option<&Node> {
        self.source.as_ref()
    }

    /// Call expression lowered to the instruction at `offset`.
    pub fn ast_at(&self, offset: usize) -> Option<&Node> {
        self.ast_map
            .iter()
            .find(|(at, _)| *at == offset)
            .map(|(_, node)| node)
    }

    /// `None` until the code has been verified.
    pub fn stack_size(&self) -> Option<StackSize> {
        self.stack
    }

    pub(crate) fn set_stack_size(&mut self, size: StackSize) {
        self.stack = Some(size);
    }
}

/// The code table of one compilation unit.
///
/// Slots are reserved with [`Function::next`] and filled later with
/// [`Function::add_code`], so code can refer to a sibling by index before
/// that sibling is built. For a closure, slot 0 holds the body.
#[derive(Debug, Clone)]
pub struct Function {
    code: Vec<Option<Code>>,
    max_codes: usize,
}

impl Default for Function {
    fn default() -> Self {
        Self::new()
    }
}

impl Function {
    pub fn new() -> Self {
        Self::with_limit(MAX_FUN_IDX + 1)
    }

    /// Function holding at most `max_codes` slots (capped by the index width).
    pub fn with_limit(max_codes: usize) -> Self {
        Self {
            code: Vec::new(),
            max_codes: max_codes.min(MAX_FUN_IDX + 1),
        }
    }

    /// Reserve a new, empty slot.
    pub fn next(&mut self) -> CompileResult<FunIdx> {
        if self.code.len() >= self.max_codes {
            return Err(CompileError::TooManyCodes {
                max: self.max_codes,
            });
        }
        self.code.push(None);
        Ok((self.code.len() - 1) as FunIdx)
    }

    /// Fill a slot previously handed out by [`Function::next`].
    pub fn add_code(&mut self, idx: FunIdx, code: Code) -> CompileResult<()> {
        let len = self.code.len();
        let slot = self
            .code
            .get_mut(idx as usize)
            .ok_or(CompileError::UnreservedSlot {
                index: idx as usize,
                len,
            })?;
        if slot.is_some() {
            return Err(CompileError::SlotAlreadyFilled { index: idx });
        }
        *slot = Some(code);
        Ok(())
    }

    /// Number of reserved slots.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn code(&self, idx: FunIdx) -> Option<&Code> {
        self.code.get(idx as usize).and_then(Option::as_ref)
    }

    pub(crate) fn code_mut(&mut self, idx: FunIdx) -> Option<&mut Code> {
        self.code.get_mut(idx as usize).and_then(Option::as_mut)
    }

    pub fn is_filled(&self, idx: FunIdx) -> bool {
        self.code(idx).is_some()
    }

    /// The closure body.
    pub fn body(&self) -> Option<&Code> {
        self.code(0)
    }

    /// Every slot in index order, empty ones included.
    pub fn slots(&self) -> impl Iterator<Item = (FunIdx, Option<&Code>)> {
        self.code
            .iter()
            .enumerate()
            .map(|(i, c)| (i as FunIdx, c.as_ref()))
    }

    /// Take the table apart, e.g. to rebuild it in an optimizer.
    pub fn into_codes(self) -> Vec<Option<Code>> {
        self.code
    }
}

/// Streaming builder for one [`Code`].
///
/// Creating a stream reserves its slot right away; nested promise code can
/// therefore be compiled (and reserve later slots) while this stream is
/// still open.
#[derive(Debug)]
pub struct CodeStream {
    index: FunIdx,
    bytes: Vec<u8>,
    last: usize,
    source: Node,
    ast_map: Vec<(usize, Node)>,
}

impl CodeStream {
    pub fn new(function: &mut Function, source: &Node) -> CompileResult<Self> {
        let index = function.next()?;
        Ok(Self {
            index,
            bytes: Vec::new(),
            last: 0,
            source: source.clone(),
            ast_map: Vec::new(),
        })
    }

    /// Slot this stream will fill.
    pub fn index(&self) -> FunIdx {
        self.index
    }

    /// Offset the next instruction will be written at.
    pub fn offset(&self) -> usize {
        self.bytes.len()
    }

    pub fn emit(&mut self, bc: Bc) -> &mut Self {
        self.last = self.bytes.len();
        bc.write(&mut self.bytes);
        self
    }

    /// Attach `node` to the most recently emitted instruction.
    pub fn add_ast(&mut self, node: &Node) {
        self.ast_map.push((self.last, node.clone()));
    }

    /// Seal the code and store it in its slot.
    pub fn finalize(self, function: &mut Function) -> CompileResult<FunIdx> {
        let code = Code {
            bytes: self.bytes,
            source: Some(self.source),
            ast_map: self.ast_map,
            stack: None,
        };
        function.add_code(self.index, code)?;
        Ok(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_then_fill() {
        let mut f = Function::new();
        let a = f.next().unwrap();
        let b = f.next().unwrap();
        assert_eq!((a, b), (0, 1));
        assert!(!f.is_filled(b));

        f.add_code(b, Code::from_ops(&[Bc::Ret])).unwrap();
        assert!(f.is_filled(b));
        assert!(f.body().is_none());
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn test_fill_unreserved_slot_fails() {
        let mut f = Function::new();
        f.next().unwrap();
        let err = f.add_code(5, Code::from_ops(&[Bc::Ret])).unwrap_err();
        assert!(matches!(err, CompileError::UnreservedSlot { index: 5, len: 1 }));
    }

    #[test]
    fn test_fill_twice_fails() {
        let mut f = Function::new();
        let idx = f.next().unwrap();
        f.add_code(idx, Code::from_ops(&[Bc::Ret])).unwrap();
        let err = f.add_code(idx, Code::from_ops(&[Bc::Ret])).unwrap_err();
        assert!(matches!(err, CompileError::SlotAlreadyFilled { index: 0 }));
    }

    #[test]
    fn test_slot_limit() {
        let mut f = Function::with_limit(2);
        f.next().unwrap();
        f.next().unwrap();
        assert!(matches!(f.next(), Err(CompileError::TooManyCodes { max: 2 })));
    }

    #[test]
    fn test_full_index_range() {
        let mut f = Function::new();
        for _ in 0..=MAX_FUN_IDX {
            f.next().unwrap();
        }
        assert_eq!(f.len(), MAX_FUN_IDX + 1);
        assert!(f.next().is_err());
    }

    #[test]
    fn test_stream_records_call_asts() {
        let mut f = Function::new();
        let call = Node::call(Node::sym("f"), vec![]);
        let mut cs = CodeStream::new(&mut f, &call).unwrap();
        cs.emit(Bc::GetFun(0));
        let call_at = cs.offset();
        cs.emit(Bc::Call(0));
        cs.add_ast(&call);
        cs.emit(Bc::Ret);
        let idx = cs.finalize(&mut f).unwrap();

        let code = f.code(idx).unwrap();
        assert_eq!(code.ast_at(call_at), Some(&call));
        assert_eq!(code.ast_at(0), None);
        assert_eq!(code.source(), Some(&call));
        assert_eq!(code.ops().unwrap(), vec![Bc::GetFun(0), Bc::Call(0), Bc::Ret]);
        assert_eq!(code.stack_size(), None);
    }

    #[test]
    fn test_nested_stream_reserves_later_slot() {
        let mut f = Function::new();
        let outer = CodeStream::new(&mut f, &Node::sym("a")).unwrap();
        let mut inner = CodeStream::new(&mut f, &Node::sym("b")).unwrap();
        inner.emit(Bc::Ret);
        assert_eq!(inner.finalize(&mut f).unwrap(), 1);
        assert_eq!(outer.index(), 0);
        assert!(!f.is_filled(0));
    }
}
