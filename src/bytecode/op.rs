//! Instruction set and codec.
//!
//! # Layout
//!
//! ```text
//! ┌────────────┬──────────────────────────────┐
//! │   Opcode   │  Immediate (0, 2 or 4 bytes) │
//! │  (8 bits)  │  little endian               │
//! └────────────┴──────────────────────────────┘
//! ```
//!
//! The immediate's kind, and therefore its width, is fixed by the opcode.
//!
//! # Stack discipline
//!
//! Stack effects are written `( before -- after )`. Arguments of a call are
//! promises created by `make_promise`; the callee sits below them.

use thiserror::Error;

/// Index into the constant pool.
pub type PoolIdx = u32;

/// Index into a function's code table.
pub type FunIdx = u16;

/// Number of arguments of a positional call.
pub type NumArgs = u16;

pub const MAX_NUM_ARGS: usize = NumArgs::MAX as usize;

/// Recorded for a formal parameter without default; never a real slot.
pub const MISSING_ARG_OFFSET: FunIdx = FunIdx::MAX;

/// Largest slot index a function may hand out.
pub const MAX_FUN_IDX: usize = MISSING_ARG_OFFSET as usize - 1;

pub const MAX_POOL_IDX: usize = PoolIdx::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode 0x{tag:02x} at offset {offset}")]
    UnknownOpcode { tag: u8, offset: usize },

    #[error("truncated '{opcode}' instruction at offset {offset}")]
    Truncated { opcode: &'static str, offset: usize },
}

/// Opcode tag as it appears in the byte stream.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Never emitted. Zeroed memory decodes to an error instead of code.
    Invalid = 0x00,

    /// ( -- value ) push a pool constant.
    Push = 0x01,
    /// ( -- fun ) look up a function by symbol.
    GetFun = 0x02,
    /// ( -- value ) look up a variable by symbol.
    GetVar = 0x03,
    /// ( -- value ) look up a varargs element `..N`.
    GetVarDd = 0x04,
    /// ( value -- fun ) check that the value is callable.
    IsFun = 0x05,

    /// ( fun a1 .. an -- result )
    Call = 0x06,
    /// ( fun a1 .. ak -- result ), k = number of names in the pool entry.
    CallNamed = 0x07,

    /// ( -- promise )
    MakePromise = 0x08,
    /// ( -- closure )
    MakeClosure = 0x09,

    Ret = 0x0A,
    /// ( promise -- value )
    Force = 0x0B,
    /// ( a -- )
    Drop = 0x0C,

    /// ( a -- ) aux: ( -- a )
    ToAux = 0x0D,
    /// ( -- a ) aux: ( a -- )
    FromAux = 0x0E,
}

/// What an opcode's immediate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateKind {
    None,
    Pool,
    Fun,
    NumArgs,
}

impl ImmediateKind {
    /// Encoded width in bytes.
    pub const fn width(self) -> usize {
        match self {
            ImmediateKind::None => 0,
            ImmediateKind::Pool => size_of::<PoolIdx>(),
            ImmediateKind::Fun => size_of::<FunIdx>(),
            ImmediateKind::NumArgs => size_of::<NumArgs>(),
        }
    }
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match byte {
            0x01 => Push,
            0x02 => GetFun,
            0x03 => GetVar,
            0x04 => GetVarDd,
            0x05 => IsFun,
            0x06 => Call,
            0x07 => CallNamed,
            0x08 => MakePromise,
            0x09 => MakeClosure,
            0x0A => Ret,
            0x0B => Force,
            0x0C => Drop,
            0x0D => ToAux,
            0x0E => FromAux,
            _ => return None,
        })
    }

    pub fn immediate_kind(self) -> ImmediateKind {
        use Opcode::*;
        match self {
            Push | GetFun | GetVar | GetVarDd | CallNamed => ImmediateKind::Pool,
            MakePromise | MakeClosure => ImmediateKind::Fun,
            Call => ImmediateKind::NumArgs,
            Invalid | IsFun | Ret | Force | Drop | ToAux | FromAux => ImmediateKind::None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Invalid => "invalid",
            Push => "push",
            GetFun => "getfun",
            GetVar => "getvar",
            GetVarDd => "getvar_dd",
            IsFun => "isfun",
            Call => "call",
            CallNamed => "call_named",
            MakePromise => "make_promise",
            MakeClosure => "make_closure",
            Ret => "ret",
            Force => "force",
            Drop => "drop",
            ToAux => "to_aux",
            FromAux => "from_aux",
        }
    }
}

/// Decoded immediate operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Immediate {
    None,
    Pool(PoolIdx),
    Fun(FunIdx),
    NumArgs(NumArgs),
}

/// Stack effect of one instruction: items popped, then items pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackEffect {
    pub pops: usize,
    pub pushes: usize,
    pub aux_pops: usize,
    pub aux_pushes: usize,
}

impl StackEffect {
    const fn main(pops: usize, pushes: usize) -> Self {
        Self {
            pops,
            pushes,
            aux_pops: 0,
            aux_pushes: 0,
        }
    }

    /// Callee plus `args` arguments replaced by the result.
    pub const fn call(args: usize) -> Self {
        Self::main(args + 1, 1)
    }
}

/// A single bytecode instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bc {
    Push(PoolIdx),
    GetFun(PoolIdx),
    GetVar(PoolIdx),
    GetVarDd(PoolIdx),
    IsFun,
    Call(NumArgs),
    CallNamed(PoolIdx),
    MakePromise(FunIdx),
    MakeClosure(FunIdx),
    Ret,
    Force,
    Drop,
    ToAux,
    FromAux,
}

impl Bc {
    pub fn opcode(&self) -> Opcode {
        match self {
            Bc::Push(_) => Opcode::Push,
            Bc::GetFun(_) => Opcode::GetFun,
            Bc::GetVar(_) => Opcode::GetVar,
            Bc::GetVarDd(_) => Opcode::GetVarDd,
            Bc::IsFun => Opcode::IsFun,
            Bc::Call(_) => Opcode::Call,
            Bc::CallNamed(_) => Opcode::CallNamed,
            Bc::MakePromise(_) => Opcode::MakePromise,
            Bc::MakeClosure(_) => Opcode::MakeClosure,
            Bc::Ret => Opcode::Ret,
            Bc::Force => Opcode::Force,
            Bc::Drop => Opcode::Drop,
            Bc::ToAux => Opcode::ToAux,
            Bc::FromAux => Opcode::FromAux,
        }
    }

    pub fn immediate(&self) -> Immediate {
        match *self {
            Bc::Push(i) | Bc::GetFun(i) | Bc::GetVar(i) | Bc::GetVarDd(i) | Bc::CallNamed(i) => {
                Immediate::Pool(i)
            }
            Bc::MakePromise(f) | Bc::MakeClosure(f) => Immediate::Fun(f),
            Bc::Call(n) => Immediate::NumArgs(n),
            Bc::IsFun | Bc::Ret | Bc::Force | Bc::Drop | Bc::ToAux | Bc::FromAux => {
                Immediate::None
            }
        }
    }

    pub fn pool_idx(&self) -> Option<PoolIdx> {
        match self.immediate() {
            Immediate::Pool(i) => Some(i),
            _ => None,
        }
    }

    pub fn fun_idx(&self) -> Option<FunIdx> {
        match self.immediate() {
            Immediate::Fun(f) => Some(f),
            _ => None,
        }
    }

    /// Encoded length in bytes.
    pub fn size(&self) -> usize {
        1 + self.opcode().immediate_kind().width()
    }

    /// Append the encoded instruction to `buf`.
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.push(self.opcode() as u8);
        match self.immediate() {
            Immediate::None => {}
            Immediate::Pool(i) => buf.extend_from_slice(&i.to_le_bytes()),
            Immediate::Fun(f) => buf.extend_from_slice(&f.to_le_bytes()),
            Immediate::NumArgs(n) => buf.extend_from_slice(&n.to_le_bytes()),
        }
    }

    /// Decode the instruction starting at `pc`.
    pub fn read(code: &[u8], pc: usize) -> Result<Bc, DecodeError> {
        let tag = *code.get(pc).ok_or(DecodeError::Truncated {
            opcode: "<none>",
            offset: pc,
        })?;
        let opcode = Opcode::from_byte(tag)
            .ok_or(DecodeError::UnknownOpcode { tag, offset: pc })?;

        let width = opcode.immediate_kind().width();
        let imm = code
            .get(pc + 1..pc + 1 + width)
            .ok_or(DecodeError::Truncated {
                opcode: opcode.mnemonic(),
                offset: pc,
            })?;

        let pool = || PoolIdx::from_le_bytes([imm[0], imm[1], imm[2], imm[3]]);
        let short = || u16::from_le_bytes([imm[0], imm[1]]);

        Ok(match opcode {
            Opcode::Push => Bc::Push(pool()),
            Opcode::GetFun => Bc::GetFun(pool()),
            Opcode::GetVar => Bc::GetVar(pool()),
            Opcode::GetVarDd => Bc::GetVarDd(pool()),
            Opcode::IsFun => Bc::IsFun,
            Opcode::Call => Bc::Call(short()),
            Opcode::CallNamed => Bc::CallNamed(pool()),
            Opcode::MakePromise => Bc::MakePromise(short()),
            Opcode::MakeClosure => Bc::MakeClosure(short()),
            Opcode::Ret => Bc::Ret,
            Opcode::Force => Bc::Force,
            Opcode::Drop => Bc::Drop,
            Opcode::ToAux => Bc::ToAux,
            Opcode::FromAux => Bc::FromAux,
            Opcode::Invalid => return Err(DecodeError::UnknownOpcode { tag, offset: pc }),
        })
    }

    /// Decode the instruction at `*pc` and move `pc` past it.
    ///
    /// On error `pc` is left untouched.
    pub fn advance(code: &[u8], pc: &mut usize) -> Result<Bc, DecodeError> {
        let bc = Bc::read(code, *pc)?;
        *pc += bc.size();
        Ok(bc)
    }

    /// Returns the fixed stack effect, or `None` for `call_named`, whose
    /// arity is the length of its name list in the pool.
    pub fn effect(&self) -> Option<StackEffect> {
        Some(match self {
            Bc::Push(_) | Bc::GetFun(_) | Bc::GetVar(_) | Bc::GetVarDd(_) => {
                StackEffect::main(0, 1)
            }
            Bc::MakePromise(_) | Bc::MakeClosure(_) => StackEffect::main(0, 1),
            Bc::IsFun | Bc::Force => StackEffect::main(1, 1),
            Bc::Call(n) => StackEffect::call(*n as usize),
            Bc::CallNamed(_) => return None,
            Bc::Ret => StackEffect::main(0, 0),
            Bc::Drop => StackEffect::main(1, 0),
            Bc::ToAux => StackEffect {
                pops: 1,
                pushes: 0,
                aux_pops: 0,
                aux_pushes: 1,
            },
            Bc::FromAux => StackEffect {
                pops: 0,
                pushes: 1,
                aux_pops: 1,
                aux_pushes: 0,
            },
        })
    }
}

impl std::fmt::Display for Bc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.opcode().mnemonic();
        match self.immediate() {
            Immediate::None => write!(f, "{}", name),
            Immediate::Pool(i) => write!(f, "{} @{}", name, i),
            Immediate::Fun(idx) => write!(f, "{} #{}", name, idx),
            Immediate::NumArgs(n) => write!(f, "{} {}", name, n),
        }
    }
}

/// Decode a whole byte stream.
pub fn decode_all(code: &[u8]) -> Result<Vec<Bc>, DecodeError> {
    let mut pc = 0;
    let mut out = Vec::new();
    while pc < code.len() {
        out.push(Bc::advance(code, &mut pc)?);
    }
    Ok(out)
}

/// Encode a sequence of instructions.
pub fn encode_all(ops: &[Bc]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ops.iter().map(Bc::size).sum());
    for op in ops {
        op.write(&mut buf);
    }
    buf
}
