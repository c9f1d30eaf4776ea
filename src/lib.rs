//! Bytecode compiler and verifier for a lazily evaluated stack machine.
//!
//! [`lang`] holds the source-side data model, [`bytecode`] everything from
//! the instruction set to the verifier.

pub mod bytecode;
pub mod lang;
