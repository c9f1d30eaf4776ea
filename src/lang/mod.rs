//! # Source language model
//!
//! Values, symbols and the AST the bytecode compiler consumes. Parsing is
//! done by the host; this crate only defines the shapes it accepts.

pub mod closure;
pub mod node;
pub mod value;

pub use closure::Formal;
pub use node::{Arg, EnvRef, Node};
pub use value::{ArgName, Constant, Symbol, Value};
