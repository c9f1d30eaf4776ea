pub mod call_site;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod framework;
pub mod image;
pub mod ir;
pub mod op;
pub mod optimize;
pub mod pool;
pub mod verify;
pub mod verify_error;

pub use compile::{CompiledFunction, Compiler, CompilerConfig};
pub use compile_error::CompileError;
pub use ir::{Code, CodeStream, Function};
pub use op::Bc;
pub use pool::ConstantPool;
pub use verify::CodeVerifier;
pub use verify_error::VerifyError;
