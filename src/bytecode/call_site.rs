//! Recovers call sites from encoded code.
//!
//! A call is lowered to the promises of its arguments followed by one call
//! instruction:
//!
//! ```text
//! make_promise #a1 .. make_promise #an  call n
//! make_promise #a1 .. make_promise #ak  call_named @names
//! ```
//!
//! This pass matches that shape and returns the argument-index list and the
//! name list of each call.

use crate::bytecode::framework::{Cursor, Dispatch, Dispatcher, LinearDriver};
use crate::bytecode::ir::Code;
use crate::bytecode::op::{Bc, FunIdx};
use crate::bytecode::pool::ConstantPool;
use crate::lang::value::ArgName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Offset of the call instruction.
    pub offset: usize,
    /// Promise code of each argument, in order.
    pub args: Vec<FunIdx>,
    /// Name of each argument, parallel to `args`.
    pub names: Vec<ArgName>,
}

/// Every call in `code` whose arguments are all promises.
pub fn call_sites(code: &Code, pool: &ConstantPool) -> Vec<CallSite> {
    let mut matcher = CallSiteMatcher {
        pool,
        sites: Vec::new(),
    };
    LinearDriver::run(code.bytes(), &mut matcher);
    matcher.sites
}

struct CallSiteMatcher<'p> {
    pool: &'p ConstantPool,
    sites: Vec<CallSite>,
}

impl CallSiteMatcher<'_> {
    fn names_for(&self, bc: Bc, args: usize) -> Option<Vec<ArgName>> {
        match bc {
            Bc::Call(n) if n as usize == args => Some(vec![ArgName::Unnamed; args]),
            Bc::CallNamed(idx) => self
                .pool
                .get(idx)
                .and_then(|v| v.as_names().map(<[_]>::to_vec))
                .filter(|names| names.len() == args),
            _ => None,
        }
    }
}

impl Dispatcher for CallSiteMatcher<'_> {
    fn do_dispatch(&mut self, cursor: &mut Cursor<'_>, dispatch: &mut Dispatch) {
        let mut args = Vec::new();
        loop {
            let offset = cursor.pc();
            let bc = match cursor.advance() {
                Ok(Bc::MakePromise(idx)) => {
                    args.push(idx);
                    continue;
                }
                Ok(bc) => bc,
                Err(_) => {
                    dispatch.fail();
                    return;
                }
            };

            match self.names_for(bc, args.len()) {
                Some(names) => self.sites.push(CallSite {
                    offset,
                    args,
                    names,
                }),
                None => dispatch.fail(),
            }
            return;
        }
    }
}
