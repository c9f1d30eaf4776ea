//! Traversal framework for passes over encoded code.
//!
//! Two roles are kept apart:
//!
//! - a [`Dispatcher`] decides what applies at the cursor and how far to move
//!   it;
//! - a [`Driver`] decides when, and in which order, the dispatcher sees the
//!   code.
//!
//! A dispatcher reports "no rule matched here" with [`Dispatch::fail`]. That
//! is not an error: the driver moves on. Fatal findings are kept by the
//! dispatcher itself, which may [`Dispatch::halt`] the traversal.

use crate::bytecode::op::{Bc, DecodeError};

/// Read position inside one code object's byte stream.
#[derive(Debug, Clone)]
pub struct Cursor<'c> {
    code: &'c [u8],
    pc: usize,
}

impl<'c> Cursor<'c> {
    pub fn new(code: &'c [u8]) -> Self {
        Self { code, pc: 0 }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn at_end(&self) -> bool {
        self.pc >= self.code.len()
    }

    /// Decode the instruction at the cursor without moving.
    pub fn peek(&self) -> Result<Bc, DecodeError> {
        Bc::read(self.code, self.pc)
    }

    /// Decode the instruction at the cursor and step past it.
    pub fn advance(&mut self) -> Result<Bc, DecodeError> {
        Bc::advance(self.code, &mut self.pc)
    }

    /// Move back to a position obtained from [`Cursor::pc`].
    pub fn seek(&mut self, pc: usize) {
        self.pc = pc;
    }
}

/// Outcome flags of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    success: bool,
    halted: bool,
}

impl Dispatch {
    fn new() -> Self {
        Self {
            success: true,
            halted: false,
        }
    }

    /// No rule matched at the cursor.
    pub fn fail(&mut self) {
        self.success = false;
    }

    /// Stop the traversal after this dispatch.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn succeeded(&self) -> bool {
        self.success
    }

    pub fn halted(&self) -> bool {
        self.halted
    }
}

pub trait Dispatcher {
    /// Act on the instruction(s) at `cursor` and advance past them, or call
    /// `dispatch.fail()` if nothing applies.
    fn do_dispatch(&mut self, cursor: &mut Cursor<'_>, dispatch: &mut Dispatch);

    fn dispatch(&mut self, cursor: &mut Cursor<'_>) -> Dispatch {
        let mut dispatch = Dispatch::new();
        self.do_dispatch(cursor, &mut dispatch);
        dispatch
    }
}

/// Walk order over a code object.
pub trait Driver {
    fn do_run(&mut self, code: &[u8], dispatcher: &mut dyn Dispatcher);
}

/// Forward scan from the first to the last instruction.
///
/// Where the dispatcher does not match, the cursor is rewound to where the
/// dispatch started and stepped over a single instruction. The scan stops
/// early on halt or on bytes it cannot decode.
#[derive(Debug, Default)]
pub struct LinearDriver {
    unmatched: usize,
}

impl LinearDriver {
    /// Run `dispatcher` over `code`; returns how many positions went unmatched.
    pub fn run<D: Dispatcher>(code: &[u8], dispatcher: &mut D) -> usize {
        let mut driver = LinearDriver::default();
        driver.do_run(code, dispatcher);
        driver.unmatched
    }
}

impl Driver for LinearDriver {
    fn do_run(&mut self, code: &[u8], dispatcher: &mut dyn Dispatcher) {
        let mut cursor = Cursor::new(code);

        while !cursor.at_end() {
            let start = cursor.pc();
            let dispatch = dispatcher.dispatch(&mut cursor);
            if dispatch.halted() {
                break;
            }

            let step = if !dispatch.succeeded() {
                self.unmatched += 1;
                cursor.seek(start);
                true
            } else {
                // Guarantees progress for a dispatcher that consumed nothing.
                cursor.pc() == start
            };

            if step && cursor.advance().is_err() {
                break;
            }
        }
    }
}
