use std::fmt::Write;

use crate::bytecode::ir::{Code, Function};
use crate::bytecode::op::{Bc, FunIdx, Immediate};
use crate::bytecode::pool::ConstantPool;

/// Print disassembly of a compiled function
pub fn print_function(function: &Function, pool: &ConstantPool) {
    print!("{}", format_function(function, pool));
}

/// Disassembly of every slot of `function`, body first.
pub fn format_function(function: &Function, pool: &ConstantPool) -> String {
    let mut out = String::new();
    for (idx, code) in function.slots() {
        match code {
            Some(code) => format_code_object(&mut out, idx, code, pool),
            None => {
                let _ = writeln!(out, "════════════════════════════════════════");
                let _ = writeln!(out, " {} <unfilled>", label(idx));
                let _ = writeln!(out, "════════════════════════════════════════\n");
            }
        }
    }
    out
}

fn label(idx: FunIdx) -> String {
    if idx == 0 {
        "code[0] (body)".to_string()
    } else {
        format!("code[{}]", idx)
    }
}

fn format_code_object(out: &mut String, idx: FunIdx, code: &Code, pool: &ConstantPool) {
    let _ = writeln!(out, "════════════════════════════════════════");
    let _ = writeln!(out, " {}", label(idx));
    if let Some(source) = code.source() {
        let _ = writeln!(out, " source: {}", source);
    }
    match code.stack_size() {
        Some(size) => {
            let _ = writeln!(
                out,
                " {} bytes, stack {}, aux {}",
                code.len(),
                size.max_stack,
                size.max_aux
            );
        }
        None => {
            let _ = writeln!(out, " {} bytes, unverified", code.len());
        }
    }
    let _ = writeln!(out, "════════════════════════════════════════");
    disassemble_bytes(out, code.bytes(), pool);
    let _ = writeln!(out);
}

/// Disassemble an encoded stream; stops at the first undecodable byte.
fn disassemble_bytes(out: &mut String, bytes: &[u8], pool: &ConstantPool) {
    let mut pc = 0;
    while pc < bytes.len() {
        let offset = pc;
        match Bc::advance(bytes, &mut pc) {
            Ok(bc) => {
                let _ = write!(out, "{:04}  {:<20}", offset, bc.to_string());
                match annotation(bc, pool) {
                    Some(note) => {
                        let _ = writeln!(out, " ; {}", note);
                    }
                    None => {
                        let _ = writeln!(out);
                    }
                }
            }
            Err(e) => {
                let _ = writeln!(out, "{:04}  <{}>", offset, e);
                return;
            }
        }
    }
}

fn annotation(bc: Bc, pool: &ConstantPool) -> Option<String> {
    let Immediate::Pool(idx) = bc.immediate() else {
        return match bc {
            Bc::Call(_) => Some("( fun args -- value )".to_string()),
            Bc::ToAux => Some("( a -- ) R:( -- a )".to_string()),
            Bc::FromAux => Some("( -- a ) R:( a -- )".to_string()),
            _ => None,
        };
    };
    Some(match pool.get(idx) {
        Some(value) => value.to_string(),
        None => "<dangling>".to_string(),
    })
}
