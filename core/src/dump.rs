//! IR dump: human-readable text for TCG ops.
//!
//! Mirrors QEMU's `tcg_dump_ops()` in `tcg/tcg.c`. The output is
//! what the translator logs under the `tcg::op` target.

use std::fmt::Write;

use crate::context::Context;
use crate::op::Op;
use crate::opcode::Opcode;
use crate::temp::{TempIdx, TempKind};
use crate::types::{Cond, Type};

fn cond_name(c: u32) -> &'static str {
    Cond::from_raw(c).map_or("???", Cond::name)
}

/// Format a temp reference for display.
fn fmt_temp(ctx: &Context, idx: TempIdx, buf: &mut String) {
    let i = idx.0 as usize;
    if i >= ctx.nb_temps() as usize {
        let _ = write!(buf, "$0x{:x}", idx.0);
        return;
    }
    let t = ctx.temp(idx);
    let _ = match t.kind {
        TempKind::Const => write!(buf, "$0x{:x}", t.val),
        TempKind::Global => match t.name {
            Some(name) => write!(buf, "{name}"),
            None => write!(buf, "g{i}"),
        },
        TempKind::Ebb | TempKind::Tb => {
            write!(buf, "tmp{}", i as u32 - ctx.nb_globals())
        }
    };
}

/// Opcode name with type suffix for polymorphic ops.
fn op_name(op: &Op) -> String {
    let base = op.opc.def().name;
    if op.opc.is_int_polymorphic() {
        let suffix = match op.op_type {
            Type::I32 => "_i32",
            Type::I64 => "_i64",
        };
        format!("{base}{suffix}")
    } else {
        base.to_string()
    }
}

/// Format a single op on one line (without trailing newline).
pub fn format_op(ctx: &Context, op: &Op) -> String {
    let mut out = String::with_capacity(64);
    match op.opc {
        Opcode::InsnStart => {
            let _ = write!(out, " ---- 0x{:08x}", op.carg(0));
            return out;
        }
        Opcode::SetLabel => {
            let _ = write!(out, " L{}:", op.carg(0));
            return out;
        }
        _ => {}
    }

    let _ = write!(out, " {}", op_name(op));
    let mut first = true;
    for &a in op.oargs().iter().chain(op.iargs()) {
        out.push_str(if first { " " } else { ", " });
        first = false;
        fmt_temp(ctx, a, &mut out);
    }

    let cargs = op.cargs();
    let _ = match op.opc {
        Opcode::BrCond => {
            write!(out, ", {}, L{}", cond_name(cargs[0].0), cargs[1].0)
        }
        Opcode::SetCond | Opcode::MovCond => {
            write!(out, ", {}", cond_name(cargs[0].0))
        }
        Opcode::Br => write!(out, " L{}", cargs[0].0),
        Opcode::Call => {
            let name = ctx.helper(cargs[0].0).map_or("?", |h| h.name);
            write!(out, ", {name}")
        }
        _ => {
            for c in cargs {
                out.push_str(if first { " " } else { ", " });
                first = false;
                let _ = write!(out, "$0x{:x}", c.0);
            }
            Ok(())
        }
    };
    out
}

/// Dump all IR ops in `ctx`, one per line.
pub fn dump_ops(ctx: &Context) -> String {
    let mut out = String::new();
    for op in ctx.ops() {
        out.push_str(&format_op(ctx, op));
        out.push('\n');
    }
    out
}
