//! TCG IR interpreter.
//!
//! Executes a frozen [`TbCode`] against a CPU env and guest
//! memory. Temps live in a flat `u64` frame; globals are read and
//! written straight through to the env at their byte offset so
//! helpers always observe current state.

use std::sync::atomic::{fence, Ordering};

use tcg_core::{
    Cond, GuestMemory, MemFault, MemOp, Op, Opcode, TbCode, TempIdx, TempKind,
    Type, TB_EXIT_NOCHAIN,
};

use crate::alu::{self, Word};

/// How a TB left the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TbExit {
    /// `exit_tb` with the given code.
    Exit(u32),
    /// A helper raised exception `index` while executing the guest
    /// instruction started at `pc`.
    Exception { index: u32, pc: u64, extra: u32 },
    /// A guest memory access failed in the instruction at `pc`.
    Fault { fault: MemFault, pc: u64, extra: u32 },
}

struct Interp<'a> {
    code: &'a TbCode,
    env: *mut u8,
    mem: &'a dyn GuestMemory,
    vals: Vec<u64>,
    insn_pc: u64,
    insn_extra: u32,
}

impl<'a> Interp<'a> {
    unsafe fn read(&self, t: TempIdx) -> u64 {
        let temp = &self.code.temps[t.0 as usize];
        match temp.kind {
            TempKind::Const => temp.val,
            TempKind::Global => {
                let p = self.env.offset(temp.mem_offset as isize);
                match temp.ty {
                    Type::I32 => (p as *const u32).read_unaligned() as u64,
                    Type::I64 => (p as *const u64).read_unaligned(),
                }
            }
            TempKind::Ebb | TempKind::Tb => self.vals[t.0 as usize],
        }
    }

    unsafe fn write(&mut self, t: TempIdx, v: u64) {
        let temp = &self.code.temps[t.0 as usize];
        let v = v & temp.ty.mask();
        match temp.kind {
            TempKind::Global => {
                let p = self.env.offset(temp.mem_offset as isize);
                match temp.ty {
                    Type::I32 => (p as *mut u32).write_unaligned(v as u32),
                    Type::I64 => (p as *mut u64).write_unaligned(v),
                }
            }
            TempKind::Const => {
                debug_assert!(false, "write to constant temp {}", t.0)
            }
            TempKind::Ebb | TempKind::Tb => self.vals[t.0 as usize] = v,
        }
    }

    fn fault(&self, fault: MemFault) -> TbExit {
        TbExit::Fault {
            fault,
            pc: self.insn_pc,
            extra: self.insn_extra,
        }
    }

    /// Execute one width-polymorphic arithmetic op. Returns false
    /// if `op` is not one of them.
    unsafe fn int_op<W: Word>(&mut self, op: &Op) -> bool {
        let a = &op.args;
        let r = |s: &Self, i: usize| W::from_u64(s.read(a[i]));
        if let Some(f) = alu::binary::<W>(op.opc) {
            let v = f(r(self, 1), r(self, 2));
            self.write(a[0], v.to_u64());
            return true;
        }
        if let Some(f) = alu::unary::<W>(op.opc) {
            let v = f(r(self, 1));
            self.write(a[0], v.to_u64());
            return true;
        }
        match op.opc {
            Opcode::SetCond => {
                let c = cond_of(op.carg(0));
                let v = alu::cond(c, r(self, 1), r(self, 2));
                self.write(a[0], v as u64);
            }
            Opcode::MovCond => {
                let c = cond_of(op.carg(0));
                let pick = if alu::cond(c, r(self, 1), r(self, 2)) { 3 } else { 4 };
                let v = self.read(a[pick]);
                self.write(a[0], v);
            }
            Opcode::MulS2 | Opcode::MulU2 => {
                let (lo, hi) =
                    alu::mul2(r(self, 2), r(self, 3), op.opc == Opcode::MulS2);
                self.write(a[0], lo.to_u64());
                self.write(a[1], hi.to_u64());
            }
            Opcode::Extract => {
                let v = alu::extract(r(self, 1), op.carg(0), op.carg(1));
                self.write(a[0], v.to_u64());
            }
            Opcode::SExtract => {
                let v = alu::sextract(r(self, 1), op.carg(0), op.carg(1));
                self.write(a[0], v.to_u64());
            }
            Opcode::Deposit => {
                let v = alu::deposit(r(self, 1), r(self, 2), op.carg(0), op.carg(1));
                self.write(a[0], v.to_u64());
            }
            _ => return false,
        }
        true
    }

    unsafe fn compare(&self, op: &Op) -> bool {
        let c = cond_of(op.carg(0));
        let (x, y) = (self.read(op.args[0]), self.read(op.args[1]));
        match op.op_type {
            Type::I32 => alu::cond(c, x as u32, y as u32),
            Type::I64 => alu::cond(c, x, y),
        }
    }

    unsafe fn run(&mut self) -> TbExit {
        let code = self.code;
        let ops = &code.ops;
        let mut ip = 0usize;
        while let Some(op) = ops.get(ip) {
            ip += 1;
            let a = &op.args;
            match op.opc {
                Opcode::InsnStart => {
                    self.insn_pc = op.carg(0) as u64;
                    self.insn_extra = op.carg(1);
                }
                Opcode::ExtI32I64 => {
                    let v = self.read(a[1]) as u32 as i32 as i64 as u64;
                    self.write(a[0], v);
                }
                Opcode::ExtUI32I64 | Opcode::ExtrlI64I32 => {
                    let v = self.read(a[1]) & 0xffff_ffff;
                    self.write(a[0], v);
                }
                Opcode::ExtrhI64I32 => {
                    let v = self.read(a[1]) >> 32;
                    self.write(a[0], v);
                }
                Opcode::QemuLd => {
                    let memop = MemOp::new(op.carg(0) as u16);
                    let addr = self.read(a[1]);
                    match self.mem.load(addr, memop.size_bytes(), memop.is_be()) {
                        Ok(raw) => self.write(a[0], memop.extend(raw)),
                        Err(f) => return self.fault(f),
                    }
                }
                Opcode::QemuSt => {
                    let memop = MemOp::new(op.carg(0) as u16);
                    let val = self.read(a[0]);
                    let addr = self.read(a[1]);
                    if let Err(f) =
                        self.mem.store(addr, memop.size_bytes(), memop.is_be(), val)
                    {
                        return self.fault(f);
                    }
                }
                Opcode::Br => ip = code.label_pos[op.carg(0) as usize],
                Opcode::BrCond => {
                    if self.compare(op) {
                        ip = code.label_pos[op.carg(1) as usize];
                    }
                }
                Opcode::SetLabel | Opcode::GotoTb | Opcode::Nop => {}
                Opcode::Discard => {}
                Opcode::Mb => fence(Ordering::SeqCst),
                Opcode::ExitTb => return TbExit::Exit(op.carg(0)),
                Opcode::Call => {
                    let func = code.helpers[op.carg(0) as usize];
                    let args = [
                        self.read(a[1]),
                        self.read(a[2]),
                        self.read(a[3]),
                        self.read(a[4]),
                    ];
                    match func(self.env, args) {
                        Ok(v) => self.write(a[0], v),
                        Err(index) => {
                            return TbExit::Exception {
                                index,
                                pc: self.insn_pc,
                                extra: self.insn_extra,
                            }
                        }
                    }
                }
                _ => {
                    let handled = match op.op_type {
                        Type::I32 => self.int_op::<u32>(op),
                        Type::I64 => self.int_op::<u64>(op),
                    };
                    debug_assert!(handled, "unhandled opcode {:?}", op.opc);
                }
            }
        }
        TbExit::Exit(TB_EXIT_NOCHAIN)
    }
}

fn cond_of(raw: u32) -> Cond {
    Cond::from_raw(raw).unwrap_or(Cond::Never)
}

/// Execute a translated block.
///
/// # Safety
/// `env` must point to a live CPU state whose layout matches the
/// global offsets and helpers captured in `code`, and nothing else
/// may access it for the duration of the call.
pub unsafe fn exec_tb(
    code: &TbCode,
    env: *mut u8,
    mem: &dyn GuestMemory,
) -> TbExit {
    let mut interp = Interp {
        code,
        env,
        mem,
        vals: vec![0; code.temps.len()],
        insn_pc: 0,
        insn_extra: 0,
    };
    interp.run()
}
