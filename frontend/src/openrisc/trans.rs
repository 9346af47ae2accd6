//! OpenRISC instruction translation: TCG IR generation.
//!
//! The major opcode (bits 31:26) selects a decode group through
//! `GROUPS`; each group decodes its sub-opcode through small
//! operation tables and the shared `gen_*` helpers below.

use super::cpu::*;
use super::delay::{BranchTarget, BRANCH_DELAY_SLOTS};
use super::Or1kDisasContext;
use crate::DisasJumpType;
use tcg_core::{Cond, Context, MemOp, TempIdx, Type};

/// Binary IR operation: `fn(ir, ty, dst, lhs, rhs) -> dst`.
type BinOp = fn(&mut Context, Type, TempIdx, TempIdx, TempIdx) -> TempIdx;

const TL: Type = Type::I32;

// ── Field extraction ───────────────────────────────────────────

fn field(insn: u32, pos: u32, len: u32) -> u32 {
    (insn >> pos) & ((1 << len) - 1)
}

fn sext(val: u32, bits: u32) -> u32 {
    let shift = 32 - bits;
    (((val << shift) as i32) >> shift) as u32
}

// ── Operation tables ───────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Group {
    Misc,
    Move,
    Sys,
    Logic,
    CompI,
    Mac,
    Float,
    Calc,
    Comp,
}

const GROUPS: [Group; 64] = {
    let mut t = [Group::Misc; 64];
    t[0x06] = Group::Move;
    t[0x08] = Group::Sys;
    t[0x2e] = Group::Logic;
    t[0x2f] = Group::CompI;
    t[0x31] = Group::Mac;
    t[0x32] = Group::Float;
    t[0x38] = Group::Calc;
    t[0x39] = Group::Comp;
    t
};

/// `l.sll`/`l.srl`/`l.sra`/`l.ror` and their immediate forms.
const SHIFT_OPS: [(&str, BinOp); 4] = [
    ("sll", Context::gen_shl),
    ("srl", Context::gen_shr),
    ("sra", Context::gen_sar),
    ("ror", Context::gen_rotr),
];

/// `l.and`/`l.or`/`l.xor` at calc sub-opcodes 3..=5.
const LOGIC_OPS: [(&str, BinOp); 3] = [
    ("and", Context::gen_and),
    ("or", Context::gen_or),
    ("xor", Context::gen_xor),
];

/// `l.exths`/`l.extbs`/`l.exthz`/`l.extbz`: (name, len, signed).
const EXT_OPS: [(&str, u32, bool); 4] = [
    ("exths", 16, true),
    ("extbs", 8, true),
    ("exthz", 16, false),
    ("extbz", 8, false),
];

/// Set-flag conditions indexed by bits 25:21 of `l.sf*`.
const COMPARE_CONDS: [Option<(&str, Cond)>; 14] = [
    Some(("eq", Cond::Eq)),
    Some(("ne", Cond::Ne)),
    Some(("gtu", Cond::Gtu)),
    Some(("geu", Cond::Geu)),
    Some(("ltu", Cond::Ltu)),
    Some(("leu", Cond::Leu)),
    None,
    None,
    None,
    None,
    Some(("gts", Cond::Gt)),
    Some(("ges", Cond::Ge)),
    Some(("lts", Cond::Lt)),
    Some(("les", Cond::Le)),
];

/// Loads at major opcodes 0x21..=0x26.
const LOAD_OPS: [(&str, MemOp); 6] = [
    ("lwz", MemOp::teul()),
    ("lws", MemOp::tesl()),
    ("lbz", MemOp::ub()),
    ("lbs", MemOp::sb()),
    ("lhz", MemOp::teuw()),
    ("lhs", MemOp::tesw()),
];

/// Stores at major opcodes 0x35..=0x37.
const STORE_OPS: [(&str, MemOp); 3] = [
    ("sw", MemOp::teul()),
    ("sb", MemOp::ub()),
    ("sh", MemOp::teuw()),
];

const FLOAT_CALC_NAMES: [&str; 5] = ["add", "sub", "mul", "div", "rem"];
const FLOAT_CMP_NAMES: [&str; 6] = ["sfeq", "sfne", "sfgt", "sfge", "sflt", "sfle"];

// ── Helpers ────────────────────────────────────────────────────

impl Or1kDisasContext<'_> {
    // -- GPR access ----------------------------------------

    /// Read GPR `r`; r0 yields a constant zero.
    fn gpr_or_zero(&self, ir: &mut Context, r: u32) -> TempIdx {
        if r == 0 {
            ir.new_const(TL, 0)
        } else {
            self.g.gpr[r as usize]
        }
    }

    /// Write `val` into GPR `rd`; writes to r0 are discarded.
    fn gen_set_gpr(&self, ir: &mut Context, rd: u32, val: TempIdx) {
        if rd != 0 {
            ir.gen_mov(TL, self.g.gpr[rd as usize], val);
        }
    }

    fn gen_set_gpri(&self, ir: &mut Context, rd: u32, val: u32) {
        if rd != 0 {
            ir.gen_movi(TL, self.g.gpr[rd as usize], val as u64);
        }
    }

    // -- SR flags ------------------------------------------

    /// Deposit a 0/1 value into SR bit `mask`.
    fn gen_set_sr_bit(&self, ir: &mut Context, mask: u32, bit: TempIdx) {
        ir.gen_deposit(TL, self.g.sr, self.g.sr, bit, mask.trailing_zeros(), 1);
    }

    /// Range exception if `test` is set and SR[OVE] is on.
    fn gen_ove(&self, ir: &mut Context, test: TempIdx) {
        let ret = ir.new_temp(TL);
        ir.gen_call(ret, self.h.ove, &[test]);
    }

    fn gen_ove_cyov(&self, ir: &mut Context, cy: TempIdx, ov: TempIdx) {
        let t = ir.new_temp(TL);
        ir.gen_or(TL, t, cy, ov);
        self.gen_ove(ir, t);
    }

    /// Signed overflow of `res = a + b`: operands agree in sign and
    /// the result does not.
    fn gen_add_overflow(&self, ir: &mut Context, res: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        let ov = ir.new_temp(TL);
        let t0 = ir.new_temp(TL);
        ir.gen_xor(TL, ov, a, b);
        ir.gen_xor(TL, t0, res, b);
        ir.gen_andc(TL, ov, t0, ov);
        let sh = ir.new_const(TL, 31);
        ir.gen_shr(TL, ov, ov, sh)
    }

    // -- Flag arithmetic -----------------------------------

    fn gen_add(&self, ir: &mut Context, rd: u32, a: TempIdx, b: TempIdx) {
        let res = ir.new_temp(TL);
        ir.gen_add(TL, res, a, b);
        let cy = ir.new_temp(TL);
        ir.gen_setcond(TL, cy, res, a, Cond::Ltu);
        let ov = self.gen_add_overflow(ir, res, a, b);

        self.gen_set_sr_bit(ir, SR_CY, cy);
        self.gen_set_sr_bit(ir, SR_OV, ov);
        self.gen_set_gpr(ir, rd, res);
        self.gen_ove_cyov(ir, cy, ov);
    }

    fn gen_addc(&self, ir: &mut Context, rd: u32, a: TempIdx, b: TempIdx) {
        let cin = ir.new_temp(TL);
        ir.gen_extract(TL, cin, self.g.sr, SR_CY.trailing_zeros(), 1);

        // Carry out of either partial sum.
        let part = ir.new_temp(TL);
        let c1 = ir.new_temp(TL);
        ir.gen_add(TL, part, a, cin);
        ir.gen_setcond(TL, c1, part, a, Cond::Ltu);
        let res = ir.new_temp(TL);
        let c2 = ir.new_temp(TL);
        ir.gen_add(TL, res, part, b);
        ir.gen_setcond(TL, c2, res, part, Cond::Ltu);
        let cy = ir.new_temp(TL);
        ir.gen_or(TL, cy, c1, c2);
        let ov = self.gen_add_overflow(ir, res, a, b);

        self.gen_set_sr_bit(ir, SR_CY, cy);
        self.gen_set_sr_bit(ir, SR_OV, ov);
        self.gen_set_gpr(ir, rd, res);
        self.gen_ove_cyov(ir, cy, ov);
    }

    fn gen_sub(&self, ir: &mut Context, rd: u32, a: TempIdx, b: TempIdx) {
        let res = ir.new_temp(TL);
        ir.gen_sub(TL, res, a, b);
        let cy = ir.new_temp(TL);
        ir.gen_setcond(TL, cy, a, b, Cond::Ltu);

        // Operands differ in sign and the result differs from `a`.
        let ov = ir.new_temp(TL);
        let t0 = ir.new_temp(TL);
        ir.gen_xor(TL, ov, a, b);
        ir.gen_xor(TL, t0, res, a);
        ir.gen_and(TL, ov, ov, t0);
        let sh = ir.new_const(TL, 31);
        ir.gen_shr(TL, ov, ov, sh);

        self.gen_set_sr_bit(ir, SR_CY, cy);
        self.gen_set_sr_bit(ir, SR_OV, ov);
        self.gen_set_gpr(ir, rd, res);
        self.gen_ove_cyov(ir, cy, ov);
    }

    fn gen_mul(&self, ir: &mut Context, rd: u32, a: TempIdx, b: TempIdx) {
        let lo = ir.new_temp(TL);
        let hi = ir.new_temp(TL);
        ir.gen_muls2(TL, lo, hi, a, b);
        let sign = ir.new_temp(TL);
        let sh = ir.new_const(TL, 31);
        ir.gen_sar(TL, sign, lo, sh);
        let ov = ir.new_temp(TL);
        ir.gen_setcond(TL, ov, hi, sign, Cond::Ne);

        self.gen_set_sr_bit(ir, SR_OV, ov);
        self.gen_set_gpr(ir, rd, lo);
        self.gen_ove(ir, ov);
    }

    fn gen_mulu(&self, ir: &mut Context, rd: u32, a: TempIdx, b: TempIdx) {
        let lo = ir.new_temp(TL);
        let hi = ir.new_temp(TL);
        ir.gen_mulu2(TL, lo, hi, a, b);
        let cy = ir.new_temp(TL);
        let zero = ir.new_const(TL, 0);
        ir.gen_setcond(TL, cy, hi, zero, Cond::Ne);

        self.gen_set_sr_bit(ir, SR_CY, cy);
        self.gen_set_gpr(ir, rd, lo);
        self.gen_ove(ir, cy);
    }

    /// `l.div`/`l.divu`. A zero divisor raises `flag` and the
    /// divide runs against 1 instead, so the host never traps.
    fn gen_divide(&self, ir: &mut Context, rd: u32, a: TempIdx, b: TempIdx, signed: bool) {
        let flag_bit = if signed { SR_OV } else { SR_CY };
        let flag = ir.new_temp(TL);
        let zero = ir.new_const(TL, 0);
        ir.gen_setcond(TL, flag, b, zero, Cond::Eq);
        let divisor = ir.new_temp(TL);
        ir.gen_or(TL, divisor, b, flag);
        let res = ir.new_temp(TL);
        if signed {
            ir.gen_divs(TL, res, a, divisor);
        } else {
            ir.gen_divu(TL, res, a, divisor);
        }

        self.gen_set_sr_bit(ir, flag_bit, flag);
        self.gen_set_gpr(ir, rd, res);
        self.gen_ove(ir, flag);
    }

    /// `{machi,maclo} +/-= sext64(prod)`.
    fn gen_mac(&self, ir: &mut Context, prod: TempIdx, subtract: bool) {
        let p64 = ir.new_temp(Type::I64);
        ir.gen_ext_i32_i64(p64, prod);

        let acc = ir.new_temp(Type::I64);
        let hi = ir.new_temp(Type::I64);
        ir.gen_ext_u32_i64(acc, self.g.maclo);
        ir.gen_ext_u32_i64(hi, self.g.machi);
        let sh = ir.new_const(Type::I64, 32);
        ir.gen_shl(Type::I64, hi, hi, sh);
        ir.gen_or(Type::I64, acc, acc, hi);

        if subtract {
            ir.gen_sub(Type::I64, acc, acc, p64);
        } else {
            ir.gen_add(Type::I64, acc, acc, p64);
        }
        ir.gen_extrl_i64_i32(self.g.maclo, acc);
        ir.gen_extrh_i64_i32(self.g.machi, acc);
    }

    // -- Branches ------------------------------------------

    /// Decode a jump or branch and open its delay window. The
    /// pending target always lands in `jmp_pc`.
    fn gen_jump(&mut self, ir: &mut Context, op0: u32, n26: u32, rb: u32) {
        let target = self.pc.wrapping_add(sext(n26 << 2, 28));
        let link = self.pc.wrapping_add(4 * (1 + BRANCH_DELAY_SLOTS));

        let kind = match op0 {
            0x00 => {
                log_dis!(self, "l.j {:#x}", target);
                ir.gen_movi(TL, self.g.jmp_pc, target as u64);
                BranchTarget::Static(target)
            }
            0x01 => {
                log_dis!(self, "l.jal {:#x}", target);
                ir.gen_movi(TL, self.g.jmp_pc, target as u64);
                self.gen_set_gpri(ir, 9, link);
                BranchTarget::Static(target)
            }
            0x03 | 0x04 => {
                let cond = if op0 == 0x04 { Cond::Ne } else { Cond::Eq };
                log_dis!(self, "l.{} {:#x}", if op0 == 0x04 { "bf" } else { "bnf" }, target);
                let taken = ir.new_const(TL, target as u64);
                let fall = ir.new_const(TL, link as u64);
                let zero = ir.new_const(TL, 0);
                ir.gen_movcond(TL, self.g.jmp_pc, self.g.sr_f, zero, taken, fall, cond);
                BranchTarget::Dynamic
            }
            0x11 | 0x12 => {
                log_dis!(self, "l.j{}r r{}", if op0 == 0x12 { "al" } else { "" }, rb);
                // Read rb before the link write so `l.jalr r9` works.
                let dest = self.gpr_or_zero(ir, rb);
                ir.gen_mov(TL, self.g.jmp_pc, dest);
                if op0 == 0x12 {
                    self.gen_set_gpri(ir, 9, link);
                }
                BranchTarget::Dynamic
            }
            _ => unreachable!("not a jump opcode: {op0:#x}"),
        };
        self.arm_branch(kind);
    }

    // -- Memory --------------------------------------------

    fn gen_load(&self, ir: &mut Context, rd: u32, ra: u32, ofs: u32, mop: MemOp) {
        let base = self.gpr_or_zero(ir, ra);
        let addr = ir.new_temp(TL);
        let imm = ir.new_const(TL, ofs as u64);
        ir.gen_add(TL, addr, base, imm);
        let val = ir.new_temp(TL);
        ir.gen_qemu_ld(TL, val, addr, mop);
        self.gen_set_gpr(ir, rd, val);
    }

    fn gen_store(&self, ir: &mut Context, ra: u32, rb: u32, ofs: u32, mop: MemOp) {
        let base = self.gpr_or_zero(ir, ra);
        let addr = ir.new_temp(TL);
        let imm = ir.new_const(TL, ofs as u64);
        ir.gen_add(TL, addr, base, imm);
        let val = self.gpr_or_zero(ir, rb);
        ir.gen_qemu_st(TL, val, addr, mop);
    }

    fn gen_binop(&self, ir: &mut Context, rd: u32, a: TempIdx, b: TempIdx, op: BinOp) {
        let d = ir.new_temp(TL);
        op(ir, TL, d, a, b);
        self.gen_set_gpr(ir, rd, d);
    }
}

// ── Decoder ────────────────────────────────────────────────────

impl Or1kDisasContext<'_> {
    /// Translate one instruction word.
    pub(super) fn decode(&mut self, ir: &mut Context, insn: u32) {
        match GROUPS[(insn >> 26) as usize] {
            Group::Misc => self.dec_misc(ir, insn),
            Group::Move => self.dec_m(ir, insn),
            Group::Sys => self.dec_sys(ir, insn),
            Group::Logic => self.dec_logic(ir, insn),
            Group::CompI => self.dec_compi(ir, insn),
            Group::Mac => self.dec_mac(ir, insn),
            Group::Float => self.dec_float(ir, insn),
            Group::Calc => self.dec_calc(ir, insn),
            Group::Comp => self.dec_comp(ir, insn),
        }
    }

    fn dec_calc(&mut self, ir: &mut Context, insn: u32) {
        let op0 = field(insn, 0, 4);
        let op1 = field(insn, 8, 2);
        let op2 = field(insn, 6, 2);
        let ra = field(insn, 16, 5);
        let rb = field(insn, 11, 5);
        let rd = field(insn, 21, 5);

        let a = self.gpr_or_zero(ir, ra);
        let b = self.gpr_or_zero(ir, rb);

        match (op1, op0) {
            (0, 0x0) => {
                log_dis!(self, "l.add r{rd}, r{ra}, r{rb}");
                self.gen_add(ir, rd, a, b);
            }
            (0, 0x1) => {
                log_dis!(self, "l.addc r{rd}, r{ra}, r{rb}");
                self.gen_addc(ir, rd, a, b);
            }
            (0, 0x2) => {
                log_dis!(self, "l.sub r{rd}, r{ra}, r{rb}");
                self.gen_sub(ir, rd, a, b);
            }
            (0, 0x3..=0x5) => {
                let (name, op) = LOGIC_OPS[(op0 - 3) as usize];
                log_dis!(self, "l.{name} r{rd}, r{ra}, r{rb}");
                self.gen_binop(ir, rd, a, b, op);
            }
            (0, 0x8) => {
                let (name, op) = SHIFT_OPS[op2 as usize];
                log_dis!(self, "l.{name} r{rd}, r{ra}, r{rb}");
                // Shift amounts are taken modulo the word size.
                let amt = ir.new_temp(TL);
                let mask = ir.new_const(TL, 0x1f);
                ir.gen_and(TL, amt, b, mask);
                self.gen_binop(ir, rd, a, amt, op);
            }
            (0, 0xc) => {
                let (name, len, signed) = EXT_OPS[op2 as usize];
                log_dis!(self, "l.{name} r{rd}, r{ra}");
                let d = ir.new_temp(TL);
                if signed {
                    ir.gen_sextract(TL, d, a, 0, len);
                } else {
                    ir.gen_extract(TL, d, a, 0, len);
                }
                self.gen_set_gpr(ir, rd, d);
            }
            (0, 0xd) if op2 < 2 => {
                // Word extensions are moves on a 32-bit target.
                log_dis!(self, "l.extw{} r{rd}, r{ra}", if op2 == 0 { "s" } else { "z" });
                self.gen_set_gpr(ir, rd, a);
            }
            (0, 0xe) => {
                log_dis!(self, "l.cmov r{rd}, r{ra}, r{rb}");
                let d = ir.new_temp(TL);
                let zero = ir.new_const(TL, 0);
                ir.gen_movcond(TL, d, self.g.sr_f, zero, a, b, Cond::Ne);
                self.gen_set_gpr(ir, rd, d);
            }
            (0, 0xf) => {
                // 1-based index of the lowest set bit, 0 for 0.
                log_dis!(self, "l.ff1 r{rd}, r{ra}");
                let d = ir.new_temp(TL);
                let fallback = ir.new_const(TL, u32::MAX as u64);
                ir.gen_ctz(TL, d, a, fallback);
                let one = ir.new_const(TL, 1);
                ir.gen_add(TL, d, d, one);
                self.gen_set_gpr(ir, rd, d);
            }
            (1, 0xf) => {
                // 1-based index of the highest set bit, 0 for 0.
                log_dis!(self, "l.fl1 r{rd}, r{ra}");
                let d = ir.new_temp(TL);
                let width = ir.new_const(TL, 32);
                ir.gen_clz(TL, d, a, width);
                ir.gen_sub(TL, d, width, d);
                self.gen_set_gpr(ir, rd, d);
            }
            (3, 0x6) => {
                log_dis!(self, "l.mul r{rd}, r{ra}, r{rb}");
                self.gen_mul(ir, rd, a, b);
            }
            (3, 0x9) => {
                log_dis!(self, "l.div r{rd}, r{ra}, r{rb}");
                self.gen_divide(ir, rd, a, b, true);
            }
            (3, 0xa) => {
                log_dis!(self, "l.divu r{rd}, r{ra}, r{rb}");
                self.gen_divide(ir, rd, a, b, false);
            }
            (3, 0xb) => {
                log_dis!(self, "l.mulu r{rd}, r{ra}, r{rb}");
                self.gen_mulu(ir, rd, a, b);
            }
            _ => self.gen_illegal_exception(ir),
        }
    }

    fn dec_misc(&mut self, ir: &mut Context, insn: u32) {
        let op0 = field(insn, 26, 6);
        let op1 = field(insn, 24, 2);
        let ra = field(insn, 16, 5);
        let rb = field(insn, 11, 5);
        let rd = field(insn, 21, 5);
        let i16 = field(insn, 0, 16);
        let n26 = field(insn, 0, 26);
        // Split immediate of stores, mtspr and maci.
        let split = (field(insn, 21, 5) << 11) | field(insn, 0, 11);

        match op0 {
            0x00 | 0x01 | 0x03 | 0x04 => self.gen_jump(ir, op0, n26, 0),
            0x11 | 0x12 => self.gen_jump(ir, op0, 0, rb),

            0x05 if op1 == 0x01 => log_dis!(self, "l.nop {i16:#x}"),

            0x09 => {
                log_dis!(self, "l.rfe");
                if self.check_supervisor(ir) {
                    let ret = ir.new_temp(TL);
                    ir.gen_call(ret, self.h.rfe, &[]);
                    self.base.is_jmp = DisasJumpType::Update;
                }
            }

            0x13 => {
                let imm = sext(split, 16);
                log_dis!(self, "l.maci r{ra}, {}", imm as i32);
                let a = self.gpr_or_zero(ir, ra);
                let k = ir.new_const(TL, imm as u64);
                let prod = ir.new_temp(TL);
                ir.gen_mul(TL, prod, a, k);
                self.gen_mac(ir, prod, false);
            }

            0x1c..=0x1f | 0x3c..=0x3f => log_dis!(self, "l.cust{}", custom_index(op0)),

            0x21..=0x26 => {
                let (name, mop) = LOAD_OPS[(op0 - 0x21) as usize];
                let ofs = sext(i16, 16);
                log_dis!(self, "l.{name} r{rd}, {}(r{ra})", ofs as i32);
                self.gen_load(ir, rd, ra, ofs, mop);
            }

            0x27 | 0x28 => {
                let imm = sext(i16, 16);
                let a = self.gpr_or_zero(ir, ra);
                let k = ir.new_const(TL, imm as u64);
                if op0 == 0x27 {
                    log_dis!(self, "l.addi r{rd}, r{ra}, {}", imm as i32);
                    self.gen_add(ir, rd, a, k);
                } else {
                    log_dis!(self, "l.addic r{rd}, r{ra}, {}", imm as i32);
                    self.gen_addc(ir, rd, a, k);
                }
            }

            0x29..=0x2b => {
                // andi/ori zero-extend, xori sign-extends.
                let (name, op, imm): (&str, BinOp, u32) = match op0 {
                    0x29 => ("andi", Context::gen_and, i16),
                    0x2a => ("ori", Context::gen_or, i16),
                    _ => ("xori", Context::gen_xor, sext(i16, 16)),
                };
                log_dis!(self, "l.{name} r{rd}, r{ra}, {imm:#x}");
                let a = self.gpr_or_zero(ir, ra);
                let k = ir.new_const(TL, imm as u64);
                self.gen_binop(ir, rd, a, k, op);
            }

            0x2c => {
                let imm = sext(i16, 16);
                log_dis!(self, "l.muli r{rd}, r{ra}, {}", imm as i32);
                let a = self.gpr_or_zero(ir, ra);
                let k = ir.new_const(TL, imm as u64);
                self.gen_mul(ir, rd, a, k);
            }

            0x2d => {
                log_dis!(self, "l.mfspr r{rd}, r{ra}, {i16:#x}");
                if self.check_supervisor(ir) {
                    let old = self.gpr_or_zero(ir, rd);
                    let a = self.gpr_or_zero(ir, ra);
                    let k = ir.new_const(TL, i16 as u64);
                    let d = ir.new_temp(TL);
                    ir.gen_call(d, self.h.mfspr, &[old, a, k]);
                    self.gen_set_gpr(ir, rd, d);
                }
            }

            0x30 => {
                log_dis!(self, "l.mtspr r{ra}, r{rb}, {split:#x}");
                if self.check_supervisor(ir) {
                    let a = self.gpr_or_zero(ir, ra);
                    let b = self.gpr_or_zero(ir, rb);
                    let k = ir.new_const(TL, split as u64);
                    let ret = ir.new_temp(TL);
                    ir.gen_call(ret, self.h.mtspr, &[a, b, k]);
                    // SR may have changed the translation flags.
                    ir.gen_movi(TL, self.g.pc, self.pc.wrapping_add(4) as u64);
                    self.base.is_jmp = DisasJumpType::Update;
                }
            }

            0x35..=0x37 => {
                let (name, mop) = STORE_OPS[(op0 - 0x35) as usize];
                let ofs = sext(split, 16);
                log_dis!(self, "l.{name} {}(r{ra}), r{rb}", ofs as i32);
                self.gen_store(ir, ra, rb, ofs, mop);
            }

            _ => self.gen_illegal_exception(ir),
        }
    }

    fn dec_mac(&mut self, ir: &mut Context, insn: u32) {
        let op0 = field(insn, 0, 4);
        let ra = field(insn, 16, 5);
        let rb = field(insn, 11, 5);

        let subtract = match op0 {
            0x1 => false,
            0x2 => true,
            _ => return self.gen_illegal_exception(ir),
        };
        log_dis!(self, "l.{} r{ra}, r{rb}", if subtract { "msb" } else { "mac" });
        let a = self.gpr_or_zero(ir, ra);
        let b = self.gpr_or_zero(ir, rb);
        let prod = ir.new_temp(TL);
        ir.gen_mul(TL, prod, a, b);
        self.gen_mac(ir, prod, subtract);
    }

    fn dec_logic(&mut self, ir: &mut Context, insn: u32) {
        let op0 = field(insn, 6, 2);
        let rd = field(insn, 21, 5);
        let ra = field(insn, 16, 5);
        let l6 = field(insn, 0, 6);

        let (name, op) = SHIFT_OPS[op0 as usize];
        log_dis!(self, "l.{name}i r{rd}, r{ra}, {l6}");
        let a = self.gpr_or_zero(ir, ra);
        let amt = ir.new_const(TL, (l6 & 0x1f) as u64);
        self.gen_binop(ir, rd, a, amt, op);
    }

    fn dec_m(&mut self, ir: &mut Context, insn: u32) {
        let rd = field(insn, 21, 5);
        let k16 = field(insn, 0, 16);

        if field(insn, 16, 1) == 0 {
            log_dis!(self, "l.movhi r{rd}, {k16:#x}");
            self.gen_set_gpri(ir, rd, k16 << 16);
        } else {
            log_dis!(self, "l.macrc r{rd}");
            self.gen_set_gpr(ir, rd, self.g.maclo);
            ir.gen_movi(TL, self.g.maclo, 0);
            ir.gen_movi(TL, self.g.machi, 0);
        }
    }

    fn gen_setflag(&mut self, ir: &mut Context, op0: u32, a: TempIdx, b: TempIdx) -> bool {
        match COMPARE_CONDS.get(op0 as usize).copied().flatten() {
            Some((_, cond)) => {
                ir.gen_setcond(TL, self.g.sr_f, a, b, cond);
                true
            }
            None => {
                self.gen_illegal_exception(ir);
                false
            }
        }
    }

    fn dec_comp(&mut self, ir: &mut Context, insn: u32) {
        let op0 = field(insn, 21, 5);
        let ra = field(insn, 16, 5);
        let rb = field(insn, 11, 5);

        let a = self.gpr_or_zero(ir, ra);
        let b = self.gpr_or_zero(ir, rb);
        if self.gen_setflag(ir, op0, a, b) {
            log_dis!(self, "l.sf{} r{ra}, r{rb}", COMPARE_CONDS[op0 as usize].map_or("", |c| c.0));
        }
    }

    fn dec_compi(&mut self, ir: &mut Context, insn: u32) {
        let op0 = field(insn, 21, 5);
        let ra = field(insn, 16, 5);
        let imm = sext(field(insn, 0, 16), 16);

        let a = self.gpr_or_zero(ir, ra);
        let b = ir.new_const(TL, imm as u64);
        if self.gen_setflag(ir, op0, a, b) {
            log_dis!(self, "l.sf{}i r{ra}, {}", COMPARE_CONDS[op0 as usize].map_or("", |c| c.0), imm as i32);
        }
    }

    fn dec_sys(&mut self, ir: &mut Context, insn: u32) {
        let op0 = field(insn, 16, 10);
        let k16 = field(insn, 0, 16);

        match op0 {
            0x000 => {
                log_dis!(self, "l.sys {k16}");
                self.gen_raise(ir, EXCP_SYSCALL);
            }
            0x100 => {
                log_dis!(self, "l.trap {k16}");
                self.gen_raise(ir, EXCP_TRAP);
            }
            0x200 => {
                log_dis!(self, "l.msync");
                if self.check_supervisor(ir) {
                    ir.gen_mb(0);
                }
            }
            0x270 | 0x300 => {
                log_dis!(self, "l.{}sync", if op0 == 0x270 { "p" } else { "c" });
                self.check_supervisor(ir);
            }
            _ => self.gen_illegal_exception(ir),
        }
    }

    fn dec_float(&mut self, ir: &mut Context, insn: u32) {
        let op0 = field(insn, 0, 8);
        let ra = field(insn, 16, 5);
        let rb = field(insn, 11, 5);
        let rd = field(insn, 21, 5);

        let a = self.gpr_or_zero(ir, ra);
        let b = self.gpr_or_zero(ir, rb);
        let d = ir.new_temp(TL);

        match op0 {
            0x00..=0x03 | 0x06 => {
                // lf.rem.s sits after itof/ftoi in the encoding.
                let i = if op0 == 0x06 { 4 } else { op0 as usize };
                log_dis!(self, "lf.{}.s r{rd}, r{ra}, r{rb}", FLOAT_CALC_NAMES[i]);
                ir.gen_call(d, self.h.float_calc[i], &[a, b]);
                self.gen_set_gpr(ir, rd, d);
            }
            0x04 => {
                log_dis!(self, "lf.itof.s r{rd}, r{ra}");
                ir.gen_call(d, self.h.itofs, &[a]);
                self.gen_set_gpr(ir, rd, d);
            }
            0x05 => {
                log_dis!(self, "lf.ftoi.s r{rd}, r{ra}");
                ir.gen_call(d, self.h.ftois, &[a]);
                self.gen_set_gpr(ir, rd, d);
            }
            0x07 => {
                log_dis!(self, "lf.madd.s r{rd}, r{ra}, r{rb}");
                let acc = self.gpr_or_zero(ir, rd);
                ir.gen_call(d, self.h.float_madd, &[a, b, acc]);
                self.gen_set_gpr(ir, rd, d);
            }
            0x08..=0x0d => {
                let i = (op0 - 0x08) as usize;
                log_dis!(self, "lf.{}.s r{ra}, r{rb}", FLOAT_CMP_NAMES[i]);
                ir.gen_call(self.g.sr_f, self.h.float_cmp[i], &[a, b]);
            }
            _ => self.gen_illegal_exception(ir),
        }
    }
}

fn custom_index(op0: u32) -> u32 {
    match op0 {
        0x1c..=0x1f => op0 - 0x1c + 1,
        _ => op0 - 0x3c + 5,
    }
}
