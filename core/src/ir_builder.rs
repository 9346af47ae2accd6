use crate::context::Context;
use crate::op::Op;
use crate::opcode::Opcode;
use crate::temp::TempIdx;
use crate::types::{Cond, MemOp, Type};

// Constant args are encoded as TempIdx(raw_value as u32).
fn carg(val: u32) -> TempIdx {
    TempIdx(val)
}

/// Number of input slots of a `call` op.
pub const CALL_MAX_ARGS: usize = 4;

impl Context {
    // -- Internal helpers --

    fn emit_binary(
        &mut self,
        opc: Opcode,
        ty: Type,
        dst: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, opc, ty, &[dst, a, b]);
        self.emit_op(op);
        dst
    }

    fn emit_unary(
        &mut self,
        opc: Opcode,
        ty: Type,
        dst: TempIdx,
        src: TempIdx,
    ) -> TempIdx {
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, opc, ty, &[dst, src]);
        self.emit_op(op);
        dst
    }

    // -- Binary ALU (1 oarg, 2 iargs) --

    pub fn gen_add(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::Add, ty, d, a, b)
    }

    pub fn gen_sub(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::Sub, ty, d, a, b)
    }

    pub fn gen_mul(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::Mul, ty, d, a, b)
    }

    pub fn gen_and(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::And, ty, d, a, b)
    }

    pub fn gen_or(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::Or, ty, d, a, b)
    }

    pub fn gen_xor(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::Xor, ty, d, a, b)
    }

    pub fn gen_andc(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::AndC, ty, d, a, b)
    }

    pub fn gen_shl(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::Shl, ty, d, a, b)
    }

    pub fn gen_shr(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::Shr, ty, d, a, b)
    }

    pub fn gen_sar(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::Sar, ty, d, a, b)
    }

    pub fn gen_rotl(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::RotL, ty, d, a, b)
    }

    pub fn gen_rotr(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::RotR, ty, d, a, b)
    }

    pub fn gen_divs(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::DivS, ty, d, a, b)
    }

    pub fn gen_divu(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::DivU, ty, d, a, b)
    }

    pub fn gen_rems(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::RemS, ty, d, a, b)
    }

    pub fn gen_remu(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::RemU, ty, d, a, b)
    }

    /// Clz: `d = a ? clz(a) : b`.
    pub fn gen_clz(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::Clz, ty, d, a, b)
    }

    /// Ctz: `d = a ? ctz(a) : b`.
    pub fn gen_ctz(&mut self, ty: Type, d: TempIdx, a: TempIdx, b: TempIdx) -> TempIdx {
        self.emit_binary(Opcode::Ctz, ty, d, a, b)
    }

    // -- Double-width multiply (2 oargs, 2 iargs) --

    pub fn gen_muls2(
        &mut self,
        ty: Type,
        dl: TempIdx,
        dh: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) {
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, Opcode::MulS2, ty, &[dl, dh, a, b]);
        self.emit_op(op);
    }

    pub fn gen_mulu2(
        &mut self,
        ty: Type,
        dl: TempIdx,
        dh: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) {
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, Opcode::MulU2, ty, &[dl, dh, a, b]);
        self.emit_op(op);
    }

    // -- Unary --

    pub fn gen_neg(&mut self, ty: Type, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::Neg, ty, d, s)
    }

    pub fn gen_not(&mut self, ty: Type, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::Not, ty, d, s)
    }

    pub fn gen_mov(&mut self, ty: Type, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::Mov, ty, d, s)
    }

    /// Move an immediate into `d`.
    pub fn gen_movi(&mut self, ty: Type, d: TempIdx, val: u64) -> TempIdx {
        let c = self.new_const(ty, val);
        self.gen_mov(ty, d, c)
    }

    // -- Type conversion --

    pub fn gen_ext_i32_i64(&mut self, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::ExtI32I64, Type::I64, d, s)
    }

    pub fn gen_ext_u32_i64(&mut self, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::ExtUI32I64, Type::I64, d, s)
    }

    pub fn gen_extrl_i64_i32(&mut self, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::ExtrlI64I32, Type::I32, d, s)
    }

    pub fn gen_extrh_i64_i32(&mut self, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::ExtrhI64I32, Type::I32, d, s)
    }

    // -- Bit field --

    /// Extract: 1 oarg, 1 iarg, 2 cargs (ofs, len)
    pub fn gen_extract(
        &mut self,
        ty: Type,
        d: TempIdx,
        src: TempIdx,
        ofs: u32,
        len: u32,
    ) -> TempIdx {
        let idx = self.next_op_idx();
        let op = Op::with_args(
            idx,
            Opcode::Extract,
            ty,
            &[d, src, carg(ofs), carg(len)],
        );
        self.emit_op(op);
        d
    }

    pub fn gen_sextract(
        &mut self,
        ty: Type,
        d: TempIdx,
        src: TempIdx,
        ofs: u32,
        len: u32,
    ) -> TempIdx {
        let idx = self.next_op_idx();
        let op = Op::with_args(
            idx,
            Opcode::SExtract,
            ty,
            &[d, src, carg(ofs), carg(len)],
        );
        self.emit_op(op);
        d
    }

    /// Deposit: 1 oarg, 2 iargs (base, field), 2 cargs (ofs, len)
    pub fn gen_deposit(
        &mut self,
        ty: Type,
        d: TempIdx,
        base: TempIdx,
        field: TempIdx,
        ofs: u32,
        len: u32,
    ) -> TempIdx {
        let idx = self.next_op_idx();
        let op = Op::with_args(
            idx,
            Opcode::Deposit,
            ty,
            &[d, base, field, carg(ofs), carg(len)],
        );
        self.emit_op(op);
        d
    }

    // -- Compare --

    pub fn gen_setcond(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
        cond: Cond,
    ) -> TempIdx {
        let idx = self.next_op_idx();
        let op = Op::with_args(
            idx,
            Opcode::SetCond,
            ty,
            &[d, a, b, carg(cond as u32)],
        );
        self.emit_op(op);
        d
    }

    /// MovCond: `d = cond(c1, c2) ? v1 : v2`.
    /// 1 oarg, 4 iargs, 1 carg (cond)
    #[allow(clippy::too_many_arguments)]
    pub fn gen_movcond(
        &mut self,
        ty: Type,
        d: TempIdx,
        c1: TempIdx,
        c2: TempIdx,
        v1: TempIdx,
        v2: TempIdx,
        cond: Cond,
    ) -> TempIdx {
        let idx = self.next_op_idx();
        let op = Op::with_args(
            idx,
            Opcode::MovCond,
            ty,
            &[d, c1, c2, v1, v2, carg(cond as u32)],
        );
        self.emit_op(op);
        d
    }

    // -- Control flow --

    /// Unconditional branch to label.
    /// Br: 0 oargs, 0 iargs, 1 carg (label_id)
    pub fn gen_br(&mut self, label_id: u32) {
        self.label_mut(label_id).refs += 1;
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, Opcode::Br, Type::I32, &[carg(label_id)]);
        self.emit_op(op);
    }

    /// Conditional branch.
    /// BrCond: 0 oargs, 2 iargs, 2 cargs (cond, label_id)
    pub fn gen_brcond(
        &mut self,
        ty: Type,
        a: TempIdx,
        b: TempIdx,
        cond: Cond,
        label_id: u32,
    ) {
        self.label_mut(label_id).refs += 1;
        let idx = self.next_op_idx();
        let op = Op::with_args(
            idx,
            Opcode::BrCond,
            ty,
            &[a, b, carg(cond as u32), carg(label_id)],
        );
        self.emit_op(op);
    }

    /// Define label position.
    /// SetLabel: 0 oargs, 0 iargs, 1 carg (label_id)
    pub fn gen_set_label(&mut self, label_id: u32) {
        let idx = self.next_op_idx();
        self.label_mut(label_id).position = Some(idx.0 as usize);
        let op =
            Op::with_args(idx, Opcode::SetLabel, Type::I32, &[carg(label_id)]);
        self.emit_op(op);
    }

    // -- TB exit --

    /// GotoTb: 0 oargs, 0 iargs, 1 carg (jump slot, 0 or 1)
    pub fn gen_goto_tb(&mut self, slot: u32) {
        debug_assert!(slot < 2, "goto_tb slot out of range");
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, Opcode::GotoTb, Type::I32, &[carg(slot)]);
        self.emit_op(op);
    }

    /// ExitTb: 0 oargs, 0 iargs, 1 carg (exit code)
    pub fn gen_exit_tb(&mut self, val: u32) {
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, Opcode::ExitTb, Type::I32, &[carg(val)]);
        self.emit_op(op);
    }

    // -- Boundary --

    /// InsnStart: 0 oargs, 0 iargs, 2 cargs (pc, extra)
    pub fn gen_insn_start(&mut self, pc: u32, extra: u32) {
        let idx = self.next_op_idx();
        let op = Op::with_args(
            idx,
            Opcode::InsnStart,
            Type::I32,
            &[carg(pc), carg(extra)],
        );
        self.emit_op(op);
    }

    /// Mb: memory barrier.
    pub fn gen_mb(&mut self, bar_type: u32) {
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, Opcode::Mb, Type::I32, &[carg(bar_type)]);
        self.emit_op(op);
    }

    /// Call helper `helper` with up to `CALL_MAX_ARGS` inputs.
    /// Call: 1 oarg (ret), 4 iargs, 1 carg (helper index). Unused
    /// input slots are filled with constant zero.
    pub fn gen_call(
        &mut self,
        ret: TempIdx,
        helper: u32,
        args: &[TempIdx],
    ) -> TempIdx {
        assert!(args.len() <= CALL_MAX_ARGS, "too many helper args");
        let zero = self.new_const(Type::I32, 0);
        let mut a = [ret, zero, zero, zero, zero, carg(helper)];
        a[1..1 + args.len()].copy_from_slice(args);
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, Opcode::Call, Type::I32, &a);
        self.emit_op(op);
        ret
    }

    pub fn gen_discard(&mut self, ty: Type, t: TempIdx) {
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, Opcode::Discard, ty, &[t]);
        self.emit_op(op);
    }

    // -- Guest memory access --

    pub fn gen_qemu_ld(
        &mut self,
        ty: Type,
        dst: TempIdx,
        addr: TempIdx,
        memop: MemOp,
    ) -> TempIdx {
        let idx = self.next_op_idx();
        let op = Op::with_args(
            idx,
            Opcode::QemuLd,
            ty,
            &[dst, addr, carg(memop.bits() as u32)],
        );
        self.emit_op(op);
        dst
    }

    pub fn gen_qemu_st(
        &mut self,
        ty: Type,
        val: TempIdx,
        addr: TempIdx,
        memop: MemOp,
    ) {
        let idx = self.next_op_idx();
        let op = Op::with_args(
            idx,
            Opcode::QemuSt,
            ty,
            &[val, addr, carg(memop.bits() as u32)],
        );
        self.emit_op(op);
    }
}
