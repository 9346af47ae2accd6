//! OpenRISC 1000 frontend: 32-bit ORBIS32/ORFPX32 translation.

use std::marker::PhantomData;

use crate::{
    translator_loop, DisasContextBase, DisasJumpType, TbInfo, TbRequest,
    TranslateConfig, TranslatorOps,
};
use cpu::*;
use delay::{BranchTarget, DelaySlot};
use helper::*;
use tcg_core::{Context, GuestMemory, TempIdx, Type, TB_EXIT_NOCHAIN};

/// Per-instruction disassembly trace, the `LOG_DIS` equivalent.
macro_rules! log_dis {
    ($dc:expr, $($arg:tt)*) => {
        ::tracing::trace!(
            target: "tcg::in_asm",
            "{:08x}:  {}",
            $dc.pc,
            format_args!($($arg)*)
        )
    };
}

pub mod cpu;
pub mod delay;
pub mod helper;
mod trans;

// ---------------------------------------------------------------
// Globals and helpers
// ---------------------------------------------------------------

const GPR_NAMES: [&str; NUM_GPRS] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10",
    "r11", "r12", "r13", "r14", "r15", "r16", "r17", "r18", "r19", "r20",
    "r21", "r22", "r23", "r24", "r25", "r26", "r27", "r28", "r29", "r30",
    "r31",
];

/// IR globals bound to `Or1kCpu` fields.
#[derive(Debug, Clone, Copy)]
pub struct Or1kGlobals {
    pub gpr: [TempIdx; NUM_GPRS],
    pub pc: TempIdx,
    pub npc: TempIdx,
    pub ppc: TempIdx,
    pub jmp_pc: TempIdx,
    pub sr: TempIdx,
    pub sr_f: TempIdx,
    pub flags: TempIdx,
    pub fpcsr: TempIdx,
    pub machi: TempIdx,
    pub maclo: TempIdx,
}

impl Or1kGlobals {
    pub const COUNT: u32 = NUM_GPRS as u32 + 10;

    /// Bind the globals in `ir`. A context keeps its globals across
    /// `reset`, so only the first call allocates; later calls
    /// rebuild the same indices.
    pub fn register(ir: &mut Context) -> Self {
        let fresh = ir.nb_globals() == 0;
        assert!(
            fresh || ir.nb_globals() == Self::COUNT,
            "context carries globals of another target"
        );
        let mut next = 0u32;
        let mut global = |ir: &mut Context, offset: i64, name: &'static str| {
            let idx = if fresh {
                ir.new_global(Type::I32, offset, name)
            } else {
                TempIdx(next)
            };
            next += 1;
            idx
        };

        let mut gpr = [TempIdx(0); NUM_GPRS];
        for (i, g) in gpr.iter_mut().enumerate() {
            *g = global(ir, gpr_offset(i), GPR_NAMES[i]);
        }
        Self {
            gpr,
            pc: global(ir, PC_OFFSET, "pc"),
            npc: global(ir, NPC_OFFSET, "npc"),
            ppc: global(ir, PPC_OFFSET, "ppc"),
            jmp_pc: global(ir, JMP_PC_OFFSET, "jmp_pc"),
            sr: global(ir, SR_OFFSET, "sr"),
            sr_f: global(ir, SR_F_OFFSET, "sr_f"),
            flags: global(ir, FLAGS_OFFSET, "flags"),
            fpcsr: global(ir, FPCSR_OFFSET, "fpcsr"),
            machi: global(ir, MACHI_OFFSET, "machi"),
            maclo: global(ir, MACLO_OFFSET, "maclo"),
        }
    }
}

/// Helper call indices in the context's helper table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Or1kHelpers {
    pub exception: u32,
    pub ove: u32,
    pub rfe: u32,
    pub mtspr: u32,
    pub mfspr: u32,
    /// Indexed by `FOP_*`.
    pub float_calc: [u32; 5],
    /// Indexed by `FCMP_*`.
    pub float_cmp: [u32; 6],
    pub float_madd: u32,
    pub itofs: u32,
    pub ftois: u32,
}

impl Or1kHelpers {
    fn register(ir: &mut Context) -> Self {
        Self {
            exception: ir.register_helper("exception", helper_exception),
            ove: ir.register_helper("ove", helper_ove),
            rfe: ir.register_helper("rfe", helper_rfe),
            mtspr: ir.register_helper("mtspr", helper_mtspr),
            mfspr: ir.register_helper("mfspr", helper_mfspr),
            float_calc: [
                ir.register_helper("float_add_s", helper_float_calc_s::<FOP_ADD>),
                ir.register_helper("float_sub_s", helper_float_calc_s::<FOP_SUB>),
                ir.register_helper("float_mul_s", helper_float_calc_s::<FOP_MUL>),
                ir.register_helper("float_div_s", helper_float_calc_s::<FOP_DIV>),
                ir.register_helper("float_rem_s", helper_float_calc_s::<FOP_REM>),
            ],
            float_cmp: [
                ir.register_helper("float_eq_s", helper_float_cmp_s::<FCMP_EQ>),
                ir.register_helper("float_ne_s", helper_float_cmp_s::<FCMP_NE>),
                ir.register_helper("float_gt_s", helper_float_cmp_s::<FCMP_GT>),
                ir.register_helper("float_ge_s", helper_float_cmp_s::<FCMP_GE>),
                ir.register_helper("float_lt_s", helper_float_cmp_s::<FCMP_LT>),
                ir.register_helper("float_le_s", helper_float_cmp_s::<FCMP_LE>),
            ],
            float_madd: ir.register_helper("float_madd_s", helper_float_madd_s),
            itofs: ir.register_helper("itofs", helper_itofs),
            ftois: ir.register_helper("ftois", helper_ftois),
        }
    }
}

// ---------------------------------------------------------------
// Disassembly context
// ---------------------------------------------------------------

/// OpenRISC disassembly context (extends `DisasContextBase`).
pub struct Or1kDisasContext<'a> {
    pub base: DisasContextBase,
    pub(crate) g: Or1kGlobals,
    pub(crate) h: Or1kHelpers,
    mem: &'a dyn GuestMemory,
    breakpoints: &'a [u64],
    /// Address of the instruction being translated.
    pub pc: u32,
    /// Flags the TB was looked up with.
    pub tb_flags: u32,
    /// Delay countdown last written to `env.flags`.
    synced_delay: u32,
    pub delay: DelaySlot,
    /// Set by a branch so the instruction that armed the window
    /// does not count as one of its slots.
    just_armed: bool,
}

impl<'a> Or1kDisasContext<'a> {
    pub fn new(
        ir: &mut Context,
        mem: &'a dyn GuestMemory,
        req: &TbRequest<'a>,
        cfg: &TranslateConfig,
    ) -> Self {
        Self {
            base: DisasContextBase::new(req, cfg),
            g: Or1kGlobals::register(ir),
            h: Or1kHelpers::register(ir),
            mem,
            breakpoints: req.breakpoints,
            pc: req.pc as u32,
            tb_flags: req.flags,
            synced_delay: req.flags & TB_FLAGS_DELAY_MASK,
            delay: DelaySlot::NotBranching,
            just_armed: false,
        }
    }

    pub fn is_supervisor(&self) -> bool {
        self.tb_flags & TB_FLAGS_SM != 0
    }

    // -- Exceptions ----------------------------------------

    pub(crate) fn gen_exception(&self, ir: &mut Context, excp: u32) {
        let ret = ir.new_temp(Type::I32);
        let e = ir.new_const(Type::I32, excp as u64);
        ir.gen_call(ret, self.h.exception, &[e]);
    }

    /// `pc = insn; raise excp` and leave through the update path.
    pub(crate) fn gen_raise(&mut self, ir: &mut Context, excp: u32) {
        ir.gen_movi(Type::I32, self.g.pc, self.pc as u64);
        self.gen_exception(ir, excp);
        self.base.is_jmp = DisasJumpType::Update;
    }

    pub(crate) fn gen_illegal_exception(&mut self, ir: &mut Context) {
        self.gen_raise(ir, EXCP_ILLEGAL);
    }

    /// Privileged instructions raise an illegal-instruction
    /// exception in user mode. Returns whether translation may
    /// proceed.
    pub(crate) fn check_supervisor(&mut self, ir: &mut Context) -> bool {
        if self.is_supervisor() {
            true
        } else {
            self.gen_illegal_exception(ir);
            false
        }
    }

    // -- Delay slots ---------------------------------------

    /// Open a delay window for a branch decoded at `self.pc`.
    pub(crate) fn arm_branch(&mut self, target: BranchTarget) {
        self.delay = DelaySlot::arm(target);
        self.just_armed = true;
    }

    /// Write the current delay countdown to `env.flags` if it
    /// differs from what is already there.
    fn gen_sync_flags(&mut self, ir: &mut Context) {
        let countdown = self.delay.countdown();
        if countdown != self.synced_delay {
            ir.gen_movi(Type::I32, self.g.flags, countdown as u64);
            self.synced_delay = countdown;
        }
    }

    fn use_goto_tb(&self, dest: u32) -> bool {
        !self.base.singlestep_enabled && self.base.same_page(dest as u64)
    }

    /// Leave the TB towards `dest`, chaining through slot `n` when
    /// the destination is on the same page.
    fn gen_goto_tb(&mut self, ir: &mut Context, n: u32, dest: u32) {
        ir.gen_movi(Type::I32, self.g.pc, dest as u64);
        if self.use_goto_tb(dest) {
            ir.gen_goto_tb(n);
            ir.gen_exit_tb(n);
        } else if self.base.singlestep_enabled {
            self.gen_exception(ir, EXCP_DEBUG);
        } else {
            ir.gen_exit_tb(TB_EXIT_NOCHAIN);
        }
    }

    /// The delay window closed: transfer control and end the TB.
    fn gen_branch_commit(&mut self, ir: &mut Context, target: BranchTarget) {
        self.gen_sync_flags(ir);
        match target {
            BranchTarget::Static(dest) => {
                ir.gen_movi(Type::I32, self.g.npc, dest as u64);
                self.gen_goto_tb(ir, 1, dest);
            }
            BranchTarget::Dynamic => {
                ir.gen_mov(Type::I32, self.g.pc, self.g.jmp_pc);
                ir.gen_mov(Type::I32, self.g.npc, self.g.jmp_pc);
                if self.base.singlestep_enabled {
                    self.gen_exception(ir, EXCP_DEBUG);
                } else {
                    ir.gen_exit_tb(TB_EXIT_NOCHAIN);
                }
            }
        }
        self.base.is_jmp = DisasJumpType::Jump;
    }
}

// ---------------------------------------------------------------
// TranslatorOps implementation
// ---------------------------------------------------------------

/// Marker type for the OpenRISC translator.
pub struct Or1kTranslator<'a>(PhantomData<&'a ()>);

impl<'a> TranslatorOps for Or1kTranslator<'a> {
    type DisasContext = Or1kDisasContext<'a>;

    fn init_disas_context(dc: &mut Or1kDisasContext<'a>, _ir: &mut Context) {
        dc.delay = DelaySlot::from_tb_flags(dc.tb_flags);
        dc.synced_delay = dc.delay.countdown();
        tracing::trace!(
            target: "tcg::in_asm",
            pc = format_args!("{:#010x}", dc.base.pc_first),
            flags = dc.tb_flags,
            "----------------"
        );
    }

    fn tb_start(_dc: &mut Or1kDisasContext<'a>, _ir: &mut Context) {}

    fn insn_start(dc: &mut Or1kDisasContext<'a>, ir: &mut Context) {
        ir.gen_insn_start(dc.base.pc_next as u32, dc.delay.countdown());
        dc.base.num_insns += 1;
    }

    fn breakpoint_check(dc: &mut Or1kDisasContext<'a>, ir: &mut Context) -> bool {
        if !dc.breakpoints.contains(&dc.base.pc_next) {
            return false;
        }
        dc.pc = dc.base.pc_next as u32;
        dc.gen_raise(ir, EXCP_DEBUG);
        // The breakpoint address must fall inside [pc_first, pc_first
        // + size) so that removing it invalidates this TB.
        dc.base.pc_next = u64::from(dc.pc.wrapping_add(4));
        true
    }

    fn translate_insn(dc: &mut Or1kDisasContext<'a>, ir: &mut Context) {
        let pc = dc.base.pc_next as u32;
        dc.pc = pc;

        let insn = match dc.mem.fetch_insn(pc as u64) {
            Ok(insn) => insn,
            Err(fault) if dc.base.num_insns > 1 => {
                // Leave the faulting fetch to a TB of its own.
                tracing::trace!(target: "tcg::in_asm", %fault, "stopping before unfetchable insn");
                dc.base.num_insns -= 1;
                dc.base.is_jmp = DisasJumpType::TooMany;
                return;
            }
            Err(fault) => {
                tracing::debug!(target: "tcg::in_asm", %fault, "instruction fetch fault");
                dc.gen_raise(ir, EXCP_IPF);
                dc.base.pc_next = u64::from(pc.wrapping_add(4));
                return;
            }
        };

        ir.gen_movi(Type::I32, dc.g.ppc, pc.wrapping_sub(4) as u64);
        ir.gen_movi(Type::I32, dc.g.npc, pc.wrapping_add(4) as u64);

        let in_window = dc.delay.is_armed();
        dc.just_armed = false;
        dc.decode(ir, insn);
        dc.base.pc_next = u64::from(pc.wrapping_add(4));

        if in_window && !dc.just_armed {
            if let Some(target) = dc.delay.step() {
                dc.gen_branch_commit(ir, target);
            }
        }
    }

    fn tb_stop(dc: &mut Or1kDisasContext<'a>, ir: &mut Context) {
        match dc.base.is_jmp {
            DisasJumpType::Next | DisasJumpType::TooMany => {
                dc.gen_sync_flags(ir);
                let dest = dc.base.pc_next as u32;
                dc.gen_goto_tb(ir, 0, dest);
            }
            DisasJumpType::Update => {
                // pc already written; the next TB comes from a lookup.
                dc.gen_sync_flags(ir);
                if dc.base.singlestep_enabled {
                    dc.gen_exception(ir, EXCP_DEBUG);
                } else {
                    ir.gen_exit_tb(TB_EXIT_NOCHAIN);
                }
            }
            DisasJumpType::Jump | DisasJumpType::NoReturn => {}
        }
    }

    fn base<'b>(dc: &'b Or1kDisasContext<'a>) -> &'b DisasContextBase {
        &dc.base
    }

    fn base_mut<'b>(dc: &'b mut Or1kDisasContext<'a>) -> &'b mut DisasContextBase {
        &mut dc.base
    }
}

/// Translate one TB starting at `req.pc` into `ir`.
///
/// `ir` must have been reset by the caller; globals and helpers
/// registered by an earlier call on the same context are reused.
pub fn gen_intermediate_code(
    ir: &mut Context,
    mem: &dyn GuestMemory,
    req: &TbRequest<'_>,
    cfg: &TranslateConfig,
) -> TbInfo {
    let mut dc = Or1kDisasContext::new(ir, mem, req, cfg);
    translator_loop::<Or1kTranslator<'_>>(&mut dc, ir)
}
