//! TCG Frontend: guest instruction decoding and IR generation.
//!
//! Provides the generic translation framework (`TranslatorOps` trait
//! and `translator_loop`) plus the OpenRISC decoder.

pub mod openrisc;

use tcg_core::{Context, DEFAULT_OP_BUF_SIZE, TCG_MAX_INSNS};

// ---------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------

/// Knobs that bound a single translation block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslateConfig {
    /// Instruction ceiling per TB; 0 means the engine limit.
    /// Always capped at `TCG_MAX_INSNS`.
    pub max_insns: u32,
    /// Capacity of the IR op buffer.
    pub op_buf_size: usize,
    /// Guest page size in bits; TBs never cross a page.
    pub page_bits: u32,
    /// Translate one instruction per TB (no debug exception).
    pub singlestep: bool,
}

impl TranslateConfig {
    /// Effective instruction limit for a TB whose cflags ask for
    /// `requested` (0 = unlimited).
    pub fn effective_max_insns(&self, requested: u32) -> u32 {
        let mut n = TCG_MAX_INSNS;
        for limit in [self.max_insns, requested] {
            if limit != 0 {
                n = n.min(limit);
            }
        }
        if self.singlestep {
            1
        } else {
            n
        }
    }

    pub fn page_size(&self) -> u64 {
        1 << self.page_bits
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            max_insns: 0,
            op_buf_size: DEFAULT_OP_BUF_SIZE,
            page_bits: openrisc::cpu::OR1K_PAGE_BITS,
            singlestep: false,
        }
    }
}

// ---------------------------------------------------------------
// Generic translation framework
// ---------------------------------------------------------------

/// What the execution loop asks the translator for.
#[derive(Debug, Clone, Copy)]
pub struct TbRequest<'a> {
    pub pc: u64,
    /// Translation-relevant CPU flags (part of the TB key).
    pub flags: u32,
    /// Instruction limit from the TB's cflags; 0 means none.
    pub max_insns: u32,
    /// Debugger single-stepping: raise a debug exception after
    /// every instruction.
    pub singlestep_enabled: bool,
    pub breakpoints: &'a [u64],
}

/// Metadata of a finished translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TbInfo {
    /// Guest bytes covered, including a breakpoint's address.
    pub size: u32,
    pub icount: u32,
}

/// TB termination reason set by `translate_insn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisasJumpType {
    /// Continue to the next sequential instruction.
    Next,
    /// Stopped by a resource limit (insn count, op buffer, page
    /// boundary, single-step); fall through to `pc_next`.
    TooMany,
    /// The TB has already exited through a branch.
    Jump,
    /// CPU state changed under the translator; the pc is already
    /// written and the next TB must be found by lookup.
    Update,
    /// Nothing more to emit.
    NoReturn,
}

/// Base context shared by all guest architectures.
///
/// Mirrors QEMU's `DisasContextBase`.
#[derive(Debug, Clone)]
pub struct DisasContextBase {
    /// PC of the first instruction in this TB.
    pub pc_first: u64,
    /// PC of the *next* instruction to decode.
    pub pc_next: u64,
    /// How the current instruction terminates.
    pub is_jmp: DisasJumpType,
    /// Number of guest instructions translated so far.
    pub num_insns: u32,
    /// Maximum instructions allowed in one TB.
    pub max_insns: u32,
    pub singlestep_enabled: bool,
    page_mask: u64,
}

impl DisasContextBase {
    pub fn new(req: &TbRequest<'_>, cfg: &TranslateConfig) -> Self {
        let page_size = cfg.page_size();
        Self {
            pc_first: req.pc,
            pc_next: req.pc,
            is_jmp: DisasJumpType::Next,
            num_insns: 0,
            max_insns: cfg.effective_max_insns(req.max_insns),
            singlestep_enabled: req.singlestep_enabled,
            page_mask: !(page_size - 1),
        }
    }

    /// Same-page test used to decide whether a direct jump may be
    /// chained.
    pub fn same_page(&self, dest: u64) -> bool {
        (self.pc_first & self.page_mask) == (dest & self.page_mask)
    }

    /// `pc_next` is outside the TB's first page, including after
    /// the guest address wrapped to zero.
    pub fn leaves_page(&self) -> bool {
        !self.same_page(self.pc_next)
    }
}

/// Per-architecture translation operations.
///
/// Mirrors QEMU's `TranslatorOps` vtable.
pub trait TranslatorOps {
    /// Architecture-specific disassembly context.
    type DisasContext;

    /// One-time setup before the translation loop.
    fn init_disas_context(ctx: &mut Self::DisasContext, ir: &mut Context);

    /// Called once at the start of the TB (after init).
    fn tb_start(ctx: &mut Self::DisasContext, ir: &mut Context);

    /// Emit `insn_start` marker for the current guest PC.
    fn insn_start(ctx: &mut Self::DisasContext, ir: &mut Context);

    /// If a breakpoint sits at `pc_next`, emit the debug exit,
    /// account for the instruction in the TB size and return true.
    fn breakpoint_check(ctx: &mut Self::DisasContext, ir: &mut Context) -> bool;

    /// Decode and translate one guest instruction.
    ///
    /// Must advance `base().pc_next` and set `base().is_jmp`
    /// when the instruction terminates the TB.
    fn translate_insn(ctx: &mut Self::DisasContext, ir: &mut Context);

    /// Emit TB epilogue (exit / goto_tb for fall-through).
    fn tb_stop(ctx: &mut Self::DisasContext, ir: &mut Context);

    /// Access the base context embedded in the arch context.
    fn base(ctx: &Self::DisasContext) -> &DisasContextBase;

    /// Mutable access to the base context.
    fn base_mut(ctx: &mut Self::DisasContext) -> &mut DisasContextBase;
}

/// Generic translation loop: drives the decode → translate
/// cycle.
///
/// Mirrors QEMU's `translator_loop()` in
/// `accel/tcg/translator.c`. Termination is checked after every
/// instruction: the instruction itself ended the TB, the op buffer
/// is nearly full, single-stepping, the next pc is on another page,
/// or the instruction budget is spent.
pub fn translator_loop<T: TranslatorOps>(
    ctx: &mut T::DisasContext,
    ir: &mut Context,
) -> TbInfo {
    T::init_disas_context(ctx, ir);
    T::tb_start(ctx, ir);

    loop {
        T::insn_start(ctx, ir);
        if T::breakpoint_check(ctx, ir) {
            break;
        }
        T::translate_insn(ctx, ir);

        let base = T::base(ctx);
        if base.is_jmp != DisasJumpType::Next {
            break;
        }
        if ir.op_buf_full()
            || base.singlestep_enabled
            || base.leaves_page()
            || base.num_insns >= base.max_insns
        {
            T::base_mut(ctx).is_jmp = DisasJumpType::TooMany;
            break;
        }
    }

    T::tb_stop(ctx, ir);

    let base = T::base(ctx);
    let info = TbInfo {
        size: base.pc_next.wrapping_sub(base.pc_first) as u32,
        icount: base.num_insns,
    };
    tracing::debug!(
        target: "tcg::in_asm",
        pc = format_args!("{:#010x}", base.pc_first),
        isize = info.size,
        icount = info.icount,
        osize = ir.num_ops(),
        stop = ?base.is_jmp,
        "translated block"
    );
    info
}
