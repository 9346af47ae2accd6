//! OpenRISC 1000 (OR1K, 32-bit) CPU state.

use std::mem::offset_of;

/// Number of general-purpose registers (r0-r31).
pub const NUM_GPRS: usize = 32;

/// Guest page size in bits (8 KiB pages).
pub const OR1K_PAGE_BITS: u32 = 13;

// Supervision register bits.
pub const SR_SM: u32 = 1 << 0;
pub const SR_TEE: u32 = 1 << 1;
pub const SR_IEE: u32 = 1 << 2;
pub const SR_F: u32 = 1 << 9;
pub const SR_CY: u32 = 1 << 10;
pub const SR_OV: u32 = 1 << 11;
pub const SR_OVE: u32 = 1 << 12;
pub const SR_DSX: u32 = 1 << 13;
pub const SR_FO: u32 = 1 << 15;

// FPCSR bits.
pub const FPCSR_FPEE: u32 = 1 << 0;
pub const FPCSR_OVF: u32 = 1 << 3;
pub const FPCSR_UNF: u32 = 1 << 4;
pub const FPCSR_IVF: u32 = 1 << 8;
pub const FPCSR_INF: u32 = 1 << 9;
pub const FPCSR_ZF: u32 = 1 << 10;
pub const FPCSR_DZF: u32 = 1 << 11;

// Exception vectors (numbered as the architecture's vector index).
pub const EXCP_RESET: u32 = 0x1;
pub const EXCP_BUSERR: u32 = 0x2;
pub const EXCP_DPF: u32 = 0x3;
pub const EXCP_IPF: u32 = 0x4;
pub const EXCP_TICK: u32 = 0x5;
pub const EXCP_ALIGN: u32 = 0x6;
pub const EXCP_ILLEGAL: u32 = 0x7;
pub const EXCP_INT: u32 = 0x8;
pub const EXCP_RANGE: u32 = 0xb;
pub const EXCP_SYSCALL: u32 = 0xc;
pub const EXCP_FPE: u32 = 0xd;
pub const EXCP_TRAP: u32 = 0xe;
/// Internal: debugger stop (breakpoint or single-step).
pub const EXCP_DEBUG: u32 = 0x10002;
/// No exception pending.
pub const EXCP_NONE: u32 = u32::MAX;

/// TB flag bits 0-1: remaining delay-slot countdown.
pub const TB_FLAGS_DELAY_MASK: u32 = 0x3;
/// TB flag bit 2: translated in supervisor mode.
pub const TB_FLAGS_SM: u32 = 1 << 2;

// Special-purpose register numbers: (group << 11) | index.
pub const fn spr(group: u32, idx: u32) -> u32 {
    (group << 11) | idx
}
pub const SPR_VR: u32 = spr(0, 0);
pub const SPR_UPR: u32 = spr(0, 1);
pub const SPR_CPUCFGR: u32 = spr(0, 2);
pub const SPR_NPC: u32 = spr(0, 16);
pub const SPR_SR: u32 = spr(0, 17);
pub const SPR_PPC: u32 = spr(0, 18);
pub const SPR_FPCSR: u32 = spr(0, 20);
pub const SPR_EPCR0: u32 = spr(0, 32);
pub const SPR_EEAR0: u32 = spr(0, 48);
pub const SPR_ESR0: u32 = spr(0, 64);
pub const SPR_MACLO: u32 = spr(5, 1);
pub const SPR_MACHI: u32 = spr(5, 2);
pub const SPR_PICMR: u32 = spr(9, 0);
pub const SPR_PICSR: u32 = spr(9, 2);
pub const SPR_TTMR: u32 = spr(10, 0);
pub const SPR_TTCR: u32 = spr(10, 1);

/// CPU model configuration words, read back through `l.mfspr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Or1kCfg {
    pub cpucfgr: u32,
    pub vr: u32,
    pub upr: u32,
}

impl Or1kCfg {
    /// or1200-like core: ORBIS32 + ORFPX32, no MMU/caches.
    pub const OR1200: Self = Self {
        cpucfgr: 0x0000_0020 | 0x0000_0100,
        vr: 0x1200_0001,
        upr: 0x0000_0001,
    };

    /// Bare ORBIS32 core.
    pub const ANY: Self = Self {
        cpucfgr: 0x0000_0020,
        vr: 0x1000_0000,
        upr: 0x0000_0001,
    };
}

impl Default for Or1kCfg {
    fn default() -> Self {
        Self::ANY
    }
}

/// OpenRISC architectural state.
///
/// Layout must be `#[repr(C)]` so that TCG global temps can
/// reference fields at fixed offsets from the env pointer.
#[repr(C)]
#[derive(Debug, Clone)]
pub struct Or1kCpu {
    /// General-purpose registers r0-r31.
    /// r0 is kept at zero by the translator.
    pub gpr: [u32; NUM_GPRS],
    pub pc: u32,
    /// Next PC.
    pub npc: u32,
    /// Previous PC.
    pub ppc: u32,
    /// Pending delayed-branch target.
    pub jmp_pc: u32,
    /// Supervision register, without the F flag.
    pub sr: u32,
    /// Branch flag, kept separately (0 or 1).
    pub sr_f: u32,
    /// Runtime copy of the TB-dependent flags.
    pub flags: u32,
    pub fpcsr: u32,
    pub machi: u32,
    pub maclo: u32,
    pub epcr: u32,
    pub eear: u32,
    pub esr: u32,
    pub picmr: u32,
    pub picsr: u32,
    pub ttmr: u32,
    pub ttcr: u32,
    pub exception_index: u32,
    pub cfg: Or1kCfg,
}

impl Or1kCpu {
    pub fn new(cfg: Or1kCfg) -> Self {
        Self {
            gpr: [0; NUM_GPRS],
            pc: 0x100,
            npc: 0x104,
            ppc: 0,
            jmp_pc: 0,
            sr: SR_FO | SR_SM,
            sr_f: 0,
            flags: 0,
            fpcsr: 0,
            machi: 0,
            maclo: 0,
            epcr: 0,
            eear: 0,
            esr: 0,
            picmr: 0,
            picsr: 0,
            ttmr: 0,
            ttcr: 0,
            exception_index: EXCP_NONE,
            cfg,
        }
    }

    /// Full SR value with the F flag folded back in.
    pub fn get_sr(&self) -> u32 {
        (self.sr & !SR_F) | if self.sr_f != 0 { SR_F } else { 0 }
    }

    pub fn set_sr(&mut self, val: u32) {
        self.sr_f = u32::from(val & SR_F != 0);
        self.sr = (val & !SR_F) | SR_FO;
    }

    pub fn is_supervisor(&self) -> bool {
        self.sr & SR_SM != 0
    }

    /// Flags that select a translation: delay countdown plus
    /// privilege level.
    pub fn tb_flags(&self) -> u32 {
        let sm = if self.is_supervisor() { TB_FLAGS_SM } else { 0 };
        (self.flags & TB_FLAGS_DELAY_MASK) | sm
    }

    /// Rewind to the guest instruction at `pc` after an exit in
    /// the middle of a TB. `delay` is the countdown recorded at
    /// that instruction.
    pub fn restore_state(&mut self, pc: u32, delay: u32) {
        self.pc = pc;
        self.npc = pc.wrapping_add(4);
        self.flags = (self.flags & !TB_FLAGS_DELAY_MASK) | (delay & TB_FLAGS_DELAY_MASK);
        if delay != 0 {
            self.sr |= SR_DSX;
        } else {
            self.sr &= !SR_DSX;
        }
    }

    pub fn env_ptr(&mut self) -> *mut u8 {
        self as *mut Self as *mut u8
    }
}

impl Default for Or1kCpu {
    fn default() -> Self {
        Self::new(Or1kCfg::default())
    }
}

// Field offsets (bytes) from the start of Or1kCpu.
// Used by `Context::new_global()` to bind IR temps.

pub const fn gpr_offset(i: usize) -> i64 {
    (offset_of!(Or1kCpu, gpr) + i * 4) as i64
}

pub const PC_OFFSET: i64 = offset_of!(Or1kCpu, pc) as i64;
pub const NPC_OFFSET: i64 = offset_of!(Or1kCpu, npc) as i64;
pub const PPC_OFFSET: i64 = offset_of!(Or1kCpu, ppc) as i64;
pub const JMP_PC_OFFSET: i64 = offset_of!(Or1kCpu, jmp_pc) as i64;
pub const SR_OFFSET: i64 = offset_of!(Or1kCpu, sr) as i64;
pub const SR_F_OFFSET: i64 = offset_of!(Or1kCpu, sr_f) as i64;
pub const FLAGS_OFFSET: i64 = offset_of!(Or1kCpu, flags) as i64;
pub const FPCSR_OFFSET: i64 = offset_of!(Or1kCpu, fpcsr) as i64;
pub const MACHI_OFFSET: i64 = offset_of!(Or1kCpu, machi) as i64;
pub const MACLO_OFFSET: i64 = offset_of!(Or1kCpu, maclo) as i64;
