use std::sync::atomic::{AtomicUsize, Ordering};

use crate::context::HelperFn;
use crate::op::Op;
use crate::temp::Temp;

/// Hard upper bound on guest instructions in one TB.
pub const TCG_MAX_INSNS: u32 = 512;

/// Exit codes returned by `exit_tb`.
///
/// `IDX0`/`IDX1` follow a `goto_tb` on that slot and may be
/// chained; `NOCHAIN` requires a fresh lookup; `REQUESTED` means
/// the TB was left because an exit was requested.
pub const TB_EXIT_IDX0: u32 = 0;
pub const TB_EXIT_IDX1: u32 = 1;
pub const TB_EXIT_NOCHAIN: u32 = 2;
pub const TB_EXIT_REQUESTED: u32 = 3;

/// Sentinel for "no TB" in the atomic chain slots.
const NO_TB: usize = usize::MAX;

/// Compile flags for TranslationBlock.cflags.
pub mod cflags {
    /// Mask for the instruction count limit (0 = no limit).
    pub const CF_COUNT_MASK: u32 = 0x0000_FFFF;
    /// TB is being single-stepped.
    pub const CF_SINGLE_STEP: u32 = 0x0002_0000;
}

/// Executable form of a TB: the IR snapshot plus everything the
/// interpreter needs to run it without the translation context.
#[derive(Debug, Clone, Default)]
pub struct TbCode {
    pub ops: Vec<Op>,
    pub temps: Vec<Temp>,
    /// Op index of each label, indexed by label id.
    pub label_pos: Vec<usize>,
    pub helpers: Vec<HelperFn>,
}

/// A cached translated code block.
///
/// Maps to QEMU's `TranslationBlock`. Immutable once published
/// except for the chaining hints, which are plain atomics.
#[derive(Debug)]
pub struct TranslationBlock {
    /// Guest virtual PC where this TB starts.
    pub pc: u64,
    /// CPU state flags that affect translation (privilege level,
    /// pending delay slot).
    pub flags: u32,
    pub cflags: u32,
    /// Size of guest code covered by this TB, in bytes.
    pub size: u32,
    /// Number of guest instructions in this TB.
    pub icount: u16,

    pub code: TbCode,

    /// Index of the next TB in the same hash bucket, or `None`.
    pub hash_next: Option<usize>,

    /// Destination TB for each `goto_tb` slot once chained.
    jmp_dest: [AtomicUsize; 2],
    /// Last destination seen through a `NOCHAIN` exit.
    exit_target: AtomicUsize,
}

impl TranslationBlock {
    pub fn new(pc: u64, flags: u32, cflags: u32) -> Self {
        Self {
            pc,
            flags,
            cflags,
            size: 0,
            icount: 0,
            code: TbCode::default(),
            hash_next: None,
            jmp_dest: [AtomicUsize::new(NO_TB), AtomicUsize::new(NO_TB)],
            exit_target: AtomicUsize::new(NO_TB),
        }
    }

    /// Compute hash bucket index for TB lookup.
    pub fn hash(pc: u64, flags: u32) -> usize {
        let h = pc.wrapping_mul(0x9e3779b97f4a7c15) ^ (flags as u64);
        (h as usize) & (TB_HASH_SIZE - 1)
    }

    /// Maximum number of guest instructions per TB.
    pub fn max_insns(cflags: u32) -> u32 {
        let count = cflags & cflags::CF_COUNT_MASK;
        if count == 0 || count > TCG_MAX_INSNS {
            TCG_MAX_INSNS
        } else {
            count
        }
    }

    pub fn matches(&self, pc: u64, flags: u32) -> bool {
        self.pc == pc && self.flags == flags
    }

    pub fn jmp_dest(&self, slot: usize) -> Option<usize> {
        decode_slot(self.jmp_dest[slot].load(Ordering::Acquire))
    }

    pub fn set_jmp_dest(&self, slot: usize, dst: usize) {
        self.jmp_dest[slot].store(dst, Ordering::Release);
    }

    pub fn exit_target(&self) -> Option<usize> {
        decode_slot(self.exit_target.load(Ordering::Acquire))
    }

    pub fn set_exit_target(&self, dst: usize) {
        self.exit_target.store(dst, Ordering::Release);
    }
}

fn decode_slot(v: usize) -> Option<usize> {
    (v != NO_TB).then_some(v)
}

/// Number of buckets in the global TB hash table.
pub const TB_HASH_SIZE: usize = 1 << 15; // 32768

/// Number of entries in the per-CPU jump cache.
pub const TB_JMP_CACHE_SIZE: usize = 1 << 12; // 4096

/// Per-CPU direct-mapped TB jump cache.
///
/// Indexed by `(pc >> 2) & (TB_JMP_CACHE_SIZE - 1)`. Entries are
/// TB indices into the shared store and are dropped wholesale on
/// a flush.
pub struct JumpCache {
    entries: Box<[Option<usize>; TB_JMP_CACHE_SIZE]>,
}

impl JumpCache {
    pub fn new() -> Self {
        Self {
            entries: Box::new([None; TB_JMP_CACHE_SIZE]),
        }
    }

    fn index(pc: u64) -> usize {
        (pc as usize >> 2) & (TB_JMP_CACHE_SIZE - 1)
    }

    pub fn lookup(&self, pc: u64) -> Option<usize> {
        self.entries[Self::index(pc)]
    }

    pub fn insert(&mut self, pc: u64, tb_idx: usize) {
        self.entries[Self::index(pc)] = Some(tb_idx);
    }

    pub fn invalidate(&mut self) {
        self.entries.fill(None);
    }
}

impl Default for JumpCache {
    fn default() -> Self {
        Self::new()
    }
}
