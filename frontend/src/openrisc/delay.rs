//! Delayed-branch bookkeeping for the translator.

use super::cpu::TB_FLAGS_DELAY_MASK;

/// Instructions executed after a branch before control transfers.
pub const BRANCH_DELAY_SLOTS: u32 = 2;

/// Where a pending branch goes once its delay window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTarget {
    /// Known at translation time (`l.j`, `l.jal`).
    Static(u32),
    /// Held in `jmp_pc` (register jumps, conditional branches, or a
    /// window inherited from a previous TB).
    Dynamic,
}

/// Delay-slot state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelaySlot {
    NotBranching,
    Armed { countdown: u32, target: BranchTarget },
}

impl DelaySlot {
    /// State at TB entry. A non-zero countdown in the TB flags
    /// means a branch from an earlier TB is still pending; its
    /// target lives in `jmp_pc`.
    pub fn from_tb_flags(flags: u32) -> Self {
        match flags & TB_FLAGS_DELAY_MASK {
            0 => DelaySlot::NotBranching,
            countdown => DelaySlot::Armed {
                countdown,
                target: BranchTarget::Dynamic,
            },
        }
    }

    pub fn arm(target: BranchTarget) -> Self {
        DelaySlot::Armed {
            countdown: BRANCH_DELAY_SLOTS,
            target,
        }
    }

    /// Remaining slots, 0 when idle.
    pub fn countdown(&self) -> u32 {
        match *self {
            DelaySlot::NotBranching => 0,
            DelaySlot::Armed { countdown, .. } => countdown,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, DelaySlot::Armed { .. })
    }

    /// Account for one delay-slot instruction. Returns the target
    /// when the window closes.
    pub fn step(&mut self) -> Option<BranchTarget> {
        match *self {
            DelaySlot::NotBranching => None,
            DelaySlot::Armed { countdown, target } if countdown <= 1 => {
                *self = DelaySlot::NotBranching;
                Some(target)
            }
            DelaySlot::Armed { countdown, target } => {
                *self = DelaySlot::Armed {
                    countdown: countdown - 1,
                    target,
                };
                None
            }
        }
    }
}
