//! OpenRISC glue for the execution loop.

use tcg_core::{Context, GuestMemory, MemFault};
use tcg_frontend::openrisc::cpu::{Or1kCfg, Or1kCpu, EXCP_ALIGN, EXCP_BUSERR, EXCP_DEBUG};
use tcg_frontend::openrisc::gen_intermediate_code;
use tcg_frontend::{TbInfo, TbRequest, TranslateConfig};

use crate::GuestCpu;

/// One OpenRISC vCPU's architectural state.
#[derive(Debug, Clone, Default)]
pub struct Or1kVcpu {
    pub env: Or1kCpu,
}

impl Or1kVcpu {
    pub fn new(cfg: Or1kCfg) -> Self {
        Self {
            env: Or1kCpu::new(cfg),
        }
    }

    /// Start executing at `pc` in supervisor mode with no branch
    /// pending.
    pub fn reset_to(&mut self, pc: u32) {
        self.env.pc = pc;
        self.env.npc = pc.wrapping_add(4);
        self.env.restore_state(pc, 0);
    }
}

impl GuestCpu for Or1kVcpu {
    fn get_pc(&self) -> u64 {
        u64::from(self.env.pc)
    }

    fn get_flags(&self) -> u32 {
        self.env.tb_flags()
    }

    fn gen_code(
        &mut self,
        ir: &mut Context,
        mem: &dyn GuestMemory,
        req: &TbRequest<'_>,
        cfg: &TranslateConfig,
    ) -> TbInfo {
        gen_intermediate_code(ir, mem, req, cfg)
    }

    fn env_ptr(&mut self) -> *mut u8 {
        self.env.env_ptr()
    }

    fn restore_state(&mut self, pc: u64, extra: u32) {
        self.env.restore_state(pc as u32, extra);
    }

    fn restore_for_exception(&mut self, index: u32, pc: u64, extra: u32) {
        // Debug exceptions are raised after the TB has written the
        // resume pc and flags itself.
        if index != EXCP_DEBUG {
            self.restore_state(pc, extra);
        }
        self.env.exception_index = index;
    }

    fn fault_exception(&mut self, fault: &MemFault) -> u32 {
        let (addr, index) = match *fault {
            MemFault::Unmapped { addr } => (addr, EXCP_BUSERR),
            MemFault::Misaligned { addr, .. } => (addr, EXCP_ALIGN),
        };
        self.env.eear = addr as u32;
        self.env.exception_index = index;
        index
    }
}
