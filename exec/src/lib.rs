//! Execution engine: multi-threaded vCPU coordination, the TB
//! cache and the per-vCPU execution loop.
//!
//! Each vCPU thread owns an [`ExecEnv`] and a guest state
//! implementing [`GuestCpu`]. Threads share one [`Machine`]: the
//! CPU registry with its exclusive-section and work-queue
//! machinery, the TB store and guest memory.

pub mod cpu;
pub mod cpu_list;
pub mod error;
pub mod exclusive;
pub mod exec_loop;
pub mod memory;
pub mod or1k;
pub mod tb_store;
pub mod work;

pub use cpu::{CpuState, UNASSIGNED_CPU_INDEX};
pub use cpu_list::{CpuList, ExitRequestKick, Kick};
pub use error::{CpuListError, ExecError};
pub use exclusive::{ExclusiveSection, ExecEnvelope};
pub use exec_loop::{cpu_exec, ExitReason};
pub use memory::GuestRam;
pub use or1k::Or1kVcpu;
pub use tb_store::TbStore;
pub use work::{QueuedWork, WorkFn, WorkItem};

use std::sync::Arc;

use tcg_backend::{CodeGen, Interpreter};
use tcg_core::tb::JumpCache;
use tcg_core::{Context, GuestMemory, MemFault};
use tcg_frontend::{TbInfo, TbRequest, TranslateConfig};

/// Guest architecture hooks used by the execution loop.
pub trait GuestCpu {
    fn get_pc(&self) -> u64;

    /// CPU flags that select a translation.
    fn get_flags(&self) -> u32;

    /// Translate one TB into `ir`, which has just been reset.
    fn gen_code(
        &mut self,
        ir: &mut Context,
        mem: &dyn GuestMemory,
        req: &TbRequest<'_>,
        cfg: &TranslateConfig,
    ) -> TbInfo;

    /// Raw pointer to the env struct the IR globals address.
    fn env_ptr(&mut self) -> *mut u8;

    /// Rewind to the guest instruction at `pc`; `extra` is the
    /// per-instruction word recorded by `insn_start`.
    fn restore_state(&mut self, pc: u64, extra: u32);

    /// Called when a helper raised exception `index`.
    fn restore_for_exception(&mut self, index: u32, pc: u64, extra: u32) {
        let _ = index;
        self.restore_state(pc, extra);
    }

    /// Record a failed guest access and return the exception it
    /// raises. State has already been rewound.
    fn fault_exception(&mut self, fault: &MemFault) -> u32;
}

/// Tuning of the execution loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecConfig {
    pub translate: TranslateConfig,
    /// TBs executed between checks of the work queue.
    pub work_check_interval: u32,
    pub max_tbs: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            translate: TranslateConfig::default(),
            work_check_interval: 64,
            max_tbs: tb_store::MAX_TBS,
        }
    }
}

/// State shared by every vCPU thread.
pub struct Machine {
    pub cpus: CpuList,
    pub tb_store: TbStore,
    pub mem: Arc<dyn GuestMemory>,
    pub config: ExecConfig,
}

impl Machine {
    pub fn new(mem: Arc<dyn GuestMemory>, config: ExecConfig) -> Arc<Self> {
        Self::with_cpu_list(mem, config, CpuList::new())
    }

    pub fn with_cpu_list(
        mem: Arc<dyn GuestMemory>,
        config: ExecConfig,
        cpus: CpuList,
    ) -> Arc<Self> {
        Arc::new(Self {
            cpus,
            tb_store: TbStore::with_capacity(config.max_tbs),
            mem,
            config,
        })
    }

    /// Flush the TB store from `cpu`'s thread once every vCPU is
    /// out of guest code. Several requests for the same
    /// generation flush only once.
    pub fn queue_tb_flush(self: &Arc<Self>, cpu: &CpuState) {
        let machine = Arc::clone(self);
        let generation = self.tb_store.generation();
        self.cpus.async_safe_run_on_cpu(cpu, move |_| {
            machine.tb_store.flush(generation);
        });
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("cpus", &self.cpus)
            .field("tb_store", &self.tb_store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Per-vCPU execution state.
pub struct ExecEnv<B: CodeGen = Interpreter> {
    pub machine: Arc<Machine>,
    pub cpu: Arc<CpuState>,
    pub jump_cache: JumpCache,
    /// Store generation the jump cache was filled under.
    jc_generation: u64,
    pub backend: B,
    pub ir_ctx: Context,
    breakpoints: Vec<u64>,
    /// Raise a debug exception after every instruction.
    pub singlestep_enabled: bool,
}

impl ExecEnv<Interpreter> {
    pub fn new(machine: Arc<Machine>, cpu: Arc<CpuState>) -> Self {
        Self::with_backend(machine, cpu, Interpreter)
    }
}

impl<B: CodeGen> ExecEnv<B> {
    pub fn with_backend(machine: Arc<Machine>, cpu: Arc<CpuState>, backend: B) -> Self {
        let ir_ctx = Context::with_op_buf_size(machine.config.translate.op_buf_size);
        let jc_generation = machine.tb_store.generation();
        Self {
            machine,
            cpu,
            jump_cache: JumpCache::new(),
            jc_generation,
            backend,
            ir_ctx,
            breakpoints: Vec::new(),
            singlestep_enabled: false,
        }
    }

    pub fn breakpoint_insert(&mut self, pc: u64) {
        if !self.breakpoints.contains(&pc) {
            self.breakpoints.push(pc);
        }
    }

    pub fn breakpoint_remove(&mut self, pc: u64) -> bool {
        let before = self.breakpoints.len();
        self.breakpoints.retain(|&bp| bp != pc);
        self.breakpoints.len() != before
    }

    pub fn breakpoints(&self) -> &[u64] {
        &self.breakpoints
    }

    /// Debug state is baked into translations, so such TBs stay
    /// private to this vCPU and bypass every cache.
    pub fn debug_active(&self) -> bool {
        self.singlestep_enabled || !self.breakpoints.is_empty()
    }

    /// Drop jump-cache entries made stale by a flush.
    fn sync_jump_cache(&mut self) {
        let generation = self.machine.tb_store.generation();
        if generation != self.jc_generation {
            self.jump_cache.invalidate();
            self.jc_generation = generation;
        }
    }
}
