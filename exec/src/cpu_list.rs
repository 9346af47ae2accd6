//! Registry of live vCPUs and the process-wide coordination state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::cpu::{lock, CpuState, UNASSIGNED_CPU_INDEX};
use crate::error::CpuListError;

/// How a vCPU is forced out of guest code.
pub trait Kick: Send + Sync {
    fn kick(&self, cpu: &CpuState);
}

/// Default kick: raise the exit request and wake an idle thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExitRequestKick;

impl Kick for ExitRequestKick {
    fn kick(&self, cpu: &CpuState) {
        cpu.request_exit();
    }
}

pub(crate) struct ListState {
    pub(crate) cpus: Vec<Arc<CpuState>>,
    /// Set once any CPU got an index from the registry; from then
    /// on pre-assigned indices are rejected.
    auto_assigned: bool,
}

/// All registered vCPUs plus the exclusive-section and work-queue
/// synchronisation shared between them.
///
/// One mutex guards the registry, `has_waiter` of every CPU and all
/// writes to `pending_cpus`. The counter is also read without the
/// lock on the `cpu_exec_start`/`cpu_exec_end` fast path.
pub struct CpuList {
    state: Mutex<ListState>,
    pub(crate) pending_cpus: AtomicUsize,
    pub(crate) exclusive_cond: Condvar,
    pub(crate) exclusive_resume: Condvar,
    pub(crate) work_lock: Mutex<()>,
    pub(crate) work_cond: Condvar,
    kick: Box<dyn Kick>,
}

impl CpuList {
    pub fn new() -> Self {
        Self::with_kick(Box::new(ExitRequestKick))
    }

    pub fn with_kick(kick: Box<dyn Kick>) -> Self {
        Self {
            state: Mutex::new(ListState {
                cpus: Vec::new(),
                auto_assigned: false,
            }),
            pending_cpus: AtomicUsize::new(0),
            exclusive_cond: Condvar::new(),
            exclusive_resume: Condvar::new(),
            work_lock: Mutex::new(()),
            work_cond: Condvar::new(),
            kick,
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ListState> {
        lock(&self.state)
    }

    pub(crate) fn kick(&self, cpu: &CpuState) {
        self.kick.kick(cpu);
    }

    /// Register `cpu`, assigning an index if it has none.
    ///
    /// # Panics
    ///
    /// On a pre-assigned index after auto-assignment, a duplicate
    /// index or a double registration.
    pub fn cpu_list_add(&self, cpu: &Arc<CpuState>) -> u32 {
        match self.try_cpu_list_add(cpu) {
            Ok(index) => index,
            Err(e) => panic!("cpu_list_add: {e}"),
        }
    }

    pub fn try_cpu_list_add(&self, cpu: &Arc<CpuState>) -> Result<u32, CpuListError> {
        let mut st = self.lock_state();
        if cpu.is_registered() {
            return Err(CpuListError::AlreadyRegistered {
                index: cpu.index().unwrap_or(UNASSIGNED_CPU_INDEX),
            });
        }
        let index = match cpu.index() {
            None => {
                st.auto_assigned = true;
                let index = st.cpus.len() as u32;
                cpu.set_index(index);
                index
            }
            Some(index) => {
                if st.auto_assigned {
                    return Err(CpuListError::IndexAfterAutoAssign { index });
                }
                if st.cpus.iter().any(|c| c.index() == Some(index)) {
                    return Err(CpuListError::DuplicateIndex { index });
                }
                index
            }
        };
        st.cpus.push(Arc::clone(cpu));
        cpu.registered.store(true, Ordering::Release);
        drop(st);

        // A newcomer must not run while an exclusive section is in
        // progress: pass through one empty envelope.
        self.cpu_exec_start(cpu);
        self.cpu_exec_end(cpu);

        tracing::debug!(target: "tcg::cpus", index, "cpu registered");
        Ok(index)
    }

    /// Unregister `cpu` and clear its index. No-op if it is not
    /// registered.
    ///
    /// # Panics
    ///
    /// When indices were auto-assigned and `cpu` is not the most
    /// recently added one.
    pub fn cpu_list_remove(&self, cpu: &CpuState) {
        if let Err(e) = self.try_cpu_list_remove(cpu) {
            panic!("cpu_list_remove: {e}");
        }
    }

    pub fn try_cpu_list_remove(&self, cpu: &CpuState) -> Result<(), CpuListError> {
        let mut st = self.lock_state();
        let Some(pos) = st.cpus.iter().position(|c| std::ptr::eq(c.as_ref(), cpu)) else {
            return Ok(());
        };
        if st.auto_assigned && pos + 1 != st.cpus.len() {
            return Err(CpuListError::RemoveNotTail {
                index: cpu.index().unwrap_or(UNASSIGNED_CPU_INDEX),
            });
        }
        let removed = st.cpus.remove(pos);
        removed.registered.store(false, Ordering::Release);
        let index = removed.index();
        removed.set_index(UNASSIGNED_CPU_INDEX);
        drop(st);
        tracing::debug!(target: "tcg::cpus", ?index, "cpu removed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock_state().cpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the registered CPUs in registration order.
    pub fn cpus(&self) -> Vec<Arc<CpuState>> {
        self.lock_state().cpus.clone()
    }

    pub fn get(&self, index: u32) -> Option<Arc<CpuState>> {
        self.lock_state()
            .cpus
            .iter()
            .find(|c| c.index() == Some(index))
            .cloned()
    }

    /// Number of participants in the current exclusive rendezvous.
    pub fn pending_cpus(&self) -> usize {
        self.pending_cpus.load(Ordering::SeqCst)
    }
}

impl Default for CpuList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CpuList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuList")
            .field("len", &self.len())
            .field("pending_cpus", &self.pending_cpus())
            .finish()
    }
}
