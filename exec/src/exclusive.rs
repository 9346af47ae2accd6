//! Exclusive sections and the vCPU execution envelope.
//!
//! A vCPU brackets every stretch of guest execution with
//! [`CpuList::cpu_exec_start`] and [`CpuList::cpu_exec_end`]. A
//! thread that needs the whole machine quiescent calls
//! [`CpuList::start_exclusive`]: it kicks every running vCPU and
//! waits until each has left its envelope. vCPUs entering an
//! envelope while a section is pending park until it ends.
//!
//! The fast path of the envelope is lock-free. `running` and
//! `pending_cpus` form a Dekker pair: each side stores its own
//! variable, issues a full fence, then loads the other's.

use std::sync::atomic::{fence, Ordering};
use std::sync::MutexGuard;

use crate::cpu::CpuState;
use crate::cpu_list::{CpuList, ListState};

impl CpuList {
    /// Wait until no exclusive section is pending.
    fn exclusive_idle<'a>(&'a self, mut st: MutexGuard<'a, ListState>) -> MutexGuard<'a, ListState> {
        while self.pending_cpus.load(Ordering::SeqCst) != 0 {
            st = self
                .exclusive_resume
                .wait(st)
                .unwrap_or_else(|e| e.into_inner());
        }
        st
    }

    /// Stop every vCPU and return once none is executing guest
    /// code. The caller must not be inside its own envelope.
    pub fn start_exclusive(&self) {
        let mut st = self.lock_state();
        st = self.exclusive_idle(st);

        // Publish the section before sampling `running`.
        self.pending_cpus.store(1, Ordering::SeqCst);
        fence(Ordering::SeqCst);

        let mut kicked = 0usize;
        for cpu in &st.cpus {
            if cpu.running.load(Ordering::SeqCst) {
                cpu.has_waiter.store(true, Ordering::Relaxed);
                self.pending_cpus.fetch_add(1, Ordering::SeqCst);
                self.kick(cpu);
                kicked += 1;
            }
        }
        tracing::trace!(target: "tcg::cpus", kicked, "start_exclusive");

        while self.pending_cpus.load(Ordering::SeqCst) > 1 {
            st = self
                .exclusive_cond
                .wait(st)
                .unwrap_or_else(|e| e.into_inner());
        }
        drop(st);
    }

    /// Leave the exclusive section and release parked vCPUs.
    pub fn end_exclusive(&self) {
        let st = self.lock_state();
        self.pending_cpus.store(0, Ordering::SeqCst);
        self.exclusive_resume.notify_all();
        drop(st);
        tracing::trace!(target: "tcg::cpus", "end_exclusive");
    }

    /// Run `f` inside an exclusive section.
    pub fn run_exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _section = ExclusiveSection::new(self);
        f()
    }

    /// Enter guest execution on `cpu`.
    pub fn cpu_exec_start(&self, cpu: &CpuState) {
        cpu.running.store(true, Ordering::SeqCst);
        fence(Ordering::SeqCst);

        if self.pending_cpus.load(Ordering::SeqCst) != 0 {
            let st = self.lock_state();
            if !cpu.has_waiter.load(Ordering::Relaxed) {
                // The section started before it could see us
                // running; step aside until it is over.
                cpu.running.store(false, Ordering::SeqCst);
                let st = self.exclusive_idle(st);
                cpu.running.store(true, Ordering::SeqCst);
                drop(st);
            }
            // Otherwise we were counted: keep running and let
            // `cpu_exec_end` report back.
        }
    }

    /// Leave guest execution on `cpu`.
    pub fn cpu_exec_end(&self, cpu: &CpuState) {
        cpu.running.store(false, Ordering::SeqCst);
        fence(Ordering::SeqCst);

        if self.pending_cpus.load(Ordering::SeqCst) != 0 {
            let st = self.lock_state();
            if cpu.has_waiter.load(Ordering::Relaxed) {
                cpu.has_waiter.store(false, Ordering::Relaxed);
                let left = self.pending_cpus.fetch_sub(1, Ordering::SeqCst) - 1;
                if left == 1 {
                    self.exclusive_cond.notify_one();
                }
            }
            drop(st);
        }
    }

    /// RAII form of the execution envelope.
    pub fn enter<'a>(&'a self, cpu: &'a CpuState) -> ExecEnvelope<'a> {
        self.cpu_exec_start(cpu);
        ExecEnvelope { list: self, cpu }
    }
}

/// Guest execution on one vCPU; ends on drop.
#[must_use = "the envelope ends as soon as it is dropped"]
pub struct ExecEnvelope<'a> {
    list: &'a CpuList,
    cpu: &'a CpuState,
}

impl Drop for ExecEnvelope<'_> {
    fn drop(&mut self) {
        self.list.cpu_exec_end(self.cpu);
    }
}

/// An exclusive section; ends on drop.
#[must_use = "the section ends as soon as it is dropped"]
pub struct ExclusiveSection<'a> {
    list: &'a CpuList,
}

impl<'a> ExclusiveSection<'a> {
    pub fn new(list: &'a CpuList) -> Self {
        list.start_exclusive();
        Self { list }
    }
}

impl Drop for ExclusiveSection<'_> {
    fn drop(&mut self) {
        self.list.end_exclusive();
    }
}
