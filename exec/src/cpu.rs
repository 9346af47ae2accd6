//! Per-vCPU coordination handle.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use crate::work::QueuedWork;

/// Index of a CPU that is not in the registry.
pub const UNASSIGNED_CPU_INDEX: u32 = u32::MAX;

/// Coordination state of one virtual CPU.
///
/// The guest architectural state lives elsewhere (see
/// [`GuestCpu`](crate::GuestCpu)); this handle only carries what
/// other threads need to reach the vCPU: its index, the execution
/// envelope flags, its work queue and the kick condition.
#[derive(Debug)]
pub struct CpuState {
    index: AtomicU32,
    pub(crate) registered: AtomicBool,
    /// Inside `cpu_exec_start` .. `cpu_exec_end`.
    pub(crate) running: AtomicBool,
    /// Counted in the pending rendezvous of an exclusive section.
    /// Only touched under the registry lock.
    pub(crate) has_waiter: AtomicBool,
    exit_request: AtomicBool,
    stop: AtomicBool,
    pub(crate) work: Mutex<VecDeque<QueuedWork>>,
    kick_cond: Condvar,
    thread: Mutex<Option<ThreadId>>,
}

impl CpuState {
    /// A handle whose index is assigned on registration.
    pub fn new() -> Self {
        Self::with_index(UNASSIGNED_CPU_INDEX)
    }

    /// A handle with a caller-chosen index.
    pub fn with_index(index: u32) -> Self {
        Self {
            index: AtomicU32::new(index),
            registered: AtomicBool::new(false),
            running: AtomicBool::new(false),
            has_waiter: AtomicBool::new(false),
            exit_request: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            work: Mutex::new(VecDeque::new()),
            kick_cond: Condvar::new(),
            thread: Mutex::new(None),
        }
    }

    /// Stable index while registered.
    pub fn index(&self) -> Option<u32> {
        match self.index.load(Ordering::Acquire) {
            UNASSIGNED_CPU_INDEX => None,
            i => Some(i),
        }
    }

    pub(crate) fn set_index(&self, index: u32) {
        self.index.store(index, Ordering::Release);
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // -- Thread ownership ----------------------------------

    /// Make the calling thread the one that drives this vCPU.
    pub fn bind_current_thread(&self) {
        *lock(&self.thread) = Some(thread::current().id());
    }

    /// Whether the calling thread drives this vCPU.
    pub fn is_self(&self) -> bool {
        *lock(&self.thread) == Some(thread::current().id())
    }

    // -- Exit requests -------------------------------------

    /// Ask the vCPU to leave guest code at the next TB boundary
    /// and wake it if it is idle.
    pub fn request_exit(&self) {
        self.exit_request.store(true, Ordering::SeqCst);
        // Taking the queue lock orders the store against a waiter
        // that has checked the flag but not yet slept.
        drop(self.work_queue());
        self.kick_cond.notify_all();
    }

    /// Consume a pending exit request.
    pub fn take_exit_request(&self) -> bool {
        self.exit_request.swap(false, Ordering::SeqCst)
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_request.load(Ordering::SeqCst)
    }

    /// Ask the vCPU thread to leave `cpu_exec` for good.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.request_exit();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    // -- Idle wait -----------------------------------------

    /// Block until work is queued, an exit is requested or a stop
    /// is requested.
    pub fn wait_for_work(&self) {
        let mut queue = self.work_queue();
        while queue.is_empty() && !self.exit_requested() && !self.stop_requested() {
            queue = self
                .kick_cond
                .wait(queue)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    pub(crate) fn work_queue(&self) -> MutexGuard<'_, VecDeque<QueuedWork>> {
        lock(&self.work)
    }

    pub(crate) fn notify_work(&self) {
        self.kick_cond.notify_all();
    }
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock a mutex, ignoring poisoning: the protected state is
/// plain data that stays consistent across a panicking holder.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
