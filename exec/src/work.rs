//! Cross-thread work submission.
//!
//! Any thread may hand a closure to a vCPU. The vCPU runs queued
//! items in FIFO order the next time it drains its queue, outside
//! its execution envelope. Exclusive ("safe") items additionally
//! run inside an exclusive section.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::cpu::{lock, CpuState};
use crate::cpu_list::CpuList;
use crate::exclusive::ExclusiveSection;

pub type WorkFn = Box<dyn FnOnce(&CpuState) + Send>;

/// One unit of queued work.
pub struct WorkItem {
    func: Mutex<Option<WorkFn>>,
    exclusive: bool,
    done: AtomicBool,
}

impl WorkItem {
    fn new(func: WorkFn, exclusive: bool) -> Self {
        Self {
            func: Mutex::new(Some(func)),
            exclusive,
            done: AtomicBool::new(false),
        }
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    fn run(&self, cpu: &CpuState) {
        let func = lock(&self.func).take();
        if let Some(func) = func {
            func(cpu);
        }
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem")
            .field("exclusive", &self.exclusive)
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}

/// Queue entry: either owned by the queue (fire-and-forget) or
/// shared with a submitter blocked on its completion.
#[derive(Debug)]
pub enum QueuedWork {
    Owned(Box<WorkItem>),
    Borrowed(Arc<WorkItem>),
}

impl QueuedWork {
    fn item(&self) -> &WorkItem {
        match self {
            QueuedWork::Owned(item) => item,
            QueuedWork::Borrowed(item) => item,
        }
    }
}

impl CpuList {
    /// Append `work` to `cpu`'s queue and kick it.
    pub fn queue_work_on_cpu(&self, cpu: &CpuState, work: QueuedWork) {
        cpu.work_queue().push_back(work);
        cpu.notify_work();
        self.kick(cpu);
    }

    /// Run `func` on `cpu` and wait for it to finish.
    ///
    /// Runs inline when called from `cpu`'s own thread. Otherwise
    /// the caller must not hold the registry lock and must not be
    /// inside an execution envelope, or the target may never reach
    /// its drain point.
    pub fn run_on_cpu<F>(&self, cpu: &CpuState, func: F)
    where
        F: FnOnce(&CpuState) + Send + 'static,
    {
        if cpu.is_self() {
            func(cpu);
            return;
        }

        let item = Arc::new(WorkItem::new(Box::new(func), false));
        self.queue_work_on_cpu(cpu, QueuedWork::Borrowed(Arc::clone(&item)));

        let mut guard = lock(&self.work_lock);
        while !item.is_done() {
            guard = self
                .work_cond
                .wait(guard)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Queue `func` on `cpu` without waiting.
    pub fn async_run_on_cpu<F>(&self, cpu: &CpuState, func: F)
    where
        F: FnOnce(&CpuState) + Send + 'static,
    {
        let item = WorkItem::new(Box::new(func), false);
        self.queue_work_on_cpu(cpu, QueuedWork::Owned(Box::new(item)));
    }

    /// Queue `func` on `cpu`; it runs with every other vCPU
    /// quiescent.
    pub fn async_safe_run_on_cpu<F>(&self, cpu: &CpuState, func: F)
    where
        F: FnOnce(&CpuState) + Send + 'static,
    {
        let item = WorkItem::new(Box::new(func), true);
        self.queue_work_on_cpu(cpu, QueuedWork::Owned(Box::new(item)));
    }

    pub fn queue_is_empty(&self, cpu: &CpuState) -> bool {
        cpu.work_queue().is_empty()
    }

    /// Drain and run everything queued on `cpu`. Must be called by
    /// `cpu`'s own thread, outside its execution envelope.
    ///
    /// Items queued while draining wait for the next call.
    pub fn process_queued_cpu_work(&self, cpu: &CpuState) {
        let batch = std::mem::take(&mut *cpu.work_queue());
        if batch.is_empty() {
            return;
        }
        tracing::trace!(
            target: "tcg::cpus",
            index = ?cpu.index(),
            items = batch.len(),
            "draining work queue"
        );

        for work in batch {
            let item = work.item();
            if item.exclusive {
                let _section = ExclusiveSection::new(self);
                item.run(cpu);
            } else {
                item.run(cpu);
            }

            if let QueuedWork::Borrowed(item) = &work {
                let _guard = lock(&self.work_lock);
                item.done.store(true, Ordering::Release);
            }
            self.work_cond.notify_all();
        }
        self.work_cond.notify_all();
    }
}
