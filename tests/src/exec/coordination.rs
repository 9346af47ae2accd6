//! CPU registry, work queues and exclusive sections, driven by
//! plain threads standing in for vCPUs.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use proptest::prelude::*;
use tcg_exec::{CpuList, CpuListError, CpuState, Kick};

fn new_cpu() -> Arc<CpuState> {
    Arc::new(CpuState::new())
}

/// Idle vCPU: drain work, sleep until kicked.
fn spawn_idle(list: &Arc<CpuList>, cpu: &Arc<CpuState>) -> JoinHandle<()> {
    let (list, cpu) = (Arc::clone(list), Arc::clone(cpu));
    thread::spawn(move || {
        cpu.bind_current_thread();
        loop {
            list.process_queued_cpu_work(&cpu);
            if cpu.stop_requested() {
                return;
            }
            cpu.wait_for_work();
            cpu.take_exit_request();
        }
    })
}

/// Counters shared by spinning vCPUs.
#[derive(Default)]
struct Guest {
    /// Threads currently inside an execution envelope.
    inside: AtomicUsize,
    /// Bumped on every spin; stands in for guest progress.
    ticks: AtomicU64,
}

/// Busy vCPU: spin inside the envelope until kicked.
fn spawn_spinner(list: &Arc<CpuList>, cpu: &Arc<CpuState>, guest: &Arc<Guest>) -> JoinHandle<()> {
    let (list, cpu, guest) = (Arc::clone(list), Arc::clone(cpu), Arc::clone(guest));
    thread::spawn(move || {
        cpu.bind_current_thread();
        loop {
            list.process_queued_cpu_work(&cpu);
            if cpu.stop_requested() {
                return;
            }
            let _envelope = list.enter(&cpu);
            guest.inside.fetch_add(1, Ordering::SeqCst);
            while !cpu.take_exit_request() {
                guest.ticks.fetch_add(1, Ordering::Relaxed);
                std::hint::spin_loop();
            }
            guest.inside.fetch_sub(1, Ordering::SeqCst);
        }
    })
}

fn stop_all(cpus: &[Arc<CpuState>], workers: Vec<JoinHandle<()>>) {
    for cpu in cpus {
        cpu.request_stop();
    }
    for w in workers {
        w.join().unwrap();
    }
}

struct CountingKick(Arc<AtomicUsize>);

impl Kick for CountingKick {
    fn kick(&self, cpu: &CpuState) {
        self.0.fetch_add(1, Ordering::SeqCst);
        cpu.request_exit();
    }
}

// -- Registry ----------------------------------------------

#[test]
fn indices_follow_registration_order() {
    let list = CpuList::new();
    let cpus: Vec<_> = (0..3).map(|_| new_cpu()).collect();
    for (i, cpu) in cpus.iter().enumerate() {
        assert_eq!(list.cpu_list_add(cpu), i as u32);
        assert!(cpu.is_registered());
    }

    list.cpu_list_remove(&cpus[2]);
    assert!(!cpus[2].is_registered());
    assert_eq!(cpus[2].index(), None);
    assert!(list.get(2).is_none());

    let again = new_cpu();
    assert_eq!(list.cpu_list_add(&again), 2);
    assert!(Arc::ptr_eq(&list.get(2).unwrap(), &again));
}

#[test]
#[should_panic(expected = "not the most recently added")]
fn removing_non_tail_cpu_panics() {
    let list = CpuList::new();
    let a = new_cpu();
    let b = new_cpu();
    list.cpu_list_add(&a);
    list.cpu_list_add(&b);
    list.cpu_list_remove(&a);
}

#[test]
fn preassigned_indices_are_kept() {
    let list = CpuList::new();
    let a = Arc::new(CpuState::with_index(7));
    let b = Arc::new(CpuState::with_index(3));
    assert_eq!(list.cpu_list_add(&a), 7);
    assert_eq!(list.cpu_list_add(&b), 3);

    // Any order of removal is fine without auto-assignment.
    list.cpu_list_remove(&a);
    assert_eq!(list.len(), 1);
    assert_eq!(list.get(3).map(|c| c.index()), Some(Some(3)));

    let dup = Arc::new(CpuState::with_index(3));
    assert_eq!(
        list.try_cpu_list_add(&dup),
        Err(CpuListError::DuplicateIndex { index: 3 })
    );
    assert_eq!(
        list.try_cpu_list_add(&b),
        Err(CpuListError::AlreadyRegistered { index: 3 })
    );
}

proptest! {
    #[test]
    fn auto_indices_track_list_length(ops in proptest::collection::vec(any::<bool>(), 1..60)) {
        let list = CpuList::new();
        let mut live: Vec<Arc<CpuState>> = Vec::new();
        for add in ops {
            if add || live.is_empty() {
                let cpu = new_cpu();
                prop_assert_eq!(list.cpu_list_add(&cpu), live.len() as u32);
                live.push(cpu);
            } else if let Some(tail) = live.pop() {
                list.cpu_list_remove(&tail);
                prop_assert_eq!(tail.index(), None);
            }
            prop_assert_eq!(list.len(), live.len());
        }
        for (i, cpu) in live.iter().enumerate() {
            prop_assert_eq!(cpu.index(), Some(i as u32));
        }
    }
}

// -- Work queue --------------------------------------------

#[test]
fn run_on_self_is_inline() {
    let list = CpuList::new();
    let cpu = new_cpu();
    list.cpu_list_add(&cpu);
    cpu.bind_current_thread();

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    list.run_on_cpu(&cpu, move |_| flag.store(true, Ordering::SeqCst));
    assert!(ran.load(Ordering::SeqCst));
    assert!(list.queue_is_empty(&cpu));
}

#[test]
fn run_on_cpu_executes_on_target_thread() {
    crate::init_tracing();
    let list = Arc::new(CpuList::new());
    let cpu = new_cpu();
    list.cpu_list_add(&cpu);
    let worker = spawn_idle(&list, &cpu);

    let seen = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&seen);
    list.run_on_cpu(&cpu, move |c| {
        *slot.lock().unwrap() = Some((thread::current().id(), c.index()));
    });
    let (tid, index) = seen.lock().unwrap().take().unwrap();
    assert_eq!(tid, worker.thread().id());
    assert_eq!(index, Some(0));

    stop_all(&[cpu], vec![worker]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn queued_work_runs_in_order(n in 1usize..40) {
        let list = Arc::new(CpuList::new());
        let cpu = new_cpu();
        list.cpu_list_add(&cpu);
        let worker = spawn_idle(&list, &cpu);

        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..n {
            let log = Arc::clone(&log);
            list.async_run_on_cpu(&cpu, move |_| log.lock().unwrap().push(i));
        }
        // A blocking item queued last returns only after all of
        // the earlier ones ran.
        let tail = Arc::clone(&log);
        list.run_on_cpu(&cpu, move |_| tail.lock().unwrap().push(n));

        let got = log.lock().unwrap().clone();
        stop_all(&[cpu], vec![worker]);
        prop_assert_eq!(got, (0..=n).collect::<Vec<_>>());
    }
}

#[test]
fn safe_work_sees_other_cpus_quiescent() {
    const SPINNERS: usize = 3;
    let list = Arc::new(CpuList::new());
    let guest = Arc::new(Guest::default());

    let cpus: Vec<_> = (0..=SPINNERS).map(|_| new_cpu()).collect();
    for cpu in &cpus {
        list.cpu_list_add(cpu);
    }
    let mut workers: Vec<_> = cpus[1..]
        .iter()
        .map(|cpu| spawn_spinner(&list, cpu, &guest))
        .collect();
    workers.push(spawn_idle(&list, &cpus[0]));

    let observed = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..10 {
        let (g, obs) = (Arc::clone(&guest), Arc::clone(&observed));
        list.async_safe_run_on_cpu(&cpus[0], move |_| {
            obs.lock().unwrap().push(g.inside.load(Ordering::SeqCst));
        });
    }
    // Blocking no-op: everything queued before it has run.
    list.run_on_cpu(&cpus[0], |_| {});

    stop_all(&cpus, workers);
    assert_eq!(*observed.lock().unwrap(), vec![0; 10]);
    assert_eq!(list.pending_cpus(), 0);
}

// -- Exclusive sections ------------------------------------

#[test]
fn exclusive_kicks_each_running_cpu_once() {
    const SPINNERS: usize = 4;
    let kicks = Arc::new(AtomicUsize::new(0));
    let list = Arc::new(CpuList::with_kick(Box::new(CountingKick(Arc::clone(&kicks)))));
    let guest = Arc::new(Guest::default());

    let cpus: Vec<_> = (0..SPINNERS).map(|_| new_cpu()).collect();
    for cpu in &cpus {
        list.cpu_list_add(cpu);
    }
    let workers: Vec<_> = cpus
        .iter()
        .map(|cpu| spawn_spinner(&list, cpu, &guest))
        .collect();
    while guest.inside.load(Ordering::SeqCst) < SPINNERS {
        thread::yield_now();
    }

    list.run_exclusive(|| {
        assert_eq!(guest.inside.load(Ordering::SeqCst), 0);
        let before = guest.ticks.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(guest.ticks.load(Ordering::Relaxed), before);
        assert_eq!(list.pending_cpus(), 1);
    });
    assert_eq!(kicks.load(Ordering::SeqCst), SPINNERS);
    assert_eq!(list.pending_cpus(), 0);

    // Guest code resumes once the section ends.
    let resumed = guest.ticks.load(Ordering::Relaxed);
    while guest.ticks.load(Ordering::Relaxed) == resumed {
        thread::yield_now();
    }

    stop_all(&cpus, workers);
}

#[test]
fn exclusive_without_running_cpus_kicks_nobody() {
    let kicks = Arc::new(AtomicUsize::new(0));
    let list = CpuList::with_kick(Box::new(CountingKick(Arc::clone(&kicks))));
    let cpu = new_cpu();
    list.cpu_list_add(&cpu);

    let v = list.run_exclusive(|| 42);
    assert_eq!(v, 42);
    assert_eq!(kicks.load(Ordering::SeqCst), 0);
    assert!(!cpu.exit_requested());
}

#[test]
fn at_most_one_exclusive_section() {
    const SPINNERS: usize = 3;
    const REQUESTERS: usize = 4;
    const ROUNDS: usize = 50;

    let list = Arc::new(CpuList::new());
    let guest = Arc::new(Guest::default());
    let cpus: Vec<_> = (0..SPINNERS).map(|_| new_cpu()).collect();
    for cpu in &cpus {
        list.cpu_list_add(cpu);
    }
    let workers: Vec<_> = cpus
        .iter()
        .map(|cpu| spawn_spinner(&list, cpu, &guest))
        .collect();

    let holders = Arc::new(AtomicUsize::new(0));
    let sections = Arc::new(AtomicUsize::new(0));
    let requesters: Vec<_> = (0..REQUESTERS)
        .map(|_| {
            let (list, guest) = (Arc::clone(&list), Arc::clone(&guest));
            let (holders, sections) = (Arc::clone(&holders), Arc::clone(&sections));
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    list.run_exclusive(|| {
                        assert_eq!(holders.fetch_add(1, Ordering::SeqCst), 0);
                        assert_eq!(guest.inside.load(Ordering::SeqCst), 0);
                        thread::yield_now();
                        holders.fetch_sub(1, Ordering::SeqCst);
                    });
                    sections.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for r in requesters {
        r.join().unwrap();
    }
    stop_all(&cpus, workers);
    assert_eq!(sections.load(Ordering::SeqCst), REQUESTERS * ROUNDS);
    assert_eq!(list.pending_cpus(), 0);
}
