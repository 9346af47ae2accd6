use std::sync::Arc;

use tcg_backend::{CodeGen, TbExit};
use tcg_core::tb::{cflags, TranslationBlock, TB_EXIT_IDX0, TB_EXIT_IDX1, TB_EXIT_REQUESTED};
use tcg_frontend::TbRequest;

use crate::cpu::CpuState;
use crate::error::ExecError;
use crate::{ExecEnv, GuestCpu, Machine};

/// Why `cpu_exec` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Guest exception `index`; CPU state points at the
    /// instruction that raised it.
    Exception(u32),
    /// `CpuState::request_stop` was called.
    Stopped,
}

/// A TB ready to run. `idx` is `None` for private translations
/// that were never published.
struct Found {
    idx: Option<usize>,
    tb: Arc<TranslationBlock>,
}

/// How the previous TB left, for recording chain hints.
#[derive(Clone, Copy)]
enum Link {
    Slot(usize),
    Indirect,
}

enum Step {
    Exit(ExitReason),
    /// Leave the envelope and drain the work queue.
    Drain,
}

/// Main vCPU loop.
///
/// Drains queued work, then executes TBs inside an execution
/// envelope until an exception, an exit request or a stop. Exit
/// requests (kicks) only bounce the vCPU through its work queue;
/// the call returns on guest exceptions and stops.
///
/// # Safety
/// `guest.env_ptr()` must point to a CPU state matching the
/// globals the frontend registers in `env.ir_ctx`, and no other
/// code may access that state while this runs.
pub unsafe fn cpu_exec<B, C>(env: &mut ExecEnv<B>, guest: &mut C) -> Result<ExitReason, ExecError>
where
    B: CodeGen,
    C: GuestCpu,
{
    let machine = Arc::clone(&env.machine);
    let state = Arc::clone(&env.cpu);
    if !state.is_self() {
        state.bind_current_thread();
    }

    loop {
        machine.cpus.process_queued_cpu_work(&state);
        if state.stop_requested() {
            return Ok(ExitReason::Stopped);
        }

        let step = {
            let _envelope = machine.cpus.enter(&state);
            run_tbs(env, &machine, &state, guest)
        };
        match step? {
            Step::Exit(reason) => {
                tracing::debug!(target: "tcg::exec", index = ?state.index(), ?reason, "cpu_exec exit");
                return Ok(reason);
            }
            Step::Drain => {}
        }
    }
}

unsafe fn run_tbs<B, C>(
    env: &mut ExecEnv<B>,
    machine: &Arc<Machine>,
    state: &CpuState,
    guest: &mut C,
) -> Result<Step, ExecError>
where
    B: CodeGen,
    C: GuestCpu,
{
    let mut last: Option<(Found, Link)> = None;
    let mut since_check = 0u32;

    loop {
        if state.take_exit_request() {
            return Ok(Step::Drain);
        }
        since_check += 1;
        if since_check >= machine.config.work_check_interval {
            since_check = 0;
            if !machine.cpus.queue_is_empty(state) {
                return Ok(Step::Drain);
            }
        }

        let pc = guest.get_pc();
        let flags = guest.get_flags();

        let hinted = match &last {
            Some((prev, link)) if !env.debug_active() => follow_hint(machine, prev, *link, pc, flags),
            _ => None,
        };
        let cur = match hinted {
            Some(found) => found,
            None => match tb_find(env, guest, pc, flags) {
                Ok(found) => {
                    if let (Some((prev, link)), Some(idx)) = (&last, found.idx) {
                        record_hint(prev, *link, idx);
                    }
                    found
                }
                Err(ExecError::TbStoreFull(n)) => {
                    tracing::warn!(target: "tcg::exec", tbs = n, "tb store full, flushing");
                    machine.queue_tb_flush(state);
                    return Ok(Step::Drain);
                }
                Err(e) => return Err(e),
            },
        };

        let exit = env.backend.exec_tb(&cur.tb.code, guest.env_ptr(), machine.mem.as_ref());
        match exit {
            TbExit::Exit(code @ (TB_EXIT_IDX0 | TB_EXIT_IDX1)) => {
                last = Some((cur, Link::Slot(code as usize)));
            }
            TbExit::Exit(TB_EXIT_REQUESTED) => return Ok(Step::Drain),
            TbExit::Exit(_) => last = Some((cur, Link::Indirect)),
            TbExit::Exception { index, pc, extra } => {
                guest.restore_for_exception(index, pc, extra);
                return Ok(Step::Exit(ExitReason::Exception(index)));
            }
            TbExit::Fault { fault, pc, extra } => {
                guest.restore_state(pc, extra);
                let index = guest.fault_exception(&fault);
                tracing::trace!(target: "tcg::exec", %fault, pc, index, "guest fault");
                return Ok(Step::Exit(ExitReason::Exception(index)));
            }
        }
    }
}

/// Destination remembered on `prev` for this exit, if it still
/// matches the CPU state.
fn follow_hint(machine: &Machine, prev: &Found, link: Link, pc: u64, flags: u32) -> Option<Found> {
    let idx = match link {
        Link::Slot(slot) => prev.tb.jmp_dest(slot),
        Link::Indirect => prev.tb.exit_target(),
    }?;
    let tb = machine.tb_store.get(idx)?;
    tb.matches(pc, flags).then_some(Found { idx: Some(idx), tb })
}

fn record_hint(prev: &Found, link: Link, dst: usize) {
    match link {
        Link::Slot(slot) => prev.tb.set_jmp_dest(slot, dst),
        Link::Indirect => prev.tb.set_exit_target(dst),
    }
}

/// Find a TB for (pc, flags): jump cache, then the shared hash
/// table, then translation.
fn tb_find<B, C>(env: &mut ExecEnv<B>, guest: &mut C, pc: u64, flags: u32) -> Result<Found, ExecError>
where
    B: CodeGen,
    C: GuestCpu,
{
    if env.debug_active() {
        return tb_gen_code(env, guest, pc, flags);
    }

    env.sync_jump_cache();
    if let Some(idx) = env.jump_cache.lookup(pc) {
        if let Some(tb) = env.machine.tb_store.get(idx) {
            if tb.matches(pc, flags) {
                return Ok(Found { idx: Some(idx), tb });
            }
        }
    }

    if let Some((idx, tb)) = env.machine.tb_store.lookup(pc, flags) {
        env.jump_cache.insert(pc, idx);
        return Ok(Found { idx: Some(idx), tb });
    }

    tb_gen_code(env, guest, pc, flags)
}

/// Translate the TB at `pc` and publish it unless debug state
/// makes it private.
fn tb_gen_code<B, C>(env: &mut ExecEnv<B>, guest: &mut C, pc: u64, flags: u32) -> Result<Found, ExecError>
where
    B: CodeGen,
    C: GuestCpu,
{
    let machine = Arc::clone(&env.machine);
    let cf = if env.singlestep_enabled {
        cflags::CF_SINGLE_STEP
    } else {
        0
    };

    env.ir_ctx.reset();
    let req = TbRequest {
        pc,
        flags,
        max_insns: cf & cflags::CF_COUNT_MASK,
        singlestep_enabled: env.singlestep_enabled,
        breakpoints: &env.breakpoints,
    };
    let info = guest.gen_code(
        &mut env.ir_ctx,
        machine.mem.as_ref(),
        &req,
        &machine.config.translate,
    );
    let code = env.backend.translate(&env.ir_ctx)?;

    let mut tb = TranslationBlock::new(pc, flags, cf);
    tb.size = info.size;
    tb.icount = info.icount as u16;
    tb.code = code;
    tracing::debug!(
        target: "tcg::exec",
        pc = format_args!("{pc:#x}"),
        flags,
        size = info.size,
        icount = info.icount,
        "tb_gen_code"
    );

    if env.debug_active() {
        return Ok(Found {
            idx: None,
            tb: Arc::new(tb),
        });
    }

    let (idx, tb) = machine.tb_store.insert(tb)?;
    env.jump_cache.insert(pc, idx);
    Ok(Found { idx: Some(idx), tb })
}
