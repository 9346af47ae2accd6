//! Execution backend: freezes IR into runnable blocks and runs
//! them. The only backend is a portable interpreter.

pub mod alu;
pub mod interp;
pub mod translate;

pub use interp::TbExit;
pub use translate::TranslateError;

use tcg_core::{Context, GuestMemory, TbCode};

/// Trait for code generators the execution loop can drive.
///
/// Implementations turn the IR of one TB into a [`TbCode`] and
/// execute it against a CPU env.
pub trait CodeGen: Send + Sync {
    fn translate(&self, ctx: &Context) -> Result<TbCode, TranslateError>;

    /// Run `code` until it exits.
    ///
    /// # Safety
    /// `env` must point to the CPU state the globals in `code`
    /// were registered against, exclusively owned by the caller.
    unsafe fn exec_tb(
        &self,
        code: &TbCode,
        env: *mut u8,
        mem: &dyn GuestMemory,
    ) -> TbExit;
}

/// The portable IR interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter;

impl CodeGen for Interpreter {
    fn translate(&self, ctx: &Context) -> Result<TbCode, TranslateError> {
        translate::translate(ctx)
    }

    unsafe fn exec_tb(
        &self,
        code: &TbCode,
        env: *mut u8,
        mem: &dyn GuestMemory,
    ) -> TbExit {
        interp::exec_tb(code, env, mem)
    }
}
