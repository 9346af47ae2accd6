//! Cross-crate tests for the workspace.

#[cfg(test)]
mod asm;
#[cfg(test)]
mod frontend;
#[cfg(test)]
mod ir;

/// Route `tracing` output to the test harness; `RUST_LOG` picks
/// the targets (e.g. `tcg::in_asm=trace`).
#[cfg(test)]
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
