use tcg_core::dump::dump_ops;
use tcg_core::{Context, Opcode, TbCode};
use thiserror::Error;

/// Reasons IR cannot be turned into executable code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("label L{0} is branched to but never placed")]
    UnplacedLabel(u32),
    #[error("call to unregistered helper #{0}")]
    UnknownHelper(u32),
    #[error("translation block has no ops")]
    Empty,
}

/// Freeze the IR in `ctx` into a self-contained [`TbCode`].
///
/// Resolves every label to its op position and captures the
/// helper table so the block can run after `ctx` is reset.
pub fn translate(ctx: &Context) -> Result<TbCode, TranslateError> {
    if ctx.num_ops() == 0 {
        return Err(TranslateError::Empty);
    }

    let mut label_pos = Vec::with_capacity(ctx.labels().len());
    for label in ctx.labels() {
        match label.position {
            Some(pos) => label_pos.push(pos),
            None if label.refs > 0 => {
                return Err(TranslateError::UnplacedLabel(label.id))
            }
            // Allocated but unused; never branched to.
            None => label_pos.push(usize::MAX),
        }
    }

    for op in ctx.ops() {
        if op.opc == Opcode::Call && ctx.helper(op.carg(0)).is_none() {
            return Err(TranslateError::UnknownHelper(op.carg(0)));
        }
    }

    if tracing::enabled!(target: "tcg::op", tracing::Level::TRACE) {
        tracing::trace!(target: "tcg::op", "\n{}", dump_ops(ctx));
    }

    Ok(TbCode {
        ops: ctx.ops().to_vec(),
        temps: ctx.temps().to_vec(),
        label_pos,
        helpers: ctx.helpers().iter().map(|h| h.func).collect(),
    })
}
