use crate::opcode::Opcode;
use crate::temp::TempIdx;
use crate::types::Type;

/// Maximum number of arguments per IR operation.
pub const MAX_OP_ARGS: usize = 8;

/// Index into the Context's op list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpIdx(pub u32);

/// A single TCG IR operation.
///
/// Maps to QEMU's `TCGOp`. Arguments are laid out as outputs,
/// then inputs, then constants; constants are stored raw in the
/// `TempIdx` slot.
#[derive(Debug, Clone)]
pub struct Op {
    pub idx: OpIdx,
    pub opc: Opcode,
    /// Operand type for type-polymorphic ops (I32 or I64).
    pub op_type: Type,
    pub args: [TempIdx; MAX_OP_ARGS],
    pub nargs: u8,
}

impl Op {
    pub fn with_args(
        idx: OpIdx,
        opc: Opcode,
        op_type: Type,
        args: &[TempIdx],
    ) -> Self {
        debug_assert_eq!(
            args.len(),
            opc.def().nb_args() as usize,
            "wrong argument count for {}",
            opc.def().name
        );
        let mut a = [TempIdx(0); MAX_OP_ARGS];
        let n = args.len().min(MAX_OP_ARGS);
        a[..n].copy_from_slice(&args[..n]);
        Self {
            idx,
            opc,
            op_type,
            args: a,
            nargs: n as u8,
        }
    }

    pub fn oargs(&self) -> &[TempIdx] {
        let n = self.opc.def().nb_oargs as usize;
        &self.args[..n]
    }

    pub fn iargs(&self) -> &[TempIdx] {
        let def = self.opc.def();
        let start = def.nb_oargs as usize;
        &self.args[start..start + def.nb_iargs as usize]
    }

    pub fn cargs(&self) -> &[TempIdx] {
        let def = self.opc.def();
        let start = (def.nb_oargs + def.nb_iargs) as usize;
        &self.args[start..start + def.nb_cargs as usize]
    }

    /// Raw value of constant argument `n`.
    pub fn carg(&self, n: usize) -> u32 {
        self.cargs()[n].0
    }
}
