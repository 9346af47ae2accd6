use crate::types::Type;

/// Lifetime/scope of a TCG temporary.
///
/// Maps to QEMU's `TCGTempKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TempKind {
    /// Live within a single extended basic block.
    Ebb,
    /// Live across the entire translation block.
    Tb,
    /// Global: persists across TBs, backed by a CPU state field.
    Global,
    /// Compile-time constant.
    Const,
}

/// Index into the Context's temp pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempIdx(pub u32);

/// A TCG temporary variable.
///
/// Maps to QEMU's `TCGTemp`, minus the register allocator state:
/// the interpreter keeps values in a flat frame indexed by
/// `TempIdx`.
#[derive(Debug, Clone)]
pub struct Temp {
    pub idx: TempIdx,
    pub ty: Type,
    pub kind: TempKind,
    /// For `Const` temps, the immediate value.
    pub val: u64,
    /// For `Global` temps, the byte offset into the CPU env.
    pub mem_offset: i64,
    /// Debug name (e.g. "pc", "r9").
    pub name: Option<&'static str>,
}

impl Temp {
    pub fn new_ebb(idx: TempIdx, ty: Type) -> Self {
        Self {
            idx,
            ty,
            kind: TempKind::Ebb,
            val: 0,
            mem_offset: 0,
            name: None,
        }
    }

    pub fn new_tb(idx: TempIdx, ty: Type) -> Self {
        Self {
            kind: TempKind::Tb,
            ..Self::new_ebb(idx, ty)
        }
    }

    pub fn new_const(idx: TempIdx, ty: Type, val: u64) -> Self {
        Self {
            kind: TempKind::Const,
            val: val & ty.mask(),
            ..Self::new_ebb(idx, ty)
        }
    }

    pub fn new_global(
        idx: TempIdx,
        ty: Type,
        offset: i64,
        name: &'static str,
    ) -> Self {
        Self {
            kind: TempKind::Global,
            mem_offset: offset,
            name: Some(name),
            ..Self::new_ebb(idx, ty)
        }
    }

    pub fn is_const(&self) -> bool {
        self.kind == TempKind::Const
    }

    pub fn is_global(&self) -> bool {
        self.kind == TempKind::Global
    }
}
