use std::collections::HashMap;

use crate::label::Label;
use crate::op::{Op, OpIdx};
use crate::temp::{Temp, TempIdx, TempKind};
use crate::types::{Type, TYPE_COUNT};

/// Default capacity of the op buffer for one TB.
pub const DEFAULT_OP_BUF_SIZE: usize = 4096;
/// Upper bound on ops a single guest instruction may emit.
pub const MAX_OPS_PER_INSN: usize = 64;

/// Result of a helper call: the return value, or an exception
/// index that unwinds out of the TB.
pub type HelperResult = Result<u64, u32>;

/// Out-of-line helper called from IR.
///
/// `env` points at the guest CPU state the globals are laid out
/// in. Up to four integer arguments are passed by value.
///
/// # Safety
/// `env` must be valid for the layout the helper was written for.
pub type HelperFn = unsafe fn(env: *mut u8, args: [u64; 4]) -> HelperResult;

/// A registered helper: its name for dumps and the function.
#[derive(Clone, Copy)]
pub struct HelperInfo {
    pub name: &'static str,
    pub func: HelperFn,
}

impl std::fmt::Debug for HelperInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperInfo").field("name", &self.name).finish()
    }
}

/// Per-thread TCG translation context.
///
/// Maps to QEMU's `TCGContext`. Holds all state needed during
/// translation of a single translation block: temporaries, IR ops
/// and labels. Globals and helpers survive `reset`.
pub struct Context {
    temps: Vec<Temp>,
    ops: Vec<Op>,
    labels: Vec<Label>,

    /// Number of global temps (always at the front of `temps`).
    nb_globals: u32,

    helpers: Vec<HelperInfo>,

    /// Per-type map from constant value to TempIdx.
    const_table: [HashMap<u64, TempIdx>; TYPE_COUNT],

    op_buf_size: usize,
}

impl Context {
    pub fn new() -> Self {
        Self::with_op_buf_size(DEFAULT_OP_BUF_SIZE)
    }

    pub fn with_op_buf_size(op_buf_size: usize) -> Self {
        Self {
            temps: Vec::with_capacity(256),
            ops: Vec::with_capacity(op_buf_size.min(DEFAULT_OP_BUF_SIZE)),
            labels: Vec::with_capacity(32),
            nb_globals: 0,
            helpers: Vec::new(),
            const_table: Default::default(),
            op_buf_size,
        }
    }

    /// Reset context for translating a new TB. Globals and the
    /// helper table are kept.
    pub fn reset(&mut self) {
        self.temps.truncate(self.nb_globals as usize);
        self.ops.clear();
        self.labels.clear();
        for table in &mut self.const_table {
            table.clear();
        }
    }

    // -- Temp allocation --

    pub fn nb_globals(&self) -> u32 {
        self.nb_globals
    }

    pub fn nb_temps(&self) -> u32 {
        self.temps.len() as u32
    }

    /// Allocate a new EBB-scoped temporary.
    pub fn new_temp(&mut self, ty: Type) -> TempIdx {
        let idx = TempIdx(self.temps.len() as u32);
        self.temps.push(Temp::new_ebb(idx, ty));
        idx
    }

    /// Allocate a new TB-scoped temporary.
    pub fn new_temp_tb(&mut self, ty: Type) -> TempIdx {
        let idx = TempIdx(self.temps.len() as u32);
        self.temps.push(Temp::new_tb(idx, ty));
        idx
    }

    /// Get or create a constant temp (deduplicated per type).
    pub fn new_const(&mut self, ty: Type, val: u64) -> TempIdx {
        let val = val & ty.mask();
        let type_idx = ty as usize;
        if let Some(&existing) = self.const_table[type_idx].get(&val) {
            return existing;
        }
        let idx = TempIdx(self.temps.len() as u32);
        self.temps.push(Temp::new_const(idx, ty, val));
        self.const_table[type_idx].insert(val, idx);
        idx
    }

    /// Register a global temp backed by `offset` bytes into the
    /// CPU env. Must be called before any non-global allocation.
    pub fn new_global(
        &mut self,
        ty: Type,
        offset: i64,
        name: &'static str,
    ) -> TempIdx {
        assert_eq!(
            self.temps.len() as u32,
            self.nb_globals,
            "globals must be registered before locals"
        );
        let idx = TempIdx(self.temps.len() as u32);
        self.temps.push(Temp::new_global(idx, ty, offset, name));
        self.nb_globals += 1;
        idx
    }

    pub fn temp(&self, idx: TempIdx) -> &Temp {
        &self.temps[idx.0 as usize]
    }

    pub fn temps(&self) -> &[Temp] {
        &self.temps
    }

    /// Iterate over global temps only.
    pub fn globals(&self) -> &[Temp] {
        &self.temps[..self.nb_globals as usize]
    }

    pub fn is_global(&self, idx: TempIdx) -> bool {
        self.temp(idx).kind == TempKind::Global
    }

    // -- Helpers --

    /// Register a helper and return its call index. Registering
    /// the same name twice returns the existing index.
    pub fn register_helper(&mut self, name: &'static str, func: HelperFn) -> u32 {
        if let Some(i) = self.helpers.iter().position(|h| h.name == name) {
            return i as u32;
        }
        self.helpers.push(HelperInfo { name, func });
        (self.helpers.len() - 1) as u32
    }

    pub fn helper(&self, idx: u32) -> Option<&HelperInfo> {
        self.helpers.get(idx as usize)
    }

    pub fn helpers(&self) -> &[HelperInfo] {
        &self.helpers
    }

    // -- Op emission --

    pub fn emit_op(&mut self, op: Op) -> OpIdx {
        let idx = op.idx;
        self.ops.push(op);
        idx
    }

    pub fn next_op_idx(&self) -> OpIdx {
        OpIdx(self.ops.len() as u32)
    }

    pub fn op(&self, idx: OpIdx) -> &Op {
        &self.ops[idx.0 as usize]
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    pub fn op_buf_size(&self) -> usize {
        self.op_buf_size
    }

    /// Whether another guest instruction could overflow the op
    /// buffer. Translators stop the TB when this turns true.
    pub fn op_buf_full(&self) -> bool {
        self.ops.len() + MAX_OPS_PER_INSN >= self.op_buf_size
    }

    // -- Labels --

    pub fn new_label(&mut self) -> u32 {
        let id = self.labels.len() as u32;
        self.labels.push(Label::new(id));
        id
    }

    pub fn label(&self, id: u32) -> &Label {
        &self.labels[id as usize]
    }

    pub fn label_mut(&mut self, id: u32) -> &mut Label {
        &mut self.labels[id as usize]
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
