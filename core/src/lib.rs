pub mod context;
pub mod dump;
pub mod ir_builder;
pub mod label;
pub mod memory;
pub mod op;
pub mod opcode;
pub mod tb;
pub mod temp;
pub mod types;

pub use context::{
    Context, HelperFn, HelperInfo, HelperResult, DEFAULT_OP_BUF_SIZE,
    MAX_OPS_PER_INSN,
};
pub use label::Label;
pub use memory::{GuestMemory, MemFault};
pub use op::{Op, OpIdx, MAX_OP_ARGS};
pub use opcode::{OpDef, OpFlags, Opcode, OPCODE_DEFS};
pub use tb::{
    JumpCache, TbCode, TranslationBlock, TB_EXIT_IDX0, TB_EXIT_IDX1,
    TB_EXIT_NOCHAIN, TB_EXIT_REQUESTED, TB_HASH_SIZE, TB_JMP_CACHE_SIZE,
    TCG_MAX_INSNS,
};
pub use temp::{Temp, TempIdx, TempKind};
pub use types::{Cond, MemOp, Type};
