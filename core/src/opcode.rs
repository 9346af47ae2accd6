use crate::types::Type;

/// TCG IR opcodes, type-polymorphic over I32/I64 for integer ops.
///
/// Maps to QEMU's `TCGOpcode`. Only the scalar subset needed by a
/// 32-bit RISC guest is present; the actual width of an integer op
/// is carried in `Op::op_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // -- Data movement --
    Mov = 0,
    SetCond,
    MovCond,

    // -- Arithmetic --
    Add,
    Sub,
    Mul,
    Neg,
    DivS,
    DivU,
    RemS,
    RemU,
    MulS2, // signed multiply -> (lo, hi)
    MulU2, // unsigned multiply -> (lo, hi)

    // -- Logic --
    And,
    Or,
    Xor,
    Not,
    AndC, // a & ~b

    // -- Shift/rotate --
    Shl,
    Shr,
    Sar,
    RotL,
    RotR,

    // -- Bit field --
    Extract,
    SExtract,
    Deposit,

    // -- Bit counting --
    Clz, // count leading zeros, second input is the zero result
    Ctz,

    // -- Type conversion --
    ExtI32I64,
    ExtUI32I64,
    ExtrlI64I32,
    ExtrhI64I32,

    // -- Guest memory access --
    QemuLd,
    QemuSt,

    // -- Control flow --
    Br,
    BrCond,
    SetLabel,
    GotoTb,
    ExitTb,
    Mb,

    // -- Call --
    Call,

    // -- Misc --
    Nop,
    Discard,
    InsnStart,

    // Sentinel, must be last
    Count,
}

/// Flags describing properties of an opcode.
///
/// Maps to QEMU's `TCG_OPF_*` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpFlags(u16);

impl OpFlags {
    pub const NONE: OpFlags = OpFlags(0);
    /// Exits the translation block.
    pub const BB_EXIT: OpFlags = OpFlags(0x01);
    /// Ends a basic block.
    pub const BB_END: OpFlags = OpFlags(0x02);
    /// Calls out of generated code.
    pub const CALL_CLOBBER: OpFlags = OpFlags(0x04);
    /// Has side effects and must not be eliminated.
    pub const SIDE_EFFECTS: OpFlags = OpFlags(0x08);
    /// Operands may be I32 or I64.
    pub const INT: OpFlags = OpFlags(0x10);
    /// Conditional branch.
    pub const COND_BRANCH: OpFlags = OpFlags(0x20);

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: OpFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: OpFlags) -> Self {
        Self(self.0 | other.0)
    }
}

/// Static definition of an opcode: argument counts and flags.
///
/// Maps to QEMU's `TCGOpDef`.
#[derive(Debug, Clone, Copy)]
pub struct OpDef {
    pub name: &'static str,
    pub nb_oargs: u8,
    pub nb_iargs: u8,
    pub nb_cargs: u8,
    pub flags: OpFlags,
}

impl OpDef {
    pub const fn nb_args(&self) -> u8 {
        self.nb_oargs + self.nb_iargs + self.nb_cargs
    }
}

const fn def(
    name: &'static str,
    nb_oargs: u8,
    nb_iargs: u8,
    nb_cargs: u8,
    flags: OpFlags,
) -> OpDef {
    OpDef {
        name,
        nb_oargs,
        nb_iargs,
        nb_cargs,
        flags,
    }
}

const INT: OpFlags = OpFlags::INT;
const SE: OpFlags = OpFlags::SIDE_EFFECTS;
const BE: OpFlags = OpFlags::BB_END;
const BX: OpFlags = OpFlags::BB_EXIT;
const N: OpFlags = OpFlags::NONE;
const BRANCH: OpFlags = OpFlags(BE.0 | SE.0);
const EXIT: OpFlags = OpFlags(BX.0 | BE.0 | SE.0);
const CBRANCH: OpFlags = OpFlags(BRANCH.0 | OpFlags::COND_BRANCH.0 | INT.0);
const CALL: OpFlags = OpFlags(OpFlags::CALL_CLOBBER.0 | SE.0);
const MEM: OpFlags = OpFlags(SE.0 | INT.0);

/// Static opcode definition table, indexed by `Opcode as usize`.
pub static OPCODE_DEFS: [OpDef; Opcode::Count as usize] = [
    def("mov", 1, 1, 0, INT),
    def("setcond", 1, 2, 1, INT),
    def("movcond", 1, 4, 1, INT),
    def("add", 1, 2, 0, INT),
    def("sub", 1, 2, 0, INT),
    def("mul", 1, 2, 0, INT),
    def("neg", 1, 1, 0, INT),
    def("div", 1, 2, 0, INT),
    def("divu", 1, 2, 0, INT),
    def("rem", 1, 2, 0, INT),
    def("remu", 1, 2, 0, INT),
    def("muls2", 2, 2, 0, INT),
    def("mulu2", 2, 2, 0, INT),
    def("and", 1, 2, 0, INT),
    def("or", 1, 2, 0, INT),
    def("xor", 1, 2, 0, INT),
    def("not", 1, 1, 0, INT),
    def("andc", 1, 2, 0, INT),
    def("shl", 1, 2, 0, INT),
    def("shr", 1, 2, 0, INT),
    def("sar", 1, 2, 0, INT),
    def("rotl", 1, 2, 0, INT),
    def("rotr", 1, 2, 0, INT),
    def("extract", 1, 1, 2, INT),
    def("sextract", 1, 1, 2, INT),
    def("deposit", 1, 2, 2, INT),
    def("clz", 1, 2, 0, INT),
    def("ctz", 1, 2, 0, INT),
    def("ext_i32_i64", 1, 1, 0, N),
    def("extu_i32_i64", 1, 1, 0, N),
    def("extrl_i64_i32", 1, 1, 0, N),
    def("extrh_i64_i32", 1, 1, 0, N),
    def("qemu_ld", 1, 1, 1, MEM),
    def("qemu_st", 0, 2, 1, MEM),
    def("br", 0, 0, 1, BRANCH),
    def("brcond", 0, 2, 2, CBRANCH),
    def("set_label", 0, 0, 1, BE),
    def("goto_tb", 0, 0, 1, BRANCH),
    def("exit_tb", 0, 0, 1, EXIT),
    def("mb", 0, 0, 1, SE),
    def("call", 1, 4, 1, CALL),
    def("nop", 0, 0, 0, N),
    def("discard", 1, 0, 0, N),
    def("insn_start", 0, 0, 2, N),
];

impl Opcode {
    /// Look up the static definition for this opcode.
    pub fn def(self) -> &'static OpDef {
        &OPCODE_DEFS[self as usize]
    }

    /// Return the fixed IR type this opcode operates on, if not
    /// type-polymorphic.
    pub fn fixed_type(self) -> Option<Type> {
        match self {
            Opcode::ExtI32I64 | Opcode::ExtUI32I64 => Some(Type::I64),
            Opcode::ExtrlI64I32 | Opcode::ExtrhI64I32 => Some(Type::I32),
            _ => None,
        }
    }

    /// Whether this opcode is type-polymorphic (works on I32 or I64).
    pub fn is_int_polymorphic(self) -> bool {
        self.def().flags.contains(OpFlags::INT)
    }

    /// Whether executing this op may leave the TB.
    pub fn is_bb_exit(self) -> bool {
        self.def().flags.contains(OpFlags::BB_EXIT)
    }
}
