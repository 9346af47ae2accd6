/// TCG IR value types.
///
/// Maps to QEMU's `TCGType`. Only the scalar integer widths are
/// modelled; a 32-bit guest uses `I32` as its `target_long`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Type {
    I32 = 0,
    I64 = 1,
}

pub const TYPE_COUNT: usize = 2;

impl Type {
    pub const fn size_bits(self) -> u32 {
        match self {
            Type::I32 => 32,
            Type::I64 => 64,
        }
    }

    pub const fn size_bytes(self) -> u32 {
        self.size_bits() / 8
    }

    /// Mask covering the significant bits of a value of this type.
    pub const fn mask(self) -> u64 {
        match self {
            Type::I32 => 0xffff_ffff,
            Type::I64 => u64::MAX,
        }
    }
}

/// Comparison conditions for branch/setcond/movcond operations.
///
/// Maps to QEMU's `TCGCond`. Encoding matches QEMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Cond {
    Never = 0,
    Always = 1,
    Eq = 8,
    Ne = 9,
    // Signed
    Lt = 10,
    Ge = 11,
    Le = 12,
    Gt = 13,
    // Unsigned
    Ltu = 14,
    Geu = 15,
    Leu = 16,
    Gtu = 17,
    // Test (AND then compare vs 0)
    TstEq = 18,
    TstNe = 19,
}

impl Cond {
    /// Decode a raw constant argument back into a condition.
    pub const fn from_raw(raw: u32) -> Option<Cond> {
        Some(match raw {
            0 => Cond::Never,
            1 => Cond::Always,
            8 => Cond::Eq,
            9 => Cond::Ne,
            10 => Cond::Lt,
            11 => Cond::Ge,
            12 => Cond::Le,
            13 => Cond::Gt,
            14 => Cond::Ltu,
            15 => Cond::Geu,
            16 => Cond::Leu,
            17 => Cond::Gtu,
            18 => Cond::TstEq,
            19 => Cond::TstNe,
            _ => return None,
        })
    }

    /// Return the inverted condition.
    pub const fn invert(self) -> Cond {
        match self {
            Cond::Never => Cond::Always,
            Cond::Always => Cond::Never,
            Cond::Eq => Cond::Ne,
            Cond::Ne => Cond::Eq,
            Cond::Lt => Cond::Ge,
            Cond::Ge => Cond::Lt,
            Cond::Le => Cond::Gt,
            Cond::Gt => Cond::Le,
            Cond::Ltu => Cond::Geu,
            Cond::Geu => Cond::Ltu,
            Cond::Leu => Cond::Gtu,
            Cond::Gtu => Cond::Leu,
            Cond::TstEq => Cond::TstNe,
            Cond::TstNe => Cond::TstEq,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, Cond::Lt | Cond::Ge | Cond::Le | Cond::Gt)
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(self, Cond::Ltu | Cond::Geu | Cond::Leu | Cond::Gtu)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Cond::Never => "never",
            Cond::Always => "always",
            Cond::Eq => "eq",
            Cond::Ne => "ne",
            Cond::Lt => "lt",
            Cond::Ge => "ge",
            Cond::Le => "le",
            Cond::Gt => "gt",
            Cond::Ltu => "ltu",
            Cond::Geu => "geu",
            Cond::Leu => "leu",
            Cond::Gtu => "gtu",
            Cond::TstEq => "tsteq",
            Cond::TstNe => "tstne",
        }
    }
}

/// Guest memory operation descriptor: size, signedness and byte
/// order.
///
/// Maps to QEMU's `MemOp`. Bit-packed so it fits in a constant
/// op argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemOp(u16);

impl MemOp {
    pub const SIZE_8: u16 = 0;
    pub const SIZE_16: u16 = 1;
    pub const SIZE_32: u16 = 2;
    pub const SIZE_64: u16 = 3;

    pub const SIGN: u16 = 1 << 2;
    /// Big-endian access (the OpenRISC default).
    pub const BE: u16 = 1 << 3;

    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn ub() -> Self {
        Self(Self::SIZE_8)
    }
    pub const fn sb() -> Self {
        Self(Self::SIZE_8 | Self::SIGN)
    }
    /// Target-endian unsigned halfword.
    pub const fn teuw() -> Self {
        Self(Self::SIZE_16 | Self::BE)
    }
    pub const fn tesw() -> Self {
        Self(Self::SIZE_16 | Self::SIGN | Self::BE)
    }
    pub const fn teul() -> Self {
        Self(Self::SIZE_32 | Self::BE)
    }
    pub const fn tesl() -> Self {
        Self(Self::SIZE_32 | Self::SIGN | Self::BE)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }
    pub const fn size(self) -> u16 {
        self.0 & 0x3
    }
    pub const fn is_signed(self) -> bool {
        self.0 & Self::SIGN != 0
    }
    pub const fn is_be(self) -> bool {
        self.0 & Self::BE != 0
    }
    pub const fn size_bytes(self) -> u32 {
        1 << self.size()
    }

    /// Sign- or zero-extend a raw loaded value according to this
    /// memop.
    pub const fn extend(self, raw: u64) -> u64 {
        let bits = self.size_bytes() * 8;
        if bits == 64 {
            return raw;
        }
        let mask = (1u64 << bits) - 1;
        let v = raw & mask;
        if self.is_signed() && (v >> (bits - 1)) & 1 != 0 {
            v | !mask
        } else {
            v
        }
    }
}
