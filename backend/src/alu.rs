//! Width-generic integer semantics for the interpreter.
//!
//! Every polymorphic opcode is implemented once over [`Word`] and
//! instantiated for `u32` and `u64`; the interpreter picks the
//! table for the op's type.

use tcg_core::{Cond, Opcode};

/// An unsigned machine word the IR can operate on.
pub trait Word: Copy + Eq + Ord + std::fmt::Debug {
    const BITS: u32;
    const ZERO: Self;

    fn from_u64(v: u64) -> Self;
    fn to_u64(self) -> u64;
    /// Reinterpret as signed and widen to i64.
    fn to_signed(self) -> i64;
    fn from_signed(v: i64) -> Self;

    fn wrapping_add(self, b: Self) -> Self;
    fn wrapping_sub(self, b: Self) -> Self;
    fn wrapping_mul(self, b: Self) -> Self;
    fn rotate_left(self, n: u32) -> Self;
    fn rotate_right(self, n: u32) -> Self;
    fn leading_zeros(self) -> u32;
    fn trailing_zeros(self) -> u32;
}

macro_rules! impl_word {
    ($u:ty, $s:ty) => {
        impl Word for $u {
            const BITS: u32 = <$u>::BITS;
            const ZERO: Self = 0;

            fn from_u64(v: u64) -> Self {
                v as $u
            }
            fn to_u64(self) -> u64 {
                self as u64
            }
            fn to_signed(self) -> i64 {
                self as $s as i64
            }
            fn from_signed(v: i64) -> Self {
                v as $u
            }
            fn wrapping_add(self, b: Self) -> Self {
                <$u>::wrapping_add(self, b)
            }
            fn wrapping_sub(self, b: Self) -> Self {
                <$u>::wrapping_sub(self, b)
            }
            fn wrapping_mul(self, b: Self) -> Self {
                <$u>::wrapping_mul(self, b)
            }
            fn rotate_left(self, n: u32) -> Self {
                <$u>::rotate_left(self, n)
            }
            fn rotate_right(self, n: u32) -> Self {
                <$u>::rotate_right(self, n)
            }
            fn leading_zeros(self) -> u32 {
                <$u>::leading_zeros(self)
            }
            fn trailing_zeros(self) -> u32 {
                <$u>::trailing_zeros(self)
            }
        }
    };
}

impl_word!(u32, i32);
impl_word!(u64, i64);

pub type UnaryFn<W> = fn(W) -> W;
pub type BinaryFn<W> = fn(W, W) -> W;

fn shift_amount<W: Word>(b: W) -> u32 {
    (b.to_u64() as u32) & (W::BITS - 1)
}

fn add<W: Word>(a: W, b: W) -> W {
    a.wrapping_add(b)
}
fn sub<W: Word>(a: W, b: W) -> W {
    a.wrapping_sub(b)
}
fn mul<W: Word>(a: W, b: W) -> W {
    a.wrapping_mul(b)
}
fn and<W: Word>(a: W, b: W) -> W {
    W::from_u64(a.to_u64() & b.to_u64())
}
fn or<W: Word>(a: W, b: W) -> W {
    W::from_u64(a.to_u64() | b.to_u64())
}
fn xor<W: Word>(a: W, b: W) -> W {
    W::from_u64(a.to_u64() ^ b.to_u64())
}
fn andc<W: Word>(a: W, b: W) -> W {
    W::from_u64(a.to_u64() & !b.to_u64())
}
fn shl<W: Word>(a: W, b: W) -> W {
    W::from_u64(a.to_u64() << shift_amount(b))
}
fn shr<W: Word>(a: W, b: W) -> W {
    W::from_u64(a.to_u64() >> shift_amount(b))
}
fn sar<W: Word>(a: W, b: W) -> W {
    W::from_signed(a.to_signed() >> shift_amount(b))
}
fn rotl<W: Word>(a: W, b: W) -> W {
    a.rotate_left(shift_amount(b))
}
fn rotr<W: Word>(a: W, b: W) -> W {
    a.rotate_right(shift_amount(b))
}

// Division by zero is undefined in the IR; guests guard the
// divisor before dividing. The interpreter yields zero.
fn divs<W: Word>(a: W, b: W) -> W {
    match b.to_signed() {
        0 => W::ZERO,
        d => W::from_signed(a.to_signed().wrapping_div(d)),
    }
}
fn divu<W: Word>(a: W, b: W) -> W {
    match b.to_u64() {
        0 => W::ZERO,
        d => W::from_u64(a.to_u64() / d),
    }
}
fn rems<W: Word>(a: W, b: W) -> W {
    match b.to_signed() {
        0 => W::ZERO,
        d => W::from_signed(a.to_signed().wrapping_rem(d)),
    }
}
fn remu<W: Word>(a: W, b: W) -> W {
    match b.to_u64() {
        0 => W::ZERO,
        d => W::from_u64(a.to_u64() % d),
    }
}
fn clz<W: Word>(a: W, b: W) -> W {
    if a == W::ZERO {
        b
    } else {
        W::from_u64(a.leading_zeros() as u64)
    }
}
fn ctz<W: Word>(a: W, b: W) -> W {
    if a == W::ZERO {
        b
    } else {
        W::from_u64(a.trailing_zeros() as u64)
    }
}

fn mov<W: Word>(a: W) -> W {
    a
}
fn neg<W: Word>(a: W) -> W {
    W::ZERO.wrapping_sub(a)
}
fn not<W: Word>(a: W) -> W {
    W::from_u64(!a.to_u64())
}

/// Two-input, one-output opcodes.
pub fn binary<W: Word>(opc: Opcode) -> Option<BinaryFn<W>> {
    let f: BinaryFn<W> = match opc {
        Opcode::Add => add,
        Opcode::Sub => sub,
        Opcode::Mul => mul,
        Opcode::And => and,
        Opcode::Or => or,
        Opcode::Xor => xor,
        Opcode::AndC => andc,
        Opcode::Shl => shl,
        Opcode::Shr => shr,
        Opcode::Sar => sar,
        Opcode::RotL => rotl,
        Opcode::RotR => rotr,
        Opcode::DivS => divs,
        Opcode::DivU => divu,
        Opcode::RemS => rems,
        Opcode::RemU => remu,
        Opcode::Clz => clz,
        Opcode::Ctz => ctz,
        _ => return None,
    };
    Some(f)
}

/// One-input, one-output opcodes.
pub fn unary<W: Word>(opc: Opcode) -> Option<UnaryFn<W>> {
    let f: UnaryFn<W> = match opc {
        Opcode::Mov => mov,
        Opcode::Neg => neg,
        Opcode::Not => not,
        _ => return None,
    };
    Some(f)
}

/// Evaluate a comparison.
pub fn cond<W: Word>(c: Cond, a: W, b: W) -> bool {
    match c {
        Cond::Never => false,
        Cond::Always => true,
        Cond::Eq => a == b,
        Cond::Ne => a != b,
        Cond::Lt => a.to_signed() < b.to_signed(),
        Cond::Ge => a.to_signed() >= b.to_signed(),
        Cond::Le => a.to_signed() <= b.to_signed(),
        Cond::Gt => a.to_signed() > b.to_signed(),
        Cond::Ltu => a < b,
        Cond::Geu => a >= b,
        Cond::Leu => a <= b,
        Cond::Gtu => a > b,
        Cond::TstEq => a.to_u64() & b.to_u64() == 0,
        Cond::TstNe => a.to_u64() & b.to_u64() != 0,
    }
}

fn field_mask(len: u32) -> u64 {
    if len >= 64 {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

pub fn extract<W: Word>(a: W, ofs: u32, len: u32) -> W {
    W::from_u64((a.to_u64() >> ofs) & field_mask(len))
}

pub fn sextract<W: Word>(a: W, ofs: u32, len: u32) -> W {
    if len == 0 {
        return W::ZERO;
    }
    let shift = 64 - len;
    let v = ((a.to_u64() >> ofs) << shift) as i64 >> shift;
    W::from_signed(v)
}

pub fn deposit<W: Word>(base: W, field: W, ofs: u32, len: u32) -> W {
    let mask = field_mask(len) << ofs;
    W::from_u64((base.to_u64() & !mask) | ((field.to_u64() << ofs) & mask))
}

/// Full-width product split into (lo, hi).
pub fn mul2<W: Word>(a: W, b: W, signed: bool) -> (W, W) {
    let p: u128 = if signed {
        (a.to_signed() as i128).wrapping_mul(b.to_signed() as i128) as u128
    } else {
        (a.to_u64() as u128) * (b.to_u64() as u128)
    };
    (W::from_u64(p as u64), W::from_u64((p >> W::BITS) as u64))
}
