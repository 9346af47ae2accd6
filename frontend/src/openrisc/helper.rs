//! Runtime helpers called from generated code.
//!
//! Each helper receives the raw env pointer, which always points
//! at an [`Or1kCpu`], and returns `Err(excp)` to leave the TB with
//! a guest exception.

use tcg_core::HelperResult;

use super::cpu::*;

unsafe fn cpu<'a>(env: *mut u8) -> &'a mut Or1kCpu {
    &mut *(env as *mut Or1kCpu)
}

fn raise(env: &mut Or1kCpu, excp: u32) -> HelperResult {
    env.exception_index = excp;
    Err(excp)
}

/// `args[0]`: exception number.
pub unsafe fn helper_exception(env: *mut u8, args: [u64; 4]) -> HelperResult {
    raise(cpu(env), args[0] as u32)
}

/// Range exception if `args[0]` (the freshly computed CY/OV
/// result) is set and SR[OVE] enables it.
pub unsafe fn helper_ove(env: *mut u8, args: [u64; 4]) -> HelperResult {
    let env = cpu(env);
    if args[0] != 0 && env.sr & SR_OVE != 0 {
        return raise(env, EXCP_RANGE);
    }
    Ok(0)
}

pub unsafe fn helper_rfe(env: *mut u8, _args: [u64; 4]) -> HelperResult {
    let env = cpu(env);
    env.pc = env.epcr;
    env.npc = env.epcr;
    let esr = env.esr;
    env.set_sr(esr);
    Ok(0)
}

/// `args`: ra, rb, imm. Writes `rb` to SPR `ra | imm`.
pub unsafe fn helper_mtspr(env: *mut u8, args: [u64; 4]) -> HelperResult {
    let env = cpu(env);
    let spr = (args[0] as u32) | (args[2] as u32);
    let val = args[1] as u32;
    match spr {
        SPR_NPC => env.npc = val,
        SPR_SR => env.set_sr(val),
        SPR_PPC => env.ppc = val,
        SPR_FPCSR => env.fpcsr = val,
        SPR_EPCR0 => env.epcr = val,
        SPR_EEAR0 => env.eear = val,
        SPR_ESR0 => env.esr = val,
        SPR_MACLO => env.maclo = val,
        SPR_MACHI => env.machi = val,
        SPR_PICMR => env.picmr = val,
        SPR_PICSR => env.picsr &= !val,
        SPR_TTMR => env.ttmr = val,
        SPR_TTCR => env.ttcr = val,
        _ => tracing::trace!(target: "tcg::exec", spr, val, "mtspr to unmodelled register"),
    }
    Ok(0)
}

/// `args`: rd (old value), ra, imm. Returns SPR `ra | imm`, or
/// the old `rd` for unmodelled registers.
pub unsafe fn helper_mfspr(env: *mut u8, args: [u64; 4]) -> HelperResult {
    let env = cpu(env);
    let spr = (args[1] as u32) | (args[2] as u32);
    let val = match spr {
        SPR_VR => env.cfg.vr,
        SPR_UPR => env.cfg.upr,
        SPR_CPUCFGR => env.cfg.cpucfgr,
        SPR_NPC => env.npc,
        SPR_SR => env.get_sr(),
        SPR_PPC => env.ppc,
        SPR_FPCSR => env.fpcsr,
        SPR_EPCR0 => env.epcr,
        SPR_EEAR0 => env.eear,
        SPR_ESR0 => env.esr,
        SPR_MACLO => env.maclo,
        SPR_MACHI => env.machi,
        SPR_PICMR => env.picmr,
        SPR_PICSR => env.picsr,
        SPR_TTMR => env.ttmr,
        SPR_TTCR => env.ttcr,
        _ => args[0] as u32,
    };
    Ok(val as u64)
}

// -- Floating point --

/// An IEEE format the FPU helpers are generic over.
pub trait FloatWord: Copy + PartialOrd {
    fn from_raw(v: u64) -> Self;
    fn to_raw(self) -> u64;
    fn from_int(v: u64) -> Self;
    fn to_int(self) -> u64;
    fn add(self, b: Self) -> Self;
    fn sub(self, b: Self) -> Self;
    fn mul(self, b: Self) -> Self;
    fn div(self, b: Self) -> Self;
    fn rem(self, b: Self) -> Self;
    fn is_nan(self) -> bool;
    fn is_infinite(self) -> bool;
    fn is_zero(self) -> bool;
}

impl FloatWord for f32 {
    fn from_raw(v: u64) -> Self {
        f32::from_bits(v as u32)
    }
    fn to_raw(self) -> u64 {
        self.to_bits() as u64
    }
    fn from_int(v: u64) -> Self {
        v as u32 as i32 as f32
    }
    fn to_int(self) -> u64 {
        self as i32 as u32 as u64
    }
    fn add(self, b: Self) -> Self {
        self + b
    }
    fn sub(self, b: Self) -> Self {
        self - b
    }
    fn mul(self, b: Self) -> Self {
        self * b
    }
    fn div(self, b: Self) -> Self {
        self / b
    }
    fn rem(self, b: Self) -> Self {
        self % b
    }
    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
    fn is_infinite(self) -> bool {
        f32::is_infinite(self)
    }
    fn is_zero(self) -> bool {
        self == 0.0
    }
}

/// Arithmetic op selector for [`helper_float_calc_s`].
pub const FOP_ADD: u8 = 0;
pub const FOP_SUB: u8 = 1;
pub const FOP_MUL: u8 = 2;
pub const FOP_DIV: u8 = 3;
pub const FOP_REM: u8 = 4;

/// Comparison selector for [`helper_float_cmp_s`].
pub const FCMP_EQ: u8 = 0;
pub const FCMP_NE: u8 = 1;
pub const FCMP_GT: u8 = 2;
pub const FCMP_GE: u8 = 3;
pub const FCMP_LT: u8 = 4;
pub const FCMP_LE: u8 = 5;

type CalcFn<F> = fn(F, F) -> F;

fn calc_table<F: FloatWord>() -> [CalcFn<F>; 5] {
    [F::add, F::sub, F::mul, F::div, F::rem]
}

fn cmp<F: FloatWord>(op: u8, a: F, b: F) -> bool {
    match op {
        FCMP_EQ => a == b,
        FCMP_NE => a != b,
        FCMP_GT => a > b,
        FCMP_GE => a >= b,
        FCMP_LT => a < b,
        _ => a <= b,
    }
}

/// Accumulate FPCSR status for `res` and raise FPE if enabled.
fn update_fpcsr<F: FloatWord>(env: &mut Or1kCpu, res: F, div_by_zero: bool) -> HelperResult {
    let mut flags = 0;
    if res.is_nan() {
        flags |= FPCSR_IVF;
    }
    if res.is_infinite() {
        flags |= if div_by_zero { FPCSR_DZF } else { FPCSR_OVF | FPCSR_INF };
    }
    if res.is_zero() {
        flags |= FPCSR_ZF;
    }
    env.fpcsr = (env.fpcsr & FPCSR_FPEE) | flags;
    if flags != 0 && env.fpcsr & FPCSR_FPEE != 0 {
        return raise(env, EXCP_FPE);
    }
    Ok(res.to_raw())
}

fn float_calc<F: FloatWord>(env: &mut Or1kCpu, op: u8, a: u64, b: u64) -> HelperResult {
    let (a, b) = (F::from_raw(a), F::from_raw(b));
    let res = calc_table::<F>()[op as usize](a, b);
    update_fpcsr(env, res, op == FOP_DIV && b.is_zero())
}

/// `lf.{add,sub,mul,div,rem}.s`; `args`: ra, rb.
pub unsafe fn helper_float_calc_s<const OP: u8>(env: *mut u8, args: [u64; 4]) -> HelperResult {
    float_calc::<f32>(cpu(env), OP, args[0], args[1])
}

/// `lf.sf*.s`; `args`: ra, rb. Returns the new flag value.
pub unsafe fn helper_float_cmp_s<const OP: u8>(_env: *mut u8, args: [u64; 4]) -> HelperResult {
    let (a, b) = (f32::from_raw(args[0]), f32::from_raw(args[1]));
    Ok(cmp(OP, a, b) as u64)
}

/// `lf.madd.s`; `args`: ra, rb, rd. Returns `rd + ra * rb`.
pub unsafe fn helper_float_madd_s(env: *mut u8, args: [u64; 4]) -> HelperResult {
    let (a, b, d) = (
        f32::from_raw(args[0]),
        f32::from_raw(args[1]),
        f32::from_raw(args[2]),
    );
    update_fpcsr(cpu(env), d + a * b, false)
}

pub unsafe fn helper_itofs(env: *mut u8, args: [u64; 4]) -> HelperResult {
    update_fpcsr(cpu(env), f32::from_int(args[0]), false)
}

pub unsafe fn helper_ftois(_env: *mut u8, args: [u64; 4]) -> HelperResult {
    Ok(f32::from_raw(args[0]).to_int())
}
