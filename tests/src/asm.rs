//! Minimal ORBIS32 encoder for building guest test programs.
//!
//! Branch offsets are in instructions, relative to the branch.

fn rrr(op: u32, rd: u32, ra: u32, rb: u32, low: u32) -> u32 {
    (op << 26) | (rd << 21) | (ra << 16) | (rb << 11) | low
}

fn rri(op: u32, rd: u32, ra: u32, imm: u16) -> u32 {
    (op << 26) | (rd << 21) | (ra << 16) | imm as u32
}

/// Stores, `l.mtspr`: 16-bit immediate split around `rb`.
fn split(op: u32, ra: u32, rb: u32, imm: u16) -> u32 {
    let imm = imm as u32;
    (op << 26) | ((imm >> 11) << 21) | (ra << 16) | (rb << 11) | (imm & 0x7ff)
}

fn jump(op: u32, insns: i32) -> u32 {
    (op << 26) | (insns as u32 & 0x03ff_ffff)
}

pub fn j(insns: i32) -> u32 {
    jump(0x00, insns)
}
pub fn jal(insns: i32) -> u32 {
    jump(0x01, insns)
}
pub fn bnf(insns: i32) -> u32 {
    jump(0x03, insns)
}
pub fn bf(insns: i32) -> u32 {
    jump(0x04, insns)
}
pub fn jr(rb: u32) -> u32 {
    rrr(0x11, 0, 0, rb, 0)
}
pub fn jalr(rb: u32) -> u32 {
    rrr(0x12, 0, 0, rb, 0)
}

pub fn nop() -> u32 {
    0x1500_0000
}
pub fn sys(k: u16) -> u32 {
    0x2000_0000 | k as u32
}
pub fn trap(k: u16) -> u32 {
    0x2100_0000 | k as u32
}
pub fn rfe() -> u32 {
    0x09 << 26
}

pub fn movhi(rd: u32, k: u16) -> u32 {
    rri(0x06, rd, 0, k)
}
pub fn addi(rd: u32, ra: u32, imm: i16) -> u32 {
    rri(0x27, rd, ra, imm as u16)
}
pub fn ori(rd: u32, ra: u32, k: u16) -> u32 {
    rri(0x2a, rd, ra, k)
}
pub fn muli(rd: u32, ra: u32, imm: i16) -> u32 {
    rri(0x2c, rd, ra, imm as u16)
}

pub fn add(rd: u32, ra: u32, rb: u32) -> u32 {
    rrr(0x38, rd, ra, rb, 0x0)
}
pub fn addc(rd: u32, ra: u32, rb: u32) -> u32 {
    rrr(0x38, rd, ra, rb, 0x1)
}
pub fn sub(rd: u32, ra: u32, rb: u32) -> u32 {
    rrr(0x38, rd, ra, rb, 0x2)
}
pub fn mul(rd: u32, ra: u32, rb: u32) -> u32 {
    rrr(0x38, rd, ra, rb, 0x306)
}
pub fn div(rd: u32, ra: u32, rb: u32) -> u32 {
    rrr(0x38, rd, ra, rb, 0x309)
}
pub fn divu(rd: u32, ra: u32, rb: u32) -> u32 {
    rrr(0x38, rd, ra, rb, 0x30a)
}
pub fn mulu(rd: u32, ra: u32, rb: u32) -> u32 {
    rrr(0x38, rd, ra, rb, 0x30b)
}
pub fn ff1(rd: u32, ra: u32) -> u32 {
    rrr(0x38, rd, ra, 0, 0x00f)
}
pub fn fl1(rd: u32, ra: u32) -> u32 {
    rrr(0x38, rd, ra, 0, 0x10f)
}
pub fn cmov(rd: u32, ra: u32, rb: u32) -> u32 {
    rrr(0x38, rd, ra, rb, 0x00e)
}

pub fn sfeq(ra: u32, rb: u32) -> u32 {
    rrr(0x39, 0x0, ra, rb, 0)
}
pub fn sfeqi(ra: u32, imm: i16) -> u32 {
    rri(0x2f, 0x0, ra, imm as u16)
}
pub fn sfnei(ra: u32, imm: i16) -> u32 {
    rri(0x2f, 0x1, ra, imm as u16)
}
pub fn sfltsi(ra: u32, imm: i16) -> u32 {
    rri(0x2f, 0xc, ra, imm as u16)
}

pub fn slli(rd: u32, ra: u32, l6: u32) -> u32 {
    rrr(0x2e, rd, ra, 0, l6 & 0x3f)
}
pub fn srai(rd: u32, ra: u32, l6: u32) -> u32 {
    rrr(0x2e, rd, ra, 0, (2 << 6) | (l6 & 0x3f))
}
pub fn rori(rd: u32, ra: u32, l6: u32) -> u32 {
    rrr(0x2e, rd, ra, 0, (3 << 6) | (l6 & 0x3f))
}

pub fn mac(ra: u32, rb: u32) -> u32 {
    rrr(0x31, 0, ra, rb, 0x1)
}
pub fn msb(ra: u32, rb: u32) -> u32 {
    rrr(0x31, 0, ra, rb, 0x2)
}
pub fn macrc(rd: u32) -> u32 {
    (0x06 << 26) | (rd << 21) | (1 << 16)
}

pub fn lf_add_s(rd: u32, ra: u32, rb: u32) -> u32 {
    rrr(0x32, rd, ra, rb, 0x00)
}
pub fn lf_sflt_s(ra: u32, rb: u32) -> u32 {
    rrr(0x32, 0, ra, rb, 0x0c)
}

pub fn lwz(rd: u32, ra: u32, ofs: i16) -> u32 {
    rri(0x21, rd, ra, ofs as u16)
}
pub fn lbs(rd: u32, ra: u32, ofs: i16) -> u32 {
    rri(0x24, rd, ra, ofs as u16)
}
pub fn sw(ra: u32, rb: u32, ofs: i16) -> u32 {
    split(0x35, ra, rb, ofs as u16)
}

pub fn mfspr(rd: u32, ra: u32, k: u16) -> u32 {
    rri(0x2d, rd, ra, k)
}
pub fn mtspr(ra: u32, rb: u32, k: u16) -> u32 {
    split(0x30, ra, rb, k)
}

/// Load a full 32-bit constant into `rd`.
pub fn li(rd: u32, val: u32) -> [u32; 2] {
    [movhi(rd, (val >> 16) as u16), ori(rd, rd, val as u16)]
}
