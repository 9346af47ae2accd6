//! OpenRISC translator tests: translate one TB, run it on the
//! interpreter and inspect the CPU state.

use proptest::prelude::*;
use tcg_backend::{CodeGen, Interpreter, TbExit};
use tcg_core::{Context, MemFault, TB_EXIT_IDX0, TB_EXIT_IDX1, TB_EXIT_NOCHAIN};
use tcg_exec::GuestRam;
use tcg_frontend::openrisc::cpu::*;
use tcg_frontend::openrisc::gen_intermediate_code;
use tcg_frontend::{TbInfo, TbRequest, TranslateConfig};

use crate::asm::*;

const BASE: u32 = 0x100;

struct Harness {
    ram: GuestRam,
    cpu: Or1kCpu,
    ir: Context,
    cfg: TranslateConfig,
    breakpoints: Vec<u64>,
    singlestep: bool,
}

impl Harness {
    fn new(prog: &[u32]) -> Self {
        Self::with_ram(GuestRam::new(0, 0x4000), BASE, prog)
    }

    fn with_ram(ram: GuestRam, at: u32, prog: &[u32]) -> Self {
        crate::init_tracing();
        ram.load_words(at as u64, prog).unwrap();
        let mut cpu = Or1kCpu::default();
        cpu.pc = at;
        cpu.npc = at.wrapping_add(4);
        Self {
            ram,
            cpu,
            ir: Context::new(),
            cfg: TranslateConfig::default(),
            breakpoints: Vec::new(),
            singlestep: false,
        }
    }

    fn user_mode(mut self) -> Self {
        self.cpu.sr &= !SR_SM;
        self
    }

    fn translate(&mut self) -> TbInfo {
        self.ir.reset();
        let req = TbRequest {
            pc: self.cpu.pc as u64,
            flags: self.cpu.tb_flags(),
            max_insns: 0,
            singlestep_enabled: self.singlestep,
            breakpoints: &self.breakpoints,
        };
        gen_intermediate_code(&mut self.ir, &self.ram, &req, &self.cfg)
    }

    fn step(&mut self) -> (TbInfo, TbExit) {
        let info = self.translate();
        let code = Interpreter.translate(&self.ir).unwrap();
        let exit = unsafe { Interpreter.exec_tb(&code, self.cpu.env_ptr(), &self.ram) };
        (info, exit)
    }

    fn sr_bit(&self, bit: u32) -> bool {
        self.cpu.sr & bit != 0
    }
}

fn syscall_at(pc: u64) -> TbExit {
    TbExit::Exception {
        index: EXCP_SYSCALL,
        pc,
        extra: 0,
    }
}

// -- Arithmetic flags ---------------------------------------

#[test]
fn add_signed_overflow_sets_ov_only() {
    let mut h = Harness::new(&[add(3, 1, 2), sys(0)]);
    h.cpu.gpr[1] = 0x7fff_ffff;
    h.cpu.gpr[2] = 1;
    let (info, exit) = h.step();
    assert_eq!(info.icount, 2);
    assert_eq!(exit, syscall_at(0x104));
    assert_eq!(h.cpu.gpr[3], 0x8000_0000);
    assert!(h.sr_bit(SR_OV));
    assert!(!h.sr_bit(SR_CY));
}

#[test]
fn add_unsigned_wrap_sets_cy_only() {
    let mut h = Harness::new(&[add(3, 1, 2), sys(0)]);
    h.cpu.gpr[1] = 0xffff_ffff;
    h.cpu.gpr[2] = 1;
    h.step();
    assert_eq!(h.cpu.gpr[3], 0);
    assert!(h.sr_bit(SR_CY));
    assert!(!h.sr_bit(SR_OV));
}

#[test]
fn addc_consumes_carry() {
    let mut h = Harness::new(&[addc(3, 1, 2), sys(0)]);
    h.cpu.sr |= SR_CY;
    h.cpu.gpr[1] = 5;
    h.cpu.gpr[2] = 6;
    h.step();
    assert_eq!(h.cpu.gpr[3], 12);
    assert!(!h.sr_bit(SR_CY));
}

#[test]
fn sub_flags() {
    let mut h = Harness::new(&[sub(3, 1, 2), sub(4, 0, 2), sys(0)]);
    h.cpu.gpr[1] = 0x8000_0000;
    h.cpu.gpr[2] = 1;
    h.step();
    assert_eq!(h.cpu.gpr[3], 0x7fff_ffff);
    assert_eq!(h.cpu.gpr[4], 0xffff_ffff);
    // Flags reflect the last subtraction: 0 - 1 borrows without
    // signed overflow.
    assert!(h.sr_bit(SR_CY));
    assert!(!h.sr_bit(SR_OV));

    let mut h = Harness::new(&[sub(3, 1, 2), sys(0)]);
    h.cpu.gpr[1] = 0x8000_0000;
    h.cpu.gpr[2] = 1;
    h.step();
    assert!(h.sr_bit(SR_OV));
    assert!(!h.sr_bit(SR_CY));
}

#[test]
fn signed_divide_by_zero_sets_ov() {
    let mut h = Harness::new(&[div(3, 1, 2), sys(0)]);
    h.cpu.gpr[1] = 7;
    let (_, exit) = h.step();
    assert_eq!(exit, syscall_at(0x104));
    assert!(h.sr_bit(SR_OV));
}

#[test]
fn unsigned_divide_by_zero_sets_cy() {
    let mut h = Harness::new(&[divu(3, 1, 2), sys(0)]);
    h.cpu.gpr[1] = 7;
    h.step();
    assert!(h.sr_bit(SR_CY));
}

#[test]
fn divide_truncates_toward_zero() {
    let mut h = Harness::new(&[div(3, 1, 2), divu(4, 1, 2), sys(0)]);
    h.cpu.gpr[1] = (-7i32) as u32;
    h.cpu.gpr[2] = 2;
    h.step();
    assert_eq!(h.cpu.gpr[3] as i32, -3);
    assert_eq!(h.cpu.gpr[4], 0xffff_fff9 / 2);
    assert!(!h.sr_bit(SR_OV));
}

#[test]
fn multiply_overflow() {
    let mut h = Harness::new(&[mul(3, 1, 1), sys(0)]);
    h.cpu.gpr[1] = 0x1_0000;
    h.step();
    assert_eq!(h.cpu.gpr[3], 0);
    assert!(h.sr_bit(SR_OV));

    let mut h = Harness::new(&[mulu(3, 1, 2), sys(0)]);
    h.cpu.gpr[1] = 0xffff_ffff;
    h.cpu.gpr[2] = 2;
    h.step();
    assert_eq!(h.cpu.gpr[3], 0xffff_fffe);
    assert!(h.sr_bit(SR_CY));
}

#[test]
fn overflow_trap_when_enabled() {
    let mut h = Harness::new(&[add(3, 1, 2), sys(0)]);
    h.cpu.sr |= SR_OVE;
    h.cpu.gpr[1] = 0x7fff_ffff;
    h.cpu.gpr[2] = 1;
    let (_, exit) = h.step();
    assert!(matches!(
        exit,
        TbExit::Exception { index: EXCP_RANGE, pc: 0x100, .. }
    ));
}

#[test]
fn find_first_and_last_one() {
    let mut h = Harness::new(&[ff1(3, 1), fl1(4, 1), ff1(5, 0), fl1(6, 2), sys(0)]);
    h.cpu.gpr[1] = 0x0000_0108;
    h.cpu.gpr[2] = 0x8000_0000;
    h.step();
    assert_eq!(h.cpu.gpr[3], 4);
    assert_eq!(h.cpu.gpr[4], 9);
    assert_eq!(h.cpu.gpr[5], 0);
    assert_eq!(h.cpu.gpr[6], 32);
}

#[test]
fn immediates_and_r0() {
    let [hi, lo] = li(4, 0xdead_beef);
    let mut h = Harness::new(&[
        addi(0, 0, 5),
        addi(1, 0, -1),
        ori(2, 0, 0xffff),
        muli(3, 1, 3),
        hi,
        lo,
        sys(0),
    ]);
    h.step();
    assert_eq!(h.cpu.gpr[0], 0);
    assert_eq!(h.cpu.gpr[1], 0xffff_ffff);
    assert_eq!(h.cpu.gpr[2], 0x0000_ffff);
    assert_eq!(h.cpu.gpr[3] as i32, -3);
    assert_eq!(h.cpu.gpr[4], 0xdead_beef);
}

#[test]
fn set_flag_and_cmov() {
    let mut h = Harness::new(&[sfltsi(1, 0), cmov(3, 1, 2), sfeq(1, 2), cmov(4, 1, 2), sys(0)]);
    h.cpu.gpr[1] = (-5i32) as u32;
    h.cpu.gpr[2] = 9;
    h.step();
    assert_eq!(h.cpu.gpr[3], h.cpu.gpr[1]);
    assert_eq!(h.cpu.gpr[4], 9);
    assert_eq!(h.cpu.sr_f, 0);
}

/// Run `insn` (rd = r3, ra = r1, rb = r2) and return rd, SR[CY]
/// and SR[OV].
fn run_calc(insn: u32, a: u32, b: u32, carry_in: bool) -> (u32, bool, bool) {
    let mut h = Harness::new(&[insn, sys(0)]);
    if carry_in {
        h.cpu.sr |= SR_CY;
    }
    h.cpu.gpr[1] = a;
    h.cpu.gpr[2] = b;
    let (_, exit) = h.step();
    assert_eq!(exit, syscall_at(0x104));
    (h.cpu.gpr[3], h.sr_bit(SR_CY), h.sr_bit(SR_OV))
}

fn fits_i32(v: i64) -> bool {
    i64::from(i32::MIN) <= v && v <= i64::from(i32::MAX)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn add_matches_host(a: u32, b: u32) {
        let (res, cy, ov) = run_calc(add(3, 1, 2), a, b, false);
        let (want, carry) = a.overflowing_add(b);
        prop_assert_eq!((res, cy), (want, carry));
        prop_assert_eq!(ov, (a as i32).overflowing_add(b as i32).1);
    }

    #[test]
    fn addc_matches_host(a: u32, b: u32, cin: bool) {
        let (res, cy, ov) = run_calc(addc(3, 1, 2), a, b, cin);
        let wide = u64::from(a) + u64::from(b) + u64::from(cin);
        let signed = i64::from(a as i32) + i64::from(b as i32) + i64::from(cin);
        prop_assert_eq!(res, wide as u32);
        prop_assert_eq!(cy, wide > u64::from(u32::MAX));
        prop_assert_eq!(ov, !fits_i32(signed));
    }

    #[test]
    fn sub_matches_host(a: u32, b: u32) {
        let (res, cy, ov) = run_calc(sub(3, 1, 2), a, b, false);
        prop_assert_eq!(res, a.wrapping_sub(b));
        prop_assert_eq!(cy, a < b);
        prop_assert_eq!(ov, (a as i32).overflowing_sub(b as i32).1);
    }

    #[test]
    fn mul_matches_host(a: u32, b: u32) {
        let (res, _, ov) = run_calc(mul(3, 1, 2), a, b, false);
        let (want, overflow) = (a as i32).overflowing_mul(b as i32);
        prop_assert_eq!((res, ov), (want as u32, overflow));
    }

    #[test]
    fn mulu_matches_host(a: u32, b: u32) {
        let (res, cy, _) = run_calc(mulu(3, 1, 2), a, b, false);
        prop_assert_eq!((res, cy), a.overflowing_mul(b));
    }

    #[test]
    fn div_matches_host(a: u32, b in prop_oneof![Just(0u32), any::<u32>()]) {
        let (res, _, ov) = run_calc(div(3, 1, 2), a, b, false);
        if b == 0 {
            prop_assert_eq!((res, ov), (a, true));
        } else {
            prop_assert_eq!((res, ov), ((a as i32).wrapping_div(b as i32) as u32, false));
        }
    }

    #[test]
    fn divu_matches_host(a: u32, b in prop_oneof![Just(0u32), any::<u32>()]) {
        let (res, cy, _) = run_calc(divu(3, 1, 2), a, b, false);
        if b == 0 {
            prop_assert_eq!((res, cy), (a, true));
        } else {
            prop_assert_eq!((res, cy), (a / b, false));
        }
    }
}

#[test]
fn movhi_and_compare_immediate() {
    let mut h = Harness::new(&[movhi(1, 0x1234), sfeqi(1, 0), sfeqi(2, -1), sys(0)]);
    h.cpu.gpr[2] = 0xffff_ffff;
    h.step();
    assert_eq!(h.cpu.gpr[1], 0x1234_0000);
    // The immediate is sign-extended, so the last compare matches.
    assert_eq!(h.cpu.sr_f, 1);

    let mut h = Harness::new(&[movhi(1, 0x1234), sfeqi(1, 0), sys(0)]);
    h.step();
    assert_eq!(h.cpu.sr_f, 0);
}

// -- Memory -------------------------------------------------

#[test]
fn store_then_sign_extending_byte_load() {
    let [hi, lo] = li(2, 0xdead_beef);
    let mut h = Harness::new(&[hi, lo, sw(1, 2, 4), lbs(3, 1, 4), sys(0)]);
    h.cpu.gpr[1] = 0x1000;
    h.step();
    assert_eq!(h.ram.read_u32(0x1004), Ok(0xdead_beef));
    assert_eq!(h.cpu.gpr[3], 0xffff_ffde);
}

#[test]
fn misaligned_load_faults_at_insn() {
    let mut h = Harness::new(&[nop(), lwz(3, 1, 0), sys(0)]);
    h.cpu.gpr[1] = 0x1002;
    let (_, exit) = h.step();
    assert_eq!(
        exit,
        TbExit::Fault {
            fault: MemFault::Misaligned { addr: 0x1002, size: 4 },
            pc: 0x104,
            extra: 0,
        }
    );
}

// -- Delay slots --------------------------------------------

#[test]
fn jump_executes_two_delay_slots() {
    let mut h = Harness::new(&[j(16), addi(1, 0, 1), addi(2, 0, 2), addi(3, 0, 3)]);
    let (info, exit) = h.step();
    assert_eq!(info.icount, 3);
    assert_eq!(info.size, 12);
    assert_eq!(exit, TbExit::Exit(TB_EXIT_IDX1));
    assert_eq!(h.cpu.pc, 0x140);
    assert_eq!((h.cpu.gpr[1], h.cpu.gpr[2], h.cpu.gpr[3]), (1, 2, 0));
    assert_eq!(h.cpu.flags & TB_FLAGS_DELAY_MASK, 0);
}

#[test]
fn backward_jump_offset_is_signed() {
    let mut h = Harness::new(&[j(-0x10), nop(), nop()]);
    h.step();
    assert_eq!(h.cpu.pc, BASE - 0x40);
}

#[test]
fn jal_links_past_delay_slots() {
    let mut h = Harness::new(&[jal(8), nop(), nop()]);
    h.step();
    assert_eq!(h.cpu.gpr[9], BASE + 12);
    assert_eq!(h.cpu.pc, BASE + 0x20);
}

#[test]
fn jalr_reads_target_before_linking() {
    let mut h = Harness::new(&[jalr(9), nop(), nop()]);
    h.cpu.gpr[9] = 0x300;
    let (_, exit) = h.step();
    assert_eq!(exit, TbExit::Exit(TB_EXIT_NOCHAIN));
    assert_eq!(h.cpu.pc, 0x300);
    assert_eq!(h.cpu.gpr[9], BASE + 12);
}

#[test]
fn register_jump() {
    let mut h = Harness::new(&[jr(5), addi(1, 0, 1), nop()]);
    h.cpu.gpr[5] = 0x200;
    h.step();
    assert_eq!(h.cpu.pc, 0x200);
    assert_eq!(h.cpu.npc, 0x200);
    assert_eq!(h.cpu.gpr[1], 1);
}

#[test]
fn conditional_branch_follows_flag() {
    for (flag, taken, expect) in [(1, true, BASE + 0x20), (0, true, BASE + 12), (0, false, BASE + 0x20)] {
        let insn = if taken { bf(8) } else { bnf(8) };
        let mut h = Harness::new(&[insn, nop(), nop()]);
        h.cpu.sr_f = flag;
        let (info, exit) = h.step();
        assert_eq!(info.icount, 3);
        assert_eq!(exit, TbExit::Exit(TB_EXIT_NOCHAIN));
        assert_eq!(h.cpu.pc, expect, "flag {flag}, bf {taken}");
    }
}

#[test]
fn delay_window_spans_tbs() {
    let mut h = Harness::new(&[j(16), addi(1, 0, 1), addi(2, 0, 2)]);
    h.cfg.max_insns = 2;

    let (info, exit) = h.step();
    assert_eq!(info.icount, 2);
    assert_eq!(exit, TbExit::Exit(TB_EXIT_IDX0));
    assert_eq!(h.cpu.pc, 0x108);
    assert_eq!(h.cpu.flags & TB_FLAGS_DELAY_MASK, 1);
    assert_eq!(h.cpu.jmp_pc, 0x140);

    let (info, exit) = h.step();
    assert_eq!(info.icount, 1);
    assert_eq!(exit, TbExit::Exit(TB_EXIT_NOCHAIN));
    assert_eq!(h.cpu.pc, 0x140);
    assert_eq!(h.cpu.flags & TB_FLAGS_DELAY_MASK, 0);
    assert_eq!(h.cpu.gpr[2], 2);
}

#[test]
fn exception_in_delay_slot_records_countdown() {
    let mut h = Harness::new(&[j(16), nop(), sys(0)]);
    let (_, exit) = h.step();
    assert_eq!(
        exit,
        TbExit::Exception {
            index: EXCP_SYSCALL,
            pc: 0x108,
            extra: 1,
        }
    );
}

// -- TB limits ----------------------------------------------

#[test]
fn tb_stops_at_page_boundary() {
    let page_end = 1u32 << OR1K_PAGE_BITS;
    let mut h = Harness::with_ram(GuestRam::new(0, 0x4000), page_end - 4, &[nop(), nop()]);
    let (info, exit) = h.step();
    assert_eq!(info.icount, 1);
    assert_eq!(info.size, 4);
    assert_eq!(exit, TbExit::Exit(TB_EXIT_NOCHAIN));
    assert_eq!(h.cpu.pc, page_end);
}

#[test]
fn tb_stops_when_pc_wraps_to_zero() {
    let top = GuestRam::new(0xffff_e000, 0x2000);
    let mut h = Harness::with_ram(top, 0xffff_fffc, &[addi(1, 0, 7)]);
    let (info, exit) = h.step();
    assert_eq!(info.icount, 1);
    assert_eq!(info.size, 4);
    assert_eq!(exit, TbExit::Exit(TB_EXIT_NOCHAIN));
    assert_eq!(h.cpu.gpr[1], 7);
    assert_eq!(h.cpu.pc, 0);
}

#[test]
fn tb_respects_insn_limits() {
    let mut h = Harness::new(&[nop(); 5]);
    h.cfg.max_insns = 3;
    assert_eq!(h.translate().icount, 3);

    h.cfg.max_insns = 0;
    h.cfg.singlestep = true;
    assert_eq!(h.translate().icount, 1);
}

#[test]
fn retranslation_reuses_globals() {
    let mut h = Harness::new(&[add(3, 1, 2), sys(0)]);
    h.translate();
    let first = h.ir.num_ops();
    let globals = h.ir.nb_globals();
    h.translate();
    assert_eq!(h.ir.num_ops(), first);
    assert_eq!(h.ir.nb_globals(), globals);
}

#[test]
fn fetch_fault_on_first_insn_raises_ipf() {
    let mut h = Harness::new(&[]);
    h.cpu.pc = 0x8000;
    let (info, exit) = h.step();
    assert_eq!(info.icount, 1);
    assert!(matches!(exit, TbExit::Exception { index: EXCP_IPF, pc: 0x8000, .. }));
    assert_eq!(h.cpu.pc, 0x8000);
}

#[test]
fn fetch_fault_mid_tb_ends_tb_early() {
    let mut h = Harness::with_ram(GuestRam::new(0, 0x3000), 0x2ff8, &[nop(), nop()]);
    let (info, exit) = h.step();
    assert_eq!(info.icount, 2);
    assert_eq!(info.size, 8);
    assert_eq!(exit, TbExit::Exit(TB_EXIT_IDX0));
    assert_eq!(h.cpu.pc, 0x3000);
}

// -- System -------------------------------------------------

#[test]
fn illegal_opcode() {
    let mut h = Harness::new(&[nop(), 0xe800_0000, nop()]);
    let (info, exit) = h.step();
    assert_eq!(info.icount, 2);
    assert!(matches!(exit, TbExit::Exception { index: EXCP_ILLEGAL, pc: 0x104, .. }));
    assert_eq!(h.cpu.pc, 0x104);
}

#[test]
fn privileged_insns_fault_in_user_mode() {
    for insn in [mfspr(3, 0, SPR_SR as u16), mtspr(0, 1, SPR_EPCR0 as u16), rfe()] {
        let mut h = Harness::new(&[insn]).user_mode();
        let (_, exit) = h.step();
        assert!(
            matches!(exit, TbExit::Exception { index: EXCP_ILLEGAL, .. }),
            "{insn:#010x}: {exit:?}"
        );
    }
}

#[test]
fn trap_is_unprivileged() {
    let mut h = Harness::new(&[trap(1)]).user_mode();
    let (_, exit) = h.step();
    assert!(matches!(exit, TbExit::Exception { index: EXCP_TRAP, .. }));
}

#[test]
fn spr_access_in_supervisor_mode() {
    let mut h = Harness::new(&[mtspr(0, 1, SPR_EPCR0 as u16), nop()]);
    h.cpu.gpr[1] = 0x1234;
    let (info, exit) = h.step();
    // SPR writes end the TB with the pc already advanced.
    assert_eq!(info.icount, 1);
    assert_eq!(exit, TbExit::Exit(TB_EXIT_NOCHAIN));
    assert_eq!(h.cpu.pc, 0x104);
    assert_eq!(h.cpu.epcr, 0x1234);

    let mut h = Harness::new(&[mfspr(3, 0, SPR_SR as u16), sys(0)]);
    h.cpu.sr_f = 1;
    h.step();
    assert_eq!(h.cpu.gpr[3], SR_FO | SR_SM | SR_F);
}

#[test]
fn rfe_restores_context() {
    let mut h = Harness::new(&[rfe()]);
    h.cpu.epcr = 0x2000;
    h.cpu.esr = SR_FO;
    let (_, exit) = h.step();
    assert_eq!(exit, TbExit::Exit(TB_EXIT_NOCHAIN));
    assert_eq!(h.cpu.pc, 0x2000);
    assert!(!h.cpu.is_supervisor());
}

// -- Shifts, MAC unit and FPU -----------------------------

#[test]
fn shift_immediates() {
    let mut h = Harness::new(&[slli(3, 1, 4), srai(4, 2, 4), rori(5, 1, 4), sys(0)]);
    h.cpu.gpr[1] = 0x8000_0001;
    h.cpu.gpr[2] = 0x8000_0000;
    h.step();
    assert_eq!(h.cpu.gpr[3], 0x10);
    assert_eq!(h.cpu.gpr[4], 0xf800_0000);
    assert_eq!(h.cpu.gpr[5], 0x1800_0000);
}

#[test]
fn multiply_accumulate() {
    let mut h = Harness::new(&[mac(1, 2), mac(1, 2), msb(3, 3), macrc(4), sys(0)]);
    h.cpu.gpr[1] = (-3i32) as u32;
    h.cpu.gpr[2] = 5;
    h.cpu.gpr[3] = 2;
    h.step();
    assert_eq!(h.cpu.gpr[4], (-34i32) as u32);
    assert_eq!((h.cpu.machi, h.cpu.maclo), (0, 0));
}

#[test]
fn single_precision_add_and_compare() {
    let mut h = Harness::new(&[lf_add_s(3, 1, 2), lf_sflt_s(1, 3), sys(0)]);
    h.cpu.gpr[1] = 1.5f32.to_bits();
    h.cpu.gpr[2] = 2.25f32.to_bits();
    h.step();
    assert_eq!(f32::from_bits(h.cpu.gpr[3]), 3.75);
    assert_eq!(h.cpu.sr_f, 1);
}

// -- Debugging ----------------------------------------------

#[test]
fn breakpoint_stops_before_insn() {
    let mut h = Harness::new(&[addi(1, 0, 1), addi(2, 0, 2), nop()]);
    h.breakpoints.push(0x104);
    let (info, exit) = h.step();
    assert_eq!(info.icount, 2);
    assert_eq!(info.size, 8);
    assert_eq!(
        exit,
        TbExit::Exception {
            index: EXCP_DEBUG,
            pc: 0x104,
            extra: 0,
        }
    );
    assert_eq!(h.cpu.pc, 0x104);
    assert_eq!((h.cpu.gpr[1], h.cpu.gpr[2]), (1, 0));
}

#[test]
fn debug_singlestep_raises_after_each_insn() {
    let mut h = Harness::new(&[addi(1, 0, 1), addi(2, 0, 2)]);
    h.singlestep = true;
    let (info, exit) = h.step();
    assert_eq!(info.icount, 1);
    assert!(matches!(exit, TbExit::Exception { index: EXCP_DEBUG, .. }));
    assert_eq!(h.cpu.pc, 0x104);
    assert_eq!((h.cpu.gpr[1], h.cpu.gpr[2]), (1, 0));
}
