use tcg_core::dump::dump_ops;
use tcg_core::tb::{cflags, TranslationBlock, TB_HASH_SIZE};
use tcg_core::{Cond, Context, HelperResult, JumpCache, TempKind, Type, MAX_OPS_PER_INSN};

unsafe fn nop_helper(_env: *mut u8, _args: [u64; 4]) -> HelperResult {
    Ok(0)
}

#[test]
fn constants_are_deduplicated_per_type() {
    let mut ctx = Context::new();
    let a = ctx.new_const(Type::I32, 7);
    let b = ctx.new_const(Type::I32, 7);
    let c = ctx.new_const(Type::I64, 7);
    assert_eq!(a, b);
    assert_ne!(a, c);
    // Values are masked to the type width before lookup.
    assert_eq!(ctx.new_const(Type::I32, 0x1_0000_0007), a);
    assert_eq!(ctx.temp(a).kind, TempKind::Const);
}

#[test]
fn reset_keeps_globals_and_helpers() {
    let mut ctx = Context::new();
    let g = ctx.new_global(Type::I32, 0, "g");
    let h = ctx.register_helper("nop", nop_helper);
    let t = ctx.new_temp(Type::I32);
    ctx.gen_movi(Type::I32, t, 1);
    ctx.new_label();

    ctx.reset();
    assert_eq!(ctx.nb_globals(), 1);
    assert_eq!(ctx.nb_temps(), 1);
    assert!(ctx.is_global(g));
    assert_eq!(ctx.num_ops(), 0);
    assert!(ctx.labels().is_empty());
    assert_eq!(ctx.register_helper("nop", nop_helper), h);
    assert_eq!(ctx.helpers().len(), 1);
}

#[test]
#[should_panic(expected = "globals must be registered before locals")]
fn globals_after_locals_panic() {
    let mut ctx = Context::new();
    ctx.new_temp(Type::I32);
    ctx.new_global(Type::I32, 0, "late");
}

#[test]
fn op_buffer_reports_full_with_headroom() {
    let mut ctx = Context::with_op_buf_size(MAX_OPS_PER_INSN + 2);
    let t = ctx.new_temp(Type::I32);
    assert!(!ctx.op_buf_full());
    ctx.gen_movi(Type::I32, t, 0);
    ctx.gen_movi(Type::I32, t, 1);
    assert!(ctx.op_buf_full());
}

#[test]
fn labels_track_references_and_position() {
    let mut ctx = Context::new();
    let t = ctx.new_temp(Type::I32);
    let l = ctx.new_label();
    ctx.gen_brcond(Type::I32, t, t, Cond::Eq, l);
    assert!(!ctx.label(l).is_present());
    assert_eq!(ctx.label(l).refs, 1);
    ctx.gen_set_label(l);
    assert_eq!(ctx.label(l).position, Some(1));
}

#[test]
fn dump_names_ops_and_helpers() {
    let mut ctx = Context::new();
    let g = ctx.new_global(Type::I32, 0, "pc");
    let h = ctx.register_helper("nop", nop_helper);
    ctx.gen_insn_start(0x100, 0);
    ctx.gen_movi(Type::I32, g, 0x104);
    let ret = ctx.new_temp(Type::I32);
    ctx.gen_call(ret, h, &[g]);
    ctx.gen_exit_tb(2);

    let text = dump_ops(&ctx);
    assert!(text.contains("---- 0x00000100"), "{text}");
    assert!(text.contains("pc"), "{text}");
    assert!(text.contains(", nop"), "{text}");
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn tb_key_and_limits() {
    let tb = TranslationBlock::new(0x1000, 4, 0);
    assert!(tb.matches(0x1000, 4));
    assert!(!tb.matches(0x1000, 5));
    assert!(TranslationBlock::hash(0x1000, 4) < TB_HASH_SIZE);
    assert_eq!(TranslationBlock::max_insns(0), tcg_core::TCG_MAX_INSNS);
    assert_eq!(TranslationBlock::max_insns(3 | cflags::CF_SINGLE_STEP), 3);
}

#[test]
fn tb_chain_hints() {
    let tb = TranslationBlock::new(0x1000, 0, 0);
    assert_eq!(tb.jmp_dest(0), None);
    assert_eq!(tb.exit_target(), None);
    tb.set_jmp_dest(1, 7);
    tb.set_exit_target(3);
    assert_eq!(tb.jmp_dest(0), None);
    assert_eq!(tb.jmp_dest(1), Some(7));
    assert_eq!(tb.exit_target(), Some(3));
}

#[test]
fn jump_cache_is_direct_mapped() {
    let mut jc = JumpCache::new();
    jc.insert(0x1000, 5);
    assert_eq!(jc.lookup(0x1000), Some(5));
    jc.invalidate();
    assert_eq!(jc.lookup(0x1000), None);
}
