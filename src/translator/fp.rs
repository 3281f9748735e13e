//! Floating-point scalar family.
//!
//! Every opcode here first forces the CSR flush-mode tracker to `Fpu`
//! (flush-to-zero disabled); the single-precision variants round-trip
//! through `float` explicitly since the context only stores `double`.

use super::{Translator, TranslationContext};
use crate::csr::CsrState;
use crate::disassembler::{DecodedInstruction, OpcodeId};

pub fn translate(t: &mut Translator, ctx: &TranslationContext, instr: &DecodedInstruction) -> bool {
    use OpcodeId::*;
    let config = ctx.config;
    let op = &instr.operands;
    t.ensure_csr(CsrState::Fpu);

    match instr.id {
        LFD => {
            let fd = t.fpr(config, op.rd);
            let addr = disp_address(t, config, op.ra, op.simm);
            t.emit(format!("{fd}.u64 = PPC_LOAD_U64({addr});"));
        }
        LFDX => {
            let fd = t.fpr(config, op.rd);
            let addr = reg_address(t, config, op.ra, op.rb);
            t.emit(format!("{fd}.u64 = PPC_LOAD_U64({addr});"));
        }
        LFS => {
            t.locals.temp = true;
            let addr = disp_address(t, config, op.ra, op.simm);
            t.emit(format!("temp = PPC_LOAD_U32({addr});"));
            let fd = t.fpr(config, op.rd);
            t.emit(format!("{fd}.f64 = *reinterpret_cast<float*>(&temp);"));
        }
        LFSX => {
            t.locals.temp = true;
            let addr = reg_address(t, config, op.ra, op.rb);
            t.emit(format!("temp = PPC_LOAD_U32({addr});"));
            let fd = t.fpr(config, op.rd);
            t.emit(format!("{fd}.f64 = *reinterpret_cast<float*>(&temp);"));
        }
        STFD => {
            let addr = disp_address(t, config, op.ra, op.simm);
            let fd = t.fpr(config, op.rd);
            t.emit(format!("PPC_STORE_U64({addr}, {fd}.u64);"));
        }
        STFDX => {
            let addr = reg_address(t, config, op.ra, op.rb);
            let fd = t.fpr(config, op.rd);
            t.emit(format!("PPC_STORE_U64({addr}, {fd}.u64);"));
        }
        STFS => {
            let addr = disp_address(t, config, op.ra, op.simm);
            let fd = t.fpr(config, op.rd);
            t.emit(format!("float stfs_tmp = (float){fd}.f64;"));
            t.emit(format!("PPC_STORE_U32({addr}, *reinterpret_cast<uint32_t*>(&stfs_tmp));"));
        }
        STFSX => {
            let addr = reg_address(t, config, op.ra, op.rb);
            let fd = t.fpr(config, op.rd);
            t.emit(format!("float stfsx_tmp = (float){fd}.f64;"));
            t.emit(format!("PPC_STORE_U32({addr}, *reinterpret_cast<uint32_t*>(&stfsx_tmp));"));
        }
        STFIWX => {
            let addr = reg_address(t, config, op.ra, op.rb);
            let fd = t.fpr(config, op.rd);
            t.emit(format!("PPC_STORE_U32({addr}, {fd}.u32);"));
        }
        FABS => unary(t, config, instr, |f| format!("fabs({f}.f64)")),
        FADD => binary(t, config, instr, "+"),
        FADDS => binary_single(t, config, instr, "+"),
        FCFID => {
            let fd = t.fpr(config, op.rd);
            let fb = t.fpr(config, op.rb);
            t.emit(format!("{fd}.f64 = (double)(int64_t){fb}.u64;"));
        }
        FCTID => round_to_int(t, config, instr, "s64", "rint"),
        FCTIDZ => round_to_int(t, config, instr, "s64", "trunc"),
        FCTIWZ => round_to_int(t, config, instr, "s32", "trunc"),
        FDIV => binary(t, config, instr, "/"),
        FDIVS => binary_single(t, config, instr, "/"),
        FMADD => fma(t, config, instr, false, false),
        FMADDS => fma(t, config, instr, false, true),
        FMR => {
            let fd = t.fpr(config, op.rd);
            let fb = t.fpr(config, op.rb);
            t.emit(format!("{fd}.f64 = {fb}.f64;"));
        }
        FMSUB => fma(t, config, instr, true, false),
        FMSUBS => fma(t, config, instr, true, true),
        FMUL => {
            let fd = t.fpr(config, op.rd);
            let fa = t.fpr(config, op.ra);
            let fc = t.fpr(config, op.rc);
            t.emit(format!("{fd}.f64 = {fa}.f64 * {fc}.f64;"));
        }
        FMULS => {
            let fd = t.fpr(config, op.rd);
            let fa = t.fpr(config, op.ra);
            let fc = t.fpr(config, op.rc);
            t.emit(format!("{fd}.f64 = (float)({fa}.f64 * {fc}.f64);"));
        }
        FNABS => unary(t, config, instr, |f| format!("-fabs({f}.f64)")),
        FNEG => unary(t, config, instr, |f| format!("-{f}.f64")),
        FNMADDS => {
            let fd = t.fpr(config, op.rd);
            let fa = t.fpr(config, op.ra);
            let fb = t.fpr(config, op.rb);
            let fc = t.fpr(config, op.rc);
            t.emit(format!("{fd}.f64 = -(float)({fa}.f64 * {fc}.f64 + {fb}.f64);"));
        }
        FNMSUB => {
            let fd = t.fpr(config, op.rd);
            let fa = t.fpr(config, op.ra);
            let fb = t.fpr(config, op.rb);
            let fc = t.fpr(config, op.rc);
            t.emit(format!("{fd}.f64 = -({fa}.f64 * {fc}.f64 - {fb}.f64);"));
        }
        FNMSUBS => {
            let fd = t.fpr(config, op.rd);
            let fa = t.fpr(config, op.ra);
            let fb = t.fpr(config, op.rb);
            let fc = t.fpr(config, op.rc);
            t.emit(format!("{fd}.f64 = -(float)({fa}.f64 * {fc}.f64 - {fb}.f64);"));
        }
        FRES => unary(t, config, instr, |f| format!("1.0f / (float){f}.f64")),
        FRSP => unary(t, config, instr, |f| format!("(float){f}.f64")),
        FSEL => {
            let fd = t.fpr(config, op.rd);
            let fa = t.fpr(config, op.ra);
            let fb = t.fpr(config, op.rb);
            let fc = t.fpr(config, op.rc);
            t.emit(format!("{fd}.f64 = {fa}.f64 >= 0.0 ? {fc}.f64 : {fb}.f64;"));
        }
        FSQRT => unary(t, config, instr, |f| format!("sqrt({f}.f64)")),
        FSQRTS => unary(t, config, instr, |f| format!("(float)sqrt({f}.f64)")),
        FSUB => binary(t, config, instr, "-"),
        FSUBS => binary_single(t, config, instr, "-"),
        MTFSF => {
            let fb = t.fpr(config, op.rb);
            t.emit(format!("ctx.fpscr.loadFromHost({fb}.u64);"));
        }
        MFFS => {
            let fd = t.fpr(config, op.rd);
            t.emit(format!("{fd}.u64 = ctx.fpscr.storeFromGuest();"));
        }
        _ => return false,
    }
    true
}

fn disp_address(t: &mut Translator, config: &crate::config::Config, ra: u8, simm: i32) -> String {
    if ra == 0 {
        format!("{simm}")
    } else {
        let ra = t.gpr(config, ra);
        format!("({ra}.u32 + {simm})")
    }
}

fn reg_address(t: &mut Translator, config: &crate::config::Config, ra: u8, rb: u8) -> String {
    let rb = t.gpr(config, rb);
    if ra == 0 {
        format!("{rb}.u32")
    } else {
        let ra = t.gpr(config, ra);
        format!("({ra}.u32 + {rb}.u32)")
    }
}

fn unary(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, f: impl FnOnce(&str) -> String) {
    let op = &instr.operands;
    let fd = t.fpr(config, op.rd);
    let fb = t.fpr(config, op.rb);
    let expr = f(&fb);
    t.emit(format!("{fd}.f64 = {expr};"));
}

fn binary(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, op_sym: &str) {
    let op = &instr.operands;
    let fd = t.fpr(config, op.rd);
    let fa = t.fpr(config, op.ra);
    let fb = t.fpr(config, op.rb);
    t.emit(format!("{fd}.f64 = {fa}.f64 {op_sym} {fb}.f64;"));
}

fn binary_single(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, op_sym: &str) {
    let op = &instr.operands;
    let fd = t.fpr(config, op.rd);
    let fa = t.fpr(config, op.ra);
    let fb = t.fpr(config, op.rb);
    t.emit(format!("{fd}.f64 = (float)((float){fa}.f64 {op_sym} (float){fb}.f64);"));
}

fn round_to_int(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, dest_ty: &str, rounding: &str) {
    let op = &instr.operands;
    let fd = t.fpr(config, op.rd);
    let fb = t.fpr(config, op.rb);
    let max = if dest_ty == "s64" { "INT64_MAX" } else { "INT32_MAX" };
    t.emit(format!(
        "{fd}.u64 = {fb}.f64 > (double){max} ? (uint64_t){max} : (uint64_t)({rounding}({fb}.f64));"
    ));
}

fn fma(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, subtract: bool, single: bool) {
    let op = &instr.operands;
    let fd = t.fpr(config, op.rd);
    let fa = t.fpr(config, op.ra);
    let fb = t.fpr(config, op.rb);
    let fc = t.fpr(config, op.rc);
    let op_sym = if subtract { "-" } else { "+" };
    if single {
        t.emit(format!("{fd}.f64 = (float)((float){fa}.f64 * (float){fc}.f64 {op_sym} (float){fb}.f64);"));
    } else {
        t.emit(format!("{fd}.f64 = {fa}.f64 * {fc}.f64 {op_sym} {fb}.f64;"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::disassembler::Operands;
    use crate::image::Function;
    use crate::switch_table::SwitchTableStore;

    fn instr(id: OpcodeId, operands: Operands) -> DecodedInstruction {
        DecodedInstruction { address: 0x1000, raw: 0, id, mnemonic: "x", record: false, operands }
    }

    fn ctx<'a>(config: &'a Config, tables: &'a SwitchTableStore) -> TranslationContext<'a> {
        TranslationContext {
            config,
            function: Function { base: 0x1000, size: 0x100 },
            resolve_symbol: &|_| None,
            switch_tables: tables,
        }
    }

    #[test]
    fn fadd_emits_double_add() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::FADD, Operands { rd: 1, ra: 2, rb: 3, ..Default::default() });
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        assert!(t.out.contains("ctx.f1.f64 = ctx.f2.f64 + ctx.f3.f64;"));
    }

    #[test]
    fn first_fp_op_forces_mode_switch_once() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let a = instr(OpcodeId::FADD, Operands { rd: 4, ra: 5, rb: 6, ..Default::default() });
        let b = instr(OpcodeId::FADDS, Operands { rd: 1, ra: 2, rb: 3, ..Default::default() });
        assert!(translate(&mut t, &ctx(&config, &tables), &a));
        assert!(translate(&mut t, &ctx(&config, &tables), &b));
        let switches = t.out.matches("disableFlushMode").count();
        assert_eq!(switches, 1);
    }

    #[test]
    fn fctiwz_saturates_to_signed_max() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::FCTIWZ, Operands { rd: 1, rb: 2, ..Default::default() });
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        assert!(t.out.contains("INT32_MAX"));
    }
}
