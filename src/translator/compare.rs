//! Compare family: integer `CMP*` forms and the scalar-float `FCMPU`.
//!
//! All integer forms funnel through `cr[i].compare<T>(a, b, xer)`, varying
//! only in signedness, width, and whether the second operand is an
//! immediate or a register.

use super::{Translator, TranslationContext};
use crate::disassembler::{DecodedInstruction, OpcodeId};

pub fn translate(t: &mut Translator, ctx: &TranslationContext, instr: &DecodedInstruction) -> bool {
    use OpcodeId::*;
    let config = ctx.config;
    let op = &instr.operands;

    match instr.id {
        CMPD => {
            let rhs = t_rb(t, config, op.rb);
            compare(t, config, instr, "int64_t", rhs);
        }
        CMPDI => compare(t, config, instr, "int64_t", format!("{}", op.simm)),
        CMPLD => {
            let rhs = t_rb(t, config, op.rb);
            compare(t, config, instr, "uint64_t", rhs);
        }
        CMPLDI => compare(t, config, instr, "uint64_t", format!("{}u", op.uimm)),
        CMPW => {
            let rhs = t_rb(t, config, op.rb);
            compare(t, config, instr, "int32_t", rhs);
        }
        CMPWI => compare(t, config, instr, "int32_t", format!("{}", op.simm)),
        CMPLW => {
            let rhs = t_rb(t, config, op.rb);
            compare(t, config, instr, "uint32_t", rhs);
        }
        CMPLWI => compare(t, config, instr, "uint32_t", format!("{}u", op.uimm)),
        FCMPU => {
            let cr = t.cr(config, op.crf_d);
            let fa = t.fpr(config, op.ra);
            let fb = t.fpr(config, op.rb);
            t.emit(format!("{cr}.compare({fa}.f64, {fb}.f64);"));
        }
        _ => return false,
    }
    true
}

/// Resolve rB first so the borrow on `t` from `ra`/`crf_d` resolution below
/// does not overlap; returns the textual lvalue with its lane suffix.
fn t_rb(t: &mut Translator, config: &crate::config::Config, index: u8) -> String {
    format!("{}.u64", t.gpr(config, index))
}

fn compare(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, ty: &str, rhs: String) {
    let op = &instr.operands;
    let cr = t.cr(config, op.crf_d);
    let ra = t.gpr(config, op.ra);
    let lane = match ty {
        "int64_t" => "s64",
        "uint64_t" => "u64",
        "int32_t" => "s32",
        "uint32_t" => "u32",
        _ => unreachable!(),
    };
    // rhs already carries its own lane suffix when it names a register.
    let rhs = if rhs.ends_with(".u64") {
        format!("({ty})({rhs})")
    } else {
        rhs
    };
    t.emit(format!("{cr}.compare<{ty}>({ra}.{lane}, {rhs}, ctx.xer);"));
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
    fn cmpwi_emits_signed_32bit_compare() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::CMPWI, Operands { ra: 3, simm: 5, crf_d: 1, ..Default::default() });
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        assert_eq!(t.out, "ctx.cr1.compare<int32_t>(ctx.r3.s32, 5, ctx.xer);\n");
    }

    #[test]
    fn cmpld_emits_unsigned_64bit_compare_against_register() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::CMPLD, Operands { ra: 3, rb: 4, crf_d: 0, ..Default::default() });
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        assert_eq!(t.out, "ctx.cr0.compare<uint64_t>(ctx.r3.u64, (uint64_t)(ctx.r4.u64), ctx.xer);\n");
    }

    #[test]
    fn fcmpu_uses_two_arg_float_compare() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::FCMPU, Operands { ra: 1, rb: 2, crf_d: 0, ..Default::default() });
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        assert_eq!(t.out, "ctx.cr0.compare(ctx.f1.f64, ctx.f2.f64);\n");
    }
}
