//! Barrier, prefetch, and no-op family. Every one of these is either a
//! scheduling/cache hint meaningless to a single-threaded-per-core x86-64
//! translation (so it emits nothing) or a real zeroing operation (`DCBZ`,
//! `DCBZL`).

use super::{Translator, TranslationContext};
use crate::disassembler::{DecodedInstruction, OpcodeId};

pub fn translate(t: &mut Translator, ctx: &TranslationContext, instr: &DecodedInstruction) -> bool {
    use OpcodeId::*;
    let config = ctx.config;
    let op = &instr.operands;

    match instr.id {
        EIEIO | LWSYNC | SYNC | DB16CYC | DCBF | DCBT | DCBTST | NOP | ATTN | CCTPL | CCTPM
        | TDLGEI | TDLLEI | TWI | TWLGEI | TWLLEI => {
            // No observable effect on a single-threaded recompiled core.
        }
        DCBZ => {
            let ra = t.gpr_or_zero(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!(
                "memset(base + (({ra}.u32 + {rb}.u32) & ~0x1Fu), 0, 32);"
            ));
        }
        DCBZL => {
            let ra = t.gpr_or_zero(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!(
                "memset(base + (({ra}.u32 + {rb}.u32) & ~0x7Fu), 0, 128);"
            ));
        }
        _ => return false,
    }
    true
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
    fn sync_emits_nothing() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::SYNC, Operands::default());
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        assert_eq!(t.out, "");
    }

    #[test]
    fn dcbz_zeroes_an_aligned_window() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::DCBZ, Operands { ra: 3, rb: 4, ..Default::default() });
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        assert_eq!(t.out, "memset(base + ((ctx.r3.u32 + ctx.r4.u32) & ~0x1Fu), 0, 32);\n");
    }

    #[test]
    fn dcbzl_zeroes_a_128_byte_window() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::DCBZL, Operands { ra: 3, rb: 4, ..Default::default() });
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        assert_eq!(t.out, "memset(base + ((ctx.r3.u32 + ctx.r4.u32) & ~0x7Fu), 0, 128);\n");
    }

    #[test]
    fn unrecognized_opcode_is_rejected() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::ADD, Operands::default());
        assert!(!translate(&mut t, &ctx(&config, &tables), &i));
    }
}
