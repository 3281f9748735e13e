//! Rotate/mask and shift family: `RLWINM`/`RLDICL`/friends and the
//! algebraic/logical shift forms.

use super::{compute_mask, Translator, TranslationContext};
use crate::disassembler::{DecodedInstruction, OpcodeId};

pub fn translate(t: &mut Translator, ctx: &TranslationContext, instr: &DecodedInstruction) -> bool {
    use OpcodeId::*;
    let config = ctx.config;
    let op = &instr.operands;

    match instr.id {
        RLWINM | ROTLWI | CLRLWI => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let mask = compute_mask(op.mb as u32 + 32, op.me as u32 + 32);
            t.emit(format!(
                "{rd}.u64 = _rotl64({ra}.u32 | ({ra}.u64 << 32), {sh}) & {mask:#x}ull;",
                sh = op.sh
            ));
            maybe_cr0(t, config, instr, &rd);
        }
        ROTLW => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = _rotl32({ra}.u32, {rb}.u32 & 0x1F);"));
            maybe_cr0(t, config, instr, &rd);
        }
        RLWIMI => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let mask = compute_mask(op.mb as u32 + 32, op.me as u32 + 32);
            t.emit(format!(
                "{rd}.u64 = (_rotl64({ra}.u32 | ({ra}.u64 << 32), {sh}) & {mask:#x}ull) | ({rd}.u64 & ~{mask:#x}ull);",
                sh = op.sh
            ));
            maybe_cr0(t, config, instr, &rd);
        }
        RLDICL | CLRLDI => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let mask = compute_mask(op.mb as u32, 63);
            t.emit(format!("{rd}.u64 = _rotl64({ra}.u64, {sh}) & {mask:#x}ull;", sh = op.sh));
            maybe_cr0(t, config, instr, &rd);
        }
        RLDICR => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let mask = compute_mask(0, op.me as u32);
            t.emit(format!("{rd}.u64 = _rotl64({ra}.u64, {sh}) & {mask:#x}ull;", sh = op.sh));
            maybe_cr0(t, config, instr, &rd);
        }
        RLDIMI => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let mask = compute_mask(op.mb as u32, 63);
            t.emit(format!(
                "{rd}.u64 = (_rotl64({ra}.u64, {sh}) & {mask:#x}ull) | ({rd}.u64 & ~{mask:#x}ull);",
                sh = op.sh
            ));
            maybe_cr0(t, config, instr, &rd);
        }
        ROTLDI => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.emit(format!("{rd}.u64 = _rotl64({ra}.u64, {sh});", sh = op.sh));
            maybe_cr0(t, config, instr, &rd);
        }
        SRAD => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("uint32_t sh_amt = {rb}.u64 & 0x7F;"));
            t.emit(format!("uint64_t shifted_out = {ra}.u64 & ((sh_amt >= 64) ? 0xFFFFFFFFFFFFFFFFull : ((1ull << sh_amt) - 1));"));
            t.emit(format!("ctx.xer.ca = ({ra}.s64 < 0) && (shifted_out != 0) ? 1 : 0;"));
            t.emit(format!("{rd}.s64 = sh_amt >= 64 ? ({ra}.s64 < 0 ? -1 : 0) : {ra}.s64 >> sh_amt;"));
            maybe_cr0(t, config, instr, &rd);
        }
        SRADI => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let sh = op.sh;
            if sh == 0 {
                t.emit("ctx.xer.ca = 0;");
            } else {
                t.emit(format!("ctx.xer.ca = ({ra}.s64 < 0) && (({ra}.u64 & {mask:#x}ull) != 0) ? 1 : 0;", mask = (1u64 << sh) - 1));
            }
            t.emit(format!("{rd}.s64 = {ra}.s64 >> {sh};"));
            maybe_cr0(t, config, instr, &rd);
        }
        SRAW => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("uint32_t sh_amt = {rb}.u32 & 0x3F;"));
            t.emit(format!("uint32_t shifted_out = {ra}.u32 & ((sh_amt >= 32) ? 0xFFFFFFFFu : ((1u << sh_amt) - 1));"));
            t.emit(format!("ctx.xer.ca = ({ra}.s32 < 0) && (shifted_out != 0) ? 1 : 0;"));
            t.emit(format!("{rd}.s64 = sh_amt >= 32 ? ({ra}.s32 < 0 ? -1 : 0) : {ra}.s32 >> sh_amt;"));
            maybe_cr0(t, config, instr, &rd);
        }
        SRAWI => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let sh = op.sh;
            if sh == 0 {
                t.emit("ctx.xer.ca = 0;");
            } else {
                t.emit(format!("ctx.xer.ca = ({ra}.s32 < 0) && (({ra}.u32 & {mask:#x}u) != 0) ? 1 : 0;", mask = (1u32 << sh) - 1));
            }
            t.emit(format!("{rd}.s64 = {ra}.s32 >> {sh};"));
            maybe_cr0(t, config, instr, &rd);
        }
        SLD => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = ({rb}.u64 & 0x40) ? 0 : ({ra}.u64 << ({rb}.u64 & 0x3F));"));
            maybe_cr0(t, config, instr, &rd);
        }
        SLW => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = ({rb}.u32 & 0x20) ? 0 : ({ra}.u32 << ({rb}.u32 & 0x1F));"));
            maybe_cr0(t, config, instr, &rd);
        }
        SRD => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = ({rb}.u64 & 0x40) ? 0 : ({ra}.u64 >> ({rb}.u64 & 0x3F));"));
            maybe_cr0(t, config, instr, &rd);
        }
        SRW => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = ({rb}.u32 & 0x20) ? 0 : ({ra}.u32 >> ({rb}.u32 & 0x1F));"));
            maybe_cr0(t, config, instr, &rd);
        }
        CNTLZW => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.emit(format!("{rd}.u64 = {ra}.u32 == 0 ? 32 : __builtin_clz({ra}.u32);"));
            maybe_cr0(t, config, instr, &rd);
        }
        CNTLZD => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.emit(format!("{rd}.u64 = {ra}.u64 == 0 ? 64 : __builtin_clzll({ra}.u64);"));
            maybe_cr0(t, config, instr, &rd);
        }
        _ => return false,
    }
    true
}

fn maybe_cr0(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, dest: &str) {
    if instr.record {
        let cr0 = t.cr(config, 0);
        t.emit(format!("{cr0}.compare<int32_t>({dest}.s32, 0, ctx.xer);"));
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
    fn rlwinm_matches_literal_scenario() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::RLWINM, Operands { rd: 3, ra: 4, sh: 2, mb: 0, me: 29, ..Default::default() });
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        let mask = compute_mask(32, 61);
        assert_eq!(mask, 0xFFFFFFFFC);
        assert!(t.out.contains("_rotl64(ctx.r4.u32 | (ctx.r4.u64 << 32), 2)"));
        assert!(t.out.contains(&format!("{mask:#x}")));
        // Exactly one assignment statement emitted.
        assert_eq!(t.out.lines().count(), 1);
    }

    #[test_case::test_case(OpcodeId::SLD; "shift left doubleword")]
    #[test_case::test_case(OpcodeId::SRD; "shift right doubleword")]
    fn wide_shift_clears_on_full_width_shift_amount(id: OpcodeId) {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(id, Operands { rd: 3, ra: 4, rb: 5, ..Default::default() });
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        // A shift count with bit 0x40 set must force the result to zero
        // rather than relying on the host's shift-by->=width UB.
        assert!(t.out.contains("0x40"));
        assert!(t.out.contains("? 0 :"));
    }
}
