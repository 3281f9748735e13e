//! Integer ALU family: `ADD`, `SUBF`, bitwise ops, multiply/divide, sign
//! extension, and their immediate/carry-producing variants.
//!
//! Carry-producing forms compute the carry predicate from the unsigned
//! 32-bit operands *before* writing the destination, so that a destination
//! that aliases a source (e.g. `addze r3, r3`) still sees the pre-write
//! operand value. Forms that also consume the incoming carry (`ADDE`,
//! `ADDZE`, `SUBFE`) stage the new carry in `temp` and commit it to
//! `ctx.xer.ca` only after the destination write, so that write reads the
//! carry-in rather than the just-computed carry-out.

use super::{Translator, TranslationContext};
use crate::disassembler::{DecodedInstruction, OpcodeId};

pub fn translate(t: &mut Translator, ctx: &TranslationContext, instr: &DecodedInstruction) -> bool {
    use OpcodeId::*;
    let config = ctx.config;
    let op = &instr.operands;

    match instr.id {
        ADD => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = {ra}.u64 + {rb}.u64;"));
            maybe_cr0(t, config, instr, &rd);
        }
        ADDE => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.locals.temp = true;
            t.emit(format!(
                "temp = {ra}.u32 + {rb}.u32 + ctx.xer.ca < {ra}.u32 ? 1 : (({ra}.u32 + {rb}.u32 < {ra}.u32) ? 1 : 0);"
            ));
            t.emit(format!("{rd}.u64 = {ra}.u64 + {rb}.u64 + ctx.xer.ca;"));
            t.emit("ctx.xer.ca = temp;");
            maybe_cr0(t, config, instr, &rd);
        }
        ADDI => {
            let rd = t.gpr(config, op.rd);
            if op.ra == 0 {
                t.emit(format!("{rd}.s64 = {simm};", simm = op.simm));
            } else {
                let ra = t.gpr(config, op.ra);
                t.emit(format!("{rd}.s64 = {ra}.s64 + {simm};", simm = op.simm));
            }
        }
        ADDIC => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.emit(format!("ctx.xer.ca = {ra}.u32 + {simm}u > {ra}.u32 ? ({ra}.u32 > 0xFFFFFFFFu - {simm}u) : 0;", simm = op.simm as u32));
            t.emit(format!("{rd}.s64 = {ra}.s64 + {simm};", simm = op.simm));
        }
        ADDIS => {
            let rd = t.gpr(config, op.rd);
            let shifted = (op.simm as i64) << 16;
            if op.ra == 0 {
                t.emit(format!("{rd}.s64 = {shifted};"));
            } else {
                let ra = t.gpr(config, op.ra);
                t.emit(format!("{rd}.s64 = {ra}.s64 + {shifted};"));
            }
        }
        ADDZE => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.locals.temp = true;
            t.emit(format!("temp = ({ra}.u32 == 0xFFFFFFFF) & ctx.xer.ca;"));
            t.emit(format!("{rd}.u64 = {ra}.u64 + ctx.xer.ca;"));
            t.emit("ctx.xer.ca = temp;");
            maybe_cr0(t, config, instr, &rd);
        }
        AND => bin(t, config, instr, "&"),
        ANDC => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = {ra}.u64 & ~{rb}.u64;"));
            maybe_cr0(t, config, instr, &rd);
        }
        ANDI => bin_imm_u(t, config, instr, "&"),
        ANDIS => bin_imm_u_shifted(t, config, instr, "&"),
        NAND => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = ~({ra}.u64 & {rb}.u64);"));
            maybe_cr0(t, config, instr, &rd);
        }
        NEG => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.emit(format!("{rd}.s64 = -{ra}.s64;"));
            maybe_cr0(t, config, instr, &rd);
        }
        NOR => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = ~({ra}.u64 | {rb}.u64);"));
            maybe_cr0(t, config, instr, &rd);
        }
        NOT => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.emit(format!("{rd}.u64 = ~{ra}.u64;"));
            maybe_cr0(t, config, instr, &rd);
        }
        OR => bin(t, config, instr, "|"),
        ORC => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = {ra}.u64 | ~{rb}.u64;"));
            maybe_cr0(t, config, instr, &rd);
        }
        ORI => bin_imm_u(t, config, instr, "|"),
        ORIS => bin_imm_u_shifted(t, config, instr, "|"),
        SUBF => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = {rb}.u64 - {ra}.u64;"));
            maybe_cr0(t, config, instr, &rd);
        }
        SUBFC => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("ctx.xer.ca = {rb}.u32 >= {ra}.u32 ? 1 : 0;"));
            t.emit(format!("{rd}.u64 = {rb}.u64 - {ra}.u64;"));
            maybe_cr0(t, config, instr, &rd);
        }
        SUBFE => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.locals.temp = true;
            t.emit(format!(
                "temp = (uint64_t){rb}.u32 + (uint64_t)(~{ra}.u32) + ctx.xer.ca > 0xFFFFFFFFull ? 1 : 0;"
            ));
            t.emit(format!("{rd}.u64 = ~{ra}.u64 + {rb}.u64 + ctx.xer.ca;"));
            t.emit("ctx.xer.ca = temp;");
            maybe_cr0(t, config, instr, &rd);
        }
        SUBFIC => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.emit(format!("ctx.xer.ca = (uint32_t){simm} >= {ra}.u32 ? 1 : 0;", simm = op.simm));
            t.emit(format!("{rd}.s64 = {simm} - {ra}.s64;", simm = op.simm));
        }
        XOR => bin(t, config, instr, "^"),
        XORI => bin_imm_u(t, config, instr, "^"),
        XORIS => bin_imm_u_shifted(t, config, instr, "^"),
        MULHW => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.s64 = ((int64_t){ra}.s32 * (int64_t){rb}.s32) >> 32;"));
            maybe_cr0(t, config, instr, &rd);
        }
        MULHWU => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = ((uint64_t){ra}.u32 * (uint64_t){rb}.u32) >> 32;"));
            maybe_cr0(t, config, instr, &rd);
        }
        MULLD => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.s64 = {ra}.s64 * {rb}.s64;"));
            maybe_cr0(t, config, instr, &rd);
        }
        MULLI => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.emit(format!("{rd}.s64 = {ra}.s64 * {simm};", simm = op.simm));
        }
        MULLW => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.s64 = (int64_t){ra}.s32 * (int64_t){rb}.s32;"));
            maybe_cr0(t, config, instr, &rd);
        }
        DIVD => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.s64 = {rb}.s64 != 0 ? {ra}.s64 / {rb}.s64 : 0;"));
            maybe_cr0(t, config, instr, &rd);
        }
        DIVDU => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = {rb}.u64 != 0 ? {ra}.u64 / {rb}.u64 : 0;"));
            maybe_cr0(t, config, instr, &rd);
        }
        DIVW => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.s64 = {rb}.s32 != 0 ? (int64_t)({ra}.s32 / {rb}.s32) : 0;"));
            maybe_cr0(t, config, instr, &rd);
        }
        DIVWU => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("{rd}.u64 = {rb}.u32 != 0 ? (uint64_t)({ra}.u32 / {rb}.u32) : 0;"));
            maybe_cr0(t, config, instr, &rd);
        }
        EXTSB => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.emit(format!("{rd}.s64 = {ra}.s8;"));
            maybe_cr0(t, config, instr, &rd);
        }
        EXTSH => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.emit(format!("{rd}.s64 = {ra}.s16;"));
            maybe_cr0(t, config, instr, &rd);
        }
        EXTSW => {
            let rd = t.gpr(config, op.rd);
            let ra = t.gpr(config, op.ra);
            t.emit(format!("{rd}.s64 = {ra}.s32;"));
            maybe_cr0(t, config, instr, &rd);
        }
        _ => return false,
    }
    true
}

fn bin(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, op_sym: &str) {
    let op = &instr.operands;
    let rd = t.gpr(config, op.rd);
    let ra = t.gpr(config, op.ra);
    let rb = t.gpr(config, op.rb);
    t.emit(format!("{rd}.u64 = {ra}.u64 {op_sym} {rb}.u64;"));
    maybe_cr0(t, config, instr, &rd);
}

fn bin_imm_u(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, op_sym: &str) {
    let op = &instr.operands;
    let rd = t.gpr(config, op.rd);
    let ra = t.gpr(config, op.ra);
    t.emit(format!("{rd}.u64 = {ra}.u64 {op_sym} {uimm}u;", uimm = op.uimm));
}

fn bin_imm_u_shifted(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, op_sym: &str) {
    let op = &instr.operands;
    let rd = t.gpr(config, op.rd);
    let ra = t.gpr(config, op.ra);
    let shifted = (op.uimm as u64) << 16;
    t.emit(format!("{rd}.u64 = {ra}.u64 {op_sym} {shifted}ull;"));
}

/// `.`-suffixed ALU forms compare the 32-bit signed result against zero and
/// write CR0. `dest` is the already-resolved destination lvalue.
fn maybe_cr0(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, dest: &str) {
    if instr.record {
        let cr0 = t.cr(config, 0);
        t.emit(format!("{cr0}.compare<int32_t>({dest}.s32, 0, ctx.xer);"));
    }
}
