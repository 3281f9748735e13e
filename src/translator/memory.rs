//! Integer memory family: loads, stores, their update (`*U`) and
//! byte-reversed (`*BRX`) forms, and the `lwarx`/`stwcx.` reservation pair.
//!
//! Update forms stage the effective address through the `ea` local before
//! touching memory or the base register, so that `lwzu r3, 4(r3)` (the
//! destination aliasing the base) still computes the memory access from
//! the pre-update address.

use super::{Translator, TranslationContext};
use crate::config::Config;
use crate::disassembler::{DecodedInstruction, OpcodeId};

pub fn translate(t: &mut Translator, ctx: &TranslationContext, instr: &DecodedInstruction) -> bool {
    use OpcodeId::*;
    let config = ctx.config;
    let op = &instr.operands;

    match instr.id {
        LBZ => load(t, config, instr, Extend::Zero, "PPC_LOAD_U8", Disp::Imm(op.simm), false),
        LBZX => load(t, config, instr, Extend::Zero, "PPC_LOAD_U8", Disp::Reg(op.rb), false),
        LHZ => load(t, config, instr, Extend::Zero, "PPC_LOAD_U16", Disp::Imm(op.simm), false),
        LHZX => load(t, config, instr, Extend::Zero, "PPC_LOAD_U16", Disp::Reg(op.rb), false),
        LHA => load(t, config, instr, Extend::Sign16, "PPC_LOAD_U16", Disp::Imm(op.simm), false),
        LHAX => load(t, config, instr, Extend::Sign16, "PPC_LOAD_U16", Disp::Reg(op.rb), false),
        LWZ => load(t, config, instr, Extend::Zero, "PPC_LOAD_U32", Disp::Imm(op.simm), false),
        LWZU => load_update(t, config, instr, "PPC_LOAD_U32"),
        LWZX => load(t, config, instr, Extend::Zero, "PPC_LOAD_U32", Disp::Reg(op.rb), false),
        LWA => load(t, config, instr, Extend::Sign32, "PPC_LOAD_U32", Disp::Imm(op.simm), false),
        LWAX => load(t, config, instr, Extend::Sign32, "PPC_LOAD_U32", Disp::Reg(op.rb), false),
        LWBRX => load(t, config, instr, Extend::Zero, "PPC_LOAD_U32", Disp::Reg(op.rb), true),
        LD => load(t, config, instr, Extend::Zero, "PPC_LOAD_U64", Disp::Imm(op.simm), false),
        LDU => load_update(t, config, instr, "PPC_LOAD_U64"),
        LDX => load(t, config, instr, Extend::Zero, "PPC_LOAD_U64", Disp::Reg(op.rb), false),
        STB => store(t, config, instr, "u8", "PPC_STORE_U8", Disp::Imm(op.simm), false),
        STBX => store(t, config, instr, "u8", "PPC_STORE_U8", Disp::Reg(op.rb), false),
        STBU => store_update(t, config, instr, "u8", "PPC_STORE_U8"),
        STH => store(t, config, instr, "u16", "PPC_STORE_U16", Disp::Imm(op.simm), false),
        STHX => store(t, config, instr, "u16", "PPC_STORE_U16", Disp::Reg(op.rb), false),
        STHBRX => store(t, config, instr, "u16", "PPC_STORE_U16", Disp::Reg(op.rb), true),
        STW => store(t, config, instr, "u32", "PPC_STORE_U32", Disp::Imm(op.simm), false),
        STWU => store_update(t, config, instr, "u32", "PPC_STORE_U32"),
        STWUX => store_update_x(t, config, instr, "u32", "PPC_STORE_U32"),
        STWX => store(t, config, instr, "u32", "PPC_STORE_U32", Disp::Reg(op.rb), false),
        STWBRX => store(t, config, instr, "u32", "PPC_STORE_U32", Disp::Reg(op.rb), true),
        STD => store(t, config, instr, "u64", "PPC_STORE_U64", Disp::Imm(op.simm), false),
        STDU => store_update(t, config, instr, "u64", "PPC_STORE_U64"),
        STDX => store(t, config, instr, "u64", "PPC_STORE_U64", Disp::Reg(op.rb), false),
        LWARX => load_reserve(t, config, instr, "PPC_LOAD_U32"),
        LDARX => load_reserve(t, config, instr, "PPC_LOAD_U64"),
        STWCX_ => store_conditional(t, config, instr, "u32"),
        STDCX_ => store_conditional(t, config, instr, "u64"),
        _ => return false,
    }
    true
}

enum Disp {
    Imm(i32),
    Reg(u8),
}

fn effective_address(t: &mut Translator, config: &Config, base: u8, disp: &Disp) -> String {
    let base_is_zero = base == 0;
    match disp {
        Disp::Imm(simm) => {
            if base_is_zero {
                format!("{simm}")
            } else {
                let base_str = t.gpr(config, base);
                if *simm == 0 {
                    format!("{base_str}.u32")
                } else {
                    format!("({base_str}.u32 + {simm})")
                }
            }
        }
        Disp::Reg(rb) => {
            let rb_str = t.gpr(config, *rb);
            if base_is_zero {
                format!("{rb_str}.u32")
            } else {
                let base_str = t.gpr(config, base);
                format!("({base_str}.u32 + {rb_str}.u32)")
            }
        }
    }
}

/// How a loaded value widens into the destination's 64-bit cell. The
/// narrow accessor functions return narrow unsigned types; writing through
/// the wrong lane would leave the upper bits of the register stale instead
/// of zero/sign-extending, so every load always writes through `u64`/`s64`.
enum Extend {
    /// Unsigned load: plain zero-extension, no cast needed beyond the
    /// accessor's own return width.
    Zero,
    /// `LHA`/`LHAX`: sign-extend a 16-bit load into the 64-bit cell.
    Sign16,
    /// `LWA`/`LWAX`: sign-extend a 32-bit load into the 64-bit cell.
    Sign32,
}

fn load(
    t: &mut Translator,
    config: &Config,
    instr: &DecodedInstruction,
    extend: Extend,
    accessor: &str,
    disp: Disp,
    byte_reverse_again: bool,
) {
    let op = &instr.operands;
    let rd = t.gpr(config, op.rd);
    let addr = effective_address(t, config, op.ra, &disp);
    let loaded = format!("{accessor}({addr})");
    let loaded = if byte_reverse_again {
        format!("__builtin_bswap32({loaded})")
    } else {
        loaded
    };
    match extend {
        Extend::Zero => t.emit(format!("{rd}.u64 = {loaded};")),
        Extend::Sign16 => t.emit(format!("{rd}.s64 = (int16_t){loaded};")),
        Extend::Sign32 => t.emit(format!("{rd}.s64 = (int32_t){loaded};")),
    }
}

fn load_update(t: &mut Translator, config: &Config, instr: &DecodedInstruction, accessor: &str) {
    let op = &instr.operands;
    t.locals.ea = true;
    let ra = t.gpr(config, op.ra);
    t.emit(format!("ea = {ra}.u32 + {simm};", simm = op.simm));
    let rd = t.gpr(config, op.rd);
    t.emit(format!("{rd}.u64 = {accessor}(ea);"));
    let ra = t.gpr(config, op.ra);
    t.emit(format!("{ra}.u64 = ea;"));
}

fn store(
    t: &mut Translator,
    config: &Config,
    instr: &DecodedInstruction,
    lane: &str,
    accessor: &str,
    disp: Disp,
    byte_reverse_again: bool,
) {
    let op = &instr.operands;
    let addr = effective_address(t, config, op.ra, &disp);
    let rd = t.gpr(config, op.rd);
    let value = if byte_reverse_again {
        match lane {
            "u16" => format!("__builtin_bswap16({rd}.{lane})"),
            _ => format!("__builtin_bswap32({rd}.{lane})"),
        }
    } else {
        format!("{rd}.{lane}")
    };
    t.emit(format!("{accessor}({addr}, {value});"));
}

fn store_update(t: &mut Translator, config: &Config, instr: &DecodedInstruction, lane: &str, accessor: &str) {
    let op = &instr.operands;
    t.locals.ea = true;
    let ra = t.gpr(config, op.ra);
    t.emit(format!("ea = {ra}.u32 + {simm};", simm = op.simm));
    let rd = t.gpr(config, op.rd);
    t.emit(format!("{accessor}(ea, {rd}.{lane});"));
    let ra = t.gpr(config, op.ra);
    t.emit(format!("{ra}.u64 = ea;"));
}

fn store_update_x(t: &mut Translator, config: &Config, instr: &DecodedInstruction, lane: &str, accessor: &str) {
    let op = &instr.operands;
    t.locals.ea = true;
    let ra = t.gpr(config, op.ra);
    let rb = t.gpr(config, op.rb);
    t.emit(format!("ea = {ra}.u32 + {rb}.u32;"));
    let rd = t.gpr(config, op.rd);
    t.emit(format!("{accessor}(ea, {rd}.{lane});"));
    let ra = t.gpr(config, op.ra);
    t.emit(format!("{ra}.u64 = ea;"));
}

fn load_reserve(t: &mut Translator, config: &Config, instr: &DecodedInstruction, accessor: &str) {
    let op = &instr.operands;
    t.locals.reserved = true;
    let addr = effective_address(t, config, op.ra, &Disp::Reg(op.rb));
    let reserved = if config.reserved_register_as_local_variable { "reserved".to_string() } else { "ctx.reserved".to_string() };
    let (ty, bswap) = match accessor {
        "PPC_LOAD_U32" => ("uint32_t", "__builtin_bswap32"),
        _ => ("uint64_t", "__builtin_bswap64"),
    };
    // `reserved` snapshots the raw host-endian bytes at the address; only
    // `rd` gets byte-swapped into guest numeric order.
    t.emit(format!("{reserved} = *reinterpret_cast<{ty}*>(base + {addr});"));
    let rd = t.gpr(config, op.rd);
    t.emit(format!("{rd}.u64 = {bswap}({reserved});"));
}

fn store_conditional(t: &mut Translator, config: &Config, instr: &DecodedInstruction, lane: &str) {
    let op = &instr.operands;
    t.locals.reserved = true;
    let addr = effective_address(t, config, op.ra, &Disp::Reg(op.rb));
    let reserved = if config.reserved_register_as_local_variable { "reserved".to_string() } else { "ctx.reserved".to_string() };
    let rd = t.gpr(config, op.rd);
    let (ty, bswap) = match lane {
        "u32" => ("uint32_t", "__builtin_bswap32"),
        _ => ("uint64_t", "__builtin_bswap64"),
    };
    t.emit(format!(
        "bool store_succeeded = __atomic_compare_exchange_n(reinterpret_cast<{ty}*>(base + {addr}), &{reserved}, {bswap}({rd}.{lane}), false, __ATOMIC_SEQ_CST, __ATOMIC_SEQ_CST);"
    ));
    let cr0 = t.cr(config, 0);
    t.emit(format!("{cr0}.lt = 0; {cr0}.gt = 0; {cr0}.eq = store_succeeded; {cr0}.so = ctx.xer.so;"));
}
