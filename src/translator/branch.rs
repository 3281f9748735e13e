//! Branch and control family.
//!
//! Direct branches resolve statically to either an intra-function `goto` or
//! a call (the call always carries a logged `ERROR` comment when the
//! target has no matching symbol, per the branch-target-outside-function
//! row of the error taxonomy). `BCTR`/`BCTRL` consult the armed
//! switch-table entry; `BL`/`BCTRL` reset CSR state after the call since
//! the callee's flush mode is unknown to the caller.

use super::{Translator, TranslationContext};
use crate::config::Config;
use crate::disassembler::{DecodedInstruction, OpcodeId};

pub fn translate(t: &mut Translator, ctx: &TranslationContext, instr: &DecodedInstruction) -> bool {
    use OpcodeId::*;
    let config = ctx.config;
    let op = &instr.operands;

    match instr.id {
        B => {
            if ctx.function.contains(op.target) {
                t.emit(format!("goto loc_{:X};", op.target));
            } else {
                emit_direct_call(t, ctx, op.target, false);
                t.emit("return;");
            }
        }
        BL => {
            if let Some(special) = setjmp_longjmp(config, op.target) {
                emit_special_call(t, special);
            } else {
                emit_direct_call(t, ctx, op.target, true);
                record_return_address(t, config, instr);
            }
        }
        BLR => t.emit("return;"),
        BLRL => {
            tracing::warn!(address = instr.address, "BLRL is unimplemented; lowering to a trap");
            t.emit("__builtin_debugtrap();");
        }
        BCTR => emit_ctr_branch(t, ctx, instr, false),
        BCTRL => emit_ctr_branch(t, ctx, instr, true),
        BNECTR => {
            let cr = t.cr(config, op.crf_s);
            t.emit(format!("if (!{cr}.eq) {{"));
            emit_ctr_branch(t, ctx, instr, false);
            t.emit("}");
        }
        BEQ => emit_conditional_branch(t, ctx, instr, "eq", false),
        BNE => emit_conditional_branch(t, ctx, instr, "eq", true),
        BGT => emit_conditional_branch(t, ctx, instr, "gt", false),
        BGE => emit_conditional_branch(t, ctx, instr, "lt", true),
        BLT => emit_conditional_branch(t, ctx, instr, "lt", false),
        BLE => emit_conditional_branch(t, ctx, instr, "gt", true),
        BEQLR => emit_conditional_return(t, config, instr, "eq", false),
        BNELR => emit_conditional_return(t, config, instr, "eq", true),
        BGTLR => emit_conditional_return(t, config, instr, "gt", false),
        BGELR => emit_conditional_return(t, config, instr, "lt", true),
        BLTLR => emit_conditional_return(t, config, instr, "lt", false),
        BLELR => emit_conditional_return(t, config, instr, "gt", true),
        BDZ => emit_decrement_branch(t, ctx, instr, "==", None),
        BDZLR => {
            let ctr = if config.ctr_as_local_variable { "ctr".to_string() } else { "ctx.ctr".to_string() };
            if config.ctr_as_local_variable {
                t.locals.ctr = true;
            }
            t.emit(format!("{ctr}.u64--;"));
            t.emit(format!("if ({ctr}.u64 == 0) return;"));
        }
        BDNZ => emit_decrement_branch(t, ctx, instr, "!=", None),
        BDNZF => {
            tracing::debug!(
                address = instr.address,
                "BDNZF assumes the tested condition is eq; a full implementation \
                 would read the condition bit from the operand"
            );
            emit_decrement_branch(t, ctx, instr, "!=", Some(op.crf_s));
        }
        _ => return false,
    }
    true
}

enum Special {
    SetJmp,
    LongJmp,
}

fn setjmp_longjmp(config: &Config, target: u32) -> Option<Special> {
    if Some(target) == config.set_jmp_address {
        Some(Special::SetJmp)
    } else if Some(target) == config.long_jmp_address {
        Some(Special::LongJmp)
    } else {
        None
    }
}

fn emit_special_call(t: &mut Translator, special: Special) {
    t.locals.env = true;
    match special {
        Special::SetJmp => {
            t.emit("env = ctx;");
            t.emit("ctx.r3.s64 = setjmp(*reinterpret_cast<jmp_buf*>(base + ctx.r3.u32));");
            t.emit("if (ctx.r3.s64 != 0) { env.r3.s64 = ctx.r3.s64; ctx = env; }");
        }
        Special::LongJmp => {
            t.emit("longjmp(*reinterpret_cast<jmp_buf*>(base + ctx.r3.u32), ctx.r4.s32);");
        }
    }
    t.on_call();
}

/// Direct call lowering: resolves `target` to a symbol name via
/// `ctx.resolve_symbol`, emitting an `ERROR` comment instead when no symbol
/// matches (the emitted code is then a no-op at that call site).
fn emit_direct_call(t: &mut Translator, ctx: &TranslationContext, target: u32, is_linked: bool) {
    match (ctx.resolve_symbol)(target) {
        Some(name) => t.emit(format!("{name}(ctx, base);")),
        None => {
            tracing::error!(target, "no symbol for call target; emitting ERROR marker");
            t.emit(format!("/* ERROR: no symbol for call to 0x{target:X} */"));
        }
    }
    if is_linked {
        t.on_call();
    }
}

fn record_return_address(t: &mut Translator, config: &Config, instr: &DecodedInstruction) {
    if !config.skip_lr {
        t.emit(format!("ctx.lr = 0x{:X};", instr.address + 4));
    }
}

fn emit_ctr_branch(
    t: &mut Translator,
    ctx: &TranslationContext,
    instr: &DecodedInstruction,
    is_linked: bool,
) {
    let config = ctx.config;
    if let Some(table) = t.armed_switch.take() {
        let reg = t.gpr(config, table.r);
        t.emit(format!("switch ({reg}.u64) {{"));
        for (case, &label) in table.labels.iter().enumerate() {
            if ctx.function.contains(label) {
                t.emit(format!("case {case}: goto loc_{label:X};"));
            } else {
                tracing::error!(
                    branch_site = instr.address,
                    label,
                    "switch-table target outside enclosing function"
                );
                t.emit(format!("case {case}: __builtin_unreachable(); /* ERROR: target 0x{label:X} outside function */"));
            }
        }
        t.emit("default: __builtin_unreachable();");
        t.emit("}");
    } else {
        let ctr = if config.ctr_as_local_variable { "ctr".to_string() } else { "ctx.ctr".to_string() };
        if config.ctr_as_local_variable {
            t.locals.ctr = true;
        }
        t.emit(format!("PPC_CALL_INDIRECT_FUNC({ctr}.u32);"));
        if is_linked {
            record_return_address(t, config, instr);
            t.on_call();
        } else {
            t.emit("return;");
        }
    }
}

fn emit_conditional_branch(t: &mut Translator, ctx: &TranslationContext, instr: &DecodedInstruction, bit: &str, negate: bool) {
    let config = ctx.config;
    let op = &instr.operands;
    let cr = t.cr(config, op.crf_s);
    let cond = if negate { format!("!{cr}.{bit}") } else { format!("{cr}.{bit}") };
    if ctx.function.contains(op.target) {
        t.emit(format!("if ({cond}) goto loc_{:X};", op.target));
    } else {
        t.emit(format!("if ({cond}) {{"));
        emit_direct_call(t, ctx, op.target, false);
        t.emit("return;");
        t.emit("}");
    }
}

fn emit_conditional_return(t: &mut Translator, config: &Config, instr: &DecodedInstruction, bit: &str, negate: bool) {
    let op = &instr.operands;
    let cr = t.cr(config, op.crf_s);
    let cond = if negate { format!("!{cr}.{bit}") } else { format!("{cr}.{bit}") };
    t.emit(format!("if ({cond}) return;"));
}

fn emit_decrement_branch(
    t: &mut Translator,
    ctx: &TranslationContext,
    instr: &DecodedInstruction,
    cmp: &str,
    extra_cr_field: Option<u8>,
) {
    let config = ctx.config;
    let op = &instr.operands;
    let ctr = if config.ctr_as_local_variable { "ctr".to_string() } else { "ctx.ctr".to_string() };
    if config.ctr_as_local_variable {
        t.locals.ctr = true;
    }
    t.emit(format!("{ctr}.u64--;"));
    let ctr_cond = format!("{ctr}.u64 {cmp} 0");
    let full_cond = if let Some(crf) = extra_cr_field {
        let cr = t.cr(config, crf);
        format!("{ctr_cond} && !{cr}.eq")
    } else {
        ctr_cond
    };
    if ctx.function.contains(op.target) {
        t.emit(format!("if ({full_cond}) goto loc_{:X};", op.target));
    } else {
        t.emit(format!("if ({full_cond}) {{"));
        emit_direct_call(t, ctx, op.target, false);
        t.emit("return;");
        t.emit("}");
    }
}
