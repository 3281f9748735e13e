//! Per-instruction translation: the core of the recompiler.
//!
//! [`Translator::translate`] is the single entry point the function
//! recompiler drives once per decoded instruction. Each opcode family lives
//! in its own submodule and is handed a `&mut Translator` plus the decoded
//! instruction; it appends statements to `Translator::out`, may mark local
//! shadows, may advance the CSR state, and returns whether it recognized
//! the opcode.

mod alu;
mod barrier;
mod branch;
mod compare;
mod fp;
mod memory;
mod rotate;
mod system;
mod vmx;

use crate::config::Config;
use crate::csr::CsrState;
use crate::disassembler::{DecodedInstruction, OpcodeId};
use crate::image::Function;
use crate::locals::{operand_name, RecompilerLocalVariables, RegClass};
use crate::switch_table::{SwitchTable, SwitchTableStore};

/// Read-only context for one function's worth of translation: the active
/// config, the function's own bounds (for switch-target validation), and a
/// symbol resolver for direct-call lowering.
pub struct TranslationContext<'a> {
    /// Active recompiler config.
    pub config: &'a Config,
    /// The function currently being recompiled.
    pub function: Function,
    /// Resolve a guest address to a callable symbol name, if any.
    pub resolve_symbol: &'a dyn Fn(u32) -> Option<&'a str>,
    /// Switch-table side channel.
    pub switch_tables: &'a SwitchTableStore,
}

/// Mutable per-function translation state threaded across one linear pass.
pub struct Translator {
    /// Accumulated emitted statements for the function body.
    pub out: String,
    /// Local-variable shadow usage recorded so far.
    pub locals: RecompilerLocalVariables,
    /// Tracked CSR (flush-mode) state.
    pub csr: CsrState,
    /// The switch-table entry armed for the next `BCTR`, if any.
    pub armed_switch: Option<SwitchTable>,
}

impl Default for Translator {
    fn default() -> Self {
        Translator {
            out: String::new(),
            locals: RecompilerLocalVariables::default(),
            csr: CsrState::Unknown,
            armed_switch: None,
        }
    }
}

impl Translator {
    /// Append one statement line.
    pub fn emit(&mut self, line: impl AsRef<str>) {
        self.out.push_str(line.as_ref());
        self.out.push('\n');
    }

    /// Resolve a GPR to its textual lvalue, recording shadow use.
    pub fn gpr(&mut self, config: &Config, index: u8) -> String {
        operand_name(RegClass::Gpr, index, config, &mut self.locals)
    }

    /// Resolve a GPR operand that is read, applying the PowerPC "r0 reads as
    /// zero" rule used by `ADDI`/`ADDIS` and the base register of memory
    /// forms: index 0 elides the read entirely and becomes the literal `0`.
    pub fn gpr_or_zero(&mut self, config: &Config, index: u8) -> String {
        if index == 0 {
            "0".to_string()
        } else {
            self.gpr(config, index)
        }
    }

    /// Resolve an FPR to its textual lvalue, recording shadow use.
    pub fn fpr(&mut self, config: &Config, index: u8) -> String {
        operand_name(RegClass::Fpr, index, config, &mut self.locals)
    }

    /// Resolve a vector register to its textual lvalue, recording shadow use.
    pub fn vmx(&mut self, config: &Config, index: u8) -> String {
        operand_name(RegClass::Vmx, index, config, &mut self.locals)
    }

    /// Resolve a CR field to its textual lvalue, recording shadow use.
    pub fn cr(&mut self, config: &Config, index: u8) -> String {
        operand_name(RegClass::Cr, index, config, &mut self.locals)
    }

    /// Force the CSR state to `desired`, emitting the mode-switch statement
    /// only if it is not already known to be there.
    pub fn ensure_csr(&mut self, desired: CsrState) {
        if self.csr.needs_switch(desired) {
            match desired {
                CsrState::Fpu => self.emit("ctx.fpscr.disableFlushMode();"),
                CsrState::Vmx => self.emit("ctx.fpscr.enableFlushMode();"),
                CsrState::Unknown => unreachable!("never the desired state"),
            }
        }
        self.csr = desired;
    }

    /// A label was just emitted: join points invalidate the CSR assumption.
    pub fn on_label(&mut self) {
        self.csr.reset();
    }

    /// A call site was just emitted: same invalidation as a label.
    pub fn on_call(&mut self) {
        self.csr.reset();
    }

    /// Translate one decoded instruction, returning whether it was
    /// recognized. Unrecognized opcodes emit nothing; the function
    /// recompiler is responsible for logging and marking the function
    /// imperfect.
    pub fn translate(&mut self, ctx: &TranslationContext, instr: &DecodedInstruction) -> bool {
        use OpcodeId::*;
        let recognized = match instr.id {
            ADD | ADDE | ADDI | ADDIC | ADDIS | ADDZE | AND | ANDC | ANDI | ANDIS | NAND
            | NEG | NOR | NOT | OR | ORC | ORI | ORIS | SUBF | SUBFC | SUBFE | SUBFIC | XOR
            | XORI | XORIS | MULHW | MULHWU | MULLD | MULLI | MULLW | DIVD | DIVDU | DIVW
            | DIVWU | EXTSB | EXTSH | EXTSW => alu::translate(self, ctx, instr),

            RLWINM | RLWIMI | RLDICL | RLDICR | RLDIMI | ROTLDI | ROTLW | ROTLWI | CLRLDI
            | CLRLWI | SRAD | SRADI | SRAW | SRAWI | SLD | SLW | SRD | SRW | CNTLZW
            | CNTLZD => rotate::translate(self, ctx, instr),

            CMPD | CMPDI | CMPLD | CMPLDI | CMPW | CMPWI | CMPLW | CMPLWI | FCMPU => {
                compare::translate(self, ctx, instr)
            }

            B | BL | BLR | BLRL | BCTR | BCTRL | BNECTR | BEQ | BNE | BGT | BGE | BLT | BLE
            | BEQLR | BGELR | BGTLR | BLELR | BLTLR | BNELR | BDZ | BDZLR | BDNZ | BDNZF => {
                branch::translate(self, ctx, instr)
            }

            LBZ | LBZU | LBZX | LHZ | LHZX | LHA | LHAX | LWZ | LWZU | LWZX | LWA | LWAX
            | LWBRX | LD | LDU | LDX | STB | STBU | STBX | STH | STHX | STHBRX | STW
            | STWU | STWUX | STWX | STWBRX | STD | STDU | STDX | LWARX | LDARX | STWCX_
            | STDCX_ => memory::translate(self, ctx, instr),

            LFD | LFDX | LFS | LFSX | STFD | STFDX | STFS | STFSX | STFIWX | FABS | FADD
            | FADDS | FCFID | FCTID | FCTIDZ | FCTIWZ | FDIV | FDIVS | FMADD | FMADDS | FMR
            | FMSUB | FMSUBS | FMUL | FMULS | FNABS | FNEG | FNMADDS | FNMSUB | FNMSUBS
            | FRES | FRSP | FSEL | FSQRT | FSQRTS | FSUB | FSUBS | MTFSF | MFFS => {
                fp::translate(self, ctx, instr)
            }

            LVLX | LVRX | STVLX | STVRX | STVEWX | STVEHX | VADDFP | VSUBFP | VMULFP128
            | VMAXFP | VMINFP | VNMSUBFP | VMADDFP | VMADDCFP128 | VMSUM3FP128
            | VMSUM4FP128 | VADDUBM | VADDUHM | VADDUWM | VSUBUBM | VSUBUHM | VSUBUWM
            | VAVGSB | VAVGUB | VCMPEQFP | VCMPGEFP | VCMPGTFP | VCMPEQUW | VCMPBFP | VAND
            | VANDC | VOR | VXOR | VSEL | VSPLTB | VSPLTH | VSPLTW | VSPLTISB | VSPLTISH
            | VSPLTISW | VMRGHB | VMRGLB | VMRGHW | VMRGLW | VPKSHSS | VPKSHUS
            | VUPKHSB128 | VUPKLSB128 | VUPKHSH128 | VUPKLSH128 | VSLB | VSLH | VSLW | VSRB
            | VSRH | VSRW | VSRAW | VPERM | VRLIMI128 | VREFP | VRSQRTEFP | VRFIM | VRFIN
            | VRFIZ | VEXPTEFP | VLOGEFP | VSLDOI | VCTSXS | VCFSX | VCFUX | VPKD3D128
            | VUPKD3D128 => vmx::translate(self, ctx, instr),

            MFCR | MTCR | MFOCRF | MFLR | MTLR | MFMSR | MTMSRD | MFTB | MTCTR | MTXER => {
                system::translate(self, ctx, instr)
            }

            EIEIO | LWSYNC | SYNC | DB16CYC | DCBF | DCBT | DCBTST | NOP | ATTN | CCTPL
            | CCTPM | TDLGEI | TDLLEI | TWI | TWLGEI | TWLLEI | DCBZ | DCBZL => {
                barrier::translate(self, ctx, instr)
            }
        };

        if recognized && instr.record {
            self.audit_rc_bit();
        }
        recognized
    }

    /// Self-test: after emitting a `.`-suffixed instruction, the text since
    /// the last newline must reference `cr0` or `cr6`. This is a translator
    /// completeness check, not a runtime assertion, so a miss only logs.
    fn audit_rc_bit(&self) {
        let last_line = self.out.trim_end_matches('\n').rsplit('\n').next().unwrap_or("");
        if !last_line.contains("cr0") && !last_line.contains("cr6") {
            tracing::warn!(line = last_line, "RC-bit audit miss: no cr0/cr6 reference emitted");
        }
    }
}

/// The PowerPC mask helper shared by the rotate/mask family: bit `i` of the
/// result is 1 iff `i ∈ [mstart..mstop] mod 64`.
pub fn compute_mask(mstart: u32, mstop: u32) -> u64 {
    let mstart = mstart % 64;
    let mstop = mstop % 64;
    let value = (!0u64 >> mstart) ^ if mstop >= 63 { 0 } else { !0u64 >> (mstop + 1) };
    if mstart <= mstop {
        value
    } else {
        !value
    }
}
