//! Function recompiler: drives [`crate::translator::Translator`] once per
//! function, in three passes — label discovery, linear emission, then
//! prologue finalization once the actual set of used shadows is known.

use std::collections::BTreeSet;

use crate::config::Config;
use crate::disassembler::{DecodedInstruction, Disassembler, OpcodeId};
use crate::image::{Function, Image};
use crate::switch_table::SwitchTableStore;
use crate::translator::{TranslationContext, Translator};

/// PowerPC word patterns that typically precede a computed-jump `mtctr`
/// sequence; used only for the missing-switch-table diagnostic.
const COMPUTED_JUMP_PRECURSORS: [u32; 2] = [0x07008038, 0x0000_0060];

/// Drives recompilation of one function's worth of instructions.
pub struct FunctionRecompiler<'a> {
    /// Instruction decoder.
    pub disassembler: &'a dyn Disassembler,
    /// Switch-table side channel.
    pub switch_tables: &'a SwitchTableStore,
    /// Resolves a guest address to a callable symbol name.
    pub resolve_symbol: &'a dyn Fn(u32) -> Option<&'a str>,
}

/// Result of recompiling one function.
pub struct RecompiledFunction {
    /// Full emitted C++ source for this function, including prologue.
    pub source: String,
    /// Whether every instruction in the function was recognized.
    pub fully_recognized: bool,
}

impl<'a> FunctionRecompiler<'a> {
    /// Recompile `function`, naming the emitted symbol `name`.
    pub fn recompile(
        &self,
        image: &dyn Image,
        function: Function,
        config: &Config,
        name: &str,
    ) -> RecompiledFunction {
        let labels = self.discover_labels(image, function);
        let mut t = Translator::default();
        let mut fully_recognized = true;
        let mut prev_word = 0u32;

        let translation_ctx = TranslationContext {
            config,
            function,
            resolve_symbol: self.resolve_symbol,
            switch_tables: self.switch_tables,
        };

        let mut addr = function.base;
        while addr < function.end() {
            if labels.contains(&addr) {
                t.emit(format!("loc_{addr:X}:"));
                t.on_label();
            }
            if let Some(table) = self.switch_tables.get(addr) {
                if t.armed_switch.is_none() {
                    t.armed_switch = Some(table.clone());
                }
            }

            let word = image.read_u32(addr).unwrap_or(0);
            match self.disassembler.decode(addr, word) {
                Some(instr) => {
                    self.diagnose_missing_switch_table(&t, &instr, prev_word);
                    if !t.translate(&translation_ctx, &instr) {
                        tracing::warn!(
                            address = addr,
                            mnemonic = instr.mnemonic,
                            "unrecognized instruction"
                        );
                        t.emit(format!("/* unrecognized: {} */", instr.mnemonic));
                        fully_recognized = false;
                    }
                }
                None => {
                    if word != 0 {
                        tracing::warn!(address = addr, word, "failed to disassemble instruction");
                    }
                    t.emit(format!("/* failed to disassemble 0x{word:08X} at 0x{addr:X} */"));
                    fully_recognized = false;
                }
            }
            prev_word = word;
            addr = addr.wrapping_add(4);
        }

        RecompiledFunction {
            source: render(name, &t),
            fully_recognized,
        }
    }

    fn diagnose_missing_switch_table(&self, t: &Translator, instr: &DecodedInstruction, prev_word: u32) {
        if instr.id == OpcodeId::BCTR
            && COMPUTED_JUMP_PRECURSORS.contains(&prev_word)
            && t.armed_switch.is_none()
        {
            tracing::error!(
                address = instr.address,
                prev_word,
                "BCTR follows a computed-jump setup pattern with no armed switch table"
            );
        }
    }

    /// Pass 1: scan every word in the function for intra-function branch
    /// targets plus any switch-table entry whose branch site falls in range.
    fn discover_labels(&self, image: &dyn Image, function: Function) -> BTreeSet<u32> {
        use OpcodeId::*;
        let mut labels = BTreeSet::new();
        let mut addr = function.base;
        while addr < function.end() {
            if let Some(word) = image.read_u32(addr) {
                if let Some(instr) = self.disassembler.decode(addr, word) {
                    let target = instr.operands.target;
                    if matches!(instr.id, B | BEQ | BNE | BGT | BGE | BLT | BLE | BDZ | BDNZ | BDNZF)
                        && function.contains(target)
                    {
                        labels.insert(target);
                    }
                }
            }
            addr = addr.wrapping_add(4);
        }
        for table in self.switch_tables.tables_in_range(function.base, function.end()) {
            for &label in &table.labels {
                if function.contains(label) {
                    labels.insert(label);
                }
            }
        }
        labels
    }
}

/// Pass 3: prepend the declaration block to the scratch body, wrapped in the
/// weak-function/prologue boilerplate.
fn render(name: &str, t: &Translator) -> String {
    let mut out = String::new();
    out.push_str(&format!("PPC_WEAK_FUNC({name})\n{{\n    PPC_FUNC_PROLOGUE();\n"));
    for decl in t.locals.declarations() {
        out.push_str("    ");
        out.push_str(&decl);
        out.push('\n');
    }
    for line in t.out.lines() {
        if line.ends_with(':') {
            out.push_str(line);
        } else {
            out.push_str("    ");
            out.push_str(line);
        }
        out.push('\n');
    }
    out.push_str("}\n");
    out
}

/// Default name for a function with no resolved symbol.
pub fn default_name(base: u32) -> String {
    format!("sub_{base:X}")
}
