//! End-to-end recompilation scenarios against a hand-rolled `Disassembler`
//! stub that decodes only the literal words these tests feed it, plus the
//! switch-table-consumption and file-partitioner-idempotence invariants.

use std::fs;

use ppc_recomp::config::Config;
use ppc_recomp::disassembler::{DecodedInstruction, Disassembler, OpcodeId, Operands};
use ppc_recomp::function::FunctionRecompiler;
use ppc_recomp::image::{Function, MemoryImage};
use ppc_recomp::output::OutputSink;
use ppc_recomp::switch_table::SwitchTableStore;

/// Decodes exactly the literal instruction words exercised below, mirroring
/// the wire format a real disassembler would hand back.
struct FixedDisassembler;

impl Disassembler for FixedDisassembler {
    fn decode(&self, address: u32, word: u32) -> Option<DecodedInstruction> {
        let simple = |id, operands| {
            Some(DecodedInstruction { address, raw: word, id, mnemonic: "x", record: false, operands })
        };
        match word {
            // ADD r3, r4, r5
            0x7C64_2A14 => simple(OpcodeId::ADD, Operands { rd: 3, ra: 4, rb: 5, ..Default::default() }),
            // ADDI r3, 0, 7
            0x3860_0007 => simple(OpcodeId::ADDI, Operands { rd: 3, ra: 0, simm: 7, ..Default::default() }),
            // RLWINM r3, r4, 2, 0, 29
            0x5464_1036 => {
                simple(OpcodeId::RLWINM, Operands { rd: 3, ra: 4, sh: 2, mb: 0, me: 29, ..Default::default() })
            }
            // LWZ r3, 0x10(r4)
            0x8064_0010 => simple(OpcodeId::LWZ, Operands { rd: 3, ra: 4, simm: 16, ..Default::default() }),
            // BCTR
            0x4E80_0420 => simple(OpcodeId::BCTR, Operands::default()),
            // FADD f4, f5, f6
            0xFC85_302A => simple(OpcodeId::FADD, Operands { rd: 4, ra: 5, rb: 6, ..Default::default() }),
            // FADDS f1, f2, f3
            0xEC22_182A => simple(OpcodeId::FADDS, Operands { rd: 1, ra: 2, rb: 3, ..Default::default() }),
            // BLR
            0x4E80_0020 => simple(OpcodeId::BLR, Operands::default()),
            _ => None,
        }
    }
}

fn recompile_words(words: &[u32], base: u32, tables: &SwitchTableStore) -> (String, bool) {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    let size = bytes.len() as u32;
    let image = MemoryImage::new(base, bytes, vec![], vec![]);
    let function = Function { base, size };
    let disassembler = FixedDisassembler;
    let recompiler = FunctionRecompiler {
        disassembler: &disassembler,
        switch_tables: tables,
        resolve_symbol: &|_| None,
    };
    let config = Config::default();
    let result = recompiler.recompile(&image, function, &config, "sub_test");
    (result.source, result.fully_recognized)
}

#[test]
fn scenario_1_add_is_a_plain_sum() {
    let tables = SwitchTableStore::empty();
    let (source, recognized) = recompile_words(&[0x7C64_2A14, 0x4E80_0020], 0x1000, &tables);
    assert!(recognized);
    assert!(source.contains("ctx.r3.u64 = ctx.r4.u64 + ctx.r5.u64;"));
}

#[test]
fn scenario_2_addi_elides_the_base_read_when_ra_is_zero() {
    let tables = SwitchTableStore::empty();
    let (source, recognized) = recompile_words(&[0x3860_0007, 0x4E80_0020], 0x1000, &tables);
    assert!(recognized);
    assert!(source.contains("ctx.r3.s64 = 7;"));
    assert!(!source.contains("ctx.r0"));
}

#[test]
fn scenario_3_rlwinm_emits_one_masked_rotate() {
    let tables = SwitchTableStore::empty();
    let (source, recognized) = recompile_words(&[0x5464_1036, 0x4E80_0020], 0x1000, &tables);
    assert!(recognized);
    assert!(source.contains("_rotl64(ctx.r4.u32 | (ctx.r4.u64 << 32), 2)"));
    assert!(source.contains("0xffffffffc"));
}

#[test]
fn scenario_4_lwz_loads_through_the_byte_swapping_accessor() {
    let tables = SwitchTableStore::empty();
    let (source, recognized) = recompile_words(&[0x8064_0010, 0x4E80_0020], 0x1000, &tables);
    assert!(recognized);
    assert!(source.contains("ctx.r3.u64 = PPC_LOAD_U32"));
    assert!(source.contains("ctx.r4.u32 + 16"));
}

#[test]
fn scenario_5_bctr_lowers_an_armed_switch_table_to_a_goto_switch() {
    let doc = "[[switch]]\nbase = 4096\nr = 3\nlabels = [4096, 4112, 4128]\n";
    let tables = SwitchTableStore::from_toml_str(doc).unwrap();
    // The function must span far enough to contain every switch target
    // (0x1000..=0x1020), so pad with recognized no-op-equivalent words.
    let words = [0x4E80_0420, 0x4E80_0020, 0x4E80_0020, 0x4E80_0020, 0x4E80_0020, 0x4E80_0020, 0x4E80_0020, 0x4E80_0020, 0x4E80_0020];
    let (source, recognized) = recompile_words(&words, 0x1000, &tables);
    assert!(recognized);
    assert!(source.contains("switch (ctx.r3.u64)"));
    assert!(source.contains("case 0: goto loc_1000;"));
    assert!(source.contains("case 1: goto loc_1010;"));
    assert!(source.contains("case 2: goto loc_1020;"));
    assert!(source.contains("default: __builtin_unreachable();"));
}

#[test]
fn bctr_with_no_armed_table_falls_back_to_an_indirect_call() {
    let tables = SwitchTableStore::empty();
    let (source, recognized) = recompile_words(&[0x4E80_0420], 0x1000, &tables);
    assert!(recognized);
    assert!(source.contains("PPC_CALL_INDIRECT_FUNC"));
}

#[test]
fn switch_table_consumption_is_single_use() {
    // A second BCTR in the same function, after the first consumed the
    // table, falls back to the indirect-call path instead of re-arming.
    let doc = "[[switch]]\nbase = 4096\nr = 3\nlabels = [4096]\n";
    let tables = SwitchTableStore::from_toml_str(doc).unwrap();
    let (source, _) = recompile_words(&[0x4E80_0420, 0x4E80_0420], 0x1000, &tables);
    assert_eq!(source.matches("switch (ctx.r3.u64)").count(), 1);
    assert!(source.contains("PPC_CALL_INDIRECT_FUNC"));
}

#[test]
fn scenario_6_back_to_back_fp_ops_emit_one_mode_switch() {
    let tables = SwitchTableStore::empty();
    let (source, recognized) =
        recompile_words(&[0xFC85_302A, 0xEC22_182A, 0x4E80_0020], 0x1000, &tables);
    assert!(recognized);
    assert_eq!(source.matches("ctx.fpscr.disableFlushMode();").count(), 1);
}

#[test]
fn unrecognized_word_is_marked_and_commented() {
    let tables = SwitchTableStore::empty();
    let (source, recognized) = recompile_words(&[0xFFFF_FFFF], 0x2000, &tables);
    assert!(!recognized);
    assert!(source.contains("failed to disassemble"));
}

#[test]
fn file_partitioner_idempotence_leaves_mtimes_unchanged_on_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();

    let mut sink = OutputSink::new(dir.path());
    sink.write_config_header(&config).unwrap();
    sink.push_function("PPC_WEAK_FUNC(sub_1000) {}\n").unwrap();
    sink.finish().unwrap();

    let config_path = dir.path().join("ppc_config.h");
    let partition_path = dir.path().join("ppc_recomp.0.cpp");
    let config_mtime = fs::metadata(&config_path).unwrap().modified().unwrap();
    let partition_mtime = fs::metadata(&partition_path).unwrap().modified().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(10));

    let mut sink = OutputSink::new(dir.path());
    sink.write_config_header(&config).unwrap();
    sink.push_function("PPC_WEAK_FUNC(sub_1000) {}\n").unwrap();
    sink.finish().unwrap();

    assert_eq!(fs::metadata(&config_path).unwrap().modified().unwrap(), config_mtime);
    assert_eq!(fs::metadata(&partition_path).unwrap().modified().unwrap(), partition_mtime);
}
