//! VMX / AltiVec / VMX128 family.
//!
//! Every vector op here first forces the CSR tracker to `Vmx` (flush
//! enabled). The whole-vector endian reversal performed by the load/store
//! opcodes is a global invariant of the emitted ABI: every opcode below is
//! written against that reversed layout (splats and permutes remap index
//! `i` to `N-1-i`, dot-product masks are rotated accordingly), not against
//! natural element order.

use super::{Translator, TranslationContext};
use crate::csr::CsrState;
use crate::disassembler::{DecodedInstruction, OpcodeId};

pub fn translate(t: &mut Translator, ctx: &TranslationContext, instr: &DecodedInstruction) -> bool {
    use OpcodeId::*;
    let config = ctx.config;
    let op = &instr.operands;
    t.ensure_csr(CsrState::Vmx);

    match instr.id {
        LVLX => {
            t.locals.ea = true;
            let ra = t.gpr_or_zero(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("ea = ({ra}.u32 + {rb}.u32) & ~0xF;"));
            let vd = t.vmx(config, op.rd);
            t.emit(format!(
                "{vd} = _mm_shuffle_epi8(_mm_loadu_si128(reinterpret_cast<const __m128i*>(base + ea)), VectorMaskL[({ra}.u32 + {rb}.u32) & 0xF]);"
            ));
        }
        LVRX => {
            t.locals.ea = true;
            let ra = t.gpr_or_zero(config, op.ra);
            let rb = t.gpr(config, op.rb);
            t.emit(format!("ea = ({ra}.u32 + {rb}.u32) & ~0xF;"));
            let vd = t.vmx(config, op.rd);
            t.emit(format!(
                "{vd} = (({ra}.u32 + {rb}.u32) & 0xF) == 0 ? _mm_setzero_si128() : _mm_shuffle_epi8(_mm_loadu_si128(reinterpret_cast<const __m128i*>(base + ea)), VectorMaskR[({ra}.u32 + {rb}.u32) & 0xF]);"
            ));
        }
        STVLX => {
            let ra = t.gpr_or_zero(config, op.ra);
            let rb = t.gpr(config, op.rb);
            let vd = t.vmx(config, op.rd);
            t.emit(format!(
                "for (uint32_t i = 0; i < 16 - (({ra}.u32 + {rb}.u32) & 0xF); i++) PPC_STORE_U8({ra}.u32 + {rb}.u32 + i, {vd}.u8[15 - i]);"
            ));
        }
        STVRX => {
            let ra = t.gpr_or_zero(config, op.ra);
            let rb = t.gpr(config, op.rb);
            let vd = t.vmx(config, op.rd);
            t.emit(format!(
                "for (uint32_t i = 0; i < (({ra}.u32 + {rb}.u32) & 0xF); i++) PPC_STORE_U8({ra}.u32 + {rb}.u32 - i - 1, {vd}.u8[i]);"
            ));
        }
        STVEWX => {
            let ra = t.gpr_or_zero(config, op.ra);
            let rb = t.gpr(config, op.rb);
            let vd = t.vmx(config, op.rd);
            t.emit(format!(
                "PPC_STORE_U32((({ra}.u32 + {rb}.u32) & ~3u), {vd}.u32[3 - ((({ra}.u32 + {rb}.u32) >> 2) & 3)]);"
            ));
        }
        STVEHX => {
            let ra = t.gpr_or_zero(config, op.ra);
            let rb = t.gpr(config, op.rb);
            let vd = t.vmx(config, op.rd);
            t.emit(format!(
                "PPC_STORE_U16((({ra}.u32 + {rb}.u32) & ~1u), {vd}.u16[7 - ((({ra}.u32 + {rb}.u32) >> 1) & 7)]);"
            ));
        }
        VADDFP => simd3(t, config, instr, "_mm_add_ps"),
        VSUBFP => simd3(t, config, instr, "_mm_sub_ps"),
        VMULFP128 => simd3(t, config, instr, "_mm_mul_ps"),
        VMAXFP => simd3(t, config, instr, "_mm_max_ps"),
        VMINFP => simd3(t, config, instr, "_mm_min_ps"),
        VNMSUBFP => {
            let vd = t.vmx(config, op.rd);
            let va = t.vmx(config, op.ra);
            let vb = t.vmx(config, op.rb);
            let vc = t.vmx(config, op.rc);
            t.emit(format!("{vd} = _mm_sub_ps(_mm_setzero_ps(), _mm_sub_ps(_mm_mul_ps({va}, {vc}), {vb}));"));
        }
        VMADDFP => {
            let vd = t.vmx(config, op.rd);
            let va = t.vmx(config, op.ra);
            let vb = t.vmx(config, op.rb);
            let vc = t.vmx(config, op.rc);
            t.emit(format!("{vd} = _mm_add_ps(_mm_mul_ps({va}, {vc}), {vb});"));
        }
        VMADDCFP128 => {
            let vd = t.vmx(config, op.rd);
            let va = t.vmx(config, op.ra);
            let vb = t.vmx(config, op.rb);
            let vc = t.vmx(config, op.rc);
            t.emit(format!("{vd} = _mm_add_ps(_mm_mul_ps({va}, {vc}), {vb});"));
        }
        VMSUM3FP128 => dot_product(t, config, instr, 0xEF),
        VMSUM4FP128 => dot_product(t, config, instr, 0xFF),
        VADDUBM => simd3(t, config, instr, "_mm_add_epi8"),
        VADDUHM => simd3(t, config, instr, "_mm_add_epi16"),
        VADDUWM => simd3(t, config, instr, "_mm_add_epi32"),
        VSUBUBM => simd3(t, config, instr, "_mm_sub_epi8"),
        VSUBUHM => simd3(t, config, instr, "_mm_sub_epi16"),
        VSUBUWM => simd3(t, config, instr, "_mm_sub_epi32"),
        VAVGSB => simd3(t, config, instr, "_mm_avg_epi8"),
        VAVGUB => simd3(t, config, instr, "_mm_avg_epu8"),
        VCMPEQFP => return compare(t, config, instr, "_mm_cmpeq_ps"),
        VCMPGEFP => return compare(t, config, instr, "_mm_cmpge_ps"),
        VCMPGTFP => return compare(t, config, instr, "_mm_cmpgt_ps"),
        VCMPEQUW => return compare(t, config, instr, "_mm_cmpeq_epi32"),
        VCMPBFP => {
            tracing::debug!(address = instr.address, "VCMPBFP is unimplemented");
            return false;
        }
        VAND => simd3(t, config, instr, "_mm_and_si128"),
        VANDC => {
            let vd = t.vmx(config, op.rd);
            let va = t.vmx(config, op.ra);
            let vb = t.vmx(config, op.rb);
            t.emit(format!("{vd} = _mm_andnot_si128({vb}, {va});"));
        }
        VOR => simd3(t, config, instr, "_mm_or_si128"),
        VXOR => simd3(t, config, instr, "_mm_xor_si128"),
        VSEL => {
            let vd = t.vmx(config, op.rd);
            let va = t.vmx(config, op.ra);
            let vb = t.vmx(config, op.rb);
            let vc = t.vmx(config, op.rc);
            t.emit(format!(
                "{vd} = _mm_or_si128(_mm_andnot_si128({vc}, {va}), _mm_and_si128({vc}, {vb}));"
            ));
        }
        VSPLTB => splat(t, config, instr, 16),
        VSPLTH => splat(t, config, instr, 8),
        VSPLTW => splat(t, config, instr, 4),
        VSPLTISB => splat_imm(t, config, instr, "epi8"),
        VSPLTISH => splat_imm(t, config, instr, "epi16"),
        VSPLTISW => splat_imm(t, config, instr, "epi32"),
        VMRGHB => simd3(t, config, instr, "_mm_unpacklo_epi8"),
        VMRGLB => simd3(t, config, instr, "_mm_unpackhi_epi8"),
        VMRGHW => simd3(t, config, instr, "_mm_unpacklo_epi32"),
        VMRGLW => simd3(t, config, instr, "_mm_unpackhi_epi32"),
        VPKSHSS => simd3(t, config, instr, "_mm_packs_epi16"),
        VPKSHUS => simd3(t, config, instr, "_mm_packus_epi16"),
        VUPKHSB128 => unpack(t, config, instr, true),
        VUPKLSB128 => unpack(t, config, instr, false),
        VUPKHSH128 => {
            let vd = t.vmx(config, op.rd);
            let vb = t.vmx(config, op.rb);
            t.emit(format!("{vd} = _mm_srai_epi32(_mm_unpacklo_epi16({vb}, {vb}), 16);"));
        }
        VUPKLSH128 => {
            let vd = t.vmx(config, op.rd);
            let vb = t.vmx(config, op.rb);
            t.emit(format!("{vd} = _mm_srai_epi32(_mm_unpackhi_epi16({vb}, {vb}), 16);"));
        }
        VSLB => shift(t, config, instr, "_mm_vsl", "epi8"),
        VSLH => shift(t, config, instr, "_mm_vsl", "epi16"),
        VSLW => shift(t, config, instr, "_mm_vsl", "epi32"),
        VSRB => shift(t, config, instr, "_mm_vsr", "epi8"),
        VSRH => shift(t, config, instr, "_mm_vsr", "epi16"),
        VSRW => shift(t, config, instr, "_mm_vsr", "epi32"),
        VSRAW => {
            let vd = t.vmx(config, op.rd);
            let va = t.vmx(config, op.ra);
            let vb = t.vmx(config, op.rb);
            t.emit(format!("{vd} = _mm_sra_epi32({va}, {vb});"));
        }
        VPERM => {
            let vd = t.vmx(config, op.rd);
            let va = t.vmx(config, op.ra);
            let vb = t.vmx(config, op.rb);
            let vc = t.vmx(config, op.rc);
            t.emit(format!("{vd} = _mm_perm_epi8_({va}, {vb}, {vc});"));
        }
        VRLIMI128 => {
            let vd = t.vmx(config, op.rd);
            let vb = t.vmx(config, op.rb);
            t.emit(format!(
                "{vd} = _mm_castps_si128(_mm_shuffle_ps(_mm_castsi128_ps({vb}), _mm_castsi128_ps({vb}), {imm}));",
                imm = op.uimm
            ));
        }
        VREFP => unary_ps(t, config, instr, |vb| format!("_mm_rcp_ps({vb})")),
        VRSQRTEFP => unary_ps(t, config, instr, |vb| format!("_mm_rsqrt_ps({vb})")),
        VRFIM => unary_ps(t, config, instr, |vb| format!("_mm_round_ps({vb}, _MM_FROUND_TO_NEG_INF)")),
        VRFIN => unary_ps(t, config, instr, |vb| format!("_mm_round_ps({vb}, _MM_FROUND_TO_NEAREST_INT)")),
        VRFIZ => unary_ps(t, config, instr, |vb| format!("_mm_round_ps({vb}, _MM_FROUND_TO_ZERO)")),
        VEXPTEFP => unary_ps(t, config, instr, |vb| format!("_mm_exp2_ps({vb})")),
        VLOGEFP => unary_ps(t, config, instr, |vb| format!("_mm_log2_ps({vb})")),
        VSLDOI => {
            let vd = t.vmx(config, op.rd);
            let va = t.vmx(config, op.ra);
            let vb = t.vmx(config, op.rb);
            t.emit(format!("{vd} = _mm_alignr_epi8({va}, {vb}, {sh});", sh = op.sh));
        }
        VCTSXS => {
            let vd = t.vmx(config, op.rd);
            let vb = t.vmx(config, op.rb);
            let scale = op.uimm;
            t.emit(format!(
                "{vd} = _mm_vctsxs(_mm_mul_ps({vb}, _mm_set1_ps((float)(1u << {scale}))));"
            ));
        }
        VCFSX => {
            let vd = t.vmx(config, op.rd);
            let vb = t.vmx(config, op.rb);
            let scale = op.uimm;
            t.emit(format!(
                "{vd} = _mm_castps_si128(_mm_div_ps(_mm_cvtepi32_ps({vb}), _mm_set1_ps((float)(1u << {scale}))));"
            ));
        }
        VCFUX => {
            let vd = t.vmx(config, op.rd);
            let vb = t.vmx(config, op.rb);
            let scale = op.uimm;
            t.emit(format!(
                "{vd} = _mm_castps_si128(_mm_div_ps(_mm_cvtepu32_ps_({vb}), _mm_set1_ps((float)(1u << {scale}))));"
            ));
        }
        VPKD3D128 => pack_d3d(t, config, instr),
        VUPKD3D128 => unpack_d3d(t, config, instr),
        _ => return false,
    }
    true
}

fn simd3(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, intrinsic: &str) {
    let op = &instr.operands;
    let vd = t.vmx(config, op.rd);
    let va = t.vmx(config, op.ra);
    let vb = t.vmx(config, op.rb);
    t.emit(format!("{vd} = {intrinsic}({va}, {vb});"));
}

fn compare(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, intrinsic: &str) -> bool {
    let op = &instr.operands;
    let vd = t.vmx(config, op.rd);
    let va = t.vmx(config, op.ra);
    let vb = t.vmx(config, op.rb);
    t.emit(format!("{vd} = {intrinsic}({va}, {vb});"));
    if instr.record {
        let cr6 = t.cr(config, 6);
        let vd = t.vmx(config, op.rd);
        t.emit(format!("{cr6}.setFromMask({vd}, 0xF);"));
    }
    true
}

fn unary_ps(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, f: impl FnOnce(&str) -> String) {
    let op = &instr.operands;
    let vd = t.vmx(config, op.rd);
    let vb = t.vmx(config, op.rb);
    let expr = f(&vb);
    t.emit(format!("{vd} = {expr};"));
}

/// Dot products are computed against the whole-vector-reversed layout, so
/// the lane mask is rotated relative to the natural element order: three
/// active lanes use `0xEF`, four use `0xFF`.
fn dot_product(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, mask: u8) {
    let op = &instr.operands;
    let vd = t.vmx(config, op.rd);
    let va = t.vmx(config, op.ra);
    let vb = t.vmx(config, op.rb);
    t.emit(format!("{vd} = _mm_dp_ps({va}, {vb}, {mask:#x});"));
}

fn splat(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, lane_count: u32) {
    let op = &instr.operands;
    let vd = t.vmx(config, op.rd);
    let vb = t.vmx(config, op.rb);
    // Reversed layout: element `i` lives at `lane_count - 1 - i`.
    let index = lane_count - 1 - (op.uimm % lane_count);
    t.emit(format!("{vd} = _mm_shuffle_epi8({vb}, _mm_set1_epi8((char){index}));"));
}

fn splat_imm(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, suffix: &str) {
    let op = &instr.operands;
    let vd = t.vmx(config, op.rd);
    t.emit(format!("{vd} = _mm_set1_{suffix}((int8_t){simm});", simm = op.simm));
}

fn unpack(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, high: bool) {
    let op = &instr.operands;
    let vd = t.vmx(config, op.rd);
    let vb = t.vmx(config, op.rb);
    let unpacker = if high { "_mm_unpacklo_epi8" } else { "_mm_unpackhi_epi8" };
    t.emit(format!("{vd} = _mm_srai_epi16({unpacker}({vb}, {vb}), 8);"));
}

fn shift(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction, intrinsic: &str, suffix: &str) {
    let op = &instr.operands;
    let vd = t.vmx(config, op.rd);
    let va = t.vmx(config, op.ra);
    let vb = t.vmx(config, op.rb);
    t.emit(format!("{vd} = {intrinsic}_{suffix}({va}, {vb});"));
}

fn pack_d3d(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction) {
    let op = &instr.operands;
    let vd = t.vmx(config, op.rd);
    let vb = t.vmx(config, op.rb);
    match op.vmx128_sub {
        0 => {
            t.emit(format!(
                "{vd} = _mm_shuffle_epi8(_mm_vctsxs({vb}), _mm_setr_epi8(12,8,4,0,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1));"
            ));
        }
        other => {
            tracing::debug!(address = instr.address, subfield = other, "unsupported VPKD3D128 subfield");
            t.emit("__builtin_debugtrap();");
        }
    }
}

fn unpack_d3d(t: &mut Translator, config: &crate::config::Config, instr: &DecodedInstruction) {
    let op = &instr.operands;
    let vd = t.vmx(config, op.rd);
    let vb = t.vmx(config, op.rb);
    match op.vmx128_sub {
        0 => {
            t.emit(format!(
                "{vd} = _mm_cvtepi32_ps(_mm_cvtepu8_epi32(_mm_shuffle_epi8({vb}, _mm_setr_epi8(3,2,1,0,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1,-1))));"
            ));
        }
        1 => {
            t.emit(format!(
                "{vd} = _mm_setr_ps(1.0f, 0.0f, (float)(int16_t){vb}.u16[1], (float)(int16_t){vb}.u16[0]);"
            ));
        }
        other => {
            tracing::debug!(address = instr.address, subfield = other, "unsupported VUPKD3D128 subfield");
            t.emit("__builtin_debugtrap();");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::disassembler::Operands;
    use crate::image::Function;
    use crate::switch_table::SwitchTableStore;

    fn instr(id: OpcodeId, operands: Operands, record: bool) -> DecodedInstruction {
        DecodedInstruction { address: 0x1000, raw: 0, id, mnemonic: "x", record, operands }
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
    fn vaddfp_forces_vmx_csr() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::VADDFP, Operands { rd: 1, ra: 2, rb: 3, ..Default::default() }, false);
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        assert!(t.out.contains("enableFlushMode"));
        assert!(t.out.contains("_mm_add_ps"));
    }

    #[test]
    fn record_bit_targets_cr6() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::VCMPEQFP, Operands { rd: 1, ra: 2, rb: 3, ..Default::default() }, true);
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        assert!(t.out.contains("cr6"));
    }

    #[test]
    fn vcmpbfp_is_unimplemented() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::VCMPBFP, Operands { rd: 1, ra: 2, rb: 3, ..Default::default() }, false);
        assert!(!translate(&mut t, &ctx(&config, &tables), &i));
    }

    #[test]
    fn vpkd3d128_unsupported_subfield_traps() {
        let config = Config::default();
        let tables = SwitchTableStore::empty();
        let mut t = Translator::default();
        let i = instr(OpcodeId::VPKD3D128, Operands { rd: 1, rb: 2, vmx128_sub: 2, ..Default::default() }, false);
        assert!(translate(&mut t, &ctx(&config, &tables), &i));
        assert!(t.out.contains("__builtin_debugtrap"));
    }
}
