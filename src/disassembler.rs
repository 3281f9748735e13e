//! Decoded-instruction model.
//!
//! The disassembler itself is out of scope: given a word and its address it
//! is expected to hand back one of these. Only the shape is fixed here.

use strum::{Display, EnumString};

/// Dense opcode identifier, one variant per mnemonic family member named in
/// the instruction-translator contract.
#[allow(non_camel_case_types, missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum OpcodeId {
    // --- Integer ALU ---
    ADD, ADDE, ADDI, ADDIC, ADDIS, ADDZE, AND, ANDC, ANDI, ANDIS, NAND, NEG,
    NOR, NOT, OR, ORC, ORI, ORIS, SUBF, SUBFC, SUBFE, SUBFIC, XOR, XORI,
    XORIS, MULHW, MULHWU, MULLD, MULLI, MULLW, DIVD, DIVDU, DIVW, DIVWU,
    EXTSB, EXTSH, EXTSW,

    // --- Rotate / mask ---
    RLWINM, RLWIMI, RLDICL, RLDICR, RLDIMI, ROTLDI, ROTLW, ROTLWI, CLRLDI,
    CLRLWI, SRAD, SRADI, SRAW, SRAWI, SLD, SLW, SRD, SRW, CNTLZW, CNTLZD,

    // --- Compare ---
    CMPD, CMPDI, CMPLD, CMPLDI, CMPW, CMPWI, CMPLW, CMPLWI, FCMPU,

    // --- Branch / control ---
    B, BL, BLR, BLRL, BCTR, BCTRL, BNECTR, BEQ, BNE, BGT, BGE, BLT, BLE,
    BEQLR, BGELR, BGTLR, BLELR, BLTLR, BNELR, BDZ, BDZLR, BDNZ, BDNZF,

    // --- Integer memory ---
    LBZ, LBZU, LBZX, LHZ, LHZX, LHA, LHAX, LWZ, LWZU, LWZX, LWA, LWAX,
    LWBRX, LD, LDU, LDX, STB, STBU, STBX, STH, STHX, STHBRX, STW, STWU,
    STWUX, STWX, STWBRX, STD, STDU, STDX, LWARX, LDARX, STWCX_, STDCX_,

    // --- Floating point scalar ---
    LFD, LFDX, LFS, LFSX, STFD, STFDX, STFS, STFSX, STFIWX, FABS, FADD,
    FADDS, FCFID, FCTID, FCTIDZ, FCTIWZ, FDIV, FDIVS, FMADD, FMADDS, FMR,
    FMSUB, FMSUBS, FMUL, FMULS, FNABS, FNEG, FNMADDS, FNMSUB, FNMSUBS, FRES,
    FRSP, FSEL, FSQRT, FSQRTS, FSUB, FSUBS, MTFSF, MFFS,

    // --- VMX / AltiVec / VMX128 ---
    LVLX, LVRX, STVLX, STVRX, STVEWX, STVEHX, VADDFP, VSUBFP, VMULFP128,
    VMAXFP, VMINFP, VNMSUBFP, VMADDFP, VMADDCFP128, VMSUM3FP128, VMSUM4FP128,
    VADDUBM, VADDUHM, VADDUWM, VSUBUBM, VSUBUHM, VSUBUWM, VAVGSB, VAVGUB,
    VCMPEQFP, VCMPGEFP, VCMPGTFP, VCMPEQUW, VCMPBFP, VAND, VANDC, VOR, VXOR,
    VSEL, VSPLTB, VSPLTH, VSPLTW, VSPLTISB, VSPLTISH, VSPLTISW, VMRGHB,
    VMRGLB, VMRGHW, VMRGLW, VPKSHSS, VPKSHUS, VUPKHSB128, VUPKLSB128,
    VUPKHSH128, VUPKLSH128, VSLB, VSLH, VSLW, VSRB, VSRH, VSRW, VSRAW,
    VPERM, VRLIMI128, VREFP, VRSQRTEFP, VRFIM, VRFIN, VRFIZ, VEXPTEFP,
    VLOGEFP, VSLDOI, VCTSXS, VCFSX, VCFUX, VPKD3D128, VUPKD3D128,

    // --- Special registers / system ---
    MFCR, MTCR, MFOCRF, MFLR, MTLR, MFMSR, MTMSRD, MFTB, MTCTR, MTXER,

    // --- Barrier / no-ops ---
    EIEIO, LWSYNC, SYNC, DB16CYC, DCBF, DCBT, DCBTST, NOP, ATTN, CCTPL,
    CCTPM, TDLGEI, TDLLEI, TWI, TWLGEI, TWLLEI, DCBZ, DCBZL,
}

/// Named operand fields, mirroring the decoded-field layout a PowerPC
/// disassembler hands back. Unused fields for a given opcode are left at
/// their default (zero/false); which fields matter is opcode-specific and
/// owned by the translator family that handles that opcode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Operands {
    /// Destination GPR/FPR/VMX register index (`rD`/`frD`/`vD`).
    pub rd: u8,
    /// First source GPR/FPR/VMX register index (`rA`/`frA`/`vA`), also the
    /// base register for memory forms.
    pub ra: u8,
    /// Second source GPR/FPR/VMX register index (`rB`/`frB`/`vB`).
    pub rb: u8,
    /// Third source FPR/VMX register index (`frC`/`vC`), used by fused
    /// multiply-add forms.
    pub rc: u8,
    /// Signed immediate (`SIMM`, branch displacement after sign extension).
    pub simm: i32,
    /// Unsigned immediate (`UIMM`).
    pub uimm: u32,
    /// Rotate/mask start bit (`MB`).
    pub mb: u8,
    /// Rotate/mask end bit (`ME`).
    pub me: u8,
    /// Shift amount (`SH`).
    pub sh: u8,
    /// Destination CR field index (`crfD`/`BF`).
    pub crf_d: u8,
    /// Source CR field index (`crfS`).
    pub crf_s: u8,
    /// Branch condition/decrement selector (`BO`).
    pub bo: u8,
    /// Branch condition bit (`BI`).
    pub bi: u8,
    /// Absolute-address flag (`AA`).
    pub aa: bool,
    /// Link flag (`LK`): record the return address.
    pub lk: bool,
    /// VMX128 extension subfield, used by the D3D pack/unpack forms.
    pub vmx128_sub: u8,
    /// Special-purpose register number (`spr`), for `MTSPR`/`MFSPR` family.
    pub spr: u16,
    /// Absolute guest branch target, for the `B`/`BC` family. The decoder is
    /// expected to have already resolved `LI`/`BD` plus the `AA` bit against
    /// the instruction's own address, so this is always an absolute address,
    /// never a displacement.
    pub target: u32,
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Guest address of this instruction.
    pub address: u32,
    /// Raw big-endian instruction word, kept for diagnostics.
    pub raw: u32,
    /// Dense opcode id.
    pub id: OpcodeId,
    /// Mnemonic as the disassembler spells it, e.g. `"addi"` or `"rlwinm."`.
    pub mnemonic: &'static str,
    /// Whether the mnemonic carries the record (`.`) suffix.
    pub record: bool,
    /// Decoded operand fields.
    pub operands: Operands,
}

/// Given a word and its address, decodes one instruction.
///
/// Implementations are expected to apply the `VUPKHSB128`/`VUPKLSB128`
/// disassembler-quirk rewrite themselves (reinterpreting those opcodes as
/// `VUPKHSH128`/`VUPKLSH128` when the VMX128 subfield equals `0x60`) since
/// that correction belongs to decode, not translation.
pub trait Disassembler {
    /// Decode the instruction at `address`, or `None` if the word does not
    /// correspond to a recognized encoding.
    fn decode(&self, address: u32, word: u32) -> Option<DecodedInstruction>;
}
