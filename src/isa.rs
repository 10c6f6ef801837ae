//! operation and encoding tables
//!
//! The instruction set is one data-driven table: each categorized
//! operation maps, per element family and per encoding scheme, to an
//! `InsDesc` holding the prefix fields the emitter needs. Operations
//! with no VEX form (the fp64 integer conversions, 64-bit arithmetic
//! right shifts) simply have no entry there and surface as
//! `Error::Unsupported` from the assembler.

use vecasm_encode::prefix::Map;
use vecasm_encode::prefix::Pp;
use vecasm_encode::reg::Width;


/// Element families
///
/// Following the fp32/fp64 suffix families of the underlying ISA: shift
/// and compare operations interpret the same lanes as 32/64-bit
/// integers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Elem {
    F32,
    F64,
}

impl Elem {
    #[inline]
    pub fn lane_bits(self) -> u32 {
        match self {
            Elem::F32 => 32,
            Elem::F64 => 64,
        }
    }

    #[inline]
    pub fn lane_bytes(self) -> u32 {
        self.lane_bits() / 8
    }
}


/// The categorized SIMD operations
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Op {
    // move
    Load,
    Store,
    LoadU,
    StoreU,
    Broadcast,

    // logic
    And,
    Andn,
    Or,
    Xor,

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    Sqrt,

    // compare
    Cmp,

    // convert
    CvtItoF,
    CvtFtoI,
    CvtTruncFtoI,
    Round,

    // shift
    Shl,
    ShrU,
    ShrS,
    ShlImm,
    ShrUImm,
    ShrSImm,
    ShlV,
    ShrUV,
    ShrSV,
}


/// Compare predicates (the vcmpps/vcmppd immediate)
///
/// Ge/Gt use the unordered-signaling complements (NLT_US/NLE_US) so a
/// NaN operand compares false, matching the ordered predicates.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum CmpOp {
    Eq    = 0x00,
    Lt    = 0x01,
    Le    = 0x02,
    Unord = 0x03,
    Ne    = 0x04,
    Ge    = 0x05,
    Gt    = 0x06,
    Ord   = 0x07,
}

/// Rounding modes (the vroundps/vrndscaleps immediate bits 1:0)
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum RoundMode {
    Nearest = 0,
    Down    = 1,
    Up      = 2,
    Zero    = 3,
}


/// Operand roles
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Form {
    /// reg=dst, rm=src, no vvvv
    Unary,
    /// reg=dst, vvvv=src1, rm=src2
    Nds,
    /// reg=/digit, vvvv=dst, rm=src, trailing imm8
    NddImm(u8),
}

/// EVEX compressed-disp8 tuple kinds
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Tuple {
    /// full vector memory operand: N = vector bytes
    Full,
    /// tuple-1-scalar (broadcast sources): N = element bytes
    Scalar,
    /// fixed 128-bit memory operand (shift counts): N = 16
    Mem128,
}

impl Tuple {
    pub fn n(self, width: Width, elem: Elem) -> u32 {
        match self {
            Tuple::Full => width.bytes(),
            Tuple::Scalar => elem.lane_bytes(),
            Tuple::Mem128 => 16,
        }
    }
}


/// One instruction-encoding descriptor
///
/// `w_vex` and `w_evex` are split because most packed-double opcodes are
/// VEX.WIG but EVEX.W1: the W bit distinguishes the 32/64-bit element
/// forms only under EVEX.
#[derive(Debug, Copy, Clone)]
pub struct InsDesc {
    pub pp: Pp,
    pub map: Map,
    pub opcode: u8,
    pub w_vex: bool,
    pub w_evex: bool,
    pub form: Form,
    pub tuple: Tuple,
}

const fn d(
    pp: Pp,
    map: Map,
    opcode: u8,
    w_vex: bool,
    w_evex: bool,
    form: Form,
    tuple: Tuple
) -> InsDesc {
    InsDesc { pp, map, opcode, w_vex, w_evex, form, tuple }
}

/// The encoding table
///
/// Returns None when the op/element combination has no instruction under
/// the requested encoding scheme.
pub fn desc(op: Op, elem: Elem, evex: bool) -> Option<InsDesc> {
    use Elem::*;
    use Form::*;
    use Map::*;
    use Op::*;
    use Pp::*;
    use Tuple::*;

    Some(match (op, elem) {
        // move
        (Load, F32)  => d(Np,  M0F, 0x28, false, false, Unary, Full),
        (Load, F64)  => d(P66, M0F, 0x28, false, true,  Unary, Full),
        (Store, F32) => d(Np,  M0F, 0x29, false, false, Unary, Full),
        (Store, F64) => d(P66, M0F, 0x29, false, true,  Unary, Full),
        (LoadU, F32)  => d(Np,  M0F, 0x10, false, false, Unary, Full),
        (LoadU, F64)  => d(P66, M0F, 0x10, false, true,  Unary, Full),
        (StoreU, F32) => d(Np,  M0F, 0x11, false, false, Unary, Full),
        (StoreU, F64) => d(P66, M0F, 0x11, false, true,  Unary, Full),
        (Broadcast, F32) => d(P66, M0F38, 0x18, false, false, Unary, Scalar),
        // no 128-bit vbroadcastsd: the assembler remaps X128 to vmovddup
        (Broadcast, F64) => d(P66, M0F38, 0x19, false, true, Unary, Scalar),

        // logic (the EVEX forms are AVX512DQ)
        (And, F32)  => d(Np,  M0F, 0x54, false, false, Nds, Full),
        (And, F64)  => d(P66, M0F, 0x54, false, true,  Nds, Full),
        (Andn, F32) => d(Np,  M0F, 0x55, false, false, Nds, Full),
        (Andn, F64) => d(P66, M0F, 0x55, false, true,  Nds, Full),
        (Or, F32)   => d(Np,  M0F, 0x56, false, false, Nds, Full),
        (Or, F64)   => d(P66, M0F, 0x56, false, true,  Nds, Full),
        (Xor, F32)  => d(Np,  M0F, 0x57, false, false, Nds, Full),
        (Xor, F64)  => d(P66, M0F, 0x57, false, true,  Nds, Full),

        // arithmetic
        (Add, F32) => d(Np,  M0F, 0x58, false, false, Nds, Full),
        (Add, F64) => d(P66, M0F, 0x58, false, true,  Nds, Full),
        (Mul, F32) => d(Np,  M0F, 0x59, false, false, Nds, Full),
        (Mul, F64) => d(P66, M0F, 0x59, false, true,  Nds, Full),
        (Sub, F32) => d(Np,  M0F, 0x5c, false, false, Nds, Full),
        (Sub, F64) => d(P66, M0F, 0x5c, false, true,  Nds, Full),
        (Min, F32) => d(Np,  M0F, 0x5d, false, false, Nds, Full),
        (Min, F64) => d(P66, M0F, 0x5d, false, true,  Nds, Full),
        (Div, F32) => d(Np,  M0F, 0x5e, false, false, Nds, Full),
        (Div, F64) => d(P66, M0F, 0x5e, false, true,  Nds, Full),
        (Max, F32) => d(Np,  M0F, 0x5f, false, false, Nds, Full),
        (Max, F64) => d(P66, M0F, 0x5f, false, true,  Nds, Full),
        (Sqrt, F32) => d(Np,  M0F, 0x51, false, false, Unary, Full),
        (Sqrt, F64) => d(P66, M0F, 0x51, false, true,  Unary, Full),

        // compare (under EVEX the destination is an opmask register)
        (Cmp, F32) => d(Np,  M0F, 0xc2, false, false, Nds, Full),
        (Cmp, F64) => d(P66, M0F, 0xc2, false, true,  Nds, Full),

        // convert
        (CvtItoF, F32)      => d(Np,  M0F, 0x5b, false, false, Unary, Full),
        (CvtFtoI, F32)      => d(P66, M0F, 0x5b, false, false, Unary, Full),
        (CvtTruncFtoI, F32) => d(PF3, M0F, 0x5b, false, false, Unary, Full),
        // the fp64/i64 conversions only exist under EVEX (AVX512DQ)
        (CvtItoF, F64) if evex      => d(PF3, M0F, 0xe6, false, true, Unary, Full),
        (CvtFtoI, F64) if evex      => d(P66, M0F, 0x7b, false, true, Unary, Full),
        (CvtTruncFtoI, F64) if evex => d(P66, M0F, 0x7a, false, true, Unary, Full),
        (CvtItoF, F64) | (CvtFtoI, F64) | (CvtTruncFtoI, F64) => return None,
        (Round, F32) => d(P66, M0F3A, 0x08, false, false, Unary, Full),
        (Round, F64) => d(P66, M0F3A, 0x09, false, true,  Unary, Full),

        // shift, count in the low 64 bits of an xmm or m128
        (Shl, F32)  => d(P66, M0F, 0xf2, false, false, Nds, Mem128),
        (Shl, F64)  => d(P66, M0F, 0xf3, false, true,  Nds, Mem128),
        (ShrU, F32) => d(P66, M0F, 0xd2, false, false, Nds, Mem128),
        (ShrU, F64) => d(P66, M0F, 0xd3, false, true,  Nds, Mem128),
        (ShrS, F32) => d(P66, M0F, 0xe2, false, false, Nds, Mem128),
        // vpsraq has no VEX form at all
        (ShrS, F64) if evex => d(P66, M0F, 0xe2, false, true, Nds, Mem128),
        (ShrS, F64) => return None,

        // shift by immediate (the 72/73 group, vvvv is the destination)
        (ShlImm, F32)  => d(P66, M0F, 0x72, false, false, NddImm(6), Full),
        (ShlImm, F64)  => d(P66, M0F, 0x73, false, true,  NddImm(6), Full),
        (ShrUImm, F32) => d(P66, M0F, 0x72, false, false, NddImm(2), Full),
        (ShrUImm, F64) => d(P66, M0F, 0x73, false, true,  NddImm(2), Full),
        (ShrSImm, F32) => d(P66, M0F, 0x72, false, false, NddImm(4), Full),
        (ShrSImm, F64) if evex => d(P66, M0F, 0x72, false, true, NddImm(4), Full),
        (ShrSImm, F64) => return None,

        // per-lane variable shift (these carry W under VEX too)
        (ShlV, F32)  => d(P66, M0F38, 0x47, false, false, Nds, Full),
        (ShlV, F64)  => d(P66, M0F38, 0x47, true,  true,  Nds, Full),
        (ShrUV, F32) => d(P66, M0F38, 0x45, false, false, Nds, Full),
        (ShrUV, F64) => d(P66, M0F38, 0x45, true,  true,  Nds, Full),
        (ShrSV, F32) => d(P66, M0F38, 0x46, false, false, Nds, Full),
        (ShrSV, F64) if evex => d(P66, M0F38, 0x46, false, true, Nds, Full),
        (ShrSV, F64) => return None,
    })
}

/// Mnemonic naming for errors, display and the disassembler
pub fn mnemonic(op: Op, elem: Elem, evex: bool) -> &'static str {
    match (op, elem) {
        (Op::Load, Elem::F32) | (Op::Store, Elem::F32) => "vmovaps",
        (Op::Load, Elem::F64) | (Op::Store, Elem::F64) => "vmovapd",
        (Op::LoadU, Elem::F32) | (Op::StoreU, Elem::F32) => "vmovups",
        (Op::LoadU, Elem::F64) | (Op::StoreU, Elem::F64) => "vmovupd",
        (Op::Broadcast, Elem::F32) => "vbroadcastss",
        (Op::Broadcast, Elem::F64) => "vbroadcastsd",

        (Op::And, Elem::F32) => "vandps",
        (Op::And, Elem::F64) => "vandpd",
        (Op::Andn, Elem::F32) => "vandnps",
        (Op::Andn, Elem::F64) => "vandnpd",
        (Op::Or, Elem::F32) => "vorps",
        (Op::Or, Elem::F64) => "vorpd",
        (Op::Xor, Elem::F32) => "vxorps",
        (Op::Xor, Elem::F64) => "vxorpd",

        (Op::Add, Elem::F32) => "vaddps",
        (Op::Add, Elem::F64) => "vaddpd",
        (Op::Sub, Elem::F32) => "vsubps",
        (Op::Sub, Elem::F64) => "vsubpd",
        (Op::Mul, Elem::F32) => "vmulps",
        (Op::Mul, Elem::F64) => "vmulpd",
        (Op::Div, Elem::F32) => "vdivps",
        (Op::Div, Elem::F64) => "vdivpd",
        (Op::Min, Elem::F32) => "vminps",
        (Op::Min, Elem::F64) => "vminpd",
        (Op::Max, Elem::F32) => "vmaxps",
        (Op::Max, Elem::F64) => "vmaxpd",
        (Op::Sqrt, Elem::F32) => "vsqrtps",
        (Op::Sqrt, Elem::F64) => "vsqrtpd",

        (Op::Cmp, Elem::F32) => "vcmpps",
        (Op::Cmp, Elem::F64) => "vcmppd",

        (Op::CvtItoF, Elem::F32) => "vcvtdq2ps",
        (Op::CvtItoF, Elem::F64) => "vcvtqq2pd",
        (Op::CvtFtoI, Elem::F32) => "vcvtps2dq",
        (Op::CvtFtoI, Elem::F64) => "vcvtpd2qq",
        (Op::CvtTruncFtoI, Elem::F32) => "vcvttps2dq",
        (Op::CvtTruncFtoI, Elem::F64) => "vcvttpd2qq",
        (Op::Round, Elem::F32) => if evex { "vrndscaleps" } else { "vroundps" },
        (Op::Round, Elem::F64) => if evex { "vrndscalepd" } else { "vroundpd" },

        (Op::Shl, Elem::F32) | (Op::ShlImm, Elem::F32) => "vpslld",
        (Op::Shl, Elem::F64) | (Op::ShlImm, Elem::F64) => "vpsllq",
        (Op::ShrU, Elem::F32) | (Op::ShrUImm, Elem::F32) => "vpsrld",
        (Op::ShrU, Elem::F64) | (Op::ShrUImm, Elem::F64) => "vpsrlq",
        (Op::ShrS, Elem::F32) | (Op::ShrSImm, Elem::F32) => "vpsrad",
        (Op::ShrS, Elem::F64) | (Op::ShrSImm, Elem::F64) => "vpsraq",
        (Op::ShlV, Elem::F32) => "vpsllvd",
        (Op::ShlV, Elem::F64) => "vpsllvq",
        (Op::ShrUV, Elem::F32) => "vpsrlvd",
        (Op::ShrUV, Elem::F64) => "vpsrlvq",
        (Op::ShrSV, Elem::F32) => "vpsravd",
        (Op::ShrSV, Elem::F64) => "vpsravq",
    }
}
