//! the assembler: target selection, operand validation, quaded lowering
//!
//! One `Assembler` owns one output buffer and one target width. The
//! public operation methods validate operands, look the operation up in
//! the encoding table, and emit one instruction per part: a single
//! instruction on the hardware widths, four consecutive zmm instructions
//! on the quaded 2048-bit virtual width.

use crate::isa;
use crate::isa::CmpOp;
use crate::isa::Elem;
use crate::isa::Form;
use crate::isa::InsDesc;
use crate::isa::Op;
use crate::isa::RoundMode;
use vecasm_encode::error::Error;
use vecasm_encode::mem::Mem;
use vecasm_encode::prefix;
use vecasm_encode::prefix::Enc;
use vecasm_encode::prefix::Map;
use vecasm_encode::prefix::Pp;
use vecasm_encode::prefix::Rm;
use vecasm_encode::reg::Gpr;
use vecasm_encode::reg::KReg;
use vecasm_encode::reg::VReg;
use vecasm_encode::reg::Width;

use paste::paste;


/// Target widths
///
/// The runtime rendition of a build-time width configuration: X128/Y256
/// assume an AVX2-capable machine and emit VEX, Z512 assumes
/// AVX-512F+VL+DQ and emits EVEX, and Z2048 is the quaded virtual width
/// where every virtual register owns four consecutive zmm registers and
/// every operation expands to four 512-bit instructions.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Target {
    X128,
    Y256,
    Z512,
    Z2048,
}

impl Target {
    /// The per-part hardware width
    #[inline]
    pub fn width(self) -> Width {
        match self {
            Target::X128 => Width::X128,
            Target::Y256 => Width::Y256,
            Target::Z512 | Target::Z2048 => Width::Z512,
        }
    }

    #[inline]
    pub fn evex(self) -> bool {
        matches!(self, Target::Z512 | Target::Z2048)
    }

    /// Real instructions emitted per operation
    #[inline]
    pub fn parts(self) -> u8 {
        match self {
            Target::Z2048 => 4,
            _ => 1,
        }
    }

    /// Highest valid register index
    #[inline]
    pub fn reg_limit(self) -> u8 {
        match self {
            Target::X128 | Target::Y256 => 15,
            Target::Z512 => 31,
            Target::Z2048 => 7,
        }
    }

    /// Size of one (possibly virtual) vector in bytes
    #[inline]
    pub fn vec_bytes(self) -> u32 {
        match self {
            Target::X128 => 16,
            Target::Y256 => 32,
            Target::Z512 => 64,
            Target::Z2048 => 256,
        }
    }
}


/// A register or memory source operand
#[derive(Debug, Copy, Clone)]
pub enum Operand {
    Reg(VReg),
    Mem(Mem),
}

impl From<VReg> for Operand {
    fn from(r: VReg) -> Operand {
        Operand::Reg(r)
    }
}

impl From<Mem> for Operand {
    fn from(m: Mem) -> Operand {
        Operand::Mem(m)
    }
}


/// The instruction emitter
pub struct Assembler {
    target: Target,
    buf: Vec<u8>,
}

//// register/memory operand generation per quaded part ////

// mov ops come in one flavor per element family, so a plain macro
// covers the whole family
macro_rules! mov_ops {
    ($($suffix:ident => $elem:ident;)*) => { paste! { $(
        #[doc = concat!("Aligned register-register move (`vmovaps`-family, ", stringify!($suffix), " lanes).")]
        pub fn [<mov_ $suffix>](&mut self, d: VReg, s: VReg) -> Result<(), Error> {
            self.unary(Op::Load, Elem::$elem, d, Operand::Reg(s))
        }

        #[doc = concat!("Aligned vector load (", stringify!($suffix), " lanes).")]
        pub fn [<load_ $suffix>](&mut self, d: VReg, m: Mem) -> Result<(), Error> {
            self.unary(Op::Load, Elem::$elem, d, Operand::Mem(m))
        }

        #[doc = concat!("Unaligned vector load (", stringify!($suffix), " lanes).")]
        pub fn [<loadu_ $suffix>](&mut self, d: VReg, m: Mem) -> Result<(), Error> {
            self.unary(Op::LoadU, Elem::$elem, d, Operand::Mem(m))
        }

        #[doc = concat!("Aligned vector store (", stringify!($suffix), " lanes).")]
        pub fn [<store_ $suffix>](&mut self, m: Mem, s: VReg) -> Result<(), Error> {
            self.store(Op::Store, Elem::$elem, m, s)
        }

        #[doc = concat!("Unaligned vector store (", stringify!($suffix), " lanes).")]
        pub fn [<storeu_ $suffix>](&mut self, m: Mem, s: VReg) -> Result<(), Error> {
            self.store(Op::StoreU, Elem::$elem, m, s)
        }

        #[doc = concat!("Broadcast one ", stringify!($suffix), " element to every lane.")]
        pub fn [<broadcast_ $suffix>](&mut self, d: VReg, s: impl Into<Operand>) -> Result<(), Error> {
            self.broadcast(Elem::$elem, d, s.into())
        }
    )* } }
}

macro_rules! nds_ops {
    ($($name:ident => $op:ident, $doc:literal;)*) => { paste! { $(
        #[doc = concat!("Packed f32 ", $doc, ".")]
        pub fn [<$name _f32>](&mut self, d: VReg, a: VReg, b: impl Into<Operand>) -> Result<(), Error> {
            self.nds(Op::$op, Elem::F32, d, a, b.into())
        }

        #[doc = concat!("Packed f64 ", $doc, ".")]
        pub fn [<$name _f64>](&mut self, d: VReg, a: VReg, b: impl Into<Operand>) -> Result<(), Error> {
            self.nds(Op::$op, Elem::F64, d, a, b.into())
        }
    )* } }
}

macro_rules! unary_ops {
    ($($name:ident => $op:ident, $doc:literal;)*) => { paste! { $(
        #[doc = concat!("Packed f32 ", $doc, ".")]
        pub fn [<$name _f32>](&mut self, d: VReg, s: impl Into<Operand>) -> Result<(), Error> {
            self.unary(Op::$op, Elem::F32, d, s.into())
        }

        #[doc = concat!("Packed f64 ", $doc, ".")]
        pub fn [<$name _f64>](&mut self, d: VReg, s: impl Into<Operand>) -> Result<(), Error> {
            self.unary(Op::$op, Elem::F64, d, s.into())
        }
    )* } }
}

macro_rules! shift_ops {
    ($($name:ident => $op:ident / $immop:ident / $varop:ident, $doc:literal;)*) => { paste! { $(
        #[doc = concat!("32-bit lane ", $doc, " by a uniform count (low 64 bits of an xmm or m128).")]
        pub fn [<$name 32>](&mut self, d: VReg, s: VReg, count: impl Into<Operand>) -> Result<(), Error> {
            self.shift_uniform(Op::$op, Elem::F32, d, s, count.into())
        }

        #[doc = concat!("64-bit lane ", $doc, " by a uniform count (low 64 bits of an xmm or m128).")]
        pub fn [<$name 64>](&mut self, d: VReg, s: VReg, count: impl Into<Operand>) -> Result<(), Error> {
            self.shift_uniform(Op::$op, Elem::F64, d, s, count.into())
        }

        #[doc = concat!("32-bit lane ", $doc, " by an immediate.")]
        pub fn [<$name 32 _imm>](&mut self, d: VReg, s: VReg, imm: u8) -> Result<(), Error> {
            self.shift_imm(Op::$immop, Elem::F32, d, s, imm)
        }

        #[doc = concat!("64-bit lane ", $doc, " by an immediate.")]
        pub fn [<$name 64 _imm>](&mut self, d: VReg, s: VReg, imm: u8) -> Result<(), Error> {
            self.shift_imm(Op::$immop, Elem::F64, d, s, imm)
        }

        #[doc = concat!("Per-lane 32-bit ", $doc, ", one count per lane.")]
        pub fn [<$name 32 _var>](&mut self, d: VReg, s: VReg, counts: impl Into<Operand>) -> Result<(), Error> {
            self.nds(Op::$varop, Elem::F32, d, s, counts.into())
        }

        #[doc = concat!("Per-lane 64-bit ", $doc, ", one count per lane.")]
        pub fn [<$name 64 _var>](&mut self, d: VReg, s: VReg, counts: impl Into<Operand>) -> Result<(), Error> {
            self.nds(Op::$varop, Elem::F64, d, s, counts.into())
        }
    )* } }
}

impl Assembler {
    pub fn new(target: Target) -> Assembler {
        Assembler {
            target,
            buf: Vec::new(),
        }
    }

    #[inline]
    pub fn target(&self) -> Target {
        self.target
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    //// move ////

    mov_ops! {
        f32 => F32;
        f64 => F64;
    }

    //// logic ////

    nds_ops! {
        and  => And,  "bitwise and (`vandps`-family)";
        andn => Andn, "bitwise and-not, `d = !a & b` (`vandnps`-family)";
        or   => Or,   "bitwise or (`vorps`-family)";
        xor  => Xor,  "bitwise xor (`vxorps`-family)";
    }

    //// arithmetic ////

    nds_ops! {
        add => Add, "addition (`vaddps`-family)";
        sub => Sub, "subtraction (`vsubps`-family)";
        mul => Mul, "multiplication (`vmulps`-family)";
        div => Div, "division (`vdivps`-family)";
        min => Min, "minimum (`vminps`-family)";
        max => Max, "maximum (`vmaxps`-family)";
    }

    unary_ops! {
        sqrt => Sqrt, "square root (`vsqrtps`-family)";
    }

    //// compare ////

    /// Packed f32 compare, filling each lane with all-ones where the
    /// predicate holds and zero where it does not
    ///
    /// Under EVEX this expands to a compare into k1 followed by
    /// `vpmovm2d`, the VEX form produces the lane mask directly.
    pub fn cmp_f32(
        &mut self,
        d: VReg,
        a: VReg,
        b: impl Into<Operand>,
        pred: CmpOp
    ) -> Result<(), Error> {
        self.cmp(Elem::F32, d, a, b.into(), pred)
    }

    /// Packed f64 compare, see [`Assembler::cmp_f32`]
    pub fn cmp_f64(
        &mut self,
        d: VReg,
        a: VReg,
        b: impl Into<Operand>,
        pred: CmpOp
    ) -> Result<(), Error> {
        self.cmp(Elem::F64, d, a, b.into(), pred)
    }

    //// convert ////

    /// Converts packed i32 lanes to f32 (`vcvtdq2ps`)
    pub fn cvt_i32_f32(&mut self, d: VReg, s: impl Into<Operand>) -> Result<(), Error> {
        self.unary(Op::CvtItoF, Elem::F32, d, s.into())
    }

    /// Converts packed f32 lanes to i32 under the current rounding mode
    /// (`vcvtps2dq`)
    pub fn cvt_f32_i32(&mut self, d: VReg, s: impl Into<Operand>) -> Result<(), Error> {
        self.unary(Op::CvtFtoI, Elem::F32, d, s.into())
    }

    /// Converts packed f32 lanes to i32 with truncation (`vcvttps2dq`)
    pub fn cvtt_f32_i32(&mut self, d: VReg, s: impl Into<Operand>) -> Result<(), Error> {
        self.unary(Op::CvtTruncFtoI, Elem::F32, d, s.into())
    }

    /// Converts packed i64 lanes to f64 (`vcvtqq2pd`, EVEX targets only)
    pub fn cvt_i64_f64(&mut self, d: VReg, s: impl Into<Operand>) -> Result<(), Error> {
        self.unary(Op::CvtItoF, Elem::F64, d, s.into())
    }

    /// Converts packed f64 lanes to i64 under the current rounding mode
    /// (`vcvtpd2qq`, EVEX targets only)
    pub fn cvt_f64_i64(&mut self, d: VReg, s: impl Into<Operand>) -> Result<(), Error> {
        self.unary(Op::CvtFtoI, Elem::F64, d, s.into())
    }

    /// Converts packed f64 lanes to i64 with truncation (`vcvttpd2qq`,
    /// EVEX targets only)
    pub fn cvtt_f64_i64(&mut self, d: VReg, s: impl Into<Operand>) -> Result<(), Error> {
        self.unary(Op::CvtTruncFtoI, Elem::F64, d, s.into())
    }

    /// Rounds packed f32 lanes to integral values (`vroundps` under VEX,
    /// `vrndscaleps` under EVEX)
    pub fn round_f32(
        &mut self,
        d: VReg,
        s: impl Into<Operand>,
        mode: RoundMode
    ) -> Result<(), Error> {
        self.unary_imm(Op::Round, Elem::F32, d, s.into(), Some(mode as u8))
    }

    /// Rounds packed f64 lanes to integral values (`vroundpd` under VEX,
    /// `vrndscalepd` under EVEX)
    pub fn round_f64(
        &mut self,
        d: VReg,
        s: impl Into<Operand>,
        mode: RoundMode
    ) -> Result<(), Error> {
        self.unary_imm(Op::Round, Elem::F64, d, s.into(), Some(mode as u8))
    }

    //// shift ////

    shift_ops! {
        shl_u => Shl  / ShlImm  / ShlV,  "logical left shift";
        shr_u => ShrU / ShrUImm / ShrUV, "logical right shift";
        shr_i => ShrS / ShrSImm / ShrSV, "arithmetic right shift";
    }

    //// operand validation ////

    fn check_vreg(&self, r: VReg) -> Result<(), Error> {
        if r.index() > self.target.reg_limit() {
            Err(Error::InvalidRegister(r.index(), self.target.reg_limit()))
        } else {
            Ok(())
        }
    }

    fn check_mem(&self, m: &Mem) -> Result<(), Error> {
        if let Some((index, _)) = m.index {
            if index == Gpr::Rsp {
                return Err(Error::InvalidIndex);
            }
        }
        Ok(())
    }

    fn check_operand(&self, s: &Operand) -> Result<(), Error> {
        match s {
            Operand::Reg(r) => self.check_vreg(*r),
            Operand::Mem(m) => self.check_mem(m),
        }
    }

    //// quaded lowering ////

    /// The real register of one part: identity on hardware widths, four
    /// consecutive zmm registers per virtual register when quaded
    fn part_reg(&self, r: VReg, part: u8) -> u8 {
        match self.target {
            Target::Z2048 => r.index() * 4 + part,
            _ => r.index(),
        }
    }

    /// The rm operand of one part, memory stepping by 64 bytes per part
    fn part_rm(&self, s: Operand, part: u8) -> Result<Rm, Error> {
        match s {
            Operand::Reg(r) => Ok(Rm::Reg(self.part_reg(r, part))),
            Operand::Mem(m) if part > 0 => Ok(Rm::Mem(m.offset(64 * part as i32)?)),
            Operand::Mem(m) => Ok(Rm::Mem(m)),
        }
    }

    /// All part rm operands up front, so an unencodable operand fails
    /// before anything lands in the buffer
    fn part_rms(&self, s: Operand) -> Result<Vec<Rm>, Error> {
        (0..self.target.parts())
            .map(|part| self.part_rm(s, part))
            .collect()
    }

    //// emission ////

    fn desc(&self, op: Op, elem: Elem) -> Result<InsDesc, Error> {
        isa::desc(op, elem, self.target.evex())
            .ok_or_else(|| Error::Unsupported(isa::mnemonic(op, elem, true)))
    }

    fn enc(&self, desc: &InsDesc, elem: Elem) -> Enc {
        let evex = self.target.evex();
        Enc {
            pp: desc.pp,
            map: desc.map,
            opcode: desc.opcode,
            w: if evex { desc.w_evex } else { desc.w_vex },
            ll: self.target.width().ll(),
            evex,
            tuple_n: if evex {
                desc.tuple.n(self.target.width(), elem)
            } else {
                1
            },
        }
    }

    fn nds(&mut self, op: Op, elem: Elem, d: VReg, a: VReg, b: Operand) -> Result<(), Error> {
        self.check_vreg(d)?;
        self.check_vreg(a)?;
        self.check_operand(&b)?;
        let desc = self.desc(op, elem)?;
        let enc = self.enc(&desc, elem);
        let rms = self.part_rms(b)?;
        for (part, rm) in rms.into_iter().enumerate() {
            let part = part as u8;
            let vr = self.part_reg(d, part);
            let vvvv = self.part_reg(a, part);
            prefix::emit(&mut self.buf, &enc, vr, vvvv, rm, None)?;
        }
        Ok(())
    }

    fn unary(&mut self, op: Op, elem: Elem, d: VReg, s: Operand) -> Result<(), Error> {
        self.unary_imm(op, elem, d, s, None)
    }

    fn unary_imm(
        &mut self,
        op: Op,
        elem: Elem,
        d: VReg,
        s: Operand,
        imm: Option<u8>
    ) -> Result<(), Error> {
        self.check_vreg(d)?;
        self.check_operand(&s)?;
        let desc = self.desc(op, elem)?;
        let enc = self.enc(&desc, elem);
        let rms = self.part_rms(s)?;
        for (part, rm) in rms.into_iter().enumerate() {
            let vr = self.part_reg(d, part as u8);
            prefix::emit(&mut self.buf, &enc, vr, 0, rm, imm)?;
        }
        Ok(())
    }

    fn store(&mut self, op: Op, elem: Elem, m: Mem, s: VReg) -> Result<(), Error> {
        self.check_vreg(s)?;
        self.check_mem(&m)?;
        let desc = self.desc(op, elem)?;
        let enc = self.enc(&desc, elem);
        let rms = self.part_rms(Operand::Mem(m))?;
        for (part, rm) in rms.into_iter().enumerate() {
            let vr = self.part_reg(s, part as u8);
            prefix::emit(&mut self.buf, &enc, vr, 0, rm, None)?;
        }
        Ok(())
    }

    fn broadcast(&mut self, elem: Elem, d: VReg, s: Operand) -> Result<(), Error> {
        self.check_vreg(d)?;
        self.check_operand(&s)?;

        // no 128-bit vbroadcastsd exists, vmovddup duplicates the low
        // double instead
        if elem == Elem::F64 && self.target == Target::X128 {
            let enc = Enc {
                pp: Pp::PF2,
                map: Map::M0F,
                opcode: 0x12,
                w: false,
                ll: 0,
                evex: false,
                tuple_n: 1,
            };
            let rm = self.fixed_rm(s);
            return prefix::emit(&mut self.buf, &enc, d.index(), 0, rm, None);
        }

        let desc = self.desc(Op::Broadcast, elem)?;
        let enc = self.enc(&desc, elem);
        // every part reads the same scalar source
        let rm = self.fixed_rm(s);
        for part in 0..self.target.parts() {
            let vr = self.part_reg(d, part);
            prefix::emit(&mut self.buf, &enc, vr, 0, rm, None)?;
        }
        Ok(())
    }

    fn cmp(
        &mut self,
        elem: Elem,
        d: VReg,
        a: VReg,
        b: Operand,
        pred: CmpOp
    ) -> Result<(), Error> {
        self.check_vreg(d)?;
        self.check_vreg(a)?;
        self.check_operand(&b)?;
        let desc = self.desc(Op::Cmp, elem)?;
        let enc = self.enc(&desc, elem);

        if !self.target.evex() {
            let rm = self.part_rm(b, 0)?;
            return prefix::emit(
                &mut self.buf,
                &enc,
                d.index(),
                a.index(),
                rm,
                Some(pred as u8),
            );
        }

        // EVEX compares write an opmask, round-trip through k1 and
        // expand back to an all-ones lane mask
        let mask = KReg::new(1);
        let m2v = Enc {
            pp: Pp::PF3,
            map: Map::M0F38,
            opcode: 0x38,
            w: elem == Elem::F64,
            ll: enc.ll,
            evex: true,
            tuple_n: 1,
        };
        let rms = self.part_rms(b)?;
        for (part, rm) in rms.into_iter().enumerate() {
            let part = part as u8;
            let vvvv = self.part_reg(a, part);
            prefix::emit(&mut self.buf, &enc, mask.index(), vvvv, rm, Some(pred as u8))?;
            let vr = self.part_reg(d, part);
            prefix::emit(&mut self.buf, &m2v, vr, 0, Rm::Reg(mask.index()), None)?;
        }
        Ok(())
    }

    fn shift_uniform(
        &mut self,
        op: Op,
        elem: Elem,
        d: VReg,
        s: VReg,
        count: Operand
    ) -> Result<(), Error> {
        self.check_vreg(d)?;
        self.check_vreg(s)?;
        self.check_operand(&count)?;
        let desc = self.desc(op, elem)?;
        let enc = self.enc(&desc, elem);
        // one count for all four parts
        let rm = self.fixed_rm(count);
        for part in 0..self.target.parts() {
            let vr = self.part_reg(d, part);
            let vvvv = self.part_reg(s, part);
            prefix::emit(&mut self.buf, &enc, vr, vvvv, rm, None)?;
        }
        Ok(())
    }

    fn shift_imm(&mut self, op: Op, elem: Elem, d: VReg, s: VReg, imm: u8) -> Result<(), Error> {
        self.check_vreg(d)?;
        self.check_vreg(s)?;
        if imm as u32 >= elem.lane_bits() {
            return Err(Error::InvalidShift(imm));
        }
        let desc = self.desc(op, elem)?;
        let digit = match desc.form {
            Form::NddImm(digit) => digit,
            _ => return Err(Error::Unsupported(isa::mnemonic(op, elem, true))),
        };
        let enc = self.enc(&desc, elem);
        for part in 0..self.target.parts() {
            let vvvv = self.part_reg(d, part);
            let rm = Rm::Reg(self.part_reg(s, part));
            prefix::emit(&mut self.buf, &enc, digit, vvvv, rm, Some(imm))?;
        }
        Ok(())
    }

    /// An rm operand shared by all parts (shift counts, broadcast
    /// sources): part 0 of a virtual register, or the unstepped memory
    /// operand
    fn fixed_rm(&self, s: Operand) -> Rm {
        match s {
            Operand::Reg(r) => Rm::Reg(self.part_reg(r, 0)),
            Operand::Mem(m) => Rm::Mem(m),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use vecasm_encode::mem::Scale;
    use vecasm_encode::reg::v;

    #[test]
    fn x128_arith() {
        let mut asm = Assembler::new(Target::X128);
        asm.add_f32(v(1), v(2), v(3)).unwrap();
        asm.mul_f64(v(1), v(2), v(3)).unwrap();
        asm.andn_f32(v(0), v(1), v(2)).unwrap();
        asm.sqrt_f32(v(1), v(3)).unwrap();
        assert_eq!(
            asm.bytes(),
            &[
                0xc5, 0xe8, 0x58, 0xcb, // vaddps xmm1, xmm2, xmm3
                0xc5, 0xe9, 0x59, 0xcb, // vmulpd xmm1, xmm2, xmm3
                0xc5, 0xf0, 0x55, 0xc2, // vandnps xmm0, xmm1, xmm2
                0xc5, 0xf8, 0x51, 0xcb, // vsqrtps xmm1, xmm3
            ][..]
        );
    }

    #[test]
    fn x128_mov() {
        let mut asm = Assembler::new(Target::X128);
        asm.mov_f64(v(1), v(2)).unwrap();
        asm.loadu_f32(v(0), Mem::base(Gpr::Rax).disp(0x10)).unwrap();
        asm.store_f32(Mem::base(Gpr::Rbx), v(2)).unwrap();
        assert_eq!(
            asm.bytes(),
            &[
                0xc5, 0xf9, 0x28, 0xca, // vmovapd xmm1, xmm2
                0xc5, 0xf8, 0x10, 0x40, 0x10, // vmovups xmm0, [rax+0x10]
                0xc5, 0xf8, 0x29, 0x13, // vmovaps [rbx], xmm2
            ][..]
        );
    }

    #[test]
    fn x128_cmp_round_cvt() {
        let mut asm = Assembler::new(Target::X128);
        asm.cmp_f32(v(1), v(2), v(3), CmpOp::Lt).unwrap();
        asm.round_f32(v(1), v(2), RoundMode::Zero).unwrap();
        asm.cvt_i32_f32(v(1), v(2)).unwrap();
        asm.cvtt_f32_i32(v(1), v(2)).unwrap();
        assert_eq!(
            asm.bytes(),
            &[
                0xc5, 0xe8, 0xc2, 0xcb, 0x01, // vcmpps xmm1, xmm2, xmm3, 1
                0xc4, 0xe3, 0x79, 0x08, 0xca, 0x03, // vroundps xmm1, xmm2, 3
                0xc5, 0xf8, 0x5b, 0xca, // vcvtdq2ps xmm1, xmm2
                0xc5, 0xfa, 0x5b, 0xca, // vcvttps2dq xmm1, xmm2
            ][..]
        );
    }

    #[test]
    fn x128_shifts() {
        let mut asm = Assembler::new(Target::X128);
        asm.shl_u32(v(1), v(2), v(3)).unwrap();
        asm.shl_u32_imm(v(1), v(2), 5).unwrap();
        asm.shr_i32_imm(v(1), v(2), 3).unwrap();
        asm.shr_u64(v(1), v(2), v(3)).unwrap();
        asm.shl_u32_var(v(1), v(2), v(3)).unwrap();
        asm.shl_u64_var(v(1), v(2), v(3)).unwrap();
        assert_eq!(
            asm.bytes(),
            &[
                0xc5, 0xe9, 0xf2, 0xcb, // vpslld xmm1, xmm2, xmm3
                0xc5, 0xf1, 0x72, 0xf2, 0x05, // vpslld xmm1, xmm2, 5
                0xc5, 0xf1, 0x72, 0xe2, 0x03, // vpsrad xmm1, xmm2, 3
                0xc5, 0xe9, 0xd3, 0xcb, // vpsrlq xmm1, xmm2, xmm3
                0xc4, 0xe2, 0x69, 0x47, 0xcb, // vpsllvd xmm1, xmm2, xmm3
                0xc4, 0xe2, 0xe9, 0x47, 0xcb, // vpsllvq xmm1, xmm2, xmm3
            ][..]
        );
    }

    #[test]
    fn x128_broadcast_f64_is_movddup() {
        let mut asm = Assembler::new(Target::X128);
        asm.broadcast_f64(v(1), v(2)).unwrap();
        asm.broadcast_f32(v(1), v(2)).unwrap();
        assert_eq!(
            asm.bytes(),
            &[
                0xc5, 0xfb, 0x12, 0xca, // vmovddup xmm1, xmm2
                0xc4, 0xe2, 0x79, 0x18, 0xca, // vbroadcastss xmm1, xmm2
            ][..]
        );
    }

    #[test]
    fn y256_ops() {
        let mut asm = Assembler::new(Target::Y256);
        asm.add_f32(v(1), v(2), v(3)).unwrap();
        asm.xor_f32(v(1), v(1), v(1)).unwrap();
        assert_eq!(
            asm.bytes(),
            &[
                0xc5, 0xec, 0x58, 0xcb, // vaddps ymm1, ymm2, ymm3
                0xc5, 0xf4, 0x57, 0xc9, // vxorps ymm1, ymm1, ymm1
            ][..]
        );
    }

    #[test]
    fn z512_arith() {
        let mut asm = Assembler::new(Target::Z512);
        asm.add_f32(v(1), v(2), v(3)).unwrap();
        asm.add_f64(v(1), v(2), v(3)).unwrap();
        asm.add_f32(v(17), v(18), v(19)).unwrap();
        assert_eq!(
            asm.bytes(),
            &[
                0x62, 0xf1, 0x6c, 0x48, 0x58, 0xcb, // vaddps zmm1, zmm2, zmm3
                0x62, 0xf1, 0xed, 0x48, 0x58, 0xcb, // vaddpd zmm1, zmm2, zmm3
                0x62, 0xa1, 0x6c, 0x40, 0x58, 0xcb, // vaddps zmm17, zmm18, zmm19
            ][..]
        );
    }

    #[test]
    fn z512_cmp_expands_through_k1() {
        let mut asm = Assembler::new(Target::Z512);
        asm.cmp_f32(v(1), v(2), v(3), CmpOp::Eq).unwrap();
        asm.cmp_f64(v(1), v(2), v(3), CmpOp::Eq).unwrap();
        assert_eq!(
            asm.bytes(),
            &[
                0x62, 0xf1, 0x6c, 0x48, 0xc2, 0xcb, 0x00, // vcmpps k1, zmm2, zmm3, 0
                0x62, 0xf2, 0x7e, 0x48, 0x38, 0xc9, // vpmovm2d zmm1, k1
                0x62, 0xf1, 0xed, 0x48, 0xc2, 0xcb, 0x00, // vcmppd k1, zmm2, zmm3, 0
                0x62, 0xf2, 0xfe, 0x48, 0x38, 0xc9, // vpmovm2q zmm1, k1
            ][..]
        );
    }

    #[test]
    fn z512_broadcast_compression() {
        let mut asm = Assembler::new(Target::Z512);
        // tuple-1-scalar: disp 4 compresses to disp8=1
        asm.broadcast_f32(v(1), Mem::base(Gpr::Rax).disp(4)).unwrap();
        assert_eq!(
            asm.bytes(),
            &[0x62, 0xf2, 0x7d, 0x48, 0x18, 0x48, 0x01][..]
        );
    }

    #[test]
    fn z512_cvt64() {
        let mut asm = Assembler::new(Target::Z512);
        asm.cvt_i64_f64(v(1), v(2)).unwrap();
        asm.cvt_f64_i64(v(1), v(2)).unwrap();
        asm.cvtt_f64_i64(v(1), v(2)).unwrap();
        asm.shr_i64_var(v(1), v(2), v(3)).unwrap();
        assert_eq!(
            asm.bytes(),
            &[
                0x62, 0xf1, 0xfe, 0x48, 0xe6, 0xca, // vcvtqq2pd zmm1, zmm2
                0x62, 0xf1, 0xfd, 0x48, 0x7b, 0xca, // vcvtpd2qq zmm1, zmm2
                0x62, 0xf1, 0xfd, 0x48, 0x7a, 0xca, // vcvttpd2qq zmm1, zmm2
                0x62, 0xf2, 0xed, 0x48, 0x46, 0xcb, // vpsravq zmm1, zmm2, zmm3
            ][..]
        );
    }

    #[test]
    fn quad_registers_step_by_four() {
        let mut asm = Assembler::new(Target::Z2048);
        asm.add_f32(v(0), v(1), v(2)).unwrap();
        assert_eq!(asm.len(), 4 * 6);
        // part 0: vaddps zmm0, zmm4, zmm8
        assert_eq!(&asm.bytes()[..6], &[0x62, 0xd1, 0x5c, 0x48, 0x58, 0xc0][..]);
        // part 3: vaddps zmm3, zmm7, zmm11
        assert_eq!(&asm.bytes()[18..], &[0x62, 0xd1, 0x44, 0x48, 0x58, 0xdb][..]);
    }

    #[test]
    fn quad_memory_steps_by_64() {
        let mut asm = Assembler::new(Target::Z2048);
        asm.load_f32(v(0), Mem::base(Gpr::Rax)).unwrap();
        assert_eq!(
            asm.bytes(),
            &[
                0x62, 0xf1, 0x7c, 0x48, 0x28, 0x00, // vmovaps zmm0, [rax]
                0x62, 0xf1, 0x7c, 0x48, 0x28, 0x48, 0x01, // vmovaps zmm1, [rax+0x40]
                0x62, 0xf1, 0x7c, 0x48, 0x28, 0x50, 0x02, // vmovaps zmm2, [rax+0x80]
                0x62, 0xf1, 0x7c, 0x48, 0x28, 0x58, 0x03, // vmovaps zmm3, [rax+0xc0]
            ][..]
        );
    }

    #[test]
    fn quad_uniform_count_uses_part_zero() {
        let mut asm = Assembler::new(Target::Z2048);
        asm.shl_u32(v(1), v(2), v(3)).unwrap();
        assert_eq!(asm.len(), 4 * 6);
        // every part shifts by zmm12 (part 0 of v3)
        for part in 0..4u8 {
            let ins = &asm.bytes()[part as usize * 6..][..6];
            assert_eq!(ins[4], 0xf2);
            // modrm: mod=11, reg=4+part (low 3 bits), rm=12&7
            assert_eq!(ins[5], 0xc0 | (4 + part) << 3 | 4);
        }
    }

    #[test]
    fn quad_cmp_shape() {
        let mut asm = Assembler::new(Target::Z2048);
        asm.cmp_f32(v(0), v(1), v(2), CmpOp::Gt).unwrap();
        // four cmp+movmask pairs
        assert_eq!(asm.len(), 4 * (7 + 6));
    }

    #[test]
    fn register_ranges() {
        let mut asm = Assembler::new(Target::X128);
        assert!(matches!(
            asm.add_f32(v(16), v(0), v(1)),
            Err(Error::InvalidRegister(16, 15))
        ));

        let mut asm = Assembler::new(Target::Z512);
        asm.add_f32(v(31), v(0), v(1)).unwrap();

        let mut asm = Assembler::new(Target::Z2048);
        assert!(matches!(
            asm.add_f32(v(8), v(0), v(1)),
            Err(Error::InvalidRegister(8, 7))
        ));
        assert!(asm.is_empty());
    }

    #[test]
    fn width_gates() {
        let mut asm = Assembler::new(Target::X128);
        assert!(matches!(
            asm.cvt_i64_f64(v(0), v(1)),
            Err(Error::Unsupported("vcvtqq2pd"))
        ));

        let mut asm = Assembler::new(Target::Y256);
        assert!(matches!(
            asm.shr_i64(v(0), v(1), v(2)),
            Err(Error::Unsupported("vpsraq"))
        ));
        assert!(matches!(
            asm.shr_i64_imm(v(0), v(1), 1),
            Err(Error::Unsupported("vpsraq"))
        ));

        let mut asm = Assembler::new(Target::Z512);
        asm.shr_i64(v(0), v(1), v(2)).unwrap();
    }

    #[test]
    fn shift_imm_ranges() {
        let mut asm = Assembler::new(Target::X128);
        assert!(matches!(
            asm.shl_u32_imm(v(0), v(1), 32),
            Err(Error::InvalidShift(32))
        ));
        asm.shl_u64_imm(v(0), v(1), 63).unwrap();
        assert!(matches!(
            asm.shl_u64_imm(v(0), v(1), 64),
            Err(Error::InvalidShift(64))
        ));
    }

    #[test]
    fn quad_disp_overflow_leaves_buffer_clean() {
        let mut asm = Assembler::new(Target::Z2048);
        let err = asm.load_f32(v(0), Mem::base(Gpr::Rax).disp(i32::MAX - 10));
        assert!(matches!(err, Err(Error::DispOverflow)));
        assert!(asm.is_empty());
    }

    #[test]
    fn indexed_addressing() {
        let mut asm = Assembler::new(Target::Z512);
        asm.add_f32(
            v(1),
            v(2),
            Mem::base(Gpr::Rax).index(Gpr::Rcx, Scale::X4).disp(0x40),
        )
        .unwrap();
        assert_eq!(
            asm.bytes(),
            // vaddps zmm1, zmm2, [rax+rcx*4+0x40]: disp8*64 = 1
            &[0x62, 0xf1, 0x6c, 0x48, 0x58, 0x4c, 0x88, 0x01][..]
        );

        let mut asm = Assembler::new(Target::X128);
        assert!(matches!(
            asm.add_f32(
                v(1),
                v(2),
                Mem::base(Gpr::Rax).index(Gpr::Rsp, Scale::X1)
            ),
            Err(Error::InvalidIndex)
        ));
        assert!(asm.is_empty());
    }
}
