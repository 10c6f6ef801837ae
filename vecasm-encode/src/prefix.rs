//! VEX/EVEX prefix and ModRM/SIB/displacement construction
//!
//! Everything here works on raw register indices, the assembler layer
//! above is responsible for range-checking them against the target.
//! Extension bits (R/X/B/R'/V') are stored uncomplemented and only
//! complemented at the moment the prefix bytes are built.

use crate::error::Error;
use crate::mem::Mem;
use crate::reg::Gpr;
use std::convert::TryFrom;


/// Implied SIMD prefix (the "pp" field)
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Pp {
    Np  = 0,
    P66 = 1,
    PF3 = 2,
    PF2 = 3,
}

impl Pp {
    pub fn from_bits(pp: u8) -> Pp {
        match pp & 3 {
            0 => Pp::Np,
            1 => Pp::P66,
            2 => Pp::PF3,
            _ => Pp::PF2,
        }
    }
}

/// Opcode map (the "mmmmm"/"mmm" field)
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Map {
    M0F   = 1,
    M0F38 = 2,
    M0F3A = 3,
}

impl Map {
    pub fn from_bits(mm: u8) -> Option<Map> {
        match mm {
            1 => Some(Map::M0F),
            2 => Some(Map::M0F38),
            3 => Some(Map::M0F3A),
            _ => None,
        }
    }
}


/// One instruction's encoding geometry
///
/// `tuple_n` is the EVEX compressed-disp8 scale (disp8*N), 1 under VEX
/// where no compression exists.
#[derive(Debug, Copy, Clone)]
pub struct Enc {
    pub pp: Pp,
    pub map: Map,
    pub opcode: u8,
    pub w: bool,
    pub ll: u8,
    pub evex: bool,
    pub tuple_n: u32,
}


/// The ModRM rm operand: a register or a decomposed memory reference
#[derive(Debug, Copy, Clone)]
pub enum Rm {
    Reg(u8),
    Mem(Mem),
}

enum Disp {
    None,
    D8(i8),
    D32(i32),
}

fn encode_disp(enc: &Enc, disp: i32, base_lo: u8) -> (u8, Disp) {
    // mod=00 means no displacement, except the rbp/r13 slot which that
    // encoding reserves for rip-relative/disp32
    if disp == 0 && base_lo != 5 {
        return (0, Disp::None);
    }
    if enc.evex {
        // compressed disp8*N
        if disp % enc.tuple_n as i32 == 0 {
            if let Ok(d) = i8::try_from(disp / enc.tuple_n as i32) {
                return (1, Disp::D8(d));
            }
        }
        (2, Disp::D32(disp))
    } else if let Ok(d) = i8::try_from(disp) {
        (1, Disp::D8(d))
    } else {
        (2, Disp::D32(disp))
    }
}

fn modrm(buf: &mut Vec<u8>, enc: &Enc, reg_lo: u8, rm: Rm) {
    match rm {
        Rm::Reg(r) => {
            buf.push(0xc0 | reg_lo << 3 | (r & 7));
        }
        Rm::Mem(m) => {
            let base_lo = m.base.index() & 7;
            // the rsp slot in ModRM.rm always means "SIB follows"
            let need_sib = m.index.is_some() || base_lo == 4;
            let rm_lo = if need_sib { 4 } else { base_lo };
            let (md, disp) = encode_disp(enc, m.disp, base_lo);
            buf.push(md << 6 | reg_lo << 3 | rm_lo);
            if need_sib {
                let (index_lo, scale) = match m.index {
                    Some((index, scale)) => (index.index() & 7, scale as u8),
                    None => (4, 0),
                };
                buf.push(scale << 6 | index_lo << 3 | base_lo);
            }
            match disp {
                Disp::None => {}
                Disp::D8(d) => buf.push(d as u8),
                Disp::D32(d) => buf.extend_from_slice(&d.to_le_bytes()),
            }
        }
    }
}

/// Emit one VEX/EVEX-encoded instruction: prefix, opcode, ModRM,
/// optional SIB/displacement, optional trailing imm8
///
/// `reg` is the ModRM.reg operand (or the /digit for group opcodes),
/// `vvvv` the non-destructive source (0 when the instruction has none,
/// which complements to the required 1111 encoding).
pub fn emit(
    buf: &mut Vec<u8>,
    enc: &Enc,
    reg: u8,
    vvvv: u8,
    rm: Rm,
    imm: Option<u8>
) -> Result<(), Error> {
    // reject bad operands before any bytes land in the buffer
    if let Rm::Mem(m) = rm {
        if let Some((index, _)) = m.index {
            if index == Gpr::Rsp {
                return Err(Error::InvalidIndex);
            }
        }
    }

    // B extends the rm register or the memory base, X extends the memory
    // index, or under EVEX the rm register's bit 4
    let (b, x) = match rm {
        Rm::Reg(r) => (r >> 3 & 1, r >> 4 & 1),
        Rm::Mem(m) => (
            m.base.index() >> 3 & 1,
            m.index.map(|(index, _)| index.index() >> 3 & 1).unwrap_or(0),
        ),
    };

    if enc.evex {
        let p0 = (!(reg >> 3) & 1) << 7
            | (!x & 1) << 6
            | (!b & 1) << 5
            | (!(reg >> 4) & 1) << 4
            | enc.map as u8;
        let p1 = (enc.w as u8) << 7
            | (!vvvv & 0xf) << 3
            | 0x04
            | enc.pp as u8;
        // no masking, zeroing or embedded broadcast: z=0, b=0, aaa=000
        let p2 = enc.ll << 5
            | (!(vvvv >> 4) & 1) << 3;
        buf.push(0x62);
        buf.push(p0);
        buf.push(p1);
        buf.push(p2);
    } else if enc.map == Map::M0F && !enc.w && b == 0 && x == 0 {
        // the two-byte form covers map 0F, W=0, and no B/X extension
        buf.push(0xc5);
        buf.push(
            (!(reg >> 3) & 1) << 7
                | (!vvvv & 0xf) << 3
                | enc.ll << 2
                | enc.pp as u8,
        );
    } else {
        buf.push(0xc4);
        buf.push(
            (!(reg >> 3) & 1) << 7
                | (!x & 1) << 6
                | (!b & 1) << 5
                | enc.map as u8,
        );
        buf.push(
            (enc.w as u8) << 7
                | (!vvvv & 0xf) << 3
                | enc.ll << 2
                | enc.pp as u8,
        );
    }

    buf.push(enc.opcode);
    modrm(buf, enc, reg & 7, rm);
    if let Some(imm) = imm {
        buf.push(imm);
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::Scale;

    fn enc(pp: Pp, map: Map, opcode: u8, w: bool, ll: u8, evex: bool, tuple_n: u32) -> Enc {
        Enc { pp, map, opcode, w, ll, evex, tuple_n }
    }

    fn emitted(enc: &Enc, reg: u8, vvvv: u8, rm: Rm, imm: Option<u8>) -> Vec<u8> {
        let mut buf = Vec::new();
        emit(&mut buf, enc, reg, vvvv, rm, imm).unwrap();
        buf
    }

    #[test]
    fn vex_two_byte() {
        // vaddps xmm1, xmm2, xmm3
        let e = enc(Pp::Np, Map::M0F, 0x58, false, 0, false, 1);
        assert_eq!(emitted(&e, 1, 2, Rm::Reg(3), None), vec![0xc5, 0xe8, 0x58, 0xcb]);

        // vaddps ymm1, ymm2, ymm3
        let e = enc(Pp::Np, Map::M0F, 0x58, false, 1, false, 1);
        assert_eq!(emitted(&e, 1, 2, Rm::Reg(3), None), vec![0xc5, 0xec, 0x58, 0xcb]);
    }

    #[test]
    fn vex_three_byte() {
        // a B extension forces the three-byte form: vaddps xmm1, xmm2, xmm8
        let e = enc(Pp::Np, Map::M0F, 0x58, false, 0, false, 1);
        assert_eq!(
            emitted(&e, 1, 2, Rm::Reg(8), None),
            vec![0xc4, 0xc1, 0x68, 0x58, 0xc8]
        );

        // map 0F38 forces it too: vpsllvd xmm1, xmm2, xmm3
        let e = enc(Pp::P66, Map::M0F38, 0x47, false, 0, false, 1);
        assert_eq!(
            emitted(&e, 1, 2, Rm::Reg(3), None),
            vec![0xc4, 0xe2, 0x69, 0x47, 0xcb]
        );

        // as does W=1: vpsllvq xmm1, xmm2, xmm3
        let e = enc(Pp::P66, Map::M0F38, 0x47, true, 0, false, 1);
        assert_eq!(
            emitted(&e, 1, 2, Rm::Reg(3), None),
            vec![0xc4, 0xe2, 0xe9, 0x47, 0xcb]
        );
    }

    #[test]
    fn evex_register_forms() {
        // vaddps zmm1, zmm2, zmm3
        let e = enc(Pp::Np, Map::M0F, 0x58, false, 2, true, 64);
        assert_eq!(
            emitted(&e, 1, 2, Rm::Reg(3), None),
            vec![0x62, 0xf1, 0x6c, 0x48, 0x58, 0xcb]
        );

        // vaddpd zmm1, zmm2, zmm3
        let e = enc(Pp::P66, Map::M0F, 0x58, true, 2, true, 64);
        assert_eq!(
            emitted(&e, 1, 2, Rm::Reg(3), None),
            vec![0x62, 0xf1, 0xed, 0x48, 0x58, 0xcb]
        );

        // the upper register file exercises R'/V'/X:
        // vaddps zmm17, zmm18, zmm19
        let e = enc(Pp::Np, Map::M0F, 0x58, false, 2, true, 64);
        assert_eq!(
            emitted(&e, 17, 18, Rm::Reg(19), None),
            vec![0x62, 0xa1, 0x6c, 0x40, 0x58, 0xcb]
        );
    }

    #[test]
    fn mem_basic() {
        let e = enc(Pp::Np, Map::M0F, 0x58, false, 0, false, 1);

        // [rax]: mod=00
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::Rax)), None),
            vec![0xc5, 0xe8, 0x58, 0x08]
        );

        // [rax+0x10]: mod=01 disp8
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::Rax).disp(0x10)), None),
            vec![0xc5, 0xe8, 0x58, 0x48, 0x10]
        );

        // [rax+0x100]: mod=10 disp32
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::Rax).disp(0x100)), None),
            vec![0xc5, 0xe8, 0x58, 0x88, 0x00, 0x01, 0x00, 0x00]
        );

        // [rax-0x10]: negative disp8
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::Rax).disp(-0x10)), None),
            vec![0xc5, 0xe8, 0x58, 0x48, 0xf0]
        );
    }

    #[test]
    fn mem_special_bases() {
        let e = enc(Pp::Np, Map::M0F, 0x58, false, 0, false, 1);

        // [rsp] needs a no-index SIB
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::Rsp)), None),
            vec![0xc5, 0xe8, 0x58, 0x04, 0x24]
        );

        // [r12] too, plus the B extension
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::R12)), None),
            vec![0xc4, 0xc1, 0x68, 0x58, 0x04, 0x24]
        );

        // [rbp] cannot use mod=00, a zero disp8 stands in
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::Rbp)), None),
            vec![0xc5, 0xe8, 0x58, 0x48, 0x00]
        );

        // [r13] the same with B
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::R13)), None),
            vec![0xc4, 0xc1, 0x68, 0x58, 0x48, 0x00]
        );
    }

    #[test]
    fn mem_indexed() {
        let e = enc(Pp::Np, Map::M0F, 0x58, false, 0, false, 1);

        // [rax+rcx*4+0x10]
        assert_eq!(
            emitted(
                &e,
                1,
                2,
                Rm::Mem(Mem::base(Gpr::Rax).index(Gpr::Rcx, Scale::X4).disp(0x10)),
                None
            ),
            vec![0xc5, 0xe8, 0x58, 0x4c, 0x88, 0x10]
        );

        // [rax+r9*8]: X extension forces the three-byte form
        assert_eq!(
            emitted(
                &e,
                1,
                2,
                Rm::Mem(Mem::base(Gpr::Rax).index(Gpr::R9, Scale::X8)),
                None
            ),
            vec![0xc4, 0xa1, 0x68, 0x58, 0x04, 0xc8]
        );

        // rsp as index is not encodable
        let mut buf = Vec::new();
        let err = emit(
            &mut buf,
            &e,
            1,
            2,
            Rm::Mem(Mem::base(Gpr::Rax).index(Gpr::Rsp, Scale::X1)),
            None,
        );
        assert!(matches!(err, Err(Error::InvalidIndex)));
        assert!(buf.is_empty());
    }

    #[test]
    fn evex_disp_compression() {
        let e = enc(Pp::Np, Map::M0F, 0x58, false, 2, true, 64);

        // 0x80 = 2*64: compresses to disp8=2
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::Rax).disp(0x80)), None),
            vec![0x62, 0xf1, 0x6c, 0x48, 0x58, 0x48, 0x02]
        );

        // -64 compresses to disp8=-1
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::Rax).disp(-64)), None),
            vec![0x62, 0xf1, 0x6c, 0x48, 0x58, 0x48, 0xff]
        );

        // 0x44 is not a multiple of 64: full disp32
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::Rax).disp(0x44)), None),
            vec![0x62, 0xf1, 0x6c, 0x48, 0x58, 0x88, 0x44, 0x00, 0x00, 0x00]
        );

        // 0x80*64 overflows disp8 even scaled: full disp32
        assert_eq!(
            emitted(&e, 1, 2, Rm::Mem(Mem::base(Gpr::Rax).disp(0x80 * 64)), None),
            vec![0x62, 0xf1, 0x6c, 0x48, 0x58, 0x88, 0x00, 0x20, 0x00, 0x00]
        );
    }

    #[test]
    fn imm_trails() {
        // vcmpps xmm1, xmm2, xmm3, 0x01
        let e = enc(Pp::Np, Map::M0F, 0xc2, false, 0, false, 1);
        assert_eq!(
            emitted(&e, 1, 2, Rm::Reg(3), Some(0x01)),
            vec![0xc5, 0xe8, 0xc2, 0xcb, 0x01]
        );
    }
}
