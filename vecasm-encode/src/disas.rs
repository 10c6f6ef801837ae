//! single-instruction decoder for verifying emitted bytes
//!
//! Decodes exactly the encodings the emitter produces (two/three-byte
//! VEX and four-byte EVEX with base+index+disp addressing). Legacy
//! prefixes and rip-relative forms are out of scope.

use crate::error::Error;
use crate::prefix::Map;
use crate::prefix::Pp;


/// A decoded memory displacement, kept raw: EVEX disp8 values are still
/// compressed and must be scaled by the instruction's tuple N
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MemDisp {
    None,
    D8(i8),
    D32(i32),
}

impl MemDisp {
    /// The effective byte displacement given the disp8 scale
    pub fn value(self, n: i32) -> i32 {
        match self {
            MemDisp::None => 0,
            MemDisp::D8(d) => d as i32 * n,
            MemDisp::D32(d) => d,
        }
    }
}

/// A decoded memory operand (raw register indices)
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DecodedMem {
    pub base: u8,
    pub index: Option<(u8, u8)>,
    pub disp: MemDisp,
}

/// The decoded ModRM.rm operand
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RmOp {
    Reg(u8),
    Mem(DecodedMem),
}

/// One decoded instruction
#[derive(Debug, Copy, Clone)]
pub struct DecodedIns {
    pub evex: bool,
    pub map: Map,
    pub pp: Pp,
    pub w: bool,
    pub ll: u8,
    pub opcode: u8,
    /// ModRM.reg with the R/R' extensions applied (a /digit for group
    /// opcodes)
    pub reg: u8,
    /// uncomplemented 5-bit vvvv (0 when the instruction has none)
    pub vvvv: u8,
    pub rm: RmOp,
    pub imm: Option<u8>,
    /// bytes consumed
    pub len: usize,
}

fn get(bytes: &[u8], i: usize) -> Result<u8, Error> {
    bytes.get(i).copied().ok_or(Error::Truncated)
}

/// Whether an opcode in a map carries a trailing imm8
///
/// Covers the emitted instruction set: compares, the 72/73 shift-imm
/// group, and everything in map 0F3A.
pub fn has_imm(map: Map, opcode: u8) -> bool {
    match map {
        Map::M0F => matches!(opcode, 0xc2 | 0x72 | 0x73),
        Map::M0F38 => false,
        Map::M0F3A => true,
    }
}

/// Decode one instruction from the front of `bytes`
pub fn decode(bytes: &[u8]) -> Result<DecodedIns, Error> {
    let b0 = get(bytes, 0)?;
    let (evex, map, pp, w, ll, r, x, b, vvvv, mut i) = match b0 {
        0xc5 => {
            let p = get(bytes, 1)?;
            (
                false,
                Map::M0F,
                Pp::from_bits(p),
                false,
                p >> 2 & 1,
                !(p >> 7) & 1,
                0,
                0,
                !(p >> 3) & 0xf,
                2,
            )
        }
        0xc4 => {
            let p1 = get(bytes, 1)?;
            let p2 = get(bytes, 2)?;
            let map = Map::from_bits(p1 & 0x1f).ok_or(Error::InvalidPrefix(p1))?;
            (
                false,
                map,
                Pp::from_bits(p2),
                p2 >> 7 & 1 != 0,
                p2 >> 2 & 1,
                !(p1 >> 7) & 1,
                !(p1 >> 6) & 1,
                !(p1 >> 5) & 1,
                !(p2 >> 3) & 0xf,
                3,
            )
        }
        0x62 => {
            let p0 = get(bytes, 1)?;
            let p1 = get(bytes, 2)?;
            let p2 = get(bytes, 3)?;
            let map = Map::from_bits(p0 & 0x07).ok_or(Error::InvalidPrefix(p0))?;
            let r = (!(p0 >> 7) & 1) | (!(p0 >> 4) & 1) << 1;
            let vvvv = (!(p1 >> 3) & 0xf) | (!(p2 >> 3) & 1) << 4;
            (
                true,
                map,
                Pp::from_bits(p1),
                p1 >> 7 & 1 != 0,
                p2 >> 5 & 3,
                r,
                !(p0 >> 6) & 1,
                !(p0 >> 5) & 1,
                vvvv,
                4,
            )
        }
        _ => return Err(Error::InvalidPrefix(b0)),
    };

    let opcode = get(bytes, i)?;
    i += 1;

    let modrm = get(bytes, i)?;
    i += 1;
    let md = modrm >> 6;
    let reg_lo = modrm >> 3 & 7;
    let rm_lo = modrm & 7;

    // under EVEX, R' carries the reg field's bit 4 (packed as bit 1 of
    // the extension pair above)
    let reg = if evex {
        reg_lo | (r & 1) << 3 | (r >> 1) << 4
    } else {
        reg_lo | r << 3
    };

    let rm = if md == 3 {
        // for register operands EVEX.X extends rm to 32 registers
        RmOp::Reg(rm_lo | b << 3 | if evex { x << 4 } else { 0 })
    } else {
        let (base_lo, index) = if rm_lo == 4 {
            let sib = get(bytes, i)?;
            i += 1;
            let index_lo = sib >> 3 & 7;
            let index = if index_lo == 4 && x == 0 {
                None
            } else {
                Some((index_lo | x << 3, sib >> 6))
            };
            (sib & 7, index)
        } else {
            if md == 0 && rm_lo == 5 {
                // rip-relative, never emitted
                return Err(Error::UnsupportedAddressing);
            }
            (rm_lo, None)
        };

        let disp = match md {
            0 => MemDisp::None,
            1 => {
                let d = get(bytes, i)? as i8;
                i += 1;
                MemDisp::D8(d)
            }
            _ => {
                let d = i32::from_le_bytes([
                    get(bytes, i)?,
                    get(bytes, i + 1)?,
                    get(bytes, i + 2)?,
                    get(bytes, i + 3)?,
                ]);
                i += 4;
                MemDisp::D32(d)
            }
        };

        RmOp::Mem(DecodedMem {
            base: base_lo | b << 3,
            index,
            disp,
        })
    };

    let imm = if has_imm(map, opcode) {
        let imm = get(bytes, i)?;
        i += 1;
        Some(imm)
    } else {
        None
    };

    Ok(DecodedIns {
        evex,
        map,
        pp,
        w,
        ll,
        opcode,
        reg,
        vvvv,
        rm,
        imm,
        len: i,
    })
}
