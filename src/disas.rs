//! buffer disassembler, helper for debugging
//!
//! Renders an emitted buffer back into Intel-syntax text by running the
//! decoder over it and reverse-looking-up each instruction in the
//! encoding table. Only covers what the assembler emits, anything else
//! is dumped as raw bytes.

use crate::isa;
use crate::isa::Elem;
use crate::isa::Form;
use crate::isa::InsDesc;
use crate::isa::Op;
use vecasm_encode::disas::decode;
use vecasm_encode::disas::DecodedIns;
use vecasm_encode::disas::RmOp;
use vecasm_encode::mem::Mem;
use vecasm_encode::mem::Scale;
use vecasm_encode::prefix::Map;
use vecasm_encode::prefix::Pp;
use vecasm_encode::reg::Gpr;
use vecasm_encode::reg::Width;
use std::io;


/// Write disassembly to output stream
///
/// One line per instruction, raw bytes on the left. Stops at the first
/// byte sequence the decoder rejects, dumping the remainder raw.
pub fn disas<W: io::Write>(bytes: &[u8], mut out: W) -> Result<(), io::Error> {
    let mut bytes = bytes;
    while !bytes.is_empty() {
        match decode(bytes) {
            Ok(ins) => {
                let hex = hex(&bytes[..ins.len]);
                match render(&ins) {
                    Some(text) => writeln!(out, "    {:24} {}", hex, text)?,
                    None => writeln!(out, "    {:24} (unknown)", hex)?,
                }
                bytes = &bytes[ins.len..];
            }
            Err(_) => {
                // not something we emitted
                writeln!(out, "    {}", hex(bytes))?;
                break;
            }
        }
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

// every op the table scan needs to consider
const OPS: [Op; 30] = [
    Op::Load, Op::Store, Op::LoadU, Op::StoreU, Op::Broadcast,
    Op::And, Op::Andn, Op::Or, Op::Xor,
    Op::Add, Op::Sub, Op::Mul, Op::Div, Op::Min, Op::Max, Op::Sqrt,
    Op::Cmp,
    Op::CvtItoF, Op::CvtFtoI, Op::CvtTruncFtoI, Op::Round,
    Op::Shl, Op::ShrU, Op::ShrS,
    Op::ShlImm, Op::ShrUImm, Op::ShrSImm,
    Op::ShlV, Op::ShrUV, Op::ShrSV,
];

fn render(ins: &DecodedIns) -> Option<String> {
    let width = Width::from_ll(ins.ll)?;

    // the compare lowering's mask expansion is not in the table
    if ins.evex && ins.map == Map::M0F38 && ins.pp == Pp::PF3 && ins.opcode == 0x38 {
        let mn = if ins.w { "vpmovm2q" } else { "vpmovm2d" };
        if let RmOp::Reg(k) = ins.rm {
            return Some(format!("{} {}, k{}", mn, width.reg_name(ins.reg), k));
        }
        return None;
    }

    // neither is the 128-bit f64 broadcast remap
    if !ins.evex && ins.map == Map::M0F && ins.pp == Pp::PF2 && ins.opcode == 0x12 {
        if ins.ll != 0 {
            return None;
        }
        let rm = rm_text(&ins.rm, width, 1, true)?;
        return Some(format!("vmovddup {}, {}", width.reg_name(ins.reg), rm));
    }

    for &op in OPS.iter() {
        for &elem in [Elem::F32, Elem::F64].iter() {
            let desc = match isa::desc(op, elem, ins.evex) {
                Some(desc) => desc,
                None => continue,
            };
            if desc.map != ins.map || desc.pp != ins.pp || desc.opcode != ins.opcode {
                continue;
            }
            let w = if ins.evex { desc.w_evex } else { desc.w_vex };
            if w != ins.w {
                continue;
            }
            // group opcodes share their byte, the /digit tells them apart
            if let Form::NddImm(digit) = desc.form {
                if digit != ins.reg {
                    continue;
                }
            }
            return render_op(ins, op, elem, &desc, width);
        }
    }
    None
}

fn render_op(
    ins: &DecodedIns,
    op: Op,
    elem: Elem,
    desc: &InsDesc,
    width: Width
) -> Option<String> {
    let mn = isa::mnemonic(op, elem, ins.evex);
    // EVEX disp8 values are scaled by the instruction's tuple N
    let n = if ins.evex {
        desc.tuple.n(width, elem) as i32
    } else {
        1
    };

    Some(match desc.form {
        Form::Unary => match op {
            Op::Store | Op::StoreU => format!(
                "{} {}, {}",
                mn,
                rm_text(&ins.rm, width, n, false)?,
                width.reg_name(ins.reg),
            ),
            // broadcast reads a scalar, register sources are xmm
            Op::Broadcast => format!(
                "{} {}, {}",
                mn,
                width.reg_name(ins.reg),
                rm_text(&ins.rm, width, n, true)?,
            ),
            Op::Round => format!(
                "{} {}, {}, {}",
                mn,
                width.reg_name(ins.reg),
                rm_text(&ins.rm, width, n, false)?,
                ins.imm?,
            ),
            _ => format!(
                "{} {}, {}",
                mn,
                width.reg_name(ins.reg),
                rm_text(&ins.rm, width, n, false)?,
            ),
        },
        Form::Nds => match op {
            Op::Cmp => {
                let dst = if ins.evex {
                    format!("k{}", ins.reg)
                } else {
                    width.reg_name(ins.reg)
                };
                format!(
                    "{} {}, {}, {}, {}",
                    mn,
                    dst,
                    width.reg_name(ins.vvvv),
                    rm_text(&ins.rm, width, n, false)?,
                    ins.imm?,
                )
            }
            // uniform shift counts are the low 64 bits of an xmm or m128
            Op::Shl | Op::ShrU | Op::ShrS => format!(
                "{} {}, {}, {}",
                mn,
                width.reg_name(ins.reg),
                width.reg_name(ins.vvvv),
                rm_text(&ins.rm, width, n, true)?,
            ),
            _ => format!(
                "{} {}, {}, {}",
                mn,
                width.reg_name(ins.reg),
                width.reg_name(ins.vvvv),
                rm_text(&ins.rm, width, n, false)?,
            ),
        },
        Form::NddImm(_) => format!(
            "{} {}, {}, {}",
            mn,
            width.reg_name(ins.vvvv),
            rm_text(&ins.rm, width, n, false)?,
            ins.imm?,
        ),
    })
}

fn rm_text(rm: &RmOp, width: Width, n: i32, xmm: bool) -> Option<String> {
    match *rm {
        RmOp::Reg(r) => Some(if xmm {
            Width::X128.reg_name(r)
        } else {
            width.reg_name(r)
        }),
        RmOp::Mem(m) => {
            let base = Gpr::from_index(m.base)?;
            let index = match m.index {
                Some((index, scale)) => Some((Gpr::from_index(index)?, sib_scale(scale))),
                None => None,
            };
            Some(format!(
                "{}",
                Mem {
                    base,
                    index,
                    disp: m.disp.value(n),
                }
            ))
        }
    }
}

fn sib_scale(bits: u8) -> Scale {
    match bits & 3 {
        0 => Scale::X1,
        1 => Scale::X2,
        2 => Scale::X4,
        _ => Scale::X8,
    }
}
