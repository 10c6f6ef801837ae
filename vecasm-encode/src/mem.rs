//! memory operands

use crate::error::Error;
use crate::reg::Gpr;
use std::fmt;


/// SIB scale factors
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Scale {
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
}

impl Scale {
    #[inline]
    pub fn factor(self) -> u32 {
        1 << self as u8
    }
}


/// A base+index*scale+displacement memory operand
///
/// This is the full addressing shape the emitter understands, rip-relative
/// and absolute forms are not expressible. Note rsp can never be an index
/// register, its SIB slot encodes "no index".
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Mem {
    pub base: Gpr,
    pub index: Option<(Gpr, Scale)>,
    pub disp: i32,
}

impl Mem {
    /// A bare `[base]` operand
    pub fn base(base: Gpr) -> Mem {
        Mem {
            base,
            index: None,
            disp: 0,
        }
    }

    /// Adds an index register with a scale
    pub fn index(mut self, index: Gpr, scale: Scale) -> Mem {
        self.index = Some((index, scale));
        self
    }

    /// Adds a byte displacement
    pub fn disp(mut self, disp: i32) -> Mem {
        self.disp = disp;
        self
    }

    /// The same operand shifted by `d` bytes, used by the quaded lowering
    /// to step through the four 64-byte parts
    pub fn offset(self, d: i32) -> Result<Mem, Error> {
        Ok(Mem {
            disp: self.disp.checked_add(d).ok_or(Error::DispOverflow)?,
            ..self
        })
    }
}

impl fmt::Display for Mem {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(fmt, "[{}", self.base)?;
        if let Some((index, scale)) = self.index {
            write!(fmt, "+{}*{}", index, scale.factor())?;
        }
        if self.disp > 0 {
            write!(fmt, "+{:#x}", self.disp)?;
        } else if self.disp < 0 {
            // widen first so i32::MIN doesn't overflow on negation
            write!(fmt, "-{:#x}", -(self.disp as i64))?;
        }
        write!(fmt, "]")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(format!("{}", Mem::base(Gpr::Rax)), "[rax]");
        assert_eq!(
            format!("{}", Mem::base(Gpr::Rbp).disp(0x40)),
            "[rbp+0x40]"
        );
        assert_eq!(
            format!("{}", Mem::base(Gpr::Rsi).index(Gpr::Rcx, Scale::X4).disp(-16)),
            "[rsi+rcx*4-0x10]"
        );
        assert_eq!(
            format!("{}", Mem::base(Gpr::Rax).disp(i32::MIN)),
            "[rax-0x80000000]"
        );
    }

    #[test]
    fn offset() {
        let m = Mem::base(Gpr::Rax).disp(0x40);
        assert_eq!(m.offset(64).unwrap().disp, 0x80);
        assert!(Mem::base(Gpr::Rax).disp(i32::MAX).offset(64).is_err());
    }
}
