//! register definitions

use std::fmt;


/// Vector register widths
///
/// The quaded 2048-bit virtual width is not a hardware width, it lowers
/// to four Z512 parts before anything here sees it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Width {
    X128,
    Y256,
    Z512,
}

impl Width {
    /// Size of one vector in bytes
    #[inline]
    pub fn bytes(self) -> u32 {
        match self {
            Width::X128 => 16,
            Width::Y256 => 32,
            Width::Z512 => 64,
        }
    }

    /// The L'L (or VEX.L) field value
    #[inline]
    pub fn ll(self) -> u8 {
        match self {
            Width::X128 => 0,
            Width::Y256 => 1,
            Width::Z512 => 2,
        }
    }

    pub fn from_ll(ll: u8) -> Option<Width> {
        match ll {
            0 => Some(Width::X128),
            1 => Some(Width::Y256),
            2 => Some(Width::Z512),
            _ => None,
        }
    }

    /// Register naming for display ("xmm3", "ymm3", "zmm3")
    pub fn reg_name(self, idx: u8) -> String {
        let prefix = match self {
            Width::X128 => "xmm",
            Width::Y256 => "ymm",
            Width::Z512 => "zmm",
        };
        format!("{}{}", prefix, idx)
    }
}


/// A SIMD register index
///
/// Valid ranges depend on the target: 0-15 under VEX, 0-31 under EVEX,
/// and 0-7 for the quaded virtual registers (each of which owns four
/// consecutive zmm registers). The assembler validates the range, the
/// index itself carries no width.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct VReg(u8);

impl VReg {
    #[inline]
    pub const fn new(idx: u8) -> VReg {
        VReg(idx)
    }

    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }
}

/// Shorthand constructor for a SIMD register
#[inline]
pub const fn v(idx: u8) -> VReg {
    VReg::new(idx)
}


/// The sixteen general-purpose registers, used only for addressing
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Gpr {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8  = 8,
    R9  = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Gpr {
    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Gpr::Rax => "rax",
            Gpr::Rcx => "rcx",
            Gpr::Rdx => "rdx",
            Gpr::Rbx => "rbx",
            Gpr::Rsp => "rsp",
            Gpr::Rbp => "rbp",
            Gpr::Rsi => "rsi",
            Gpr::Rdi => "rdi",
            Gpr::R8  => "r8",
            Gpr::R9  => "r9",
            Gpr::R10 => "r10",
            Gpr::R11 => "r11",
            Gpr::R12 => "r12",
            Gpr::R13 => "r13",
            Gpr::R14 => "r14",
            Gpr::R15 => "r15",
        }
    }

    pub fn from_index(idx: u8) -> Option<Gpr> {
        match idx {
            0  => Some(Gpr::Rax),
            1  => Some(Gpr::Rcx),
            2  => Some(Gpr::Rdx),
            3  => Some(Gpr::Rbx),
            4  => Some(Gpr::Rsp),
            5  => Some(Gpr::Rbp),
            6  => Some(Gpr::Rsi),
            7  => Some(Gpr::Rdi),
            8  => Some(Gpr::R8),
            9  => Some(Gpr::R9),
            10 => Some(Gpr::R10),
            11 => Some(Gpr::R11),
            12 => Some(Gpr::R12),
            13 => Some(Gpr::R13),
            14 => Some(Gpr::R14),
            15 => Some(Gpr::R15),
            _  => None,
        }
    }
}

impl fmt::Display for Gpr {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(fmt, "{}", self.name())
    }
}


/// AVX-512 opmask registers k0-k7
///
/// Only used internally by the EVEX compare lowering, which round-trips
/// the predicate result through k1.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KReg(u8);

impl KReg {
    #[inline]
    pub const fn new(idx: u8) -> KReg {
        KReg(idx)
    }

    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for KReg {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(fmt, "k{}", self.0)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_names() {
        assert_eq!(Width::X128.reg_name(3), "xmm3");
        assert_eq!(Width::Y256.reg_name(15), "ymm15");
        assert_eq!(Width::Z512.reg_name(31), "zmm31");
        assert_eq!(Gpr::R13.name(), "r13");
        assert_eq!(format!("{}", KReg::new(1)), "k1");
    }

    #[test]
    fn gpr_round_trip() {
        for i in 0..16 {
            assert_eq!(Gpr::from_index(i).unwrap().index(), i);
        }
        assert!(Gpr::from_index(16).is_none());
    }
}
