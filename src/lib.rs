//! Runtime assembler for packed-float x86-64 SIMD
//!
//! Emits raw VEX/EVEX machine code for a small packed f32/f64
//! instruction set at one of four target widths: 128/256/512-bit
//! hardware vectors, or a quaded 2048-bit virtual width where every
//! operation expands to four consecutive zmm instructions.
//!
//! ```
//! use vecasm::Assembler;
//! use vecasm::Target;
//! use vecasm::v;
//!
//! let mut asm = Assembler::new(Target::Z512);
//! asm.add_f32(v(1), v(2), v(3))?;
//! assert_eq!(asm.bytes(), &[0x62, 0xf1, 0x6c, 0x48, 0x58, 0xcb]);
//! # Ok::<(), vecasm::Error>(())
//! ```

pub mod isa;
pub mod asm;
pub mod disas;

pub use vecasm_encode::Error;
pub use vecasm_encode::Width;
pub use vecasm_encode::VReg;
pub use vecasm_encode::Gpr;
pub use vecasm_encode::v;
pub use vecasm_encode::Mem;
pub use vecasm_encode::Scale;

pub use crate::asm::Assembler;
pub use crate::asm::Target;
pub use crate::asm::Operand;
pub use crate::isa::CmpOp;
pub use crate::isa::RoundMode;
