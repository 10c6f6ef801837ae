//! Common register/operand/error definitions and x86-64 prefix encoders

pub mod error;
pub mod reg;
pub mod mem;
pub mod prefix;
pub mod disas;

pub use error::Error;
pub use reg::Width;
pub use reg::VReg;
pub use reg::Gpr;
pub use reg::KReg;
pub use reg::v;
pub use mem::Mem;
pub use mem::Scale;
pub use prefix::Pp;
pub use prefix::Map;
pub use prefix::Enc;
pub use prefix::Rm;
