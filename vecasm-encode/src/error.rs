
use crate::prefix::Map;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("register index {0} out of range (max {1})")]
    InvalidRegister(u8, u8),
    #[error("rsp cannot be an index register")]
    InvalidIndex,
    #[error("{0} is not available on this target")]
    Unsupported(&'static str),
    #[error("shift of {0} exceeds the lane width")]
    InvalidShift(u8),
    #[error("displacement overflow in quaded operand")]
    DispOverflow,
    #[error("truncated instruction")]
    Truncated,
    #[error("invalid prefix byte {0:#04x}")]
    InvalidPrefix(u8),
    #[error("unknown instruction {0:#04x} in map {1:?}")]
    UnknownOpcode(u8, Map),
    #[error("unsupported addressing form")]
    UnsupportedAddressing,
}
