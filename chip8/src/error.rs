//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::MAX_PROGRAM_SIZE;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

/// Faults raised by the virtual machine.
///
/// None of these are recoverable mid-program. They indicate either a
/// malformed ROM or a bug in the interpreter, and the caller should
/// stop ticking the VM once one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chip8Error {
    /// Subroutine call with a full call stack.
    StackOverflow,
    /// Return with an empty call stack.
    StackUnderflow,
    /// Memory access outside of addressable RAM.
    OutOfBounds { address: usize },
    /// Instruction word that doesn't decode to any known operation.
    UnknownOpcode(u16),
    /// Keypad index outside of 0x0-0xF.
    BadKeyIndex(u8),
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize },
    /// Font data of the wrong length.
    Font { size: usize },
}

impl Chip8Error {
    pub(crate) fn out_of_bounds(address: impl Into<usize>) -> Self {
        Self::OutOfBounds {
            address: address.into(),
        }
    }
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackOverflow => write!(f, "call stack overflow"),
            Self::StackUnderflow => write!(f, "call stack underflow"),
            Self::OutOfBounds { address } => {
                write!(f, "memory access out of bounds at 0x{address:04X}")
            }
            Self::UnknownOpcode(opcode) => write!(f, "unsupported opcode {opcode:04X}"),
            Self::BadKeyIndex(key) => {
                write!(f, "key index 0x{key:02X} out of range 0 <= key < 16")
            }
            Self::LargeProgram { size } => write!(
                f,
                "program of {size} bytes too large for VM memory, limit is {MAX_PROGRAM_SIZE}"
            ),
            Self::Font { size } => write!(f, "fontset data must be 80 bytes, got {size}"),
        }
    }
}

impl std::error::Error for Chip8Error {}
