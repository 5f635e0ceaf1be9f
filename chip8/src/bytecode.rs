//! Helpers for extracting data from opcodes.
use std::fmt;

/// A single 16-bit instruction word, stored big-endian in memory.
///
/// ```text
/// 0xF000  op   identity of the instruction family
/// 0x0F00  x    register operand
/// 0x00F0  y    register operand
/// 0x000F  n    4-bit immediate, or sub-operation
/// 0x00FF  nn   8-bit immediate
/// 0x0FFF  nnn  12-bit address
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    #[inline(always)]
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    /// Extract the instruction family from the upper nibble.
    #[inline(always)]
    pub fn op(self) -> u8 {
        ((self.0 & 0xF000) >> 12) as u8
    }

    /// Extract operand VX.
    #[inline(always)]
    pub fn x(self) -> u8 {
        ((self.0 & 0x0F00) >> 8) as u8
    }

    /// Extract operand VY.
    #[inline(always)]
    pub fn y(self) -> u8 {
        ((self.0 & 0x00F0) >> 4) as u8
    }

    /// Extract operand N, the lowest nibble.
    #[inline(always)]
    pub fn n(self) -> u8 {
        (self.0 & 0x000F) as u8
    }

    /// Extract operand NN, the lowest byte.
    #[inline(always)]
    pub fn nn(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// Extract operand NNN, a 12-bit address.
    #[inline(always)]
    pub fn nnn(self) -> u16 {
        self.0 & 0x0FFF
    }

    /// All four nibbles, most significant first.
    #[inline(always)]
    pub fn nibbles(self) -> (u8, u8, u8, u8) {
        (self.op(), self.x(), self.y(), self.n())
    }

    /// `Fx0A (LD Vx, K)` stalls the machine, so it is singled out before dispatch.
    #[inline(always)]
    pub fn is_key_wait(self) -> bool {
        self.0 & 0xF0FF == 0xF00A
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}
