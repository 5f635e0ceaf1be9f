//! Call stack.
use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
};

/// Stack of return pointers used for jumping when a routine call finishes.
#[derive(Debug, Default)]
pub struct CallStack {
    /// Stack pointer, pointing at the next free slot.
    sp: usize,
    addresses: [Address; STACK_SIZE],
}

impl CallStack {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, address: Address) -> Chip8Result<()> {
        if self.sp >= STACK_SIZE {
            return Err(Chip8Error::StackOverflow);
        }
        self.addresses[self.sp] = address;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Chip8Result<Address> {
        let (sp, underflow) = self.sp.overflowing_sub(1);
        if underflow {
            return Err(Chip8Error::StackUnderflow);
        }
        self.sp = sp;
        Ok(self.addresses[sp])
    }

    pub fn clear(&mut self) {
        self.sp = 0;
        self.addresses.fill(0);
    }

    /// Current nesting depth.
    pub fn len(&self) -> usize {
        self.sp
    }

    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }
}
