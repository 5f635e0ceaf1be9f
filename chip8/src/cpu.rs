//! CPU and memory state.
use crate::{
    constants::*, display::Display, error::Chip8Result, input::Keypad, memory::Memory,
    stack::CallStack,
};

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current position in the bytecode.
    pub(crate) pc: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address.
    ///
    /// Never masked to 12 bits, so instructions indexing past the end
    /// of RAM fault instead of wrapping.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. A beep is played when it runs out.
    pub(crate) sound_timer: u8,
    /// Destination register when the machine is stalled waiting for a keypress.
    pub(crate) key_wait: Option<u8>,

    // ------------------------------------------------------------------------
    // Devices
    pub(crate) ram: Memory,
    pub(crate) stack: CallStack,
    pub(crate) display: Display,
    pub(crate) keypad: Keypad,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self {
            pc: MEM_START,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            key_wait: None,

            ram: Memory::new(),
            stack: CallStack::new(),
            display: Display::new(),
            keypad: Keypad::new(),
        }
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Zero all state and point the program counter at the load address.
    ///
    /// Buffers are cleared in place rather than reallocated.
    pub(crate) fn reset(&mut self) {
        self.pc = MEM_START;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.key_wait = None;

        self.ram.clear();
        self.stack.clear();
        self.display.clear();
        self.keypad.clear();
    }

    /// Write the side output of an instruction to VF.
    #[inline(always)]
    pub(crate) fn set_flag(&mut self, flag: bool) {
        self.registers[FLAG_REGISTER] = flag as u8;
    }

    #[inline(always)]
    pub(crate) fn skip_if(&mut self, cond: bool) {
        if cond {
            self.pc += 2;
        }
    }

    /// Read the instruction word at the program counter, without advancing.
    #[inline(always)]
    pub(crate) fn instr(&self) -> Chip8Result<u16> {
        self.ram.read_word(self.pc)
    }

    /// Count down the delay timer.
    #[inline]
    pub(crate) fn tick_delay(&mut self) {
        // The checked_sub implementation uses `unlikely!()` which degrades performance.
        let (val, underflow) = self.delay_timer.overflowing_sub(1);
        if !underflow {
            self.delay_timer = val;
        }
    }

    /// Count down the sound timer.
    ///
    /// Returns true on the tick that takes it from 1 to 0.
    #[inline]
    pub(crate) fn tick_sound(&mut self) -> bool {
        let (val, underflow) = self.sound_timer.overflowing_sub(1);
        if !underflow {
            self.sound_timer = val;
        }
        !underflow && val == 0
    }
}
