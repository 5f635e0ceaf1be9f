//! Virtual machine.
use std::fmt::{self, Write};

use log::{debug, warn};

use crate::{
    bytecode::Opcode,
    constants::*,
    cpu::Chip8Cpu,
    devices::{Beeper, RandomSource, RngSource, SilentBeeper},
    display::{Chip8DisplayBuffer, Display},
    error::{Chip8Error, Chip8Result},
    input::KeyCode,
    memory::Memory,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    conf: Chip8Conf,
    /// Font glyphs restored into low memory on every reset.
    font: Box<[u8; FONTSET_DATA_LENGTH]>,
    beeper: Box<dyn Beeper>,
    rng: Box<dyn RandomSource>,
}

impl Chip8Vm {
    /// Create a VM with no sound output and an entropy seeded random source.
    pub fn new(conf: Chip8Conf) -> Self {
        Self::with_devices(conf, SilentBeeper, RngSource::from_entropy())
    }

    pub fn with_devices(
        conf: Chip8Conf,
        beeper: impl Beeper + 'static,
        rng: impl RandomSource + 'static,
    ) -> Self {
        let mut vm = Chip8Vm {
            cpu: Chip8Cpu::new(),
            conf,
            font: Box::new(BUILTIN_FONTSET),
            beeper: Box::new(beeper),
            rng: Box::new(rng),
        };
        vm.reset();
        vm
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Replace the builtin font with custom glyphs.
    ///
    /// The font is kept across resets.
    pub fn load_font(&mut self, fontset: &[u8]) -> Chip8Result<()> {
        if fontset.len() != FONTSET_DATA_LENGTH {
            return Err(Chip8Error::Font {
                size: fontset.len(),
            });
        }

        self.font.copy_from_slice(fontset);
        self.install_font();

        Ok(())
    }

    /// Reset the machine and load a ROM at the program start address.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.reset();

        // Load program into virtual RAM
        self.cpu.ram.copy(MEM_START, bytecode)?;
        debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    /// Clear all state, leaving the program counter at the load address.
    ///
    /// Memory is zeroed, including any loaded program, and the font is restored.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.install_font();
        debug!("reset");
    }

    fn install_font(&mut self) {
        let start = FONTSET_START as usize;
        self.cpu.ram.as_mut_slice()[start..start + FONTSET_DATA_LENGTH]
            .copy_from_slice(&self.font[..]);
    }
}

/// Hint returned to the caller after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// Display buffer changed.
    Draw,
    /// Sound timer was loaded.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
}

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct Chip8Conf {
    pub quirks: Quirks,
}

/// Behaviours where historical interpreters disagree.
///
/// The defaults follow the common modern interpretation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct Quirks {
    /// `Fx55` and `Fx65` leave `I` pointing past the last register
    /// transferred, as the COSMAC VIP did.
    pub load_store_increment_index: bool,
    /// `8xy6` and `8xyE` copy `Vy` into `Vx` before shifting, as the
    /// COSMAC VIP did.
    pub shift_copies_vy: bool,
}

/// Input
impl Chip8Vm {
    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.keypad.set(key, pressed);
    }

    pub fn key_down(&mut self, key_id: u8) -> Chip8Result<()> {
        self.cpu.keypad.key_pressed(key_id, true)
    }

    pub fn key_up(&mut self, key_id: u8) -> Chip8Result<()> {
        self.cpu.keypad.key_pressed(key_id, false)
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.keypad.clear()
    }
}

/// Inspection
impl Chip8Vm {
    pub fn pc(&self) -> Address {
        self.cpu.pc as Address
    }

    pub fn index(&self) -> Address {
        self.cpu.address
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }

    pub fn stack_depth(&self) -> usize {
        self.cpu.stack.len()
    }

    /// Whether the machine is stalled on `Fx0A`.
    pub fn is_waiting_for_key(&self) -> bool {
        self.cpu.key_wait.is_some()
    }

    pub fn memory(&self) -> &Memory {
        &self.cpu.ram
    }

    pub fn display(&self) -> &Display {
        &self.cpu.display
    }

    /// Snapshot of the display buffer for rendering.
    pub fn screen(&self) -> Chip8DisplayBuffer {
        self.cpu.display.screen()
    }
}

/// Interpreter
impl Chip8Vm {
    /// Fetch and execute a single instruction.
    ///
    /// A returned error is a fault that leaves the machine in an undefined
    /// state. The caller should stop ticking, or reload the program.
    pub fn tick(&mut self) -> Chip8Result<Flow> {
        let pc = self.cpu.pc;
        self.step().map_err(|err| {
            warn!("fault at {pc:04X}: {err}");
            err
        })
    }

    /// Tick up to the given number of instructions, stopping at the first fault.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut control_flow = Flow::Ok;
        for _ in 0..step_count {
            control_flow = self.tick()?;
        }
        Ok(control_flow)
    }

    /// Count down the delay and sound timers.
    ///
    /// Must be called at 60Hz, independent of the instruction rate.
    /// Returns true when the sound timer ran out and the beeper was triggered.
    pub fn tick_timers(&mut self) -> bool {
        self.cpu.tick_delay();

        if self.cpu.tick_sound() {
            self.beeper.play();
            true
        } else {
            false
        }
    }

    fn step(&mut self) -> Chip8Result<Flow> {
        // Stalled machine does not fetch until the key arrives.
        if let Some(vx) = self.cpu.key_wait {
            return Ok(self.poll_key(vx));
        }

        // Each instruction is two bytes, with the opcode identity in the first 4-bit nibble.
        let opcode = Opcode(self.cpu.instr()?);
        op_trace(opcode, &self.cpu);

        // Fx0A (LD Vx, K)
        //
        // Wait for a key press, store the value of the key in Vx.
        // The program counter stays on this instruction until a key is pressed.
        if opcode.is_key_wait() {
            self.cpu.key_wait = Some(opcode.x());
            return Ok(self.poll_key(opcode.x()));
        }

        self.cpu.pc += 2;
        self.execute(opcode)
    }

    /// Resolve a pending `Fx0A` if any key is down.
    fn poll_key(&mut self, vx: u8) -> Flow {
        match self.cpu.keypad.any_key_pressed() {
            Some(key) => {
                self.cpu.registers[vx as usize] = key;
                self.cpu.key_wait = None;
                self.cpu.pc += 2;
                Flow::Ok
            }
            None => Flow::KeyWait,
        }
    }

    fn execute(&mut self, opcode: Opcode) -> Chip8Result<Flow> {
        let (op, vx, vy, n) = opcode.nibbles();
        let (vx, vy) = (vx as usize, vy as usize);
        let nn = opcode.nn();
        let nnn = opcode.nnn();

        let mut control_flow = Flow::Ok;

        match op {
            // Miscellaneous instructions identified by nn
            0x0 | 0xE | 0xF => control_flow = self.exec_misc(opcode)?,
            // 1nnn (JP addr)
            //
            // Jump to address.
            0x1 => {
                self.cpu.pc = nnn as usize;
                control_flow = Flow::Jump;
            }
            // 2nnn (CALL addr)
            //
            // Call subroutine at nnn. The return address is the instruction after the call.
            0x2 => {
                self.cpu.stack.push(self.cpu.pc as Address)?;
                self.cpu.pc = nnn as usize;
                control_flow = Flow::Jump;
            }
            // 3xnn (SE Vx, byte)
            //
            // Skip the next instruction if register Vx equals value nn.
            0x3 => self.cpu.skip_if(self.cpu.registers[vx] == nn),
            // 4xnn (SNE Vx, byte)
            //
            // Skip the next instruction if register Vx does not equal value nn.
            0x4 => self.cpu.skip_if(self.cpu.registers[vx] != nn),
            // 5xy0 (SE Vx, Vy)
            //
            // Skip the next instruction if register Vx equals register Vy.
            0x5 if n == 0 => {
                self.cpu
                    .skip_if(self.cpu.registers[vx] == self.cpu.registers[vy]);
            }
            // 6xnn (LD Vx, byte)
            //
            // Set register Vx to value nn.
            0x6 => self.cpu.registers[vx] = nn,
            // 7xnn (ADD Vx, byte)
            //
            // Add value nn to register Vx. Carry flag is not set.
            0x7 => self.cpu.registers[vx] = self.cpu.registers[vx].wrapping_add(nn),
            // Arithmetic instructions identified by n
            0x8 => self.exec_math(opcode)?,
            // 9xy0 (SNE Vx, Vy)
            //
            // Skip next instruction if Vx != Vy.
            0x9 if n == 0 => {
                self.cpu
                    .skip_if(self.cpu.registers[vx] != self.cpu.registers[vy]);
            }
            // Annn (LD I, addr)
            //
            // Set address register I to value nnn.
            0xA => self.cpu.address = nnn,
            // Bnnn (JP V0, addr)
            //
            // Jump to address nnn offset by register V0.
            0xB => {
                self.cpu.pc = nnn as usize + self.cpu.registers[0] as usize;
                control_flow = Flow::Jump;
            }
            // Cxnn (RND Vx, byte)
            //
            // Set register Vx to the result of bitwise AND between a random number and nn.
            0xC => self.cpu.registers[vx] = self.rng.next_byte() & nn,
            // Dxyn (DRW Vx, Vy, nibble)
            //
            // Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
            // Sprite is encoded as 8 pixels wide, n pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // If the sprite is drawn outside of the display area, it is wrapped around to the other side.
            //
            // If the drawing operation erases existing pixels in the display buffer, register VF is set to
            // 1, and set to 0 if no display bits are unset. This is used for collision detection.
            0xD => {
                let x = self.cpu.registers[vx] as usize;
                let y = self.cpu.registers[vy] as usize;
                self.cpu.set_flag(false);

                let mut is_erased = false;
                for r in 0..n as usize {
                    let row = self.cpu.ram.read(self.cpu.address as usize + r)?;

                    // Each row is 8 bits representing the 8 pixels of the sprite.
                    for c in 0..8 {
                        if row & (0b1000_0000 >> c) != 0 {
                            is_erased |= self.cpu.display.draw(x + c, y + r) != 0;
                        }
                    }
                }

                self.cpu.set_flag(is_erased);
                control_flow = Flow::Draw;
            }
            // Unsupported operation.
            _ => return Err(Chip8Error::UnknownOpcode(opcode.0)),
        }

        Ok(control_flow)
    }

    /// Execute an arithmetic instruction
    ///
    /// Where VF is written as a flag it is written last, so the flag wins
    /// when Vx is VF itself.
    #[inline]
    fn exec_math(&mut self, opcode: Opcode) -> Chip8Result<()> {
        debug_assert_eq!(opcode.op(), 0x8);

        let (vx, vy) = (opcode.x() as usize, opcode.y() as usize);
        let (x, y) = (self.cpu.registers[vx], self.cpu.registers[vy]);

        match opcode.n() {
            // 8xy0 (LD Vx, Vy)
            //
            // Store the value of register Vy in register Vx.
            0x0 => self.cpu.registers[vx] = y,
            // 8xy1 (OR Vx, Vy)
            0x1 => self.cpu.registers[vx] = x | y,
            // 8xy2 (AND Vx, Vy)
            0x2 => self.cpu.registers[vx] = x & y,
            // 8xy3 (XOR Vx, Vy)
            0x3 => self.cpu.registers[vx] = x ^ y,
            // 8xy4 (ADD Vx, Vy)
            //
            // Overflow is wrapped.
            // If overflow, set VF to 1, else 0.
            0x4 => {
                let (result, carry) = x.overflowing_add(y);
                self.cpu.registers[vx] = result;
                self.cpu.set_flag(carry);
            }
            // 8xy5 (SUB Vx, Vy)
            //
            // Subtracts Vy from Vx, and stores the result in Vx.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            0x5 => {
                let (result, borrow) = x.overflowing_sub(y);
                self.cpu.registers[vx] = result;
                self.cpu.set_flag(!borrow);
            }
            // 8xy6 (SHR Vx)
            //
            // VF receives the least-significant bit shifted out.
            0x6 => {
                let x = if self.conf.quirks.shift_copies_vy { y } else { x };
                self.cpu.registers[vx] = x >> 1;
                self.cpu.set_flag(x & 1 == 1);
            }
            // 8xy7 (SUBN Vx, Vy)
            //
            // Subtracts Vx from Vy, and stores the result in Vx.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            0x7 => {
                let (result, borrow) = y.overflowing_sub(x);
                self.cpu.registers[vx] = result;
                self.cpu.set_flag(!borrow);
            }
            // 8xyE (SHL Vx)
            //
            // VF receives the most-significant bit shifted out.
            0xE => {
                let x = if self.conf.quirks.shift_copies_vy { y } else { x };
                self.cpu.registers[vx] = x << 1;
                self.cpu.set_flag(x & 0x80 != 0);
            }
            // ----------------------------------------------------------------
            // Unsupported operation.
            _ => return Err(Chip8Error::UnknownOpcode(opcode.0)),
        }

        Ok(())
    }

    /// Execute a miscellaneous instruction
    #[inline]
    fn exec_misc(&mut self, opcode: Opcode) -> Chip8Result<Flow> {
        let vx = opcode.x() as usize;

        let mut control_flow = Flow::Ok;

        match (opcode.op(), opcode.nn()) {
            // ----------------------------------------------------------------
            // 0000 (NOP)
            //
            // Zeroed memory executes as a no-op.
            (0x0, 0x00) if vx == 0 => {}
            // 00E0 (CLS)
            //
            // Clear display
            (0x0, 0xE0) if vx == 0 => {
                self.cpu.display.clear();
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Set the program counter to the address popped off the stack.
            (0x0, 0xEE) if vx == 0 => {
                self.cpu.pc = self.cpu.stack.pop()? as usize;
                control_flow = Flow::Jump;
            }
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            //
            // Skip next instruction if the key named by Vx is pressed.
            (0xE, 0x9E) => {
                let pressed = self.cpu.keypad.is_key_pressed(self.cpu.registers[vx])?;
                self.cpu.skip_if(pressed);
            }
            // ExA1 (SKNP Vx)
            //
            // Skip next instruction if the key named by Vx is not pressed.
            (0xE, 0xA1) => {
                let pressed = self.cpu.keypad.is_key_pressed(self.cpu.registers[vx])?;
                self.cpu.skip_if(!pressed);
            }
            // ----------------------------------------------------------------
            // Fx07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            (0xF, 0x07) => self.cpu.registers[vx] = self.cpu.delay_timer,
            // Fx15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            (0xF, 0x15) => self.cpu.delay_timer = self.cpu.registers[vx],
            // Fx18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            (0xF, 0x18) => {
                self.cpu.sound_timer = self.cpu.registers[vx];
                control_flow = Flow::Sound;
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I. VF is not affected.
            (0xF, 0x1E) => {
                let x = self.cpu.registers[vx] as Address;
                self.cpu.address = self.cpu.address.wrapping_add(x);
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of font glyph for the low nibble of Vx.
            (0xF, 0x29) => {
                let digit = (self.cpu.registers[vx] & 0xF) as Address;
                self.cpu.address = FONTSET_START + digit * FONTSET_HEIGHT as Address;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            (0xF, 0x33) => {
                let addr = self.cpu.address as usize;
                let x = self.cpu.registers[vx];
                self.cpu.ram.write(addr,     x / 100)?;
                self.cpu.ram.write(addr + 1, x / 10 % 10)?;
                self.cpu.ram.write(addr + 2, x % 10)?;
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            (0xF, 0x55) => {
                let addr = self.cpu.address as usize;
                for v in 0..=vx {
                    self.cpu.ram.write(addr + v, self.cpu.registers[v])?;
                }
                self.advance_index(vx);
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            (0xF, 0x65) => {
                let addr = self.cpu.address as usize;
                for v in 0..=vx {
                    self.cpu.registers[v] = self.cpu.ram.read(addr + v)?;
                }
                self.advance_index(vx);
            }
            // ----------------------------------------------------------------
            // Unsupported operation.
            _ => return Err(Chip8Error::UnknownOpcode(opcode.0)),
        }

        Ok(control_flow)
    }

    /// Bulk register transfers only move `I` when the quirk is enabled.
    #[inline]
    fn advance_index(&mut self, vx: usize) {
        if self.conf.quirks.load_store_increment_index {
            self.cpu.address = self.cpu.address.wrapping_add(vx as Address + 1);
        }
    }
}

/// Troubleshooting
#[doc(hidden)]
impl Chip8Vm {
    /// Returns the program area of memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let ram = self.cpu.ram.as_slice();
        let end = (MEM_START + count).min(MEM_SIZE);
        let mut buf = String::new();

        for (i, instr) in ram[MEM_START..end].chunks(2).enumerate() {
            let offset = MEM_START + i * 2;
            match instr {
                [a, b] => writeln!(buf, "{offset:04X}: {a:02X}{b:02X}")?,
                [a] => writeln!(buf, "{offset:04X}: {a:02X}")?,
                _ => {}
            }
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        self.cpu.display.dump(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(opcode: Opcode, cpu: &Chip8Cpu) {
    log::trace!(
        "{:04X}: {} I={:03X} V={:02X?}",
        cpu.pc,
        opcode,
        cpu.address,
        cpu.registers
    );
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: Opcode, _: &Chip8Cpu) {}
