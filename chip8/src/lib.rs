//! Chip-8 virtual machine.
//!
//! The [`Chip8Vm`](prelude::Chip8Vm) is driven from the outside. The caller
//! invokes [`tick`](prelude::Chip8Vm::tick) to execute one instruction, at
//! whatever rate it chooses, and [`tick_timers`](prelude::Chip8Vm::tick_timers)
//! at 60Hz. Rendering, audio and keyboard mapping are left to the caller.
mod bytecode;
pub mod constants;
mod cpu;
mod devices;
mod display;
mod error;
mod input;
mod memory;
mod stack;
mod vm;

pub use self::{
    bytecode::Opcode,
    devices::{Beeper, RandomSource, RngSource, SilentBeeper},
    display::{Chip8DisplayBuffer, Display},
    error::{Chip8Error, Chip8Result},
    input::{KeyCode, Keypad},
    memory::Memory,
    stack::CallStack,
};

pub mod prelude {
    pub use super::{
        devices::{Beeper, RandomSource, RngSource, SilentBeeper},
        error::{Chip8Error, Chip8Result},
        input::KeyCode,
        vm::{Chip8Conf, Chip8Vm, Flow, Quirks},
    };
}
