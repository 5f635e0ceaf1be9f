//! Keypad input state.
use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
};

/// The 16 keys of the COSMAC VIP hexadecimal keypad.
///
/// How host keys map onto these is up to the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = Chip8Error;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        match key_id {
            0 => Ok(Self::Key0),
            1 => Ok(Self::Key1),
            2 => Ok(Self::Key2),
            3 => Ok(Self::Key3),
            4 => Ok(Self::Key4),
            5 => Ok(Self::Key5),
            6 => Ok(Self::Key6),
            7 => Ok(Self::Key7),
            8 => Ok(Self::Key8),
            9 => Ok(Self::Key9),
            10 => Ok(Self::KeyA),
            11 => Ok(Self::KeyB),
            12 => Ok(Self::KeyC),
            13 => Ok(Self::KeyD),
            14 => Ok(Self::KeyE),
            15 => Ok(Self::KeyF),
            _ => Err(Chip8Error::BadKeyIndex(key_id)),
        }
    }
}

/// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
#[derive(Debug, Default, Clone, Copy)]
pub struct Keypad(u16);

impl Keypad {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the state of a key by its raw index.
    pub fn key_pressed(&mut self, key_id: u8, pressed: bool) -> Chip8Result<()> {
        let key = KeyCode::try_from(key_id)?;
        self.set(key, pressed);
        Ok(())
    }

    #[inline]
    pub fn set(&mut self, key: KeyCode, pressed: bool) {
        let mask = 1 << key.as_u8();
        if pressed {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    pub fn is_key_pressed(&self, key_id: u8) -> Chip8Result<bool> {
        check_key(key_id)?;
        Ok(self.0 & (1 << key_id) != 0)
    }

    /// Retrieve the lowest numbered key that is pressed down.
    #[inline]
    pub fn any_key_pressed(&self) -> Option<u8> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as u8)
        }
    }

    /// Set all keys to up.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Raw bitmask, bit N set when key N is down.
    pub fn bits(&self) -> u16 {
        self.0
    }
}

#[inline(always)]
fn check_key(key_id: u8) -> Chip8Result<()> {
    if key_id < KEY_COUNT {
        Ok(())
    } else {
        Err(Chip8Error::BadKeyIndex(key_id))
    }
}
