//! Monochrome display buffer.
use std::fmt::{self, Write};

use crate::constants::*;

/// Row-major snapshot of the display, one byte per pixel, non-zero is lit.
pub type Chip8DisplayBuffer = [u8; DISPLAY_BUFFER_SIZE];

/// Screen buffer that sprites are drawn to.
pub struct Display {
    pixels: Box<Chip8DisplayBuffer>,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            pixels: Box::new([0; DISPLAY_BUFFER_SIZE]),
        }
    }
}

impl Display {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Toggle the pixel at the given coordinate, returning its previous value.
    ///
    /// Coordinates wrap around both edges independently, so sprites drawn
    /// past the right or bottom edge continue on the other side.
    #[inline]
    pub fn draw(&mut self, x: usize, y: usize) -> u8 {
        let index = (x % DISPLAY_WIDTH) + DISPLAY_WIDTH * (y % DISPLAY_HEIGHT);
        let old_px = self.pixels[index];
        self.pixels[index] ^= 1;
        old_px
    }

    /// Copy of the current buffer, detached from further drawing.
    pub fn screen(&self) -> Chip8DisplayBuffer {
        *self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[(x % DISPLAY_WIDTH) + DISPLAY_WIDTH * (y % DISPLAY_HEIGHT)] != 0
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|px| *px == 0)
    }

    /// Render the buffer as text, `#` for lit and `.` for unlit pixels.
    pub fn dump<W: Write>(&self, w: &mut W) -> fmt::Result {
        for row in self.pixels.chunks(DISPLAY_WIDTH) {
            for px in row {
                w.write_char(if *px != 0 { '#' } else { '.' })?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}
