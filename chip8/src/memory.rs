//! Main memory.
use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
};

/// Flat byte addressable RAM.
///
/// Every access is bounds checked. Instructions that compute addresses
/// from the index register are not masked, so a program pointing `I`
/// past the end of memory will fault here rather than wrap around.
pub struct Memory {
    ram: Box<[u8; MEM_SIZE]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            ram: Box::new([0; MEM_SIZE]),
        }
    }
}

impl Memory {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn read(&self, address: usize) -> Chip8Result<u8> {
        self.ram
            .get(address)
            .copied()
            .ok_or_else(|| Chip8Error::out_of_bounds(address))
    }

    #[inline]
    pub fn write(&mut self, address: usize, value: u8) -> Chip8Result<()> {
        match self.ram.get_mut(address) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Chip8Error::out_of_bounds(address)),
        }
    }

    /// Read a big-endian instruction word.
    #[inline]
    pub fn read_word(&self, address: usize) -> Chip8Result<u16> {
        let hi = self.read(address)?;
        let lo = self.read(address + 1)?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    /// Bulk load data starting at the given address.
    ///
    /// The whole range must fit in memory, otherwise nothing is written.
    pub fn copy(&mut self, start: usize, data: &[u8]) -> Chip8Result<()> {
        // Report the first byte that would land outside.
        let end = start
            .checked_add(data.len())
            .filter(|end| *end <= MEM_SIZE)
            .ok_or_else(|| Chip8Error::out_of_bounds(start.max(MEM_SIZE)))?;
        self.ram[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Zero fill.
    pub fn clear(&mut self) {
        self.ram.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.ram[..]
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.ram[..]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_write_read() {
        let mut mem = Memory::new();
        for address in [0, 1, MEM_START, 0x7FF, MEM_SIZE - 1] {
            mem.write(address, 0xA5).unwrap();
            assert_eq!(mem.read(address), Ok(0xA5));
        }
    }

    #[test]
    fn test_out_of_bounds() {
        let mut mem = Memory::new();
        assert_eq!(
            mem.read(MEM_SIZE),
            Err(Chip8Error::OutOfBounds { address: MEM_SIZE })
        );
        assert_eq!(
            mem.write(MEM_SIZE + 3, 1),
            Err(Chip8Error::OutOfBounds {
                address: MEM_SIZE + 3
            })
        );
        // Word straddling the end of memory.
        assert!(mem.read_word(MEM_SIZE - 1).is_err());
    }

    #[test]
    fn test_copy() {
        let mut mem = Memory::new();
        mem.copy(8, &[0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        assert_eq!(
            mem.as_slice()[..16],
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7]
        );
        assert_eq!(mem.read_word(10), Ok(0x0203));
    }

    #[test]
    fn test_copy_too_large() {
        let mut mem = Memory::new();
        assert!(mem.copy(MEM_SIZE - 4, &[0xFF; 8]).is_err());
        // Nothing was partially written.
        assert!(mem.as_slice().iter().all(|b| *b == 0));
        // Exactly filling up to the end is fine.
        mem.copy(MEM_SIZE - 4, &[0xFF; 4]).unwrap();
    }

    #[test]
    fn test_copy_start_overflows() {
        let mut mem = Memory::new();
        assert_eq!(
            mem.copy(usize::MAX, &[1, 2]),
            Err(Chip8Error::OutOfBounds {
                address: usize::MAX
            })
        );
        assert_eq!(
            mem.copy(MEM_SIZE + 1, &[]),
            Err(Chip8Error::OutOfBounds {
                address: MEM_SIZE + 1
            })
        );
    }

    #[test]
    fn test_clear() {
        let mut mem = Memory::new();
        mem.copy(MEM_START, &[0x12, 0x00]).unwrap();
        mem.clear();
        assert_eq!(mem.read_word(MEM_START), Ok(0));
    }
}
