//! Flat 4 KiB address space with the built-in fonts
use static_assertions::const_assert;

use crate::error::{EngineError, LoadError};

/// Size of the address space, in bytes
pub const MEMORY_SIZE: usize = 4096;

/// Address at which programs are loaded
pub const PROGRAM_START: u16 = 0x200;

/// Address of the small (4×5) hexadecimal font
pub const FONT_START: u16 = 0x050;

/// Address of the large (8×10) hexadecimal font
pub const BIG_FONT_START: u16 = 0x0A0;

/// Bytes per glyph in the small font
pub const FONT_GLYPH_SIZE: u16 = 5;

/// Bytes per glyph in the large font
pub const BIG_FONT_GLYPH_SIZE: u16 = 10;

/// Largest image accepted by [`Memory::load_program`] at [`PROGRAM_START`]
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

#[rustfmt::skip]
const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

#[rustfmt::skip]
const BIG_FONT: [u8; 160] = [
    0x3C, 0x7E, 0xE7, 0xC3, 0xC3, 0xC3, 0xC3, 0xE7, 0x7E, 0x3C, // 0
    0x18, 0x38, 0x58, 0x18, 0x18, 0x18, 0x18, 0x18, 0x18, 0x3C, // 1
    0x3E, 0x7F, 0xC3, 0x06, 0x0C, 0x18, 0x30, 0x60, 0xFF, 0xFF, // 2
    0x3C, 0x7E, 0xC3, 0x03, 0x0E, 0x0E, 0x03, 0xC3, 0x7E, 0x3C, // 3
    0x06, 0x0E, 0x1E, 0x36, 0x66, 0xC6, 0xFF, 0xFF, 0x06, 0x06, // 4
    0xFF, 0xFF, 0xC0, 0xC0, 0xFC, 0xFE, 0x03, 0xC3, 0x7E, 0x3C, // 5
    0x3E, 0x7C, 0xC0, 0xC0, 0xFC, 0xFE, 0xC3, 0xC3, 0x7E, 0x3C, // 6
    0xFF, 0xFF, 0x03, 0x06, 0x0C, 0x18, 0x30, 0x60, 0x60, 0x60, // 7
    0x3C, 0x7E, 0xC3, 0xC3, 0x7E, 0x7E, 0xC3, 0xC3, 0x7E, 0x3C, // 8
    0x3C, 0x7E, 0xC3, 0xC3, 0x7F, 0x3F, 0x03, 0x03, 0x3E, 0x7C, // 9
    0x18, 0x3C, 0x66, 0xC3, 0xC3, 0xFF, 0xFF, 0xC3, 0xC3, 0xC3, // A
    0xFC, 0xFE, 0xC3, 0xC3, 0xFE, 0xFE, 0xC3, 0xC3, 0xFE, 0xFC, // B
    0x3C, 0x7E, 0xC3, 0xC0, 0xC0, 0xC0, 0xC0, 0xC3, 0x7E, 0x3C, // C
    0xFC, 0xFE, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xC3, 0xFE, 0xFC, // D
    0xFF, 0xFF, 0xC0, 0xC0, 0xFC, 0xFC, 0xC0, 0xC0, 0xFF, 0xFF, // E
    0xFF, 0xFF, 0xC0, 0xC0, 0xFC, 0xFC, 0xC0, 0xC0, 0xC0, 0xC0, // F
];

const_assert!(FONT_START as usize + FONT.len() <= BIG_FONT_START as usize);
const_assert!(BIG_FONT_START as usize + BIG_FONT.len() <= PROGRAM_START as usize);

/// Byte-addressed memory of [`MEMORY_SIZE`] bytes
///
/// Every access is bounds-checked; out-of-range addresses produce
/// [`EngineError::OutOfBounds`] rather than wrapping.
#[derive(Clone)]
pub struct Memory(Box<[u8; MEMORY_SIZE]>);

impl Memory {
    /// Builds a zeroed memory with both fonts installed
    pub fn new() -> Self {
        let mut m = Memory(Box::new([0u8; MEMORY_SIZE]));
        m.install_fonts();
        m
    }

    fn install_fonts(&mut self) {
        let f = FONT_START as usize;
        self.0[f..f + FONT.len()].copy_from_slice(&FONT);
        let b = BIG_FONT_START as usize;
        self.0[b..b + BIG_FONT.len()].copy_from_slice(&BIG_FONT);
    }

    /// Zeroes memory and reinstalls the fonts
    fn reset(&mut self) {
        self.0.fill(0);
        self.install_fonts();
    }

    /// Reads a single byte
    #[inline]
    pub fn read(&self, addr: usize) -> Result<u8, EngineError> {
        self.0
            .get(addr)
            .copied()
            .ok_or(EngineError::OutOfBounds { addr })
    }

    /// Writes a single byte
    #[inline]
    pub fn write(&mut self, addr: usize, v: u8) -> Result<(), EngineError> {
        let b = self
            .0
            .get_mut(addr)
            .ok_or(EngineError::OutOfBounds { addr })?;
        *b = v;
        Ok(())
    }

    /// Reads a big-endian word from `addr` and `addr + 1`
    #[inline]
    pub fn read_word(&self, addr: usize) -> Result<u16, EngineError> {
        let hi = self.read(addr)?;
        let lo = self.read(addr + 1)?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    /// Borrows `len` bytes starting at `addr`
    ///
    /// Fails with the first out-of-range address if the slice would run past
    /// the end of memory.
    pub fn slice(&self, addr: usize, len: usize) -> Result<&[u8], EngineError> {
        if addr > MEMORY_SIZE {
            return Err(EngineError::OutOfBounds { addr });
        }
        self.0
            .get(addr..addr.saturating_add(len))
            .ok_or(EngineError::OutOfBounds { addr: MEMORY_SIZE })
    }

    /// Resets memory, then copies `image` into it at `offset`
    ///
    /// Nothing is modified if the image does not fit.
    pub fn load_program(
        &mut self,
        image: &[u8],
        offset: usize,
    ) -> Result<(), LoadError> {
        let end = offset
            .checked_add(image.len())
            .filter(|end| *end <= MEMORY_SIZE)
            .ok_or(LoadError::TooLarge {
                len: image.len(),
                offset,
                capacity: MEMORY_SIZE,
            })?;
        self.reset();
        self.0[offset..end].copy_from_slice(image);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory").field("size", &MEMORY_SIZE).finish()
    }
}
