use crate::error::{Chip8Error, Result};
use std::io;

// NB. addresses are usize here; the interpreter narrows from u16 registers
//     at the call site so every access goes through the same bounds check

/// Represents memory map, ROM, RAM etc.
pub trait MemoryMap {
    /// write unknown len of data into memory at a particular address
    fn write_any(&mut self, reader: &mut impl io::Read, addr: usize) -> Result<usize> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        self.write(&buf, addr)?;
        Ok(len)
    }

    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: usize) -> Result<()> {
        self.get_rw_slice(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// get a big-endian two-byte word (opcodes)
    fn get_word(&self, addr: usize) -> Result<u16> {
        let word = self.get_ro_slice(addr, 2)?;
        Ok(((word[0] as u16) << 8) | (word[1] as u16))
    }

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: usize, len: usize) -> Result<&mut [u8]>;

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: usize, len: usize) -> Result<&[u8]>;
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: usize = 0x0200;

/// biggest program image that fits above the interpreter area
pub const CHIP8_MAX_PROGRAM_BYTES: usize = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR;

/// glyphs live at the very bottom of memory, 5 bytes apiece
pub const CHIP8_FONT_ADDR: usize = 0x000;
pub const CHIP8_FONT_GLYPH_BYTES: usize = 5;

/// Defines the CHIP-8 memory map (4K configuration):
///   0x0000-0x004f  built-in hex font
///   0x0050-0x01ff  reserved for the interpreter
///   0x0200-0x0fff  program and work RAM
#[derive(Clone, PartialEq, Eq)]
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
}

impl MemoryMap for Chip8MemoryMap {
    fn get_rw_slice(&mut self, addr: usize, len: usize) -> Result<&mut [u8]> {
        let end = addr.checked_add(len).ok_or(Chip8Error::MemoryOutOfBounds { address: addr })?;
        // report the first byte that doesn't exist
        let address = addr.max(self.bytes.len());
        self.bytes
            .get_mut(addr..end)
            .ok_or(Chip8Error::MemoryOutOfBounds { address })
    }

    fn get_ro_slice(&self, addr: usize, len: usize) -> Result<&[u8]> {
        let end = addr.checked_add(len).ok_or(Chip8Error::MemoryOutOfBounds { address: addr })?;
        let address = addr.max(self.bytes.len());
        self.bytes
            .get(addr..end)
            .ok_or(Chip8Error::MemoryOutOfBounds { address })
    }
}

impl Chip8MemoryMap {
    /// zeroed RAM with the font baked in
    pub fn new() -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice(),
        };
        mm.load_font();
        mm
    }

    /// rebuild from a raw image, e.g. a restored snapshot
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != CHIP8_RAM_SIZE_BYTES {
            return Err(Chip8Error::CorruptSnapshot(format!(
                "memory image is {} bytes, expected {}",
                bytes.len(),
                CHIP8_RAM_SIZE_BYTES
            )));
        }
        Ok(Chip8MemoryMap {
            bytes: bytes.into(),
        })
    }

    /// zero everything and put the font back
    pub fn clear(&mut self) {
        self.bytes.fill(0);
        self.load_font();
    }

    fn load_font(&mut self) {
        let end = CHIP8_FONT_ADDR + CHIP8_FONT.len();
        self.bytes[CHIP8_FONT_ADDR..end].copy_from_slice(&CHIP8_FONT);
    }

    /// copy a CHIP-8 program in at 0x200
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > CHIP8_MAX_PROGRAM_BYTES {
            return Err(Chip8Error::RomTooLarge {
                size: program.len(),
                max: CHIP8_MAX_PROGRAM_BYTES,
            });
        }
        self.write(program, CHIP8_PROGRAM_ADDR)
    }

    pub fn read_byte(&self, addr: usize) -> Result<u8> {
        Ok(self.get_ro_slice(addr, 1)?[0])
    }

    pub fn write_byte(&mut self, addr: usize, value: u8) -> Result<()> {
        self.get_rw_slice(addr, 1)?[0] = value;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Chip8MemoryMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 4K of hex is never what anyone wants in a panic message
        f.debug_struct("Chip8MemoryMap")
            .field("len", &self.bytes.len())
            .finish()
    }
}

const CHIP8_FONT: [u8; 80] = [
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8MemoryMap::new();
        // NB. memory is zeroed from 0x200 because before that we bake in the
        //     font and other interpreter details
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
        assert_eq!(m.bytes[0x50..0x200], [0; 0x1b0]);
    }

    #[test]
    fn test_font_at_zero() -> Result<()> {
        let m = Chip8MemoryMap::new();
        assert_eq!(m.get_ro_slice(0, 5)?, &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        // glyph F is the last one
        assert_eq!(m.get_ro_slice(0x4b, 5)?, &[0xF0, 0x80, 0xF0, 0x80, 0x80]);
        Ok(())
    }

    #[test]
    fn test_write_any_data_ok() -> Result<()> {
        let mut dst = Chip8MemoryMap::new();
        let mut src: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];
        let len = dst.write_any(&mut src, 0x300)?;
        assert_eq!(len, 8);
        assert_eq!(dst.get_ro_slice(0x2fc, 12)?, &[0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7]);
        Ok(())
    }

    #[test]
    fn test_read_word() -> Result<()> {
        let mut m = Chip8MemoryMap::new();
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x200)?;
        assert_eq!(m.get_word(0x204)?, 0x0405);
        Ok(())
    }

    #[test]
    fn test_write_past_end_rejected() {
        let mut dst = Chip8MemoryMap::new();
        let err = dst.write(&[0; 8], 4089).unwrap_err();
        assert!(matches!(err, Chip8Error::MemoryOutOfBounds { address: 4096 }));
    }

    #[test]
    fn test_word_at_last_byte_rejected() {
        let m = Chip8MemoryMap::new();
        assert!(m.get_word(0xfff).is_err());
        assert!(m.get_word(0xffe).is_ok());
    }

    #[test]
    fn test_program_load_ok() -> Result<()> {
        let mut dst = Chip8MemoryMap::new();
        dst.load_program(&[0x00, 0xe0])?; // clear screen
        assert_eq!(dst.get_ro_slice(0x200, 2)?, &[0x00, 0xe0]);
        Ok(())
    }

    #[test]
    fn test_program_fills_memory_exactly() -> Result<()> {
        let mut dst = Chip8MemoryMap::new();
        dst.load_program(&[0xaa; CHIP8_MAX_PROGRAM_BYTES])?;
        assert_eq!(dst.read_byte(0xfff)?, 0xaa);
        Ok(())
    }

    #[test]
    fn test_program_too_big() {
        let mut dst = Chip8MemoryMap::new();
        let err = dst.load_program(&[0; CHIP8_MAX_PROGRAM_BYTES + 1]).unwrap_err();
        assert!(matches!(err, Chip8Error::RomTooLarge { size: 3585, max: 3584 }));
        // nothing was written
        assert_eq!(dst.read_byte(0x200).unwrap(), 0);
    }

    #[test]
    fn test_clear_restores_font() -> Result<()> {
        let mut m = Chip8MemoryMap::new();
        m.write(&[0xff; 16], 0)?;
        m.write_byte(0x400, 9)?;
        m.clear();
        assert_eq!(m, Chip8MemoryMap::new());
        Ok(())
    }

    #[test]
    fn test_from_bytes_wrong_size() {
        assert!(Chip8MemoryMap::from_bytes(&[0; 100]).is_err());
    }
}
