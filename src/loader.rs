//! Getting bytes in and out of the machine: raw program images, and whole
//! machine snapshots.
//!
//! Snapshots are JSON with a magic string and a version number up front so
//! that old save files can be recognised (and refused) if the layout ever
//! changes.
use crate::error::{Chip8Error, Result};
use crate::memory::Chip8MemoryMap;
use crate::state::{CallStack, Framebuffer, Keypad, MachineState, KEY_COUNT, REGISTER_COUNT, STACK_DEPTH};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_MAGIC: &str = "chip8.snapshot";
pub const SNAPSHOT_VERSION: u32 = 1;
pub const SNAPSHOT_EXTENSION: &str = "sav";

/// a raw program image; no header, just bytes for 0x200 onwards
pub fn read_rom(path: &Path) -> Result<Vec<u8>> {
    let rom = fs::read(path)?;
    log::debug!("read {} bytes from {}", rom.len(), path.display());
    Ok(rom)
}

/// `roms/pong.ch8` saves to `roms/pong.ch8.sav`
pub fn default_save_path(rom: &Path) -> PathBuf {
    let mut name = rom.as_os_str().to_owned();
    name.push(".");
    name.push(SNAPSHOT_EXTENSION);
    PathBuf::from(name)
}

/// everything in a `MachineState`, in a shape serde can cope with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub magic: String,
    pub version: u32,
    pub memory: Vec<u8>,
    pub v: [u8; REGISTER_COUNT],
    pub index: u16,
    pub program_counter: u16,
    pub stack: [u16; STACK_DEPTH],
    pub stack_pointer: usize,
    pub keys: [bool; KEY_COUNT],
    /// one u64 per row, leftmost pixel in the top bit
    pub framebuffer: Vec<u64>,
    pub needs_redraw: bool,
    pub delay_timer: u8,
    pub sound_timer: u8,
}

impl Snapshot {
    pub fn capture(state: &MachineState) -> Self {
        Snapshot {
            magic: SNAPSHOT_MAGIC.to_string(),
            version: SNAPSHOT_VERSION,
            memory: state.memory().as_bytes().to_vec(),
            v: *state.registers(),
            index: state.index(),
            program_counter: state.program_counter(),
            stack: *state.stack().slots(),
            stack_pointer: state.stack().pointer(),
            keys: *state.keypad().as_array(),
            framebuffer: state.framebuffer().to_row_masks(),
            needs_redraw: state.needs_redraw(),
            delay_timer: state.delay_timer(),
            sound_timer: state.sound_timer(),
        }
    }

    /// check everything before building anything
    pub fn restore(&self) -> Result<MachineState> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(Chip8Error::CorruptSnapshot(format!(
                "bad magic {:?}",
                self.magic
            )));
        }
        if self.version != SNAPSHOT_VERSION {
            return Err(Chip8Error::SnapshotVersion {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(MachineState::from_parts(
            Chip8MemoryMap::from_bytes(&self.memory)?,
            self.v,
            self.index,
            self.program_counter,
            CallStack::from_parts(self.stack, self.stack_pointer)?,
            Keypad::from_array(self.keys),
            Framebuffer::from_row_masks(&self.framebuffer)?,
            self.needs_redraw,
            self.delay_timer,
            self.sound_timer,
        ))
    }
}

pub fn save_state(path: &Path, state: &MachineState) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut out, &Snapshot::capture(state))?;
    out.flush()?;
    log::info!("saved state to {}", path.display());
    Ok(())
}

/// a missing or mangled file is an error for the caller to report; nothing
/// running is touched
pub fn load_state(path: &Path) -> Result<MachineState> {
    let input = BufReader::new(File::open(path)?);
    let snapshot: Snapshot = serde_json::from_reader(input)?;
    let state = snapshot.restore()?;
    log::info!("loaded state from {}", path.display());
    Ok(state)
}
