use std::io;
use thiserror::Error;

/// everything that can stop the machine or a load/save
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("program image is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: usize },

    #[error("program counter {pc:#06X} is outside memory")]
    ProgramCounterOutOfRange { pc: u16 },

    #[error("stack overflow: call at {pc:#06X} with all 16 slots in use")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: return at {pc:#06X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("unknown opcode {opcode:#06X} at {pc:#06X}")]
    UnknownOpcode { opcode: u16, pc: u16 },

    #[error("no such register V{index:X}")]
    RegisterOutOfRange { index: usize },

    #[error("no such key {key:#04X}")]
    KeyOutOfRange { key: usize },

    #[error("snapshot version {found} is not supported (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("snapshot encoding: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Chip8Error>;
