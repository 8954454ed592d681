//! Machine state: everything the CHIP-8 owns, and nothing it does.
//!
//! The interpreter is the only thing that should be mutating this while a
//! program runs; the loader may swap it out wholesale when restoring a
//! snapshot.
use crate::error::{Chip8Error, Result};
use crate::memory::{Chip8MemoryMap, CHIP8_PROGRAM_ADDR};
use std::fmt;

pub const REGISTER_COUNT: usize = 16;
pub const STACK_DEPTH: usize = 16;
pub const KEY_COUNT: usize = 16;
pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// return addresses for 2NNN/00EE
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    slots: [u16; STACK_DEPTH],
    pointer: usize,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// `pc` is only used to say where things went wrong
    pub fn push(&mut self, addr: u16, pc: u16) -> Result<()> {
        let slot = self
            .slots
            .get_mut(self.pointer)
            .ok_or(Chip8Error::StackOverflow { pc })?;
        *slot = addr;
        self.pointer += 1;
        Ok(())
    }

    pub fn pop(&mut self, pc: u16) -> Result<u16> {
        if self.pointer == 0 {
            return Err(Chip8Error::StackUnderflow { pc });
        }
        self.pointer -= 1;
        Ok(self.slots[self.pointer])
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn slots(&self) -> &[u16; STACK_DEPTH] {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.pointer == 0
    }

    /// rebuild from persisted parts; the cursor has to land inside the stack
    pub fn from_parts(slots: [u16; STACK_DEPTH], pointer: usize) -> Result<Self> {
        if pointer > STACK_DEPTH {
            return Err(Chip8Error::CorruptSnapshot(format!(
                "stack pointer {} is past the end of the stack",
                pointer
            )));
        }
        Ok(CallStack { slots, pointer })
    }
}

/// current level of the 16 hex keys; no queueing, no debouncing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; KEY_COUNT],
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self, key: usize) -> Result<bool> {
        self.keys
            .get(key)
            .copied()
            .ok_or(Chip8Error::KeyOutOfRange { key })
    }

    pub fn set(&mut self, key: usize, pressed: bool) -> Result<()> {
        let slot = self
            .keys
            .get_mut(key)
            .ok_or(Chip8Error::KeyOutOfRange { key })?;
        *slot = pressed;
        Ok(())
    }

    /// the key FX0A would pick: with several held, the highest index wins
    pub fn last_pressed(&self) -> Option<usize> {
        self.keys.iter().rposition(|&pressed| pressed)
    }

    pub fn release_all(&mut self) {
        self.keys = [false; KEY_COUNT];
    }

    pub fn as_array(&self) -> &[bool; KEY_COUNT] {
        &self.keys
    }

    pub fn from_array(keys: [bool; KEY_COUNT]) -> Self {
        Keypad { keys }
    }
}

/// 64x32 monochrome screen, indexed [y][x]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    cells: [[bool; SCREEN_WIDTH]; SCREEN_HEIGHT],
}

impl Default for Framebuffer {
    fn default() -> Self {
        Framebuffer {
            cells: [[false; SCREEN_WIDTH]; SCREEN_HEIGHT],
        }
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> usize {
        SCREEN_WIDTH
    }

    pub fn height(&self) -> usize {
        SCREEN_HEIGHT
    }

    /// off-screen reads come back as unset
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.cells
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(false)
    }

    /// off-screen writes are dropped; returns whether the cell existed
    pub fn set(&mut self, x: usize, y: usize, on: bool) -> bool {
        match self.cells.get_mut(y).and_then(|row| row.get_mut(x)) {
            Some(cell) => {
                *cell = on;
                true
            }
            None => false,
        }
    }

    /// XOR a cell, returning true if it went from set to unset
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        match self.cells.get_mut(y).and_then(|row| row.get_mut(x)) {
            Some(cell) => {
                let was_on = *cell;
                *cell = !was_on;
                was_on
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.cells = [[false; SCREEN_WIDTH]; SCREEN_HEIGHT];
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool; SCREEN_WIDTH]> {
        self.cells.iter()
    }

    /// every lit cell as (x, y)
    pub fn lit(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &on)| on)
                .map(move |(x, _)| (x, y))
        })
    }

    /// one u64 per row, leftmost cell in the top bit
    pub fn to_row_masks(&self) -> Vec<u64> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .fold(0u64, |mask, &on| (mask << 1) | (on as u64))
            })
            .collect()
    }

    pub fn from_row_masks(masks: &[u64]) -> Result<Self> {
        if masks.len() != SCREEN_HEIGHT {
            return Err(Chip8Error::CorruptSnapshot(format!(
                "framebuffer has {} rows, expected {}",
                masks.len(),
                SCREEN_HEIGHT
            )));
        }
        let mut fb = Framebuffer::new();
        for (row, mask) in fb.cells.iter_mut().zip(masks) {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = (mask >> (SCREEN_WIDTH - 1 - x)) & 1 == 1;
            }
        }
        Ok(fb)
    }
}

/// The authoritative CHIP-8 hardware state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineState {
    memory: Chip8MemoryMap,
    v: [u8; REGISTER_COUNT],
    index: u16,
    program_counter: u16,
    stack: CallStack,
    keypad: Keypad,
    framebuffer: Framebuffer,
    needs_redraw: bool,
    delay_timer: u8,
    sound_timer: u8,
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineState {
    /// a machine in its power-on configuration
    pub fn new() -> Self {
        MachineState {
            memory: Chip8MemoryMap::new(),
            v: [0; REGISTER_COUNT],
            index: 0,
            program_counter: CHIP8_PROGRAM_ADDR as u16,
            stack: CallStack::new(),
            keypad: Keypad::new(),
            framebuffer: Framebuffer::new(),
            needs_redraw: true,
            delay_timer: 0,
            sound_timer: 0,
        }
    }

    /// PC=0x200, everything else zeroed, font loaded, screen cleared and
    /// flagged for a redraw
    pub fn reset(&mut self) {
        self.memory.clear();
        self.v = [0; REGISTER_COUNT];
        self.index = 0;
        self.program_counter = CHIP8_PROGRAM_ADDR as u16;
        self.stack = CallStack::new();
        self.keypad.release_all();
        self.framebuffer.clear();
        self.needs_redraw = true;
        self.delay_timer = 0;
        self.sound_timer = 0;
    }

    /// used by the loader to rebuild a persisted machine
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        memory: Chip8MemoryMap,
        v: [u8; REGISTER_COUNT],
        index: u16,
        program_counter: u16,
        stack: CallStack,
        keypad: Keypad,
        framebuffer: Framebuffer,
        needs_redraw: bool,
        delay_timer: u8,
        sound_timer: u8,
    ) -> Self {
        MachineState {
            memory,
            v,
            index,
            program_counter,
            stack,
            keypad,
            framebuffer,
            needs_redraw,
            delay_timer,
            sound_timer,
        }
    }

    pub fn v(&self, index: usize) -> Result<u8> {
        self.v
            .get(index)
            .copied()
            .ok_or(Chip8Error::RegisterOutOfRange { index })
    }

    pub fn set_v(&mut self, index: usize, value: u8) -> Result<()> {
        let reg = self
            .v
            .get_mut(index)
            .ok_or(Chip8Error::RegisterOutOfRange { index })?;
        *reg = value;
        Ok(())
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.v
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn set_index(&mut self, value: u16) {
        self.index = value;
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn set_program_counter(&mut self, value: u16) {
        self.program_counter = value;
    }

    /// move on by `by` bytes (2 per instruction)
    pub fn advance(&mut self, by: u16) {
        self.program_counter = self.program_counter.wrapping_add(by);
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Chip8MemoryMap {
        &mut self.memory
    }

    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut CallStack {
        &mut self.stack
    }

    pub fn key(&self, key: usize) -> Result<bool> {
        self.keypad.is_pressed(key)
    }

    pub fn set_key(&mut self, key: usize, pressed: bool) -> Result<()> {
        self.keypad.set(key, pressed)
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn keypad_mut(&mut self) -> &mut Keypad {
        &mut self.keypad
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    pub fn set_needs_redraw(&mut self, value: bool) {
        self.needs_redraw = value;
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn set_delay_timer(&mut self, value: u8) {
        self.delay_timer = value;
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn set_sound_timer(&mut self, value: u8) {
        self.sound_timer = value;
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "PC={:#05X} I={:#05X} SP={} DT={} ST={} redraw={}",
            self.program_counter,
            self.index,
            self.stack.pointer(),
            self.delay_timer,
            self.sound_timer,
            self.needs_redraw
        )?;
        for (i, v) in self.v.iter().enumerate() {
            write!(f, "V{:X}={:02X} ", i, v)?;
        }
        writeln!(f)?;
        write!(f, "stack:")?;
        for addr in &self.stack.slots()[..self.stack.pointer()] {
            write!(f, " {:#05X}", addr)?;
        }
        Ok(())
    }
}
