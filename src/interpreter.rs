//! # interpreter
//!
//! Fetch/decode/execute for the CHIP-8, one instruction per `cycle()`.
//!
//! `step()` is the whole contract the host needs: one instruction, then one
//! timer tick. Hosts that want the timers at a steady 60Hz instead call
//! `cycle()` at the instruction rate and `tick_timers()` from their own
//! clock.
//!
//! Failure policy is fail-fast everywhere: an unknown opcode, a bad stack
//! operation or an out-of-range memory access returns an error *before*
//! anything is mutated, the PC stays on the offending instruction and the
//! timers don't tick. The host is expected to stop stepping.
//!
//! FX0A never blocks. Until a key is down it's a no-op that leaves the PC
//! where it is, so the next step tries again.
use crate::error::{Chip8Error, Result};
use crate::instruction::Instruction;
use crate::memory::{MemoryMap, CHIP8_FONT_ADDR, CHIP8_FONT_GLYPH_BYTES};
use crate::sound::Sound;
use crate::state::MachineState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::io;

/// how many (pc, opcode) pairs we keep for post-mortems
const HISTORY_LEN: usize = 32;

/// behaviours that differ between interpreters of the CHIP-8 family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quirks {
    /// COSMAC VIP behaviour: FX55/FX65 leave I = I + X + 1
    pub load_store_increments_index: bool,
}

/// what to do with the PC once an instruction has done its thing
enum Flow {
    Next,
    Skip,
    Jump(u16),
    Wait,
}

impl Flow {
    fn skip_if(cond: bool) -> Self {
        if cond {
            Flow::Skip
        } else {
            Flow::Next
        }
    }
}

pub struct Chip8Interpreter<'a> {
    state: MachineState,
    sound: &'a mut dyn Sound,
    rng: StdRng,
    quirks: Quirks,
    history: VecDeque<(u16, u16)>,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(sound: &'a mut dyn Sound) -> Self {
        Self::with_rng(sound, StdRng::from_entropy())
    }

    /// deterministic CXNN, for tests and replays
    pub fn with_seed(sound: &'a mut dyn Sound, seed: u64) -> Self {
        Self::with_rng(sound, StdRng::seed_from_u64(seed))
    }

    fn with_rng(sound: &'a mut dyn Sound, rng: StdRng) -> Self {
        Chip8Interpreter {
            state: MachineState::new(),
            sound,
            rng,
            quirks: Quirks::default(),
            history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    /// reset the machine and load a chip8 program at 0x200
    ///
    /// an oversized image is rejected and the machine is left in its reset
    /// configuration
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<()> {
        self.reset();
        let mut program = Vec::new();
        reader.read_to_end(&mut program)?;
        self.state.memory_mut().load_program(&program)?;
        log::debug!("loaded {} byte program", program.len());
        Ok(())
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.history.clear();
    }

    /// swap in a whole machine, e.g. from a snapshot
    pub fn restore(&mut self, state: MachineState) {
        self.state = state;
        self.history.clear();
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    pub fn set_key(&mut self, key: usize, pressed: bool) -> Result<()> {
        self.state.set_key(key, pressed)
    }

    /// oldest first
    pub fn recent_opcodes(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.history.iter().copied()
    }

    /// one instruction, then one timer tick
    pub fn step(&mut self) -> Result<()> {
        self.cycle()?;
        self.tick_timers();
        Ok(())
    }

    /// one instruction, no timers
    pub fn cycle(&mut self) -> Result<()> {
        let pc = self.state.program_counter();
        let opcode = self.fetch(pc)?;
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back((pc, opcode));

        let ins = Instruction::decode(opcode, pc)?;
        log::trace!("{:#05X}: {:04X}  {}", pc, opcode, ins);

        match self.execute(ins, pc)? {
            Flow::Next => self.state.advance(2),
            Flow::Skip => self.state.advance(4),
            Flow::Jump(addr) => self.state.set_program_counter(addr),
            Flow::Wait => {}
        }
        Ok(())
    }

    /// once-per-step countdown; the alert fires as the sound timer goes 1 -> 0
    pub fn tick_timers(&mut self) {
        let delay = self.state.delay_timer();
        if delay > 0 {
            self.state.set_delay_timer(delay - 1);
        }

        let sound = self.state.sound_timer();
        if sound > 0 {
            if sound == 1 {
                if let Err(e) = self.sound.alert() {
                    log::warn!("sound alert failed: {}", e);
                }
            }
            self.state.set_sound_timer(sound - 1);
        }
    }

    fn fetch(&self, pc: u16) -> Result<u16> {
        self.state
            .memory()
            .get_word(pc as usize)
            .map_err(|_| Chip8Error::ProgramCounterOutOfRange { pc })
    }

    fn v(&self, reg: usize) -> Result<u8> {
        self.state.v(reg)
    }

    fn set_v(&mut self, reg: usize, value: u8) -> Result<()> {
        self.state.set_v(reg, value)
    }

    /// VF goes last so the flag wins when X is F
    fn set_v_with_flag(&mut self, reg: usize, value: u8, flag: bool) -> Result<()> {
        self.set_v(reg, value)?;
        self.set_v(0xF, flag as u8)
    }

    fn execute(&mut self, ins: Instruction, pc: u16) -> Result<Flow> {
        use Instruction::*;
        let flow = match ins {
            Cls => {
                self.state.framebuffer_mut().clear();
                self.state.set_needs_redraw(true);
                Flow::Next
            }
            Ret => {
                let addr = self.state.stack_mut().pop(pc)?;
                Flow::Jump(addr.wrapping_add(2))
            }
            Jp(addr) => Flow::Jump(addr),
            Call(addr) => {
                self.state.stack_mut().push(pc, pc)?;
                Flow::Jump(addr)
            }
            SeByte(x, nn) => Flow::skip_if(self.v(x)? == nn),
            SneByte(x, nn) => Flow::skip_if(self.v(x)? != nn),
            SeReg(x, y) => Flow::skip_if(self.v(x)? == self.v(y)?),
            SneReg(x, y) => Flow::skip_if(self.v(x)? != self.v(y)?),
            LdByte(x, nn) => {
                self.set_v(x, nn)?;
                Flow::Next
            }
            AddByte(x, nn) => {
                // no carry flag for 7XNN
                let sum = self.v(x)?.wrapping_add(nn);
                self.set_v(x, sum)?;
                Flow::Next
            }
            LdReg(x, y) => {
                let vy = self.v(y)?;
                self.set_v(x, vy)?;
                Flow::Next
            }
            Or(x, y) => {
                let value = self.v(x)? | self.v(y)?;
                self.set_v(x, value)?;
                Flow::Next
            }
            And(x, y) => {
                let value = self.v(x)? & self.v(y)?;
                self.set_v(x, value)?;
                Flow::Next
            }
            Xor(x, y) => {
                let value = self.v(x)? ^ self.v(y)?;
                self.set_v(x, value)?;
                Flow::Next
            }
            AddReg(x, y) => {
                let (sum, carry) = self.v(x)?.overflowing_add(self.v(y)?);
                self.set_v_with_flag(x, sum, carry)?;
                Flow::Next
            }
            Sub(x, y) => {
                let (vx, vy) = (self.v(x)?, self.v(y)?);
                self.set_v_with_flag(x, vx.wrapping_sub(vy), vy <= vx)?;
                Flow::Next
            }
            Subn(x, y) => {
                let (vx, vy) = (self.v(x)?, self.v(y)?);
                self.set_v_with_flag(x, vy.wrapping_sub(vx), vx <= vy)?;
                Flow::Next
            }
            Shr(x) => {
                let vx = self.v(x)?;
                self.set_v_with_flag(x, vx >> 1, (vx & 0x01) == 1)?;
                Flow::Next
            }
            Shl(x) => {
                let vx = self.v(x)?;
                self.set_v_with_flag(x, vx << 1, (vx >> 7) == 1)?;
                Flow::Next
            }
            LdI(addr) => {
                self.state.set_index(addr);
                Flow::Next
            }
            JpV0(addr) => Flow::Jump(addr.wrapping_add(self.v(0)? as u16)),
            Rnd(x, nn) => {
                let value = self.rng.gen::<u8>() & nn;
                self.set_v(x, value)?;
                Flow::Next
            }
            Drw(x, y, n) => {
                self.draw_sprite(x, y, n)?;
                Flow::Next
            }
            Skp(x) => Flow::skip_if(self.state.key(self.v(x)? as usize)?),
            Sknp(x) => Flow::skip_if(!self.state.key(self.v(x)? as usize)?),
            LdRegDt(x) => {
                let dt = self.state.delay_timer();
                self.set_v(x, dt)?;
                Flow::Next
            }
            LdKey(x) => match self.state.keypad().last_pressed() {
                Some(key) => {
                    self.set_v(x, key as u8)?;
                    Flow::Next
                }
                None => Flow::Wait,
            },
            LdDtReg(x) => {
                let vx = self.v(x)?;
                self.state.set_delay_timer(vx);
                Flow::Next
            }
            LdSt(x) => {
                let vx = self.v(x)?;
                self.state.set_sound_timer(vx);
                Flow::Next
            }
            AddI(x) => {
                let sum = self.state.index().wrapping_add(self.v(x)? as u16);
                // I itself wraps at 0x10000; VF only reports leaving the 4K space
                self.state.set_index(sum);
                self.set_v(0xF, (sum > 0xFFF) as u8)?;
                Flow::Next
            }
            LdF(x) => {
                let glyph = (self.v(x)? as usize) * CHIP8_FONT_GLYPH_BYTES + CHIP8_FONT_ADDR;
                self.state.set_index(glyph as u16);
                Flow::Next
            }
            LdB(x) => {
                let vx = self.v(x)?;
                let i = self.state.index() as usize;
                let digits = self.state.memory_mut().get_rw_slice(i, 3)?;
                digits[0] = vx / 100;
                digits[1] = (vx / 10) % 10;
                digits[2] = vx % 10;
                Flow::Next
            }
            LdDerefIReg(x) => {
                let regs = *self.state.registers();
                let i = self.state.index() as usize;
                let dst = self.state.memory_mut().get_rw_slice(i, x + 1)?;
                dst.copy_from_slice(&regs[..=x]);
                self.bump_index(x);
                Flow::Next
            }
            LdRegDerefI(x) => {
                let i = self.state.index() as usize;
                let src = self.state.memory().get_ro_slice(i, x + 1)?.to_vec();
                for (reg, value) in src.into_iter().enumerate() {
                    self.set_v(reg, value)?;
                }
                self.bump_index(x);
                Flow::Next
            }
        };
        Ok(flow)
    }

    fn bump_index(&mut self, x: usize) {
        if self.quirks.load_store_increments_index {
            let i = self.state.index();
            self.state.set_index(i.wrapping_add(x as u16 + 1));
        }
    }

    /// XOR an 8xN sprite from [I] onto the screen at (VX, VY), clipping at
    /// the edges; VF says whether any lit cell got switched off
    fn draw_sprite(&mut self, x: usize, y: usize, n: u8) -> Result<()> {
        let left = self.v(x)? as usize;
        let top = self.v(y)? as usize;
        let i = self.state.index() as usize;
        let sprite = self.state.memory().get_ro_slice(i, n as usize)?.to_vec();

        let fb = self.state.framebuffer_mut();
        let mut collision = false;
        for (row, bits) in sprite.iter().enumerate() {
            for col in 0..8 {
                if bits & (0x80 >> col) != 0 {
                    collision |= fb.toggle(left + col, top + row);
                }
            }
        }

        self.set_v(0xF, collision as u8)?;
        self.state.set_needs_redraw(true);
        Ok(())
    }
}
