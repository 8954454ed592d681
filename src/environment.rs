//! # environment
//!
//! Sets everything up and runs the main loop. One frame at a time:
//!
//!  |-- poll input into the latch; handle host commands
//!  |-- run ips/frame_rate instructions (the remainder carries over, so
//!  |   the long-run rate is exact)
//!  |-- tick timers once (decoupled) or once per instruction (per-step)
//!  |-- redraw if the machine asked for it
//!  `-- sleep until the next frame is due
//!
//! Everything happens on the calling thread; the interpreter is never
//! touched from anywhere else.
use crate::config::{Config, Timing};
use crate::display::{present, Display};
use crate::error::{Chip8Error, Result};
use crate::input::{Command, Input};
use crate::interpreter::Chip8Interpreter;
use crate::loader::{load_state, save_state};
use crate::state::MachineState;
use std::fmt::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub struct Environment<'a, 'b> {
    interpreter: Chip8Interpreter<'a>,
    display: &'b mut dyn Display,
    input: &'b mut dyn Input,
    program: Option<Vec<u8>>,
    save_path: PathBuf,
    timing: Timing,
    ips: u32,
    frame_rate: u32,
    frame: Duration,
    /// instructions owed, in units of 1/frame_rate
    budget: u32,
}

impl<'a, 'b> Environment<'a, 'b> {
    pub fn new(
        interpreter: Chip8Interpreter<'a>,
        display: &'b mut dyn Display,
        input: &'b mut dyn Input,
        config: &Config,
    ) -> Self {
        Environment {
            interpreter,
            display,
            input,
            program: None,
            save_path: config.save_path(),
            timing: config.timing,
            ips: config.ips,
            frame_rate: config.frame_rate,
            frame: config.frame_duration(),
            budget: 0,
        }
    }

    /// load a program and remember it so Reset can reload it
    pub fn load_program(&mut self, program: Vec<u8>) -> Result<()> {
        self.interpreter.load_program(&mut program.as_slice())?;
        self.program = Some(program);
        Ok(())
    }

    /// swap in a saved machine; the screen is stale until it's redrawn
    pub fn restore(&mut self, state: MachineState) {
        self.interpreter.restore(state);
        self.interpreter.state_mut().set_needs_redraw(true);
    }

    pub fn interpreter(&self) -> &Chip8Interpreter<'a> {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Chip8Interpreter<'a> {
        &mut self.interpreter
    }

    /// run until the user quits, the machine faults, or `max_frames` is up
    pub fn main_loop(&mut self, max_frames: Option<u64>) -> Result<()> {
        let mut frames = 0u64;
        let mut next = Instant::now();
        loop {
            match self.run_frame() {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(e) => {
                    log::error!("{}", self.post_mortem(&e));
                    return Err(e);
                }
            }
            frames += 1;
            if max_frames.map_or(false, |max| frames >= max) {
                return Ok(());
            }

            next += self.frame;
            let now = Instant::now();
            if next > now {
                spin_sleep::sleep(next - now);
            } else {
                // running behind; don't try to catch up in a burst
                next = now;
            }
        }
    }

    /// one frame's worth of everything; Ok(false) means the user quit
    pub fn run_frame(&mut self) -> Result<bool> {
        let commands = self.input.poll(self.interpreter.state_mut().keypad_mut())?;
        for command in commands {
            if !self.command(command)? {
                return Ok(false);
            }
        }

        self.budget = self.budget.saturating_add(self.ips);
        let count = self.budget / self.frame_rate;
        self.budget %= self.frame_rate;
        match self.timing {
            Timing::Decoupled => {
                for _ in 0..count {
                    self.interpreter.cycle()?;
                }
                self.interpreter.tick_timers();
            }
            Timing::PerStep => {
                for _ in 0..count {
                    self.interpreter.step()?;
                }
            }
        }

        present(&mut *self.display, self.interpreter.state_mut())?;
        Ok(true)
    }

    /// save/load failures are reported and shrugged off; the machine keeps
    /// whatever it had
    fn command(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Quit => return Ok(false),
            Command::SaveState => {
                if let Err(e) = save_state(&self.save_path, self.interpreter.state()) {
                    log::warn!("couldn't save {}: {}", self.save_path.display(), e);
                }
            }
            Command::LoadState => match load_state(&self.save_path) {
                Ok(state) => self.restore(state),
                Err(e) => log::warn!("couldn't load {}: {}", self.save_path.display(), e),
            },
            Command::Reset => match &self.program {
                Some(program) => self.interpreter.load_program(&mut program.as_slice())?,
                None => self.interpreter.reset(),
            },
        }
        Ok(true)
    }

    fn post_mortem(&self, e: &Chip8Error) -> String {
        let mut out = format!("machine stopped: {}\n{}\nrecent:", e, self.interpreter.state());
        for (pc, opcode) in self.interpreter.recent_opcodes() {
            let _ = write!(out, " {:03X}:{:04X}", pc, opcode);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::DummyInput;
    use crate::sound::Mute;
    use clap::Parser;

    fn config(args: &[&str]) -> Config {
        let mut full = vec!["chip8", "test.ch8"];
        full.extend_from_slice(args);
        Config::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_instruction_budget_carries_remainder() -> Result<()> {
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        let c = config(&["--ips", "90", "--frame-rate", "60"]);
        let interp = Chip8Interpreter::with_seed(&mut sound, 1);
        let mut env = Environment::new(interp, &mut display, &mut input, &c);
        // ADD V0, 1 forever
        env.load_program([0x70, 0x01, 0x12, 0x00].to_vec())?;
        env.run_frame()?;
        env.run_frame()?;
        // 1.5 instructions a frame: ADD, then JP and ADD
        assert_eq!(env.interpreter().state().program_counter(), 0x202);
        assert_eq!(env.interpreter().state().v(0)?, 2);
        Ok(())
    }

    #[test]
    fn test_decoupled_ticks_once_per_frame() -> Result<()> {
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        let c = config(&["--ips", "600"]);
        let interp = Chip8Interpreter::with_seed(&mut sound, 1);
        let mut env = Environment::new(interp, &mut display, &mut input, &c);
        env.load_program([0x12, 0x00].to_vec())?;
        env.interpreter_mut().state_mut().set_delay_timer(20);
        env.run_frame()?;
        assert_eq!(env.interpreter().state().delay_timer(), 19);
        Ok(())
    }

    #[test]
    fn test_per_step_ticks_every_instruction() -> Result<()> {
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        let c = config(&["--ips", "600", "--timing", "per-step"]);
        let interp = Chip8Interpreter::with_seed(&mut sound, 1);
        let mut env = Environment::new(interp, &mut display, &mut input, &c);
        env.load_program([0x12, 0x00].to_vec())?;
        env.interpreter_mut().state_mut().set_delay_timer(20);
        env.run_frame()?;
        assert_eq!(env.interpreter().state().delay_timer(), 10);
        Ok(())
    }

    #[test]
    fn test_frames_drawn_on_change_only() -> Result<()> {
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        let c = config(&[]);
        let interp = Chip8Interpreter::with_seed(&mut sound, 1);
        {
            let mut env = Environment::new(interp, &mut display, &mut input, &c);
            env.load_program([0x12, 0x00].to_vec())?;
            env.main_loop(Some(3))?;
        }
        // only the power-on frame
        assert_eq!(display.frames, 1);
        Ok(())
    }

    #[test]
    fn test_keys_reach_the_machine() -> Result<()> {
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new().then_hold(&[]).then_hold(&[0x7]);
        let c = config(&["--ips", "60"]);
        let interp = Chip8Interpreter::with_seed(&mut sound, 1);
        let mut env = Environment::new(interp, &mut display, &mut input, &c);
        // LD V3, K; JP 0x202
        env.load_program([0xf3, 0x0a, 0x12, 0x02].to_vec())?;
        env.run_frame()?;
        assert_eq!(env.interpreter().state().program_counter(), 0x200);
        env.run_frame()?;
        assert_eq!(env.interpreter().state().program_counter(), 0x202);
        assert_eq!(env.interpreter().state().v(3)?, 0x7);
        Ok(())
    }

    #[test]
    fn test_quit_and_reset_commands() -> Result<()> {
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new()
            .then_hold(&[])
            .then_command(Command::Reset)
            .then_command(Command::Quit);
        let c = config(&["--ips", "60"]);
        let interp = Chip8Interpreter::with_seed(&mut sound, 1);
        let mut env = Environment::new(interp, &mut display, &mut input, &c);
        env.load_program([0x60, 0x09, 0x12, 0x02].to_vec())?;
        assert!(env.run_frame()?);
        assert_eq!(env.interpreter().state().v(0)?, 9);
        // reset reloads the program, then the frame runs its first instruction
        assert!(env.run_frame()?);
        assert_eq!(env.interpreter().state().program_counter(), 0x202);
        assert!(!env.run_frame()?);
        Ok(())
    }

    #[test]
    fn test_fault_stops_the_loop() {
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        let c = config(&[]);
        let interp = Chip8Interpreter::with_seed(&mut sound, 1);
        let mut env = Environment::new(interp, &mut display, &mut input, &c);
        env.load_program([0x00, 0xee].to_vec()).unwrap();
        let err = env.main_loop(None).unwrap_err();
        assert!(matches!(err, Chip8Error::StackUnderflow { .. }));
    }

    #[test]
    fn test_bad_load_keeps_running_machine() -> Result<()> {
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new().then_command(Command::LoadState);
        let missing = std::env::temp_dir().join(format!("chip8-{}-nothing.sav", std::process::id()));
        let c = config(&["--save-file", missing.to_str().unwrap(), "--ips", "60"]);
        let interp = Chip8Interpreter::with_seed(&mut sound, 1);
        let mut env = Environment::new(interp, &mut display, &mut input, &c);
        env.load_program([0x60, 0x05, 0x12, 0x02].to_vec())?;
        assert!(env.run_frame()?);
        assert_eq!(env.interpreter().state().v(0)?, 5);
        Ok(())
    }

    #[test]
    fn test_budget_survives_huge_ips() -> Result<()> {
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new();
        let c = config(&["--ips", "4294967294", "--frame-rate", "4294967295"]);
        let interp = Chip8Interpreter::with_seed(&mut sound, 1);
        let mut env = Environment::new(interp, &mut display, &mut input, &c);
        // ADD V0, 1 forever
        env.load_program([0x70, 0x01, 0x12, 0x00].to_vec())?;
        env.run_frame()?;
        assert_eq!(env.interpreter().state().v(0)?, 0);
        // the owed budget would pass u32::MAX here
        env.run_frame()?;
        assert_eq!(env.interpreter().state().v(0)?, 1);
        Ok(())
    }

    #[test]
    fn test_loaded_state_is_redrawn() -> Result<()> {
        let mut sound = Mute::new();
        let mut display = DummyDisplay::new();
        let save = std::env::temp_dir().join(format!("chip8-{}-redraw.sav", std::process::id()));
        let mut input = DummyInput::new()
            .then_hold(&[])
            .then_command(Command::SaveState)
            .then_hold(&[])
            .then_command(Command::LoadState);
        let c = config(&["--save-file", save.to_str().unwrap(), "--ips", "60"]);
        let interp = Chip8Interpreter::with_seed(&mut sound, 1);
        {
            let mut env = Environment::new(interp, &mut display, &mut input, &c);
            env.load_program([0x12, 0x00].to_vec())?;
            env.run_frame()?;
            env.run_frame()?;
            let state = env.interpreter_mut().state_mut();
            state.framebuffer_mut().set(5, 5, true);
            state.set_needs_redraw(true);
            env.run_frame()?;
            env.run_frame()?;
            assert!(!env.interpreter().state().needs_redraw());
        }
        std::fs::remove_file(&save)?;
        assert_eq!(display.frames, 3);
        assert_eq!(display.last.unwrap().lit().count(), 0);
        Ok(())
    }
}
