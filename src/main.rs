use clap::Parser;
use std::error::Error;

use chip8::config::Config;
use chip8::display::{MonoTermDisplay, Palette};
use chip8::environment::Environment;
use chip8::input::StdinInput;
use chip8::interpreter::Chip8Interpreter;
use chip8::loader::{load_state, read_rom};
use chip8::sound::{Mute, SimpleBeep, Sound};
use chip8::state::{SCREEN_HEIGHT, SCREEN_WIDTH};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let config = Config::parse();

    // read everything up front so a bad file fails before the terminal is
    // taken over
    let program = config.rom.as_deref().map(read_rom).transpose()?;
    let restored = config.restore.as_deref().map(load_state).transpose()?;

    let mut beeper = SimpleBeep::new();
    let mut mute = Mute::new();
    let sound: &mut dyn Sound = if config.mute { &mut mute } else { &mut beeper };
    let interpreter = match config.seed {
        Some(seed) => Chip8Interpreter::with_seed(sound, seed),
        None => Chip8Interpreter::new(sound),
    }
    .with_quirks(config.quirks());

    let mut input = StdinInput::new()?;
    let mut display = MonoTermDisplay::new(SCREEN_WIDTH, SCREEN_HEIGHT, Palette::default())?;

    let mut env = Environment::new(interpreter, &mut display, &mut input, &config);
    if let Some(program) = program {
        env.load_program(program)?;
    }
    // a restored session wins over the fresh program, but Reset still
    // reloads the rom
    if let Some(state) = restored {
        env.restore(state);
    }
    env.main_loop(None)?;
    Ok(())
}
