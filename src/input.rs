use crate::state::{Keypad, KEY_COUNT};
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

/// left-hand side of a qwerty keyboard laid over the COSMAC hex pad
///   1 2 3 4      1 2 3 C
///   q w e r  =>  4 5 6 D
///   a s d f      7 8 9 E
///   z x c v      A 0 B F
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); KEY_COUNT] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// terminals only tell us about presses, so a key counts as held for this
/// long after its last press (or auto-repeat)
const KEY_HOLD: Duration = Duration::from_millis(150);

/// things the user wants from the host rather than the CHIP-8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    SaveState,
    LoadState,
    Reset,
}

/// reads keypresses into the latch; the only thing allowed to write it
pub trait Input {
    /// update the latch with whatever happened since last time and hand
    /// back any host commands
    fn poll(&mut self, keypad: &mut Keypad) -> Result<Vec<Command>, io::Error>;
}

/// Input from the terminal, using crossterm
pub struct StdinInput {
    keymap: HashMap<char, u8>,
    pressed_at: [Option<Instant>; KEY_COUNT],
    hold: Duration,
}

impl StdinInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            pressed_at: [None; KEY_COUNT],
            hold: KEY_HOLD,
        })
    }

    fn key_event(&mut self, evt: KeyEvent, now: Instant, commands: &mut Vec<Command>) {
        match evt.code {
            KeyCode::Esc => commands.push(Command::Quit),
            KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                commands.push(Command::Quit)
            }
            KeyCode::F(5) => commands.push(Command::SaveState),
            KeyCode::F(9) => commands.push(Command::LoadState),
            KeyCode::Backspace => commands.push(Command::Reset),
            KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()) {
                Some(&mapped) => self.pressed_at[mapped as usize] = Some(now),
                None => log::warn!("can't map {:?} to a COSMAC key", key),
            },
            other => log::debug!("ignoring key {:?}", other),
        }
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for StdinInput {
    fn poll(&mut self, keypad: &mut Keypad) -> Result<Vec<Command>, io::Error> {
        let mut commands = Vec::new();
        let now = Instant::now();
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => self.key_event(evt, now, &mut commands),
                Event::Resize(..) => {}
                other => log::debug!("ignoring event {:?}", other),
            }
        }
        latch(keypad, &self.pressed_at, self.hold, now);
        Ok(commands)
    }
}

/// held = pressed within the last `hold`
fn latch(keypad: &mut Keypad, pressed_at: &[Option<Instant>; KEY_COUNT], hold: Duration, now: Instant) {
    for (key, at) in pressed_at.iter().enumerate() {
        let held = at.map_or(false, |t| now.duration_since(t) < hold);
        // key is always < KEY_COUNT here
        let _ = keypad.set(key, held);
    }
}

/// dummy Input implementation for testing: each poll applies the next
/// scripted frame of key levels
pub struct DummyInput {
    frames: Vec<([bool; KEY_COUNT], Vec<Command>)>,
}

impl DummyInput {
    pub fn new() -> Self {
        DummyInput { frames: Vec::new() }
    }

    /// queue a frame with these keys down; panics on a key past 0xF
    pub fn then_hold(mut self, keys: &[u8]) -> Self {
        let mut levels = [false; KEY_COUNT];
        for &k in keys {
            assert!((k as usize) < KEY_COUNT, "no such key {:#X}", k);
            levels[k as usize] = true;
        }
        self.frames.push((levels, Vec::new()));
        self
    }

    /// queue a frame with no keys and a host command
    pub fn then_command(mut self, command: Command) -> Self {
        self.frames.push(([false; KEY_COUNT], vec![command]));
        self
    }
}

impl Default for DummyInput {
    fn default() -> Self {
        Self::new()
    }
}

impl Input for DummyInput {
    fn poll(&mut self, keypad: &mut Keypad) -> Result<Vec<Command>, io::Error> {
        if self.frames.is_empty() {
            return Ok(Vec::new());
        }
        let (levels, commands) = self.frames.remove(0);
        *keypad = Keypad::from_array(levels);
        Ok(commands)
    }
}
