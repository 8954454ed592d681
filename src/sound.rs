use beep::beep;
use std::error::Error;
use std::thread;
use std::time::Duration;

/// The interpreter's only audio hook: one short alert when the sound timer
/// runs out. Errors are reported back but the interpreter just logs them.
pub trait Sound {
    fn alert(&mut self) -> Result<(), Box<dyn Error>>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C
const SIMPLEBEEP_LENGTH: Duration = Duration::from_millis(100);

/// PC-speaker beep via the `beep` crate, played off-thread
pub struct SimpleBeep {
    pitch: u16,
    length: Duration,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep {
            pitch: SIMPLEBEEP_PITCH,
            length: SIMPLEBEEP_LENGTH,
        }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

fn play(pitch: u16, length: Duration) -> Result<(), Box<dyn Error>> {
    beep(pitch)?;
    thread::sleep(length);
    beep(0)?;
    Ok(())
}

impl Sound for SimpleBeep {
    fn alert(&mut self) -> Result<(), Box<dyn Error>> {
        let (pitch, length) = (self.pitch, self.length);
        // fire and forget; nobody waits for the tone to finish
        thread::Builder::new()
            .name("chip8-beep".into())
            .spawn(move || {
                if let Err(e) = play(pitch, length) {
                    log::warn!("beep failed: {}", e);
                }
            })?;
        Ok(())
    }
}

/// no audio at all
pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Default for Mute {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for Mute {
    fn alert(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mute_never_fails() {
        let mut m = Mute::new();
        for _ in 0..3 {
            assert!(m.alert().is_ok());
        }
    }
}
