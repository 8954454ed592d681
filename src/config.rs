//! Command-line configuration for the terminal front-end.
//!
//! Logging is configured separately, through `RUST_LOG`.
use crate::interpreter::Quirks;
use crate::loader::default_save_path;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// how the timers are driven
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    /// timers tick at the frame rate, independent of instruction speed
    Decoupled,
    /// timers tick once per instruction, as `step()` does
    PerStep,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "chip8", about = "A CHIP-8 interpreter for the terminal")]
pub struct Config {
    /// program image to run
    #[arg(required_unless_present = "restore")]
    pub rom: Option<PathBuf>,

    /// start from a saved snapshot instead of a fresh program
    #[arg(long)]
    pub restore: Option<PathBuf>,

    /// where F5/F9 save and load (default: <rom>.sav)
    #[arg(long)]
    pub save_file: Option<PathBuf>,

    /// instructions per second
    #[arg(long, default_value_t = 700, value_parser = clap::value_parser!(u32).range(1..))]
    pub ips: u32,

    /// screen refreshes per second; also the timer rate when decoupled
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    pub frame_rate: u32,

    #[arg(long, value_enum, default_value_t = Timing::Decoupled)]
    pub timing: Timing,

    /// seed for CXNN, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// no beeping
    #[arg(long)]
    pub mute: bool,

    /// FX55/FX65 advance I past the registers they touch
    #[arg(long)]
    pub increment_index: bool,
}

impl Config {
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate
    }

    pub fn quirks(&self) -> Quirks {
        Quirks {
            load_store_increments_index: self.increment_index,
        }
    }

    /// explicit --save-file, else next to the rom or restored snapshot
    pub fn save_path(&self) -> PathBuf {
        if let Some(path) = &self.save_file {
            return path.clone();
        }
        match (&self.rom, &self.restore) {
            (Some(rom), _) => default_save_path(rom),
            (None, Some(snapshot)) => snapshot.clone(),
            (None, None) => PathBuf::from("chip8.sav"),
        }
    }
}
