//!
//! ## Design
//!
//! * the machine is a plain owned value (`state::MachineState`); the
//!   interpreter owns it and is the only thing that mutates it while a
//!   program runs
//! * one public `step()`: fetch, decode, execute one instruction, then tick
//!   the timers once. FX0A is a poll, not a block
//! * fail fast: unknown opcodes, stack over/underflow and out-of-range
//!   memory are errors, raised before the instruction changes anything
//! * registers are 8 bits and arithmetic wraps
//! * abstract display, input and audio behind traits so the interpreter
//!   doesn't need to know how any of them work
//! * the host drives everything from one thread at a fixed rate, with
//!   instruction throughput decoupled from the 60Hz timers
//!
//! Model
//!
//! Environment
//!  |-- display, input, config
//!  |-- interpreter(sound, quirks)
//!  |    |-- machine state(memory, registers, stack, keypad, framebuffer, timers)
//!  |    `-- instruction decoder
//!  `-- main loop, one frame at a time
//!       |-- input.poll(keypad) -> host commands (quit/save/load/reset)
//!       |-- interpreter.cycle() x ips/frame_rate
//!       |-- interpreter.tick_timers()
//!       |-- present(display, state) if the redraw flag is up
//!       `-- sleep until the next frame
pub mod config;
pub mod display;
pub mod environment;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod loader;
pub mod memory;
pub mod sound;
pub mod state;

pub use error::{Chip8Error, Result};
pub use interpreter::{Chip8Interpreter, Quirks};
pub use state::MachineState;
