use crate::state::{Framebuffer, MachineState};
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is used by the host to put the framebuffer on the screen. It
/// should abstract the implementation details, so a variety of kinds of
/// screen would work.
pub trait Display {
    /// draw a whole frame
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error>;
}

/// draw if the machine says something changed, then clear the flag the same
/// way the interpreter sets it; returns whether a frame went out
pub fn present(display: &mut dyn Display, state: &mut MachineState) -> Result<bool, io::Error> {
    if !state.needs_redraw() {
        return Ok(false);
    }
    display.draw(state.framebuffer())?;
    state.set_needs_redraw(false);
    Ok(true)
}

/// the two colours of a monochrome screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub on: Color,
    pub off: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            on: Color::White,
            off: Color::Black,
        }
    }
}

// store useful metadata about the terminal
struct Resolution(usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// split a frame into canvas points for each colour; y goes negative
    /// because the canvas origin is bottom-left
    fn bitplanes(&self, frame: &Framebuffer) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
        let mut on = Vec::new();
        let mut off = Vec::new();
        for (y, row) in frame.rows().enumerate().take(self.1) {
            for (x, &lit) in row.iter().enumerate().take(self.0) {
                let point = (x as f64, -1.0 * y as f64);
                if lit {
                    on.push(point);
                } else {
                    off.push(point);
                }
            }
        }
        (on, off)
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
    palette: Palette,
}

impl MonoTermDisplay {
    pub fn new(x: usize, y: usize, palette: Palette) -> Result<MonoTermDisplay, io::Error> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(x, y),
            palette,
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        // best effort; there's nowhere left to report to
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        let (on, off) = self.resolution.bitplanes(frame);
        let palette = self.palette;
        let x_bounds = self.resolution.x_bounds();
        let y_bounds = self.resolution.y_bounds();
        let size = Rect::new(
            0,
            0,
            2 + self.resolution.0 as u16,
            2 + self.resolution.1 as u16,
        );

        // for now this assumes a 1:1 ratio between terminal cells, chip8
        // pixels and the internal TUI canvas
        self.terminal.draw(|f| {
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(palette.off)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &off,
                        color: palette.off,
                    });
                    ctx.draw(&Points {
                        coords: &on,
                        color: palette.on,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines; remembers the last frame
#[derive(Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last: Option<Framebuffer>,
}

impl DummyDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        self.frames += 1;
        self.last = Some(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
    }

    #[test]
    fn test_y_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_bitplanes_cover_every_cell() {
        let r = Resolution(64, 32);
        let mut fb = Framebuffer::new();
        fb.set(2, 3, true);
        let (on, off) = r.bitplanes(&fb);
        assert_eq!(on, vec![(2.0, -3.0)]);
        assert_eq!(off.len(), 2047);
    }

    #[test]
    fn test_present_only_when_flagged() -> Result<(), io::Error> {
        let mut d = DummyDisplay::new();
        let mut s = MachineState::new();
        // power-on forces one frame
        assert!(present(&mut d, &mut s)?);
        assert!(!s.needs_redraw());
        assert!(!present(&mut d, &mut s)?);
        assert_eq!(d.frames, 1);

        s.framebuffer_mut().set(0, 0, true);
        s.set_needs_redraw(true);
        assert!(present(&mut d, &mut s)?);
        assert_eq!(d.frames, 2);
        assert!(d.last.unwrap().get(0, 0));
        Ok(())
    }

    #[test]
    fn test_default_palette() {
        let p = Palette::default();
        assert_eq!(p.on, Color::White);
        assert_eq!(p.off, Color::Black);
    }
}
