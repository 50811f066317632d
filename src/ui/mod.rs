use anyhow::{anyhow, Context, Result};
use log::warn;
use std::io::{Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
    Terminal,
};

use crate::config::GlyphConfig;
use crate::game::{Bounds, FoodKind, Position};

const TITLE: &str = "Serpent";

/// What occupies a board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Head,
    Body,
    Food(FoodKind),
}

/// A display the game can paint cells on.
///
/// Changes may be buffered until `flush`.
pub trait Surface {
    fn clear(&mut self, bounds: Bounds) -> Result<()>;
    fn paint(&mut self, position: Position, glyph: Glyph) -> Result<()>;
    fn erase(&mut self, position: Position) -> Result<()>;
    fn write_score_line(&mut self, score: u64, length: usize, width: u16) -> Result<()>;
    fn show_message(&mut self, message: &str) -> Result<()>;
    fn ring_bell(&mut self) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// Score banner, spaced out more on wider boards.
pub fn score_line(score: u64, length: usize, width: u16) -> String {
    let score = format!("{:06}", score);
    let length = format!("Len: {}", length);
    if width >= 70 {
        format!("Score: {:<10} {:>16} {:>35}", score, length, TITLE)
    } else if width >= 50 {
        format!("Score: {:<10} {:>13} {:>28}", score, length, TITLE)
    } else {
        format!("Score: {:<10} {:>8} {:>16}", score, length, TITLE)
    }
}

// Lowers the drawing flag on every exit path, unwinding included
struct DrawingFlag<'a>(&'a AtomicBool);

impl<'a> DrawingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for DrawingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The single shared display. Every write goes through `draw`, which holds
/// the surface lock and raises the rendering-in-progress flag meanwhile.
pub struct Canvas {
    surface: Mutex<Box<dyn Surface + Send>>,
    drawing: AtomicBool,
}

impl Canvas {
    pub fn new<S: Surface + Send + 'static>(surface: S) -> Self {
        Self {
            surface: Mutex::new(Box::new(surface)),
            drawing: AtomicBool::new(false),
        }
    }

    /// Lock-free peek at the flag. May be stale by the time it is used.
    pub fn is_drawing(&self) -> bool {
        self.drawing.load(Ordering::Acquire)
    }

    /// Runs `paint` against the surface and flushes. Failures are logged
    /// and swallowed; returns whether the draw went through.
    pub fn draw<F>(&self, what: &str, paint: F) -> bool
    where
        F: FnOnce(&mut dyn Surface) -> Result<()>,
    {
        let mut surface = self.surface.lock().unwrap_or_else(PoisonError::into_inner);
        let _flag = DrawingFlag::raise(&self.drawing);

        let result = paint(surface.as_mut()).and_then(|_| surface.flush());
        if let Err(err) = result {
            warn!("Failed to draw {}: {:#}", what, err);
            return false;
        }
        true
    }
}

/// Ratatui-backed surface. Keeps a model of the board and lets the
/// terminal diff decide which cells actually get rewritten.
pub struct TerminalSurface {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    glyphs: GlyphConfig,
    bounds: Bounds,
    cells: Vec<Option<Glyph>>,
    score_line: String,
    message: Option<String>,
}

impl TerminalSurface {
    pub fn new(terminal: Terminal<CrosstermBackend<Stdout>>, bounds: Bounds, glyphs: GlyphConfig) -> Self {
        Self {
            terminal,
            glyphs,
            bounds,
            cells: vec![None; bounds.area()],
            score_line: String::new(),
            message: None,
        }
    }

    fn index(&self, position: Position) -> Result<usize> {
        if crate::game::in_bounds(position, self.bounds) {
            Ok(position.y as usize * self.bounds.width as usize + position.x as usize)
        } else {
            Err(anyhow!("Cell ({}, {}) is outside the board", position.x, position.y))
        }
    }
}

impl Surface for TerminalSurface {
    fn clear(&mut self, bounds: Bounds) -> Result<()> {
        self.bounds = bounds;
        self.cells = vec![None; bounds.area()];
        self.message = None;
        self.terminal.clear().context("Failed to clear terminal")?;
        Ok(())
    }

    fn paint(&mut self, position: Position, glyph: Glyph) -> Result<()> {
        let index = self.index(position)?;
        self.cells[index] = Some(glyph);
        Ok(())
    }

    fn erase(&mut self, position: Position) -> Result<()> {
        let index = self.index(position)?;
        self.cells[index] = None;
        Ok(())
    }

    fn write_score_line(&mut self, score: u64, length: usize, width: u16) -> Result<()> {
        self.score_line = score_line(score, length, width);
        Ok(())
    }

    fn show_message(&mut self, message: &str) -> Result<()> {
        self.message = Some(message.to_string());
        Ok(())
    }

    fn ring_bell(&mut self) -> Result<()> {
        self.terminal
            .backend_mut()
            .write_all(b"\x07")
            .context("Failed to ring the bell")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let Self { terminal, glyphs, bounds, cells, score_line, message } = self;
        let view = BoardView {
            glyphs,
            bounds: *bounds,
            cells,
            score_line,
            message: message.as_deref(),
        };

        terminal
            .draw(|f| {
                let frame = Rect::new(0, 0, bounds.width.saturating_add(2), bounds.height.saturating_add(2));
                let area = frame.intersection(f.size());
                f.render_widget(view, area);
            })
            .context("Failed to draw frame")?;
        Ok(())
    }
}

struct BoardView<'a> {
    glyphs: &'a GlyphConfig,
    bounds: Bounds,
    cells: &'a [Option<Glyph>],
    score_line: &'a str,
    message: Option<&'a str>,
}

impl BoardView<'_> {
    fn style(glyph: Glyph) -> Style {
        let background = match glyph {
            Glyph::Head => Color::Red,
            Glyph::Body => Color::Green,
            Glyph::Food(FoodKind::Blue) => Color::Blue,
            Glyph::Food(FoodKind::Amber) => Color::Yellow,
            Glyph::Food(FoodKind::Magenta) => Color::Magenta,
            Glyph::Food(FoodKind::Cyan) => Color::Cyan,
            Glyph::Food(FoodKind::Magic) => Color::White,
        };
        Style::default().bg(background).fg(Color::Black)
    }

    fn symbol(&self, glyph: Glyph) -> &str {
        match glyph {
            Glyph::Head => self.glyphs.head.as_str(),
            Glyph::Body => self.glyphs.body.as_str(),
            Glyph::Food(_) => self.glyphs.food.as_str(),
        }
    }
}

impl Widget for BoardView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let frame_style = Style::default().bg(Color::Gray).fg(Color::Black);
        let field_style = Style::default().bg(Color::Black);

        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                let on_field = x > area.left()
                    && y > area.top()
                    && x - area.left() <= self.bounds.width
                    && y - area.top() <= self.bounds.height;
                let cell = buf.get_mut(x, y);
                cell.set_symbol(" ");
                cell.set_style(if on_field { field_style } else { frame_style });
            }
        }

        // Board cells sit inside a one cell frame
        for (index, glyph) in self.cells.iter().enumerate() {
            let Some(glyph) = *glyph else { continue };
            let x = area.left() + 1 + (index % self.bounds.width as usize) as u16;
            let y = area.top() + 1 + (index / self.bounds.width as usize) as u16;
            if x < area.right() && y < area.bottom() {
                let cell = buf.get_mut(x, y);
                cell.set_symbol(self.symbol(glyph));
                cell.set_style(Self::style(glyph));
            }
        }

        if area.width > 1 && area.height > 0 {
            buf.set_stringn(
                area.left() + 1,
                area.top(),
                self.score_line,
                (area.width - 1) as usize,
                frame_style,
            );
        }

        if let Some(message) = self.message {
            let width = message.chars().count() as u16;
            let x = area.left() + area.width.saturating_sub(width) / 2;
            let y = area.top() + area.height / 2;
            if y < area.bottom() {
                buf.set_stringn(
                    x,
                    y,
                    message,
                    area.right().saturating_sub(x) as usize,
                    Style::default().fg(Color::White).bg(Color::Black).add_modifier(Modifier::BOLD),
                );
            }
        }
    }
}

/// Fire-and-forget end-of-game signal.
pub trait Notifier: Send + Sync {
    fn game_over(&self);
}

/// Rings the terminal bell from a short-lived thread so the caller never
/// waits on it. The bell is written through the canvas like any other draw.
pub struct TerminalBell {
    canvas: Arc<Canvas>,
}

impl TerminalBell {
    pub fn new(canvas: Arc<Canvas>) -> Self {
        Self { canvas }
    }
}

impl Notifier for TerminalBell {
    fn game_over(&self) {
        let canvas = Arc::clone(&self.canvas);
        let spawned = thread::Builder::new()
            .name("bell".to_string())
            .spawn(move || {
                canvas.draw("bell", |s| s.ring_bell());
            });

        if let Err(err) = spawned {
            warn!("Failed to spawn bell thread: {}", err);
        }
    }
}
