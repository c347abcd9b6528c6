use super::{Renderer, Surface};
use crate::input::{InputEvent, Key, SpecialKey};
use alacritty_terminal::{
    Term,
    event::{Event, EventListener},
    grid::Dimensions,
    index::{Column, Line, Point},
    term::Config,
    vte::ansi::Processor,
};
use tracing::trace;

const SCROLLBACK: usize = 2_000;

struct TermDimensions {
    columns: usize,
    screen_lines: usize,
}

impl TermDimensions {
    fn new(surface: &Surface) -> Self {
        Self {
            columns: usize::from(surface.cols).max(1),
            screen_lines: usize::from(surface.rows).max(1),
        }
    }
}

impl Dimensions for TermDimensions {
    fn total_lines(&self) -> usize {
        self.screen_lines
    }

    fn screen_lines(&self) -> usize {
        self.screen_lines
    }

    fn columns(&self) -> usize {
        self.columns
    }
}

#[derive(Clone, Copy, Default)]
struct EventProxy;

impl EventListener for EventProxy {
    fn send_event(&self, _event: Event) {}
}

struct Emulator {
    term: Term<EventProxy>,
    parser: Processor,
}

impl Emulator {
    fn advance(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.parser.advance(&mut self.term, *byte);
        }
    }
}

/// Rich backend: a full terminal emulator fed with raw shell output.
pub struct EmulatorRenderer {
    emulator: Option<Emulator>,
    focused: bool,
}

impl EmulatorRenderer {
    pub fn new(surface: &Surface) -> Self {
        let config = Config {
            scrolling_history: SCROLLBACK,
            ..Config::default()
        };
        let term = Term::new(config, &TermDimensions::new(surface), EventProxy);
        let emulator = Emulator {
            term,
            parser: Processor::new(),
        };
        Self {
            emulator: Some(emulator),
            focused: false,
        }
    }
}

impl Renderer for EmulatorRenderer {
    fn write(&mut self, data: &str) {
        match self.emulator.as_mut() {
            Some(emulator) => emulator.advance(data.as_bytes()),
            None => {
                trace!(target = "bridge::render", bytes = data.len(), "write after dispose dropped")
            }
        }
    }

    fn focus(&mut self) {
        if self.emulator.is_some() {
            self.focused = true;
        }
    }

    fn has_focus(&self) -> bool {
        self.focused
    }

    fn dispose(&mut self) {
        self.emulator = None;
        self.focused = false;
    }

    fn is_disposed(&self) -> bool {
        self.emulator.is_none()
    }

    fn resize(&mut self, surface: &Surface) {
        if let Some(emulator) = self.emulator.as_mut() {
            emulator.term.resize(TermDimensions::new(surface));
        }
    }

    fn key_bytes(&self, event: &InputEvent) -> Option<String> {
        encode_key(event)
    }

    fn visible_lines(&self) -> Vec<String> {
        let Some(emulator) = self.emulator.as_ref() else {
            return Vec::new();
        };
        let grid = emulator.term.grid();
        let columns = grid.columns();
        (0..grid.screen_lines())
            .map(|row| {
                let text: String = (0..columns)
                    .map(|col| grid[Point::new(Line(row as i32), Column(col))].c)
                    .collect();
                text.trim_end().to_string()
            })
            .collect()
    }

    fn cursor(&self) -> Option<(u16, u16)> {
        let emulator = self.emulator.as_ref()?;
        let point = emulator.term.renderable_content().cursor.point;
        let row = u16::try_from(point.line.0).ok()?;
        let col = u16::try_from(point.column.0).ok()?;
        Some((col, row))
    }
}

/// Bytes a terminal sends for a key press, in normal cursor-key mode.
///
/// Alt is not translated into an ESC prefix.
pub fn encode_key(event: &InputEvent) -> Option<String> {
    let bytes = match event.key {
        Key::Character(ch) if event.ctrl_held() => {
            let lower = ch.to_ascii_lowercase();
            if !lower.is_ascii_lowercase() {
                return None;
            }
            char::from((lower as u8 - b'a') + 1).to_string()
        }
        Key::Character(ch) => ch.to_string(),
        Key::Special(special) => match special {
            SpecialKey::Enter => "\n",
            SpecialKey::Tab => "\t",
            SpecialKey::Backspace => "\u{7f}",
            SpecialKey::Escape => "\u{1b}",
            SpecialKey::ArrowUp => "\u{1b}[A",
            SpecialKey::ArrowDown => "\u{1b}[B",
            SpecialKey::ArrowRight => "\u{1b}[C",
            SpecialKey::ArrowLeft => "\u{1b}[D",
            SpecialKey::Home => "\u{1b}[H",
            SpecialKey::End => "\u{1b}[F",
            SpecialKey::PageUp => "\u{1b}[5~",
            SpecialKey::PageDown => "\u{1b}[6~",
            SpecialKey::Delete => "\u{1b}[3~",
            SpecialKey::Insert => "\u{1b}[2~",
            SpecialKey::Function(_) => return None,
        }
        .to_string(),
    };
    Some(bytes)
}
