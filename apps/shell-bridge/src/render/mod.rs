pub mod emulator;
pub mod fallback;
pub mod line_editor;

pub use emulator::EmulatorRenderer;
pub use fallback::FallbackRenderer;
pub use line_editor::LineEditor;

use crate::input::InputEvent;
use clap::ValueEnum;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::Widget;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Display area reported by the host at mount time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub rows: u16,
    pub cols: u16,
    /// Whether the host can drive a full terminal emulator.
    pub supports_rich: bool,
}

impl Surface {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows: rows.max(1),
            cols: cols.max(1),
            supports_rich: false,
        }
    }

    pub fn with_rich(mut self, supported: bool) -> Self {
        self.supports_rich = supported;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum BackendPreference {
    /// Rich when the surface supports it, fallback otherwise.
    Auto,
    Rich,
    #[default]
    Fallback,
}

impl BackendPreference {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendPreference::Auto => "auto",
            BackendPreference::Rich => "rich",
            BackendPreference::Fallback => "fallback",
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendPreference::Auto),
            "rich" | "emulator" => Ok(BackendPreference::Rich),
            "fallback" | "simple" => Ok(BackendPreference::Fallback),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Rich,
    Fallback,
}

/// Resolves the preference against what the surface can do. A rich request
/// on a surface without the capability quietly degrades to the fallback.
pub fn select_backend(preference: BackendPreference, surface: &Surface) -> Backend {
    match preference {
        BackendPreference::Fallback => Backend::Fallback,
        BackendPreference::Auto | BackendPreference::Rich if surface.supports_rich => Backend::Rich,
        BackendPreference::Rich => {
            debug!(
                target = "bridge::render",
                "rich backend unavailable on this surface; using fallback"
            );
            Backend::Fallback
        }
        BackendPreference::Auto => Backend::Fallback,
    }
}

pub fn build_renderer(preference: BackendPreference, surface: &Surface) -> Box<dyn Renderer> {
    match select_backend(preference, surface) {
        Backend::Rich => Box::new(EmulatorRenderer::new(surface)),
        Backend::Fallback => Box::new(FallbackRenderer::new(surface)),
    }
}

/// Display surface consuming shell output.
///
/// The bridge only asks capability questions (`line_editor`, `key_bytes`)
/// and never needs to know which backend it holds.
pub trait Renderer {
    fn write(&mut self, data: &str);

    fn focus(&mut self);

    fn has_focus(&self) -> bool;

    /// Releases everything the renderer holds. Later writes are dropped.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;

    fn resize(&mut self, surface: &Surface);

    /// Local line-edit widget, when the backend provides one.
    fn line_editor(&mut self) -> Option<&mut LineEditor> {
        None
    }

    /// Echoes a submitted line into the output area.
    fn echo_submitted(&mut self, _line: &str) {}

    /// The backend's own encoding of a key press, when it has one.
    fn key_bytes(&self, _event: &InputEvent) -> Option<String> {
        None
    }

    /// Screen rows as plain text, top to bottom.
    fn visible_lines(&self) -> Vec<String>;

    /// Cursor position relative to the drawn area.
    fn cursor(&self) -> Option<(u16, u16)> {
        None
    }

    fn draw(&self, area: Rect, buf: &mut Buffer) {
        ScreenWidget::new(self.visible_lines()).render(area, buf);
    }
}

/// Plain rows painted top-down, blanking whatever the rows do not cover.
pub(crate) struct ScreenWidget {
    lines: Vec<Line<'static>>,
}

impl ScreenWidget {
    pub(crate) fn new(rows: Vec<String>) -> Self {
        Self {
            lines: rows.into_iter().map(Line::from).collect(),
        }
    }
}

impl Widget for ScreenWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let max_rows = area.height as usize;
        for (idx, line) in self.lines.iter().enumerate().take(max_rows) {
            buf.set_line(area.x, area.y + idx as u16, line, area.width);
        }
        let blank = Line::from(" ".repeat(area.width as usize));
        for row in self.lines.len().min(max_rows)..max_rows {
            buf.set_line(area.x, area.y + row as u16, &blank, area.width);
        }
    }
}
