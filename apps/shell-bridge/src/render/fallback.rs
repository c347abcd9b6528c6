use super::line_editor::PROMPT;
use super::{LineEditor, Renderer, Surface};
use tracing::trace;

/// Scrollback kept before the oldest lines are dropped.
const MAX_LINES: usize = 10_000;

/// Minimal line-buffer backend with a local line editor.
///
/// Carriage returns are normalised to newlines before insertion (`\r\n` and a
/// bare `\r` both become `\n`, including a `\r\n` split across two writes),
/// and the scroll position follows the newest content after every write.
pub struct FallbackRenderer {
    lines: Vec<String>,
    pending_cr: bool,
    scroll: usize,
    output_rows: usize,
    editor: Option<LineEditor>,
    focused: bool,
    disposed: bool,
}

impl FallbackRenderer {
    pub fn new(surface: &Surface) -> Self {
        Self {
            lines: vec![String::new()],
            pending_cr: false,
            scroll: 0,
            output_rows: output_rows(surface),
            editor: Some(LineEditor::new()),
            focused: false,
            disposed: false,
        }
    }

    /// Everything written so far, newline separated.
    pub fn contents(&self) -> String {
        self.lines.join("\n")
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll
    }

    pub fn max_scroll(&self) -> usize {
        self.lines.len().saturating_sub(self.output_rows)
    }

    pub fn editor(&self) -> Option<&LineEditor> {
        self.editor.as_ref()
    }

    fn push_char(&mut self, ch: char) {
        if self.pending_cr {
            self.pending_cr = false;
            if ch == '\n' {
                return;
            }
        }
        match ch {
            '\r' => {
                self.lines.push(String::new());
                self.pending_cr = true;
            }
            '\n' => self.lines.push(String::new()),
            other => {
                if let Some(line) = self.lines.last_mut() {
                    line.push(other);
                }
            }
        }
    }

    fn trim_scrollback(&mut self) {
        if self.lines.len() > MAX_LINES {
            let excess = self.lines.len() - MAX_LINES;
            self.lines.drain(..excess);
        }
    }

    fn visible_output(&self) -> &[String] {
        let end = (self.scroll + self.output_rows).min(self.lines.len());
        &self.lines[self.scroll.min(end)..end]
    }
}

impl Renderer for FallbackRenderer {
    fn write(&mut self, data: &str) {
        if self.disposed {
            trace!(target = "bridge::render", bytes = data.len(), "write after dispose dropped");
            return;
        }
        for ch in data.chars() {
            self.push_char(ch);
        }
        self.trim_scrollback();
        self.scroll = self.max_scroll();
    }

    fn focus(&mut self) {
        if !self.disposed {
            self.focused = true;
        }
    }

    fn has_focus(&self) -> bool {
        self.focused
    }

    fn dispose(&mut self) {
        self.lines = Vec::new();
        self.pending_cr = false;
        self.scroll = 0;
        self.editor = None;
        self.focused = false;
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn resize(&mut self, surface: &Surface) {
        self.output_rows = output_rows(surface);
        self.scroll = self.max_scroll();
    }

    fn line_editor(&mut self) -> Option<&mut LineEditor> {
        self.editor.as_mut()
    }

    fn echo_submitted(&mut self, line: &str) {
        self.write(&format!("{PROMPT}{line}\n"));
    }

    fn visible_lines(&self) -> Vec<String> {
        let mut rows: Vec<String> = self.visible_output().to_vec();
        if let Some(editor) = &self.editor {
            rows.push(editor.render());
        }
        rows
    }

    fn cursor(&self) -> Option<(u16, u16)> {
        let editor = self.editor.as_ref()?;
        let row = self.visible_output().len();
        Some((
            u16::try_from(editor.display_cursor()).unwrap_or(u16::MAX),
            u16::try_from(row).unwrap_or(u16::MAX),
        ))
    }
}

/// One row is reserved for the prompt.
fn output_rows(surface: &Surface) -> usize {
    usize::from(surface.rows).saturating_sub(1).max(1)
}
