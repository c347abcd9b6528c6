pub const PROMPT: &str = "$ ";

/// Single-line input widget owned by the fallback renderer.
///
/// The cursor is a character index into `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineEditor {
    value: String,
    cursor: usize,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompt(&self) -> &'static str {
        PROMPT
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn insert(&mut self, ch: char) {
        let at = self.byte_at(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }

    /// Deletes the character before the cursor. Returns whether anything changed.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let at = self.byte_at(self.cursor - 1);
        self.value.remove(at);
        self.cursor -= 1;
        true
    }

    /// Replaces the content and moves the cursor to the end.
    pub fn replace(&mut self, text: &str) {
        self.value = text.to_string();
        self.cursor = self.value.chars().count();
    }

    /// Replaces the content with an explicit cursor, clamped to the text.
    pub fn set(&mut self, text: String, cursor: usize) {
        self.cursor = cursor.min(text.chars().count());
        self.value = text;
    }

    /// Empties the editor. Returns whether there was anything to clear.
    pub fn clear(&mut self) -> bool {
        let had_content = !self.value.is_empty();
        self.value.clear();
        self.cursor = 0;
        had_content
    }

    /// Takes the submitted line, leaving the editor empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }

    /// Prompt followed by the current value, as drawn.
    pub fn render(&self) -> String {
        format!("{PROMPT}{}", self.value)
    }

    /// Display column of the cursor, prompt included.
    pub fn display_cursor(&self) -> usize {
        PROMPT.chars().count() + self.cursor
    }

    fn byte_at(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len())
    }
}
