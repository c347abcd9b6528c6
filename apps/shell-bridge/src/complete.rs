use std::fs;
use std::io;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;

const DEFAULT_SUGGESTIONS: &[&str] = &[
    "IO.puts",
    "IO.inspect",
    "Enum.map",
    "Enum.filter",
    "Enum.reduce",
    "String.split",
    "String.replace",
    "String.contains?",
    "String.length",
    "Process.list",
    "Process.info",
    "Application.started_applications",
    "System.version",
    "System.get_env",
    ":erlang.nodes",
    ":observer.start",
    "GenServer.call",
    "GenServer.cast",
    "Supervisor.which_children",
    "Agent.start_link",
    "Agent.get",
    "Agent.update",
];

static DEFAULT_TABLE: Lazy<Arc<SuggestionTable>> =
    Lazy::new(|| Arc::new(SuggestionTable::new(DEFAULT_SUGGESTIONS.iter().copied())));

/// Ordered, immutable list of known command names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionTable {
    entries: Vec<String>,
}

impl SuggestionTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Process-wide default table, shared by every bridge that does not inject its own.
    pub fn shared_default() -> Arc<SuggestionTable> {
        Arc::clone(&DEFAULT_TABLE)
    }

    /// One entry per line; blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry, in table order, whose lowercase form starts with `prefix` lowercased.
    pub fn first_match(&self, prefix: &str) -> Option<&str> {
        let needle = prefix.to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.to_lowercase().starts_with(&needle))
            .map(String::as_str)
    }
}

/// Result of a completion request. Positions are character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Span of the partial word that was matched.
    pub replaced: Range<usize>,
    pub suggestion: String,
    /// Text spliced in right after the cursor.
    pub inserted: String,
    pub text: String,
    pub cursor: usize,
}

impl Completion {
    pub fn changes_text(&self) -> bool {
        !self.inserted.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Autocomplete {
    table: Arc<SuggestionTable>,
}

impl Autocomplete {
    pub fn new(table: Arc<SuggestionTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SuggestionTable {
        &self.table
    }

    pub fn complete(&self, text: &str, cursor: usize) -> Option<Completion> {
        let split = byte_offset(text, cursor)?;
        let (before, after) = text.split_at(split);
        let token = trailing_token(before);
        if token.is_empty() {
            return None;
        }
        let suggestion = self.table.first_match(token)?;
        let token_chars = token.chars().count();
        let inserted: String = suggestion.chars().skip(token_chars).collect();
        let inserted_chars = inserted.chars().count();

        let mut spliced = String::with_capacity(text.len() + inserted.len());
        spliced.push_str(before);
        spliced.push_str(&inserted);
        spliced.push_str(after);

        Some(Completion {
            replaced: cursor - token_chars..cursor,
            suggestion: suggestion.to_string(),
            inserted,
            text: spliced,
            cursor: cursor + inserted_chars,
        })
    }
}

fn byte_offset(text: &str, cursor: usize) -> Option<usize> {
    if cursor == 0 {
        return Some(0);
    }
    text.char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .nth(cursor)
}

fn is_word_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == ':'
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | ':')
}

/// Longest suffix made of one word-start character followed by word characters.
fn trailing_token(before: &str) -> &str {
    let run_start = before
        .char_indices()
        .rev()
        .take_while(|(_, ch)| is_word_char(*ch))
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(before.len());
    let run = &before[run_start..];
    match run.char_indices().find(|(_, ch)| is_word_start(*ch)) {
        Some((idx, _)) => &run[idx..],
        None => "",
    }
}
