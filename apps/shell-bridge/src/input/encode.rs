use super::{HistoryDirection, KeyCommand};

pub const INTERRUPT: &str = "\u{3}";
pub const EOF: &str = "\u{4}";
pub const TAB: &str = "\t";
pub const FORM_FEED: &str = "\u{c}";
pub const CURSOR_UP: &str = "\u{1b}[A";
pub const CURSOR_DOWN: &str = "\u{1b}[B";

/// Byte sequence a shell expects for a dispatched command.
///
/// Total: `Ignored` is the only command with an empty encoding.
pub fn encode(command: KeyCommand) -> String {
    match command {
        KeyCommand::Interrupt => INTERRUPT.to_string(),
        KeyCommand::Eof => EOF.to_string(),
        KeyCommand::NavigateHistory(HistoryDirection::Up) => CURSOR_UP.to_string(),
        KeyCommand::NavigateHistory(HistoryDirection::Down) => CURSOR_DOWN.to_string(),
        KeyCommand::Autocomplete => TAB.to_string(),
        KeyCommand::ClearScreen => FORM_FEED.to_string(),
        KeyCommand::Literal(ch) | KeyCommand::PassThrough(ch) => ch.to_string(),
        KeyCommand::Ignored => String::new(),
    }
}
