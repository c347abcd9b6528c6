use super::{InputEvent, Key, SpecialKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryDirection {
    Up,
    Down,
}

/// Fixed command vocabulary every key press is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCommand {
    Literal(char),
    NavigateHistory(HistoryDirection),
    Autocomplete,
    ClearScreen,
    Interrupt,
    Eof,
    PassThrough(char),
    Ignored,
}

/// Classification plus whether the default UI action must be suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub command: KeyCommand,
    pub consumed: bool,
}

impl Dispatch {
    fn consumed(command: KeyCommand) -> Self {
        Self {
            command,
            consumed: true,
        }
    }

    fn unconsumed(command: KeyCommand) -> Self {
        Self {
            command,
            consumed: false,
        }
    }
}

const BACKSPACE: char = '\u{7f}';
const ESCAPE: char = '\u{1b}';

pub fn dispatch(event: &InputEvent) -> Dispatch {
    if event.ctrl_held() {
        if let Key::Character(ch) = event.key {
            match ch.to_ascii_lowercase() {
                'l' => return Dispatch::consumed(KeyCommand::ClearScreen),
                'c' => return Dispatch::consumed(KeyCommand::Interrupt),
                'd' => return Dispatch::consumed(KeyCommand::Eof),
                _ => {}
            }
        }
    }

    match event.key {
        Key::Special(SpecialKey::Tab) => Dispatch::consumed(KeyCommand::Autocomplete),
        Key::Special(SpecialKey::ArrowUp) => {
            Dispatch::consumed(KeyCommand::NavigateHistory(HistoryDirection::Up))
        }
        Key::Special(SpecialKey::ArrowDown) => {
            Dispatch::consumed(KeyCommand::NavigateHistory(HistoryDirection::Down))
        }
        Key::Special(SpecialKey::Enter) => Dispatch::unconsumed(KeyCommand::PassThrough('\n')),
        Key::Special(SpecialKey::Backspace) => {
            Dispatch::unconsumed(KeyCommand::PassThrough(BACKSPACE))
        }
        Key::Special(SpecialKey::Escape) => Dispatch::unconsumed(KeyCommand::PassThrough(ESCAPE)),
        Key::Special(_) => Dispatch::unconsumed(KeyCommand::Ignored),
        Key::Character(ch) => Dispatch::unconsumed(classify_character(ch, event.ctrl_held())),
    }
}

fn classify_character(ch: char, ctrl: bool) -> KeyCommand {
    if ctrl {
        let lower = ch.to_ascii_lowercase();
        return if lower.is_ascii_lowercase() {
            KeyCommand::PassThrough(((lower as u8 - b'a') + 1) as char)
        } else {
            KeyCommand::Ignored
        };
    }
    if ch.is_control() {
        KeyCommand::PassThrough(ch)
    } else {
        KeyCommand::Literal(ch)
    }
}
