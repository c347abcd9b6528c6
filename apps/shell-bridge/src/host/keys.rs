use crate::input::{InputEvent, Modifiers, SpecialKey};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Converts a terminal key event. Releases and keys with no mapping yield `None`.
pub fn input_event(key: &KeyEvent) -> Option<InputEvent> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let mut modifiers = modifiers(key.modifiers);
    let event = match key.code {
        KeyCode::Char(ch) => InputEvent::character(ch),
        KeyCode::Enter => InputEvent::special(SpecialKey::Enter),
        KeyCode::Tab => InputEvent::special(SpecialKey::Tab),
        KeyCode::BackTab => {
            modifiers |= Modifiers::SHIFT;
            InputEvent::special(SpecialKey::Tab)
        }
        KeyCode::Backspace => InputEvent::special(SpecialKey::Backspace),
        KeyCode::Esc => InputEvent::special(SpecialKey::Escape),
        KeyCode::Up => InputEvent::special(SpecialKey::ArrowUp),
        KeyCode::Down => InputEvent::special(SpecialKey::ArrowDown),
        KeyCode::Left => InputEvent::special(SpecialKey::ArrowLeft),
        KeyCode::Right => InputEvent::special(SpecialKey::ArrowRight),
        KeyCode::Home => InputEvent::special(SpecialKey::Home),
        KeyCode::End => InputEvent::special(SpecialKey::End),
        KeyCode::PageUp => InputEvent::special(SpecialKey::PageUp),
        KeyCode::PageDown => InputEvent::special(SpecialKey::PageDown),
        KeyCode::Delete => InputEvent::special(SpecialKey::Delete),
        KeyCode::Insert => InputEvent::special(SpecialKey::Insert),
        KeyCode::F(n) => InputEvent::special(SpecialKey::Function(n)),
        _ => return None,
    };
    Some(event.with_modifiers(modifiers))
}

fn modifiers(raw: KeyModifiers) -> Modifiers {
    let mut out = Modifiers::empty();
    if raw.contains(KeyModifiers::SHIFT) {
        out |= Modifiers::SHIFT;
    }
    if raw.contains(KeyModifiers::ALT) {
        out |= Modifiers::ALT;
    }
    if raw.contains(KeyModifiers::CONTROL) {
        out |= Modifiers::CTRL;
    }
    if raw.contains(KeyModifiers::SUPER) {
        out |= Modifiers::SUPER;
    }
    out
}

/// Key presses for bracketed-paste text. Line endings (`\r\n`, `\r`, `\n`)
/// become Enter so pasted lines go through the line editor like typed ones.
pub fn paste_events(text: &str) -> Vec<InputEvent> {
    let mut events = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                chars.next_if_eq(&'\n');
                events.push(InputEvent::special(SpecialKey::Enter));
            }
            '\n' => events.push(InputEvent::special(SpecialKey::Enter)),
            _ => events.push(InputEvent::character(ch)),
        }
    }
    events
}

/// Ctrl+] leaves the host, as in telnet.
pub fn is_quit(key: &KeyEvent) -> bool {
    key.kind != KeyEventKind::Release
        && key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char(']') | KeyCode::Char('5'))
}
