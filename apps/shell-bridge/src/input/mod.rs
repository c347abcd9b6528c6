pub mod dispatch;
pub mod encode;

pub use dispatch::{Dispatch, HistoryDirection, KeyCommand, dispatch};
pub use encode::encode;

use bitflags::bitflags;

bitflags! {
    /// Modifier keys held during a key press.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const SUPER = 0b1000;
    }
}

/// Keys that do not produce a character on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKey {
    Enter,
    Tab,
    Backspace,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
    Insert,
    Function(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Character(char),
    Special(SpecialKey),
}

/// One physical key press, consumed synchronously by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl InputEvent {
    pub fn character(ch: char) -> Self {
        Self {
            key: Key::Character(ch),
            modifiers: Modifiers::empty(),
        }
    }

    pub fn special(key: SpecialKey) -> Self {
        Self {
            key: Key::Special(key),
            modifiers: Modifiers::empty(),
        }
    }

    pub fn ctrl(ch: char) -> Self {
        Self::character(ch).with_modifiers(Modifiers::CTRL)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    /// Builds an event from a DOM `KeyboardEvent.key` value.
    ///
    /// Returns `None` for bare modifier presses and names with no mapping.
    pub fn from_dom_key(key: &str, modifiers: Modifiers) -> Option<Self> {
        let special = match key {
            "Enter" => Some(SpecialKey::Enter),
            "Tab" => Some(SpecialKey::Tab),
            "Backspace" => Some(SpecialKey::Backspace),
            "Escape" | "Esc" => Some(SpecialKey::Escape),
            "ArrowUp" | "Up" => Some(SpecialKey::ArrowUp),
            "ArrowDown" | "Down" => Some(SpecialKey::ArrowDown),
            "ArrowLeft" | "Left" => Some(SpecialKey::ArrowLeft),
            "ArrowRight" | "Right" => Some(SpecialKey::ArrowRight),
            "Home" => Some(SpecialKey::Home),
            "End" => Some(SpecialKey::End),
            "PageUp" => Some(SpecialKey::PageUp),
            "PageDown" => Some(SpecialKey::PageDown),
            "Delete" | "Del" => Some(SpecialKey::Delete),
            "Insert" => Some(SpecialKey::Insert),
            _ => None,
        };
        if let Some(special) = special {
            return Some(Self::special(special).with_modifiers(modifiers));
        }
        if let Some(number) = key.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
            return Some(Self::special(SpecialKey::Function(number)).with_modifiers(modifiers));
        }
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(Self::character(ch).with_modifiers(modifiers)),
            _ => None,
        }
    }

    pub fn ctrl_held(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }
}
