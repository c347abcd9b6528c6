//! Terminal session bridge: turns key presses into the byte and event stream a
//! remote shell expects, and renders the shell's output through either a full
//! terminal emulator or a minimal line buffer.

pub mod bridge;
pub mod channel;
pub mod complete;
pub mod config;
pub mod error;
pub mod host;
pub mod input;
pub mod render;
pub mod telemetry;

pub use bridge::SessionBridge;
pub use channel::{ChannelEvent, SessionChannel, SessionState};
pub use complete::{Autocomplete, Completion, SuggestionTable};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use input::{Dispatch, InputEvent, KeyCommand, Modifiers, SpecialKey};
pub use render::{BackendPreference, Renderer, Surface};
