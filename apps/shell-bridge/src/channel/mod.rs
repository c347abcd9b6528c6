pub mod local;
pub mod pty;

pub use local::{LocalChannel, RemoteEnd};
pub use pty::{PtyChannel, PtyOptions};

use shell_proto::{ClientEvent, ServerEvent};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a channel can deliver to the bridge, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    State(SessionState),
    Server(ServerEvent),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is not open")]
    NotOpen,
    #[error("channel closed by remote")]
    Closed,
    #[error("channel setup failed: {0}")]
    Setup(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Duplex event transport to the remote shell process.
///
/// Inbound frames and state changes are queued by the implementation and
/// drained by the bridge through [`SessionChannel::try_recv`]. `send` is
/// fire-and-forget; ordering is preserved per channel instance.
pub trait SessionChannel {
    fn open(&mut self) -> Result<(), ChannelError>;

    fn send(&mut self, event: ClientEvent) -> Result<(), ChannelError>;

    fn try_recv(&mut self) -> Option<ChannelEvent>;

    fn close(&mut self);

    /// Short label used in logs.
    fn describe(&self) -> &'static str {
        "channel"
    }
}

impl<T: SessionChannel + ?Sized> SessionChannel for Box<T> {
    fn open(&mut self) -> Result<(), ChannelError> {
        (**self).open()
    }

    fn send(&mut self, event: ClientEvent) -> Result<(), ChannelError> {
        (**self).send(event)
    }

    fn try_recv(&mut self) -> Option<ChannelEvent> {
        (**self).try_recv()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn describe(&self) -> &'static str {
        (**self).describe()
    }
}
