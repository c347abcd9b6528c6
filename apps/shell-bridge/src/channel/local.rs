use super::{ChannelError, ChannelEvent, SessionChannel, SessionState};
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use shell_proto::{ClientEvent, ServerEvent};
use tracing::trace;

/// In-memory channel whose far side is driven through a [`RemoteEnd`].
pub struct LocalChannel {
    open: bool,
    auto_connect: bool,
    outbound: Sender<ClientEvent>,
    inbound: Receiver<ChannelEvent>,
    notify: Sender<ChannelEvent>,
}

/// The "remote process" half of a [`LocalChannel`].
#[derive(Clone)]
pub struct RemoteEnd {
    inbound: Sender<ChannelEvent>,
    outbound: Receiver<ClientEvent>,
}

impl LocalChannel {
    pub fn pair() -> (LocalChannel, RemoteEnd) {
        let (outbound_tx, outbound_rx) = unbounded();
        let (inbound_tx, inbound_rx) = unbounded();
        let channel = LocalChannel {
            open: false,
            auto_connect: false,
            outbound: outbound_tx,
            inbound: inbound_rx,
            notify: inbound_tx.clone(),
        };
        let remote = RemoteEnd {
            inbound: inbound_tx,
            outbound: outbound_rx,
        };
        (channel, remote)
    }

    /// Report `Connected` immediately after `Connecting` when opened.
    pub fn with_auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl SessionChannel for LocalChannel {
    fn open(&mut self) -> Result<(), ChannelError> {
        if self.open {
            return Ok(());
        }
        self.open = true;
        self.notify
            .send(ChannelEvent::State(SessionState::Connecting))
            .map_err(|_| ChannelError::Closed)?;
        if self.auto_connect {
            self.notify
                .send(ChannelEvent::State(SessionState::Connected))
                .map_err(|_| ChannelError::Closed)?;
        }
        Ok(())
    }

    fn send(&mut self, event: ClientEvent) -> Result<(), ChannelError> {
        if !self.open {
            return Err(ChannelError::NotOpen);
        }
        trace!(target = "bridge::channel", event = event.name(), "local send");
        self.outbound.send(event).map_err(|_| ChannelError::Closed)
    }

    fn try_recv(&mut self) -> Option<ChannelEvent> {
        match self.inbound.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn describe(&self) -> &'static str {
        "local"
    }
}

impl RemoteEnd {
    pub fn connect(&self) {
        self.push(ChannelEvent::State(SessionState::Connected));
    }

    pub fn disconnect(&self) {
        self.push(ChannelEvent::State(SessionState::Disconnected));
    }

    pub fn send_output(&self, data: impl Into<String>) {
        self.push(ChannelEvent::Server(ServerEvent::shell_output(data)));
    }

    pub fn insert_text(&self, text: impl Into<String>) {
        self.push(ChannelEvent::Server(ServerEvent::InsertText { text: text.into() }));
    }

    pub fn push(&self, event: ChannelEvent) {
        let _ = self.inbound.send(event);
    }

    /// Drains every event the front end has sent so far.
    pub fn received(&self) -> Vec<ClientEvent> {
        self.outbound.try_iter().collect()
    }

    /// Concatenated `shell_input` payloads, ignoring other events.
    pub fn received_input(&self) -> String {
        self.received()
            .into_iter()
            .filter_map(|event| match event {
                ClientEvent::ShellInput(frame) => Some(frame.data),
                _ => None,
            })
            .collect()
    }
}
