use crate::channel::{ChannelEvent, SessionChannel, SessionState};
use crate::complete::{Autocomplete, SuggestionTable};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::input::{Dispatch, HistoryDirection, InputEvent, KeyCommand, dispatch, encode};
use crate::render::{BackendPreference, Renderer, Surface, build_renderer};
use crate::telemetry::logging::hexdump;
use shell_proto::{ClientEvent, ServerEvent};
use std::sync::Arc;
use tracing::{Level, debug, error, info, trace, warn};

const BACKSPACE: char = '\u{7f}';

/// Builds the renderer when the bridge enters `Connecting`.
pub type RendererFactory = Box<dyn FnMut(BackendPreference, &Surface) -> Box<dyn Renderer>>;

/// Owns the session state machine and wires input, completion, channel and
/// renderer together.
///
/// ```text
/// Disconnected --lifecycle(true)--> Connecting --channel Connected--> Connected
/// Connected --lifecycle(false) | channel Disconnected--> Disconnected
/// ```
///
/// Anything else is rejected and logged. Output is rendered and input is
/// sent only while `Connected`.
pub struct SessionBridge<C: SessionChannel> {
    channel: C,
    config: BridgeConfig,
    autocomplete: Autocomplete,
    surface: Option<Surface>,
    factory: RendererFactory,
    renderer: Option<Box<dyn Renderer>>,
    state: SessionState,
}

impl<C: SessionChannel> SessionBridge<C> {
    pub fn new(channel: C, config: BridgeConfig, suggestions: Arc<SuggestionTable>) -> Self {
        Self {
            channel,
            config,
            autocomplete: Autocomplete::new(suggestions),
            surface: None,
            factory: Box::new(build_renderer),
            renderer: None,
            state: SessionState::Disconnected,
        }
    }

    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_renderer_factory(mut self, factory: RendererFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn renderer(&self) -> Option<&dyn Renderer> {
        self.renderer.as_deref()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Host-side surface change. `None` means the host has nowhere to draw.
    pub fn set_surface(&mut self, surface: Option<Surface>) {
        self.surface = surface;
        if let (Some(surface), Some(renderer)) = (surface.as_ref(), self.renderer.as_mut()) {
            renderer.resize(surface);
        }
    }

    /// Explicit lifecycle signal from the host view.
    pub fn lifecycle(&mut self, active: bool) -> SessionState {
        match (self.state, active) {
            (_, true) => {
                if let Err(err) = self.mount() {
                    error!(target = "bridge::session", error = %err, "mount aborted");
                }
            }
            (SessionState::Connected, false) => {
                self.leave_connected();
                self.channel.close();
            }
            (state, false) => self.reject(state, "lifecycle off"),
        }
        self.state
    }

    /// Lifecycle-on with the failure handed back to the caller instead of
    /// logged. Outside `Disconnected` the signal is rejected as usual.
    pub fn mount(&mut self) -> Result<SessionState, BridgeError> {
        if self.state != SessionState::Disconnected {
            self.reject(self.state, "lifecycle on");
            return Ok(self.state);
        }
        self.enter_connecting()?;
        Ok(self.state)
    }

    /// Drains every queued channel event. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.channel.try_recv() {
            self.handle_channel_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::State(next) => self.handle_state_change(next),
            ChannelEvent::Server(event) => self.handle_server_event(event),
        }
    }

    /// Classifies a key press and acts on it. The returned dispatch tells the
    /// host whether the default action must be suppressed.
    pub fn handle_key(&mut self, event: &InputEvent) -> Dispatch {
        let dispatch = dispatch(event);
        if self.state != SessionState::Connected {
            trace!(target = "bridge::input", state = %self.state, "key dropped");
            return dispatch;
        }

        match dispatch.command {
            KeyCommand::Ignored => {}
            KeyCommand::ClearScreen => self.send(ClientEvent::ClearTerminal {}),
            KeyCommand::NavigateHistory(direction) if self.config.history_events => {
                self.send(match direction {
                    HistoryDirection::Up => ClientEvent::HistoryUp {},
                    HistoryDirection::Down => ClientEvent::HistoryDown {},
                })
            }
            command => match self.edit_locally(command) {
                Some(events) => {
                    for event in events {
                        self.send(event);
                    }
                }
                None => {
                    let bytes = self
                        .renderer
                        .as_ref()
                        .and_then(|renderer| renderer.key_bytes(event))
                        .unwrap_or_else(|| encode(command));
                    self.send(ClientEvent::shell_input(bytes));
                }
            },
        }
        dispatch
    }

    /// Disposes the renderer and closes the channel. Safe to call repeatedly.
    pub fn unmount(&mut self) {
        self.dispose_renderer();
        if self.state != SessionState::Disconnected {
            self.channel.close();
            self.transition(SessionState::Disconnected);
        }
    }

    fn enter_connecting(&mut self) -> Result<(), BridgeError> {
        let surface = self.surface.ok_or(BridgeError::NoSurface)?;
        self.dispose_renderer();
        self.renderer = Some((self.factory)(self.config.backend, &surface));
        self.transition(SessionState::Connecting);
        if let Err(err) = self.channel.open() {
            self.dispose_renderer();
            self.transition(SessionState::Disconnected);
            return Err(err.into());
        }
        Ok(())
    }

    fn leave_connected(&mut self) {
        self.dispose_renderer();
        self.transition(SessionState::Disconnected);
    }

    fn handle_state_change(&mut self, next: SessionState) {
        match (self.state, next) {
            (SessionState::Connecting, SessionState::Connected) => {
                self.transition(SessionState::Connected);
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.focus();
                }
            }
            (SessionState::Connected, SessionState::Disconnected) => {
                self.leave_connected();
                // Reset so the next open() starts a fresh session.
                self.channel.close();
            }
            // Echo of our own open(), or a late notice after a local close.
            (SessionState::Connecting, SessionState::Connecting)
            | (SessionState::Disconnected, SessionState::Disconnected) => {
                trace!(target = "bridge::session", state = %next, "state notification absorbed");
            }
            (state, _) => self.reject(state, next.as_str()),
        }
    }

    fn handle_server_event(&mut self, event: ServerEvent) {
        if self.state != SessionState::Connected {
            trace!(
                target = "bridge::session",
                event = event.name(),
                state = %self.state,
                "inbound frame dropped"
            );
            return;
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        match event {
            ServerEvent::ShellOutput(frame) => {
                if tracing::enabled!(Level::TRACE) {
                    trace!(
                        target = "bridge::output",
                        bytes = frame.data.len(),
                        dump = %hexdump(frame.data.as_bytes()),
                        "shell output"
                    );
                }
                renderer.write(&frame.data);
            }
            ServerEvent::InsertText { text } => {
                let outbound = match renderer.line_editor() {
                    Some(editor) => {
                        editor.replace(&text);
                        ClientEvent::UpdateInput { value: text }
                    }
                    None => ClientEvent::shell_input(text),
                };
                renderer.focus();
                self.send(outbound);
            }
        }
    }

    /// Resolves a command against the renderer's line editor. `None` when
    /// there is no editor or the command is not an editing command.
    fn edit_locally(&mut self, command: KeyCommand) -> Option<Vec<ClientEvent>> {
        let renderer = self.renderer.as_mut()?;
        let editor = renderer.line_editor()?;
        let events = match command {
            KeyCommand::Literal(ch) => {
                editor.insert(ch);
                vec![update_input(editor.value())]
            }
            KeyCommand::PassThrough(BACKSPACE) => {
                if editor.backspace() {
                    vec![update_input(editor.value())]
                } else {
                    Vec::new()
                }
            }
            KeyCommand::PassThrough('\n') => {
                let line = editor.take();
                renderer.echo_submitted(&line);
                vec![ClientEvent::shell_input(format!("{line}\n"))]
            }
            KeyCommand::Autocomplete => {
                match self.autocomplete.complete(editor.value(), editor.cursor()) {
                    Some(completion) if completion.changes_text() => {
                        debug!(
                            target = "bridge::complete",
                            suggestion = %completion.suggestion,
                            "completed"
                        );
                        editor.set(completion.text, completion.cursor);
                        vec![update_input(editor.value())]
                    }
                    _ => Vec::new(),
                }
            }
            KeyCommand::Interrupt => {
                let mut events = vec![ClientEvent::shell_input(encode(command))];
                if editor.clear() {
                    events.push(update_input(""));
                }
                events
            }
            _ => return None,
        };
        Some(events)
    }

    fn send(&mut self, event: ClientEvent) {
        if let ClientEvent::ShellInput(frame) = &event {
            if tracing::enabled!(Level::TRACE) {
                trace!(
                    target = "bridge::outgoing",
                    bytes = frame.data.len(),
                    dump = %hexdump(frame.data.as_bytes()),
                    "shell input"
                );
            }
        } else {
            debug!(target = "bridge::outgoing", event = event.name(), "client event");
        }
        if let Err(err) = self.channel.send(event) {
            warn!(
                target = "bridge::outgoing",
                channel = self.channel.describe(),
                error = %err,
                "send failed"
            );
        }
    }

    fn dispose_renderer(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose();
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!(
                target = "bridge::session",
                from = %self.state,
                to = %next,
                channel = self.channel.describe(),
                "session state"
            );
            self.state = next;
        }
    }

    fn reject(&self, state: SessionState, signal: &str) {
        warn!(
            target = "bridge::session",
            state = %state,
            signal,
            "transition rejected"
        );
    }
}

impl<C: SessionChannel> Drop for SessionBridge<C> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn update_input(value: &str) -> ClientEvent {
    ClientEvent::UpdateInput {
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{LocalChannel, RemoteEnd};
    use crate::input::{Modifiers, SpecialKey};
    use crate::render::LineEditor;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn surface() -> Surface {
        Surface::new(24, 80)
    }

    fn bridge_with(config: BridgeConfig) -> (SessionBridge<LocalChannel>, RemoteEnd) {
        let (channel, remote) = LocalChannel::pair();
        let bridge = SessionBridge::new(channel, config, SuggestionTable::shared_default())
            .with_surface(surface().with_rich(true));
        (bridge, remote)
    }

    fn connected(config: BridgeConfig) -> (SessionBridge<LocalChannel>, RemoteEnd) {
        let (mut bridge, remote) = bridge_with(config);
        bridge.lifecycle(true);
        remote.connect();
        bridge.pump();
        assert_eq!(bridge.state(), SessionState::Connected);
        (bridge, remote)
    }

    fn type_text(bridge: &mut SessionBridge<LocalChannel>, text: &str) {
        for ch in text.chars() {
            bridge.handle_key(&InputEvent::character(ch));
        }
    }

    #[derive(Default)]
    struct Spy {
        built: usize,
        disposed: usize,
        writes: Vec<String>,
    }

    struct SpyRenderer {
        spy: Rc<RefCell<Spy>>,
        disposed: bool,
        focused: bool,
    }

    impl Renderer for SpyRenderer {
        fn write(&mut self, data: &str) {
            self.spy.borrow_mut().writes.push(data.to_string());
        }
        fn focus(&mut self) {
            self.focused = true;
        }
        fn has_focus(&self) -> bool {
            self.focused
        }
        fn dispose(&mut self) {
            self.disposed = true;
            self.spy.borrow_mut().disposed += 1;
        }
        fn is_disposed(&self) -> bool {
            self.disposed
        }
        fn resize(&mut self, _surface: &Surface) {}
        fn visible_lines(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn spied(bridge: SessionBridge<LocalChannel>) -> (SessionBridge<LocalChannel>, Rc<RefCell<Spy>>) {
        let spy = Rc::new(RefCell::new(Spy::default()));
        let handle = Rc::clone(&spy);
        let bridge = bridge.with_renderer_factory(Box::new(
            move |_: BackendPreference, _: &Surface| -> Box<dyn Renderer> {
            handle.borrow_mut().built += 1;
            Box::new(SpyRenderer {
                spy: Rc::clone(&handle),
                disposed: false,
                focused: false,
            })
        },
        ));
        (bridge, spy)
    }

    #[test_timeout::timeout]
    fn full_lifecycle_follows_the_state_machine() {
        let (mut bridge, remote) = bridge_with(BridgeConfig::default());
        assert_eq!(bridge.state(), SessionState::Disconnected);

        assert_eq!(bridge.lifecycle(true), SessionState::Connecting);
        assert!(bridge.channel().is_open());
        assert!(bridge.renderer().is_some());

        remote.connect();
        bridge.pump();
        assert_eq!(bridge.state(), SessionState::Connected);
        assert!(bridge.renderer().is_some_and(|r| r.has_focus()));

        remote.disconnect();
        bridge.pump();
        assert_eq!(bridge.state(), SessionState::Disconnected);
        assert!(bridge.renderer().is_none());
    }

    #[test_timeout::timeout]
    fn out_of_order_transitions_are_rejected() {
        let (mut bridge, remote) = bridge_with(BridgeConfig::default());
        remote.connect();
        bridge.pump();
        assert_eq!(bridge.state(), SessionState::Disconnected);
        assert_eq!(bridge.lifecycle(false), SessionState::Disconnected);

        bridge.lifecycle(true);
        assert_eq!(bridge.lifecycle(true), SessionState::Connecting);
        remote.disconnect();
        bridge.pump();
        assert_eq!(bridge.state(), SessionState::Connecting);
        assert_eq!(bridge.lifecycle(false), SessionState::Connecting);

        remote.connect();
        remote.connect();
        bridge.pump();
        assert_eq!(bridge.state(), SessionState::Connected);
    }

    #[test_timeout::timeout]
    fn frames_after_disconnect_do_not_touch_the_renderer() {
        let (bridge, remote) = bridge_with(BridgeConfig::default());
        let (mut bridge, spy) = spied(bridge);
        bridge.lifecycle(true);
        remote.send_output("early");
        remote.connect();
        remote.send_output("hello");
        remote.disconnect();
        remote.send_output("late");
        remote.insert_text("late");
        bridge.pump();

        let spy = spy.borrow();
        assert_eq!(spy.writes, vec!["hello".to_string()]);
        assert_eq!(spy.disposed, 1);
        assert!(remote.received().is_empty());
    }

    #[test_timeout::timeout]
    fn lifecycle_off_disposes_once_and_closes_channel() {
        let (bridge, remote) = bridge_with(BridgeConfig::default());
        let (mut bridge, spy) = spied(bridge);
        bridge.lifecycle(true);
        remote.connect();
        bridge.pump();

        assert_eq!(bridge.lifecycle(false), SessionState::Disconnected);
        assert!(!bridge.channel().is_open());
        bridge.unmount();
        drop(bridge);
        assert_eq!(spy.borrow().disposed, 1);
    }

    #[test_timeout::timeout]
    fn reconnect_builds_a_fresh_renderer() {
        let (bridge, remote) = bridge_with(BridgeConfig::default());
        let (mut bridge, spy) = spied(bridge);
        for _ in 0..2 {
            bridge.lifecycle(true);
            remote.connect();
            bridge.pump();
            remote.disconnect();
            bridge.pump();
        }
        let spy = spy.borrow();
        assert_eq!(spy.built, 2);
        assert_eq!(spy.disposed, 2);
    }

    #[test_timeout::timeout]
    fn remote_disconnect_allows_a_fresh_connect() {
        let (channel, remote) = LocalChannel::pair();
        let channel = channel.with_auto_connect(true);
        let mut bridge = SessionBridge::new(
            channel,
            BridgeConfig::default(),
            SuggestionTable::shared_default(),
        )
        .with_surface(surface());

        for round in 0..3 {
            bridge.lifecycle(true);
            bridge.pump();
            assert_eq!(bridge.state(), SessionState::Connected, "round {round}");
            bridge.handle_key(&InputEvent::special(SpecialKey::Enter));
            assert_eq!(remote.received_input(), "\n");

            remote.disconnect();
            bridge.pump();
            assert_eq!(bridge.state(), SessionState::Disconnected);
            assert!(!bridge.channel().is_open());
        }
    }

    #[test_timeout::timeout]
    fn mount_reports_why_it_failed() {
        let (channel, _remote) = LocalChannel::pair();
        let mut bridge = SessionBridge::new(
            channel,
            BridgeConfig::default(),
            SuggestionTable::shared_default(),
        );
        assert!(matches!(bridge.mount(), Err(BridgeError::NoSurface)));
        assert_eq!(bridge.state(), SessionState::Disconnected);

        bridge.set_surface(Some(surface()));
        assert_eq!(bridge.mount().ok(), Some(SessionState::Connecting));
        assert_eq!(bridge.mount().ok(), Some(SessionState::Connecting));
    }

    #[test_timeout::timeout]
    fn missing_surface_aborts_mount() {
        let (channel, remote) = LocalChannel::pair();
        let mut bridge = SessionBridge::new(
            channel,
            BridgeConfig::default(),
            SuggestionTable::shared_default(),
        );
        assert_eq!(bridge.lifecycle(true), SessionState::Disconnected);
        assert!(bridge.renderer().is_none());
        assert!(!bridge.channel().is_open());
        remote.connect();
        bridge.pump();
        assert_eq!(bridge.state(), SessionState::Disconnected);
    }

    #[test_timeout::timeout]
    fn fallback_line_editor_resolves_keys_locally() {
        let (mut bridge, remote) = connected(BridgeConfig::default());
        type_text(&mut bridge, "IO.p");
        let tab = bridge.handle_key(&InputEvent::special(SpecialKey::Tab));
        assert!(tab.consumed);
        bridge.handle_key(&InputEvent::special(SpecialKey::Enter));

        let received = remote.received();
        assert_eq!(
            received.last(),
            Some(&ClientEvent::shell_input("IO.puts\n"))
        );
        assert!(received.contains(&ClientEvent::UpdateInput {
            value: "IO.puts".into()
        }));
        assert!(received.contains(&ClientEvent::UpdateInput {
            value: "IO.p".into()
        }));
        let lines = bridge.renderer().map(|r| r.visible_lines()).unwrap_or_default();
        assert_eq!(lines.first().map(String::as_str), Some("$ IO.puts"));
        assert_eq!(lines.last().map(String::as_str), Some("$ "));
    }

    #[test_timeout::timeout]
    fn completion_without_change_sends_nothing() {
        let (mut bridge, remote) = connected(BridgeConfig::default());
        type_text(&mut bridge, "IO.puts");
        remote.received();
        bridge.handle_key(&InputEvent::special(SpecialKey::Tab));
        bridge.handle_key(&InputEvent::special(SpecialKey::Backspace));
        assert_eq!(
            remote.received(),
            vec![ClientEvent::UpdateInput {
                value: "IO.put".into()
            }]
        );
    }

    #[test_timeout::timeout]
    fn control_keys_use_the_wire_vocabulary() {
        let (mut bridge, remote) = connected(BridgeConfig::default());
        type_text(&mut bridge, "ab");
        remote.received();

        let clear = bridge.handle_key(&InputEvent::ctrl('l'));
        assert!(clear.consumed);
        bridge.handle_key(&InputEvent::ctrl('c').with_modifiers(Modifiers::SHIFT));
        bridge.handle_key(&InputEvent::ctrl('d'));
        bridge.handle_key(&InputEvent::special(SpecialKey::ArrowUp));
        bridge.handle_key(&InputEvent::special(SpecialKey::ArrowDown));
        bridge.handle_key(&InputEvent::special(SpecialKey::ArrowLeft));

        assert_eq!(
            remote.received(),
            vec![
                ClientEvent::ClearTerminal {},
                ClientEvent::shell_input("\u{3}"),
                ClientEvent::UpdateInput { value: String::new() },
                ClientEvent::shell_input("\u{4}"),
                ClientEvent::shell_input("\u{1b}[A"),
                ClientEvent::shell_input("\u{1b}[B"),
            ]
        );
    }

    #[test_timeout::timeout]
    fn history_events_replace_cursor_bytes_when_configured() {
        let config = BridgeConfig {
            history_events: true,
            ..BridgeConfig::default()
        };
        let (mut bridge, remote) = connected(config);
        bridge.handle_key(&InputEvent::special(SpecialKey::ArrowUp));
        bridge.handle_key(&InputEvent::special(SpecialKey::ArrowDown));
        assert_eq!(
            remote.received(),
            vec![ClientEvent::HistoryUp {}, ClientEvent::HistoryDown {}]
        );
    }

    #[test_timeout::timeout]
    fn rich_backend_sends_raw_key_bytes() {
        let config = BridgeConfig {
            backend: BackendPreference::Rich,
            ..BridgeConfig::default()
        };
        let (mut bridge, remote) = connected(config);
        type_text(&mut bridge, "ls");
        bridge.handle_key(&InputEvent::special(SpecialKey::Tab));
        bridge.handle_key(&InputEvent::special(SpecialKey::Enter));
        bridge.handle_key(&InputEvent::special(SpecialKey::Function(2)));
        assert_eq!(remote.received_input(), "ls\t\n");

        remote.send_output("total 0\n");
        bridge.pump();
        let lines = bridge.renderer().map(|r| r.visible_lines()).unwrap_or_default();
        assert_eq!(lines[0], "total 0");
    }

    #[test_timeout::timeout]
    fn insert_text_replaces_editor_and_refocuses() {
        let (mut bridge, remote) = connected(BridgeConfig::default());
        type_text(&mut bridge, "old");
        remote.received();
        remote.insert_text("Process.list");
        bridge.pump();
        assert_eq!(
            remote.received(),
            vec![ClientEvent::UpdateInput {
                value: "Process.list".into()
            }]
        );
        bridge.handle_key(&InputEvent::special(SpecialKey::Enter));
        assert_eq!(remote.received_input(), "Process.list\n");
        assert!(bridge.renderer().is_some_and(|r| r.has_focus()));
    }

    #[test_timeout::timeout]
    fn insert_text_without_editor_is_sent_as_input() {
        let config = BridgeConfig {
            backend: BackendPreference::Rich,
            ..BridgeConfig::default()
        };
        let (mut bridge, remote) = connected(config);
        remote.insert_text("echo hi");
        bridge.pump();
        assert_eq!(remote.received_input(), "echo hi");
    }

    #[test_timeout::timeout]
    fn keys_before_connect_are_classified_but_not_sent() {
        let (mut bridge, remote) = bridge_with(BridgeConfig::default());
        bridge.lifecycle(true);
        let result = bridge.handle_key(&InputEvent::ctrl('c'));
        assert_eq!(result.command, KeyCommand::Interrupt);
        assert!(result.consumed);
        assert!(remote.received().is_empty());
    }

    #[test_timeout::timeout]
    fn editor_state_lives_in_the_renderer() {
        let (mut bridge, _remote) = connected(BridgeConfig::default());
        type_text(&mut bridge, "abc");
        bridge.handle_key(&InputEvent::special(SpecialKey::Backspace));
        let mut expected = LineEditor::new();
        expected.replace("ab");
        let lines = bridge.renderer().map(|r| r.visible_lines()).unwrap_or_default();
        assert_eq!(lines.last(), Some(&expected.render()));
    }
}
