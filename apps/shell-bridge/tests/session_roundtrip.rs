use serde_json::{Value, json};
use shell_bridge::channel::{ChannelEvent, LocalChannel, RemoteEnd};
use shell_bridge::host::keys::paste_events;
use shell_bridge::input::{InputEvent, SpecialKey};
use shell_bridge::render::{BackendPreference, Surface};
use shell_bridge::{BridgeConfig, SessionBridge, SessionState, SuggestionTable};
use shell_proto::{decode_server_event, encode_client_event};
use std::sync::Arc;

fn mount(config: BridgeConfig) -> (SessionBridge<LocalChannel>, RemoteEnd) {
    let (channel, remote) = LocalChannel::pair();
    let mut bridge = SessionBridge::new(channel, config, SuggestionTable::shared_default())
        .with_surface(Surface::new(12, 60).with_rich(true));
    bridge.lifecycle(true);
    remote.connect();
    bridge.pump();
    (bridge, remote)
}

/// What the session process would see on the wire.
fn wire(remote: &RemoteEnd) -> Vec<Value> {
    remote
        .received()
        .iter()
        .map(|event| {
            let text = encode_client_event(event).expect("encode");
            serde_json::from_str(&text).expect("json")
        })
        .collect()
}

fn deliver(remote: &RemoteEnd, json: &str) {
    let event = decode_server_event(json).expect("decode");
    remote.push(ChannelEvent::Server(event));
}

fn press(bridge: &mut SessionBridge<LocalChannel>, keys: &str) {
    for ch in keys.chars() {
        bridge.handle_key(&InputEvent::character(ch));
    }
}

#[test_timeout::timeout]
fn fallback_session_speaks_the_wire_protocol() {
    let (mut bridge, remote) = mount(BridgeConfig::default());
    assert_eq!(bridge.state(), SessionState::Connected);

    deliver(
        &remote,
        r#"{"event":"shell_output","payload":{"data":"iex(1)> \r\n"}}"#,
    );
    bridge.pump();

    press(&mut bridge, "Enum.r");
    bridge.handle_key(&InputEvent::special(SpecialKey::Tab));
    bridge.handle_key(&InputEvent::special(SpecialKey::Enter));
    bridge.handle_key(&InputEvent::ctrl('l'));

    let sent = wire(&remote);
    assert_eq!(
        sent.iter().rev().take(3).rev().cloned().collect::<Vec<_>>(),
        vec![
            json!({"event": "update_input", "payload": {"value": "Enum.reduce"}}),
            json!({"event": "shell_input", "payload": {"data": "Enum.reduce\n"}}),
            json!({"event": "clear_terminal", "payload": {}}),
        ]
    );
    assert_eq!(
        sent.first(),
        Some(&json!({"event": "update_input", "payload": {"value": "E"}}))
    );

    let lines = bridge.renderer().map(|r| r.visible_lines()).unwrap_or_default();
    assert_eq!(lines[0], "iex(1)> ");
    assert_eq!(lines[1], "$ Enum.reduce");
}

#[test_timeout::timeout]
fn insert_text_from_the_host_primes_the_editor() {
    let (mut bridge, remote) = mount(BridgeConfig::default());
    deliver(
        &remote,
        r#"{"event":"insert_text","payload":{"text":":observer.start"}}"#,
    );
    bridge.pump();
    bridge.handle_key(&InputEvent::special(SpecialKey::Enter));
    assert_eq!(
        wire(&remote),
        vec![
            json!({"event": "update_input", "payload": {"value": ":observer.start"}}),
            json!({"event": "shell_input", "payload": {"data": ":observer.start\n"}}),
        ]
    );
}

#[test_timeout::timeout]
fn history_keys_follow_configuration() {
    let (mut bridge, remote) = mount(BridgeConfig::default());
    bridge.handle_key(&InputEvent::special(SpecialKey::ArrowUp));
    assert_eq!(
        wire(&remote),
        vec![json!({"event": "shell_input", "payload": {"data": "\u{1b}[A"}})]
    );

    let (mut bridge, remote) = mount(BridgeConfig {
        history_events: true,
        ..BridgeConfig::default()
    });
    bridge.handle_key(&InputEvent::special(SpecialKey::ArrowDown));
    assert_eq!(
        wire(&remote),
        vec![json!({"event": "history_down", "payload": {}})]
    );
}

#[test_timeout::timeout]
fn rich_session_renders_escape_sequences() {
    let (mut bridge, remote) = mount(BridgeConfig {
        backend: BackendPreference::Auto,
        ..BridgeConfig::default()
    });
    remote.send_output("\x1b[1mbold\x1b[0m plain\r\nnext");
    bridge.pump();
    let lines = bridge.renderer().map(|r| r.visible_lines()).unwrap_or_default();
    assert_eq!(lines[0], "bold plain");
    assert_eq!(lines[1], "next");

    press(&mut bridge, "pwd");
    bridge.handle_key(&InputEvent::special(SpecialKey::Enter));
    assert_eq!(remote.received_input(), "pwd\n");
}

#[test_timeout::timeout]
fn pasted_crlf_lines_are_submitted_through_the_editor() {
    let (mut bridge, remote) = mount(BridgeConfig::default());
    for input in paste_events("echo one\r\necho two\r\n") {
        bridge.handle_key(&input);
    }
    assert_eq!(remote.received_input(), "echo one\necho two\n");
    let lines = bridge.renderer().map(|r| r.visible_lines()).unwrap_or_default();
    assert!(lines.contains(&"$ echo two".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("$ "));
}

#[test_timeout::timeout]
fn custom_suggestion_table_is_used() {
    let (channel, remote) = LocalChannel::pair();
    let table = Arc::new(SuggestionTable::parse("git status\ngit stash\n"));
    let mut bridge = SessionBridge::new(channel, BridgeConfig::default(), table)
        .with_surface(Surface::new(12, 60));
    bridge.lifecycle(true);
    remote.connect();
    bridge.pump();

    press(&mut bridge, "git");
    remote.received();
    bridge.handle_key(&InputEvent::special(SpecialKey::Tab));
    assert_eq!(
        wire(&remote),
        vec![json!({"event": "update_input", "payload": {"value": "git status"}})]
    );
}

#[test_timeout::timeout]
fn unmount_closes_the_channel_and_drops_late_frames() {
    let (mut bridge, remote) = mount(BridgeConfig::default());
    bridge.unmount();
    assert_eq!(bridge.state(), SessionState::Disconnected);
    assert!(!bridge.channel().is_open());
    assert!(bridge.renderer().is_none());

    remote.send_output("late");
    bridge.pump();
    bridge.handle_key(&InputEvent::character('x'));
    assert!(bridge.renderer().is_none());
    assert!(remote.received().is_empty());
}
