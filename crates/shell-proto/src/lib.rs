//! Event definitions exchanged between a terminal front end and the remote
//! shell session. Kept in a dedicated crate so hosts that only speak the wire
//! format do not pull in the rendering stack.
//!
//! Every event travels as a JSON envelope `{"event": <name>, "payload": {...}}`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw bytes headed for the remote shell (`shell_input`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFrame {
    pub data: String,
}

impl ControlFrame {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

/// Output produced by the remote shell (`shell_output`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFrame {
    pub data: String,
}

impl OutputFrame {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

/// Events sent from the front end to the session process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    ShellInput(ControlFrame),
    /// Current text of the line-edit surface, sent after every edit.
    UpdateInput { value: String },
    HistoryUp {},
    HistoryDown {},
    ClearTerminal {},
}

impl ClientEvent {
    pub fn shell_input(data: impl Into<String>) -> Self {
        ClientEvent::ShellInput(ControlFrame::new(data))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::ShellInput(_) => "shell_input",
            ClientEvent::UpdateInput { .. } => "update_input",
            ClientEvent::HistoryUp {} => "history_up",
            ClientEvent::HistoryDown {} => "history_down",
            ClientEvent::ClearTerminal {} => "clear_terminal",
        }
    }
}

/// Events pushed from the session process (or the embedding host) to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    ShellOutput(OutputFrame),
    /// Replace the current line-edit content (quick command shortcuts).
    InsertText { text: String },
}

impl ServerEvent {
    pub fn shell_output(data: impl Into<String>) -> Self {
        ServerEvent::ShellOutput(OutputFrame::new(data))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ShellOutput(_) => "shell_output",
            ServerEvent::InsertText { .. } => "insert_text",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn encode_client_event(event: &ClientEvent) -> Result<String, ProtoError> {
    Ok(serde_json::to_string(event)?)
}

pub fn decode_client_event(text: &str) -> Result<ClientEvent, ProtoError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode_server_event(event: &ServerEvent) -> Result<String, ProtoError> {
    Ok(serde_json::to_string(event)?)
}

pub fn decode_server_event(text: &str) -> Result<ServerEvent, ProtoError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test_timeout::timeout]
    fn shell_input_uses_event_envelope() {
        let encoded = encode_client_event(&ClientEvent::shell_input("\u{3}")).expect("encode");
        let value: Value = serde_json::from_str(&encoded).expect("json");
        assert_eq!(
            value,
            json!({"event": "shell_input", "payload": {"data": "\u{3}"}})
        );
    }

    #[test_timeout::timeout]
    fn navigation_events_carry_empty_payload() {
        let encoded = encode_client_event(&ClientEvent::HistoryUp {}).expect("encode");
        let value: Value = serde_json::from_str(&encoded).expect("json");
        assert_eq!(value, json!({"event": "history_up", "payload": {}}));

        let decoded =
            decode_client_event(r#"{"event":"clear_terminal","payload":{}}"#).expect("decode");
        assert_eq!(decoded, ClientEvent::ClearTerminal {});
        assert_eq!(decoded.name(), "clear_terminal");
    }

    #[test_timeout::timeout]
    fn server_events_decode_from_host_json() {
        let output =
            decode_server_event(r#"{"event":"shell_output","payload":{"data":"ok\r\n"}}"#)
                .expect("decode output");
        assert_eq!(output, ServerEvent::shell_output("ok\r\n"));

        let insert = decode_server_event(r#"{"event":"insert_text","payload":{"text":"Process.list"}}"#)
            .expect("decode insert");
        assert_eq!(
            insert,
            ServerEvent::InsertText {
                text: "Process.list".into()
            }
        );
    }

    #[test_timeout::timeout]
    fn unknown_event_is_rejected() {
        let err = decode_server_event(r#"{"event":"reboot","payload":{}}"#)
            .expect_err("unknown event");
        assert!(err.to_string().starts_with("malformed event"));
    }
}
