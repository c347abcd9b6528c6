use super::{ChannelError, ChannelEvent, SessionChannel, SessionState};
use crate::input::encode::{CURSOR_DOWN, CURSOR_UP, FORM_FEED};
use crossbeam_channel::{Receiver, Sender, unbounded};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use shell_proto::{ClientEvent, ServerEvent};
use std::io::{Read, Write};
use std::thread;
use tracing::{Level, debug, trace};

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone)]
pub struct PtyOptions {
    /// Program to run; `$SHELL` (or `/bin/sh`) when unset.
    pub program: Option<String>,
    pub args: Vec<String>,
    pub rows: u16,
    pub cols: u16,
}

impl Default for PtyOptions {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            rows: 24,
            cols: 80,
        }
    }
}

impl PtyOptions {
    fn resolve_program(&self) -> String {
        self.program
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .filter(|program| !program.trim().is_empty())
            .unwrap_or_else(|| "/bin/sh".to_string())
    }
}

struct PtySession {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
}

/// Session channel backed by a local shell running in a pseudo terminal.
pub struct PtyChannel {
    options: PtyOptions,
    session: Option<PtySession>,
    events_tx: Sender<ChannelEvent>,
    events_rx: Receiver<ChannelEvent>,
}

impl PtyChannel {
    pub fn new(options: PtyOptions) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            options,
            session: None,
            events_tx,
            events_rx,
        }
    }

    /// Receiver the host can select on to wake up when output arrives.
    pub fn wakeup(&self) -> Receiver<ChannelEvent> {
        self.events_rx.clone()
    }

    pub fn resize(&mut self, rows: u16, cols: u16) -> Result<(), ChannelError> {
        let session = self.session.as_ref().ok_or(ChannelError::NotOpen)?;
        session
            .master
            .resize(pty_size(rows, cols))
            .map_err(|err| ChannelError::Setup(err.to_string()))
    }

    fn spawn(&mut self) -> Result<(PtySession, Box<dyn Read + Send>), ChannelError> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(pty_size(self.options.rows, self.options.cols))
            .map_err(|err| ChannelError::Setup(err.to_string()))?;

        let program = self.options.resolve_program();
        let mut cmd = CommandBuilder::new(&program);
        cmd.args(&self.options.args);
        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|err| ChannelError::Setup(format!("{program}: {err}")))?;
        debug!(target = "bridge::pty", program = %program, "shell spawned");

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|err| ChannelError::Setup(err.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|err| ChannelError::Setup(err.to_string()))?;

        let session = PtySession {
            master: pair.master,
            writer,
            child,
        };
        Ok((session, reader))
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        let session = self.session.as_mut().ok_or(ChannelError::NotOpen)?;
        session.writer.write_all(bytes)?;
        session.writer.flush()?;
        if tracing::enabled!(Level::TRACE) {
            trace!(
                target = "bridge::pty",
                bytes = bytes.len(),
                dump = %crate::telemetry::logging::hexdump(bytes),
                "pty write"
            );
        }
        Ok(())
    }
}

impl SessionChannel for PtyChannel {
    fn open(&mut self) -> Result<(), ChannelError> {
        if let Some(session) = self.session.as_mut() {
            if matches!(session.child.try_wait(), Ok(None)) {
                return Ok(());
            }
            // Previous shell has exited; reap it before spawning a new one.
            self.close();
        }
        // Queue nothing until the spawn has succeeded.
        let (session, reader) = self.spawn()?;
        self.session = Some(session);
        for state in [SessionState::Connecting, SessionState::Connected] {
            let _ = self.events_tx.send(ChannelEvent::State(state));
        }

        // Started after Connected is queued so a fast exit cannot overtake it.
        // The thread ends by itself once the slave side closes.
        let events = self.events_tx.clone();
        thread::Builder::new()
            .name("pty-reader".into())
            .spawn(move || read_loop(reader, events))?;
        Ok(())
    }

    fn send(&mut self, event: ClientEvent) -> Result<(), ChannelError> {
        match event {
            ClientEvent::ShellInput(frame) => self.write_bytes(frame.data.as_bytes()),
            ClientEvent::HistoryUp {} => self.write_bytes(CURSOR_UP.as_bytes()),
            ClientEvent::HistoryDown {} => self.write_bytes(CURSOR_DOWN.as_bytes()),
            ClientEvent::ClearTerminal {} => self.write_bytes(FORM_FEED.as_bytes()),
            ClientEvent::UpdateInput { value } => {
                trace!(target = "bridge::pty", value = %value, "line edit update");
                Ok(())
            }
        }
    }

    fn try_recv(&mut self) -> Option<ChannelEvent> {
        self.events_rx.try_recv().ok()
    }

    fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let _ = session.writer.flush();
        if let Err(err) = session.child.kill() {
            debug!(target = "bridge::pty", error = %err, "kill failed");
        }
        let _ = session.child.wait();
    }

    fn describe(&self) -> &'static str {
        "pty"
    }
}

impl Drop for PtyChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn pty_size(rows: u16, cols: u16) -> PtySize {
    PtySize {
        rows: rows.max(1),
        cols: cols.max(1),
        pixel_width: 0,
        pixel_height: 0,
    }
}

fn read_loop(mut reader: Box<dyn Read + Send>, events: Sender<ChannelEvent>) {
    let mut buf = [0u8; READ_CHUNK];
    let mut decoder = Utf8Carry::default();
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                let text = decoder.decode(&buf[..n]);
                if text.is_empty() {
                    continue;
                }
                if events
                    .send(ChannelEvent::Server(ServerEvent::shell_output(text)))
                    .is_err()
                {
                    return;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!(target = "bridge::pty", error = %err, "pty read ended");
                break;
            }
        }
    }
    let _ = events.send(ChannelEvent::State(SessionState::Disconnected));
}

/// Holds back an incomplete trailing UTF-8 sequence until the next read.
#[derive(Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        // Truncated sequence at the end of the read.
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }
}
