pub mod cli;
pub mod keys;

use crate::bridge::SessionBridge;
use crate::channel::{PtyChannel, SessionState};
use crate::complete::SuggestionTable;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::render::Surface;
use cli::Cli;
use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use std::io::{self, IsTerminal, Stdout};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Error)]
pub enum CliError {
    #[error("terminal setup failed: {0}")]
    Terminal(#[from] io::Error),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("shell session ended before it connected")]
    NotConnected,
}

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Runs a local shell behind the bridge until the shell exits or the user quits.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    let config = cli.bridge_config();
    let suggestions = config.suggestion_table()?;

    let mut tui = setup_tui()?;
    let outcome = session(&mut tui, cli, config, suggestions);
    let teardown = teardown_tui(&mut tui);
    outcome.and(teardown)
}

fn session(
    tui: &mut Tui,
    cli: &Cli,
    config: BridgeConfig,
    suggestions: Arc<SuggestionTable>,
) -> Result<(), CliError> {
    let (cols, rows) = crossterm::terminal::size()?;
    let surface = body_surface(Rect::new(0, 0, cols, rows));
    let channel = PtyChannel::new(cli.pty_options(surface.rows, surface.cols));
    let mut bridge = SessionBridge::new(channel, config, suggestions).with_surface(surface);
    info!(target = "bridge::host", backend = %bridge.config().backend, "mounting");
    bridge.mount()?;
    event_loop(tui, &mut bridge)
}

fn event_loop(tui: &mut Tui, bridge: &mut SessionBridge<PtyChannel>) -> Result<(), CliError> {
    let mut was_connected = false;
    loop {
        bridge.pump();
        match bridge.state() {
            SessionState::Connected => was_connected = true,
            SessionState::Disconnected => {
                if !was_connected {
                    warn!(target = "bridge::host", "session never connected");
                    return Err(CliError::NotConnected);
                }
                return Ok(());
            }
            SessionState::Connecting => {}
        }

        tui.draw(|frame| {
            let [body, status] = split(frame.area());
            if let Some(renderer) = bridge.renderer() {
                renderer.draw(body, frame.buffer_mut());
                if let Some((col, row)) = renderer.cursor() {
                    frame.set_cursor_position(Position::new(
                        body.x + col.min(body.width.saturating_sub(1)),
                        body.y + row.min(body.height.saturating_sub(1)),
                    ));
                }
            }
            frame.render_widget(status_line(bridge), status);
        })?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if keys::is_quit(&key) {
                    debug!(target = "bridge::host", "quit requested");
                    bridge.lifecycle(false);
                    return Ok(());
                }
                if let Some(input) = keys::input_event(&key) {
                    bridge.handle_key(&input);
                }
            }
            Event::Paste(text) => {
                for input in keys::paste_events(&text) {
                    bridge.handle_key(&input);
                }
            }
            Event::Resize(cols, rows) => {
                let surface = body_surface(Rect::new(0, 0, cols, rows));
                bridge.set_surface(Some(surface));
                if let Err(err) = bridge.channel_mut().resize(surface.rows, surface.cols) {
                    debug!(target = "bridge::host", error = %err, "pty resize skipped");
                }
            }
            _ => {}
        }
    }
}

fn split(area: Rect) -> [Rect; 2] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    [chunks[0], chunks[1]]
}

fn body_surface(area: Rect) -> Surface {
    let [body, _] = split(area);
    Surface::new(body.height, body.width).with_rich(io::stdout().is_terminal())
}

fn status_line(bridge: &SessionBridge<PtyChannel>) -> Paragraph<'static> {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let spans = vec![
        Span::styled(
            format!(" {} ", bridge.state()),
            Style::default().add_modifier(Modifier::REVERSED),
        ),
        Span::styled(format!(" backend: {} ", bridge.config().backend), dim),
        Span::styled(" Ctrl+] quits ", dim),
    ];
    Paragraph::new(Line::from(spans))
}

fn setup_tui() -> Result<Tui, CliError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

fn teardown_tui(terminal: &mut Tui) -> Result<(), CliError> {
    terminal.show_cursor().ok();
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    Ok(())
}
