use clap::ValueEnum;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const FILTER_ENV: &str = "SHELL_BRIDGE_LOG_FILTER";

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Log destination. The terminal host owns stderr's screen, so a file is
    /// the only way to see logs while the UI runs.
    pub file: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to open log file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to configure logger: {0}")]
    Configure(String),
}

static INIT: OnceLock<()> = OnceLock::new();
static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber. Calling it again is a no-op.
pub fn init(config: &LogConfig) -> Result<(), InitError> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let (writer, guard) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| InitError::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(config.level))
        .with_level(true)
        .with_target(config.level >= LogLevel::Debug)
        .with_thread_names(config.level >= LogLevel::Trace)
        .with_ansi(config.file.is_none())
        .with_writer(writer)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| InitError::Configure(err.to_string()))?;

    let _ = GUARD.set(guard);
    INIT.set(()).ok();
    Ok(())
}

fn build_env_filter(level: LogLevel) -> EnvFilter {
    match std::env::var(FILTER_ENV) {
        Ok(filter) if !filter.trim().is_empty() => EnvFilter::new(filter),
        _ => EnvFilter::new(default_directives(level)),
    }
}

/// Our own crates follow the chosen level; dependencies stay at `warn` or
/// quieter so PTY and terminal crates do not flood trace output.
fn default_directives(level: LogLevel) -> String {
    let dependency = level.min(LogLevel::Warn).as_str();
    let own = level.as_str();
    format!("{dependency},shell_bridge={own},shell_proto={own}")
}

/// Offset, hex and printable-ASCII columns, 16 bytes per row.
pub fn hexdump(bytes: &[u8]) -> String {
    const WIDTH: usize = 16;
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(WIDTH).enumerate() {
        let _ = write!(out, "{:08x}  ", row * WIDTH);
        for (idx, byte) in chunk.iter().enumerate() {
            if idx == WIDTH / 2 {
                out.push(' ');
            }
            let _ = write!(out, "{byte:02x} ");
        }
        for _ in chunk.len()..WIDTH {
            out.push_str("   ");
        }
        out.push(' ');
        out.extend(chunk.iter().map(|&byte| {
            if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}
