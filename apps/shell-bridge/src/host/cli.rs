use clap::{Args, Parser, builder::BoolishValueParser};
use std::path::PathBuf;

use crate::channel::PtyOptions;
use crate::config::BridgeConfig;
use crate::render::BackendPreference;
use crate::telemetry::logging::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "shell-bridge",
    about = "Drive a local shell through the terminal session bridge",
    author,
    version
)]
pub struct Cli {
    #[arg(
        long,
        value_enum,
        env = "SHELL_BRIDGE_BACKEND",
        default_value_t = BackendPreference::Fallback,
        help = "Output renderer (auto picks the emulator when the terminal supports it)"
    )]
    pub backend: BackendPreference,

    #[arg(
        long,
        value_name = "PROGRAM",
        env = "SHELL_BRIDGE_SHELL",
        help = "Shell to launch (defaults to $SHELL)"
    )]
    pub shell: Option<String>,

    #[arg(
        long,
        value_name = "PATH",
        env = "SHELL_BRIDGE_SUGGESTIONS",
        help = "Newline-separated autocomplete entries replacing the built-in table"
    )]
    pub suggestions: Option<PathBuf>,

    #[arg(
        long = "history-events",
        env = "SHELL_BRIDGE_HISTORY_EVENTS",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
        value_name = "BOOL",
        help = "Send history_up/history_down events instead of cursor-key bytes"
    )]
    pub history_events: Option<bool>,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[arg(
        trailing_var_arg = true,
        value_name = "ARGS",
        help = "Arguments passed to the shell"
    )]
    pub args: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "SHELL_BRIDGE_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "SHELL_BRIDGE_LOG_FILE",
        help = "Write logs to this file instead of stderr"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

impl Cli {
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            backend: self.backend,
            history_events: self.history_events.unwrap_or(false),
            shell: self.shell.clone(),
            suggestions: self.suggestions.clone(),
        }
    }

    pub fn pty_options(&self, rows: u16, cols: u16) -> PtyOptions {
        PtyOptions {
            program: self.shell.clone(),
            args: self.args.clone(),
            rows,
            cols,
        }
    }
}
