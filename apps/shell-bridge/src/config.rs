use crate::complete::SuggestionTable;
use crate::error::BridgeError;
use crate::render::BackendPreference;
use crate::telemetry::env_flag;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

pub const BACKEND_ENV: &str = "SHELL_BRIDGE_BACKEND";
pub const SHELL_ENV: &str = "SHELL_BRIDGE_SHELL";
pub const SUGGESTIONS_ENV: &str = "SHELL_BRIDGE_SUGGESTIONS";
pub const HISTORY_EVENTS_ENV: &str = "SHELL_BRIDGE_HISTORY_EVENTS";

/// Settings the bridge reads once at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    pub backend: BackendPreference,
    /// Send `history_up`/`history_down` events instead of cursor-key bytes.
    pub history_events: bool,
    /// Program for the PTY channel; `$SHELL` when unset.
    pub shell: Option<String>,
    /// Newline-separated suggestion file replacing the built-in table.
    pub suggestions: Option<PathBuf>,
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        let backend = match env::var(BACKEND_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|err: String| {
                warn!(target = "bridge::config", var = BACKEND_ENV, error = %err, "ignoring invalid backend");
                BackendPreference::default()
            }),
            Err(_) => BackendPreference::default(),
        };
        Self {
            backend,
            history_events: env_flag(HISTORY_EVENTS_ENV).unwrap_or(false),
            shell: non_empty_var(SHELL_ENV),
            suggestions: non_empty_var(SUGGESTIONS_ENV).map(PathBuf::from),
        }
    }

    pub fn suggestion_table(&self) -> Result<Arc<SuggestionTable>, BridgeError> {
        match &self.suggestions {
            Some(path) => SuggestionTable::load(path)
                .map(Arc::new)
                .map_err(|source| BridgeError::Suggestions {
                    path: path.clone(),
                    source,
                }),
            None => Ok(SuggestionTable::shared_default()),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
