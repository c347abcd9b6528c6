use crate::channel::ChannelError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("host reported no render surface")]
    NoSurface,
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
    #[error("failed to load suggestions from {path:?}: {source}")]
    Suggestions {
        path: PathBuf,
        source: std::io::Error,
    },
}
