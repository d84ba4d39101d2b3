use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the notification server runtime.
///
/// Per-session failures never reach the accept loop; only startup and
/// listener-level failures are process-fatal.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watch registration error: {0}")]
    Notify(#[from] notify::Error),

    #[error("watch target does not exist: {path}")]
    WatchTargetMissing { path: PathBuf },

    #[error("listener socket already in use: {path}")]
    SocketInUse { path: PathBuf },

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("runtime error: {0}")]
    Runtime(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ServerError {
    ServerError::Io {
        path: path.into(),
        source,
    }
}
