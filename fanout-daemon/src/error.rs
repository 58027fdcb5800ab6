use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the watch session.
///
/// Per-destination failures never show up here; they stay inside each
/// event's outcome. Only configuration and watcher failures end a session.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watch mechanism failure: {0}")]
    Watch(#[from] notify::Error),

    #[error("config error: {0}")]
    Config(#[from] fanout_core::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("task failure: {0}")]
    Task(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
