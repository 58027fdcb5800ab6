//! Error types for fanout-sync.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of one mirrored operation against one destination root.
///
/// Never escapes a [`crate::Propagator`]; it is recorded in the matching
/// [`crate::DestinationResult`] and the remaining destinations still run.
#[derive(Debug, Error)]
pub enum PropagationError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PropagationError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            PropagationError::Io { path, .. } => path,
        }
    }
}

/// Convenience constructor for [`PropagationError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PropagationError {
    PropagationError::Io {
        path: path.into(),
        source,
    }
}
