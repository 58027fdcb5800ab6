//! Domain types for a watch session.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! `WatchConfig` is the validated form; the on-disk form lives in
//! [`crate::config::RawConfig`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Seconds slept before each readiness attempt unless configured otherwise.
pub const DEFAULT_STABILIZATION_DELAY_SECS: u64 = 5;

/// Readiness attempts made before a created file is given up on.
pub const DEFAULT_STABILIZATION_MAX_ATTEMPTS: u32 = 3;

/// Upper bound on configured destination roots.
pub const MAX_DESTINATIONS: usize = 5;

// ---------------------------------------------------------------------------
// Stabilization
// ---------------------------------------------------------------------------

/// How long, and how often, to wait for a created file to stop changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stabilization {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for Stabilization {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(DEFAULT_STABILIZATION_DELAY_SECS),
            max_attempts: DEFAULT_STABILIZATION_MAX_ATTEMPTS,
        }
    }
}

// ---------------------------------------------------------------------------
// WatchConfig
// ---------------------------------------------------------------------------

/// Validated, immutable configuration of one watch session.
///
/// Built by [`crate::config::RawConfig::validate`], which checks that every
/// root is an existing directory. [`WatchConfig::new`] skips those checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchConfig {
    pub source_root: PathBuf,
    pub destination_roots: Vec<PathBuf>,
    pub stabilization: Stabilization,
}

impl WatchConfig {
    pub fn new(
        source_root: impl Into<PathBuf>,
        destination_roots: Vec<PathBuf>,
        stabilization: Stabilization,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            destination_roots,
            stabilization,
        }
    }

    /// `path` relative to the source root, or `None` if it lies outside it.
    pub fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.source_root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

// ---------------------------------------------------------------------------
// FileEvent
// ---------------------------------------------------------------------------

/// One filesystem change observed under the source root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileEvent {
    Created { path: PathBuf },
    Deleted { path: PathBuf },
    Moved { from: PathBuf, to: PathBuf },
}

impl FileEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::Created { path: path.into() }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::Deleted { path: path.into() }
    }

    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::Moved {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FileEvent::Created { .. } => "created",
            FileEvent::Deleted { .. } => "deleted",
            FileEvent::Moved { .. } => "moved",
        }
    }
}

impl fmt::Display for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileEvent::Created { path } => write!(f, "created {}", path.display()),
            FileEvent::Deleted { path } => write!(f, "deleted {}", path.display()),
            FileEvent::Moved { from, to } => {
                write!(f, "moved {} -> {}", from.display(), to.display())
            }
        }
    }
}
