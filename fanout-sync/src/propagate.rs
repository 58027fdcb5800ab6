//! Propagation engine: mirror one [`FileEvent`] into every destination root.
//!
//! Each destination is attempted independently. A failure in one is captured
//! in its [`DestinationResult`] and logged; the loop moves on to the next.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filetime::FileTime;
use serde::Serialize;

use fanout_core::{FileEvent, WatchConfig};

use crate::error::{io_err, PropagationError};
use crate::readiness::{Readiness, ReadinessDetector, Sleeper, ThreadSleeper};
use crate::sink::{Level, OutcomeSink};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Mutation (or deliberate non-mutation) applied to one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Copied { path: PathBuf, bytes: u64 },
    Deleted { path: PathBuf },
    /// Nothing at the mirrored path, or it is a directory.
    NothingToDelete { path: PathBuf },
    Renamed { from: PathBuf, to: PathBuf },
    /// The mirrored "from" path never existed in this destination.
    NothingToRename { path: PathBuf },
}

impl Action {
    /// `true` when the destination was left untouched on purpose.
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            Action::NothingToDelete { .. } | Action::NothingToRename { .. }
        )
    }
}

/// Result for one destination root.
#[derive(Debug)]
pub struct DestinationResult {
    pub destination: PathBuf,
    pub result: Result<Action, PropagationError>,
}

impl DestinationResult {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    Directory,
    OutsideSourceRoot,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::Directory => f.write_str("directory"),
            IgnoreReason::OutsideSourceRoot => f.write_str("outside source root"),
        }
    }
}

/// What happened to one event.
#[derive(Debug)]
pub enum EventOutcome {
    Ignored {
        path: PathBuf,
        reason: IgnoreReason,
    },
    /// Created file never stabilized; the event was dropped.
    NotReady {
        path: PathBuf,
        readiness: Readiness,
    },
    Propagated {
        relative: PathBuf,
        results: Vec<DestinationResult>,
    },
}

/// Per-destination tallies of one or more outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl OutcomeCounts {
    pub fn add(&mut self, other: OutcomeCounts) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

impl EventOutcome {
    pub fn results(&self) -> &[DestinationResult] {
        match self {
            EventOutcome::Propagated { results, .. } => results,
            _ => &[],
        }
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for r in self.results() {
            match &r.result {
                Ok(action) if action.is_noop() => counts.skipped += 1,
                Ok(_) => counts.succeeded += 1,
                Err(_) => counts.failed += 1,
            }
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Propagator
// ---------------------------------------------------------------------------

/// Turns events under the source root into destination-side mutations.
pub struct Propagator<S = ThreadSleeper> {
    config: Arc<WatchConfig>,
    detector: ReadinessDetector<S>,
    sink: Arc<dyn OutcomeSink>,
}

impl Propagator<ThreadSleeper> {
    pub fn new(config: Arc<WatchConfig>, sink: Arc<dyn OutcomeSink>) -> Self {
        let detector = ReadinessDetector::new(config.stabilization);
        Self::with_detector(config, detector, sink)
    }
}

impl<S: Sleeper> Propagator<S> {
    pub fn with_detector(
        config: Arc<WatchConfig>,
        detector: ReadinessDetector<S>,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            config,
            detector,
            sink,
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Session start lines: source, destination count, one line per destination.
    pub fn announce(&self) {
        self.sink.line(
            Level::Info,
            &format!(
                "monitoring {} for new files",
                self.config.source_root.display()
            ),
        );
        self.sink.line(
            Level::Info,
            &format!(
                "active destinations: {}",
                self.config.destination_roots.len()
            ),
        );
        for dest in &self.config.destination_roots {
            self.sink.line(Level::Info, &format!("- {}", dest.display()));
        }
    }

    /// Process one event to completion. Blocks on readiness for `Created`.
    pub fn handle(&self, event: &FileEvent) -> EventOutcome {
        match event {
            FileEvent::Created { path } => self.on_created(path),
            FileEvent::Deleted { path } => self.on_deleted(path),
            FileEvent::Moved { from, to } => self.on_moved(from, to),
        }
    }

    fn on_created(&self, path: &Path) -> EventOutcome {
        if path.is_dir() {
            return ignored(path, IgnoreReason::Directory);
        }
        let Some(relative) = self.relative(path) else {
            return ignored(path, IgnoreReason::OutsideSourceRoot);
        };

        let readiness = self.detector.check(path);
        if !readiness.ready {
            self.sink.line(
                Level::Warn,
                &format!(
                    "file {} not ready after {} attempts",
                    path.display(),
                    readiness.attempts
                ),
            );
            return EventOutcome::NotReady {
                path: path.to_path_buf(),
                readiness,
            };
        }

        let mut results = Vec::with_capacity(self.config.destination_roots.len());
        for dest in &self.config.destination_roots {
            let target = dest.join(&relative);
            let result = copy_file(path, &target).map(|bytes| Action::Copied {
                path: target.clone(),
                bytes,
            });
            match &result {
                Ok(_) => self.sink.line(
                    Level::Info,
                    &format!(
                        "copied {} to {}",
                        relative.display(),
                        target.display()
                    ),
                ),
                Err(err) => self.sink.line(
                    Level::Error,
                    &format!(
                        "error copying {} to {}: {err}",
                        relative.display(),
                        dest.display()
                    ),
                ),
            }
            results.push(DestinationResult {
                destination: dest.clone(),
                result,
            });
        }

        EventOutcome::Propagated { relative, results }
    }

    fn on_deleted(&self, path: &Path) -> EventOutcome {
        if path.is_dir() {
            return ignored(path, IgnoreReason::Directory);
        }
        let Some(relative) = self.relative(path) else {
            return ignored(path, IgnoreReason::OutsideSourceRoot);
        };

        let mut results = Vec::with_capacity(self.config.destination_roots.len());
        for dest in &self.config.destination_roots {
            let target = dest.join(&relative);
            let result = remove_file(&target);
            match &result {
                Ok(Action::Deleted { .. }) => self.sink.line(
                    Level::Info,
                    &format!("deleted {} from {}", relative.display(), dest.display()),
                ),
                Ok(_) => self.sink.line(
                    Level::Info,
                    &format!(
                        "nothing to delete for {} in {}",
                        relative.display(),
                        dest.display()
                    ),
                ),
                Err(err) => self.sink.line(
                    Level::Error,
                    &format!(
                        "error deleting {} from {}: {err}",
                        relative.display(),
                        dest.display()
                    ),
                ),
            }
            results.push(DestinationResult {
                destination: dest.clone(),
                result,
            });
        }

        EventOutcome::Propagated { relative, results }
    }

    fn on_moved(&self, from: &Path, to: &Path) -> EventOutcome {
        if to.is_dir() {
            return ignored(to, IgnoreReason::Directory);
        }
        let Some(from_rel) = self.relative(from) else {
            return ignored(from, IgnoreReason::OutsideSourceRoot);
        };
        let Some(to_rel) = self.relative(to) else {
            return ignored(to, IgnoreReason::OutsideSourceRoot);
        };

        let mut results = Vec::with_capacity(self.config.destination_roots.len());
        for dest in &self.config.destination_roots {
            let result = rename_within(&dest.join(&from_rel), &dest.join(&to_rel));
            match &result {
                Ok(Action::Renamed { .. }) => self.sink.line(
                    Level::Info,
                    &format!(
                        "renamed {} to {} in {}",
                        from_rel.display(),
                        to_rel.display(),
                        dest.display()
                    ),
                ),
                Ok(_) => self.sink.line(
                    Level::Info,
                    &format!(
                        "nothing to rename for {} in {}",
                        from_rel.display(),
                        dest.display()
                    ),
                ),
                Err(err) => self.sink.line(
                    Level::Error,
                    &format!(
                        "error renaming {} to {} in {}: {err}",
                        from_rel.display(),
                        to_rel.display(),
                        dest.display()
                    ),
                ),
            }
            results.push(DestinationResult {
                destination: dest.clone(),
                result,
            });
        }

        EventOutcome::Propagated {
            relative: to_rel,
            results,
        }
    }

    fn relative(&self, path: &Path) -> Option<PathBuf> {
        let rel = self.config.relative_path(path);
        if rel.is_none() {
            tracing::debug!("ignoring event outside source root: {}", path.display());
        }
        rel
    }
}

fn ignored(path: &Path, reason: IgnoreReason) -> EventOutcome {
    tracing::debug!("ignored {} ({reason})", path.display());
    EventOutcome::Ignored {
        path: path.to_path_buf(),
        reason,
    }
}

// ---------------------------------------------------------------------------
// Filesystem operations
// ---------------------------------------------------------------------------

/// Copy bytes, permissions and access/modification times, overwriting `target`.
fn copy_file(source: &Path, target: &Path) -> Result<u64, PropagationError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let bytes = fs::copy(source, target).map_err(|e| io_err(target, e))?;

    let meta = fs::metadata(source).map_err(|e| io_err(source, e))?;
    let atime = FileTime::from_last_access_time(&meta);
    let mtime = FileTime::from_last_modification_time(&meta);
    filetime::set_file_times(target, atime, mtime).map_err(|e| io_err(target, e))?;
    Ok(bytes)
}

fn remove_file(target: &Path) -> Result<Action, PropagationError> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => Ok(Action::NothingToDelete {
            path: target.to_path_buf(),
        }),
        Ok(_) => {
            fs::remove_file(target).map_err(|e| io_err(target, e))?;
            Ok(Action::Deleted {
                path: target.to_path_buf(),
            })
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Action::NothingToDelete {
            path: target.to_path_buf(),
        }),
        Err(err) => Err(io_err(target, err)),
    }
}

fn rename_within(from: &Path, to: &Path) -> Result<Action, PropagationError> {
    match fs::symlink_metadata(from) {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Ok(Action::NothingToRename {
                path: from.to_path_buf(),
            })
        }
        Err(err) => return Err(io_err(from, err)),
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    fs::rename(from, to).map_err(|e| io_err(to, e))?;
    Ok(Action::Renamed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
