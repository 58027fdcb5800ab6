//! `notify::Event` → [`FileEvent`] translation.
//!
//! Backends report renames differently. inotify sends `From`, `To`, then a
//! paired `Both`; Windows sends `From` and `To` only; FSEvents sends `Any`
//! per path. The translator emits exactly one `Moved` per rename either way:
//! a `From` is held until its `To`, and the `Both` echoing an already-paired
//! rename is dropped.

use std::path::PathBuf;
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};

use fanout_core::FileEvent;

/// How long an unpaired rename `From` waits before it counts as a delete.
pub const RENAME_PAIR_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
pub struct EventTranslator {
    pending_from: Option<PathBuf>,
    last_pair: Option<(PathBuf, PathBuf)>,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A rename `From` is waiting for its `To`.
    pub fn has_pending(&self) -> bool {
        self.pending_from.is_some()
    }

    /// Give up on the pending `From`: the file left the watched tree.
    pub fn flush(&mut self) -> Option<FileEvent> {
        self.pending_from.take().map(|path| FileEvent::Deleted { path })
    }

    pub fn translate(&mut self, event: Event) -> Vec<FileEvent> {
        let mut out = Vec::new();
        let last_pair = self.last_pair.take();

        match event.kind {
            EventKind::Create(kind) => {
                out.extend(self.flush());
                if kind != CreateKind::Folder {
                    out.extend(event.paths.into_iter().map(|path| FileEvent::Created { path }));
                }
            }
            EventKind::Remove(kind) => {
                out.extend(self.flush());
                if kind != RemoveKind::Folder {
                    out.extend(event.paths.into_iter().map(|path| FileEvent::Deleted { path }));
                }
            }
            EventKind::Modify(ModifyKind::Name(mode)) => {
                self.rename(mode, event.paths, last_pair, &mut out);
            }
            _ => {
                // Content, metadata and access changes are not mirrored.
                self.last_pair = last_pair;
            }
        }
        out
    }

    fn rename(
        &mut self,
        mode: RenameMode,
        paths: Vec<PathBuf>,
        last_pair: Option<(PathBuf, PathBuf)>,
        out: &mut Vec<FileEvent>,
    ) {
        match mode {
            RenameMode::Both => {
                let mut paths = paths.into_iter();
                let (Some(from), Some(to)) = (paths.next(), paths.next()) else {
                    return;
                };
                if last_pair.as_ref() == Some(&(from.clone(), to.clone())) {
                    return;
                }
                if self.pending_from.as_ref() == Some(&from) {
                    self.pending_from = None;
                }
                out.extend(self.flush());
                out.push(FileEvent::Moved { from, to });
            }
            RenameMode::From => {
                out.extend(self.flush());
                self.pending_from = paths.into_iter().next();
            }
            RenameMode::To => {
                for to in paths {
                    match self.pending_from.take() {
                        Some(from) => {
                            self.last_pair = Some((from.clone(), to.clone()));
                            out.push(FileEvent::Moved { from, to });
                        }
                        None => out.push(FileEvent::Created { path: to }),
                    }
                }
            }
            RenameMode::Any | RenameMode::Other => {
                out.extend(self.flush());
                for path in paths {
                    if path.exists() {
                        out.push(FileEvent::Created { path });
                    } else {
                        out.push(FileEvent::Deleted { path });
                    }
                }
            }
        }
    }
}
