//! Readiness detection for newly created files.
//!
//! ## Attempt protocol
//!
//! 1. Sleep the configured stabilization delay.
//! 2. Record the file size.
//! 3. Sleep [`SAMPLE_INTERVAL`] (fixed, independent of the delay).
//! 4. Record the size again.
//! 5. Ready when both sizes match and the file is not locked.
//!
//! Any I/O error (file vanished, permission denied) consumes the attempt.
//! After `max_attempts` the file is reported not ready.
//!
//! ## Known limits
//!
//! Two equal samples are a heuristic: a writer that pauses for exactly the
//! sample interval and then resumes is reported ready. The lock probe renames
//! the file onto itself, which only fails while another process holds an
//! exclusive handle (Windows share modes). Advisory locks, and handles held by
//! this process, are invisible to it.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use fanout_core::Stabilization;

/// Gap between the two size samples of one attempt.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Blocking sleep used between samples.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Outcome of a readiness check and the attempts it consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub attempts: u32,
}

/// Decides whether a file has finished being written.
#[derive(Debug, Clone)]
pub struct ReadinessDetector<S = ThreadSleeper> {
    stabilization: Stabilization,
    sleeper: S,
}

impl ReadinessDetector<ThreadSleeper> {
    pub fn new(stabilization: Stabilization) -> Self {
        Self::with_sleeper(stabilization, ThreadSleeper)
    }
}

impl<S: Sleeper> ReadinessDetector<S> {
    pub fn with_sleeper(stabilization: Stabilization, sleeper: S) -> Self {
        Self {
            stabilization,
            sleeper,
        }
    }

    /// Run up to `max_attempts` attempts, returning on the first success.
    pub fn check(&self, path: &Path) -> Readiness {
        let max_attempts = self.stabilization.max_attempts;
        for attempt in 1..=max_attempts {
            match self.attempt(path) {
                Ok(true) => {
                    return Readiness {
                        ready: true,
                        attempts: attempt,
                    }
                }
                Ok(false) => {
                    tracing::debug!(
                        "file {} still changing or locked (attempt {attempt})",
                        path.display()
                    );
                }
                Err(err) => {
                    tracing::debug!("file check attempt {attempt} failed: {err}");
                }
            }
        }
        Readiness {
            ready: false,
            attempts: max_attempts,
        }
    }

    /// [`check`](Self::check) without the attempt count.
    pub fn is_ready(&self, path: &Path) -> bool {
        self.check(path).ready
    }

    fn attempt(&self, path: &Path) -> io::Result<bool> {
        self.sleeper.sleep(self.stabilization.delay);
        let first = fs::metadata(path)?.len();
        self.sleeper.sleep(SAMPLE_INTERVAL);
        let second = fs::metadata(path)?.len();
        Ok(first == second && !is_locked(path))
    }
}

/// Rename-to-self probe: `true` when the rename is refused.
pub fn is_locked(path: &Path) -> bool {
    fs::rename(path, path).is_err()
}
