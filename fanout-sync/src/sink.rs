//! Outcome sinks: where the one-line-per-outcome messages go.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Severity attached to an outcome line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Receives human-readable outcome lines from the propagation engine.
pub trait OutcomeSink: Send + Sync {
    fn line(&self, level: Level, line: &str);
}

/// Forwards every line to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl OutcomeSink for LogSink {
    fn line(&self, level: Level, line: &str) {
        match level {
            Level::Info => tracing::info!("{line}"),
            Level::Warn => tracing::warn!("{line}"),
            Level::Error => tracing::error!("{line}"),
        }
    }
}

/// A retained outcome line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkLine {
    pub at: DateTime<Utc>,
    pub level: Level,
    pub text: String,
}

/// Keeps lines in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<SinkLine>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<SinkLine> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines().into_iter().map(|l| l.text).collect()
    }

    /// Number of lines at `level` containing `needle`.
    pub fn count(&self, level: Level, needle: &str) -> usize {
        self.lines()
            .iter()
            .filter(|l| l.level == level && l.text.contains(needle))
            .count()
    }
}

impl OutcomeSink for MemorySink {
    fn line(&self, level: Level, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(SinkLine {
                at: Utc::now(),
                level,
                text: line.to_string(),
            });
    }
}
