//! # fanout-sync
//!
//! Readiness detection and fan-out propagation.
//!
//! A [`Propagator`] takes one [`fanout_core::FileEvent`], waits for created
//! files to settle via the [`ReadinessDetector`], and mirrors the change into
//! every destination root, returning one [`DestinationResult`] per root.

pub mod error;
pub mod propagate;
pub mod readiness;
pub mod sink;

pub use error::PropagationError;
pub use propagate::{
    Action, DestinationResult, EventOutcome, IgnoreReason, OutcomeCounts, Propagator,
};
pub use readiness::{Readiness, ReadinessDetector, Sleeper, ThreadSleeper, SAMPLE_INTERVAL};
pub use sink::{Level, LogSink, MemorySink, OutcomeSink, SinkLine};
