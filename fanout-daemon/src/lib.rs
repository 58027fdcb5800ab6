//! Watch session runtime: notify watcher + serial event processor.

mod error;
mod session;
pub mod translate;

pub use error::DaemonError;
pub use session::{init_tracing, run, start_blocking, SessionSummary, WatchSession};
pub use translate::EventTranslator;
