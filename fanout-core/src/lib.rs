//! Fanout core library — session configuration, events, errors.
//!
//! - [`types`] — [`WatchConfig`], [`FileEvent`], [`Stabilization`]
//! - [`config`] — YAML config file load / save / validate
//! - [`error`] — [`ConfigError`], [`ValidationError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::RawConfig;
pub use error::{ConfigError, ValidationError, ValidationErrors};
pub use types::{FileEvent, Stabilization, WatchConfig};
