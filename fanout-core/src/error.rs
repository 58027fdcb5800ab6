//! Error types for fanout-core.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// One reason a configuration cannot start a watch session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("source directory does not exist: {path}")]
    SourceMissing { path: PathBuf },

    #[error("destination directory does not exist: {path}")]
    DestinationMissing { path: PathBuf },

    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("at least one destination directory is required")]
    NoDestinations,

    #[error("too many destination directories: {count} (at most {max})")]
    TooManyDestinations { count: usize, max: usize },

    #[error("stabilization max_attempts must be at least 1")]
    InvalidAttempts,
}

/// Every validation failure found in one pass, reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&lines.join("; "))
    }
}

/// All errors that can arise from loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// The config names directories that cannot be watched or written.
    #[error("invalid configuration: {0}")]
    Validation(ValidationErrors),
}

impl ConfigError {
    /// Individual validation failures, empty for other variants.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            ConfigError::Validation(errors) => &errors.0,
            _ => &[],
        }
    }
}
