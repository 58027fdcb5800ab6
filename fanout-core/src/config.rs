//! YAML configuration file and validation.
//!
//! # Storage layout
//!
//! ```text
//! ~/.fanout/
//!   config.yaml   (mode 0600; directory mode 0700)
//! ```
//!
//! # API pattern
//!
//! Every filesystem function has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError, ValidationErrors};
use crate::types::{
    Stabilization, WatchConfig, DEFAULT_STABILIZATION_DELAY_SECS,
    DEFAULT_STABILIZATION_MAX_ATTEMPTS, MAX_DESTINATIONS,
};

// ---------------------------------------------------------------------------
// 1. File model
// ---------------------------------------------------------------------------

/// Stabilization settings as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStabilization {
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RawStabilization {
    fn default() -> Self {
        Self {
            delay_secs: DEFAULT_STABILIZATION_DELAY_SECS,
            max_attempts: DEFAULT_STABILIZATION_MAX_ATTEMPTS,
        }
    }
}

fn default_delay_secs() -> u64 {
    DEFAULT_STABILIZATION_DELAY_SECS
}

fn default_max_attempts() -> u32 {
    DEFAULT_STABILIZATION_MAX_ATTEMPTS
}

/// Unvalidated configuration, exactly as the operator supplied it.
///
/// Destinations are kept as strings so blank entries survive until
/// [`RawConfig::validate`] discards them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub source: PathBuf,
    #[serde(default)]
    pub destinations: Vec<String>,
    #[serde(default)]
    pub stabilization: RawStabilization,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RawConfig {
    pub fn new(source: impl Into<PathBuf>, destinations: Vec<String>) -> Self {
        Self {
            source: source.into(),
            destinations,
            stabilization: RawStabilization::default(),
            updated_at: None,
        }
    }

    /// Non-blank destination entries, trimmed, in configured order.
    pub fn destination_paths(&self) -> Vec<PathBuf> {
        self.destinations
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    /// Check every root and build the immutable [`WatchConfig`].
    ///
    /// All problems are collected before returning, so the operator sees one
    /// error per missing path rather than only the first.
    pub fn validate(&self) -> Result<WatchConfig, ConfigError> {
        let mut errors = Vec::new();

        if self.stabilization.max_attempts == 0 {
            errors.push(ValidationError::InvalidAttempts);
        }

        let source_root = match check_dir(&self.source) {
            Ok(path) => Some(path),
            Err(DirProblem::Missing) => {
                errors.push(ValidationError::SourceMissing {
                    path: self.source.clone(),
                });
                None
            }
            Err(DirProblem::NotADirectory) => {
                errors.push(ValidationError::NotADirectory {
                    path: self.source.clone(),
                });
                None
            }
        };

        let destinations = self.destination_paths();
        if destinations.is_empty() {
            errors.push(ValidationError::NoDestinations);
        } else if destinations.len() > MAX_DESTINATIONS {
            errors.push(ValidationError::TooManyDestinations {
                count: destinations.len(),
                max: MAX_DESTINATIONS,
            });
        }

        let mut destination_roots = Vec::with_capacity(destinations.len());
        for dest in destinations {
            match check_dir(&dest) {
                Ok(path) => destination_roots.push(path),
                Err(DirProblem::Missing) => {
                    errors.push(ValidationError::DestinationMissing { path: dest })
                }
                Err(DirProblem::NotADirectory) => {
                    errors.push(ValidationError::NotADirectory { path: dest })
                }
            }
        }

        match source_root {
            Some(source_root) if errors.is_empty() => Ok(WatchConfig::new(
                source_root,
                destination_roots,
                Stabilization {
                    delay: Duration::from_secs(self.stabilization.delay_secs),
                    max_attempts: self.stabilization.max_attempts,
                },
            )),
            _ => Err(ConfigError::Validation(ValidationErrors(errors))),
        }
    }
}

/// Re-check the roots of an already-built `WatchConfig` before a watch starts.
///
/// Reports one error per missing or non-directory root; the directories may
/// have disappeared since `validate`, or the config was built by hand.
pub fn check_roots(config: &WatchConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    match check_dir(&config.source_root) {
        Ok(_) => {}
        Err(DirProblem::Missing) => errors.push(ValidationError::SourceMissing {
            path: config.source_root.clone(),
        }),
        Err(DirProblem::NotADirectory) => errors.push(ValidationError::NotADirectory {
            path: config.source_root.clone(),
        }),
    }

    for dest in &config.destination_roots {
        match check_dir(dest) {
            Ok(_) => {}
            Err(DirProblem::Missing) => {
                errors.push(ValidationError::DestinationMissing { path: dest.clone() })
            }
            Err(DirProblem::NotADirectory) => {
                errors.push(ValidationError::NotADirectory { path: dest.clone() })
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(ValidationErrors(errors)))
    }
}

enum DirProblem {
    Missing,
    NotADirectory,
}

/// Canonical path of an existing directory.
///
/// Canonical form matters for the source root: watcher events arrive as real
/// paths (e.g. `/private/var/...` on macOS) and must strip against it.
fn check_dir(path: &Path) -> Result<PathBuf, DirProblem> {
    if !path.exists() {
        return Err(DirProblem::Missing);
    }
    if !path.is_dir() {
        return Err(DirProblem::NotADirectory);
    }
    Ok(std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()))
}

// ---------------------------------------------------------------------------
// 2. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.fanout/` — pure, no I/O.
pub fn config_dir_at(home: &Path) -> PathBuf {
    home.join(".fanout")
}

/// `<home>/.fanout/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    config_dir_at(home).join("config.yaml")
}

/// `config_path_at` convenience wrapper.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Load a config file from an explicit path.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_from(path: &Path) -> Result<RawConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load `<home>/.fanout/config.yaml`.
pub fn load_at(home: &Path) -> Result<RawConfig, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<RawConfig, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 4. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `raw` to `<home>/.fanout/config.yaml`, stamping `updated_at`.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, raw: &RawConfig) -> Result<PathBuf, ConfigError> {
    let dir = config_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }

    let path = config_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let mut stamped = raw.clone();
    stamped.updated_at = Some(Utc::now());

    let yaml = serde_yaml::to_string(&stamped)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(raw: &RawConfig) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, raw)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
