//! Configuration management for the cosim model backend
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (COSIM_* prefix, highest precedence)
//! 2. cosim.local.toml in the resource directory (local overrides)
//! 3. cosim.toml in the resource directory (shipped with the model)
//! 4. ~/.config/cosim/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! The kernel never reads any of this itself; the host turns a loaded
//! [`BackendConfig`] into kernel options and instance flags.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Default upper bound on an accepted snapshot blob (16 MiB).
pub const DEFAULT_MAX_SNAPSHOT_BYTES: usize = 16 * 1024 * 1024;

/// Main backend configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub logging: LoggingConfig,
    pub snapshot: SnapshotConfig,
    pub instance: InstanceDefaults,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"cosim_kernel=debug"`.
    pub filter: String,
    pub ansi: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: false,
            with_target: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub max_bytes: usize,
    pub verify_digest: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
            verify_digest: true,
        }
    }
}

/// Instance flags used when the host does not pass its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceDefaults {
    pub logging_on: bool,
    pub event_mode_used: bool,
    pub early_return_allowed: bool,
}

impl BackendConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration next to a model's resources
    pub fn load_from_dir(resource_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_resource_dir(resource_dir).load()
    }

    /// Read a single TOML file, without merging any other source.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render as a TOML document, e.g. to seed a `cosim.toml`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A configuration suited to interactive debugging of a model.
    pub fn verbose() -> Self {
        Self {
            logging: LoggingConfig {
                filter: "debug".to_string(),
                ansi: true,
                ..Default::default()
            },
            instance: InstanceDefaults {
                logging_on: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshot.max_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "snapshot.max_bytes must be greater than zero".to_string(),
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
