//! Path utilities and XDG directory discovery

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// XDG-compliant paths for cosim
pub struct Paths {
    project_dirs: Option<ProjectDirs>,
}

impl Paths {
    /// Create a new Paths instance with XDG discovery
    pub fn new() -> Self {
        Self {
            project_dirs: ProjectDirs::from("org", "cosim", "cosim"),
        }
    }

    /// Get user config directory (~/.config/cosim/)
    pub fn user_config_dir(&self) -> Result<PathBuf, ConfigError> {
        self.project_dirs
            .as_ref()
            .map(|p| p.config_dir().to_path_buf())
            .ok_or_else(|| {
                ConfigError::XdgError("Failed to determine user config directory".to_string())
            })
    }

    /// Get user config file path (~/.config/cosim/config.toml)
    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.user_config_dir()?.join("config.toml"))
    }

    /// Get the config file shipped with a model's resources (cosim.toml)
    pub fn resource_config_file(resource_dir: impl AsRef<Path>) -> PathBuf {
        resource_dir.as_ref().join("cosim.toml")
    }

    /// Get local override file path (cosim.local.toml)
    pub fn local_config_file(resource_dir: impl AsRef<Path>) -> PathBuf {
        resource_dir.as_ref().join("cosim.local.toml")
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
