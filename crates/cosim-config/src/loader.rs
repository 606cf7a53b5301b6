//! Configuration loader with multi-source merging

use crate::{BackendConfig, Paths};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    resource_dir: PathBuf,
    env_prefix: String,
    user_config: bool,
    env_source: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Create a new config loader with the current dir as resource directory
    pub fn new() -> Self {
        Self {
            resource_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "COSIM".to_string(),
            user_config: true,
            env_source: None,
        }
    }

    /// Set the directory holding the model's resources
    pub fn with_resource_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.resource_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "COSIM")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/cosim/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Read variables from `vars` instead of the process environment
    pub fn with_env_source(mut self, vars: HashMap<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<BackendConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = BackendConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/cosim/config.toml)
        if self.user_config {
            let paths = Paths::new();
            if let Ok(user_config_file) = paths.user_config_file()
                && user_config_file.exists()
            {
                builder = builder.add_source(
                    config::File::from(user_config_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        // 3. Resource config (cosim.toml)
        let resource_config_file = Paths::resource_config_file(&self.resource_dir);
        if resource_config_file.exists() {
            builder = builder.add_source(
                config::File::from(resource_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local overrides (cosim.local.toml)
        let local_config_file = Paths::local_config_file(&self.resource_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (COSIM_<SECTION>__<KEY>)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env_source),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let backend_config: BackendConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        backend_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(backend_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> BackendConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
