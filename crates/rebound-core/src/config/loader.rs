//! Hierarchical retry policy loader with precedence
//!
//! Loads retry policies from multiple sources with the following precedence (low to high):
//! 1. Built-in defaults
//! 2. Policy file (`<config dir>/rebound.yaml`, default `~/.rebound`)
//! 3. Environment variables (REBOUND_* prefix, applied to the default policy)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::RetryPoliciesConfig;
use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use std::env;
use std::fs;

/// Name of the policy file inside the config directory
pub const POLICY_FILE: &str = "rebound.yaml";

/// Retry policy hierarchy loader
#[derive(Debug, Clone)]
pub struct RetryConfigLoader {
    /// Directory searched for the policy file
    config_dir: Utf8PathBuf,
}

impl RetryConfigLoader {
    /// Create a loader rooted at the standard config directory (~/.rebound)
    pub fn new() -> Result<Self> {
        let config_dir = Self::default_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Get the standard config directory (~/.rebound)
    fn default_config_dir() -> Result<Utf8PathBuf> {
        let home = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| Error::invalid_config("Could not determine home directory"))?;

        Ok(Utf8PathBuf::from(home).join(".rebound"))
    }

    /// Load retry policies with hierarchical precedence
    pub fn load(&self) -> Result<RetryPoliciesConfig> {
        let mut config = RetryPoliciesConfig::default();

        let policy_path = self.policy_path();
        if policy_path.exists() {
            tracing::debug!(path = %policy_path, "loading retry policies");
            let file_config = Self::load_yaml_file::<RetryPoliciesConfig>(&policy_path)?;
            config = Self::merge_policies(config, file_config);
        }

        config = Self::apply_env_overrides(config)?;
        config.validate()?;

        Ok(config)
    }

    /// Load retry policies from an explicit file, layered over the defaults
    ///
    /// Unlike [`load`](Self::load), a missing file is an error.
    pub fn load_file(path: &Utf8Path) -> Result<RetryPoliciesConfig> {
        if !path.exists() {
            return Err(Error::config_not_found(path.as_str()));
        }

        let file_config = Self::load_yaml_file::<RetryPoliciesConfig>(path)?;
        let config = Self::merge_policies(RetryPoliciesConfig::default(), file_config);
        let config = Self::apply_env_overrides(config)?;
        config.validate()?;

        Ok(config)
    }

    /// Load a YAML file and parse it
    fn load_yaml_file<T: DeserializeOwned>(path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let config: T = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
        Ok(config)
    }

    /// Merge retry policies (base is overridden by overlay)
    fn merge_policies(mut base: RetryPoliciesConfig, overlay: RetryPoliciesConfig) -> RetryPoliciesConfig {
        // Operation-specific policies replace base entries by name
        for (key, policy) in overlay.operations {
            base.operations.insert(key, policy);
        }
        base.default = overlay.default;
        base
    }

    /// Apply environment variable overrides to the default policy
    fn apply_env_overrides(mut config: RetryPoliciesConfig) -> Result<RetryPoliciesConfig> {
        if let Ok(val) = env::var("REBOUND_MAX_RETRIES") {
            config.default.max_retries = val.parse().map_err(|_| {
                Error::invalid_config("REBOUND_MAX_RETRIES must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("REBOUND_BASE_DELAY_MS") {
            config.default.base_delay_ms = val.parse().map_err(|_| {
                Error::invalid_config("REBOUND_BASE_DELAY_MS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("REBOUND_MAX_DELAY_MS") {
            config.default.max_delay_ms = val.parse().map_err(|_| {
                Error::invalid_config("REBOUND_MAX_DELAY_MS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("REBOUND_STRATEGY") {
            config.default.strategy = val.parse()?;
        }

        Ok(config)
    }

    /// Path of the policy file this loader reads
    pub fn policy_path(&self) -> Utf8PathBuf {
        self.config_dir.join(POLICY_FILE)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
