//! Global configuration model for the Burrow runtime.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{BurrowError, Result};
use crate::types::ResourceLimits;

/// Root configuration for a Burrow invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurrowConfig {
    /// Directory prepared as the container root.
    pub rootfs_dir: PathBuf,
    /// Resource limits applied to the container.
    pub limits: ResourceLimits,
    /// Shell launched as the session process.
    pub shell: PathBuf,
    /// Registry endpoints used by the image source.
    pub registry: RegistryConfig,
}

impl Default for BurrowConfig {
    fn default() -> Self {
        Self {
            rootfs_dir: PathBuf::from(constants::DEFAULT_ROOTFS_DIR),
            limits: ResourceLimits::default(),
            shell: PathBuf::from(constants::DEFAULT_SHELL),
            registry: RegistryConfig::default(),
        }
    }
}

impl BurrowConfig {
    /// Loads a configuration from a JSON file; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BurrowError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

/// Endpoints used to pull images from a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Token service URL.
    pub auth_url: String,
    /// Service name presented to the token service.
    pub auth_service: String,
    /// Registry API base URL.
    pub registry_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            auth_url: constants::DEFAULT_AUTH_URL.into(),
            auth_service: constants::DEFAULT_AUTH_SERVICE.into(),
            registry_url: constants::DEFAULT_REGISTRY_URL.into(),
        }
    }
}
