//! Image source protocol handlers.
//!
//! Supports `file://` (already-prepared directory), `tar://` (archive
//! extracted into the root), and registry references such as
//! `alpine:3.19`. Registry downloads are staged in a temporary directory
//! that is removed once the pull finishes.

use std::path::PathBuf;

use burrow_common::config::RegistryConfig;
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::ContainerRoot;

use crate::reference::ImageReference;
use crate::registry::{ImageConfig, RegistryClient};

/// Supported image source protocols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Local directory used as the root as-is (`file:///path/to/rootfs`).
    File(PathBuf),
    /// Local tar archive (`tar:///path/to/image.tar`).
    Tar(PathBuf),
    /// Image pulled from the configured registry.
    Registry(ImageReference),
}

/// A root ready for the bootstrap, plus the image's configuration record
/// when the source carried one.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Directory holding the image's filesystem.
    pub root: ContainerRoot,
    /// Configuration record (registry images only).
    pub config: Option<ImageConfig>,
}

/// Resolves an image source URI into an `ImageSource`.
///
/// Anything without a `file://` or `tar://` scheme is parsed as a registry
/// reference.
///
/// # Errors
///
/// Returns an error if a local path does not exist or the reference is
/// malformed.
pub fn resolve_source(uri: &str) -> Result<ImageSource> {
    if let Some(path_str) = uri.strip_prefix("file://") {
        let path = PathBuf::from(path_str);
        if !path.is_dir() {
            return Err(BurrowError::NotFound {
                kind: "image directory",
                id: path_str.to_string(),
            });
        }
        tracing::info!(path = %path.display(), "resolved file:// source");
        Ok(ImageSource::File(path))
    } else if let Some(path_str) = uri.strip_prefix("tar://") {
        let path = PathBuf::from(path_str);
        if !path.is_file() {
            return Err(BurrowError::NotFound {
                kind: "tar archive",
                id: path_str.to_string(),
            });
        }
        tracing::info!(path = %path.display(), "resolved tar:// source");
        Ok(ImageSource::Tar(path))
    } else if uri.contains("://") {
        Err(BurrowError::Config {
            message: format!("unsupported image source URI scheme: {uri}"),
        })
    } else {
        let reference = ImageReference::parse(uri)?;
        tracing::info!(image = %reference, "resolved registry source");
        Ok(ImageSource::Registry(reference))
    }
}

impl ImageSource {
    /// Materialises the image as a root directory.
    ///
    /// `file://` sources ignore `root` and are used in place; the other
    /// sources populate `root`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction, download, or verification fails.
    pub fn prepare(&self, root: &ContainerRoot, registry: &RegistryConfig) -> Result<PreparedImage> {
        match self {
            Self::File(path) => Ok(PreparedImage {
                root: ContainerRoot::new(path)?,
                config: None,
            }),
            Self::Tar(archive) => {
                root.ensure_exists()?;
                let _ = crate::layer::extract_layer(archive, root.as_path())?;
                Ok(PreparedImage {
                    root: root.clone(),
                    config: None,
                })
            }
            Self::Registry(reference) => {
                root.ensure_exists()?;
                let staging = tempfile::Builder::new()
                    .prefix("burrow-layers-")
                    .tempdir()
                    .map_err(|e| BurrowError::Io {
                        path: std::env::temp_dir(),
                        source: e,
                    })?;
                let client = RegistryClient::new(registry.clone())?;
                let config = client.pull(reference, root.as_path(), staging.path())?;
                Ok(PreparedImage {
                    root: root.clone(),
                    config: Some(config),
                })
            }
        }
    }
}
