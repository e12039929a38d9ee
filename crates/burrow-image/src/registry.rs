//! Registry client.
//!
//! Speaks the Docker registry v2 HTTP API: anonymous bearer-token
//! authentication, manifest and config retrieval, and blob download. Every
//! blob is verified against its manifest digest before use.

use std::path::{Path, PathBuf};

use burrow_common::config::RegistryConfig;
use burrow_common::constants::{MANIFEST_V2_MEDIA_TYPE, MAX_IMAGE_LAYERS};
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::Sha256Hash;
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};

use crate::reference::ImageReference;

/// Token service response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthToken {
    /// Bearer token for registry requests.
    #[serde(default)]
    pub token: String,
    /// OAuth2-style alias some token services return instead of `token`.
    #[serde(default)]
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Issue time.
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    /// Returns whichever token field the service filled in.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        [self.token.as_str(), self.access_token.as_str()]
            .into_iter()
            .find(|t| !t.is_empty())
    }
}

/// Content descriptor referenced from a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    pub media_type: String,
    /// Size in bytes.
    pub size: u64,
    /// `sha256:<hex>` digest.
    pub digest: String,
}

impl Descriptor {
    /// Parses the descriptor's digest.
    ///
    /// # Errors
    ///
    /// Returns an error for non-`sha256` or malformed digests.
    pub fn hash(&self) -> Result<Sha256Hash> {
        Sha256Hash::from_digest(&self.digest)
    }
}

/// Image manifest, schema version 2.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Always 2 for manifests this client accepts.
    pub schema_version: u32,
    /// Manifest media type.
    #[serde(default)]
    pub media_type: String,
    /// Image configuration blob.
    pub config: Descriptor,
    /// Layer blobs, lowest first.
    pub layers: Vec<Descriptor>,
}

impl Manifest {
    /// Checks the manifest is one this client can apply.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Config` for unsupported schema versions, missing
    /// layers, or more than [`MAX_IMAGE_LAYERS`] layers.
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != 2 {
            return Err(BurrowError::Config {
                message: format!("unsupported manifest schema version {}", self.schema_version),
            });
        }
        if self.layers.is_empty() || self.layers.len() > MAX_IMAGE_LAYERS {
            return Err(BurrowError::Config {
                message: format!(
                    "manifest has {} layers, expected 1..={MAX_IMAGE_LAYERS}",
                    self.layers.len()
                ),
            });
        }
        Ok(())
    }
}

/// Image configuration record.
///
/// Reported to the operator only; the bootstrap never runs its command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    /// CPU architecture, e.g. `amd64`.
    #[serde(default)]
    pub architecture: String,
    /// Operating system, e.g. `linux`.
    #[serde(default)]
    pub os: String,
    /// Build time.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    /// Runtime defaults.
    #[serde(default)]
    pub config: ContainerDefaults,
    /// Layer diff IDs.
    #[serde(default)]
    pub rootfs: RootFs,
}

/// Runtime defaults recorded in the image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerDefaults {
    /// Environment entries as `KEY=value`.
    #[serde(default)]
    pub env: Option<Vec<String>>,
    /// Default command.
    #[serde(default)]
    pub cmd: Option<Vec<String>>,
    /// Entrypoint prefix.
    #[serde(default)]
    pub entrypoint: Option<Vec<String>>,
    /// Working directory.
    #[serde(default)]
    pub working_dir: Option<String>,
}

/// Layer diff IDs of the uncompressed root filesystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootFs {
    /// Usually `layers`.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Diff IDs, lowest layer first.
    #[serde(default)]
    pub diff_ids: Vec<String>,
}

/// Blocking client for one registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    endpoints: RegistryConfig,
}

impl RegistryClient {
    /// Creates a client for the configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Registry` if the HTTP client cannot be built.
    pub fn new(endpoints: RegistryConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("burrow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BurrowError::Registry {
                url: endpoints.registry_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { http, endpoints })
    }

    /// Token service URL scoped to pulling `image`.
    #[must_use]
    pub fn token_url(&self, image: &ImageReference) -> String {
        format!(
            "{}?service={}&scope=repository:{}:pull",
            self.endpoints.auth_url, self.endpoints.auth_service, image.repository
        )
    }

    /// Manifest URL for `image`.
    #[must_use]
    pub fn manifest_url(&self, image: &ImageReference) -> String {
        format!(
            "{}/v2/{}/manifests/{}",
            self.endpoints.registry_url.trim_end_matches('/'),
            image.repository,
            image.reference
        )
    }

    /// Blob URL for `digest` within `image`'s repository.
    #[must_use]
    pub fn blob_url(&self, image: &ImageReference, digest: &str) -> String {
        format!(
            "{}/v2/{}/blobs/{digest}",
            self.endpoints.registry_url.trim_end_matches('/'),
            image.repository
        )
    }

    /// Obtains an anonymous pull token.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Registry` on transport failure, a non-success
    /// status, or a response with no token.
    pub fn authenticate(&self, image: &ImageReference) -> Result<String> {
        let url = self.token_url(image);
        tracing::debug!(%url, "requesting registry token");
        let response = checked(&url, self.http.get(&url).send())?;
        let auth: AuthToken = response.json().map_err(|e| registry_err(&url, &e))?;
        auth.bearer()
            .map(str::to_string)
            .ok_or_else(|| BurrowError::Registry {
                url,
                message: "token service returned no token".into(),
            })
    }

    /// Fetches and validates the v2 manifest of `image`.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Registry` for transport/status failures and
    /// `BurrowError::Config` for manifests this client cannot apply.
    pub fn fetch_manifest(&self, image: &ImageReference, token: &str) -> Result<Manifest> {
        let url = self.manifest_url(image);
        tracing::debug!(%url, "fetching manifest");
        let request = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(ACCEPT, MANIFEST_V2_MEDIA_TYPE);
        let body = checked(&url, request.send())?
            .bytes()
            .map_err(|e| registry_err(&url, &e))?;
        if image.is_digest() {
            let expected = Sha256Hash::from_digest(&image.reference)?;
            crate::hash::validate_bytes(&url, &body, &expected)?;
        }
        let manifest: Manifest = serde_json::from_slice(&body)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Fetches the image configuration blob named by `manifest`.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::HashMismatch` if the blob does not match its
    /// digest, or a registry/serialization error.
    pub fn fetch_config(
        &self,
        image: &ImageReference,
        token: &str,
        manifest: &Manifest,
    ) -> Result<ImageConfig> {
        let expected = manifest.config.hash()?;
        let url = self.blob_url(image, &manifest.config.digest);
        tracing::debug!(%url, "fetching image config");
        let body = checked(&url, self.http.get(&url).bearer_auth(token).send())?
            .bytes()
            .map_err(|e| registry_err(&url, &e))?;
        crate::hash::validate_bytes(&url, &body, &expected)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Downloads one blob into `dir`, named by its digest hex.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::HashMismatch` if the file does not match the
    /// descriptor, or a registry/I/O error.
    pub fn download_blob(
        &self,
        image: &ImageReference,
        token: &str,
        blob: &Descriptor,
        dir: &Path,
    ) -> Result<PathBuf> {
        let expected = blob.hash()?;
        let path = dir.join(expected.as_hex());
        let url = self.blob_url(image, &blob.digest);
        tracing::info!(digest = %blob.digest, size = blob.size, "downloading layer");

        let mut response = checked(&url, self.http.get(&url).bearer_auth(token).send())?;
        let mut file = std::fs::File::create(&path).map_err(|e| BurrowError::Io {
            path: path.clone(),
            source: e,
        })?;
        let written = response
            .copy_to(&mut file)
            .map_err(|e| registry_err(&url, &e))?;
        tracing::debug!(digest = %blob.digest, written, "layer downloaded");

        crate::hash::validate_hash(&path, &expected)?;
        Ok(path)
    }

    /// Pulls `image` into `root`: every layer is downloaded into `staging`
    /// and applied in manifest order.
    ///
    /// # Errors
    ///
    /// Returns the first authentication, download, verification, or
    /// extraction error.
    pub fn pull(&self, image: &ImageReference, root: &Path, staging: &Path) -> Result<ImageConfig> {
        tracing::info!(image = %image, root = %root.display(), "pulling image");
        let token = self.authenticate(image)?;
        let manifest = self.fetch_manifest(image, &token)?;
        let config = self.fetch_config(image, &token, &manifest)?;

        let blobs = manifest
            .layers
            .iter()
            .map(|layer| self.download_blob(image, &token, layer, staging))
            .collect::<Result<Vec<_>>>()?;
        let layers = crate::layer::apply_layers(&blobs, root)?;

        tracing::info!(
            image = %image,
            layers = layers.len(),
            architecture = %config.architecture,
            os = %config.os,
            "image pulled"
        );
        Ok(config)
    }
}

fn checked(url: &str, sent: reqwest::Result<Response>) -> Result<Response> {
    let response = sent.map_err(|e| registry_err(url, &e))?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(BurrowError::Registry {
            url: url.to_string(),
            message: format!("unexpected HTTP status {status}"),
        })
    }
}

fn registry_err(url: &str, err: &reqwest::Error) -> BurrowError {
    BurrowError::Registry {
        url: url.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "schemaVersion": 2,
        "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
        "config": {
            "mediaType": "application/vnd.docker.container.image.v1+json",
            "size": 1472,
            "digest": "sha256:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        },
        "layers": [
            {
                "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                "size": 3370706,
                "digest": "sha256:bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"
            },
            {
                "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                "size": 512,
                "digest": "sha256:cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc"
            }
        ]
    }"#;

    const CONFIG: &str = r#"{
        "architecture": "amd64",
        "os": "linux",
        "created": "2024-01-27T00:30:56.150325073Z",
        "config": {
            "Env": ["PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin"],
            "Cmd": ["/bin/sh"],
            "Entrypoint": null,
            "WorkingDir": ""
        },
        "rootfs": {
            "type": "layers",
            "diff_ids": ["sha256:dddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddd"]
        }
    }"#;

    fn client() -> RegistryClient {
        RegistryClient::new(RegistryConfig::default()).expect("client")
    }

    #[test]
    fn urls_follow_registry_v2_layout() {
        let image = ImageReference::parse("alpine:3.19").expect("parse");
        let c = client();
        assert_eq!(
            c.token_url(&image),
            "https://auth.docker.io/token?service=registry.docker.io&scope=repository:library/alpine:pull"
        );
        assert_eq!(
            c.manifest_url(&image),
            "https://index.docker.io/v2/library/alpine/manifests/3.19"
        );
        assert_eq!(
            c.blob_url(&image, "sha256:abc"),
            "https://index.docker.io/v2/library/alpine/blobs/sha256:abc"
        );
    }

    #[test]
    fn manifest_parses_layers_in_order() {
        let manifest: Manifest = serde_json::from_str(MANIFEST).expect("parse");
        manifest.validate().expect("valid");
        assert_eq!(manifest.layers.len(), 2);
        assert!(manifest.layers[0].digest.starts_with("sha256:bbbb"));
        assert!(manifest.layers[1].digest.starts_with("sha256:cccc"));
        assert_eq!(manifest.config.hash().expect("hash").as_hex(), "a".repeat(64));
    }

    #[test]
    fn manifest_with_wrong_schema_is_rejected() {
        let mut manifest: Manifest = serde_json::from_str(MANIFEST).expect("parse");
        manifest.schema_version = 1;
        assert!(manifest.validate().is_err());
        manifest.schema_version = 2;
        manifest.layers.clear();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn image_config_parses_pascal_case_defaults() {
        let config: ImageConfig = serde_json::from_str(CONFIG).expect("parse");
        assert_eq!(config.architecture, "amd64");
        assert_eq!(config.config.cmd, Some(vec!["/bin/sh".to_string()]));
        assert_eq!(config.config.entrypoint, None);
        assert_eq!(config.rootfs.kind, "layers");
        assert_eq!(config.rootfs.diff_ids.len(), 1);
        assert!(config.created.is_some());
    }

    #[test]
    fn auth_token_prefers_token_then_access_token() {
        let auth: AuthToken =
            serde_json::from_str(r#"{"access_token":"xyz","expires_in":300}"#).expect("parse");
        assert_eq!(auth.bearer(), Some("xyz"));
        let empty: AuthToken = serde_json::from_str("{}").expect("parse");
        assert_eq!(empty.bearer(), None);
    }
}
