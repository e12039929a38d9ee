//! Domain primitive types used across the Burrow workspace.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BurrowError, Result};

/// Absolute host path of the prepared tree that becomes `/` in the container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct ContainerRoot(PathBuf);

impl ContainerRoot {
    /// Creates a container root, resolving relative paths against the
    /// current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty or cannot be made absolute.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(BurrowError::Config {
                message: "container root path is empty".into(),
            });
        }
        let absolute = std::path::absolute(path).map_err(|e| BurrowError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self(absolute))
    }

    /// Returns the root as a host path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Joins a container-relative path (with or without a leading `/`)
    /// onto the host path of the root.
    #[must_use]
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        let relative = relative.as_ref();
        let relative = relative.strip_prefix("/").unwrap_or(relative);
        self.0.join(relative)
    }

    /// Ensures the root exists as a directory, creating it owner-only if
    /// it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the path
    /// exists but is not a directory.
    pub fn ensure_exists(&self) -> Result<()> {
        use std::os::unix::fs::DirBuilderExt;

        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&self.0)
            .map_err(|e| BurrowError::Setup {
                step: "create container root",
                path: self.0.clone(),
                source: e,
            })?;
        if !self.0.is_dir() {
            return Err(BurrowError::Config {
                message: format!("container root {} is not a directory", self.0.display()),
            });
        }
        Ok(())
    }
}

impl TryFrom<PathBuf> for ContainerRoot {
    type Error = BurrowError;

    fn try_from(value: PathBuf) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ContainerRoot> for PathBuf {
    fn from(value: ContainerRoot) -> Self {
        value.0
    }
}

impl fmt::Display for ContainerRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A positive integer kept in the exact textual form it is written to a
/// kernel control file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LimitValue(String);

impl LimitValue {
    /// Returns the value exactly as it will be written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the value as raw bytes for a control-file write.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for LimitValue {
    type Err = BurrowError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BurrowError::Config {
                message: format!("limit must be a positive decimal integer: {s:?}"),
            });
        }
        if s.bytes().all(|b| b == b'0') {
            return Err(BurrowError::Config {
                message: format!("limit must be greater than zero: {s:?}"),
            });
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for LimitValue {
    type Error = BurrowError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LimitValue> for String {
    fn from(value: LimitValue) -> Self {
        value.0
    }
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource limits for a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Memory ceiling in bytes.
    pub memory_bytes: LimitValue,
    /// CPU shares (relative weight).
    pub cpu_shares: LimitValue,
}

impl ResourceLimits {
    /// Parses both limits from their textual form.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is not a positive integer.
    pub fn parse(memory_bytes: &str, cpu_shares: &str) -> Result<Self> {
        Ok(Self {
            memory_bytes: memory_bytes.parse()?,
            cpu_shares: cpu_shares.parse()?,
        })
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_bytes: LimitValue(crate::constants::DEFAULT_MEMORY_LIMIT.into()),
            cpu_shares: LimitValue(crate::constants::DEFAULT_CPU_SHARES.into()),
        }
    }
}

/// SHA-256 hash digest used for content verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Creates a hash from a hex-encoded string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid 64-character hex string.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self> {
        let hex = hex.into();
        if hex.len() != crate::constants::SHA256_HEX_LENGTH
            || !hex.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(BurrowError::Config {
                message: format!("invalid SHA-256 hex string: {hex}"),
            });
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Parses a registry digest of the form `sha256:<hex>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is not `sha256` or the hex is invalid.
    pub fn from_digest(digest: &str) -> Result<Self> {
        let hex = digest
            .strip_prefix("sha256:")
            .ok_or_else(|| BurrowError::Config {
                message: format!("unsupported digest algorithm: {digest}"),
            })?;
        Self::from_hex(hex)
    }

    /// Returns the hex-encoded hash string.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Sha256Hash {
    type Error = BurrowError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(value)
    }
}

impl From<Sha256Hash> for String {
    fn from(value: Sha256Hash) -> Self {
        value.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}
