//! Image reference parsing.
//!
//! Accepts `name`, `name:tag`, `ns/name:tag`, and `ns/name@sha256:<hex>`.
//! Single-component names live in the `library` namespace.

use std::fmt;
use std::str::FromStr;

use burrow_common::constants::{DEFAULT_IMAGE_NAMESPACE, DEFAULT_IMAGE_TAG};
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::Sha256Hash;

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Repository path including namespace, e.g. `library/alpine`.
    pub repository: String,
    /// Tag or `sha256:` digest used to address the manifest.
    pub reference: String,
}

impl ImageReference {
    /// Parses a user-supplied image reference.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Config` for empty names, empty tags, invalid
    /// characters, or malformed digests.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (name, reference) = if let Some((name, digest)) = input.split_once('@') {
            let _ = Sha256Hash::from_digest(digest)?;
            (name, digest.to_string())
        } else {
            match input.rsplit_once(':') {
                // A colon before the last slash belongs to a host, not a tag.
                Some((name, tag)) if !tag.contains('/') => {
                    if tag.is_empty() {
                        return Err(invalid(input, "empty tag"));
                    }
                    (name, tag.to_string())
                }
                _ => (input, DEFAULT_IMAGE_TAG.to_string()),
            }
        };

        if name.is_empty() || name.split('/').any(str::is_empty) {
            return Err(invalid(input, "empty name component"));
        }
        if !name.chars().all(is_name_char) {
            return Err(invalid(input, "invalid character in name"));
        }

        let repository = if name.contains('/') {
            name.to_string()
        } else {
            format!("{DEFAULT_IMAGE_NAMESPACE}/{name}")
        };
        Ok(Self {
            repository,
            reference,
        })
    }

    /// Returns `true` when the reference pins a digest rather than a tag.
    #[must_use]
    pub fn is_digest(&self) -> bool {
        self.reference.starts_with("sha256:")
    }
}

impl FromStr for ImageReference {
    type Err = BurrowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_digest() {
            write!(f, "{}@{}", self.repository, self.reference)
        } else {
            write!(f, "{}:{}", self.repository, self.reference)
        }
    }
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '/' | '.' | '_' | '-')
}

fn invalid(input: &str, reason: &str) -> BurrowError {
    BurrowError::Config {
        message: format!("invalid image reference '{input}': {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_gets_library_namespace_and_latest() {
        let r = ImageReference::parse("alpine").expect("parse");
        assert_eq!(r.repository, "library/alpine");
        assert_eq!(r.reference, "latest");
    }

    #[test]
    fn explicit_tag_is_kept() {
        let r = ImageReference::parse("debian:bookworm").expect("parse");
        assert_eq!(r.repository, "library/debian");
        assert_eq!(r.reference, "bookworm");
        assert_eq!(r.to_string(), "library/debian:bookworm");
    }

    #[test]
    fn namespaced_name_is_not_prefixed() {
        let r: ImageReference = "grafana/loki:2.9".parse().expect("parse");
        assert_eq!(r.repository, "grafana/loki");
        assert_eq!(r.reference, "2.9");
    }

    #[test]
    fn digest_reference_is_validated() {
        let digest = format!("sha256:{}", "ab".repeat(32));
        let r = ImageReference::parse(&format!("busybox@{digest}")).expect("parse");
        assert!(r.is_digest());
        assert_eq!(r.reference, digest);
        assert!(ImageReference::parse("busybox@sha256:xyz").is_err());
    }

    #[test]
    fn malformed_references_are_rejected() {
        for input in ["", "alpine:", "/alpine", "lib//alpine", "Alpine", "al pine"] {
            assert!(ImageReference::parse(input).is_err(), "{input:?} accepted");
        }
    }
}
