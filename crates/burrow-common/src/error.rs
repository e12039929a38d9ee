//! Unified error types for the Burrow workspace.
//!
//! The bootstrap taxonomy (`Setup`, `Mount`, `Cleanup`, `Privilege`,
//! `Session`) mirrors the stage that failed so the top-level handler can
//! name it in its diagnostic. Only `Cleanup` is recoverable.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum BurrowError {
    /// An I/O operation failed outside of a bootstrap stage.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Creating a directory or writing a control file failed while
    /// limiting resources or preparing `/proc`.
    #[error("setup failed ({step}) at {path}: {source}")]
    Setup {
        /// Bootstrap step that failed.
        step: &'static str,
        /// Path that could not be created or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A mount, bind, pivot, or chdir failed during the irreversible part
    /// of the root transition.
    #[error("mount failed ({step}) at {path}: {source}")]
    Mount {
        /// Bootstrap step that failed.
        step: &'static str,
        /// Mount target or path involved.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Unmounting or removing the old-root remnant failed after a
    /// successful pivot.
    #[error("cleanup failed ({step}) at {path}: {source}")]
    Cleanup {
        /// Cleanup step that failed.
        step: &'static str,
        /// Path that could not be detached or removed.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The kernel rejected a namespace, identity mapping, or hostname change.
    #[error("privilege error ({step}): {source}")]
    Privilege {
        /// Bootstrap step that failed.
        step: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The session process could not be started.
    #[error("session failed to start {program}: {source}")]
    Session {
        /// Program that was being launched.
        program: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A hash validation failed.
    #[error("hash mismatch for {resource}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Resource that failed validation.
        resource: String,
        /// Expected hash value.
        expected: String,
        /// Actual computed hash value.
        actual: String,
    },

    /// A registry request failed or returned an unexpected response.
    #[error("registry error for {url}: {message}")]
    Registry {
        /// Request URL.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl BurrowError {
    /// Returns whether this error must abort the bootstrap.
    ///
    /// Cleanup failures happen after the isolation boundary is in place,
    /// so they leak a mount point at worst and are only reported.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Cleanup { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BurrowError>;
