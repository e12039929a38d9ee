//! # burrow-image
//!
//! Produces the container root the bootstrap operates on.
//!
//! Handles:
//! - **References**: `name[:tag]` / `ns/name[@digest]` parsing.
//! - **Registry**: token auth, manifest and config fetch, blob download.
//! - **Hashing**: SHA-256 verification of every downloaded blob.
//! - **Layers**: ordered extraction with whiteout handling.
//! - **Sources**: `file://`, `tar://`, and registry references.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod hash;
pub mod layer;
pub mod reference;
pub mod registry;
pub mod source;
