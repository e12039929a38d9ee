//! # burrow-core
//!
//! Low-level Linux isolation primitives for the Burrow bootstrap.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: the set of namespaces unshared at spawn and the
//!   UID/GID maps that make namespace root the invoking host user.
//! - **Cgroups**: memory and CPU limit files under the container root.
//! - **Filesystem**: `/proc` mounting and the `pivot_root` sequence.
//!
//! Every function returns a [`burrow_common::error::BurrowError`] instead of
//! terminating, so each stage can be exercised in isolation.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod filesystem;
pub mod namespace;
