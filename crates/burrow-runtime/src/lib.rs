//! Isolation bootstrap for the Burrow runtime.
//!
//! The launcher spawns a child in fresh namespaces that re-executes this
//! binary through the [`reexec`] table; the staged entry point then limits
//! resources, mounts `/proc`, pivots into the container root, and hands the
//! terminal to a shell.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod bootstrap;
pub mod init;
pub mod launcher;
pub mod reexec;
pub mod session;
