//! Filesystem management for container isolation.
//!
//! Provides the `/proc` mounter and the `pivot_root` sequence that swaps
//! the process root onto the prepared container tree.

pub mod mount;
pub mod pivot_root;
