//! Mount utilities for container filesystem setup.
//!
//! Mounts a fresh `proc` under the container root. The mount is made on
//! the pre-pivot path and becomes `/proc` once the root transition moves
//! the tree to `/`.

use std::os::unix::fs::DirBuilderExt;
use std::path::PathBuf;

use burrow_common::error::{BurrowError, Result};
use burrow_common::types::ContainerRoot;

/// Creates `<root>/proc` (mode `0755`) if it is missing.
///
/// # Errors
///
/// Returns `BurrowError::Setup` if the directory cannot be created.
pub fn prepare_proc_dir(root: &ContainerRoot) -> Result<PathBuf> {
    let target = root.join("proc");
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(&target)
        .map_err(|e| BurrowError::Setup {
            step: "create proc directory",
            path: target.clone(),
            source: e,
        })?;
    Ok(target)
}

/// Mounts a `proc` filesystem at `<root>/proc`.
///
/// Must run inside the new PID namespace so the mount reflects the
/// container's process tree.
///
/// # Errors
///
/// Returns `BurrowError::Setup` if the mount point cannot be created and
/// `BurrowError::Mount` if the `mount(2)` syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_proc(root: &ContainerRoot) -> Result<PathBuf> {
    use nix::mount::{MsFlags, mount};

    let target = prepare_proc_dir(root)?;
    mount(
        Some("proc"),
        &target,
        Some("proc"),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|e| BurrowError::Mount {
        step: "mount proc",
        path: target.clone(),
        source: e.into(),
    })?;
    tracing::info!(target = %target.display(), "proc mounted");
    Ok(target)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: mounting `proc` requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_proc(_root: &ContainerRoot) -> Result<PathBuf> {
    Err(BurrowError::Config {
        message: "Linux required for native container operations".into(),
    })
}
