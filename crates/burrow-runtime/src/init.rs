//! Staged entry point.
//!
//! Runs as PID 1 of the new PID namespace, already inside the new user,
//! mount, UTS, IPC, and network namespaces. The order is fixed: cgroup
//! limits and `/proc` are prepared on the host path, then the root is
//! swapped, then the hostname is set and the session started.

use std::ffi::OsString;

use burrow_common::constants::CONTAINER_HOSTNAME;
use burrow_common::error::Result;
use burrow_core::cgroup::limit_resources;
use burrow_core::filesystem::mount::mount_proc;
use burrow_core::filesystem::pivot_root::pivot_root;
use burrow_core::namespace::uts::set_hostname;

use crate::bootstrap::BootstrapConfig;
use crate::session::run_session;

/// Stage entry registered in the re-exec table.
///
/// # Errors
///
/// Returns the first fatal setup error.
pub fn run_stage(args: &[OsString]) -> Result<i32> {
    let config = BootstrapConfig::from_stage_args(args)?;
    run(&config)
}

/// Prepares the container and runs the session, returning its exit code.
///
/// # Errors
///
/// Returns the first fatal setup, mount, privilege, or session error.
pub fn run(config: &BootstrapConfig) -> Result<i32> {
    prepare(config)?;
    run_session(&config.shell)
}

/// Applies limits, mounts `/proc`, swaps the root, and sets the hostname.
///
/// Cleanup failures after a successful pivot are logged and ignored; every
/// other failure aborts.
///
/// # Errors
///
/// Returns the first fatal setup, mount, or privilege error.
pub fn prepare(config: &BootstrapConfig) -> Result<()> {
    let pid = std::process::id();
    tracing::info!(
        root = %config.root,
        memory = %config.limits.memory_bytes,
        cpu_shares = %config.limits.cpu_shares,
        pid,
        "staged entry starting"
    );

    config.root.ensure_exists()?;
    let limiter = limit_resources(&config.root, &config.limits, pid)?;
    tracing::debug!(?limiter, "resource limits applied");

    let proc_dir = mount_proc(&config.root)?;
    tracing::debug!(path = %proc_dir.display(), "proc mounted");

    match pivot_root(&config.root) {
        Ok(()) => {}
        Err(err) if !err.is_fatal() => {
            tracing::warn!(error = %err, "old root cleanup failed, continuing");
        }
        Err(err) => return Err(err),
    }

    set_hostname(CONTAINER_HOSTNAME)
}
