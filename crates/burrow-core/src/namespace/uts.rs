//! UTS namespace isolation.
//!
//! Allows the container to have its own hostname.

use burrow_common::error::{BurrowError, Result};

/// Sets the hostname inside the UTS namespace.
///
/// Call only after the pivot, once the process is known to be in its own
/// UTS namespace; on the host this would rename the machine.
///
/// # Errors
///
/// Returns `BurrowError::Privilege` if `sethostname(2)` fails.
#[cfg(target_os = "linux")]
pub fn set_hostname(hostname: &str) -> Result<()> {
    nix::unistd::sethostname(hostname).map_err(|e| BurrowError::Privilege {
        step: "set hostname",
        source: e.into(),
    })?;
    tracing::info!(hostname, "container hostname set");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: UTS namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn set_hostname(_hostname: &str) -> Result<()> {
    Err(BurrowError::Config {
        message: "Linux required for native container operations".into(),
    })
}
