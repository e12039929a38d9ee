//! User namespace identity mapping.
//!
//! Maps namespace UIDs/GIDs onto host UIDs/GIDs so namespace root is the
//! unprivileged invoking user on the host.

use std::fmt;
use std::path::{Path, PathBuf};

use burrow_common::error::{BurrowError, Result};

use super::NamespaceSpec;

/// One `(inside, outside, count)` line of a `uid_map`/`gid_map` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapping {
    /// First ID inside the namespace.
    pub inside: u32,
    /// First ID on the host.
    pub outside: u32,
    /// Length of the range.
    pub count: u32,
}

impl IdMapping {
    /// Maps namespace ID 0 onto a single host ID.
    #[must_use]
    pub const fn root_to(host_id: u32) -> Self {
        Self {
            inside: 0,
            outside: host_id,
            count: 1,
        }
    }
}

impl fmt::Display for IdMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.inside, self.outside, self.count)
    }
}

/// Renders mapping entries in the kernel's map-file format.
#[must_use]
pub fn format_id_map(mappings: &[IdMapping]) -> String {
    mappings
        .iter()
        .map(|m| format!("{m}\n"))
        .collect::<String>()
}

/// Writes the UID/GID maps for process `pid` (0 means the caller).
///
/// `setgroups` is denied first, which the kernel requires before an
/// unprivileged process may write `gid_map`.
///
/// # Errors
///
/// Returns `BurrowError::Privilege` if the kernel rejects any write.
pub fn write_id_maps(pid: u32, spec: &NamespaceSpec) -> Result<()> {
    let proc_dir = if pid == 0 {
        PathBuf::from("/proc/self")
    } else {
        PathBuf::from(format!("/proc/{pid}"))
    };
    write_id_maps_in(&proc_dir, spec)?;
    tracing::debug!(
        pid,
        uid_map = %format_id_map(&spec.uid_mappings).trim_end(),
        gid_map = %format_id_map(&spec.gid_mappings).trim_end(),
        "wrote UID/GID map"
    );
    Ok(())
}

/// Writes `setgroups`, `uid_map`, and `gid_map` under a `/proc/<pid>` style
/// directory.
///
/// # Errors
///
/// Returns `BurrowError::Privilege` if any write fails.
pub fn write_id_maps_in(proc_dir: &Path, spec: &NamespaceSpec) -> Result<()> {
    let setgroups_path = proc_dir.join("setgroups");
    if setgroups_path.exists() {
        write_map_file("deny setgroups", &setgroups_path, "deny")?;
    }
    if !spec.uid_mappings.is_empty() {
        write_map_file(
            "write uid_map",
            &proc_dir.join("uid_map"),
            &format_id_map(&spec.uid_mappings),
        )?;
    }
    if !spec.gid_mappings.is_empty() {
        write_map_file(
            "write gid_map",
            &proc_dir.join("gid_map"),
            &format_id_map(&spec.gid_mappings),
        )?;
    }
    Ok(())
}

// Map files accept exactly one write, so the content goes out in a single call.
fn write_map_file(step: &'static str, path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| BurrowError::Privilege { step, source: e })
}
