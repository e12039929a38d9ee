//! Memory resource control.
//!
//! Manages `memory.limit_in_bytes` in the container's memory group.

use std::path::Path;

use burrow_common::error::Result;
use burrow_common::types::LimitValue;

/// Control file holding the hard memory ceiling.
pub const MEMORY_LIMIT_FILE: &str = "memory.limit_in_bytes";

/// Sets the hard memory limit for a group, writing `bytes` verbatim.
///
/// # Errors
///
/// Returns an error if writing to `memory.limit_in_bytes` fails.
pub fn set_memory_limit(group_dir: &Path, bytes: &LimitValue) -> Result<()> {
    let file = group_dir.join(MEMORY_LIMIT_FILE);
    super::write_control_file("write memory limit", &file, bytes.as_bytes())?;
    tracing::debug!(%bytes, "memory limit set");
    Ok(())
}
