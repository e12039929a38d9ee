//! CPU resource control.
//!
//! Manages `cpu.shares`, the relative weight this group receives under
//! contention.

use std::path::Path;

use burrow_common::error::Result;
use burrow_common::types::LimitValue;

/// Control file holding the relative CPU weight.
pub const CPU_SHARES_FILE: &str = "cpu.shares";

/// Sets the CPU share weight for a group, writing `shares` verbatim.
///
/// # Errors
///
/// Returns an error if writing to `cpu.shares` fails.
pub fn set_cpu_shares(group_dir: &Path, shares: &LimitValue) -> Result<()> {
    let file = group_dir.join(CPU_SHARES_FILE);
    super::write_control_file("write cpu shares", &file, shares.as_bytes())?;
    tracing::debug!(%shares, "CPU shares set");
    Ok(())
}
