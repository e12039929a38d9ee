//! Formatted output helpers for CLI commands.
//!
//! Summaries go to stderr; stdout belongs to the session.

use burrow_image::registry::ImageConfig;
use burrow_runtime::bootstrap::BootstrapConfig;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Formats a byte count into a human-readable string (e.g., "128 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Renders a memory limit; values too large for `u64` are shown verbatim.
#[must_use]
pub fn format_memory_limit(raw: &str) -> String {
    raw.parse::<u64>()
        .map_or_else(|_| format!("{raw} B"), format_bytes)
}

/// Prints the header shown before the session takes over the terminal.
pub fn print_launch_summary(bootstrap: &BootstrapConfig) {
    eprintln!(
        "{BOLD}burrow{RESET} {DIM}v{}{RESET} root {} {DIM}(memory {}, cpu shares {}, shell {}){RESET}",
        env!("CARGO_PKG_VERSION"),
        bootstrap.root,
        format_memory_limit(bootstrap.limits.memory_bytes.as_str()),
        bootstrap.limits.cpu_shares,
        bootstrap.shell.display(),
    );
}

/// Prints what the image says about itself. The command is informational
/// only; the session always starts the configured shell.
pub fn print_image_summary(image: &str, config: &ImageConfig) {
    let command = config
        .config
        .entrypoint
        .iter()
        .chain(config.config.cmd.iter())
        .flatten()
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    eprintln!(
        "{BOLD}{image}{RESET} {DIM}{}/{}, {} layer(s), image command: {}{RESET}",
        config.os,
        config.architecture,
        config.rootfs.diff_ids.len(),
        if command.is_empty() { "<none>" } else { &command },
    );
}
