//! Cgroup resource management.
//!
//! Creates one sub-group per controller under the container root's
//! `sys/fs/cgroup` tree and writes the limits verbatim into the v1
//! control files. Paths are resolved against the pre-pivot root, so the
//! limiter must run before the root transition.

pub mod cpu;
pub mod memory;

use std::fmt;
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use burrow_common::constants::{CGROUP_GROUP_NAME, CGROUP_V1_PATH};
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::{ContainerRoot, ResourceLimits};

/// Process-membership file present in every controller's group.
const PROCS_FILE: &str = "cgroup.procs";

/// Resource controllers configured for a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Controller {
    /// Memory controller (`memory.limit_in_bytes`).
    Memory,
    /// CPU controller (`cpu.shares`).
    Cpu,
}

impl Controller {
    /// Controllers in the order they are set up.
    pub const ALL: [Self; 2] = [Self::Memory, Self::Cpu];

    /// Directory name of the controller hierarchy.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Cpu => "cpu",
        }
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle to the per-controller groups of one container.
#[derive(Debug, Clone)]
pub struct ResourceLimiter {
    memory_dir: PathBuf,
    cpu_dir: PathBuf,
}

impl ResourceLimiter {
    /// Resolves the group directories for the given container root.
    ///
    /// Nothing is created until [`ResourceLimiter::create`] is called.
    #[must_use]
    pub fn for_root(root: &ContainerRoot) -> Self {
        Self {
            memory_dir: group_dir(root, Controller::Memory),
            cpu_dir: group_dir(root, Controller::Cpu),
        }
    }

    /// Returns the group directory of a controller.
    #[must_use]
    pub fn group_dir(&self, controller: Controller) -> &Path {
        match controller {
            Controller::Memory => &self.memory_dir,
            Controller::Cpu => &self.cpu_dir,
        }
    }

    /// Creates the group directories with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Setup` if a directory cannot be created.
    pub fn create(&self) -> Result<()> {
        for controller in Controller::ALL {
            let dir = self.group_dir(controller);
            std::fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(dir)
                .map_err(|e| BurrowError::Setup {
                    step: "create cgroup directory",
                    path: dir.to_path_buf(),
                    source: e,
                })?;
            tracing::debug!(%controller, path = %dir.display(), "cgroup directory created");
        }
        Ok(())
    }

    /// Writes the memory ceiling and CPU share weight.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Setup` if a control file cannot be written.
    pub fn apply_limits(&self, limits: &ResourceLimits) -> Result<()> {
        memory::set_memory_limit(&self.memory_dir, &limits.memory_bytes)?;
        cpu::set_cpu_shares(&self.cpu_dir, &limits.cpu_shares)?;
        Ok(())
    }

    /// Registers a process in every controller's group.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Setup` if a `cgroup.procs` file cannot be written.
    pub fn add_process(&self, pid: u32) -> Result<()> {
        for controller in Controller::ALL {
            let procs_path = self.group_dir(controller).join(PROCS_FILE);
            write_control_file("register process", &procs_path, pid.to_string().as_bytes())?;
            tracing::debug!(%controller, pid, "added process to cgroup");
        }
        Ok(())
    }
}

/// Runs the full limiter sequence: create groups, write limits, register `pid`.
///
/// # Errors
///
/// Returns `BurrowError::Setup` on the first directory or file failure.
pub fn limit_resources(
    root: &ContainerRoot,
    limits: &ResourceLimits,
    pid: u32,
) -> Result<ResourceLimiter> {
    let limiter = ResourceLimiter::for_root(root);
    limiter.create()?;
    limiter.apply_limits(limits)?;
    limiter.add_process(pid)?;
    tracing::info!(
        memory = %limits.memory_bytes,
        cpu_shares = %limits.cpu_shares,
        pid,
        "resource limits applied"
    );
    Ok(limiter)
}

fn group_dir(root: &ContainerRoot, controller: Controller) -> PathBuf {
    root.join(CGROUP_V1_PATH)
        .join(controller.name())
        .join(CGROUP_GROUP_NAME)
}

/// Writes `contents` to a control file, creating it world-writable.
pub(crate) fn write_control_file(step: &'static str, path: &Path, contents: &[u8]) -> Result<()> {
    let setup_err = |e| BurrowError::Setup {
        step,
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o666)
        .open(path)
        .map_err(setup_err)?;
    file.write_all(contents).map_err(setup_err)?;
    Ok(())
}
