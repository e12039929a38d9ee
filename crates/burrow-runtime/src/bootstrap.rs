//! Bootstrap configuration shared by the launcher and the staged child.
//!
//! Built once from user input, turned into the staged child's positional
//! arguments by the launcher, and rebuilt from those arguments on the other
//! side of the `exec`.

use std::ffi::OsString;
use std::path::PathBuf;

use burrow_common::config::BurrowConfig;
use burrow_common::constants::DEFAULT_SHELL;
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::{ContainerRoot, ResourceLimits};

/// Everything the staged child needs to set up the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Host path that becomes `/`.
    pub root: ContainerRoot,
    /// Cgroup limits written before the pivot.
    pub limits: ResourceLimits,
    /// Shell started as the session.
    pub shell: PathBuf,
}

impl BootstrapConfig {
    /// Builds a bootstrap configuration from the loaded user configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured root path is empty.
    pub fn from_config(config: &BurrowConfig) -> Result<Self> {
        Ok(Self {
            root: ContainerRoot::new(&config.rootfs_dir)?,
            limits: config.limits.clone(),
            shell: config.shell.clone(),
        })
    }

    /// Positional arguments for the staged child:
    /// `<root> <memory-bytes> <cpu-shares> <shell>`.
    #[must_use]
    pub fn to_stage_args(&self) -> Vec<OsString> {
        vec![
            self.root.as_path().as_os_str().to_owned(),
            self.limits.memory_bytes.as_str().into(),
            self.limits.cpu_shares.as_str().into(),
            self.shell.as_os_str().to_owned(),
        ]
    }

    /// Rebuilds the configuration from the staged child's arguments.
    ///
    /// The first three arguments are required. The shell is optional and
    /// defaults to `/bin/sh`.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Config` for a wrong argument count or invalid
    /// limit values.
    pub fn from_stage_args(args: &[OsString]) -> Result<Self> {
        let (root, memory, cpu, shell) = match args {
            [root, memory, cpu] => (root, memory, cpu, None),
            [root, memory, cpu, shell] => (root, memory, cpu, Some(shell)),
            _ => {
                return Err(BurrowError::Config {
                    message: format!(
                        "staged entry expects <root> <memory-bytes> <cpu-shares> [shell], got {} argument(s)",
                        args.len()
                    ),
                });
            }
        };
        let limits = ResourceLimits::parse(&utf8(memory, "memory limit")?, &utf8(cpu, "cpu shares")?)?;
        Ok(Self {
            root: ContainerRoot::new(root)?,
            limits,
            shell: shell.map_or_else(|| PathBuf::from(DEFAULT_SHELL), PathBuf::from),
        })
    }
}

fn utf8(arg: &OsString, what: &str) -> Result<String> {
    arg.to_str()
        .map(str::to_string)
        .ok_or_else(|| BurrowError::Config {
            message: format!("{what} is not valid UTF-8: {}", arg.to_string_lossy()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn stage_args_carry_exact_limit_strings() {
        let config = BootstrapConfig {
            root: ContainerRoot::new("/tmp/x").expect("root"),
            limits: ResourceLimits::parse("524288000", "512").expect("limits"),
            shell: PathBuf::from("/bin/sh"),
        };
        assert_eq!(
            config.to_stage_args(),
            os(&["/tmp/x", "524288000", "512", "/bin/sh"])
        );
    }

    #[test]
    fn stage_args_rebuild_the_same_config() {
        let config = BootstrapConfig {
            root: ContainerRoot::new("/srv/rootfs").expect("root"),
            limits: ResourceLimits::parse("1048576", "256").expect("limits"),
            shell: PathBuf::from("/bin/bash"),
        };
        let rebuilt = BootstrapConfig::from_stage_args(&config.to_stage_args()).expect("parse");
        assert_eq!(rebuilt, config);
    }

    #[test]
    fn shell_argument_is_optional() {
        let config =
            BootstrapConfig::from_stage_args(&os(&["/tmp/x", "524288000", "512"])).expect("parse");
        assert_eq!(config.shell, PathBuf::from("/bin/sh"));
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        assert!(BootstrapConfig::from_stage_args(&os(&["/tmp/x", "1"])).is_err());
        assert!(BootstrapConfig::from_stage_args(&os(&[])).is_err());
    }

    #[test]
    fn invalid_limits_are_rejected() {
        assert!(BootstrapConfig::from_stage_args(&os(&["/tmp/x", "lots", "512"])).is_err());
        assert!(BootstrapConfig::from_stage_args(&os(&["/tmp/x", "1024", ""])).is_err());
    }

    #[test]
    fn from_config_uses_configured_values() {
        let config = BootstrapConfig::from_config(&BurrowConfig::default()).expect("config");
        assert_eq!(config.root.as_path(), std::path::Path::new("/tmp/burrow/rootfs"));
        assert_eq!(config.limits.memory_bytes.as_str(), "524288000");
        assert_eq!(config.limits.cpu_shares.as_str(), "512");
    }
}
