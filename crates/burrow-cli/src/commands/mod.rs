//! CLI command definitions and dispatch.

pub mod pull;
pub mod run;

use std::path::PathBuf;

use anyhow::Context;
use burrow_common::config::BurrowConfig;
use burrow_common::types::{ContainerRoot, LimitValue};
use burrow_image::source::{PreparedImage, resolve_source};
use clap::{Args, Parser, Subcommand};

use crate::logging::{LOG_FORMAT_ENV, LogFormat};

/// Burrow: run a shell in an isolated container root.
#[derive(Parser, Debug)]
#[command(name = "burrow", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = LOG_FORMAT_ENV)]
    pub log_format: LogFormat,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prepare a root (optionally from an image) and start an isolated shell.
    Run(run::RunArgs),
    /// Prepare a root from an image without starting anything.
    Pull(pull::PullArgs),
}

/// Settings shared by every command; flags override the config file.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// JSON configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory used as the container root.
    #[arg(long)]
    pub rootfs: Option<PathBuf>,
}

impl SettingsArgs {
    /// Loads the configuration file (or defaults) and applies flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn load(&self) -> anyhow::Result<BurrowConfig> {
        let mut config = match &self.config {
            Some(path) => BurrowConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => BurrowConfig::default(),
        };
        if let Some(rootfs) = &self.rootfs {
            config.rootfs_dir.clone_from(rootfs);
        }
        Ok(config)
    }
}

/// Overrides applied on top of [`SettingsArgs`] for commands that launch.
#[derive(Args, Debug, Default)]
pub struct LimitArgs {
    /// Memory ceiling in bytes, written verbatim to `memory.limit_in_bytes`.
    #[arg(long)]
    pub memory: Option<LimitValue>,

    /// Relative CPU weight, written verbatim to `cpu.shares`.
    #[arg(long)]
    pub cpu_shares: Option<LimitValue>,

    /// Shell started inside the container.
    #[arg(long)]
    pub shell: Option<PathBuf>,
}

impl LimitArgs {
    /// Applies the overrides to `config`.
    pub fn apply(&self, config: &mut BurrowConfig) {
        if let Some(memory) = &self.memory {
            config.limits.memory_bytes.clone_from(memory);
        }
        if let Some(cpu_shares) = &self.cpu_shares {
            config.limits.cpu_shares.clone_from(cpu_shares);
        }
        if let Some(shell) = &self.shell {
            config.shell.clone_from(shell);
        }
    }
}

/// Resolves `image` and materialises it into the configured root.
///
/// # Errors
///
/// Returns an error if the source cannot be resolved or prepared.
pub fn prepare_image(image: &str, config: &BurrowConfig) -> anyhow::Result<PreparedImage> {
    let source = resolve_source(image).with_context(|| format!("invalid image {image}"))?;
    let root = ContainerRoot::new(&config.rootfs_dir)?;
    source
        .prepare(&root, &config.registry)
        .with_context(|| format!("failed to prepare {image} into {root}"))
}

/// Dispatches the parsed CLI command to its handler, returning the process
/// exit code.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Run(args) => run::execute(&args, cli.log_format),
        Command::Pull(args) => pull::execute(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_limits_and_image() {
        let cli = Cli::try_parse_from([
            "burrow",
            "run",
            "alpine",
            "--rootfs",
            "/tmp/x",
            "--memory",
            "524288000",
            "--cpu-shares",
            "512",
        ])
        .expect("parse");
        let Command::Run(args) = cli.command else {
            unreachable!("parsed as run");
        };
        assert_eq!(args.image.as_deref(), Some("alpine"));
        let mut config = args.settings.load().expect("load");
        args.limits.apply(&mut config);
        assert_eq!(config.rootfs_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.limits.memory_bytes.as_str(), "524288000");
        assert_eq!(config.limits.cpu_shares.as_str(), "512");
    }

    #[test]
    fn invalid_limit_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["burrow", "run", "--memory", "lots"]).is_err());
        assert!(Cli::try_parse_from(["burrow", "run", "--cpu-shares", "0"]).is_err());
    }

    #[test]
    fn pull_requires_an_image() {
        assert!(Cli::try_parse_from(["burrow", "pull"]).is_err());
        assert!(Cli::try_parse_from(["burrow", "pull", "debian:bookworm"]).is_ok());
    }

    #[test]
    fn log_format_is_global() {
        let cli = Cli::try_parse_from(["burrow", "pull", "alpine", "--log-format", "json"])
            .expect("parse");
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn config_file_values_are_overridden_by_flags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("burrow.json");
        std::fs::write(
            &path,
            r#"{"rootfs_dir": "/srv/a", "limits": {"memory_bytes": "1024", "cpu_shares": "2"}}"#,
        )
        .expect("write");
        let settings = SettingsArgs {
            config: Some(path),
            rootfs: Some(PathBuf::from("/srv/b")),
        };
        let mut config = settings.load().expect("load");
        LimitArgs {
            cpu_shares: Some("64".parse().expect("limit")),
            ..LimitArgs::default()
        }
        .apply(&mut config);
        assert_eq!(config.rootfs_dir, PathBuf::from("/srv/b"));
        assert_eq!(config.limits.memory_bytes.as_str(), "1024");
        assert_eq!(config.limits.cpu_shares.as_str(), "64");
    }
}
