//! `burrow run`: prepare the root and start the isolated session.

use anyhow::Context;
use burrow_common::types::ContainerRoot;
use burrow_runtime::bootstrap::BootstrapConfig;
use burrow_runtime::launcher;
use clap::Args;

use super::{LimitArgs, SettingsArgs, prepare_image};
use crate::logging::{LOG_FORMAT_ENV, LogFormat};
use crate::output;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image to prepare the root from first: `file://DIR`, `tar://ARCHIVE`,
    /// or a registry reference such as `alpine:3.19`. Without it the root
    /// is used as it is.
    pub image: Option<String>,

    /// Shared settings.
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Resource and shell overrides.
    #[command(flatten)]
    pub limits: LimitArgs,
}

/// Executes the `run` command and returns the session's exit code.
///
/// The staged child is told to log in `log_format` as well.
///
/// # Errors
///
/// Returns an error if the root cannot be prepared or the session cannot
/// be launched.
pub fn execute(args: &RunArgs, log_format: LogFormat) -> anyhow::Result<i32> {
    let mut config = args.settings.load()?;
    args.limits.apply(&mut config);

    let root = match &args.image {
        Some(image) => {
            let prepared = prepare_image(image, &config)?;
            if let Some(image_config) = &prepared.config {
                output::print_image_summary(image, image_config);
            }
            prepared.root
        }
        None => ContainerRoot::new(&config.rootfs_dir)?,
    };

    let bootstrap = BootstrapConfig {
        root,
        limits: config.limits,
        shell: config.shell,
    };
    output::print_launch_summary(&bootstrap);

    launcher::launch(&bootstrap, &[(LOG_FORMAT_ENV, log_format.env_value())])
        .with_context(|| format!("failed to launch isolated session in {}", bootstrap.root))
}
