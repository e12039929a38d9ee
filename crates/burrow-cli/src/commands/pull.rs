//! `burrow pull`: prepare a root from an image without launching it.

use clap::Args;

use super::{SettingsArgs, prepare_image};
use crate::output;

/// Arguments for the `pull` command.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Image to prepare: `tar://ARCHIVE` or a registry reference.
    pub image: String,

    /// Shared settings.
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Print the image configuration record as JSON on stdout.
    #[arg(long)]
    pub print_config: bool,
}

/// Executes the `pull` command.
///
/// # Errors
///
/// Returns an error if the image cannot be resolved, downloaded, verified,
/// or extracted.
pub fn execute(args: &PullArgs) -> anyhow::Result<i32> {
    let config = args.settings.load()?;
    let prepared = prepare_image(&args.image, &config)?;

    match &prepared.config {
        Some(image_config) if args.print_config => {
            println!("{}", serde_json::to_string_pretty(image_config)?);
        }
        Some(image_config) => output::print_image_summary(&args.image, image_config),
        None => {}
    }
    tracing::info!(image = %args.image, root = %prepared.root, "root prepared");
    Ok(0)
}
