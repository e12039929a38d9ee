//! # burrow: isolated shell sessions
//!
//! Prepares a container root, then drops the user into a shell that runs
//! in its own namespaces with cgroup limits and a private root.
//!
//! The same binary is the staged child: the launcher re-executes it with
//! a marker in `argv[0]`, which is routed before any argument parsing.

mod commands;
mod logging;
mod output;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use crate::commands::Cli;
use crate::logging::LogFormat;

fn main() -> ExitCode {
    let outcome = if let Some(stage) = burrow_runtime::reexec::lookup(std::env::args_os()) {
        logging::init(LogFormat::from_env());
        let marker = stage.marker();
        stage
            .run()
            .with_context(|| format!("{marker} stage failed"))
    } else {
        let cli = Cli::parse();
        logging::init(cli.log_format);
        commands::execute(cli)
    };

    match outcome {
        Ok(code) => exit_code(code),
        Err(err) => {
            tracing::error!(error = format!("{err:#}"), "burrow failed");
            ExitCode::FAILURE
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
