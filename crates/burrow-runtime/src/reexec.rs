//! Self re-execution routing.
//!
//! The launcher starts the staged child by executing this same binary with
//! a marker in `argv[0]`. Binaries consult [`lookup`] before normal argument
//! parsing; a match means the process is a staged child and must run that
//! stage instead of its usual entry point.

use std::ffi::{OsStr, OsString};
use std::path::Path;

use burrow_common::constants::INIT_STAGE_MARKER;
use burrow_common::error::Result;

/// Entry function of a stage, given the arguments after `argv[0]`.
pub type StageFn = fn(&[OsString]) -> Result<i32>;

/// One routing table entry.
#[derive(Debug, Clone, Copy)]
pub struct Stage {
    /// Value of `argv[0]` (file name only) that selects this stage.
    pub marker: &'static str,
    /// Stage entry function.
    pub run: StageFn,
}

/// All stages this binary can be re-executed into.
pub static STAGES: &[Stage] = &[Stage {
    marker: INIT_STAGE_MARKER,
    run: crate::init::run_stage,
}];

/// A matched stage together with its arguments.
#[derive(Debug)]
pub struct StageInvocation {
    stage: &'static Stage,
    args: Vec<OsString>,
}

impl StageInvocation {
    /// Marker that selected the stage.
    #[must_use]
    pub const fn marker(&self) -> &'static str {
        self.stage.marker
    }

    /// Runs the stage and returns the process exit code.
    ///
    /// # Errors
    ///
    /// Propagates the stage's error.
    pub fn run(self) -> Result<i32> {
        tracing::debug!(stage = self.stage.marker, args = ?self.args, "entering re-exec stage");
        (self.stage.run)(&self.args)
    }
}

/// Looks up a stage for the given process arguments.
///
/// Returns `None` for ordinary invocations.
pub fn lookup<I>(args: I) -> Option<StageInvocation>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let argv0 = args.next()?;
    let stage = find_stage(&argv0)?;
    Some(StageInvocation {
        stage,
        args: args.collect(),
    })
}

fn find_stage(argv0: &OsStr) -> Option<&'static Stage> {
    let name = Path::new(argv0).file_name()?;
    STAGES.iter().find(|stage| name == OsStr::new(stage.marker))
}
