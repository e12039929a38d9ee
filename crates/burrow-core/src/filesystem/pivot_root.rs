//! Root filesystem switching via `pivot_root(2)`.
//!
//! More secure than `chroot` because the old root is detached from the
//! mount namespace instead of merely hidden from the process's view of `/`.
//!
//! The sequence is fixed:
//!
//! 1. recursively bind-mount the new root onto itself,
//! 2. create the hidden `.pivot_root` receptacle inside it,
//! 3. `pivot_root(new_root, new_root/.pivot_root)`,
//! 4. `chdir("/")`,
//! 5. lazily detach `/.pivot_root`,
//! 6. remove `/.pivot_root`.
//!
//! Failures in steps 1-4 are fatal [`BurrowError::Mount`] errors. Failures
//! in steps 5-6 are reported as [`BurrowError::Cleanup`], which callers log
//! and continue past.

use std::path::{Path, PathBuf};

use burrow_common::constants::PIVOT_OLD_ROOT_DIR;
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::ContainerRoot;

/// Paths involved in a single root transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotState {
    /// Host path of the new root (pre-pivot view).
    pub new_root: PathBuf,
    /// Host path of the old-root receptacle (pre-pivot view).
    pub put_old: PathBuf,
    /// Path of the receptacle as seen after the pivot.
    pub put_old_after: PathBuf,
}

impl PivotState {
    /// Resolves the transition paths for the given root.
    #[must_use]
    pub fn for_root(root: &ContainerRoot) -> Self {
        Self {
            new_root: root.as_path().to_path_buf(),
            put_old: root.join(PIVOT_OLD_ROOT_DIR),
            put_old_after: Path::new("/").join(PIVOT_OLD_ROOT_DIR),
        }
    }
}

/// Switches the process root to `root` using `pivot_root(2)`.
///
/// # Errors
///
/// Returns `BurrowError::Mount` if any of the bind, mkdir, pivot, or chdir
/// steps fail, and `BurrowError::Cleanup` if the old root cannot be
/// detached or removed afterward.
#[cfg(target_os = "linux")]
pub fn pivot_root(root: &ContainerRoot) -> Result<()> {
    let state = PivotState::for_root(root);
    tracing::info!(new_root = %state.new_root.display(), "performing pivot_root");

    bind_onto_itself(&state.new_root)?;
    create_put_old(&state)?;
    swap_roots(&state)?;

    nix::unistd::chdir("/").map_err(|e| BurrowError::Mount {
        step: "chdir to new root",
        path: PathBuf::from("/"),
        source: e.into(),
    })?;

    let detached = detach_old_root(&state.put_old_after);
    // remove_dir only: never recurse into an old root that is still attached.
    let removed = std::fs::remove_dir(&state.put_old_after).map_err(|e| BurrowError::Cleanup {
        step: "remove old root directory",
        path: state.put_old_after.clone(),
        source: e,
    });
    detached.and(removed)?;

    tracing::info!("root transition complete");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: `pivot_root(2)` requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn pivot_root(_root: &ContainerRoot) -> Result<()> {
    Err(BurrowError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Step 1: `pivot_root(2)` rejects a new root that is not a mount point.
#[cfg(target_os = "linux")]
fn bind_onto_itself(new_root: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    mount(
        Some(new_root),
        new_root,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(|e| BurrowError::Mount {
        step: "bind-mount new root",
        path: new_root.to_path_buf(),
        source: e.into(),
    })?;
    tracing::debug!(path = %new_root.display(), "new root bind-mounted onto itself");
    Ok(())
}

/// Step 2. On failure the bind mount from step 1 is detached again.
#[cfg(target_os = "linux")]
fn create_put_old(state: &PivotState) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(&state.put_old)
        .map_err(|e| {
            undo_bind(&state.new_root);
            BurrowError::Mount {
                step: "create old root directory",
                path: state.put_old.clone(),
                source: e,
            }
        })
}

/// Step 3. On failure the receptacle and the bind mount are rolled back so
/// no transient mount point is left in the container tree.
#[cfg(target_os = "linux")]
fn swap_roots(state: &PivotState) -> Result<()> {
    nix::unistd::pivot_root(&state.new_root, &state.put_old).map_err(|e| {
        if let Err(err) = std::fs::remove_dir(&state.put_old) {
            tracing::warn!(path = %state.put_old.display(), %err, "failed to remove old root directory");
        }
        undo_bind(&state.new_root);
        BurrowError::Mount {
            step: "pivot_root",
            path: state.new_root.clone(),
            source: e.into(),
        }
    })?;
    tracing::debug!("pivot_root swapped roots");
    Ok(())
}

/// Step 5: lazy detach, so busy references do not block the unmount.
#[cfg(target_os = "linux")]
fn detach_old_root(put_old: &Path) -> Result<()> {
    use nix::mount::{MntFlags, umount2};

    umount2(put_old, MntFlags::MNT_DETACH).map_err(|e| BurrowError::Cleanup {
        step: "detach old root",
        path: put_old.to_path_buf(),
        source: e.into(),
    })?;
    tracing::debug!(path = %put_old.display(), "old root detached");
    Ok(())
}

#[cfg(target_os = "linux")]
fn undo_bind(new_root: &Path) {
    use nix::mount::{MntFlags, umount2};

    if let Err(err) = umount2(new_root, MntFlags::MNT_DETACH) {
        tracing::warn!(path = %new_root.display(), %err, "failed to detach root bind mount");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pivot_state_places_receptacle_inside_root() {
        let root = ContainerRoot::new("/tmp/x").expect("root");
        let state = PivotState::for_root(&root);
        assert_eq!(state.new_root, PathBuf::from("/tmp/x"));
        assert_eq!(state.put_old, PathBuf::from("/tmp/x/.pivot_root"));
        assert_eq!(state.put_old_after, PathBuf::from("/.pivot_root"));
        assert!(state.put_old.starts_with(&state.new_root));
    }

    #[test]
    fn missing_root_fails_before_creating_receptacle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = ContainerRoot::new(dir.path().join("missing")).expect("root");

        let err = pivot_root(&root).expect_err("must fail");
        assert!(err.is_fatal());
        assert!(!dir.path().join("missing/.pivot_root").exists());
    }
}
