//! Staged container preparation inside real namespaces.
//!
//! A forked child enters fresh user, mount, PID, and UTS namespaces and
//! forks again so the preparing process is PID 1, as under the launcher.
//! When the kernel refuses unprivileged namespaces, or forbids mounting
//! `proc` or pivoting in this environment, the test is skipped.

#![cfg(target_os = "linux")]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, unsafe_code)]

use std::path::{Path, PathBuf};

use burrow_common::error::BurrowError;
use burrow_common::types::{ContainerRoot, ResourceLimits};
use burrow_core::namespace::NamespaceSpec;
use burrow_core::namespace::user::write_id_maps;
use burrow_runtime::bootstrap::BootstrapConfig;
use burrow_runtime::init;
use nix::sched::{CloneFlags, unshare};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Gid, Uid, fork, gethostname, getuid};

const SKIP: i32 = 77;

fn wait_code(child: nix::unistd::Pid) -> i32 {
    match waitpid(child, None) {
        Ok(WaitStatus::Exited(_, code)) => code,
        _ => 1,
    }
}

/// Runs `check` as PID 1 of private user, mount, PID, and UTS namespaces.
fn as_namespace_init(check: impl FnOnce() -> i32) -> Option<i32> {
    let spec = NamespaceSpec::single_user(Uid::current().as_raw(), Gid::current().as_raw());
    let flags = CloneFlags::CLONE_NEWUSER
        | CloneFlags::CLONE_NEWNS
        | CloneFlags::CLONE_NEWPID
        | CloneFlags::CLONE_NEWUTS;

    // SAFETY: both children perform only syscalls and filesystem operations
    // and leave through `process::exit`.
    match unsafe { fork() }.expect("fork") {
        ForkResult::Child => {
            if unshare(flags).is_err() || write_id_maps(0, &spec).is_err() {
                std::process::exit(SKIP);
            }
            // SAFETY: as above; this child becomes PID 1 of the new namespace.
            let code = match unsafe { fork() } {
                Ok(ForkResult::Child) => check(),
                Ok(ForkResult::Parent { child }) => wait_code(child),
                Err(_) => SKIP,
            };
            std::process::exit(code);
        }
        ForkResult::Parent { child } => match waitpid(child, None).expect("waitpid") {
            WaitStatus::Exited(_, SKIP) => None,
            WaitStatus::Exited(_, code) => Some(code),
            other => panic!("child ended unexpectedly: {other:?}"),
        },
    }
}

fn read(path: &str) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

fn pid_entries() -> usize {
    std::fs::read_dir("/proc").map_or(0, |entries| {
        entries
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_name().to_str().is_some_and(|n| n.parse::<u32>().is_ok()))
            .count()
    })
}

#[test]
fn prepared_container_sees_its_own_identity_and_limits() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(dir.path().join("etc")).expect("mkdir");
    let config = BootstrapConfig {
        root: ContainerRoot::new(dir.path()).expect("root"),
        limits: ResourceLimits::parse("524288000", "512").expect("limits"),
        shell: PathBuf::from("/bin/sh"),
    };

    let outcome = as_namespace_init(|| {
        match init::prepare(&config) {
            Ok(()) => {}
            Err(BurrowError::Mount {
                step: "mount proc" | "pivot_root",
                ..
            }) => return SKIP,
            Err(_) => return 1,
        }
        if !getuid().is_root() {
            return 2;
        }
        if gethostname().ok().as_deref() != Some(std::ffi::OsStr::new("burrow")) {
            return 3;
        }
        if pid_entries() < 1 || !Path::new("/proc/1").is_dir() {
            return 4;
        }
        if read("/sys/fs/cgroup/memory/container/memory.limit_in_bytes").as_deref()
            != Some("524288000")
        {
            return 5;
        }
        if read("/sys/fs/cgroup/cpu/container/cpu.shares").as_deref() != Some("512") {
            return 6;
        }
        if read("/sys/fs/cgroup/memory/container/cgroup.procs").as_deref() != Some("1") {
            return 7;
        }
        if Path::new("/.pivot_root").exists() || !Path::new("/etc").is_dir() {
            return 8;
        }
        0
    });

    if let Some(code) = outcome {
        assert_eq!(code, 0, "staged preparation check failed with code {code}");
    }
}
