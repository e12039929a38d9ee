//! Isolation spawn.
//!
//! Starts the staged child in new user, mount, UTS, IPC, PID, and network
//! namespaces with a single `clone(2)`. The child blocks on a pipe until the
//! parent has written its UID/GID maps, then re-executes this binary under
//! the stage marker. The parent waits for it and reports its exit code.

use crate::bootstrap::BootstrapConfig;
use burrow_common::error::Result;

/// Stack for the cloned child; it only reads one byte and calls `execv`.
#[cfg(target_os = "linux")]
const CHILD_STACK_SIZE: usize = 1024 * 1024;

/// Exit code of a child that was never released by the parent.
#[cfg(target_os = "linux")]
const NOT_RELEASED: isize = 1;

/// Exit code of a child whose `execv` failed.
#[cfg(target_os = "linux")]
const EXEC_FAILED: isize = 127;

/// Launches the isolated session described by `config` and waits for it.
///
/// The staged child inherits this process's environment with `stage_env`
/// layered on top. Returns the session's exit code; a child killed by a signal reports
/// `128 + signal`. Terminal interrupts are ignored by the launcher while it
/// waits so they reach the session.
///
/// # Errors
///
/// Returns `BurrowError::Privilege` if the spawn or the ID mapping fails.
/// A child that was already spawned is killed and reaped first.
#[cfg(target_os = "linux")]
pub fn launch(config: &BootstrapConfig, stage_env: &[(&str, &str)]) -> Result<i32> {
    use std::fs::File;
    use std::io::{Read, Write};

    use burrow_common::error::BurrowError;
    use burrow_core::namespace::NamespaceSpec;
    use burrow_core::namespace::user::write_id_maps;
    use nix::fcntl::OFlag;
    use nix::sched::clone;
    use nix::unistd::{execve, pipe2};

    let spec = NamespaceSpec::for_current_user();
    let (exe, argv, envp) = stage_command(config, stage_env)?;

    let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC).map_err(|e| BurrowError::Privilege {
        step: "create sync pipe",
        source: e.into(),
    })?;
    let reader = File::from(read_end);
    let mut writer = Some(File::from(write_end));

    let mut stack = vec![0_u8; CHILD_STACK_SIZE];
    let child_main = Box::new(|| -> isize {
        // The child's copy of the write end must go, or a dead parent would
        // leave it blocked forever instead of seeing EOF.
        drop(writer.take());
        let mut byte = [0_u8; 1];
        if !matches!((&reader).read(&mut byte), Ok(1)) {
            return NOT_RELEASED;
        }
        let Err(_) = execve(&exe, &argv, &envp);
        EXEC_FAILED
    });

    // SAFETY: without CLONE_VM the child gets a copy-on-write image of this
    // process and runs only `child_main`, which reads from a pipe and execs.
    let child = unsafe {
        clone(
            child_main,
            &mut stack,
            spec.namespaces.to_clone_flags(),
            Some(libc::SIGCHLD),
        )
    }
    .map_err(|e| BurrowError::Privilege {
        step: "clone into new namespaces",
        source: e.into(),
    })?;
    drop(reader);
    tracing::info!(pid = child.as_raw(), root = %config.root, "staged child spawned");

    if let Err(err) = write_id_maps(child.as_raw().unsigned_abs(), &spec) {
        abort_child(child);
        return Err(err);
    }
    let released = writer.take().map_or(Ok(()), |mut w| w.write_all(&[1]));
    if let Err(e) = released {
        abort_child(child);
        return Err(BurrowError::Privilege {
            step: "release staged child",
            source: e,
        });
    }

    ignore_interrupts();
    let code = wait_for(child)?;
    tracing::info!(pid = child.as_raw(), code, "staged child exited");
    Ok(code)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn launch(_config: &BootstrapConfig, _stage_env: &[(&str, &str)]) -> Result<i32> {
    Err(burrow_common::error::BurrowError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Executable path, `argv`, and `envp` of the staged child.
#[cfg(target_os = "linux")]
type StageCommand = (std::ffi::CString, Vec<std::ffi::CString>, Vec<std::ffi::CString>);

/// Resolves this executable and builds the staged child's `argv` and
/// `envp`, before the clone, so the child does no allocation.
#[cfg(target_os = "linux")]
fn stage_command(config: &BootstrapConfig, stage_env: &[(&str, &str)]) -> Result<StageCommand> {
    use std::ffi::{CString, OsStr, OsString};
    use std::os::unix::ffi::OsStrExt;

    use burrow_common::constants::INIT_STAGE_MARKER;
    use burrow_common::error::BurrowError;

    let to_cstring = |arg: &OsStr| {
        CString::new(arg.as_bytes()).map_err(|_| BurrowError::Config {
            message: format!("argument contains a NUL byte: {}", arg.to_string_lossy()),
        })
    };

    let exe = std::env::current_exe().map_err(|e| BurrowError::Io {
        path: "/proc/self/exe".into(),
        source: e,
    })?;
    let mut argv = vec![to_cstring(OsStr::new(INIT_STAGE_MARKER))?];
    for arg in config.to_stage_args() {
        argv.push(to_cstring(&arg)?);
    }

    let mut envp = Vec::new();
    for (key, value) in std::env::vars_os() {
        if stage_env.iter().any(|(k, _)| key.as_os_str() == OsStr::new(k)) {
            continue;
        }
        let mut pair = key;
        pair.push("=");
        pair.push(value);
        envp.push(to_cstring(&pair)?);
    }
    for (key, value) in stage_env {
        envp.push(to_cstring(&OsString::from(format!("{key}={value}")))?);
    }
    Ok((to_cstring(exe.as_os_str())?, argv, envp))
}

#[cfg(target_os = "linux")]
fn abort_child(child: nix::unistd::Pid) {
    use nix::sys::signal::{Signal, kill};

    if let Err(e) = kill(child, Signal::SIGKILL) {
        tracing::warn!(pid = child.as_raw(), error = %e, "failed to kill staged child");
    }
    if let Err(e) = nix::sys::wait::waitpid(child, None) {
        tracing::warn!(pid = child.as_raw(), error = %e, "failed to reap staged child");
    }
}

/// Keeps `Ctrl+C` from killing the launcher; the session shares the
/// terminal and handles it itself.
#[cfg(target_os = "linux")]
fn ignore_interrupts() {
    if let Err(e) = ctrlc::set_handler(|| tracing::debug!("interrupt left to the session")) {
        tracing::debug!(error = %e, "interrupt handler already installed");
    }
}

#[cfg(target_os = "linux")]
fn wait_for(child: nix::unistd::Pid) -> Result<i32> {
    use burrow_common::error::BurrowError;
    use nix::errno::Errno;
    use nix::sys::wait::waitpid;

    loop {
        match waitpid(child, None) {
            Ok(status) => {
                if let Some(code) = exit_code(status) {
                    return Ok(code);
                }
            }
            Err(Errno::EINTR) => {}
            Err(e) => {
                return Err(BurrowError::Io {
                    path: format!("/proc/{child}").into(),
                    source: e.into(),
                });
            }
        }
    }
}

/// Maps a terminal wait status to an exit code; `None` for stop/continue
/// notifications.
#[cfg(target_os = "linux")]
fn exit_code(status: nix::sys::wait::WaitStatus) -> Option<i32> {
    use nix::sys::wait::WaitStatus;

    match status {
        WaitStatus::Exited(_, code) => Some(code),
        WaitStatus::Signaled(_, signal, _) => Some(128 + signal as i32),
        _ => None,
    }
}
