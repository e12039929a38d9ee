//! Interactive session inside the container.

use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use burrow_common::constants::{SESSION_PROMPT, SESSION_TERM};
use burrow_common::error::{BurrowError, Result};

/// Search path for shells given by name; the host's `PATH` means nothing
/// after the pivot.
const CONTAINER_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// The complete session environment.
#[must_use]
pub const fn session_env() -> [(&'static str, &'static str); 2] {
    [("PS1", SESSION_PROMPT), ("TERM", SESSION_TERM)]
}

/// Runs `shell` with inherited standard streams and a cleared environment,
/// returning its exit code.
///
/// A shell killed by a signal reports `128 + signal`.
///
/// # Errors
///
/// Returns `BurrowError::Session` if the shell cannot be found or started.
pub fn run_session(shell: &Path) -> Result<i32> {
    let program = resolve_shell(shell)?;
    tracing::info!(shell = %program.display(), "starting session");

    let status = Command::new(&program)
        .env_clear()
        .envs(session_env())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| BurrowError::Session {
            program: program.clone(),
            source: e,
        })?;

    let code = exit_code(status);
    tracing::info!(code, "session ended");
    Ok(code)
}

fn resolve_shell(shell: &Path) -> Result<PathBuf> {
    if shell.components().count() > 1 || shell.is_absolute() {
        return Ok(shell.to_path_buf());
    }
    which::which_in(shell, Some(CONTAINER_PATH), "/").map_err(|e| BurrowError::Session {
        program: shell.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, e),
    })
}

/// Converts a wait status into a shell-style exit code.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    #[test]
    fn session_env_is_prompt_and_term_only() {
        assert_eq!(session_env(), [("PS1", "-[burrow]- # "), ("TERM", "xterm")]);
    }

    #[test]
    fn exit_code_of_shell_is_returned_as_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shell = script(dir.path(), "shell", "exit 7");
        assert_eq!(run_session(&shell).expect("run"), 7);
    }

    #[test]
    fn session_sees_only_the_session_environment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("env.txt");
        let shell = script(dir.path(), "shell", &format!("env > {}", out.display()));

        assert_eq!(run_session(&shell).expect("run"), 0);
        let env = std::fs::read_to_string(&out).expect("read env");
        assert!(env.lines().any(|l| l == "PS1=-[burrow]- # "), "{env}");
        assert!(env.lines().any(|l| l == "TERM=xterm"), "{env}");
        assert!(!env.lines().any(|l| l.starts_with("HOME=")), "{env}");
        assert!(!env.lines().any(|l| l.starts_with("CARGO")), "{env}");
    }

    #[test]
    fn signal_death_maps_to_128_plus_signal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shell = script(dir.path(), "shell", "kill -9 $$");
        assert_eq!(run_session(&shell).expect("run"), 128 + 9);
    }

    #[test]
    fn missing_shell_is_session_error() {
        let err = run_session(Path::new("/nonexistent/bin/sh")).expect_err("must fail");
        assert!(matches!(err, BurrowError::Session { .. }));
        let err = run_session(Path::new("no-such-shell-anywhere")).expect_err("must fail");
        assert!(matches!(err, BurrowError::Session { .. }));
    }

    #[test]
    fn shell_name_resolves_through_container_path() {
        assert_eq!(
            resolve_shell(Path::new("/bin/sh")).expect("absolute"),
            PathBuf::from("/bin/sh")
        );
        if let Ok(found) = resolve_shell(Path::new("sh")) {
            assert!(found.is_absolute());
        }
    }
}
