//! Local process execution primitives.

use serde::Serialize;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Captured output from a finished process.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

/// Run a program with an argument vector and capture its output.
///
/// Spawn failures (binary missing, permission denied) are IO errors; a
/// non-zero exit is NOT an error here; callers inspect `success`.
pub fn capture(program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let out = cmd.output().map_err(|e| {
        Error::internal_io(
            format!("Failed to run '{}': {}", program, e),
            Some("spawn process".to_string()),
        )
    })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&out.stdout).to_string(),
        stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        success: out.status.success(),
        exit_code: out.status.code().unwrap_or(-1),
    })
}

/// Run a shell command line interactively, inheriting stdio.
///
/// Returns the exit code (-1 when the process was killed by a signal).
pub fn run_interactive(command: &str, cwd: Option<&Path>) -> Result<i32> {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| {
            Error::internal_io(
                format!("Failed to run '{}': {}", command, e),
                Some("spawn interactive process".to_string()),
            )
        })?;

    Ok(status.code().unwrap_or(-1))
}

/// Extract error text from captured output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &CommandOutput) -> String {
    if !output.stderr.trim().is_empty() {
        output.stderr.trim().to_string()
    } else {
        output.stdout.trim().to_string()
    }
}

/// Locate a program on PATH, returning its absolute path.
pub fn which(program: &str) -> Option<String> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate.to_string_lossy().to_string());
        }
        #[cfg(windows)]
        {
            let exe = dir.join(format!("{}.exe", program));
            if exe.is_file() {
                return Some(exe.to_string_lossy().to_string());
            }
        }
    }
    None
}
