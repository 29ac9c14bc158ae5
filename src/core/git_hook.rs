//! Git post-commit hook management for "run pipeline on commit".
//!
//! The hook is a small marked shell script; wingman only ever writes or
//! deletes scripts carrying its marker and refuses to touch anything else.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::io;

const HOOK_NAME: &str = "post-commit";
const HOOK_MARKER: &str = "# managed by wingman";

#[derive(Debug, Clone)]
pub struct GitHookManager {
    repo_root: PathBuf,
}

impl GitHookManager {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn is_git_repository(&self) -> bool {
        self.repo_root.join(".git").is_dir()
    }

    fn hook_path(&self) -> PathBuf {
        self.repo_root.join(".git").join("hooks").join(HOOK_NAME)
    }

    fn is_managed(content: &str) -> bool {
        content.contains(HOOK_MARKER)
    }

    /// Write the post-commit hook that replays the pipeline.
    ///
    /// Overwrites a previous wingman hook (settings changes regenerate it),
    /// fails on a hook wingman does not own.
    pub fn install(&self, command_line: &str) -> Result<PathBuf> {
        if !self.is_git_repository() {
            return Err(Error::git_hook_no_repository(
                self.repo_root.to_string_lossy().to_string(),
            ));
        }

        let path = self.hook_path();
        if path.exists() {
            let existing = io::read_file(&path, "read post-commit hook")?;
            if !Self::is_managed(&existing) {
                return Err(Error::git_hook_foreign_hook(
                    path.to_string_lossy().to_string(),
                ));
            }
        }

        if let Some(parent) = path.parent() {
            io::ensure_dir(parent, "create hooks dir")?;
        }

        let script = format!("#!/bin/sh\n{}\n{}\n", HOOK_MARKER, command_line);
        io::write_file(&path, &script, "write post-commit hook")?;
        make_executable(&path)?;

        log_status!("hook", "Installed post-commit hook at {}", path.display());
        Ok(path)
    }

    /// Delete the wingman-managed hook. Absent hook is fine; a foreign hook
    /// is left alone and reported.
    pub fn remove(&self) -> Result<bool> {
        let path = self.hook_path();
        if !path.exists() {
            return Ok(false);
        }

        let existing = io::read_file(&path, "read post-commit hook")?;
        if !Self::is_managed(&existing) {
            return Err(Error::git_hook_foreign_hook(
                path.to_string_lossy().to_string(),
            ));
        }

        io::remove_file_if_exists(&path, "remove post-commit hook")?;
        log_status!("hook", "Removed post-commit hook");
        Ok(true)
    }

    /// Reconcile the hook with the `run on commit` setting: install (or
    /// regenerate, when exec parameters changed) or remove.
    pub fn sync(&self, run_on_commit: bool, command_line: &str) -> Result<()> {
        if run_on_commit {
            self.install(command_line)?;
        } else {
            self.remove()?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| Error::internal_io(e.to_string(), Some("chmod post-commit hook".to_string())))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
