//! Pipeline context resolution.
//!
//! The context is the resolved triple of pipeline file, owning workspace
//! root, and git hook manager. It is owned by the execution orchestrator,
//! created lazily on first use and recomputed via an explicit refresh,
//! never looked up through global state.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::git_hook::GitHookManager;
use crate::utils::io;

pub const PIPELINE_FILE_NAME: &str = ".drone.yml";
pub const PIPELINE_FILE_GLOB: &str = "**/.drone.yml";

/// Workspace discovery: find files by glob, map a file to its owning root.
pub trait Workspace {
    fn root(&self) -> &Path;
    fn find_files(&self, pattern: &str) -> Result<Vec<PathBuf>>;
    fn owning_root(&self, file: &Path) -> PathBuf;
}

/// Directory-backed workspace: glob matching under a root directory, git
/// root detection for file ownership.
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_current_dir() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::workspace_not_found(format!("Cannot resolve working directory: {}", e)))?;
        Ok(Self::new(cwd))
    }
}

impl Workspace for LocalWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn find_files(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let full_pattern = self.root.join(pattern);
        let full_pattern = full_pattern.to_string_lossy();

        let mut matches: Vec<PathBuf> = glob::glob(&full_pattern)
            .map_err(|e| {
                Error::validation_invalid_argument(
                    "pattern",
                    format!("Invalid glob pattern: {}", e),
                    Some(pattern.to_string()),
                )
            })?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .collect();

        // Root-most match first, then lexical, so discovery is deterministic.
        matches.sort_by_key(|p| (p.components().count(), p.clone()));
        Ok(matches)
    }

    fn owning_root(&self, file: &Path) -> PathBuf {
        detect_git_root(file).unwrap_or_else(|| self.root.clone())
    }
}

/// Walk up from a file looking for a `.git` directory.
fn detect_git_root(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_dir() {
        start
    } else {
        start.parent()?
    };

    loop {
        if dir.join(".git").is_dir() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// The resolved (pipeline file, workspace root, hook manager) triple.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub file: PathBuf,
    pub workspace_root: PathBuf,
    pub hook: GitHookManager,
}

impl PipelineContext {
    /// The pipeline file path relative to the workspace root, as handed to
    /// the external tool.
    pub fn relative_file(&self) -> String {
        self.file
            .strip_prefix(&self.workspace_root)
            .unwrap_or(&self.file)
            .to_string_lossy()
            .to_string()
    }

    /// On-disk pipeline text.
    pub fn read_file(&self) -> Result<String> {
        io::read_file(&self.file, "read pipeline file")
    }
}

/// Locate the pipeline file in the workspace and build the context around it.
pub fn resolve(workspace: &dyn Workspace) -> Result<PipelineContext> {
    let matches = workspace.find_files(PIPELINE_FILE_GLOB)?;
    let Some(file) = matches.into_iter().next() else {
        return Err(Error::pipeline_not_found(
            PIPELINE_FILE_GLOB,
            workspace.root().to_string_lossy().to_string(),
        ));
    };

    let workspace_root = workspace.owning_root(&file);
    let hook = GitHookManager::new(&workspace_root);

    Ok(PipelineContext {
        file,
        workspace_root,
        hook,
    })
}

/// Write the minimal valid pipeline skeleton into the workspace root.
///
/// Guided recovery for the "no pipeline file" case; callers confirm with
/// the user before invoking this.
pub fn create_default_pipeline_file(workspace_root: &Path) -> Result<PathBuf> {
    let path = workspace_root.join(PIPELINE_FILE_NAME);
    let skeleton = format!(
        "\
kind: pipeline
type: docker
name: my-pipeline
platform:
  os: {}
  arch: {}
steps:
  - name: step-name
    image: busybox
    commands:
    - echo 'Test World'
",
        platform_os(),
        platform_arch()
    );

    io::write_file(&path, &skeleton, "write default pipeline file")?;
    log_status!("init", "Created {}", path.display());
    Ok(path)
}

fn platform_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn platform_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}
