//! Drone cli install and upgrade.
//!
//! Split into independently testable stages: pure version resolution,
//! a release index (GitHub releases, cached to disk), a downloader, and an
//! archive extractor, composed by a thin orchestration step. Failures here
//! leave wingman usable; run commands simply fail at invocation time until
//! a tool binary can be located.

use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ToolCommandFailedDetails};
use crate::paths;
use crate::prompt::{PromptEngine, YesNoPrompt};
use crate::settings::{Settings, TOOL_COMMAND};
use crate::utils::{command, io};

const RELEASE_OWNER: &str = "harness";
const RELEASE_REPO: &str = "drone-cli";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Installed vs latest-known release of the external tool. Computed on
/// demand, never held in memory across checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersionInfo {
    pub current_version: String,
    pub available_version: String,
}

// --- pure version stage -------------------------------------------------

/// `"v1.5.0"` → `"1.5.0"`.
pub fn as_version_number(tag: &str) -> String {
    tag.strip_prefix('v').unwrap_or(tag).to_string()
}

/// `"1.5.0"` → `"v1.5.0"`.
pub fn as_github_tag(version: &str) -> String {
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{}", version)
    }
}

/// Scrape the version number out of `drone --version` output.
pub fn parse_tool_version(output: &str) -> Option<String> {
    let re = Regex::new(r"version\s+v?(\d+\.\d+\.\d+[\w.-]*)").ok()?;
    let first_line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    re.captures(first_line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Semver comparison; falls back to plain inequality when either side is
/// not parseable.
pub fn upgrade_needed(current: &str, available: &str) -> bool {
    let parse = |v: &str| semver::Version::parse(&as_version_number(v)).ok();
    match (parse(current), parse(available)) {
        (Some(c), Some(a)) => c < a,
        _ => current != available,
    }
}

// --- collaborators ------------------------------------------------------

/// Latest release lookup against a remote release index.
pub trait ReleaseIndex {
    /// Latest release tag, e.g. `"v1.8.0"`.
    fn latest_release(&self) -> Result<String>;
}

#[derive(Deserialize)]
struct GithubRelease {
    tag_name: String,
}

/// GitHub releases API, with the tag list cached to disk. With `refresh`
/// unset an existing cache file is reused as-is; with it set the index is
/// always re-fetched and the cache rewritten.
pub struct GithubReleaseIndex {
    cache_file: PathBuf,
    refresh: bool,
}

impl GithubReleaseIndex {
    pub fn new(refresh: bool) -> Result<Self> {
        Ok(Self {
            cache_file: paths::release_cache(RELEASE_REPO)?,
            refresh,
        })
    }

    pub fn with_cache_file(cache_file: PathBuf, refresh: bool) -> Self {
        Self {
            cache_file,
            refresh,
        }
    }

    fn read_cached_tags(&self) -> Option<Vec<String>> {
        let content = std::fs::read_to_string(&self.cache_file).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn fetch_tags(&self) -> Result<Vec<String>> {
        let url = format!(
            "https://api.github.com/repos/{}/{}/releases",
            RELEASE_OWNER, RELEASE_REPO
        );

        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("wingman/{}", VERSION))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| Error::install_release_fetch_failed(e.to_string()))?;

        let releases: Vec<GithubRelease> = client
            .get(&url)
            .send()
            .map_err(|e| Error::install_release_fetch_failed(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::install_release_fetch_failed(e.to_string()))?
            .json()
            .map_err(|e| Error::install_release_fetch_failed(e.to_string()))?;

        Ok(releases.into_iter().map(|r| r.tag_name).collect())
    }

    fn write_cache(&self, tags: &[String]) {
        if let Some(parent) = self.cache_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(content) = serde_json::to_string_pretty(tags) {
            let _ = std::fs::write(&self.cache_file, content);
        }
    }
}

impl ReleaseIndex for GithubReleaseIndex {
    fn latest_release(&self) -> Result<String> {
        if !self.refresh {
            if let Some(tags) = self.read_cached_tags() {
                if let Some(latest) = tags.into_iter().next() {
                    return Ok(latest);
                }
            }
        }

        let tags = self.fetch_tags()?;
        self.write_cache(&tags);
        tags.into_iter()
            .next()
            .ok_or_else(|| Error::install_release_fetch_failed("release index is empty"))
    }
}

/// URL → bytes on a destination path.
pub trait Downloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("wingman/{}", VERSION))
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| Error::install_download_failed(url, e.to_string()))?;

        let response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::install_download_failed(url, e.to_string()))?;

        let bytes = response
            .bytes()
            .map_err(|e| Error::install_download_failed(url, e.to_string()))?;

        std::fs::write(dest, &bytes)
            .map_err(|e| Error::install_download_failed(url, e.to_string()))?;

        log_status!("install", "Downloaded {} ({} bytes)", url, bytes.len());
        Ok(())
    }
}

/// Archive path + destination directory → extracted files.
pub trait ArchiveExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<()>;
}

pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let archive_str = archive.to_string_lossy().to_string();
        let file = std::fs::File::open(archive)
            .map_err(|e| Error::install_extract_failed(archive_str.clone(), e.to_string()))?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| Error::install_extract_failed(archive_str.clone(), e.to_string()))?;

        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .map_err(|e| Error::install_extract_failed(archive_str.clone(), e.to_string()))?;
            let out_path = dest_dir.join(entry.mangled_name());

            if entry.is_dir() {
                io::ensure_dir(&out_path, "extract archive dir")?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                io::ensure_dir(parent, "extract archive dir")?;
            }
            let mut out = std::fs::File::create(&out_path)
                .map_err(|e| Error::install_extract_failed(archive_str.clone(), e.to_string()))?;
            std::io::copy(&mut entry, &mut out)
                .map_err(|e| Error::install_extract_failed(archive_str.clone(), e.to_string()))?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
            }
        }

        Ok(())
    }
}

// --- orchestration ------------------------------------------------------

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallOutcome {
    pub tool_location: String,
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    pub available_version: String,
    pub message: String,
}

/// Release archive URL for the current platform.
pub fn download_url(tag: &str) -> String {
    format!(
        "https://github.com/{}/{}/releases/download/{}/{}_{}_{}.zip",
        RELEASE_OWNER,
        RELEASE_REPO,
        tag,
        TOOL_COMMAND,
        platform_os(),
        platform_arch()
    )
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

/// Find an already-present tool binary: configured path, then `PATH`, then
/// the wingman-managed install location.
fn probe_existing_tool(settings: &Settings) -> Option<String> {
    settings.resolve_tool_binary().ok()
}

/// Run the located tool and scrape its version.
pub fn current_tool_version(location: &str) -> Result<String> {
    let out = command::capture(location, &["--version".to_string()], None)?;
    if !out.success {
        return Err(Error::tool_command_failed(ToolCommandFailedDetails {
            command: format!("{} --version", location),
            exit_code: out.exit_code,
            stdout: out.stdout,
            stderr: out.stderr,
        }));
    }

    parse_tool_version(&out.stdout).ok_or_else(|| {
        Error::internal_unexpected(format!(
            "Could not read a version number from '{} --version' output",
            location
        ))
    })
}

/// Current vs available versions, both resolved on demand.
pub fn version_info(settings: &Settings, index: &dyn ReleaseIndex) -> Result<ToolVersionInfo> {
    let location = settings.resolve_tool_binary()?;
    let current_version = current_tool_version(&location)?;
    let available_version = as_version_number(&index.latest_release()?);
    Ok(ToolVersionInfo {
        current_version,
        available_version,
    })
}

fn install_tool(
    tag: &str,
    downloader: &dyn Downloader,
    extractor: &dyn ArchiveExtractor,
) -> Result<PathBuf> {
    let tools_dir = paths::tools()?;
    io::ensure_dir(&tools_dir, "create tools dir")?;

    let archive = tools_dir.join(format!("{}-cli.zip", TOOL_COMMAND));
    downloader.download(&download_url(tag), &archive)?;
    extractor.extract(&archive, &tools_dir)?;
    io::remove_file_if_exists(&archive, "remove downloaded archive")?;

    let binary = paths::tool_binary(TOOL_COMMAND)?;
    if !binary.exists() {
        return Err(Error::install_extract_failed(
            archive.to_string_lossy().to_string(),
            format!("archive did not contain a '{}' binary", TOOL_COMMAND),
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
            Error::internal_io(e.to_string(), Some("chmod tool binary".to_string()))
        })?;
    }

    Ok(binary)
}

/// Install the tool if absent, or offer an upgrade when the release index
/// is ahead of the installed version. The accepted tool location is
/// recorded in settings (base path plus current-OS override).
pub fn install_or_upgrade(
    settings: &mut Settings,
    index: &dyn ReleaseIndex,
    downloader: &dyn Downloader,
    extractor: &dyn ArchiveExtractor,
    prompt: &PromptEngine,
    force: bool,
) -> Result<InstallOutcome> {
    let latest_tag = index.latest_release()?;
    let available_version = as_version_number(&latest_tag);

    if let Some(location) = probe_existing_tool(settings) {
        let current = current_tool_version(&location)?;

        if !force && !upgrade_needed(&current, &available_version) {
            return Ok(InstallOutcome {
                tool_location: location,
                installed: false,
                previous_version: Some(current),
                available_version,
                message: "Already at the latest version".to_string(),
            });
        }

        let accepted = force
            || prompt.yes_no(&YesNoPrompt {
                question: format!(
                    "{} upgrade available to {}, currently on {}. Install?",
                    TOOL_COMMAND, available_version, current
                ),
                default: true,
            });

        if !accepted {
            return Ok(InstallOutcome {
                tool_location: location,
                installed: false,
                previous_version: Some(current),
                available_version,
                message: "Upgrade declined".to_string(),
            });
        }

        let binary = install_tool(&latest_tag, downloader, extractor)?;
        let binary_str = binary.to_string_lossy().to_string();
        settings.record_tool_path(&binary_str);
        settings.save()?;

        return Ok(InstallOutcome {
            tool_location: binary_str,
            installed: true,
            previous_version: Some(current),
            available_version: available_version.clone(),
            message: format!("Upgraded to {}", available_version),
        });
    }

    let binary = install_tool(&latest_tag, downloader, extractor)?;
    let binary_str = binary.to_string_lossy().to_string();
    settings.record_tool_path(&binary_str);
    settings.save()?;

    Ok(InstallOutcome {
        tool_location: binary_str,
        installed: true,
        previous_version: None,
        available_version: available_version.clone(),
        message: format!("Installed {} {}", TOOL_COMMAND, available_version),
    })
}

/// Tool version report for the `about` command.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    pub tool_location: String,
    pub version_output: String,
}

pub fn about(settings: &Settings) -> Result<AboutInfo> {
    let location = settings.resolve_tool_binary()?;
    let out = command::capture(&location, &["--version".to_string()], None)?;
    if !out.success {
        return Err(Error::tool_command_failed(ToolCommandFailedDetails {
            command: format!("{} --version", location),
            exit_code: out.exit_code,
            stdout: out.stdout,
            stderr: out.stderr,
        }));
    }

    Ok(AboutInfo {
        tool_location: location,
        version_output: out.stdout.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_number_and_tag_round_trip() {
        assert_eq!(as_version_number("v1.5.0"), "1.5.0");
        assert_eq!(as_version_number("1.5.0"), "1.5.0");
        assert_eq!(as_github_tag("1.5.0"), "v1.5.0");
        assert_eq!(as_github_tag("v1.5.0"), "v1.5.0");
        assert_eq!(as_github_tag(&as_version_number("v1.5.0")), "v1.5.0");
    }

    #[test]
    fn parse_tool_version_reads_drone_output() {
        assert_eq!(
            parse_tool_version("drone version 1.6.2\n").as_deref(),
            Some("1.6.2")
        );
        assert_eq!(
            parse_tool_version("\n  drone version v1.7.0-rc.1\n").as_deref(),
            Some("1.7.0-rc.1")
        );
        assert!(parse_tool_version("not a version line").is_none());
    }

    #[test]
    fn upgrade_needed_compares_semver() {
        assert!(upgrade_needed("1.5.0", "1.6.0"));
        assert!(upgrade_needed("0.9.9", "1.0.0"));
        assert!(!upgrade_needed("1.6.0", "1.6.0"));
        assert!(!upgrade_needed("1.7.0", "1.6.0"));
        assert!(upgrade_needed("v1.5.0", "v1.5.1"));
    }

    #[test]
    fn upgrade_needed_falls_back_to_inequality() {
        assert!(upgrade_needed("weird", "1.0.0"));
        assert!(!upgrade_needed("weird", "weird"));
    }

    #[test]
    fn download_url_targets_the_release_tag() {
        let url = download_url("v1.8.0");
        assert!(url.starts_with(
            "https://github.com/harness/drone-cli/releases/download/v1.8.0/drone_"
        ));
        assert!(url.ends_with(".zip"));
    }

    #[test]
    fn cached_release_index_is_reused() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = dir.path().join("releases.json");
        std::fs::write(&cache, r#"["v1.5.0", "v1.4.0"]"#).unwrap();

        let index = GithubReleaseIndex::with_cache_file(cache, false);
        assert_eq!(index.latest_release().unwrap(), "v1.5.0");
    }
}
