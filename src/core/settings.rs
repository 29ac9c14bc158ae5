//! Persistent settings, stored as JSON under the wingman config directory.
//!
//! Mirrors the three knobs that shape pipeline execution: where the drone
//! cli lives (with per-OS overrides), whether runs pass `--trusted`, and
//! whether a git post-commit hook replays the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::paths;
use crate::utils::{command, io};

/// Name of the external pipeline tool on PATH.
pub const TOOL_COMMAND: &str = "drone";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolPathSettings {
    pub base: Option<String>,
    pub linux: Option<String>,
    pub macos: Option<String>,
    pub windows: Option<String>,
}

impl ToolPathSettings {
    /// OS-specific override first, then the base path. `~` is expanded.
    pub fn configured(&self) -> Option<String> {
        #[cfg(target_os = "linux")]
        let os_specific = self.linux.as_ref();
        #[cfg(target_os = "macos")]
        let os_specific = self.macos.as_ref();
        #[cfg(windows)]
        let os_specific = self.windows.as_ref();
        #[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
        let os_specific: Option<&String> = None;

        os_specific
            .or(self.base.as_ref())
            .filter(|p| !p.is_empty())
            .map(|p| shellexpand::tilde(p).to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub tool_path: ToolPathSettings,
    pub run_trusted: bool,
    pub run_on_commit: bool,
    pub update_check: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tool_path: ToolPathSettings::default(),
            run_trusted: false,
            run_on_commit: false,
            update_check: true,
        }
    }
}

/// Where settings live on disk (for `wingman config path`).
pub fn settings_file_path() -> Result<std::path::PathBuf> {
    paths::settings_json()
}

impl Settings {
    /// Load settings from disk. A missing file yields defaults; a corrupt
    /// file is an error rather than silently resetting the user's config.
    pub fn load() -> Result<Self> {
        let path = paths::settings_json()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = io::read_file(&path, "read settings")?;
        serde_json::from_str(&content)
            .map_err(|e| Error::config_invalid_json(path.to_string_lossy().to_string(), e))
    }

    pub fn save(&self) -> Result<()> {
        let path = paths::settings_json()?;
        if let Some(parent) = path.parent() {
            io::ensure_dir(parent, "create config dir")?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize settings".to_string())))?;
        io::write_file(&path, &content, "write settings")
    }

    /// Locate the tool binary: configured path, then `PATH`, then the
    /// wingman-managed install location.
    pub fn resolve_tool_binary(&self) -> Result<String> {
        if let Some(configured) = self.tool_path.configured() {
            if std::path::Path::new(&configured).exists() {
                return Ok(configured);
            }
        }

        if let Some(found) = command::which(TOOL_COMMAND) {
            return Ok(found);
        }

        let installed = paths::tool_binary(TOOL_COMMAND)?;
        if installed.exists() {
            return Ok(installed.to_string_lossy().to_string());
        }

        Err(Error::tool_not_found(TOOL_COMMAND))
    }

    /// Record a freshly installed binary location as both the base path and
    /// the current OS's override.
    pub fn record_tool_path(&mut self, location: &str) {
        self.tool_path.base = Some(location.to_string());
        #[cfg(target_os = "linux")]
        {
            self.tool_path.linux = Some(location.to_string());
        }
        #[cfg(target_os = "macos")]
        {
            self.tool_path.macos = Some(location.to_string());
        }
        #[cfg(windows)]
        {
            self.tool_path.windows = Some(location.to_string());
        }
    }

    /// Read a settings key by its CLI name.
    pub fn get_key(&self, key: &str) -> Result<serde_json::Value> {
        match key {
            "tool-path" => Ok(serde_json::json!(self.tool_path.base)),
            "tool-path.linux" => Ok(serde_json::json!(self.tool_path.linux)),
            "tool-path.macos" => Ok(serde_json::json!(self.tool_path.macos)),
            "tool-path.windows" => Ok(serde_json::json!(self.tool_path.windows)),
            "run-trusted" => Ok(serde_json::json!(self.run_trusted)),
            "run-on-commit" => Ok(serde_json::json!(self.run_on_commit)),
            "update-check" => Ok(serde_json::json!(self.update_check)),
            _ => Err(Error::config_invalid_value(key, "Unknown settings key")),
        }
    }

    /// Write a settings key by its CLI name. Booleans accept true/false.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse_bool(key: &str, value: &str) -> Result<bool> {
            match value {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::config_invalid_value(
                    key,
                    format!("Expected 'true' or 'false', got '{}'", value),
                )),
            }
        }

        match key {
            "tool-path" => self.tool_path.base = Some(value.to_string()),
            "tool-path.linux" => self.tool_path.linux = Some(value.to_string()),
            "tool-path.macos" => self.tool_path.macos = Some(value.to_string()),
            "tool-path.windows" => self.tool_path.windows = Some(value.to_string()),
            "run-trusted" => self.run_trusted = parse_bool(key, value)?,
            "run-on-commit" => self.run_on_commit = parse_bool(key, value)?,
            "update-check" => self.update_check = parse_bool(key, value)?,
            _ => return Err(Error::config_invalid_value(key, "Unknown settings key")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let s = Settings::default();
        assert!(!s.run_trusted);
        assert!(!s.run_on_commit);
        assert!(s.update_check);
        assert!(s.tool_path.configured().is_none());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn os_override_wins_over_base() {
        let tool_path = ToolPathSettings {
            base: Some("/usr/local/bin/drone".to_string()),
            linux: Some("/opt/drone/drone".to_string()),
            ..Default::default()
        };
        assert_eq!(tool_path.configured().as_deref(), Some("/opt/drone/drone"));
    }

    #[test]
    fn empty_configured_path_is_ignored() {
        let tool_path = ToolPathSettings {
            base: Some(String::new()),
            ..Default::default()
        };
        assert!(tool_path.configured().is_none());
    }

    #[test]
    fn settings_round_trip_through_json() {
        let mut s = Settings::default();
        s.run_trusted = true;
        s.tool_path.base = Some("/tmp/drone".to_string());

        let json = serde_json::to_string(&s).unwrap();
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert!(parsed.run_trusted);
        assert_eq!(parsed.tool_path.base.as_deref(), Some("/tmp/drone"));
    }

    #[test]
    fn unknown_json_keys_are_tolerated_missing_keys_default() {
        let parsed: Settings = serde_json::from_str(r#"{"runTrusted": true}"#).unwrap();
        assert!(parsed.run_trusted);
        assert!(parsed.update_check);
    }

    #[test]
    fn set_key_rejects_bad_boolean() {
        let mut s = Settings::default();
        let err = s.set_key("run-trusted", "yep").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut s = Settings::default();
        s.set_key("run-on-commit", "true").unwrap();
        assert_eq!(s.get_key("run-on-commit").unwrap(), serde_json::json!(true));

        s.set_key("tool-path", "/x/drone").unwrap();
        assert_eq!(
            s.get_key("tool-path").unwrap(),
            serde_json::json!("/x/drone")
        );
    }

    #[test]
    fn unknown_key_is_an_error() {
        let s = Settings::default();
        assert!(s.get_key("nope").is_err());
    }
}
