use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base wingman config directory (~/.config/wingman/ on Unix, %APPDATA%\wingman on Windows)
pub fn wingman() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("wingman"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("wingman"))
    }
}

/// Global settings.json file path
pub fn settings_json() -> Result<PathBuf> {
    Ok(wingman()?.join("settings.json"))
}

/// Directory downloaded tool binaries are installed into
pub fn tools() -> Result<PathBuf> {
    Ok(wingman()?.join("tools"))
}

/// Installed location of the drone cli binary
pub fn tool_binary(tool: &str) -> Result<PathBuf> {
    #[cfg(windows)]
    {
        Ok(tools()?.join(format!("{}.exe", tool)))
    }

    #[cfg(not(windows))]
    {
        Ok(tools()?.join(tool))
    }
}

/// On-disk cache of release tags fetched from the release index
pub fn release_cache(repo: &str) -> Result<PathBuf> {
    Ok(tools()?.join(format!("{}-releases.json", repo)))
}

/// Cache file for the startup update check
pub fn update_check_cache() -> Result<PathBuf> {
    Ok(wingman()?.join("update_check.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(windows))]
    fn paths_hang_off_config_dir() {
        std::env::set_var("HOME", "/home/pilot");
        let base = wingman().unwrap();
        assert_eq!(base, PathBuf::from("/home/pilot/.config/wingman"));
        assert_eq!(settings_json().unwrap(), base.join("settings.json"));
        assert_eq!(tools().unwrap(), base.join("tools"));
        assert_eq!(
            release_cache("drone-cli").unwrap(),
            base.join("tools").join("drone-cli-releases.json")
        );
    }
}
