//! Startup update check — hints when a newer drone cli release is available.
//!
//! On command invocation, reads a local cache file. A fresh cache answers
//! immediately; a stale or missing one re-resolves versions against the
//! release index. Any failure (no tool installed, network down) skips the
//! hint silently.
//!
//! Disable via:
//! - Environment variable: `WINGMAN_NO_UPDATE_CHECK=1`
//! - Config: `wingman config set update-check false`

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::install::{upgrade_needed, version_info, GithubReleaseIndex};
use crate::paths;
use crate::settings::{Settings, TOOL_COMMAND};

const CHECK_INTERVAL_SECS: u64 = 86400; // 24 hours
const ENV_VAR_DISABLE: &str = "WINGMAN_NO_UPDATE_CHECK";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCheckCache {
    pub latest_version: String,
    pub current_version: String,
    pub update_available: bool,
    pub checked_at: u64,
}

fn cache_path() -> Option<std::path::PathBuf> {
    paths::update_check_cache().ok()
}

fn read_cache() -> Option<UpdateCheckCache> {
    let path = cache_path()?;
    let content = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&content).ok()
}

fn write_cache(cache: &UpdateCheckCache) {
    let Some(path) = cache_path() else { return };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(content) = serde_json::to_string_pretty(cache) else {
        return;
    };
    let _ = std::fs::write(&path, content);
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn is_cache_fresh(cache: &UpdateCheckCache) -> bool {
    now_unix().saturating_sub(cache.checked_at) < CHECK_INTERVAL_SECS
}

fn is_disabled_by_env() -> bool {
    std::env::var(ENV_VAR_DISABLE)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn print_hint(latest: &str, current: &str) {
    log_status!(
        "update",
        "{} {} is available (current: {}). Run `wingman install` to upgrade.",
        TOOL_COMMAND,
        latest,
        current
    );
}

/// Run the startup update check. Prints a hint to stderr if a newer drone
/// cli is known; silently returns on any error. Skipped for the install
/// command itself.
pub fn run_startup_check(settings: &Settings) {
    if is_disabled_by_env() || !settings.update_check {
        return;
    }

    if let Some(cache) = read_cache() {
        if is_cache_fresh(&cache) {
            if cache.update_available {
                print_hint(&cache.latest_version, &cache.current_version);
            }
            return;
        }
    }

    // Stale or missing — recompute against a refreshed release index.
    let Ok(index) = GithubReleaseIndex::new(true) else {
        return;
    };
    let Ok(info) = version_info(settings, &index) else {
        return;
    };

    let update_available = upgrade_needed(&info.current_version, &info.available_version);
    write_cache(&UpdateCheckCache {
        latest_version: info.available_version.clone(),
        current_version: info.current_version.clone(),
        update_available,
        checked_at: now_unix(),
    });

    if update_available {
        print_hint(&info.available_version, &info.current_version);
    }
}
