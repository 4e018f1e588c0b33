use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::MeridianConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "meridian.toml",
    "meridian.yaml",
    "meridian.yml",
    "meridian.json",
];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

fn override_slot() -> MutexGuard<'static, Option<PathBuf>> {
    CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Set a custom config directory. When set, discovery only looks there and
/// the session file defaults to living next to it.
pub fn set_config_dir(path: PathBuf) {
    *override_slot() = Some(path);
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    *override_slot() = None;
}

fn config_dir_override() -> Option<PathBuf> {
    override_slot().clone()
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<MeridianConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./meridian.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/meridian/meridian.{toml,yaml,yml,json}` (user-global)
///
/// Returns `MeridianConfig::default()` if no file is found or it fails to parse.
pub fn discover_and_load() -> MeridianConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return MeridianConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            MeridianConfig::default()
        },
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        // Override is set: don't fall through to other locations.
        return first_existing(&dir);
    }

    first_existing(Path::new(".")).or_else(|| config_dir().and_then(|dir| first_existing(&dir)))
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the config directory: override, or `~/.config/meridian/`.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return Some(dir);
    }
    home_dir().map(|h| h.join(".config").join("meridian"))
}

/// Returns the data directory: override, or `~/.meridian/`.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = config_dir_override() {
        return dir;
    }
    home_dir()
        .map(|h| h.join(".meridian"))
        .unwrap_or_else(|| PathBuf::from(".meridian"))
}

/// Where persisted session state lives for this config.
pub fn session_path(config: &MeridianConfig) -> PathBuf {
    config
        .storage
        .path
        .clone()
        .unwrap_or_else(|| data_dir().join("session.json"))
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<MeridianConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
